use forum_errors::AppError;
use serde::{Deserialize, Serialize};

/// Direction of a single vote. Serialized as `1` / `-1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum VoteValue {
    Up,
    Down,
}

impl VoteValue {
    pub fn as_i16(self) -> i16 {
        match self {
            Self::Up => 1,
            Self::Down => -1,
        }
    }
}

impl TryFrom<i64> for VoteValue {
    type Error = AppError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Up),
            -1 => Ok(Self::Down),
            other => Err(AppError::InvalidVoteValue(other)),
        }
    }
}

impl From<VoteValue> for i64 {
    fn from(value: VoteValue) -> Self {
        value.as_i16() as i64
    }
}

/// A voter's standing on one post, as rendered by the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum VoteState {
    #[default]
    #[serde(rename = "none")]
    NoVote,
    #[serde(rename = "up")]
    Upvoted,
    #[serde(rename = "down")]
    Downvoted,
}

impl VoteState {
    pub fn value(self) -> Option<VoteValue> {
        match self {
            Self::NoVote => None,
            Self::Upvoted => Some(VoteValue::Up),
            Self::Downvoted => Some(VoteValue::Down),
        }
    }
}

impl From<Option<VoteValue>> for VoteState {
    fn from(value: Option<VoteValue>) -> Self {
        match value {
            None => Self::NoVote,
            Some(VoteValue::Up) => Self::Upvoted,
            Some(VoteValue::Down) => Self::Downvoted,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub voter_id: uuid::Uuid,
    pub post_id: uuid::Uuid,
    pub value: VoteValue,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Cached up/down counters of a post. The net score is always derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Counters {
    pub up: i32,
    pub down: i32,
}

impl Counters {
    pub fn new(up: i32, down: i32) -> Self {
        Self { up, down }
    }

    pub fn net(&self) -> i32 {
        self.up - self.down
    }

    pub fn is_valid(&self) -> bool {
        self.up >= 0 && self.down >= 0
    }
}

/// Result of a vote cast (or a tally read) for one voter on one post
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteResult {
    pub up: i32,
    pub down: i32,
    pub net: i32,
    pub current_user_vote: VoteState,
}

impl VoteResult {
    pub fn new(counters: Counters, current_user_vote: VoteState) -> Self {
        Self {
            up: counters.up,
            down: counters.down,
            net: counters.net(),
            current_user_vote,
        }
    }

    pub fn counters(&self) -> Counters {
        Counters::new(self.up, self.down)
    }
}

/// Stored counters next to the counts recomputed from vote rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterAudit {
    pub stored: Counters,
    pub actual: Counters,
}

impl CounterAudit {
    pub fn is_consistent(&self) -> bool {
        self.stored == self.actual
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vote_value_parsing() {
        assert_eq!(VoteValue::try_from(1).unwrap(), VoteValue::Up);
        assert_eq!(VoteValue::try_from(-1).unwrap(), VoteValue::Down);
        assert_eq!(VoteValue::try_from(0), Err(AppError::InvalidVoteValue(0)));
        assert_eq!(VoteValue::try_from(2), Err(AppError::InvalidVoteValue(2)));
    }

    #[test]
    fn test_vote_value_serde() {
        assert_eq!(serde_json::to_string(&VoteValue::Down).unwrap(), "-1");
        assert_eq!(serde_json::from_str::<VoteValue>("1").unwrap(), VoteValue::Up);
        assert!(serde_json::from_str::<VoteValue>("2").is_err());
    }

    #[test]
    fn test_vote_state_serde() {
        assert_eq!(serde_json::to_string(&VoteState::NoVote).unwrap(), "\"none\"");
        assert_eq!(serde_json::to_string(&VoteState::Upvoted).unwrap(), "\"up\"");
        assert_eq!(serde_json::to_string(&VoteState::Downvoted).unwrap(), "\"down\"");
    }

    #[test]
    fn test_result_derives_net() {
        let result = VoteResult::new(Counters::new(3, 5), VoteState::Downvoted);
        assert_eq!(result.net, -2);
        assert_eq!(result.counters(), Counters::new(3, 5));
    }
}
