use super::{VoteState, VoteValue};

/// Signed adjustment of a post's counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CounterDelta {
    pub up: i32,
    pub down: i32,
}

impl CounterDelta {
    fn for_value(value: VoteValue, amount: i32) -> Self {
        match value {
            VoteValue::Up => Self { up: amount, down: 0 },
            VoteValue::Down => Self { up: 0, down: amount },
        }
    }
}

/// What happens to a voter's vote when they submit a value.
///
/// Submitting the value already held retracts it; submitting the opposite
/// value switches it in place without an intermediate "no vote" step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Create(VoteValue),
    Retract(VoteValue),
    Switch { from: VoteValue, to: VoteValue },
}

impl Transition {
    pub fn plan(current: Option<VoteValue>, requested: VoteValue) -> Self {
        match current {
            None => Self::Create(requested),
            Some(held) if held == requested => Self::Retract(held),
            Some(held) => Self::Switch {
                from: held,
                to: requested,
            },
        }
    }

    pub fn delta(&self) -> CounterDelta {
        match *self {
            Self::Create(value) => CounterDelta::for_value(value, 1),
            Self::Retract(value) => CounterDelta::for_value(value, -1),
            Self::Switch { from, to } => {
                let removed = CounterDelta::for_value(from, -1);
                let added = CounterDelta::for_value(to, 1);
                CounterDelta {
                    up: removed.up + added.up,
                    down: removed.down + added.down,
                }
            }
        }
    }

    pub fn resulting_state(&self) -> VoteState {
        match *self {
            Self::Create(value) => Some(value).into(),
            Self::Retract(_) => VoteState::NoVote,
            Self::Switch { to, .. } => Some(to).into(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Create(_) => "create",
            Self::Retract(_) => "retract",
            Self::Switch { .. } => "switch",
        }
    }
}
