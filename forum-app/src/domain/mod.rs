mod persisted_post;
mod transition;
mod vote;

pub use persisted_post::PersistedPost;
pub use transition::{CounterDelta, Transition};
pub use vote::{CounterAudit, Counters, Vote, VoteResult, VoteState, VoteValue};
