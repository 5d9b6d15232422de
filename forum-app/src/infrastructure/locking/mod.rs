mod votable_locks;

pub use votable_locks::{VotableGuard, VotableLocks};
