use dashmap::DashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use uuid::Uuid;

const CLEANUP_INTERVAL_SECS: u64 = 300;

/// Held while a vote on one post is being applied.
pub type VotableGuard = OwnedMutexGuard<()>;

/// One async mutex per post id. Callers on different posts never wait on
/// each other; callers on the same post queue in FIFO order.
#[derive(Clone)]
pub struct VotableLocks {
    locks: Arc<DashMap<Uuid, Arc<AsyncMutex<()>>>>,
    last_cleanup: Arc<Mutex<Instant>>,
    cleanup_interval: Duration,
}

impl VotableLocks {
    pub fn new() -> Self {
        Self::with_cleanup_interval(Duration::from_secs(CLEANUP_INTERVAL_SECS))
    }

    pub fn with_cleanup_interval(cleanup_interval: Duration) -> Self {
        Self {
            locks: Arc::new(DashMap::new()),
            last_cleanup: Arc::new(Mutex::new(Instant::now())),
            cleanup_interval,
        }
    }

    pub async fn acquire(&self, post_id: Uuid) -> VotableGuard {
        self.maybe_cleanup();

        // Clone under the shard lock so cleanup sees this caller as a holder.
        let lock = self.locks.entry(post_id).or_default().clone();
        lock.lock_owned().await
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.locks.len()
    }

    fn maybe_cleanup(&self) {
        let mut last_cleanup = self
            .last_cleanup
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if last_cleanup.elapsed() >= self.cleanup_interval {
            // Only the map still references an idle entry.
            self.locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            *last_cleanup = Instant::now();
        }
    }
}

impl Default for VotableLocks {
    fn default() -> Self {
        Self::new()
    }
}
