use crate::config::VoteConfig;
use crate::domain::{CounterAudit, Counters, Transition, VoteResult, VoteState, VoteValue};
use crate::infrastructure::db::{classify_db_error, PostRepository, VoteRepository};
use crate::infrastructure::locking::VotableLocks;
use forum_errors::AppError;
use sea_orm::{
    ConnectionTrait, DatabaseConnection, DatabaseTransaction, DbBackend, IsolationLevel,
    TransactionTrait,
};
use std::future::Future;
use std::time::Duration;
use uuid::Uuid;

/// Applies vote casts so that vote rows and post counters change together.
///
/// Each cast runs under the post's in-process lock and inside one database
/// transaction that also holds the post's row lock. Any early return drops
/// the transaction, which rolls it back; nothing is visible until commit.
/// The timeout never interrupts a commit already under way.
#[derive(Clone)]
pub struct VoteAggregator {
    db: DatabaseConnection,
    posts: PostRepository,
    votes: VoteRepository,
    locks: VotableLocks,
    config: VoteConfig,
}

impl VoteAggregator {
    pub fn new(db: DatabaseConnection, config: VoteConfig) -> Self {
        Self {
            posts: PostRepository::new(db.clone()),
            votes: VoteRepository::new(),
            locks: VotableLocks::new(),
            db,
            config,
        }
    }

    /// Submits `value` (`1` or `-1`) for the voter on the post and returns the
    /// committed tally. Repeating the held value retracts it; the opposite
    /// value switches it.
    pub async fn cast_vote(
        &self,
        voter_id: Uuid,
        post_id: Uuid,
        value: i64,
    ) -> Result<VoteResult, AppError> {
        let requested = VoteValue::try_from(value)?;
        let (transition, counters) = self
            .with_post_lock(post_id, self.apply_vote(voter_id, post_id, requested))
            .await?;

        tracing::debug!(
            %voter_id,
            %post_id,
            transition = transition.name(),
            up = counters.up,
            down = counters.down,
            "Vote applied"
        );

        Ok(VoteResult::new(counters, transition.resulting_state()))
    }

    /// The voter's current standing. A post without votes, or a missing post,
    /// reads as `NoVote`.
    pub async fn vote_state(&self, voter_id: Uuid, post_id: Uuid) -> Result<VoteState, AppError> {
        let vote = self.votes.get_vote(&self.db, voter_id, post_id).await?;
        Ok(vote.map(|v| v.value).into())
    }

    /// Counters plus the voter's standing, read from one snapshot so the two
    /// always agree.
    pub async fn tally(
        &self,
        voter_id: Option<Uuid>,
        post_id: Uuid,
    ) -> Result<VoteResult, AppError> {
        // SQLite transactions are already snapshots and reject isolation levels.
        let isolation = match self.db.get_database_backend() {
            DbBackend::Sqlite => None,
            _ => Some(IsolationLevel::RepeatableRead),
        };
        let txn = self
            .db
            .begin_with_config(isolation, None)
            .await
            .map_err(classify_db_error)?;

        let counters = self
            .posts
            .counters_on(&txn, post_id)
            .await
            .map_err(classify_db_error)?
            .ok_or(AppError::NotFound)?;

        let state: VoteState = match voter_id {
            Some(voter_id) => self
                .votes
                .get_vote(&txn, voter_id, post_id)
                .await?
                .map(|v| v.value)
                .into(),
            None => VoteState::NoVote,
        };

        txn.commit().await.map_err(classify_db_error)?;
        Ok(VoteResult::new(counters, state))
    }

    /// Recounts the post's vote rows and compares them with the cached counters.
    pub async fn audit_counters(&self, post_id: Uuid) -> Result<CounterAudit, AppError> {
        self.with_post_lock(post_id, async {
            let txn = self.db.begin().await.map_err(classify_db_error)?;

            let stored = self
                .posts
                .lock_for_update(&txn, post_id)
                .await
                .map_err(classify_db_error)?
                .map(|p| Counters::new(p.up_votes, p.down_votes))
                .ok_or(AppError::NotFound)?;

            let up = self.votes.count_by_value(&txn, post_id, VoteValue::Up).await?;
            let down = self.votes.count_by_value(&txn, post_id, VoteValue::Down).await?;

            let audit = CounterAudit {
                stored,
                actual: Counters::new(to_counter(up)?, to_counter(down)?),
            };
            if !audit.is_consistent() {
                tracing::warn!(
                    %post_id,
                    stored_up = audit.stored.up,
                    stored_down = audit.stored.down,
                    actual_up = audit.actual.up,
                    actual_down = audit.actual.down,
                    "Vote counters drifted from vote rows"
                );
            }
            Ok::<_, AppError>((txn, audit))
        })
        .await
    }

    /// Runs `work` under the post's lock and commits the transaction it hands
    /// back. The deadline covers waiting for the lock and the work; the commit
    /// always runs to completion so a reported timeout means nothing was written.
    async fn with_post_lock<T, F>(&self, post_id: Uuid, work: F) -> Result<T, AppError>
    where
        F: Future<Output = Result<(DatabaseTransaction, T), AppError>>,
    {
        let locked = async {
            let guard = self.locks.acquire(post_id).await;
            work.await.map(|prepared| (guard, prepared))
        };

        let result = bounded_then_finish(
            self.config.lock_timeout,
            locked,
            |(guard, (txn, value))| async move {
                txn.commit().await.map_err(classify_db_error)?;
                drop(guard);
                Ok(value)
            },
        )
        .await;

        if let Err(AppError::Timeout) = result {
            tracing::warn!(
                %post_id,
                timeout_ms = self.config.lock_timeout.as_millis() as u64,
                "Vote timed out, transaction rolled back"
            );
        }
        result
    }

    async fn apply_vote(
        &self,
        voter_id: Uuid,
        post_id: Uuid,
        requested: VoteValue,
    ) -> Result<(DatabaseTransaction, (Transition, Counters)), AppError> {
        let txn = self.db.begin().await.map_err(classify_db_error)?;

        if self
            .posts
            .lock_for_update(&txn, post_id)
            .await
            .map_err(classify_db_error)?
            .is_none()
        {
            return Err(AppError::NotFound);
        }

        let current = self
            .votes
            .get_vote(&txn, voter_id, post_id)
            .await?
            .map(|v| v.value);
        let transition = Transition::plan(current, requested);

        match transition {
            Transition::Create(value) => {
                let (_, created) = self
                    .votes
                    .upsert_vote(&txn, voter_id, post_id, value)
                    .await?;
                if !created {
                    return Err(AppError::ConcurrencyConflict(format!(
                        "vote by {voter_id} on post {post_id} was inserted concurrently"
                    )));
                }
            }
            Transition::Retract(_) => {
                if !self.votes.delete_vote(&txn, voter_id, post_id).await? {
                    return Err(AppError::ConcurrencyConflict(format!(
                        "vote by {voter_id} on post {post_id} was removed concurrently"
                    )));
                }
            }
            Transition::Switch { to, .. } => {
                self.votes
                    .set_vote_value(&txn, voter_id, post_id, to)
                    .await?;
            }
        }

        let applied = self
            .posts
            .apply_delta(&txn, post_id, transition.delta())
            .await
            .map_err(classify_db_error)?;
        if !applied {
            return Err(AppError::NotFound);
        }

        let counters = self
            .posts
            .counters_on(&txn, post_id)
            .await
            .map_err(classify_db_error)?
            .ok_or(AppError::NotFound)?;
        if !counters.is_valid() {
            tracing::error!(
                %post_id,
                up = counters.up,
                down = counters.down,
                "Counter underflow, rolling back vote"
            );
            return Err(AppError::Internal(format!(
                "counter underflow on post {post_id}"
            )));
        }

        Ok((txn, (transition, counters)))
    }
}

/// Bounds `prepare` by `limit`; `finish` then runs without a deadline.
/// Dropping `prepare` on expiry drops whatever it held, rolling back an
/// open transaction.
async fn bounded_then_finish<P, T, F, Fut, R>(
    limit: Duration,
    prepare: P,
    finish: F,
) -> Result<R, AppError>
where
    P: Future<Output = Result<T, AppError>>,
    F: FnOnce(T) -> Fut,
    Fut: Future<Output = Result<R, AppError>>,
{
    let prepared = tokio::time::timeout(limit, prepare)
        .await
        .map_err(|_| AppError::Timeout)??;
    finish(prepared).await
}

fn to_counter(count: u64) -> Result<i32, AppError> {
    i32::try_from(count).map_err(|_| AppError::Internal(format!("vote count {count} overflows counter")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_finish_outlives_the_deadline() {
        let result = bounded_then_finish(
            Duration::from_millis(20),
            async { Ok(1) },
            |n| async move {
                // A commit slower than the whole budget still completes.
                tokio::time::sleep(Duration::from_millis(100)).await;
                Ok(n + 1)
            },
        )
        .await;
        assert_eq!(result, Ok(2));
    }

    #[tokio::test]
    async fn test_slow_prepare_times_out_before_finish() {
        let finished = Arc::new(AtomicBool::new(false));
        let flag = finished.clone();

        let result: Result<(), AppError> = bounded_then_finish(
            Duration::from_millis(20),
            async {
                tokio::time::sleep(Duration::from_millis(200)).await;
                Ok(())
            },
            |()| async move {
                flag.store(true, Ordering::SeqCst);
                Ok(())
            },
        )
        .await;

        assert_eq!(result, Err(AppError::Timeout));
        assert!(!finished.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_prepare_error_skips_finish() {
        let result: Result<(), AppError> = bounded_then_finish(
            Duration::from_secs(1),
            async { Err::<(), _>(AppError::NotFound) },
            |()| async { Ok(()) },
        )
        .await;
        assert_eq!(result, Err(AppError::NotFound));
    }
}
