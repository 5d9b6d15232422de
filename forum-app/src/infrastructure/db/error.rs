use forum_errors::AppError;
use sea_orm::{DbErr, SqlErr};
use uuid::Uuid;

// Lowercased fragments of Postgres/SQLite messages for failures that go away on retry.
const TRANSIENT_MARKERS: &[&str] = &[
    "could not serialize access",
    "deadlock detected",
    "lock not available",
    "database is locked",
    "database table is locked",
];

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("invalid vote value: {0}")]
    InvalidVoteValue(i64),

    #[error("no vote by {voter_id} on post {post_id}")]
    NotFound { voter_id: Uuid, post_id: Uuid },

    #[error(transparent)]
    Db(#[from] DbErr),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::InvalidVoteValue(value) => AppError::InvalidVoteValue(value),
            // The aggregator only updates a vote it has just read in the same scope.
            StoreError::NotFound { .. } => AppError::Internal(err.to_string()),
            StoreError::Db(db) => classify_db_error(db),
        }
    }
}

/// Maps a database error onto the public taxonomy, separating retryable conflicts.
pub fn classify_db_error(err: DbErr) -> AppError {
    if let Some(SqlErr::UniqueConstraintViolation(msg)) = err.sql_err() {
        return AppError::ConcurrencyConflict(msg);
    }

    match &err {
        DbErr::ConnectionAcquire(_) => AppError::ConcurrencyConflict(err.to_string()),
        DbErr::RecordNotFound(_) => AppError::NotFound,
        _ => {
            let msg = err.to_string();
            let lower = msg.to_lowercase();
            if TRANSIENT_MARKERS.iter().any(|marker| lower.contains(marker)) {
                AppError::ConcurrencyConflict(msg)
            } else {
                AppError::Storage(msg)
            }
        }
    }
}
