use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum AppError {
    #[error("Invalid vote value: {0} (expected 1 or -1)")]
    InvalidVoteValue(i64),

    #[error("Post not found")]
    NotFound,

    #[error("Voter identity required")]
    Unauthenticated,

    #[error("Concurrent update conflict: {0}")]
    ConcurrencyConflict(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Transient failures a caller may retry after the failed scope has rolled back.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ConcurrencyConflict(_) | Self::Timeout)
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidVoteValue(_) => "invalid_vote_value",
            Self::NotFound => "not_found",
            Self::Unauthenticated => "unauthenticated",
            Self::ConcurrencyConflict(_) => "concurrency_conflict",
            Self::Timeout => "timeout",
            Self::Storage(_) => "storage",
            Self::Internal(_) => "internal",
        }
    }

    pub fn user_message(&self) -> &str {
        match self {
            Self::InvalidVoteValue(_) => "Votes must be either up or down.",
            Self::NotFound => "That post does not exist anymore.",
            Self::Unauthenticated => "You need to log in to vote.",
            Self::ConcurrencyConflict(_) => "Your vote collided with another one. Try again.",
            Self::Timeout => "Voting is busy right now. Try again.",
            Self::Storage(_) | Self::Internal(_) => "Something went wrong on our side. Try again later.",
        }
    }
}

#[cfg(feature = "http")]
mod http_impl {
    use super::AppError;
    use axum::http::StatusCode;
    use axum::response::{IntoResponse, Response};
    use axum::Json;

    #[derive(serde::Serialize)]
    struct ErrorResponse {
        code: &'static str,
        message: String,
    }

    impl IntoResponse for AppError {
        fn into_response(self) -> Response {
            let status = match &self {
                AppError::InvalidVoteValue(_) => StatusCode::BAD_REQUEST,
                AppError::NotFound => StatusCode::NOT_FOUND,
                AppError::Unauthenticated => StatusCode::UNAUTHORIZED,
                AppError::ConcurrencyConflict(_) => StatusCode::CONFLICT,
                AppError::Timeout => StatusCode::GATEWAY_TIMEOUT,
                AppError::Storage(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            };
            let body = ErrorResponse {
                code: self.code(),
                message: self.user_message().to_string(),
            };
            (status, Json(body)).into_response()
        }
    }
}
