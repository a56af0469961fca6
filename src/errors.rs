use axum::http::StatusCode;
use thiserror::Error;

/// Failures reported by a persistence backend.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage quota exceeded ({needed} bytes needed, {limit} allowed)")]
    QuotaExceeded { needed: usize, limit: usize },
}

/// Expected failures of document store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no document found")]
    NoDocument,

    #[error("goal {0} not found")]
    GoalNotFound(usize),

    #[error("goal '{0}' not found")]
    GoalNotFoundByName(String),

    #[error("reward {0} not found")]
    RewardNotFound(usize),

    #[error("activity {activity} not found on reward {reward}")]
    ActivityNotFound { reward: usize, activity: usize },

    #[error("activity '{0}' not found")]
    ActivityTextNotFound(String),

    #[error("goal '{0}' already exists")]
    DuplicateGoal(String),

    #[error("reward '{0}' already exists")]
    DuplicateReward(String),

    #[error("{0}")]
    InvalidValue(String),

    #[error("goal '{0}' cannot be logged until required goals are completed today")]
    GoalNotEligible(String),

    #[error("failed to encode document: {0}")]
    Encode(#[from] serde_json::Error),

    #[error(transparent)]
    Storage(#[from] BackendError),
}

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::CONFLICT,
            message: message.into(),
        }
    }

    pub fn internal(err: impl std::error::Error) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: err.to_string(),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NoDocument
            | StoreError::GoalNotFound(_)
            | StoreError::GoalNotFoundByName(_)
            | StoreError::RewardNotFound(_)
            | StoreError::ActivityNotFound { .. }
            | StoreError::ActivityTextNotFound(_) => Self::not_found(err.to_string()),
            StoreError::DuplicateGoal(_) | StoreError::DuplicateReward(_) => {
                Self::conflict(err.to_string())
            }
            StoreError::InvalidValue(_) | StoreError::GoalNotEligible(_) => {
                Self::bad_request(err.to_string())
            }
            StoreError::Encode(_) | StoreError::Storage(_) => Self::internal(err),
        }
    }
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        (self.status, self.message).into_response()
    }
}
