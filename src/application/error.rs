use thiserror::Error;

use crate::domain::ValidationError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Owner not found: {0}")]
    OwnerNotFound(String),

    #[error("Owner already exists: {0}")]
    OwnerAlreadyExists(String),

    #[error("Storage unavailable: {0:#}")]
    Storage(#[from] anyhow::Error),
}

impl AppError {
    /// True when the caller can fix the request and try again.
    pub fn is_user_error(&self) -> bool {
        !matches!(self, AppError::Storage(_))
    }
}
