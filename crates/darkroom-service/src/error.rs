use darkroom_core::error::CoreError;
use thiserror::Error;

use crate::cloud::CloudError;

/// Service layer errors - combines all error types
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error(transparent)]
    DatabaseError(#[from] darkroom_db::error::DbError),

    #[error(transparent)]
    CloudError(#[from] CloudError),

    #[error("Authorization error: {0}")]
    AuthorizationError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    /// The requested window collides with other bookings.
    #[error("Schedule conflict: {0}")]
    ScheduleConflict(String),

    #[error("Retention window expired: {0}")]
    RetentionExpired(String),

    #[error("Already resolved: {0}")]
    AlreadyResolved(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Invariant violation: {0}")]
    InvariantViolation(&'static str),
}

impl From<CoreError> for ServiceError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ValidationError(message) | CoreError::InvalidInput(message) => {
                Self::ValidationError(message)
            }
            CoreError::NotAuthorized(message) => Self::AuthorizationError(message),
            CoreError::ConfigError(message) => Self::InvalidConfiguration(message),
            CoreError::InvariantViolation(message) => Self::InvariantViolation(message),
        }
    }
}

impl ServiceError {
    /// Validation and authorization failures interrupt the caller; nothing was written.
    #[must_use]
    pub const fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::ValidationError(_) | Self::AuthorizationError(_) | Self::ScheduleConflict(_)
        )
    }
}

pub type ServiceResult<T> = std::result::Result<T, ServiceError>;
