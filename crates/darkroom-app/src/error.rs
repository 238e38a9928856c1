use salvo::http::StatusCode;
use salvo::writing::Json;
use salvo::{Depot, Request, Response, Writer, async_trait};
use serde::Serialize;
use thiserror::Error;

use darkroom_service::error::ServiceError;

/// Application-level errors (HTTP layer)
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    ServiceError(#[from] ServiceError),

    #[error(transparent)]
    DatabaseError(#[from] darkroom_db::error::DbError),

    #[error(transparent)]
    CoreError(#[from] darkroom_core::error::CoreError),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not authenticated")]
    NotAuthenticated,
}

pub type AppResult<T> = std::result::Result<T, AppError>;

/// ## Summary
/// Error response payload
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl AppError {
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotAuthenticated => StatusCode::UNAUTHORIZED,
            Self::ServiceError(err) => match err {
                ServiceError::ValidationError(_) => StatusCode::BAD_REQUEST,
                ServiceError::AuthorizationError(_) => StatusCode::FORBIDDEN,
                ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
                ServiceError::AlreadyResolved(_)
                | ServiceError::RetentionExpired(_)
                | ServiceError::ScheduleConflict(_) => StatusCode::CONFLICT,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::CoreError(darkroom_core::error::CoreError::NotAuthorized(_)) => StatusCode::FORBIDDEN,
            Self::CoreError(
                darkroom_core::error::CoreError::ValidationError(_)
                | darkroom_core::error::CoreError::InvalidInput(_),
            ) => StatusCode::BAD_REQUEST,
            Self::CoreError(_) | Self::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[async_trait]
impl Writer for AppError {
    async fn write(self, _req: &mut Request, _depot: &mut Depot, res: &mut Response) {
        let status = self.status_code();
        // Internal details stay in the log.
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "Request failed");
            "Internal server error".to_string()
        } else {
            tracing::debug!(error = %self, status = %status, "Request rejected");
            self.to_string()
        };
        res.status_code(status);
        res.render(Json(ErrorResponse { error: message }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_errors_map_to_statuses() {
        let cases = [
            (ServiceError::ValidationError("x".into()), StatusCode::BAD_REQUEST),
            (ServiceError::AuthorizationError("x".into()), StatusCode::FORBIDDEN),
            (ServiceError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (ServiceError::AlreadyResolved("x".into()), StatusCode::CONFLICT),
            (ServiceError::RetentionExpired("x".into()), StatusCode::CONFLICT),
            (ServiceError::ScheduleConflict("x".into()), StatusCode::CONFLICT),
            (ServiceError::InvariantViolation("x"), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, expected) in cases {
            assert_eq!(AppError::from(err).status_code(), expected);
        }
    }
}
