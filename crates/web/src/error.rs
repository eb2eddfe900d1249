//! Unified error handling with Sentry integration.
//!
//! Route handlers return `Result<T, AppError>`. Form handlers turn
//! validation and ownership failures into flash messages themselves; what
//! reaches `AppError` is rendered here:
//!
//! - `NotFound` renders the 404 page
//! - server-side failures are captured to Sentry and shown as a generic
//!   message without internal detail
//! - everything else becomes a short plain-text status response

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use delicious_core::ValidationError;

use crate::db::RepositoryError;
use crate::routes::errors::NotFoundTemplate;
use crate::services::{ServiceError, UploadError};

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Photo upload could not be processed.
    #[error("Upload error: {0}")]
    Upload(#[from] UploadError),

    /// Input failed validation.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Session store failure.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// User may not touch this resource.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Request body exceeded the upload limit.
    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Validation(e) => Self::Validation(e),
            ServiceError::Authorization(e) => Self::Forbidden(e.to_string()),
            ServiceError::NotFound(what) => Self::NotFound(what.to_string()),
            ServiceError::Upstream(e) => Self::Database(e),
        }
    }
}

impl AppError {
    /// Whether this error is our fault rather than the client's.
    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::Database(_)
                | Self::Session(_)
                | Self::Upload(UploadError::Io(_) | UploadError::Join(_))
        )
    }

    fn status(&self) -> StatusCode {
        match self {
            _ if self.is_server_error() => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let status = self.status();

        // Don't expose internal error details to clients
        let message = match self {
            Self::NotFound(_) => return (status, NotFoundTemplate::bare()).into_response(),
            _ if status.is_server_error() => "Internal server error".to_string(),
            Self::Validation(e) | Self::Upload(UploadError::Rejected(e)) => e.to_string(),
            Self::Upload(UploadError::Decode(_)) => "Could not read the uploaded image".to_string(),
            Self::Unauthorized(msg)
            | Self::Forbidden(msg)
            | Self::BadRequest(msg)
            | Self::PayloadTooLarge(msg) => msg,
            other => other.to_string(),
        };

        (status, message).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Associate subsequent Sentry events with the signed-in user.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{AuthorizationError, NOT_OWNER};

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("store".to_string());
        assert_eq!(err.to_string(), "Not found: store");

        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            get_status(AppError::NotFound("test".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Unauthorized("test".to_string())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AppError::BadRequest("test".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::PayloadTooLarge("test".to_string())),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            get_status(AppError::Validation(ValidationError::single("name", "x"))),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Database(RepositoryError::DataCorruption(
                "bad row".to_string()
            ))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_service_errors_convert() {
        let err: AppError = ServiceError::Authorization(AuthorizationError(NOT_OWNER)).into();
        assert!(matches!(&err, AppError::Forbidden(msg) if msg == NOT_OWNER));
        assert_eq!(get_status(err), StatusCode::FORBIDDEN);

        let err: AppError = ServiceError::NotFound("store").into();
        assert_eq!(get_status(err), StatusCode::NOT_FOUND);

        let err: AppError =
            ServiceError::Upstream(RepositoryError::Conflict("slug".to_string())).into();
        assert!(err.is_server_error());
    }
}
