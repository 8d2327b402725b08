//! Domain error types for the clan community API.
//!
//! Uses thiserror for Display and actix `ResponseError` for the HTTP body.

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use std::fmt;

use crate::services::profiles::ProfileError;

/// Application-level errors.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Backend (table or auth API) failure. Detail is logged, not returned.
    #[error("Backend error: {0}")]
    Backend(String),

    /// Backend failure on an admin action. Detail is returned verbatim.
    #[error("{0}")]
    AdminAction(String),

    /// Resource not found
    #[error("{0} not found")]
    NotFound(String),

    /// Invalid input data
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Authentication failed
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated, but not allowed
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The profile table does not exist
    #[error("Profile store is not available")]
    Unavailable,
}

impl AppError {
    /// Map a profile error raised by an admin action, keeping backend detail.
    pub fn admin(err: ProfileError) -> Self {
        match err {
            ProfileError::Store(detail) | ProfileError::Identity(detail) => {
                AppError::AdminAction(detail)
            }
            ProfileError::ColumnUnknown(_) => AppError::AdminAction(err.to_string()),
            other => other.into(),
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Backend(_) | AppError::AdminAction(_) => StatusCode::BAD_GATEWAY,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let (error_code, response_message) = match self {
            AppError::Backend(detail) => {
                tracing::error!("Backend error: {}", detail);
                (
                    "BACKEND_ERROR",
                    "The profile backend could not complete the request".to_string(),
                )
            }
            AppError::AdminAction(detail) => {
                tracing::warn!("Admin action failed: {}", detail);
                ("BACKEND_ERROR", detail.clone())
            }
            AppError::NotFound(_) => ("NOT_FOUND", self.to_string()),
            AppError::InvalidInput(_) => ("INVALID_INPUT", self.to_string()),
            AppError::Unauthorized(_) => ("UNAUTHORIZED", self.to_string()),
            AppError::Forbidden(_) => ("FORBIDDEN", self.to_string()),
            AppError::Unavailable => ("STORE_MISSING", self.to_string()),
        };

        HttpResponse::build(self.status_code()).json(ErrorResponse {
            error: error_code.to_string(),
            message: response_message,
        })
    }
}

/// Error response body matching OpenAPI schema.
#[derive(Debug, serde::Serialize, serde::Deserialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.error, self.message)
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;

impl From<ProfileError> for AppError {
    fn from(err: ProfileError) -> Self {
        match err {
            ProfileError::StoreMissing => AppError::Unavailable,
            ProfileError::NotFound(user_id) => AppError::NotFound(format!("Profile {}", user_id)),
            ProfileError::MissingIdentity => AppError::InvalidInput(err.to_string()),
            ProfileError::ColumnUnknown(_) => AppError::Backend(err.to_string()),
            ProfileError::Store(detail) | ProfileError::Identity(detail) => {
                AppError::Backend(detail)
            }
            ProfileError::AlreadyExists => AppError::Backend(err.to_string()),
        }
    }
}
