/// Error types for Clip Service
///
/// Errors are converted to appropriate HTTP responses for API clients.
/// Server-side details are logged and never echoed back to the caller.
use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use serde::{Deserialize, Serialize};
use std::io;
use thiserror::Error;

/// Result type for clip-service operations
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error types
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// Filesystem operation failed
    #[error("IO error: {0}")]
    IoError(String),

    /// Malformed or missing request input
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// File extension outside the allow-list
    #[error("Unsupported file type: {0}")]
    UnsupportedMediaType(String),

    /// Body exceeds the upload ceiling
    #[error("Payload too large: limit is {limit} bytes")]
    PayloadTooLarge { limit: u64 },

    /// No valid session
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated but not a member
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Conflicting state change
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    fn kind(&self) -> (&'static str, &'static str) {
        match self {
            AppError::DatabaseError(_) => ("server_error", "DATABASE_ERROR"),
            AppError::IoError(_) => ("server_error", "STORAGE_ERROR"),
            AppError::BadRequest(_) => ("validation_error", "INVALID_REQUEST"),
            AppError::UnsupportedMediaType(_) => ("validation_error", "UNSUPPORTED_FILE_TYPE"),
            AppError::PayloadTooLarge { .. } => ("validation_error", "PAYLOAD_TOO_LARGE"),
            AppError::Unauthorized(_) => ("authentication_error", "UNAUTHORIZED"),
            AppError::Forbidden(_) => ("authorization_error", "NOT_A_MEMBER"),
            AppError::NotFound(_) => ("not_found_error", "NOT_FOUND"),
            AppError::Conflict(_) => ("conflict_error", "CONFLICT"),
            AppError::Internal(_) => ("server_error", "INTERNAL_SERVER_ERROR"),
        }
    }
}

/// API error body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status: u16,
    pub error_type: String,
    pub code: String,
    pub timestamp: String,
}

impl ErrorResponse {
    pub fn new(error: &str, message: &str, status: u16, error_type: &str, code: &str) -> Self {
        Self {
            error: error.to_string(),
            message: message.to_string(),
            status,
            error_type: error_type.to_string(),
            code: code.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::DatabaseError(_) | AppError::IoError(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::BadRequest(_) | AppError::UnsupportedMediaType(_) => StatusCode::BAD_REQUEST,
            AppError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let (error_type, code) = self.kind();

        let message = if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        let response = ErrorResponse::new(
            status.canonical_reason().unwrap_or("Error"),
            &message,
            status.as_u16(),
            error_type,
            code,
        );

        HttpResponse::build(status).json(response)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::DatabaseError(err.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for AppError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        AppError::DatabaseError(err.to_string())
    }
}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        AppError::IoError(err.to_string())
    }
}

impl From<actix_multipart::MultipartError> for AppError {
    fn from(err: actix_multipart::MultipartError) -> Self {
        AppError::BadRequest(format!("malformed multipart body: {err}"))
    }
}

impl From<video_core::InvalidTransition> for AppError {
    fn from(err: video_core::InvalidTransition) -> Self {
        AppError::Conflict(err.to_string())
    }
}
