/// Unified error types for the admissions queue service
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for the queue service
#[derive(Error, Debug)]
pub enum QueueError {
    /// Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Authentication errors
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Authorization errors
    #[error("Not authorized: {0}")]
    Authorization(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Queue status transition errors
    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    /// Rate limiting errors
    #[error("Rate limit exceeded")]
    RateLimitExceeded { retry_after: std::time::Duration },

    /// Not found errors
    #[error("Not found: {0}")]
    NotFound(String),

    /// Conflict errors (e.g., duplicate email)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Internal server errors
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Account deactivated
    #[error("Account deactivated: {0}")]
    AccountDeactivated(String),
}

/// API error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    pub error: String,
    pub message: String,
}

/// Convert QueueError to HTTP response
impl IntoResponse for QueueError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            QueueError::Authentication(_) => (
                StatusCode::UNAUTHORIZED,
                "NotAuthenticated",
                self.to_string(),
            ),
            QueueError::Authorization(_) => (
                StatusCode::FORBIDDEN,
                "Forbidden",
                self.to_string(),
            ),
            QueueError::Validation(_) => (
                StatusCode::BAD_REQUEST,
                "ValidationError",
                self.to_string(),
            ),
            QueueError::NotFound(_) => (
                StatusCode::NOT_FOUND,
                "NotFound",
                self.to_string(),
            ),
            QueueError::Conflict(_) => (
                StatusCode::CONFLICT,
                "Conflict",
                self.to_string(),
            ),
            QueueError::InvalidTransition { .. } => (
                StatusCode::CONFLICT,
                "InvalidTransition",
                self.to_string(),
            ),
            QueueError::RateLimitExceeded { .. } => (
                StatusCode::TOO_MANY_REQUESTS,
                "RateLimitExceeded",
                "Rate limit exceeded".to_string(),
            ),
            QueueError::AccountDeactivated(_) => (
                StatusCode::FORBIDDEN,
                "AccountDeactivated",
                self.to_string(),
            ),
            QueueError::Database(_) | QueueError::Internal(_) | QueueError::Io(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "InternalServerError",
                "Internal server error".to_string(), // Don't leak details
            ),
        };

        if status.is_server_error() {
            crate::metrics::record_error(error_code, "api");
            tracing::error!(error = %self, "Request failed");
        }

        let body = Json(ApiErrorResponse {
            error: error_code.to_string(),
            message,
        });

        (status, body).into_response()
    }
}

/// Result type alias for queue service operations
pub type QueueResult<T> = Result<T, QueueError>;
