//! Error types for Postboard
//!
//! All errors in the application are converted to `AppError`,
//! which implements `IntoResponse` for proper HTTP error responses.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Application-wide error type
///
/// Store-layer failures only distinguish "not found" (modelled as `Option`
/// at the store boundary) from everything else; everything else ends up in
/// one of the 500 variants below and is never detailed to the client.
#[derive(Debug, Error)]
pub enum AppError {
    /// Malformed or missing input (400)
    #[error("{0}")]
    Validation(String),

    /// Bad credentials (401)
    #[error("{0}")]
    Unauthorized(String),

    /// Login required but the caller is anonymous (400)
    #[error("invalid session")]
    InvalidSession,

    /// Resource not found (404)
    #[error("{0}")]
    NotFound(String),

    /// Request body not received in time (408)
    #[error("request timed out")]
    RequestTimeout,

    /// Upload exceeds the configured size (413)
    #[error("payload too large: exceeds {0} bytes")]
    PayloadTooLarge(usize),

    /// Database error (500)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Password hashing failure (500)
    #[error("Password hashing error: {0}")]
    PasswordHash(String),

    /// OS randomness unavailable (500)
    #[error("Entropy source error: {0}")]
    Entropy(#[from] rand::Error),

    /// Media storage error (500)
    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    /// Configuration error (500)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal server error (500)
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Shorthand for the generic bad-request response.
    pub fn invalid_request() -> Self {
        AppError::Validation("invalid request".to_string())
    }

    fn status_and_type(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "validation"),
            AppError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "unauthorized"),
            AppError::InvalidSession => (StatusCode::BAD_REQUEST, "invalid_session"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            AppError::RequestTimeout => (StatusCode::REQUEST_TIMEOUT, "request_timeout"),
            AppError::PayloadTooLarge(_) => (StatusCode::PAYLOAD_TOO_LARGE, "payload_too_large"),
            AppError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "database"),
            AppError::PasswordHash(_) => (StatusCode::INTERNAL_SERVER_ERROR, "password_hash"),
            AppError::Entropy(_) => (StatusCode::INTERNAL_SERVER_ERROR, "entropy"),
            AppError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "storage"),
            AppError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "config"),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
        }
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!(error = %rejection, "Rejected request body");
        AppError::invalid_request()
    }
}

impl IntoResponse for AppError {
    /// Convert error to HTTP response
    ///
    /// Client errors carry their message; server errors are logged and
    /// replaced with a generic message.
    fn into_response(self) -> Response {
        use axum::Json;

        let (status, error_type) = self.status_and_type();

        let error_message = if status.is_server_error() {
            tracing::error!(error = %self, error_type, "Request failed");
            "internal server error".to_string()
        } else {
            self.to_string()
        };

        crate::metrics::ERRORS_TOTAL
            .with_label_values(&[error_type])
            .inc();

        let body = Json(serde_json::json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;
