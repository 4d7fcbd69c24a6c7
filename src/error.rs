//! Error types for Dreams
//!
//! The core only ever fails with `Validation` (the request refers to
//! invalid or conflicting data) or `Authorization` (the actor lacks the
//! role or membership the operation needs). The remaining variants belong
//! to the collaborators around the core: sessions, snapshots, media.
//!
//! All errors convert into an HTTP response via `IntoResponse`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Application-wide error type
#[derive(Debug, Error)]
pub enum AppError {
    /// Invalid or inconsistent input (400)
    #[error("{0}")]
    Validation(String),

    /// Missing permission or membership (403)
    #[error("{0}")]
    Authorization(String),

    /// No credential presented at all (401)
    #[error("Authentication required")]
    Unauthorized,

    /// Snapshot or media file I/O failed (500)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Fetching a remote image failed (400)
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// Configuration error (500)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal server error (500)
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation(message.into())
    }

    pub fn authorization(message: impl Into<String>) -> Self {
        AppError::Authorization(message.into())
    }

    /// Stable label used for metrics and the `name` field of error bodies
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "validation",
            AppError::Authorization(_) => "authorization",
            AppError::Unauthorized => "unauthorized",
            AppError::Storage(_) => "storage",
            AppError::HttpClient(_) => "http_client",
            AppError::Config(_) => "config",
            AppError::Internal(_) => "internal",
        }
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Storage(err.to_string())
    }
}

impl IntoResponse for AppError {
    /// Maps each variant to a status code and a JSON body of shape
    /// `{"code": 400, "name": "validation", "message": "..."}`.
    fn into_response(self) -> Response {
        use axum::Json;

        let (status, message) = match &self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Authorization(msg) => (StatusCode::FORBIDDEN, msg.clone()),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, self.to_string()),
            AppError::HttpClient(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            AppError::Storage(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
            AppError::Config(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
            AppError::Internal(error) => {
                tracing::error!(error = %error, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        use crate::metrics::ERRORS_TOTAL;
        ERRORS_TOTAL.with_label_values(&[self.kind()]).inc();

        let body = Json(serde_json::json!({
            "code": status.as_u16(),
            "name": self.kind(),
            "message": message,
        }));

        (status, body).into_response()
    }
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;
