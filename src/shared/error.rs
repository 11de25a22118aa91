//! Application Error Types
//!
//! Centralized error handling with Axum integration. Every coordinator
//! operation returns `Result<T, AppError>`; the transport boundary maps the
//! error kind onto its own protocol (HTTP status, WebSocket error frame).

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A referenced entity does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input or an invariant violation the caller could have avoided
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// The caller lacks standing on the entity
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Missing or invalid credentials at the transport boundary
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// A collaborator (store, cache, blob storage) failed to answer
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

/// Copyable error classification used for protocol mapping and metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    BadRequest,
    Forbidden,
    Unauthorized,
    StoreUnavailable,
    Unexpected,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::BadRequest => "bad_request",
            Self::Forbidden => "forbidden",
            Self::Unauthorized => "unauthorized",
            Self::StoreUnavailable => "store_unavailable",
            Self::Unexpected => "unexpected",
        }
    }

    /// Numeric error code carried in response bodies.
    pub fn code(&self) -> u16 {
        match self {
            Self::Unexpected => 10000,
            Self::NotFound => 10001,
            Self::BadRequest => 10002,
            Self::Unauthorized => 10003,
            Self::Forbidden => 10004,
            Self::StoreUnavailable => 10005,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::BadRequest => StatusCode::BAD_REQUEST,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::StoreUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::Unexpected => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AppError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::NotFound(_) => ErrorKind::NotFound,
            AppError::BadRequest(_) => ErrorKind::BadRequest,
            AppError::Forbidden(_) => ErrorKind::Forbidden,
            AppError::Unauthorized(_) => ErrorKind::Unauthorized,
            AppError::StoreUnavailable(_) => ErrorKind::StoreUnavailable,
            AppError::Unexpected(_) => ErrorKind::Unexpected,
        }
    }

    /// Message safe to show to the acting client. Internal details of
    /// collaborator failures stay in the logs.
    pub fn public_message(&self) -> String {
        match self {
            AppError::NotFound(msg)
            | AppError::BadRequest(msg)
            | AppError::Forbidden(msg)
            | AppError::Unauthorized(msg) => msg.clone(),
            AppError::StoreUnavailable(_) => "Service temporarily unavailable".into(),
            AppError::Unexpected(_) => "Internal server error".into(),
        }
    }

    /// Log internal kinds; client-caused kinds are not worth an error line.
    pub fn log(&self) {
        match self {
            AppError::StoreUnavailable(e) => tracing::error!("Store unavailable: {}", e),
            AppError::Unexpected(e) => tracing::error!("Unexpected error: {}", e),
            _ => tracing::debug!(kind = %self.kind(), "Request rejected: {}", self),
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        AppError::StoreUnavailable(format!("Database error: {}", e))
    }
}

impl From<sqlx::migrate::MigrateError> for AppError {
    fn from(e: sqlx::migrate::MigrateError) -> Self {
        AppError::StoreUnavailable(format!("Migration error: {}", e))
    }
}

impl From<redis::RedisError> for AppError {
    fn from(e: redis::RedisError) -> Self {
        AppError::StoreUnavailable(format!("Redis error: {}", e))
    }
}

impl From<std::io::Error> for AppError {
    fn from(e: std::io::Error) -> Self {
        AppError::StoreUnavailable(format!("I/O error: {}", e))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        AppError::Unexpected(format!("Serialization error: {}", e))
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: u16,
    pub kind: ErrorKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<FieldError>>,
}

/// Field-level validation error
#[derive(Debug, Clone, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl From<&AppError> for ErrorResponse {
    fn from(err: &AppError) -> Self {
        let kind = err.kind();
        Self {
            code: kind.code(),
            kind,
            message: err.public_message(),
            errors: None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.log();
        let status = self.kind().status();
        let body = ErrorResponse::from(&self);

        (status, Json(body)).into_response()
    }
}
