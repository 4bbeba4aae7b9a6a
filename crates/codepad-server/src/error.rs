//! Error types for the codepad server.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use codepad_core::ExecutionError;
use serde_json::json;
use thiserror::Error;

/// Result type alias for server operations.
pub type Result<T> = std::result::Result<T, ServerError>;

#[derive(Error, Debug)]
pub enum ServerError {
    /// Failure reported by the session manager or executor
    #[error(transparent)]
    Execution(#[from] ExecutionError),

    /// Invalid request format
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Request body over the configured limit
    #[error("Request body too large: {0}")]
    PayloadTooLarge(String),

    /// Server configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal server error
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ServerError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

/// Convert ServerError to HTTP status code
impl ServerError {
    pub fn status_code(&self) -> u16 {
        match self {
            ServerError::Execution(e) => match e {
                ExecutionError::UnsupportedLanguage(_) => 400,
                ExecutionError::CapacityExceeded(_) => 429,
                ExecutionError::SessionNotFound(_) => 404,
                ExecutionError::SessionTerminated(_) => 410,
                ExecutionError::CompileError(_)
                | ExecutionError::SpawnError { .. }
                | ExecutionError::IoError(_)
                | ExecutionError::Timeout(_)
                | ExecutionError::ConfigError(_) => 500,
            },
            ServerError::InvalidRequest(_) => 400,
            ServerError::PayloadTooLarge(_) => 413,
            ServerError::Config(_) | ServerError::Internal(_) => 500,
        }
    }

    pub fn error_type(&self) -> &'static str {
        match self {
            ServerError::Execution(e) => match e {
                ExecutionError::UnsupportedLanguage(_) => "unsupported_language",
                ExecutionError::CompileError(_) => "compile_error",
                ExecutionError::CapacityExceeded(_) => "capacity_exceeded",
                ExecutionError::SessionNotFound(_) => "session_not_found",
                ExecutionError::SessionTerminated(_) => "session_terminated",
                ExecutionError::SpawnError { .. } => "spawn_error",
                ExecutionError::IoError(_) => "io_error",
                ExecutionError::Timeout(_) => "timeout",
                ExecutionError::ConfigError(_) => "config_error",
            },
            ServerError::InvalidRequest(_) => "invalid_request",
            ServerError::PayloadTooLarge(_) => "payload_too_large",
            ServerError::Config(_) => "config_error",
            ServerError::Internal(_) => "internal_error",
        }
    }
}

impl From<JsonRejection> for ServerError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            Self::PayloadTooLarge(rejection.body_text())
        } else {
            Self::InvalidRequest(rejection.body_text())
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            log::error!("Request failed: {}", self);
        } else {
            log::debug!("Request rejected ({}): {}", status, self);
        }

        let body = Json(json!({
            "error": self.to_string(),
            "type": self.error_type(),
            "timestamp": chrono::Utc::now()
        }));
        (status, body).into_response()
    }
}
