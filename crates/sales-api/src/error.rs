//! エラー型定義 (sales-api)

use axum::response::{IntoResponse, Response};
use axum::Json;
use http::StatusCode;
use sales_core::a2a::ErrorResponse;
use thiserror::Error;
use tracing::error;

/// sales-api のエラー型
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Authentication failed")]
    AuthFailed,

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Core error: {0}")]
    Core(sales_core::Error),
}

impl ApiError {
    /// HTTP status and machine-readable code
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::AuthFailed => (StatusCode::UNAUTHORIZED, "unauthorized"),
            Self::TaskNotFound(_) => (StatusCode::NOT_FOUND, "task_not_found"),
            Self::SessionNotFound(_) => (StatusCode::NOT_FOUND, "session_not_found"),
            Self::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "invalid_request"),
            Self::Core(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        }
    }
}

impl From<sales_core::Error> for ApiError {
    fn from(e: sales_core::Error) -> Self {
        match e {
            sales_core::Error::TaskNotFound(id) => Self::TaskNotFound(id),
            sales_core::Error::SessionNotFound(id) => Self::SessionNotFound(id),
            sales_core::Error::InvalidRequest(reason) => Self::InvalidRequest(reason),
            other => Self::Core(other),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let message = match &self {
            Self::Core(e) => {
                error!("Request failed: {}", e);
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        let body = ErrorResponse {
            code: code.to_string(),
            message,
        };
        (status, Json(body)).into_response()
    }
}

/// Result 型エイリアス
pub type Result<T> = std::result::Result<T, ApiError>;
