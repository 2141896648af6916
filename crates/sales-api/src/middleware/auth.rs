//! Authentication middleware
//!
//! Provides API key authentication for protected endpoints.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use http::header;
use std::sync::Arc;
use tracing::warn;

use crate::error::ApiError;

/// Configured API key, if any
pub type ApiKey = Option<Arc<str>>;

/// API key authentication middleware
pub async fn auth_middleware(
    State(expected): State<ApiKey>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let provided = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));

    if validate_api_key(provided, expected.as_deref()) {
        Ok(next.run(request).await)
    } else {
        warn!(path = %request.uri().path(), "Rejected request with missing or invalid API key");
        Err(ApiError::AuthFailed)
    }
}

/// Simple API key validation
///
/// Every request is allowed when no key is configured.
pub fn validate_api_key(provided: Option<&str>, expected: Option<&str>) -> bool {
    match (provided, expected) {
        (Some(p), Some(e)) => p == e,
        (_, None) => true,
        (None, Some(_)) => false,
    }
}
