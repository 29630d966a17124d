use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;

/// Application error types surfaced to HTTP callers
#[derive(Debug)]
pub enum AppError {
    /// Malformed inbound request (field-level message)
    BadRequest(String),
    /// Requested record does not exist
    NotFound(String),
    /// Log-store read failed (query path only; writes never surface)
    StoreError { context: &'static str, source: crate::store::StoreError },
    /// Internal server error
    InternalError(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            Self::NotFound(msg) => write!(f, "Not found: {}", msg),
            Self::StoreError { context, source } => write!(f, "{}: {}", context, source),
            Self::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::StoreError { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "Invalid request", msg.clone()),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, "Not found", msg.clone()),
            Self::StoreError { context, source } => {
                tracing::error!(error = %source, "{}", context);
                (StatusCode::INTERNAL_SERVER_ERROR, *context, source.to_string())
            }
            Self::InternalError(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error",
                msg.clone(),
            ),
        };

        let body = Json(json!({
            "error": error,
            "details": details,
        }));

        (status, body).into_response()
    }
}
