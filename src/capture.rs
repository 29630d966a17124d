//! Request/response capture for audit logging
//!
//! Buffers both bodies once, hands the wrapped handler and the caller fresh bodies over
//! the same bytes, and queues an [`ApiLogRecord`] for the configured endpoint only.
//! Logging happens on success, error responses and handler panics alike; it never
//! changes what the caller receives.

use axum::{
    body::{Body, Bytes},
    extract::{Request, State},
    http::Method,
    middleware::Next,
    response::{IntoResponse, Response},
};
use futures::FutureExt;
use serde_json::{json, Value};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use crate::error::AppError;
use crate::store::{ApiLogRecord, RecordWriter};

/// Shared state for [`capture_middleware`]
pub struct CaptureState {
    writer: RecordWriter,
    endpoint: String,
    max_body_bytes: usize,
}

impl CaptureState {
    pub fn new(writer: RecordWriter, endpoint: impl Into<String>, max_body_bytes: usize) -> Self {
        Self {
            writer,
            endpoint: endpoint.into(),
            max_body_bytes,
        }
    }

    fn dispatch(
        &self,
        method: &Method,
        status_code: u16,
        started: Instant,
        request_data: Value,
        response_data: Value,
    ) {
        let response_time = started.elapsed().as_millis() as u64;
        let record = ApiLogRecord::capture(
            &self.endpoint,
            method.as_str(),
            status_code,
            response_time,
            request_data,
            response_data,
        );

        tracing::debug!(
            endpoint = %self.endpoint,
            status_code,
            response_time_ms = response_time,
            "Captured API exchange"
        );
        self.writer.write(record);
    }
}

fn method_has_body(method: &Method) -> bool {
    matches!(*method, Method::POST | Method::PUT | Method::PATCH)
}

/// Parsed copy of a request body; anything unparseable is recorded as `{}`
fn request_copy(bytes: &Bytes) -> Value {
    serde_json::from_slice(bytes).unwrap_or_else(|_| json!({}))
}

/// Parsed copy of a response body; non-JSON text is wrapped as `{ "body": text }`
fn response_copy(bytes: &Bytes) -> Value {
    if bytes.is_empty() {
        return json!({});
    }

    serde_json::from_slice(bytes)
        .unwrap_or_else(|_| json!({ "body": String::from_utf8_lossy(bytes) }))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown error".to_string()
    }
}

/// Capture middleware, installed with `axum::middleware::from_fn_with_state`
pub async fn capture_middleware(
    State(capture): State<Arc<CaptureState>>,
    request: Request,
    next: Next,
) -> Response {
    if request.uri().path() != capture.endpoint {
        return next.run(request).await;
    }

    let started = Instant::now();
    let method = request.method().clone();
    let (parts, body) = request.into_parts();

    let bytes = match axum::body::to_bytes(body, capture.max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(e) => {
            let details = format!("Could not read request body: {}", e);
            capture.dispatch(
                &method,
                400,
                started,
                json!({}),
                json!({ "error": "Invalid request", "details": details }),
            );
            return AppError::BadRequest(details).into_response();
        }
    };

    let request_data = if method_has_body(&method) && !bytes.is_empty() {
        request_copy(&bytes)
    } else {
        json!({})
    };

    let request = Request::from_parts(parts, Body::from(bytes));

    match AssertUnwindSafe(next.run(request)).catch_unwind().await {
        Ok(response) => {
            let (parts, body) = response.into_parts();

            let (response, response_data) = match axum::body::to_bytes(body, usize::MAX).await {
                Ok(bytes) => {
                    let data = response_copy(&bytes);
                    (Response::from_parts(parts, Body::from(bytes)), data)
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to read response body for capture");
                    (
                        AppError::InternalError(format!("Could not read response body: {}", e))
                            .into_response(),
                        json!({ "error": "Could not parse response" }),
                    )
                }
            };

            capture.dispatch(
                &method,
                response.status().as_u16(),
                started,
                request_data,
                response_data,
            );
            response
        }
        Err(panic) => {
            let details = panic_message(panic.as_ref());
            capture.dispatch(
                &method,
                500,
                started,
                request_data,
                json!({ "error": "Internal server error", "details": details }),
            );
            std::panic::resume_unwind(panic)
        }
    }
}
