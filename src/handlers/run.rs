//! `POST /api/run`: relay to the upstream agent service
//!
//! The caller gets the upstream's status, content type and body. Non-JSON upstream
//! bodies are wrapped as `{ "body": text }`; transport failures become a 500
//! `{ "error": "Proxy error", "details" }` envelope.

use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use std::time::{Duration, Instant};

use super::AppState;
use crate::config::UpstreamConfig;
use crate::error::AppError;

pub async fn handle_run(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    let response = forward(&state.http_client, &state.config.upstream, &headers, body).await;
    crate::metrics::record_proxy_request(response.status().as_u16());
    response
}

/// Check the inbound payload before anything goes upstream
fn validate_payload(body: &[u8], required_fields: &[String]) -> Result<(), AppError> {
    let payload: Value = serde_json::from_slice(body)
        .map_err(|_| AppError::BadRequest("Request body must be a JSON object".to_string()))?;

    let object = payload
        .as_object()
        .ok_or_else(|| AppError::BadRequest("Request body must be a JSON object".to_string()))?;

    if let Some(missing) = required_fields.iter().find(|f| !object.contains_key(f.as_str())) {
        return Err(AppError::BadRequest(format!("Missing required field: {}", missing)));
    }

    Ok(())
}

/// `reqwest` errors nest the useful cause (refused, timed out, dns) in their source chain
fn error_details(err: &reqwest::Error) -> String {
    let mut details = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        details.push_str(": ");
        details.push_str(&cause.to_string());
        source = std::error::Error::source(cause);
    }
    details
}

fn proxy_error(details: String) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "error": "Proxy error",
            "details": details,
        })),
    )
        .into_response()
}

/// Relay one request to the upstream and translate its answer
pub async fn forward(
    client: &reqwest::Client,
    upstream: &UpstreamConfig,
    headers: &HeaderMap,
    body: Bytes,
) -> Response {
    if let Err(e) = validate_payload(&body, &upstream.required_fields) {
        return e.into_response();
    }

    let mut request = client
        .post(&upstream.url)
        .timeout(Duration::from_secs(upstream.timeout_seconds))
        .header(header::CONTENT_TYPE, "application/json");

    for name in &upstream.forward_headers {
        if let Some(value) = headers.get(name.as_str()) {
            request = request.header(name.as_str(), value.clone());
        }
    }

    if !headers.contains_key(header::AUTHORIZATION) {
        if let Some(auth) = &upstream.auth_header {
            request = request.header(header::AUTHORIZATION, auth.as_str());
        }
    }

    let started = Instant::now();
    let upstream_response = match request.body(body).send().await {
        Ok(response) => response,
        Err(e) => {
            crate::metrics::record_upstream_duration("error", started.elapsed());
            let details = error_details(&e);
            tracing::error!(upstream = %upstream.url, error = %details, "Error in /api/run proxy");
            return proxy_error(details);
        }
    };

    let status = upstream_response.status();
    let content_type = upstream_response
        .headers()
        .get(header::CONTENT_TYPE)
        .cloned()
        .unwrap_or_else(|| HeaderValue::from_static("application/json"));

    let bytes = match upstream_response.bytes().await {
        Ok(bytes) => bytes,
        Err(e) => {
            crate::metrics::record_upstream_duration("error", started.elapsed());
            let details = error_details(&e);
            tracing::error!(upstream = %upstream.url, error = %details, "Failed to read upstream response");
            return proxy_error(details);
        }
    };
    crate::metrics::record_upstream_duration("ok", started.elapsed());

    tracing::info!(
        upstream = %upstream.url,
        status = status.as_u16(),
        bytes = bytes.len(),
        duration_ms = started.elapsed().as_millis() as u64,
        "Upstream responded"
    );

    if serde_json::from_slice::<Value>(&bytes).is_ok() {
        return (status, [(header::CONTENT_TYPE, content_type)], Body::from(bytes)).into_response();
    }

    tracing::debug!(status = status.as_u16(), "Upstream body is not JSON, wrapping");
    let text = String::from_utf8_lossy(&bytes).into_owned();
    (status, Json(json!({ "body": text }))).into_response()
}
