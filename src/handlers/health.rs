use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde_json::json;

use super::AppState;

/// Liveness: 200 whenever the process is serving
pub async fn health_check() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "agent-proxy",
            "version": env!("CARGO_PKG_VERSION"),
        })),
    )
}

/// Readiness: the proxy serves without a log store, so this only reports on it
pub async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    let log_store = if state.log_store.probe().await {
        "connected"
    } else {
        "unavailable"
    };

    (
        StatusCode::OK,
        Json(json!({
            "status": "ready",
            "service": "agent-proxy",
            "upstream": state.config.upstream.url,
            "logStore": log_store,
        })),
    )
}
