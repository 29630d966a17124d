use axum::{extract::State, http::header, response::IntoResponse};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

/// Prometheus text exposition of the proxy's counters and histograms
pub async fn metrics(State(handle): State<Arc<PrometheusHandle>>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        handle.render(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[tokio::test]
    async fn test_metrics_handler_renders_text() {
        // Recorder built but not installed globally
        let recorder = metrics_exporter_prometheus::PrometheusBuilder::new().build_recorder();
        let state = Arc::new(recorder.handle());

        let response = metrics(State(state)).await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/plain; version=0.0.4"
        );
    }
}
