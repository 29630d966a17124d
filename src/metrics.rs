use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Install the Prometheus recorder
pub fn init_metrics() -> anyhow::Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("Failed to install Prometheus recorder: {}", e))?;

    init_metric_descriptions();

    Ok(handle)
}

/// Initialize metric descriptions (can be called multiple times safely)
fn init_metric_descriptions() {
    describe_counter!(
        "proxy_requests_total",
        "Total number of requests relayed to the upstream agent service"
    );
    describe_histogram!(
        "proxy_upstream_duration_seconds",
        "Upstream round-trip duration in seconds"
    );
    describe_counter!(
        "log_records_total",
        "API log records by outcome (written, failed, dropped)"
    );
    describe_gauge!("agent_proxy_info", "Proxy version information");

    gauge!("agent_proxy_info", "version" => env!("CARGO_PKG_VERSION")).set(1.0);
}

/// Record a relayed request by the status returned to the caller
pub fn record_proxy_request(status: u16) {
    counter!("proxy_requests_total", "status" => status.to_string()).increment(1);
}

/// Record upstream round-trip time
pub fn record_upstream_duration(outcome: &'static str, duration: Duration) {
    histogram!("proxy_upstream_duration_seconds", "outcome" => outcome).record(duration.as_secs_f64());
}

/// Record the outcome of one log record
pub fn record_log_write(outcome: &'static str) {
    counter!("log_records_total", "outcome" => outcome).increment(1);
}
