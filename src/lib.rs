pub mod capture;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod server;
pub mod signals;
pub mod store;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize tracing/logging
///
/// `RUST_LOG` wins over `log_level`. `log_format = "json"` switches to one JSON object
/// per event. Can only be called once per process.
pub fn init_tracing(log_level: &str, log_format: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(filter);

    if log_format == "json" {
        registry
            .with(fmt::layer().json().with_target(true).with_current_span(false))
            .init();
    } else {
        registry.with(fmt::layer().with_target(true)).init();
    }
}
