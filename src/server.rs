use anyhow::Result;
use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::{net::SocketAddr, sync::Arc};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::{
    capture::{capture_middleware, CaptureState},
    config::Config,
    handlers::{self, AppState},
    metrics,
    signals::setup_signal_handlers,
    store::{LogStoreHandle, RecordWriter, SchemaDescriptor, SchemaManager},
};

/// Start the proxy server
///
/// This function:
/// 1. Initializes metrics (when enabled)
/// 2. Sets up signal handlers for graceful shutdown
/// 3. Kicks off log store initialization in the background
/// 4. Binds to the configured address
/// 5. Serves requests until a shutdown signal arrives
pub async fn start_server(config: Config) -> Result<()> {
    let metrics_handle = if config.metrics.enabled {
        info!("Initializing Prometheus metrics...");
        Some(Arc::new(metrics::init_metrics()?))
    } else {
        None
    };

    let (shutdown_tx, signal_handle) = setup_signal_handlers();
    let mut shutdown_rx = shutdown_tx.subscribe();

    let config = Arc::new(config);
    let log_store = Arc::new(LogStoreHandle::new(config.log_store.clone()));

    if config.log_store.init_on_startup {
        let log_store = log_store.clone();
        tokio::spawn(async move {
            initialize_log_store(&log_store).await;
        });
    }

    let app = create_router(config.clone(), log_store, metrics_handle);

    let addr = SocketAddr::from((
        config.server.host.parse::<std::net::IpAddr>()?,
        config.server.port,
    ));

    info!("Starting agent proxy on {}", addr);
    info!(
        upstream = %config.upstream.url,
        log_store = %config.log_store.endpoint,
        index = %config.log_store.index,
        capture = %config.capture.endpoint,
        "Configuration loaded"
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.recv().await;
            info!("Shutdown signal received, draining connections...");
        })
        .await?;

    signal_handle.abort();
    info!("Server stopped gracefully");

    Ok(())
}

/// Create the Axum router with all routes and middleware
///
/// Spawns the background record writer, so it must run inside a tokio runtime.
pub fn create_router(
    config: Arc<Config>,
    log_store: Arc<LogStoreHandle>,
    metrics_handle: Option<Arc<PrometheusHandle>>,
) -> Router {
    let writer = RecordWriter::spawn(log_store.clone(), config.log_store.buffer_size);
    let capture = Arc::new(CaptureState::new(
        writer,
        config.capture.endpoint.clone(),
        config.capture.max_body_bytes,
    ));

    let state = AppState::new(config.clone(), reqwest::Client::new(), log_store);

    let mut app = Router::new()
        .route("/api/run", post(handlers::run::handle_run))
        .route("/api/logs", get(handlers::logs::get_logs))
        .route("/api/logs/:id", get(handlers::logs::get_log))
        .route(
            "/api/elasticsearch",
            get(handlers::elasticsearch::handle_store_request),
        )
        .route("/health", get(handlers::health::health_check))
        .route("/ready", get(handlers::health::readiness_check))
        .with_state(state);

    if let Some(handle) = metrics_handle {
        app = app.merge(
            Router::new()
                .route(&config.metrics.endpoint, get(handlers::metrics_handler::metrics))
                .with_state(handle),
        );
    }

    app.layer(middleware::from_fn_with_state(capture, capture_middleware))
        .layer(DefaultBodyLimit::max(config.capture.max_body_bytes))
        .layer(TraceLayer::new_for_http())
}

/// Check connectivity and make sure the log index exists
///
/// Returns `false` when the store is unusable; the proxy keeps serving either way and
/// the writer retries on every record.
pub async fn initialize_log_store(log_store: &LogStoreHandle) -> bool {
    if !log_store.probe().await {
        warn!(
            index = %log_store.index(),
            "Log store unavailable, API logging will be disabled until it recovers"
        );
        return false;
    }

    let schema = SchemaManager::new(log_store.index(), SchemaDescriptor::api_log());
    let ensured = async {
        let client = log_store.client().await?;
        schema.ensure_schema(client.as_ref()).await
    };

    match tokio::time::timeout(log_store.timeout(), ensured).await {
        Ok(Ok(())) => {
            info!(index = %log_store.index(), "Log store ready");
            true
        }
        Ok(Err(e)) => {
            warn!(index = %log_store.index(), error = %e, "Failed to initialize log index");
            false
        }
        Err(_) => {
            warn!(index = %log_store.index(), "Timed out initializing log index");
            false
        }
    }
}
