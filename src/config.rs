use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub server: ServerConfig,
    pub upstream: UpstreamConfig,
    pub log_store: LogStoreConfig,
    pub capture: CaptureConfig,
    pub query: QueryConfig,
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: String,
}

/// The agent service `/api/run` is relayed to
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UpstreamConfig {
    pub url: String,
    pub timeout_seconds: u64,
    /// Inbound header names (case-insensitive) copied onto the upstream request
    pub forward_headers: Vec<String>,
    /// Sent as `Authorization` when the caller did not supply one
    pub auth_header: Option<String>,
    /// Top-level fields the inbound JSON body must carry
    pub required_fields: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Elasticsearch,
    Memory,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LogStoreConfig {
    pub backend: StoreBackend,
    pub endpoint: String,
    pub index: String,
    pub api_key: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub timeout_seconds: u64,
    /// Records queued for the background writer before new ones are dropped
    pub buffer_size: usize,
    pub init_on_startup: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CaptureConfig {
    /// Only requests to this path are persisted
    pub endpoint: String,
    pub max_body_bytes: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QueryConfig {
    pub default_limit: usize,
    pub max_limit: usize,
    pub truncate_length: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub endpoint: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3006,
                log_level: "info".to_string(),
                log_format: "text".to_string(),
            },
            upstream: UpstreamConfig {
                url: "http://localhost:5001/run".to_string(),
                timeout_seconds: 60,
                forward_headers: vec!["authorization".to_string()],
                auth_header: None,
                required_fields: vec!["newMessage".to_string()],
            },
            log_store: LogStoreConfig {
                backend: StoreBackend::Elasticsearch,
                endpoint: "http://localhost:9200".to_string(),
                index: "api-responses".to_string(),
                api_key: None,
                username: None,
                password: None,
                timeout_seconds: 5,
                buffer_size: 1024,
                init_on_startup: true,
            },
            capture: CaptureConfig {
                endpoint: "/api/run".to_string(),
                max_body_bytes: 10 * 1024 * 1024,
            },
            query: QueryConfig {
                default_limit: 50,
                max_limit: 1000,
                truncate_length: 200,
            },
            metrics: MetricsConfig {
                enabled: false,
                endpoint: "/metrics".to_string(),
            },
        }
    }
}

/// Load configuration from `path` (optional) layered under `AGENT_PROXY__*` env vars
pub fn load_config(path: &Path) -> anyhow::Result<Config> {
    let defaults = config::Config::try_from(&Config::default())?;

    let config = config::Config::builder()
        .add_source(defaults)
        .add_source(config::File::from(path).required(false))
        .add_source(
            config::Environment::with_prefix("AGENT_PROXY")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("upstream.forward_headers")
                .with_list_parse_key("upstream.required_fields")
                .try_parsing(true),
        )
        .build()?;

    let cfg: Config = config.try_deserialize()?;
    validate_config(&cfg)?;

    Ok(cfg)
}

pub fn validate_config(cfg: &Config) -> anyhow::Result<()> {
    let upstream = url::Url::parse(&cfg.upstream.url)
        .map_err(|e| anyhow::anyhow!("Invalid upstream.url '{}': {}", cfg.upstream.url, e))?;
    if !matches!(upstream.scheme(), "http" | "https") {
        anyhow::bail!("upstream.url must use http or https, got '{}'", upstream.scheme());
    }

    if cfg.upstream.timeout_seconds == 0 {
        anyhow::bail!("upstream.timeout_seconds must be greater than zero");
    }

    if cfg.log_store.backend == StoreBackend::Elasticsearch {
        url::Url::parse(&cfg.log_store.endpoint).map_err(|e| {
            anyhow::anyhow!("Invalid log_store.endpoint '{}': {}", cfg.log_store.endpoint, e)
        })?;
    }

    if cfg.log_store.index.is_empty() {
        anyhow::bail!("log_store.index cannot be empty");
    }

    // Elasticsearch rejects upper-case index names
    if cfg.log_store.index.chars().any(|c| c.is_ascii_uppercase()) {
        anyhow::bail!("log_store.index must be lowercase: '{}'", cfg.log_store.index);
    }

    if cfg.log_store.username.is_some() != cfg.log_store.password.is_some() {
        anyhow::bail!("log_store.username and log_store.password must be set together");
    }

    if cfg.log_store.timeout_seconds == 0 {
        anyhow::bail!("log_store.timeout_seconds must be greater than zero");
    }

    if cfg.log_store.buffer_size == 0 {
        anyhow::bail!("log_store.buffer_size must be greater than zero");
    }

    if !cfg.capture.endpoint.starts_with('/') {
        anyhow::bail!("capture.endpoint must start with '/': '{}'", cfg.capture.endpoint);
    }

    if cfg.query.default_limit == 0 || cfg.query.default_limit > cfg.query.max_limit {
        anyhow::bail!(
            "query.default_limit must be between 1 and query.max_limit ({})",
            cfg.query.max_limit
        );
    }

    if cfg.metrics.enabled && !cfg.metrics.endpoint.starts_with('/') {
        anyhow::bail!("metrics.endpoint must start with '/': '{}'", cfg.metrics.endpoint);
    }

    match cfg.server.log_format.as_str() {
        "text" | "json" => {}
        other => anyhow::bail!("server.log_format must be 'text' or 'json', got '{}'", other),
    }

    Ok(())
}
