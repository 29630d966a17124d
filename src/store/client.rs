use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;

use super::{ElasticsearchStore, IndexedDocument, LogQuery, MemoryStore, StoreError, StoredRecord};
use crate::config::{LogStoreConfig, StoreBackend};

/// Operations the proxy needs from a search-indexed document store
#[async_trait]
pub trait LogStore: Send + Sync {
    fn backend_name(&self) -> &'static str;

    /// Lightweight liveness check
    async fn ping(&self) -> Result<(), StoreError>;

    async fn index_exists(&self, index: &str) -> Result<bool, StoreError>;

    /// Create `index` with `mappings`. Fails with `StoreError::AlreadyExists` if present.
    async fn create_index(&self, index: &str, mappings: &Value) -> Result<(), StoreError>;

    /// Insert a document, returning the store-assigned id
    async fn insert(&self, index: &str, document: &IndexedDocument) -> Result<String, StoreError>;

    /// Filtered search, newest first
    async fn search(&self, index: &str, query: &LogQuery) -> Result<Vec<StoredRecord>, StoreError>;

    async fn get(&self, index: &str, id: &str) -> Result<Option<StoredRecord>, StoreError>;
}

/// Build a store client for the configured backend. Performs no I/O.
pub fn connect(config: &LogStoreConfig) -> Result<Arc<dyn LogStore>, StoreError> {
    match config.backend {
        StoreBackend::Elasticsearch => Ok(Arc::new(ElasticsearchStore::new(config)?)),
        StoreBackend::Memory => Ok(Arc::new(MemoryStore::new())),
    }
}

/// Process-wide, lazily built log store client
///
/// The first caller of [`client`](Self::client) builds the backend; concurrent first
/// callers wait on the same initialization and everybody afterwards reuses it.
pub struct LogStoreHandle {
    config: LogStoreConfig,
    client: OnceCell<Arc<dyn LogStore>>,
}

impl LogStoreHandle {
    pub fn new(config: LogStoreConfig) -> Self {
        Self {
            config,
            client: OnceCell::new(),
        }
    }

    /// Handle around an already built store
    pub fn with_store(config: LogStoreConfig, store: Arc<dyn LogStore>) -> Self {
        Self {
            config,
            client: OnceCell::new_with(Some(store)),
        }
    }

    pub fn index(&self) -> &str {
        &self.config.index
    }

    /// Upper bound for any single store operation
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.config.timeout_seconds)
    }

    pub async fn client(&self) -> Result<Arc<dyn LogStore>, StoreError> {
        let client = self
            .client
            .get_or_try_init(|| async {
                let client = connect(&self.config)?;
                tracing::info!(
                    backend = client.backend_name(),
                    endpoint = %self.config.endpoint,
                    index = %self.config.index,
                    "Log store client initialized"
                );
                Ok::<_, StoreError>(client)
            })
            .await?;

        Ok(client.clone())
    }

    /// `true` only if the store answered a ping within the timeout
    pub async fn probe(&self) -> bool {
        let check = async {
            let client = self.client().await?;
            client.ping().await
        };

        match tokio::time::timeout(self.timeout(), check).await {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "Log store connectivity check failed");
                false
            }
            Err(_) => {
                tracing::warn!(
                    timeout_secs = self.config.timeout_seconds,
                    "Log store connectivity check timed out"
                );
                false
            }
        }
    }
}
