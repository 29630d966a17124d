use futures::FutureExt;
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};

use super::{ApiLogRecord, IndexedDocument, LogStoreHandle, SchemaDescriptor, SchemaManager, StoreError};

/// Best-effort persistence of captured exchanges
///
/// `write` hands the record to a bounded channel and returns immediately. A background
/// task ensures the index mapping and inserts each record under the store timeout.
/// Every failure (full queue, connection, schema, insert, timeout) is logged and the
/// record dropped; callers never observe it.
#[derive(Clone)]
pub struct RecordWriter {
    tx: mpsc::Sender<ApiLogRecord>,
}

impl RecordWriter {
    /// Spawn the background writer. Must be called inside a tokio runtime.
    pub fn spawn(store: Arc<LogStoreHandle>, buffer_size: usize) -> Self {
        let (tx, mut rx) = mpsc::channel::<ApiLogRecord>(buffer_size);
        let schema = SchemaManager::new(store.index(), SchemaDescriptor::api_log());

        tokio::spawn(async move {
            let result = std::panic::AssertUnwindSafe(async {
                while let Some(record) = rx.recv().await {
                    let endpoint = record.endpoint.clone();
                    let status_code = record.status_code;

                    let persisted = tokio::time::timeout(store.timeout(), persist(&store, &schema, record))
                        .await
                        .map_err(StoreError::from)
                        .and_then(|r| r);

                    match persisted {
                        Ok(id) => {
                            crate::metrics::record_log_write("written");
                            tracing::debug!(id = %id, endpoint = %endpoint, status_code, "Persisted API log record");
                        }
                        Err(e) => {
                            crate::metrics::record_log_write("failed");
                            tracing::error!(
                                endpoint = %endpoint,
                                status_code,
                                error = %e,
                                "Failed to save API response to log store"
                            );
                        }
                    }
                }
            })
            .catch_unwind()
            .await;

            match result {
                Ok(()) => tracing::info!("Record writer stopped: all senders dropped"),
                Err(e) => tracing::error!(panic = ?e, "Record writer panicked"),
            }
        });

        Self { tx }
    }

    /// Queue a record without waiting
    pub fn write(&self, record: ApiLogRecord) {
        match self.tx.try_send(record) {
            Ok(()) => {}
            Err(TrySendError::Full(record)) => {
                crate::metrics::record_log_write("dropped");
                tracing::warn!(
                    endpoint = %record.endpoint,
                    status_code = record.status_code,
                    "Record writer queue full, dropping API log record"
                );
            }
            Err(TrySendError::Closed(record)) => {
                crate::metrics::record_log_write("dropped");
                tracing::error!(
                    endpoint = %record.endpoint,
                    "Record writer is not running, dropping API log record"
                );
            }
        }
    }
}

/// Ensure the schema, then insert. Schema failures are logged and the insert still tried.
async fn persist(
    store: &LogStoreHandle,
    schema: &SchemaManager,
    record: ApiLogRecord,
) -> Result<String, StoreError> {
    let client = store.client().await?;

    if let Err(e) = schema.ensure_schema(client.as_ref()).await {
        tracing::warn!(index = %schema.index(), error = %e, "Could not ensure log index mapping");
    }

    client.insert(store.index(), &IndexedDocument::new(record)).await
}
