//! Log store: persistence and retrieval of captured `/api/run` exchanges
//!
//! - [`LogStoreHandle`]: lazily built, shared client (Elasticsearch or in-process)
//! - [`SchemaManager`]: idempotent index/mapping creation
//! - [`RecordWriter`]: non-blocking, best-effort writes
//! - [`QueryService`]: filtered, newest-first retrieval with truncated projections

pub mod client;
pub mod elasticsearch;
pub mod error;
pub mod memory;
pub mod query;
pub mod record;
pub mod schema;
pub mod writer;

pub use client::{connect, LogStore, LogStoreHandle};
pub use elasticsearch::ElasticsearchStore;
pub use error::StoreError;
pub use memory::MemoryStore;
pub use query::{parse_time_bound, truncate_payload, BoundKind, LogQuery, ProjectedRecord, QueryService};
pub use record::{ApiLogRecord, CorrelationKeys, IndexedDocument, StoredRecord};
pub use schema::{FieldType, SchemaDescriptor, SchemaManager};
pub use writer::RecordWriter;
