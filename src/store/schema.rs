//! Index mapping management
//!
//! Creation relies on the store's own create-if-absent semantics: concurrent creators
//! race, one wins, the rest see "already exists" and treat it as success.

use serde_json::{json, Map, Value};
use std::sync::atomic::{AtomicBool, Ordering};

use super::{LogStore, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Date,
    Keyword,
    Integer,
    /// Stored verbatim, not indexed
    Object,
}

impl FieldType {
    fn mapping(self) -> Value {
        match self {
            Self::Date => json!({ "type": "date" }),
            Self::Keyword => json!({ "type": "keyword" }),
            Self::Integer => json!({ "type": "integer" }),
            Self::Object => json!({ "type": "object", "enabled": false }),
        }
    }
}

/// Field name to type mapping for one index. Append-only: no migrations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaDescriptor {
    fields: Vec<(&'static str, FieldType)>,
}

impl SchemaDescriptor {
    pub fn new(fields: Vec<(&'static str, FieldType)>) -> Self {
        Self { fields }
    }

    /// Mapping for captured API exchanges
    pub fn api_log() -> Self {
        Self::new(vec![
            ("timestamp", FieldType::Date),
            ("indexedAt", FieldType::Date),
            ("endpoint", FieldType::Keyword),
            ("method", FieldType::Keyword),
            ("statusCode", FieldType::Integer),
            ("responseTime", FieldType::Integer),
            ("userId", FieldType::Keyword),
            ("sessionId", FieldType::Keyword),
            ("appName", FieldType::Keyword),
            ("requestData", FieldType::Object),
            ("responseData", FieldType::Object),
        ])
    }

    /// `{ "properties": { ... } }` body for index creation
    pub fn to_mappings(&self) -> Value {
        let properties: Map<String, Value> = self
            .fields
            .iter()
            .map(|(name, ty)| (name.to_string(), ty.mapping()))
            .collect();

        json!({ "properties": properties })
    }
}

/// Ensures an index and its mapping exist before writes
pub struct SchemaManager {
    index: String,
    descriptor: SchemaDescriptor,
    ensured: AtomicBool,
}

impl SchemaManager {
    pub fn new(index: impl Into<String>, descriptor: SchemaDescriptor) -> Self {
        Self {
            index: index.into(),
            descriptor,
            ensured: AtomicBool::new(false),
        }
    }

    pub fn index(&self) -> &str {
        &self.index
    }

    /// Create the index if it is missing
    ///
    /// Safe to call concurrently: losing a creation race counts as success.
    /// Once the index is known to exist later calls return without a round trip.
    pub async fn ensure_schema(&self, store: &dyn LogStore) -> Result<(), StoreError> {
        if self.ensured.load(Ordering::Acquire) {
            return Ok(());
        }

        if store.index_exists(&self.index).await? {
            self.ensured.store(true, Ordering::Release);
            return Ok(());
        }

        match store.create_index(&self.index, &self.descriptor.to_mappings()).await {
            Ok(()) => {
                tracing::info!(index = %self.index, "Created log index");
            }
            Err(StoreError::AlreadyExists(_)) => {
                tracing::debug!(index = %self.index, "Log index created concurrently");
            }
            Err(e) => return Err(e),
        }

        self.ensured.store(true, Ordering::Release);
        Ok(())
    }
}
