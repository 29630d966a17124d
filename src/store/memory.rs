//! In-process backend
//!
//! Mirrors the Elasticsearch semantics the proxy relies on (create-if-absent,
//! server-assigned ids, filtered newest-first search) without a cluster. Used for
//! local runs (`backend = "memory"`) and tests.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;

use super::{IndexedDocument, LogQuery, LogStore, StoreError, StoredRecord};

#[derive(Debug, Default)]
struct MemoryIndex {
    mappings: Value,
    documents: Vec<StoredRecord>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    indices: RwLock<HashMap<String, MemoryIndex>>,
    creations: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn index_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.indices.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    pub async fn mappings(&self, index: &str) -> Option<Value> {
        self.indices.read().await.get(index).map(|i| i.mappings.clone())
    }

    pub async fn document_count(&self, index: &str) -> usize {
        self.indices
            .read()
            .await
            .get(index)
            .map_or(0, |i| i.documents.len())
    }

    /// Number of successful `create_index` calls
    pub fn creation_count(&self) -> usize {
        self.creations.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LogStore for MemoryStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn index_exists(&self, index: &str) -> Result<bool, StoreError> {
        Ok(self.indices.read().await.contains_key(index))
    }

    async fn create_index(&self, index: &str, mappings: &Value) -> Result<(), StoreError> {
        let mut indices = self.indices.write().await;
        if indices.contains_key(index) {
            return Err(StoreError::AlreadyExists(index.to_string()));
        }

        indices.insert(
            index.to_string(),
            MemoryIndex {
                mappings: mappings.clone(),
                documents: Vec::new(),
            },
        );
        self.creations.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn insert(&self, index: &str, document: &IndexedDocument) -> Result<String, StoreError> {
        let id = uuid::Uuid::new_v4().simple().to_string();

        // Like Elasticsearch, writing to a missing index creates it with dynamic mappings
        let mut indices = self.indices.write().await;
        indices
            .entry(index.to_string())
            .or_default()
            .documents
            .push(StoredRecord::from_document(id.clone(), document.clone()));

        Ok(id)
    }

    async fn search(&self, index: &str, query: &LogQuery) -> Result<Vec<StoredRecord>, StoreError> {
        let indices = self.indices.read().await;
        let stored = indices
            .get(index)
            .ok_or_else(|| StoreError::IndexNotFound(index.to_string()))?;

        let mut matches: Vec<StoredRecord> = stored
            .documents
            .iter()
            .filter(|doc| query.matches(&doc.record))
            .cloned()
            .collect();
        matches.sort_by(|a, b| b.record.timestamp.cmp(&a.record.timestamp));

        Ok(matches
            .into_iter()
            .skip(query.offset)
            .take(query.limit)
            .collect())
    }

    async fn get(&self, index: &str, id: &str) -> Result<Option<StoredRecord>, StoreError> {
        let indices = self.indices.read().await;
        let stored = indices
            .get(index)
            .ok_or_else(|| StoreError::IndexNotFound(index.to_string()))?;

        Ok(stored.documents.iter().find(|doc| doc.id == id).cloned())
    }
}
