//! Captured exchange documents
//!
//! `ApiLogRecord` is what the capture middleware builds; `IndexedDocument` is what lands in
//! the store (record + indexing time); `StoredRecord` is what comes back out (+ store id).

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One captured request/response exchange
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiLogRecord {
    /// Capture time (after the handler completed), millisecond precision
    pub timestamp: DateTime<Utc>,
    pub endpoint: String,
    pub method: String,
    pub status_code: u16,
    /// Wall-clock handling time in milliseconds
    pub response_time: u64,
    #[serde(default, deserialize_with = "lenient_key", skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_key", skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_key", skip_serializing_if = "Option::is_none")]
    pub app_name: Option<String>,
    #[serde(default)]
    pub request_data: Value,
    #[serde(default)]
    pub response_data: Value,
}

impl ApiLogRecord {
    /// Build a record stamped with the current time
    pub fn capture(
        endpoint: &str,
        method: &str,
        status_code: u16,
        response_time: u64,
        request_data: Value,
        response_data: Value,
    ) -> Self {
        let keys = CorrelationKeys::extract(&request_data);

        Self {
            timestamp: Utc::now().trunc_subsecs(3),
            endpoint: endpoint.to_string(),
            method: method.to_string(),
            status_code,
            response_time,
            user_id: keys.user_id,
            session_id: keys.session_id,
            app_name: keys.app_name,
            request_data,
            response_data,
        }
    }
}

/// Correlation keys may have been stored as numbers by older writers
fn lenient_key<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(key_value(&Value::deserialize(deserializer)?))
}

fn key_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Correlation keys pulled from a request payload
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CorrelationKeys {
    pub user_id: Option<String>,
    pub session_id: Option<String>,
    pub app_name: Option<String>,
}

impl CorrelationKeys {
    /// Read `userId`/`sessionId`/`appName`, accepting the snake_case spellings too
    pub fn extract(payload: &Value) -> Self {
        Self {
            user_id: string_field(payload, &["userId", "user_id"]),
            session_id: string_field(payload, &["sessionId", "session_id"]),
            app_name: string_field(payload, &["appName", "app_name"]),
        }
    }
}

fn string_field(payload: &Value, names: &[&str]) -> Option<String> {
    names.iter().find_map(|name| key_value(payload.get(name)?))
}

/// Document body written to the store
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexedDocument {
    #[serde(flatten)]
    pub record: ApiLogRecord,
    /// When the document was handed to the store, distinct from `record.timestamp`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indexed_at: Option<DateTime<Utc>>,
}

impl IndexedDocument {
    pub fn new(record: ApiLogRecord) -> Self {
        Self {
            record,
            indexed_at: Some(Utc::now().trunc_subsecs(3)),
        }
    }
}

/// A record read back from the store
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredRecord {
    pub id: String,
    #[serde(flatten)]
    pub record: ApiLogRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indexed_at: Option<DateTime<Utc>>,
}

impl StoredRecord {
    pub fn from_document(id: String, document: IndexedDocument) -> Self {
        Self {
            id,
            record: document.record,
            indexed_at: document.indexed_at,
        }
    }
}
