//! Retrieval of captured exchanges
//!
//! Filters combine with AND; results are always newest first. List views get a
//! truncated projection of the payload fields, computed from the same fetched document
//! as the full view.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;

use super::{ApiLogRecord, LogStoreHandle, StoreError, StoredRecord};

pub const DEFAULT_LIMIT: usize = 50;

/// Filters and pagination for a log search
#[derive(Debug, Clone, PartialEq)]
pub struct LogQuery {
    pub user_id: Option<String>,
    pub session_id: Option<String>,
    pub endpoint: Option<String>,
    /// Inclusive lower bound on `timestamp`
    pub from: Option<DateTime<Utc>>,
    /// Inclusive upper bound on `timestamp`
    pub to: Option<DateTime<Utc>>,
    pub limit: usize,
    pub offset: usize,
}

impl Default for LogQuery {
    fn default() -> Self {
        Self {
            user_id: None,
            session_id: None,
            endpoint: None,
            from: None,
            to: None,
            limit: DEFAULT_LIMIT,
            offset: 0,
        }
    }
}

fn format_instant(instant: &DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}

impl LogQuery {
    /// Elasticsearch query DSL for the filters (`match_all` when there are none)
    pub fn to_dsl(&self) -> Value {
        let mut must = Vec::new();

        if let Some(user_id) = &self.user_id {
            must.push(json!({ "term": { "userId": user_id } }));
        }
        if let Some(session_id) = &self.session_id {
            must.push(json!({ "term": { "sessionId": session_id } }));
        }
        if let Some(endpoint) = &self.endpoint {
            must.push(json!({ "term": { "endpoint": endpoint } }));
        }

        if self.from.is_some() || self.to.is_some() {
            let mut range = serde_json::Map::new();
            if let Some(from) = &self.from {
                range.insert("gte".to_string(), json!(format_instant(from)));
            }
            if let Some(to) = &self.to {
                range.insert("lte".to_string(), json!(format_instant(to)));
            }
            must.push(json!({ "range": { "timestamp": range } }));
        }

        if must.is_empty() {
            json!({ "match_all": {} })
        } else {
            json!({ "bool": { "must": must } })
        }
    }

    /// Full `_search` request body
    pub fn to_search_body(&self) -> Value {
        json!({
            "query": self.to_dsl(),
            "from": self.offset,
            "size": self.limit,
            "sort": [{ "timestamp": { "order": "desc" } }],
        })
    }

    /// Same predicate as [`to_dsl`](Self::to_dsl), evaluated in process
    pub fn matches(&self, record: &ApiLogRecord) -> bool {
        fn exact(filter: &Option<String>, value: &Option<String>) -> bool {
            filter.as_ref().map_or(true, |f| value.as_deref() == Some(f.as_str()))
        }

        exact(&self.user_id, &record.user_id)
            && exact(&self.session_id, &record.session_id)
            && self.endpoint.as_ref().map_or(true, |e| record.endpoint == *e)
            && self.from.map_or(true, |from| record.timestamp >= from)
            && self.to.map_or(true, |to| record.timestamp <= to)
    }
}

/// Which side of a time range a bound is for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundKind {
    From,
    To,
}

/// Parse an RFC 3339 instant or a bare `YYYY-MM-DD` date
///
/// A bare date covers the whole day: start of day for `From`, last millisecond for `To`.
pub fn parse_time_bound(value: &str, kind: BoundKind) -> Option<DateTime<Utc>> {
    if let Ok(instant) = DateTime::parse_from_rfc3339(value) {
        return Some(instant.with_timezone(&Utc));
    }

    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()?;
    let time = match kind {
        BoundKind::From => date.and_hms_milli_opt(0, 0, 0, 0)?,
        BoundKind::To => date.and_hms_milli_opt(23, 59, 59, 999)?,
    };
    Some(time.and_utc())
}

/// Size-bounded rendering of a payload for list views
///
/// Payloads whose compact JSON is longer than `max_len` characters become
/// `{ truncated, originalLength, preview }`; shorter ones are returned as-is.
pub fn truncate_payload(value: &Value, max_len: usize) -> Value {
    if value.is_null() {
        return Value::Null;
    }

    let serialized = value.to_string();
    let length = serialized.chars().count();
    if length <= max_len {
        return value.clone();
    }

    let preview: String = serialized.chars().take(max_len).collect();
    json!({
        "truncated": true,
        "originalLength": length,
        "preview": format!("{}...", preview),
    })
}

/// Summary row for list views
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectedRecord {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub endpoint: String,
    pub method: String,
    pub status_code: u16,
    pub response_time: u64,
    pub user_id: Option<String>,
    pub session_id: Option<String>,
    pub app_name: Option<String>,
    pub request_summary: Value,
    pub response_summary: Value,
    /// Full payloads are available from the by-id fetch
    pub has_full_data: bool,
}

impl StoredRecord {
    pub fn summarize(&self, truncate_length: usize) -> ProjectedRecord {
        let record = &self.record;
        ProjectedRecord {
            id: self.id.clone(),
            timestamp: record.timestamp,
            endpoint: record.endpoint.clone(),
            method: record.method.clone(),
            status_code: record.status_code,
            response_time: record.response_time,
            user_id: record.user_id.clone(),
            session_id: record.session_id.clone(),
            app_name: record.app_name.clone(),
            request_summary: truncate_payload(&record.request_data, truncate_length),
            response_summary: truncate_payload(&record.response_data, truncate_length),
            has_full_data: true,
        }
    }
}

/// Read side over the shared log store handle
#[derive(Clone)]
pub struct QueryService {
    store: Arc<LogStoreHandle>,
    truncate_length: usize,
}

impl QueryService {
    pub fn new(store: Arc<LogStoreHandle>, truncate_length: usize) -> Self {
        Self {
            store,
            truncate_length,
        }
    }

    /// Full records, newest first. A missing index means nothing was logged yet.
    pub async fn search(&self, query: &LogQuery) -> Result<Vec<StoredRecord>, StoreError> {
        let index = self.store.index();
        let search = async {
            let client = self.store.client().await?;
            client.search(index, query).await
        };

        let mut records = match tokio::time::timeout(self.store.timeout(), search).await? {
            Ok(records) => records,
            Err(StoreError::IndexNotFound(_)) => {
                tracing::debug!(index = %index, "Log index does not exist yet");
                Vec::new()
            }
            Err(e) => return Err(e),
        };

        records.sort_by(|a, b| b.record.timestamp.cmp(&a.record.timestamp));
        records.truncate(query.limit);
        Ok(records)
    }

    /// Truncated projection for list views
    pub async fn search_summaries(&self, query: &LogQuery) -> Result<Vec<ProjectedRecord>, StoreError> {
        let records = self.search(query).await?;
        Ok(records
            .iter()
            .map(|r| r.summarize(self.truncate_length))
            .collect())
    }

    /// Untruncated record by store id
    pub async fn get(&self, id: &str) -> Result<Option<StoredRecord>, StoreError> {
        let index = self.store.index();
        let fetch = async {
            let client = self.store.client().await?;
            client.get(index, id).await
        };

        match tokio::time::timeout(self.store.timeout(), fetch).await? {
            Err(StoreError::IndexNotFound(_)) => Ok(None),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, StoreBackend};
    use crate::store::{IndexedDocument, LogStore, MemoryStore};
    use chrono::TimeZone;

    fn record_at(user: &str, endpoint: &str, secs: i64) -> ApiLogRecord {
        let mut record = ApiLogRecord::capture(
            endpoint,
            "POST",
            200,
            10,
            json!({ "userId": user }),
            json!({ "events": [] }),
        );
        record.timestamp = Utc.timestamp_opt(1_768_903_200 + secs, 0).unwrap();
        record
    }

    async fn service_with(records: Vec<ApiLogRecord>) -> QueryService {
        let mut config = Config::default().log_store;
        config.backend = StoreBackend::Memory;

        let memory = Arc::new(MemoryStore::new());
        for record in records {
            memory
                .insert(&config.index, &IndexedDocument::new(record))
                .await
                .unwrap();
        }

        let handle = Arc::new(LogStoreHandle::with_store(config, memory));
        QueryService::new(handle, 200)
    }

    #[test]
    fn test_dsl_without_filters_is_match_all() {
        assert_eq!(LogQuery::default().to_dsl(), json!({ "match_all": {} }));
    }

    #[test]
    fn test_dsl_combines_filters() {
        let query = LogQuery {
            user_id: Some("u1".to_string()),
            endpoint: Some("/api/run".to_string()),
            from: parse_time_bound("2026-01-20", BoundKind::From),
            ..Default::default()
        };

        assert_eq!(
            query.to_dsl(),
            json!({ "bool": { "must": [
                { "term": { "userId": "u1" } },
                { "term": { "endpoint": "/api/run" } },
                { "range": { "timestamp": { "gte": "2026-01-20T00:00:00.000Z" } } }
            ] } })
        );
    }

    #[test]
    fn test_search_body_sorts_newest_first() {
        let body = LogQuery { limit: 10, ..Default::default() }.to_search_body();
        assert_eq!(body["size"], 10);
        assert_eq!(body["from"], 0);
        assert_eq!(body["sort"], json!([{ "timestamp": { "order": "desc" } }]));
    }

    #[test]
    fn test_parse_time_bound() {
        let to = parse_time_bound("2026-01-20", BoundKind::To).unwrap();
        assert_eq!(format_instant(&to), "2026-01-20T23:59:59.999Z");

        let instant = parse_time_bound("2026-01-20T10:00:00+02:00", BoundKind::From).unwrap();
        assert_eq!(format_instant(&instant), "2026-01-20T08:00:00.000Z");

        assert!(parse_time_bound("yesterday", BoundKind::From).is_none());
    }

    #[test]
    fn test_truncate_small_payload_unmodified() {
        let payload = json!({ "newMessage": { "parts": [{ "text": "hi" }] } });
        assert_eq!(truncate_payload(&payload, 200), payload);
        assert_eq!(truncate_payload(&Value::Null, 200), Value::Null);
    }

    #[test]
    fn test_truncate_at_exact_budget_unmodified() {
        // {"k":"..."} is 8 characters of overhead
        let payload = json!({ "k": "x".repeat(192) });
        assert_eq!(payload.to_string().len(), 200);
        assert_eq!(truncate_payload(&payload, 200), payload);
    }

    #[test]
    fn test_truncate_large_payload() {
        let payload = json!({ "text": "é".repeat(500) });
        let length = payload.to_string().chars().count();

        let truncated = truncate_payload(&payload, 200);
        assert_eq!(truncated["truncated"], true);
        assert_eq!(truncated["originalLength"], length);

        let preview = truncated["preview"].as_str().unwrap();
        assert!(preview.ends_with("..."));
        assert_eq!(preview.chars().count(), 203);
    }

    #[test]
    fn test_matches_range_is_inclusive() {
        let record = record_at("u1", "/api/run", 0);
        let query = LogQuery {
            from: Some(record.timestamp),
            to: Some(record.timestamp),
            ..Default::default()
        };
        assert!(query.matches(&record));
    }

    #[tokio::test]
    async fn test_search_filters_by_user() {
        let service = service_with(vec![
            record_at("A", "/api/run", 1),
            record_at("B", "/api/run", 2),
            record_at("A", "/api/run", 3),
        ])
        .await;

        let query = LogQuery {
            user_id: Some("A".to_string()),
            ..Default::default()
        };
        let records = service.search(&query).await.unwrap();

        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.record.user_id.as_deref() == Some("A")));
    }

    #[tokio::test]
    async fn test_search_user_and_range() {
        let service = service_with(vec![
            record_at("A", "/api/run", 0),
            record_at("A", "/api/run", 100),
            record_at("A", "/api/run", 200),
            record_at("B", "/api/run", 100),
        ])
        .await;

        let base = Utc.timestamp_opt(1_768_903_200, 0).unwrap();
        let query = LogQuery {
            user_id: Some("A".to_string()),
            from: Some(base + chrono::Duration::seconds(50)),
            to: Some(base + chrono::Duration::seconds(150)),
            ..Default::default()
        };
        let records = service.search(&query).await.unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].record.timestamp, base + chrono::Duration::seconds(100));
    }

    #[tokio::test]
    async fn test_search_is_newest_first_and_limited() {
        let service = service_with((0..20).map(|i| record_at("A", "/api/run", (i * 7) % 20)).collect()).await;

        let records = service.search(&LogQuery { limit: 5, ..Default::default() }).await.unwrap();

        assert_eq!(records.len(), 5);
        assert!(records
            .windows(2)
            .all(|w| w[0].record.timestamp >= w[1].record.timestamp));
    }

    #[tokio::test]
    async fn test_search_missing_index_is_empty() {
        let service = service_with(Vec::new()).await;
        assert!(service.search(&LogQuery::default()).await.unwrap().is_empty());
        assert!(service.get("anything").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_summaries_truncate_large_payloads() {
        let mut record = record_at("A", "/api/run", 0);
        record.response_data = json!({ "text": "y".repeat(1000) });
        let service = service_with(vec![record]).await;

        let summaries = service.search_summaries(&LogQuery::default()).await.unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].response_summary["truncated"], true);
        assert_eq!(summaries[0].request_summary, json!({ "userId": "A" }));

        let full = service.get(&summaries[0].id).await.unwrap().unwrap();
        assert_eq!(full.record.response_data["text"].as_str().unwrap().len(), 1000);
    }
}
