//! Log query API
//!
//! `GET /api/logs` lists captured exchanges newest first with truncated payloads;
//! `GET /api/logs/{id}` returns one record in full.

use axum::extract::{rejection::QueryRejection, Path, Query, State};
use axum::response::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::AppState;
use crate::config::QueryConfig;
use crate::error::AppError;
use crate::store::{parse_time_bound, BoundKind, LogQuery, ProjectedRecord, StoredRecord};

/// Query parameters for the logs API
#[derive(Debug, Default, Deserialize)]
pub struct LogsParams {
    /// Maximum number of results
    pub limit: Option<usize>,

    /// Number of matching records to skip
    #[serde(default)]
    pub offset: usize,

    #[serde(rename = "userId")]
    pub user_id: Option<String>,

    #[serde(rename = "sessionId")]
    pub session_id: Option<String>,

    pub endpoint: Option<String>,

    /// Inclusive lower bound, RFC 3339 or `YYYY-MM-DD`
    pub from: Option<String>,

    /// Inclusive upper bound, RFC 3339 or `YYYY-MM-DD`
    pub to: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn time_bound(name: &str, value: Option<String>, kind: BoundKind) -> Result<Option<chrono::DateTime<chrono::Utc>>, AppError> {
    match non_empty(value) {
        None => Ok(None),
        Some(raw) => parse_time_bound(&raw, kind).map(Some).ok_or_else(|| {
            AppError::BadRequest(format!(
                "Invalid '{}': expected an RFC 3339 timestamp or YYYY-MM-DD date, got '{}'",
                name, raw
            ))
        }),
    }
}

impl LogsParams {
    /// Validate and clamp into a store query
    pub fn into_query(self, limits: &QueryConfig) -> Result<LogQuery, AppError> {
        let from = time_bound("from", self.from, BoundKind::From)?;
        let to = time_bound("to", self.to, BoundKind::To)?;

        if let (Some(from), Some(to)) = (from, to) {
            if from > to {
                return Err(AppError::BadRequest("'from' must not be after 'to'".to_string()));
            }
        }

        Ok(LogQuery {
            user_id: non_empty(self.user_id),
            session_id: non_empty(self.session_id),
            endpoint: non_empty(self.endpoint),
            from,
            to,
            limit: self.limit.unwrap_or(limits.default_limit).min(limits.max_limit),
            offset: self.offset,
        })
    }
}

/// Response for the logs listing
#[derive(Debug, Serialize)]
pub struct LogsResponse {
    pub total: usize,
    pub data: Vec<ProjectedRecord>,
    /// Store query DSL the filters translated to
    pub query: Value,
}

/// GET /api/logs - List captured exchanges
///
/// Example: GET /api/logs?userId=u1&from=2026-01-20&limit=10
pub async fn get_logs(
    State(state): State<AppState>,
    params: Result<Query<LogsParams>, QueryRejection>,
) -> Result<Json<LogsResponse>, AppError> {
    let Query(params) = params.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let query = params.into_query(&state.config.query)?;

    let data = state
        .queries
        .search_summaries(&query)
        .await
        .map_err(|source| AppError::StoreError {
            context: "Failed to fetch logs",
            source,
        })?;

    tracing::debug!(
        returned = data.len(),
        limit = query.limit,
        offset = query.offset,
        "Served log listing"
    );

    Ok(Json(LogsResponse {
        total: data.len(),
        data,
        query: query.to_dsl(),
    }))
}

/// GET /api/logs/{id} - One record with untruncated payloads
pub async fn get_log(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<StoredRecord>, AppError> {
    state
        .queries
        .get(&id)
        .await
        .map_err(|source| AppError::StoreError {
            context: "Failed to fetch logs",
            source,
        })?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Log record '{}' not found", id)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, StoreBackend};
    use crate::store::{ApiLogRecord, IndexedDocument, LogStore, LogStoreHandle, MemoryStore};
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use serde_json::json;
    use std::sync::Arc;

    async fn state_with(records: Vec<ApiLogRecord>) -> (AppState, Vec<String>) {
        let mut config = Config::default();
        config.log_store.backend = StoreBackend::Memory;

        let memory = Arc::new(MemoryStore::new());
        let mut ids = Vec::new();
        for record in records {
            ids.push(
                memory
                    .insert(&config.log_store.index, &IndexedDocument::new(record))
                    .await
                    .unwrap(),
            );
        }

        let handle = Arc::new(LogStoreHandle::with_store(config.log_store.clone(), memory));
        (AppState::new(Arc::new(config), reqwest::Client::new(), handle), ids)
    }

    fn record(user: &str) -> ApiLogRecord {
        ApiLogRecord::capture(
            "/api/run",
            "POST",
            200,
            12,
            json!({ "userId": user, "newMessage": { "parts": [{ "text": "hi" }] } }),
            json!({ "events": [] }),
        )
    }

    #[test]
    fn test_params_defaults_and_clamp() {
        let limits = Config::default().query;

        let query = LogsParams::default().into_query(&limits).unwrap();
        assert_eq!(query.limit, 50);
        assert_eq!(query.offset, 0);

        let query = LogsParams {
            limit: Some(1_000_000),
            user_id: Some(String::new()),
            ..Default::default()
        }
        .into_query(&limits)
        .unwrap();
        assert_eq!(query.limit, 1000);
        assert_eq!(query.user_id, None);
    }

    #[test]
    fn test_params_reject_bad_bounds() {
        let limits = Config::default().query;

        let err = LogsParams {
            from: Some("last tuesday".to_string()),
            ..Default::default()
        }
        .into_query(&limits)
        .unwrap_err();
        assert!(err.to_string().contains("Invalid 'from'"));

        let err = LogsParams {
            from: Some("2026-01-21".to_string()),
            to: Some("2026-01-20".to_string()),
            ..Default::default()
        }
        .into_query(&limits)
        .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_get_logs_filters_and_reports_query() {
        let (state, _) = state_with(vec![record("u1"), record("u2"), record("u1")]).await;

        let params = LogsParams {
            user_id: Some("u1".to_string()),
            limit: Some(10),
            ..Default::default()
        };
        let Json(response) = get_logs(State(state), Ok(Query(params))).await.unwrap();

        assert_eq!(response.total, 2);
        assert!(response.data.iter().all(|r| r.user_id.as_deref() == Some("u1")));
        assert!(response.data.iter().all(|r| r.has_full_data));
        assert_eq!(
            response.query,
            json!({ "bool": { "must": [{ "term": { "userId": "u1" } }] } })
        );
    }

    #[tokio::test]
    async fn test_get_logs_empty_store() {
        let (state, _) = state_with(Vec::new()).await;

        let Json(response) = get_logs(State(state), Ok(Query(LogsParams::default()))).await.unwrap();
        assert_eq!(response.total, 0);
        assert_eq!(response.query, json!({ "match_all": {} }));
    }

    #[tokio::test]
    async fn test_get_log_by_id() {
        let (state, ids) = state_with(vec![record("u1")]).await;

        let Json(found) = get_log(State(state.clone()), Path(ids[0].clone())).await.unwrap();
        assert_eq!(found.id, ids[0]);
        assert_eq!(found.record.request_data["newMessage"]["parts"][0]["text"], "hi");

        let missing = get_log(State(state), Path("nope".to_string())).await.unwrap_err();
        assert_eq!(missing.into_response().status(), StatusCode::NOT_FOUND);
    }
}
