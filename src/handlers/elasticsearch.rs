//! `GET /api/elasticsearch`: connectivity check and raw record search

use axum::extract::{rejection::QueryRejection, Query, State};
use axum::response::{IntoResponse, Json, Response};
use serde::{Deserialize, Serialize};

use super::AppState;
use crate::error::AppError;
use crate::store::{LogQuery, StoredRecord};

const DEFAULT_SEARCH_LIMIT: usize = 10;

#[derive(Debug, Default, Deserialize)]
pub struct StoreParams {
    /// `test` checks connectivity; anything else searches
    pub action: Option<String>,
    pub limit: Option<usize>,
    #[serde(rename = "userId")]
    pub user_id: Option<String>,
    #[serde(rename = "sessionId")]
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ConnectionStatus {
    pub connected: bool,
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub total: usize,
    pub data: Vec<StoredRecord>,
}

pub async fn handle_store_request(
    State(state): State<AppState>,
    params: Result<Query<StoreParams>, QueryRejection>,
) -> Result<Response, AppError> {
    let Query(params) = params.map_err(|e| AppError::BadRequest(e.body_text()))?;

    if params.action.as_deref() == Some("test") {
        let connected = state.log_store.probe().await;
        let message = if connected {
            "Elasticsearch connection successful"
        } else {
            "Elasticsearch connection failed"
        };
        return Ok(Json(ConnectionStatus { connected, message }).into_response());
    }

    let query = LogQuery {
        user_id: params.user_id.filter(|v| !v.is_empty()),
        session_id: params.session_id.filter(|v| !v.is_empty()),
        limit: params
            .limit
            .unwrap_or(DEFAULT_SEARCH_LIMIT)
            .min(state.config.query.max_limit),
        ..Default::default()
    };

    let data = state
        .queries
        .search(&query)
        .await
        .map_err(|source| AppError::StoreError {
            context: "Failed to process request",
            source,
        })?;

    Ok(Json(SearchResponse {
        total: data.len(),
        data,
    })
    .into_response())
}
