//! Elasticsearch REST backend

use async_trait::async_trait;
use reqwest::{header, Client, Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use url::Url;

use super::{IndexedDocument, LogQuery, LogStore, StoreError, StoredRecord};
use crate::config::LogStoreConfig;

#[derive(Debug, Clone)]
enum Auth {
    None,
    ApiKey(String),
    Basic { username: String, password: String },
}

pub struct ElasticsearchStore {
    client: Client,
    base_url: Url,
    auth: Auth,
}

#[derive(Debug, Deserialize)]
struct IndexResponse {
    #[serde(rename = "_id")]
    id: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    hits: SearchHits,
}

#[derive(Debug, Deserialize)]
struct SearchHits {
    hits: Vec<Hit>,
}

/// `_source` stays raw so one malformed document cannot fail a whole page
#[derive(Debug, Deserialize)]
struct Hit {
    #[serde(rename = "_id")]
    id: String,
    #[serde(rename = "_source")]
    source: Value,
}

#[derive(Debug, Deserialize)]
struct GetResponse {
    #[serde(rename = "_id")]
    id: String,
    #[serde(default)]
    found: bool,
    #[serde(rename = "_source")]
    source: Option<Value>,
}

impl ElasticsearchStore {
    pub fn new(config: &LogStoreConfig) -> Result<Self, StoreError> {
        let base_url = Url::parse(&config.endpoint)
            .map_err(|e| StoreError::Connect(format!("invalid endpoint '{}': {}", config.endpoint, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(StoreError::Connect(format!("invalid endpoint '{}'", config.endpoint)));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .connect_timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| StoreError::Connect(e.to_string()))?;

        let auth = match (&config.api_key, &config.username, &config.password) {
            (Some(key), _, _) => Auth::ApiKey(key.clone()),
            (None, Some(username), Some(password)) => Auth::Basic {
                username: username.clone(),
                password: password.clone(),
            },
            _ => Auth::None,
        };

        Ok(Self {
            client,
            base_url,
            auth,
        })
    }

    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn request(&self, method: Method, segments: &[&str]) -> RequestBuilder {
        let builder = self.client.request(method, self.url(segments));

        match &self.auth {
            Auth::None => builder,
            Auth::ApiKey(key) => builder.header(header::AUTHORIZATION, format!("ApiKey {}", key)),
            Auth::Basic { username, password } => builder.basic_auth(username, Some(password)),
        }
    }
}

/// Turn a non-success response into a `StoreError`, recognising the Elasticsearch
/// error types callers act on
async fn error_from_response(index: &str, response: Response) -> StoreError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    let error_type = serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|v| v.pointer("/error/type").and_then(Value::as_str).map(str::to_string));

    match error_type.as_deref() {
        Some("resource_already_exists_exception") => StoreError::AlreadyExists(index.to_string()),
        Some("index_not_found_exception") => StoreError::IndexNotFound(index.to_string()),
        _ => StoreError::Status {
            status: status.as_u16(),
            body,
        },
    }
}

fn decode_source(source: Value) -> Result<IndexedDocument, StoreError> {
    Ok(serde_json::from_value(source)?)
}

#[async_trait]
impl LogStore for ElasticsearchStore {
    fn backend_name(&self) -> &'static str {
        "elasticsearch"
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let response = self.request(Method::GET, &[]).send().await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(error_from_response("", response).await)
        }
    }

    async fn index_exists(&self, index: &str) -> Result<bool, StoreError> {
        let response = self.request(Method::HEAD, &[index]).send().await?;
        match response.status() {
            StatusCode::OK => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            _ => Err(error_from_response(index, response).await),
        }
    }

    async fn create_index(&self, index: &str, mappings: &Value) -> Result<(), StoreError> {
        let response = self
            .request(Method::PUT, &[index])
            .json(&serde_json::json!({ "mappings": mappings }))
            .send()
            .await?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(error_from_response(index, response).await)
        }
    }

    async fn insert(&self, index: &str, document: &IndexedDocument) -> Result<String, StoreError> {
        let response = self
            .request(Method::POST, &[index, "_doc"])
            .json(document)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(index, response).await);
        }

        let body: IndexResponse = response.json().await?;
        Ok(body.id)
    }

    async fn search(&self, index: &str, query: &LogQuery) -> Result<Vec<StoredRecord>, StoreError> {
        let response = self
            .request(Method::POST, &[index, "_search"])
            .json(&query.to_search_body())
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(index, response).await);
        }

        let body: SearchResponse = response.json().await?;
        Ok(body
            .hits
            .hits
            .into_iter()
            .filter_map(|hit| match decode_source(hit.source) {
                Ok(document) => Some(StoredRecord::from_document(hit.id, document)),
                Err(e) => {
                    tracing::warn!(index = %index, id = %hit.id, error = %e, "Skipping undecodable log document");
                    None
                }
            })
            .collect())
    }

    async fn get(&self, index: &str, id: &str) -> Result<Option<StoredRecord>, StoreError> {
        let response = self.request(Method::GET, &[index, "_doc", id]).send().await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            // A missing document answers 404 with `found: false`; a missing index is an error body
            let body = response.text().await.unwrap_or_default();
            return match serde_json::from_str::<GetResponse>(&body) {
                Ok(_) => Ok(None),
                Err(_) => Err(StoreError::IndexNotFound(index.to_string())),
            };
        }
        if !status.is_success() {
            return Err(error_from_response(index, response).await);
        }

        let body: GetResponse = response.json().await?;
        match (body.found, body.source) {
            (true, Some(source)) => {
                let document = decode_source(source)?;
                Ok(Some(StoredRecord::from_document(body.id, document)))
            }
            _ => Ok(None),
        }
    }
}
