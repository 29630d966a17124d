use std::sync::Arc;

use crate::config::Config;
use crate::store::{LogStoreHandle, QueryService};

pub mod elasticsearch;
pub mod health;
pub mod logs;
pub mod metrics_handler;
pub mod run;

/// State shared by the HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub http_client: reqwest::Client,
    pub log_store: Arc<LogStoreHandle>,
    pub queries: QueryService,
}

impl AppState {
    pub fn new(config: Arc<Config>, http_client: reqwest::Client, log_store: Arc<LogStoreHandle>) -> Self {
        let queries = QueryService::new(log_store.clone(), config.query.truncate_length);
        Self {
            config,
            http_client,
            log_store,
            queries,
        }
    }
}
