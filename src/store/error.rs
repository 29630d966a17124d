use thiserror::Error;

/// Failures talking to the log store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to build log store client: {0}")]
    Connect(String),

    #[error("log store request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("index '{0}' already exists")]
    AlreadyExists(String),

    #[error("index '{0}' not found")]
    IndexNotFound(String),

    #[error("log store returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("unexpected log store response: {0}")]
    Decode(String),

    #[error("log store operation timed out")]
    Timeout,
}

impl From<tokio::time::error::Elapsed> for StoreError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        Self::Timeout
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}
