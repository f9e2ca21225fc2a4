// src/ingest/error.rs
use std::path::PathBuf;
use thiserror::Error;

/// Failure to obtain a usable feed from one source. Recovered at the source loop.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("HTTP {status} when fetching {url}")]
    Status { status: u16, url: String },

    #[error("failed to parse feed: {0}")]
    Parse(String),
}

/// Failure to persist the ranked output. Fatal for the run.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("failed to serialize news items: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
