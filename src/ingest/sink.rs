// src/ingest/sink.rs
use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{info, instrument};

use crate::ingest::error::SinkError;
use crate::ingest::types::NewsItem;

pub const DEFAULT_OUTPUT_PATH: &str = "news.json";

#[async_trait::async_trait]
pub trait NewsSink: Send + Sync {
    /// Persist the final, ranked items, replacing any previous output.
    async fn write(&self, items: &[NewsItem]) -> Result<(), SinkError>;
}

/// Pretty-printed JSON array on disk, written via a sibling temp file + rename.
#[derive(Debug, Clone)]
pub struct JsonFileSink {
    path: PathBuf,
}

impl JsonFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn tmp_path(&self) -> PathBuf {
        let mut os = self.path.as_os_str().to_owned();
        os.push(".tmp");
        PathBuf::from(os)
    }
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> SinkError + '_ {
    move |source| SinkError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[async_trait::async_trait]
impl NewsSink for JsonFileSink {
    #[instrument(level = "info", skip_all, fields(path = %self.path.display(), count = items.len()))]
    async fn write(&self, items: &[NewsItem]) -> Result<(), SinkError> {
        let json = serde_json::to_string_pretty(items)?;

        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).await.map_err(io_err(dir))?;
        }

        let tmp = self.tmp_path();
        fs::write(&tmp, json.as_bytes()).await.map_err(io_err(&tmp))?;
        if let Err(e) = fs::rename(&tmp, &self.path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(io_err(&self.path)(e));
        }

        info!(bytes = json.len(), "wrote news file");
        Ok(())
    }
}

/// Keeps every written batch in memory.
#[derive(Default)]
pub struct MemorySink {
    pub calls: std::sync::Mutex<Vec<Vec<NewsItem>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last(&self) -> Option<Vec<NewsItem>> {
        self.calls.lock().ok().and_then(|c| c.last().cloned())
    }
}

#[async_trait::async_trait]
impl NewsSink for MemorySink {
    async fn write(&self, items: &[NewsItem]) -> Result<(), SinkError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(items.to_vec());
        }
        Ok(())
    }
}
