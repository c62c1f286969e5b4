//! Review sources.
//!
//! [`FileReviewSource`] reads a JSON array (or JSON lines) of review objects
//! and filters it per query.

use crate::error::SourceError;
use crate::models::{DateWindow, ReviewRecord};
use async_trait::async_trait;
use std::path::PathBuf;
use tracing::debug;

/// Backing store of review records.
#[async_trait]
pub trait ReviewSource: Send + Sync {
    /// Reviews of one app and version posted inside `window`.
    async fn query(
        &self,
        app_id_store: &str,
        version: &str,
        window: &DateWindow,
    ) -> Result<Vec<ReviewRecord>, SourceError>;

    /// Every review of one app, any version, any date.
    async fn query_app(&self, app_id_store: &str) -> Result<Vec<ReviewRecord>, SourceError>;
}

fn matches_query(
    record: &ReviewRecord,
    app_id_store: &str,
    version: &str,
    window: &DateWindow,
) -> bool {
    record.app_id_store == app_id_store && record.version == version && window.contains(record.date)
}

/// In-memory review source.
#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub struct MemoryReviewSource {
    records: Vec<ReviewRecord>,
}

#[cfg(test)]
impl MemoryReviewSource {
    pub fn new(records: Vec<ReviewRecord>) -> Self {
        Self { records }
    }
}

#[cfg(test)]
#[async_trait]
impl ReviewSource for MemoryReviewSource {
    async fn query(
        &self,
        app_id_store: &str,
        version: &str,
        window: &DateWindow,
    ) -> Result<Vec<ReviewRecord>, SourceError> {
        Ok(self
            .records
            .iter()
            .filter(|r| matches_query(r, app_id_store, version, window))
            .cloned()
            .collect())
    }

    async fn query_app(&self, app_id_store: &str) -> Result<Vec<ReviewRecord>, SourceError> {
        Ok(self
            .records
            .iter()
            .filter(|r| r.app_id_store == app_id_store)
            .cloned()
            .collect())
    }
}

/// Review source backed by a JSON file.
#[derive(Debug, Clone)]
pub struct FileReviewSource {
    path: PathBuf,
}

impl FileReviewSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Read and parse the whole file.
    pub async fn load(&self) -> Result<Vec<ReviewRecord>, SourceError> {
        let path = self.path.display().to_string();
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(SourceError::Unavailable(format!("{} does not exist", path)))
            }
            Err(source) => return Err(SourceError::Io { path, source }),
        };

        let records = parse_reviews(&content).map_err(|message| SourceError::Parse {
            path: path.clone(),
            message,
        })?;

        debug!("Loaded {} review(s) from {}", records.len(), path);
        Ok(records)
    }
}

/// Parse a JSON array of reviews, or one review object per line.
pub fn parse_reviews(content: &str) -> Result<Vec<ReviewRecord>, String> {
    let trimmed = content.trim_start();

    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    if trimmed.starts_with('[') {
        return serde_json::from_str(trimmed).map_err(|e| e.to_string());
    }

    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(number, line)| {
            serde_json::from_str(line).map_err(|e| format!("line {}: {}", number + 1, e))
        })
        .collect()
}

#[async_trait]
impl ReviewSource for FileReviewSource {
    async fn query(
        &self,
        app_id_store: &str,
        version: &str,
        window: &DateWindow,
    ) -> Result<Vec<ReviewRecord>, SourceError> {
        Ok(self
            .load()
            .await?
            .into_iter()
            .filter(|r| matches_query(r, app_id_store, version, window))
            .collect())
    }

    async fn query_app(&self, app_id_store: &str) -> Result<Vec<ReviewRecord>, SourceError> {
        Ok(self
            .load()
            .await?
            .into_iter()
            .filter(|r| r.app_id_store == app_id_store)
            .collect())
    }
}
