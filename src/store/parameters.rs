//! Parameter stores: named string values such as the keyword ignore list,
//! the app list, and operator settings.

use crate::error::StoreError;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tokio::sync::Mutex;

/// Key-value store of named string parameters.
#[async_trait]
pub trait ParameterStore: Send + Sync {
    /// The value of `name`, or `None` when it has never been set.
    async fn get(&self, name: &str) -> Result<Option<String>, StoreError>;

    /// Create or overwrite `name`.
    async fn put(&self, name: &str, value: &str) -> Result<(), StoreError>;

    /// Read `name` as a JSON array of strings. A missing parameter is an
    /// empty list.
    async fn get_list(&self, name: &str) -> Result<Vec<String>, StoreError> {
        match self.get(name).await? {
            None => Ok(Vec::new()),
            Some(raw) => serde_json::from_str(&raw).map_err(|e| StoreError::NotAList {
                name: name.to_string(),
                message: e.to_string(),
            }),
        }
    }
}

/// In-memory parameter store.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MemoryParameterStore {
    values: tokio::sync::RwLock<std::collections::HashMap<String, String>>,
}

#[cfg(test)]
impl MemoryParameterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with `(name, value)` pairs.
    pub fn with_values<I, K, V>(values: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: tokio::sync::RwLock::new(
                values
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        }
    }
}

#[cfg(test)]
#[async_trait]
impl ParameterStore for MemoryParameterStore {
    async fn get(&self, name: &str) -> Result<Option<String>, StoreError> {
        Ok(self.values.read().await.get(name).cloned())
    }

    async fn put(&self, name: &str, value: &str) -> Result<(), StoreError> {
        self.values
            .write()
            .await
            .insert(name.to_string(), value.to_string());
        Ok(())
    }
}

/// Parameter store backed by a JSON object file (`{"name": "value", ...}`).
///
/// A missing file reads as an empty store; `put` creates it.
#[derive(Debug)]
pub struct FileParameterStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileParameterStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    async fn read_all(&self) -> Result<BTreeMap<String, String>, StoreError> {
        let path = self.path.display().to_string();

        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(source) => {
                return Err(StoreError::Io { path, source })
            }
        };

        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }

        serde_json::from_str(&content).map_err(|e| StoreError::Format {
            path,
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl ParameterStore for FileParameterStore {
    async fn get(&self, name: &str) -> Result<Option<String>, StoreError> {
        Ok(self.read_all().await?.remove(name))
    }

    async fn put(&self, name: &str, value: &str) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;

        let mut values = self.read_all().await?;
        values.insert(name.to_string(), value.to_string());

        let path = self.path.display().to_string();
        let json = serde_json::to_string_pretty(&values).map_err(|e| StoreError::Format {
            path: path.clone(),
            message: e.to_string(),
        })?;

        tokio::fs::write(&self.path, json)
            .await
            .map_err(|source| StoreError::Io { path, source })
    }
}
