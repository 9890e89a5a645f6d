use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::Mutex;

use super::KeyValueStore;
use crate::error::{CallError, CallResult};

/// Stores each key as `<dir>/<key>.json`.
///
/// Writes go to a temp file that is renamed over the target, so a crash mid-write
/// leaves the previous value in place.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

#[async_trait]
impl KeyValueStore for JsonFileStore {
    async fn get(&self, key: &str) -> CallResult<Option<String>> {
        match tokio::fs::read_to_string(self.path_for(key)).await {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(CallError::storage_failure(key, e.to_string())),
        }
    }

    async fn set(&self, key: &str, value: String) -> CallResult<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| CallError::storage_failure(key, e.to_string()))?;

        let target = self.path_for(key);
        let temp = target.with_extension("json.tmp");
        tokio::fs::write(&temp, value.as_bytes())
            .await
            .map_err(|e| CallError::storage_failure(key, e.to_string()))?;
        tokio::fs::rename(&temp, &target)
            .await
            .map_err(|e| CallError::storage_failure(key, e.to_string()))?;

        tracing::trace!(key, path = %target.display(), "persisted key");
        Ok(())
    }

    async fn remove(&self, key: &str) -> CallResult<()> {
        match tokio::fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CallError::storage_failure(key, e.to_string())),
        }
    }
}

/// In-process store
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> CallResult<Option<String>> {
        Ok(self.entries.lock().get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> CallResult<()> {
        self.entries.lock().insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> CallResult<()> {
        self.entries.lock().remove(key);
        Ok(())
    }
}
