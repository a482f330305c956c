//! Key/value persistence backends.
//!
//! `FileStorage` keeps one JSON file per key under a directory, written with
//! owner-only permissions on unix. `MemoryStorage` is process-local.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;

use crate::error::CacheError;

/// Async string storage addressed by key.
#[async_trait::async_trait]
pub trait KeyValueStorage: Send + Sync {
    /// `Ok(None)` when the key has never been written or was removed.
    async fn get_item(&self, key: &str) -> Result<Option<String>, CacheError>;
    async fn set_item(&self, key: &str, value: &str) -> Result<(), CacheError>;
    /// Removing a missing key succeeds.
    async fn remove_item(&self, key: &str) -> Result<(), CacheError>;
}

// =============================================================================
// FILE STORAGE
// =============================================================================

pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, CacheError> {
        if key.is_empty() || !key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
            return Err(CacheError::Unavailable(format!("invalid storage key: {key:?}")));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

#[async_trait::async_trait]
impl KeyValueStorage for FileStorage {
    async fn get_item(&self, key: &str) -> Result<Option<String>, CacheError> {
        let path = self.path_for(key)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<(), CacheError> {
        let path = self.path_for(key)?;
        tokio::fs::create_dir_all(&self.dir).await?;

        let mut options = tokio::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(0o600);

        let mut file = options.open(&path).await?;
        file.write_all(value.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> Result<(), CacheError> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

// =============================================================================
// MEMORY STORAGE
// =============================================================================

#[derive(Default)]
pub struct MemoryStorage {
    items: RwLock<HashMap<String, String>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl KeyValueStorage for MemoryStorage {
    async fn get_item(&self, key: &str) -> Result<Option<String>, CacheError> {
        Ok(self.items.read().await.get(key).cloned())
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<(), CacheError> {
        self.items
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> Result<(), CacheError> {
        self.items.write().await.remove(key);
        Ok(())
    }
}

#[cfg(test)]
#[path = "storage_test.rs"]
mod tests;
