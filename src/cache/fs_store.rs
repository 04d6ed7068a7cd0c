//! Filesystem-backed response store
//!
//! Each key is hashed with SHA-256 into `<cache_dir>/<hex>.json`. TTLs passed
//! to `set` are remembered per key for the life of the store; entries without
//! one fall back to the store's `max_age`. Freshness is judged against the
//! file's modification time, and stale files are deleted when read.

use super::{default_cache_dir, sweep_dir, CacheSweep, KvStore};
use crate::error::CacheError;
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, SystemTime};

/// Default maximum age of a cached response
pub const DEFAULT_DATA_MAX_AGE: Duration = Duration::from_secs(5 * 60);

/// Location and retention for the filesystem stores
#[derive(Debug, Clone, Default)]
pub struct FileSystemCacheOptions {
    /// Root directory; each store picks its own default when unset
    pub cache_dir: Option<PathBuf>,
    /// Maximum file age used by cleanup (and by `get` when no TTL is known)
    pub max_age: Option<Duration>,
}

/// [`KvStore`] persisting each entry as a JSON file
pub struct FileSystemStore {
    cache_dir: PathBuf,
    max_age: Duration,
    ttls: Mutex<HashMap<String, Duration>>,
}

impl Default for FileSystemStore {
    fn default() -> Self {
        Self::new(FileSystemCacheOptions::default())
    }
}

impl FileSystemStore {
    pub fn new(options: FileSystemCacheOptions) -> Self {
        let cache_dir = options
            .cache_dir
            .unwrap_or_else(|| default_cache_dir("data"));
        log::info!("Response cache directory: {:?}", cache_dir);
        Self {
            cache_dir,
            max_age: options.max_age.unwrap_or(DEFAULT_DATA_MAX_AGE),
            ttls: Mutex::new(HashMap::new()),
        }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub fn max_age(&self) -> Duration {
        self.max_age
    }

    /// Hash the key into a fixed-length, filesystem-safe file name
    fn key_to_path(&self, key: &str) -> PathBuf {
        let digest = Sha256::digest(key.as_bytes());
        self.cache_dir.join(format!("{}.json", hex::encode(digest)))
    }

    fn ttl_for(&self, key: &str) -> Duration {
        self.ttls
            .lock()
            .ok()
            .and_then(|ttls| ttls.get(key).copied())
            .unwrap_or(self.max_age)
    }

    fn forget_ttl(&self, key: &str) {
        if let Ok(mut ttls) = self.ttls.lock() {
            ttls.remove(key);
        }
    }

    async fn remove(&self, key: &str) {
        let path = self.key_to_path(key);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => log::warn!("Failed to delete cache file {:?}: {}", path, e),
        }
        self.forget_ttl(key);
    }
}

#[async_trait]
impl KvStore for FileSystemStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let path = self.key_to_path(key);

        let metadata = match tokio::fs::metadata(&path).await {
            Ok(metadata) => metadata,
            Err(e) => {
                if e.kind() != ErrorKind::NotFound {
                    log::debug!("Cache stat failed for {:?}: {}", path, e);
                }
                return Ok(None);
            }
        };

        let age = metadata
            .modified()
            .ok()
            .and_then(|modified| SystemTime::now().duration_since(modified).ok())
            .unwrap_or_default();
        if age > self.ttl_for(key) {
            log::debug!("Cache entry expired after {:?}: {}", age, key);
            self.remove(key).await;
            return Ok(None);
        }

        match tokio::fs::read_to_string(&path).await {
            Ok(content) => Ok(Some(content)),
            Err(e) => {
                log::debug!("Cache read failed for {:?}: {}", path, e);
                Ok(None)
            }
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), CacheError> {
        let path = self.key_to_path(key);

        if let Err(e) = tokio::fs::create_dir_all(&self.cache_dir).await {
            log::warn!("Failed to create cache directory {:?}: {}", self.cache_dir, e);
            return Ok(());
        }
        if let Err(e) = tokio::fs::write(&path, value).await {
            log::warn!("Failed to write cache file {:?}: {}", path, e);
            return Ok(());
        }

        if let Some(ttl) = ttl {
            if let Ok(mut ttls) = self.ttls.lock() {
                ttls.insert(key.to_string(), ttl);
            }
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.remove(key).await;
        Ok(())
    }

    fn sweeper(&self) -> Option<&dyn CacheSweep> {
        Some(self)
    }
}

#[async_trait]
impl CacheSweep for FileSystemStore {
    async fn cleanup(&self) -> usize {
        sweep_dir(&self.cache_dir, self.max_age, |path| {
            path.extension().is_some_and(|ext| ext == "json")
        })
        .await
    }
}

#[cfg(test)]
#[path = "fs_store_tests.rs"]
mod tests;
