//! Caching layer for API responses and images
//!
//! Response payloads go through a [`KvStore`]; card artwork goes through an
//! [`ImageStore`]. Stores that can sweep stale entries advertise it through
//! their `sweeper()` method instead of being recognised by concrete type.

pub mod fs_store;
pub mod image_cache;
pub mod memory;

use crate::error::CacheError;
use async_trait::async_trait;
use std::path::Path;
use std::time::{Duration, SystemTime};

pub use fs_store::{FileSystemCacheOptions, FileSystemStore};
pub use image_cache::{FileSystemImageCache, ImageKey, ImageSize, ImageStore};
pub use memory::MemoryStore;

/// String key-value store with optional per-entry TTL
///
/// The client treats every `Err` as a miss (on `get`) or a no-op (on `set`),
/// so implementations are free to report their faults.
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), CacheError>;

    async fn delete(&self, _key: &str) -> Result<(), CacheError> {
        Ok(())
    }

    /// Age-based cleanup capability, if this store has one
    fn sweeper(&self) -> Option<&dyn CacheSweep> {
        None
    }
}

/// Optional capability: remove entries older than the store's maximum age
#[async_trait]
pub trait CacheSweep: Send + Sync {
    /// Returns the number of entries removed
    async fn cleanup(&self) -> usize;
}

/// Recursively delete files under `dir` older than `max_age`.
///
/// Only files accepted by `filter` are considered. Unreadable entries are
/// skipped; a missing directory sweeps nothing.
pub(crate) async fn sweep_dir(dir: &Path, max_age: Duration, filter: fn(&Path) -> bool) -> usize {
    let now = SystemTime::now();
    let mut removed = 0;
    let mut stack = vec![dir.to_path_buf()];

    while let Some(current) = stack.pop() {
        let mut entries = match tokio::fs::read_dir(&current).await {
            Ok(entries) => entries,
            Err(e) => {
                log::debug!("Skipping {:?} during cleanup: {}", current, e);
                continue;
            }
        };

        while let Ok(Some(entry)) = entries.next_entry().await {
            let path = entry.path();
            let Ok(metadata) = entry.metadata().await else {
                continue;
            };
            if metadata.is_dir() {
                stack.push(path);
                continue;
            }
            if !filter(&path) {
                continue;
            }
            let expired = metadata
                .modified()
                .ok()
                .and_then(|modified| now.duration_since(modified).ok())
                .is_some_and(|age| age > max_age);
            if expired {
                match tokio::fs::remove_file(&path).await {
                    Ok(()) => removed += 1,
                    Err(e) => log::warn!("Failed to remove stale cache file {:?}: {}", path, e),
                }
            }
        }
    }

    if removed > 0 {
        log::info!("Removed {} stale cache files from {:?}", removed, dir);
    }
    removed
}

/// Default cache root: `<user cache dir>/ygo_client/<leaf>`
pub(crate) fn default_cache_dir(leaf: &str) -> std::path::PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join("ygo_client")
        .join(leaf)
}
