//! Persistent cache for card artwork
//!
//! Images are stored as `<cache_dir>/<card id>/<size>.jpg`. An image that is
//! present is trusted as-is until it is deleted or swept by age.

use super::{default_cache_dir, sweep_dir, CacheSweep, FileSystemCacheOptions};
use crate::error::CacheError;
use async_trait::async_trait;
use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Default maximum age of a cached image
pub const DEFAULT_IMAGE_MAX_AGE: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Distinguishes concurrent downloads of the same key
static DOWNLOAD_SEQ: AtomicU64 = AtomicU64::new(0);

/// Artwork variants published for every card image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ImageSize {
    #[default]
    Default,
    Small,
    Cropped,
}

impl ImageSize {
    pub const ALL: [ImageSize; 3] = [ImageSize::Default, ImageSize::Small, ImageSize::Cropped];

    pub fn as_str(&self) -> &'static str {
        match self {
            ImageSize::Default => "default",
            ImageSize::Small => "small",
            ImageSize::Cropped => "cropped",
        }
    }
}

impl fmt::Display for ImageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImageSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "default" => Ok(ImageSize::Default),
            "small" => Ok(ImageSize::Small),
            "cropped" => Ok(ImageSize::Cropped),
            other => Err(format!("unknown image size: {}", other)),
        }
    }
}

/// `"<card id>:<size>"`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageKey {
    pub card_id: u64,
    pub size: ImageSize,
}

impl ImageKey {
    pub fn new(card_id: u64, size: ImageSize) -> Self {
        Self { card_id, size }
    }
}

impl fmt::Display for ImageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.card_id, self.size)
    }
}

impl FromStr for ImageKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (id, size) = s
            .split_once(':')
            .ok_or_else(|| format!("invalid image key: {}", s))?;
        let card_id = id
            .parse()
            .map_err(|_| format!("invalid card id in image key: {}", s))?;
        Ok(Self {
            card_id,
            size: size.parse()?,
        })
    }
}

/// Keyed store of downloaded card images
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Local artifact for `key`, if it has been cached
    async fn get(&self, key: &ImageKey) -> Option<PathBuf>;

    /// Download `source_url` and persist it under `key`
    async fn set(&self, key: &ImageKey, source_url: &str) -> Result<PathBuf, CacheError>;

    async fn delete(&self, _key: &ImageKey) {}

    /// Age-based cleanup capability, if this store has one
    fn sweeper(&self) -> Option<&dyn CacheSweep> {
        None
    }
}

/// [`ImageStore`] writing JPG files below a cache directory
pub struct FileSystemImageCache {
    cache_dir: PathBuf,
    max_age: Duration,
    http: reqwest::Client,
}

impl Default for FileSystemImageCache {
    fn default() -> Self {
        Self::new(FileSystemCacheOptions::default())
    }
}

impl FileSystemImageCache {
    pub fn new(options: FileSystemCacheOptions) -> Self {
        Self::with_client(options, reqwest::Client::new())
    }

    /// Use a preconfigured HTTP client for downloads
    pub fn with_client(options: FileSystemCacheOptions, http: reqwest::Client) -> Self {
        let cache_dir = options
            .cache_dir
            .unwrap_or_else(|| default_cache_dir("images"));
        log::info!("Image cache directory: {:?}", cache_dir);
        Self {
            cache_dir,
            max_age: options.max_age.unwrap_or(DEFAULT_IMAGE_MAX_AGE),
            http,
        }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub fn max_age(&self) -> Duration {
        self.max_age
    }

    /// Get the full path for a cached image
    fn path(&self, key: &ImageKey) -> PathBuf {
        self.cache_dir
            .join(key.card_id.to_string())
            .join(format!("{}.jpg", key.size))
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, CacheError> {
        log::debug!("Fetching image: {}", url);
        let response = self.http.get(url).send().await?;
        if !response.status().is_success() {
            return Err(CacheError::Download(format!(
                "{} returned {}",
                url,
                response.status()
            )));
        }
        Ok(response.bytes().await?.to_vec())
    }
}

#[async_trait]
impl ImageStore for FileSystemImageCache {
    async fn get(&self, key: &ImageKey) -> Option<PathBuf> {
        let path = self.path(key);
        match tokio::fs::metadata(&path).await {
            Ok(metadata) if metadata.is_file() => {
                log::debug!("Image cache hit for {}", key);
                Some(path)
            }
            _ => None,
        }
    }

    async fn set(&self, key: &ImageKey, source_url: &str) -> Result<PathBuf, CacheError> {
        let bytes = self.download(source_url).await?;

        let path = self.path(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        // Each download gets its own sibling, renamed into place once complete
        let seq = DOWNLOAD_SEQ.fetch_add(1, Ordering::Relaxed);
        let partial = path.with_extension(format!("jpg.{}.{}.part", std::process::id(), seq));
        tokio::fs::write(&partial, &bytes).await?;
        if let Err(e) = tokio::fs::rename(&partial, &path).await {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(e.into());
        }

        log::debug!("Cached image {} ({} bytes)", key, bytes.len());
        Ok(path)
    }

    async fn delete(&self, key: &ImageKey) {
        let path = self.path(key);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => log::warn!("Failed to delete cached image {}: {}", key, e),
        }
    }

    fn sweeper(&self) -> Option<&dyn CacheSweep> {
        Some(self)
    }
}

#[async_trait]
impl CacheSweep for FileSystemImageCache {
    async fn cleanup(&self) -> usize {
        sweep_dir(&self.cache_dir, self.max_age, |_| true).await
    }
}

#[cfg(test)]
#[path = "image_cache_tests.rs"]
mod tests;
