//! Client configuration
//!
//! Everything is optional; `ClientOptions::default()` talks to the public
//! YGOPRODeck API with no cache, no queue and image caching disabled.

use crate::cache::{FileSystemCacheOptions, ImageStore, KvStore};
use crate::client::RequestQueue;
use reqwest::header::HeaderMap;
use std::sync::Arc;
use std::time::Duration;

/// Primary API host
pub const DEFAULT_BASE_URL: &str = "https://db.ygoprodeck.com/api/v7";

/// TTL applied to cached responses
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_millis(300_000);

/// Per-attempt timeout, queue wait included
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(5_000);

/// Exponential backoff between attempts on the same host
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Attempts per host, the first one included
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub backoff_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1_000),
            max_delay: Duration::from_millis(10_000),
            backoff_factor: 2.0,
        }
    }
}

impl RetryConfig {
    /// `min(base_delay * backoff_factor^(attempt - 1), max_delay)` for a 1-based attempt
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let secs = self.base_delay.as_secs_f64() * self.backoff_factor.powi(exponent);
        if !secs.is_finite() || secs >= self.max_delay.as_secs_f64() {
            return self.max_delay;
        }
        Duration::from_secs_f64(secs.max(0.0))
    }
}

/// Alternate hosts tried after the primary one is exhausted
#[derive(Debug, Clone, PartialEq)]
pub struct FallbackConfig {
    /// Base URLs, tried in order after the primary
    pub urls: Vec<String>,
    /// Bound on each attempt
    pub timeout: Duration,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            urls: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Where downloaded artwork goes
#[derive(Clone)]
pub enum ImageCacheOption {
    /// Built-in [`crate::cache::FileSystemImageCache`]
    FileSystem(FileSystemCacheOptions),
    /// Any other image store
    Store(Arc<dyn ImageStore>),
}

/// Construction-time configuration of [`crate::YgoApi`]
#[derive(Clone)]
pub struct ClientOptions {
    pub base_url: String,
    /// Extra headers; they override the defaults on name clashes
    pub headers: HeaderMap,
    pub cache: Option<Arc<dyn KvStore>>,
    pub queue: Option<Arc<RequestQueue>>,
    pub cache_ttl: Duration,
    pub retry: RetryConfig,
    pub fallback: FallbackConfig,
    /// Store used for artwork; defaults to the filesystem cache when enabled
    pub image_cache: Option<ImageCacheOption>,
    /// Download artwork of returned cards in the background
    pub image_cache_enabled: bool,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            headers: HeaderMap::new(),
            cache: None,
            queue: None,
            cache_ttl: DEFAULT_CACHE_TTL,
            retry: RetryConfig::default(),
            fallback: FallbackConfig::default(),
            image_cache: None,
            image_cache_enabled: false,
        }
    }
}

impl std::fmt::Debug for ClientOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientOptions")
            .field("base_url", &self.base_url)
            .field("headers", &self.headers)
            .field("cache", &self.cache.is_some())
            .field("queue", &self.queue.is_some())
            .field("cache_ttl", &self.cache_ttl)
            .field("retry", &self.retry)
            .field("fallback", &self.fallback)
            .field("image_cache", &self.image_cache.is_some())
            .field("image_cache_enabled", &self.image_cache_enabled)
            .finish()
    }
}
