//! YGO Client - Yu-Gi-Oh! card database access
//!
//! Wraps the YGOPRODeck API with a throttled request queue, pluggable
//! response caching, retries across fallback hosts and a background cache
//! for card artwork.

pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod params;
pub mod queue;

pub use cache::{
    CacheSweep, FileSystemCacheOptions, FileSystemImageCache, FileSystemStore, ImageKey,
    ImageSize, ImageStore, KvStore, MemoryStore,
};
pub use client::{RequestQueue, YgoApi};
pub use config::{ClientOptions, FallbackConfig, ImageCacheOption, RetryConfig};
pub use error::{ApiError, CacheError, QueueError, Result};
pub use models::{Card, CardImage, CardInfoResponse};
pub use params::{build_comparison, CardInfoParams, ComparisonOperator, QueryParams, StatFilter};
pub use queue::{ThrottledQueue, TimeQueue};
