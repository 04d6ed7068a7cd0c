//! YGOPRODeck API client
//!
//! [`YgoApi::request`] is the single path to the network. It answers from
//! the configured cache when it can, otherwise walks the host list with a
//! per-host retry budget, pacing every attempt through the optional queue.
//! Successful payloads are cached and, when image caching is enabled, their
//! card artwork is downloaded on a detached task.

mod endpoints;

use crate::cache::{FileSystemImageCache, ImageKey, ImageSize, ImageStore, KvStore};
use crate::config::{ClientOptions, ImageCacheOption, RetryConfig};
use crate::error::{ApiError, Result, TransportError};
use crate::models::CardImage;
use crate::params::{build_url, cache_key, QueryParams};
use crate::queue::TimeQueue;
use futures::future::BoxFuture;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE, USER_AGENT};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;

pub use endpoints::{CARD_INFO, RANDOM_CARD};

/// User agent sent unless overridden through [`ClientOptions::headers`]
pub const DEFAULT_USER_AGENT: &str = concat!("ygo_client/", env!("CARGO_PKG_VERSION"));

/// Raw answer of one HTTP exchange
#[derive(Debug, Clone)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
}

/// What a queued attempt hands back to the client
pub type AttemptOutcome = std::result::Result<HttpReply, TransportError>;

/// Queue type accepted by [`ClientOptions::queue`]
pub type RequestQueue = dyn TimeQueue<AttemptOutcome>;

/// Cache-aware, retrying client for the YGOPRODeck API
#[derive(Clone)]
pub struct YgoApi {
    http: reqwest::Client,
    headers: HeaderMap,
    /// Primary host first, then fallbacks
    hosts: Vec<String>,
    cache: Option<Arc<dyn KvStore>>,
    queue: Option<Arc<RequestQueue>>,
    cache_ttl: Duration,
    retry: RetryConfig,
    timeout: Duration,
    image_cache: Option<Arc<dyn ImageStore>>,
    image_cache_enabled: bool,
}

impl Default for YgoApi {
    fn default() -> Self {
        Self::new(ClientOptions::default())
    }
}

impl std::fmt::Debug for YgoApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YgoApi")
            .field("hosts", &self.hosts)
            .field("cache", &self.cache.is_some())
            .field("queue", &self.queue.is_some())
            .field("cache_ttl", &self.cache_ttl)
            .field("retry", &self.retry)
            .field("timeout", &self.timeout)
            .field("image_cache_enabled", &self.image_cache_enabled)
            .finish()
    }
}

fn default_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(USER_AGENT, HeaderValue::from_static(DEFAULT_USER_AGENT));
    headers
}

impl YgoApi {
    pub fn new(options: ClientOptions) -> Self {
        let mut headers = default_headers();
        headers.extend(options.headers);

        let image_cache: Option<Arc<dyn ImageStore>> = match options.image_cache {
            Some(ImageCacheOption::FileSystem(fs_options)) => {
                Some(Arc::new(FileSystemImageCache::new(fs_options)))
            }
            Some(ImageCacheOption::Store(store)) => Some(store),
            None if options.image_cache_enabled => Some(Arc::new(FileSystemImageCache::default())),
            None => None,
        };

        let mut hosts = Vec::with_capacity(1 + options.fallback.urls.len());
        hosts.push(options.base_url);
        hosts.extend(options.fallback.urls);

        Self {
            http: reqwest::Client::new(),
            headers,
            hosts,
            cache: options.cache,
            queue: options.queue,
            cache_ttl: options.cache_ttl,
            retry: options.retry,
            timeout: options.fallback.timeout,
            image_cache,
            image_cache_enabled: options.image_cache_enabled,
        }
    }

    /// Hosts in the order they are tried
    pub fn hosts(&self) -> &[String] {
        &self.hosts
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Fetch `endpoint` with `params`, decoded as `T`.
    ///
    /// Fails only with a validation error, a 4xx answer, or the last error
    /// observed once every attempt on every host has failed.
    pub async fn request<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &QueryParams,
    ) -> Result<T> {
        params.validate()?;

        let key = cache_key(endpoint, params);
        if let Some(cached) = self.read_cache(&key).await {
            return Ok(cached);
        }

        let max_attempts = self.retry.max_attempts;
        let mut last_error = None;

        for host in &self.hosts {
            let url = match build_url(host, endpoint, params) {
                Ok(url) => url,
                Err(e) => {
                    log::warn!("Skipping host {}: invalid URL ({})", host, e);
                    last_error = Some(ApiError::Network {
                        message: format!("invalid URL for host {}: {}", host, e),
                    });
                    continue;
                }
            };

            for attempt in 1..=max_attempts {
                match self.attempt::<T>(&url).await {
                    Ok((value, body)) => {
                        self.write_cache(&key, &body).await;
                        self.cache_images_in_background(body);
                        return Ok(value);
                    }
                    Err(e @ ApiError::Client { .. }) => {
                        log::debug!("{} answered {}: {}", url, e.status_code(), e);
                        return Err(e);
                    }
                    Err(e) => {
                        log::warn!(
                            "Attempt {}/{} on {} failed: {}",
                            attempt,
                            max_attempts,
                            host,
                            e
                        );
                        last_error = Some(e);
                        if attempt < max_attempts {
                            let delay = self.retry.delay_for(attempt);
                            log::debug!("Retrying in {:?}", delay);
                            tokio::time::sleep(delay).await;
                        }
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| ApiError::Network {
            message: "Unknown error".to_string(),
        }))
    }

    /// One bounded exchange with one host; returns the decoded value and the raw body
    async fn attempt<T: DeserializeOwned>(&self, url: &Url) -> Result<(T, String)> {
        let token = CancellationToken::new();
        let request = self.http.get(url.clone()).headers(self.headers.clone());
        let exchange = fetch(request, token.clone());

        let outcome = match &self.queue {
            Some(queue) => {
                let queued = queue.enqueue_job(exchange, token.clone());
                match tokio::time::timeout(self.timeout, queued).await {
                    Ok(Ok(outcome)) => outcome,
                    Ok(Err(e)) => {
                        return Err(ApiError::Network {
                            message: e.to_string(),
                        })
                    }
                    Err(_) => {
                        token.cancel();
                        return Err(self.timed_out());
                    }
                }
            }
            None => match tokio::time::timeout(self.timeout, exchange).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    token.cancel();
                    return Err(self.timed_out());
                }
            },
        };

        let reply = outcome.map_err(|e| ApiError::Network {
            message: e.to_string(),
        })?;
        let value = decode_reply(&reply)?;
        Ok((value, reply.body))
    }

    fn timed_out(&self) -> ApiError {
        ApiError::Network {
            message: format!("Request timed out after {}ms", self.timeout.as_millis()),
        }
    }

    async fn read_cache<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let cache = self.cache.as_ref()?;
        let raw = match cache.get(key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                log::debug!("Cache miss: {}", key);
                return None;
            }
            Err(e) => {
                log::warn!("Cache read failed for {}: {}", key, e);
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => {
                log::debug!("Cache hit: {}", key);
                Some(value)
            }
            Err(e) => {
                log::warn!("Ignoring unreadable cache entry {}: {}", key, e);
                None
            }
        }
    }

    async fn write_cache(&self, key: &str, body: &str) {
        let Some(cache) = &self.cache else {
            return;
        };
        if let Err(e) = cache.set(key, body, Some(self.cache_ttl)).await {
            log::warn!("Cache write failed for {}: {}", key, e);
        }
    }

    /// Download the artwork of every card in `body` on a detached task
    fn cache_images_in_background(&self, body: String) {
        if !self.image_cache_enabled {
            return;
        }
        let Some(store) = self.image_cache.clone() else {
            return;
        };

        tokio::spawn(async move {
            for image in card_images(&body) {
                for size in ImageSize::ALL {
                    let key = ImageKey::new(image.id, size);
                    if store.get(&key).await.is_some() {
                        continue;
                    }
                    if let Err(e) = store.set(&key, image.url_for(size)).await {
                        log::debug!("Could not cache image {}: {}", key, e);
                    }
                }
            }
        });
    }

    pub(crate) fn image_store(&self) -> Option<&Arc<dyn ImageStore>> {
        self.image_cache.as_ref()
    }

    pub(crate) fn cache_store(&self) -> Option<&Arc<dyn KvStore>> {
        self.cache.as_ref()
    }
}

/// GET that gives up as soon as `token` is cancelled
fn fetch(
    request: reqwest::RequestBuilder,
    token: CancellationToken,
) -> BoxFuture<'static, AttemptOutcome> {
    Box::pin(async move {
        let exchange = async {
            let response = request.send().await?;
            let status = response.status().as_u16();
            let body = response.text().await?;
            Ok::<_, TransportError>(HttpReply { status, body })
        };

        tokio::select! {
            reply = exchange => reply,
            _ = token.cancelled() => Err(TransportError::Aborted),
        }
    })
}

/// 2xx bodies decode into `T`; anything else becomes a status-bearing error
fn decode_reply<T: DeserializeOwned>(reply: &HttpReply) -> Result<T> {
    if (200..300).contains(&reply.status) {
        return serde_json::from_str(&reply.body).map_err(|e| ApiError::Network {
            message: format!("Invalid response body: {}", e),
        });
    }

    let message = error_message(reply.status, &reply.body);
    if reply.status < 500 {
        Err(ApiError::Client {
            status: reply.status,
            message,
        })
    } else {
        Err(ApiError::Server {
            status: reply.status,
            message,
        })
    }
}

/// The API explains failures in an `error` field; fall back to the status
fn error_message(status: u16, body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|payload| {
            payload
                .get("error")
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| format!("API request failed with status {}", status))
}

/// Artwork of every card in a `{"data": [card, ...]}` payload.
///
/// Only payloads whose first record carries `card_images` count as card
/// payloads.
fn card_images(body: &str) -> Vec<CardImage> {
    let Ok(payload) = serde_json::from_str::<Value>(body) else {
        return Vec::new();
    };
    let Some(cards) = payload.get("data").and_then(Value::as_array) else {
        return Vec::new();
    };
    if cards.first().and_then(|card| card.get("card_images")).is_none() {
        return Vec::new();
    }

    cards
        .iter()
        .filter_map(|card| card.get("card_images"))
        .filter_map(|images| serde_json::from_value::<Vec<CardImage>>(images.clone()).ok())
        .flatten()
        .collect()
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
