//! Error types for ygo_client
//!
//! `ApiError` is the only error a caller of [`crate::YgoApi`] ever sees.
//! Queue and cache errors are internal plumbing: the client recovers from
//! them locally or folds them into `ApiError::Network`.

use std::time::Duration;
use thiserror::Error;

/// Status used when a failure carries no HTTP status of its own
pub const GENERIC_FAILURE_STATUS: u16 = 500;

/// Status used for rejected parameter combinations
pub const VALIDATION_STATUS: u16 = 400;

/// Domain error surfaced by the API client
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    /// Malformed parameter combination, raised before any I/O
    #[error("{message}")]
    Validation { message: String },

    /// The remote host answered with a 4xx status
    #[error("{message}")]
    Client { status: u16, message: String },

    /// The remote host kept answering with a 5xx status
    #[error("{message}")]
    Server { status: u16, message: String },

    /// Transport failure, timeout or undecodable response after all retries
    #[error("Network error: {message}")]
    Network { message: String },
}

impl ApiError {
    /// Numeric status code carried by this error
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::Validation { .. } => VALIDATION_STATUS,
            ApiError::Client { status, .. } | ApiError::Server { status, .. } => *status,
            ApiError::Network { .. } => GENERIC_FAILURE_STATUS,
        }
    }

    /// The remote API reports unknown cards with a 400, some proxies use 404
    pub fn is_not_found(&self) -> bool {
        matches!(self.status_code(), 400 | 404)
    }

    /// Whether this error came from the 500 class (server or network)
    pub fn is_server_side(&self) -> bool {
        self.status_code() >= 500
    }
}

/// Errors produced by a [`crate::queue::TimeQueue`]
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum QueueError {
    /// The cancellation token was already cancelled when the task was submitted
    #[error("Aborted before enqueueing")]
    CancelledBeforeEnqueue,

    /// The token was cancelled while the task was still waiting for its slot
    #[error("Aborted while enqueued")]
    CancelledWhileQueued,

    /// The task was dispatched but never reported a result (it panicked)
    #[error("Task dropped before producing a result")]
    TaskDropped,

    /// `done_processing` gave up waiting
    #[error("Queue still processing after {}ms timeout", .0.as_millis())]
    StillProcessing(Duration),
}

/// Failures inside a [`crate::cache::KvStore`] or [`crate::cache::ImageStore`]
///
/// Never surfaced to API callers; a faulty store behaves like an empty one.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Cache unavailable: {0}")]
    Unavailable(String),

    #[error("Image download failed: {0}")]
    Download(String),
}

impl From<reqwest::Error> for CacheError {
    fn from(err: reqwest::Error) -> Self {
        CacheError::Download(err.to_string())
    }
}

/// Failure of a single HTTP exchange, before any status is known
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("{0}")]
    Http(#[from] reqwest::Error),

    /// The attempt's cancellation token fired while the call was in flight
    #[error("Request aborted")]
    Aborted,
}

/// Result alias for client operations
pub type Result<T> = std::result::Result<T, ApiError>;
