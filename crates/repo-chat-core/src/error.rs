//! Error types shared by the indexing and query paths.
//!
//! [`Error`] is what pipeline operations return. Provider and storage
//! failures carry their own enums so callers can tell a transient rate limit
//! from a bad credential or an unwritable index directory.

use std::time::Duration;
use thiserror::Error;

/// Failure reported by an external embedding or generation provider.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// 401/403 from the provider.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The credential environment variable is not set.
    #[error("missing credential: {0} is not set")]
    MissingCredential(String),

    /// 429 from the provider.
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// 5xx from the provider.
    #[error("provider unavailable: {0}")]
    Server(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// Any other 4xx.
    #[error("request rejected: {0}")]
    Rejected(String),

    #[error("invalid provider response: {0}")]
    InvalidResponse(String),

    #[error("provider is disabled")]
    Disabled,
}

impl ProviderError {
    /// Map a non-success HTTP status and response body to an error kind.
    pub fn from_status(status: u16, body: &str) -> Self {
        let detail = format!("HTTP {}: {}", status, body.trim());
        match status {
            401 | 403 => Self::Auth(detail),
            429 => Self::RateLimited(detail),
            500..=599 => Self::Server(detail),
            _ => Self::Rejected(detail),
        }
    }

    /// Whether retrying the same request may succeed.
    ///
    /// Rate limits, server errors, network errors and timeouts are
    /// transient. Credential problems, rejected requests and malformed
    /// responses are not.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::RateLimited(_) | Self::Server(_) | Self::Network(_) | Self::Timeout(_)
        )
    }
}

/// Failure of the persisted vector index.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("index path {path} is not writable: {reason}")]
    Unwritable { path: String, reason: String },

    #[error("collection '{0}' does not exist")]
    UnknownCollection(String),

    #[error("collection '{collection}' holds {expected}-dimensional vectors, got {actual}")]
    DimensionMismatch {
        collection: String,
        expected: usize,
        actual: usize,
    },

    #[error("corrupt index data: {0}")]
    Corrupt(String),

    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Top-level error for pipeline operations.
#[derive(Error, Debug)]
pub enum Error {
    /// The document collector could not walk or read its root.
    ///
    /// Unreadable individual files are skipped and logged instead.
    #[error("cannot collect documents from {path}: {reason}")]
    Collection { path: String, reason: String },

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("embedding provider error: {0}")]
    EmbeddingProvider(#[source] ProviderError),

    #[error("answer generator error: {0}")]
    Generator(#[source] ProviderError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
