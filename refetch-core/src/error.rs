//! Error types for refetch.
//!
//! A single fetch can be awaited by many callers at once, so the error is
//! `Clone` and keeps the source's failure behind an `Arc`.

use std::error::Error as StdError;
use std::sync::Arc;

use thiserror::Error;

/// Boxed error returned by a [`Source`](crate::Source).
pub type BoxError = Box<dyn StdError + Send + Sync>;

/// Result type alias using `CacheError`.
pub type Result<T> = std::result::Result<T, CacheError>;

/// Main error type for all cache operations.
#[derive(Debug, Clone, Error)]
pub enum CacheError {
    /// The source failed to produce a value.
    #[error("Fetch failed: {0}")]
    FetchFailed(Arc<dyn StdError + Send + Sync>),

    /// The subscription ended before a value was delivered.
    #[error("Cache subscription closed before a value was delivered")]
    Closed,

    /// Configuration rejected at construction time.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl CacheError {
    /// Wraps a source failure.
    pub fn fetch_failed(err: impl Into<BoxError>) -> Self {
        CacheError::FetchFailed(Arc::from(err.into()))
    }

    /// Returns true if this error came from the source.
    pub fn is_fetch_failure(&self) -> bool {
        matches!(self, CacheError::FetchFailed(_))
    }

    /// Returns the underlying source failure, if any.
    pub fn cause(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        match self {
            CacheError::FetchFailed(cause) => Some(cause.as_ref()),
            _ => None,
        }
    }
}
