//! # Refetch Cache
//!
//! A single-value cache around one asynchronous [`Source`](refetch_core::Source).
//!
//! ## Features
//!
//! - **TTL**: Values are served from memory until they expire
//! - **Single-flight**: Concurrent misses share one fetch
//! - **Broadcast**: `sync` pushes a new value to every open stream
//! - **No error caching**: A failed fetch leaves the cache as it was
//!
//! ## Example
//!
//! ```rust
//! use std::time::Duration;
//! use refetch_cache::{BoxError, TtlCache};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> refetch_cache::Result<()> {
//! let cache = TtlCache::new(Duration::from_secs(30), || async { Ok::<_, BoxError>(42u32) });
//!
//! // First read fetches, later reads within 30s come from memory
//! assert_eq!(cache.value().await?, 42);
//! assert_eq!(cache.peek(), Some(42));
//!
//! // Force a refresh; open `get`/`updates` streams receive it
//! cache.sync().await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod cache;
mod flight;
mod multicast;
mod subscription;

pub use cache::TtlCache;
pub use subscription::{Subscription, Updates};

// Re-export the pieces needed to build a cache
pub use refetch_core::{
    BoxError, CacheConfig, CacheError, CacheState, CacheStats, Clock, ManualClock, Result, Source,
    SystemClock,
};
