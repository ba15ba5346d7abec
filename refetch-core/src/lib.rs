//! # Refetch Core
//!
//! Core types, errors, and traits shared by the refetch crates.
//!
//! This crate provides the building blocks the cache is assembled from:
//!
//! - **Clock**: Injectable monotonic time, with a virtual clock for tests
//! - **Source**: The asynchronous producer the cache wraps
//! - **Errors**: A single cloneable error type delivered to every waiter
//! - **Config**: Serde-backed cache configuration with env overrides
//! - **Types**: Cache state and statistics snapshots
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use refetch_core::{Clock, ManualClock};
//!
//! let clock = Arc::new(ManualClock::new());
//! clock.advance(Duration::from_millis(500));
//! assert_eq!(clock.now(), Duration::from_millis(500));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, clippy::all)]

pub mod clock;
pub mod config;
pub mod constants;
pub mod error;
pub mod source;
pub mod types;

// Re-export commonly used items at crate root
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::CacheConfig;
pub use error::{BoxError, CacheError, Result};
pub use source::Source;
pub use types::{CacheState, CacheStats};
