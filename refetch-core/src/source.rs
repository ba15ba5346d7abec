//! The producer a cache wraps.

use std::future::Future;

use async_trait::async_trait;

use crate::error::BoxError;

/// Asynchronous producer of the cached value.
///
/// Each call to [`fetch`](Source::fetch) is an independent invocation. The
/// cache guarantees it never starts a new invocation while a previous one
/// for the same cache is still unresolved, but does not assume invocations
/// are free of side effects.
///
/// Closures returning a future implement this trait directly:
///
/// ```rust
/// use refetch_core::{BoxError, Source};
///
/// fn assert_source<S: Source<u64>>(_: S) {}
///
/// assert_source(|| async { Ok::<_, BoxError>(42u64) });
/// ```
#[async_trait]
pub trait Source<T>: Send + Sync {
    /// Produces a new value or a failure.
    async fn fetch(&self) -> Result<T, BoxError>;
}

#[async_trait]
impl<T, F, Fut, E> Source<T> for F
where
    T: Send + 'static,
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    E: Into<BoxError> + 'static,
{
    async fn fetch(&self) -> Result<T, BoxError> {
        (self)().await.map_err(Into::into)
    }
}
