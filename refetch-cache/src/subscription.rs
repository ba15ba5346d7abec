//! Consumer-side streams returned by `get` and `updates`.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::{FutureExt, Stream};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::debug;

use refetch_core::Result;

use crate::flight::Outcome;

/// Stream returned by [`TtlCache::get`](crate::TtlCache::get).
///
/// Yields the current value (from memory or from the fetch it triggered or
/// joined), then every value later broadcast by the cache. If the fetch this
/// subscription waited on fails before any value was yielded, the error is
/// yielded once and the stream ends. Errors from fetches it did not wait
/// on, such as a failed `sync`, never reach it.
///
/// Dropping the stream does not cancel a fetch other callers share.
#[must_use = "streams do nothing unless polled"]
pub struct Subscription<T> {
    rx: UnboundedReceiver<T>,
    pending: Option<Outcome>,
    surface_errors: bool,
    done: bool,
}

impl<T> Subscription<T> {
    pub(crate) fn new(rx: UnboundedReceiver<T>, pending: Option<Outcome>, surface_errors: bool) -> Self {
        Self {
            rx,
            pending,
            surface_errors,
            done: false,
        }
    }

    /// Returns true while this subscription is still waiting on its fetch.
    pub fn is_waiting(&self) -> bool {
        self.pending.is_some()
    }
}

impl<T> Stream for Subscription<T> {
    type Item = Result<T>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.done {
            return Poll::Ready(None);
        }

        loop {
            // Values are queued before the fetch resolves, so draining the
            // channel first keeps a success from being observed as "nothing".
            match this.rx.poll_recv(cx) {
                Poll::Ready(Some(value)) => {
                    // Once a value is out, a later failure of the awaited
                    // fetch belongs to whoever requested that fetch.
                    this.pending = None;
                    return Poll::Ready(Some(Ok(value)));
                }
                Poll::Ready(None) => {
                    this.done = true;
                    return Poll::Ready(None);
                }
                Poll::Pending => {}
            }

            let Some(outcome) = this.pending.as_mut() else {
                return Poll::Pending;
            };

            match outcome.poll_unpin(cx) {
                Poll::Pending => return Poll::Pending,
                Poll::Ready(Ok(())) => {
                    this.pending = None;
                }
                Poll::Ready(Err(err)) => {
                    this.pending = None;
                    if this.surface_errors {
                        this.done = true;
                        this.rx.close();
                        return Poll::Ready(Some(Err(err)));
                    }
                    debug!(error = %err, "Swallowing fetch failure for update stream");
                }
            }
        }
    }
}

/// Stream returned by [`TtlCache::updates`](crate::TtlCache::updates).
///
/// Like [`Subscription`] but never fails: a failed fetch yields nothing and
/// the stream stays open for the next successful one.
#[must_use = "streams do nothing unless polled"]
pub struct Updates<T> {
    inner: Subscription<T>,
}

impl<T> Updates<T> {
    pub(crate) fn new(inner: Subscription<T>) -> Self {
        Self { inner }
    }
}

impl<T> Stream for Updates<T> {
    type Item = T;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            match Pin::new(&mut this.inner).poll_next(cx) {
                Poll::Ready(Some(Ok(value))) => return Poll::Ready(Some(value)),
                Poll::Ready(Some(Err(_))) => continue,
                Poll::Ready(None) => return Poll::Ready(None),
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}
