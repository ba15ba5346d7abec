//! The shared handle for a fetch that is currently running.

use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::task::JoinHandle;

use refetch_core::{CacheError, Result};

/// Completion of a fetch as seen by its waiters.
///
/// Carries only success or failure. The value itself travels through the
/// subscriber channels and the stored entry.
pub(crate) type Outcome = Shared<BoxFuture<'static, Result<()>>>;

/// A Source invocation that has not resolved yet.
pub(crate) struct InFlight {
    pub(crate) id: u64,
    pub(crate) outcome: Outcome,
}

impl InFlight {
    /// Wraps the task running the fetch so any number of callers can await it.
    ///
    /// The task keeps running even if every waiter drops its clone. If the
    /// task is lost before finishing (its runtime shut down or it was
    /// aborted), `on_lost` runs once, outside any cache lock, before the
    /// failure is handed to the waiters.
    pub(crate) fn new<F>(id: u64, task: JoinHandle<Result<()>>, on_lost: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        let outcome = async move {
            match task.await {
                Ok(result) => result,
                Err(join_err) => {
                    on_lost();
                    Err(CacheError::fetch_failed(join_err))
                }
            }
        }
        .boxed()
        .shared();

        Self { id, outcome }
    }
}
