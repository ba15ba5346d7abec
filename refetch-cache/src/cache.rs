//! Single-value TTL cache with single-flight fetching.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::{FutureExt, StreamExt};
use parking_lot::Mutex;
use tracing::{debug, info, instrument, warn};

use refetch_core::constants::DEFAULT_CACHE_NAME;
use refetch_core::{
    CacheConfig, CacheError, CacheState, CacheStats, Clock, Result, Source, SystemClock,
};

use crate::flight::{InFlight, Outcome};
use crate::multicast::Subscribers;
use crate::subscription::{Subscription, Updates};

/// A fetched value and the clock reading taken when it arrived.
struct CacheEntry<T> {
    value: T,
    fetched_at: Duration,
}

impl<T> CacheEntry<T> {
    fn is_fresh(&self, now: Duration, expiry: Duration) -> bool {
        now.saturating_sub(self.fetched_at) < expiry
    }
}

/// Everything mutable, guarded by one lock.
struct State<T> {
    entry: Option<CacheEntry<T>>,
    in_flight: Option<InFlight>,
    subscribers: Subscribers<T>,
    next_fetch_id: u64,
    hits: u64,
    misses: u64,
    joins: u64,
    fetches: u64,
    failures: u64,
    broadcasts: u64,
}

impl<T: Clone> State<T> {
    fn new() -> Self {
        Self {
            entry: None,
            in_flight: None,
            subscribers: Subscribers::new(),
            next_fetch_id: 1,
            hits: 0,
            misses: 0,
            joins: 0,
            fetches: 0,
            failures: 0,
            broadcasts: 0,
        }
    }

    fn fresh_value(&self, now: Duration, expiry: Duration) -> Option<T> {
        self.entry
            .as_ref()
            .filter(|entry| entry.is_fresh(now, expiry))
            .map(|entry| entry.value.clone())
    }

    /// Clears the in-flight slot if it still belongs to fetch `id`.
    fn release(&mut self, id: u64) -> bool {
        if self.in_flight.as_ref().is_some_and(|flight| flight.id == id) {
            self.in_flight = None;
            true
        } else {
            false
        }
    }

    fn current_state(&self, now: Duration, expiry: Duration) -> CacheState {
        if self.in_flight.is_some() {
            return CacheState::Fetching;
        }
        match &self.entry {
            None => CacheState::Empty,
            Some(entry) if entry.is_fresh(now, expiry) => CacheState::Fresh,
            Some(_) => CacheState::Stale,
        }
    }
}

struct Inner<T> {
    name: String,
    expiry: Duration,
    clock: Arc<dyn Clock>,
    source: Arc<dyn Source<T>>,
    state: Mutex<State<T>>,
}

impl<T: Clone + Send + Sync + 'static> Inner<T> {
    /// Runs one Source invocation and publishes its result.
    async fn run_fetch(self: Arc<Self>, id: u64) -> Result<()> {
        debug!(cache = %self.name, fetch = id, "Fetch started");
        let started = Instant::now();

        let result = AssertUnwindSafe(self.source.fetch()).catch_unwind().await;
        let fetched_at = self.clock.now();

        let mut state = self.state.lock();
        state.release(id);

        match result {
            Ok(Ok(value)) => {
                let delivered = state.subscribers.broadcast(&value);
                state.broadcasts += delivered as u64;
                state.entry = Some(CacheEntry { value, fetched_at });
                info!(
                    cache = %self.name,
                    fetch = id,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    subscribers = delivered,
                    "Fetched fresh value"
                );
                Ok(())
            }
            Ok(Err(err)) => {
                state.failures += 1;
                let err = CacheError::fetch_failed(err);
                warn!(cache = %self.name, fetch = id, error = %err, "Fetch failed");
                Err(err)
            }
            Err(payload) => {
                state.failures += 1;
                let message = panic_message(payload.as_ref());
                warn!(cache = %self.name, fetch = id, panic = %message, "Source panicked");
                Err(CacheError::fetch_failed(format!("source panicked: {message}")))
            }
        }
    }

    /// Frees the slot of a fetch whose task ended without reporting back.
    fn release_lost_fetch(&self, id: u64) {
        let mut state = self.state.lock();
        if state.release(id) {
            state.failures += 1;
            warn!(cache = %self.name, fetch = id, "Fetch task lost before completing");
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Caches the latest value of one [`Source`] for a fixed time-to-live.
///
/// - A read within the expiry window is served from memory.
/// - A read of a missing or expired value starts a fetch, and every
///   concurrent read joins that same fetch instead of starting another.
/// - [`sync`](Self::sync) forces a fetch and pushes its value to every open
///   [`get`](Self::get)/[`updates`](Self::updates) stream.
/// - A failed fetch is never stored.
///
/// Staleness is evaluated lazily against the injected [`Clock`]; nothing
/// runs in the background. Fetches run on spawned Tokio tasks, so `get`,
/// `updates` and `sync` must be called from within a Tokio runtime.
///
/// The handle is cheap to clone; clones share the same cache.
///
/// ```rust,ignore
/// let rates = TtlCache::new(Duration::from_secs(60), || async { fetch_rates().await });
///
/// let current = rates.value().await?;
/// let mut feed = rates.updates();
/// while let Some(latest) = feed.next().await {
///     render(latest);
/// }
/// ```
pub struct TtlCache<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for TtlCache<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> TtlCache<T> {
    /// Creates a cache driven by the system clock.
    ///
    /// A zero expiry makes every read a miss; reads still share fetches.
    pub fn new<S>(expiry: Duration, source: S) -> Self
    where
        S: Source<T> + 'static,
    {
        Self::with_clock(expiry, Arc::new(SystemClock::new()), source)
    }

    /// Creates a cache driven by the given clock.
    pub fn with_clock<S>(expiry: Duration, clock: Arc<dyn Clock>, source: S) -> Self
    where
        S: Source<T> + 'static,
    {
        Self::from_parts(DEFAULT_CACHE_NAME.to_string(), expiry, clock, Arc::new(source))
    }

    /// Creates a cache from a validated configuration.
    pub fn from_config<S>(config: &CacheConfig, clock: Arc<dyn Clock>, source: S) -> Result<Self>
    where
        S: Source<T> + 'static,
    {
        config.validate()?;
        Ok(Self::from_parts(
            config.name.clone(),
            config.expiry(),
            clock,
            Arc::new(source),
        ))
    }

    fn from_parts(
        name: String,
        expiry: Duration,
        clock: Arc<dyn Clock>,
        source: Arc<dyn Source<T>>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                name,
                expiry,
                clock,
                source,
                state: Mutex::new(State::new()),
            }),
        }
    }

    /// Returns a stream of values that fails if the fetch it waits on fails.
    ///
    /// A fresh value is yielded immediately. Otherwise the stream waits on
    /// the running fetch, starting one if none exists. After its first value
    /// the stream stays open and yields every later broadcast.
    pub fn get(&self) -> Subscription<T> {
        self.subscribe(true)
    }

    /// Returns a stream of values that never fails.
    ///
    /// Behaves like [`get`](Self::get), but a failed fetch yields nothing and
    /// the stream keeps waiting for the next successful one.
    pub fn updates(&self) -> Updates<T> {
        Updates::new(self.subscribe(false))
    }

    /// Fetches a new value regardless of freshness and broadcasts it.
    ///
    /// Joins the running fetch if there is one. The fetch starts when this
    /// method is called; the returned future only reports its outcome, and
    /// dropping it does not cancel anything. A failure is reported here only:
    /// open streams keep their last value and the stored entry survives.
    pub fn sync(&self) -> impl Future<Output = Result<()>> + Send + 'static {
        let mut state = self.inner.state.lock();
        self.start_or_join(&mut state)
    }

    /// Drops the stored value so the next read fetches.
    ///
    /// A fetch already running is left alone and stores its value when it
    /// completes.
    pub fn invalidate(&self) {
        let had_entry = self.inner.state.lock().entry.take().is_some();
        debug!(cache = %self.inner.name, had_entry, "Invalidated");
    }

    /// Returns the first value of [`get`](Self::get).
    #[instrument(skip(self), fields(cache = %self.inner.name))]
    pub async fn value(&self) -> Result<T> {
        self.get().next().await.unwrap_or(Err(CacheError::Closed))
    }

    /// Returns the stored value if it is fresh, without fetching.
    pub fn peek(&self) -> Option<T> {
        let state = self.inner.state.lock();
        state.fresh_value(self.inner.clock.now(), self.inner.expiry)
    }

    /// Returns the current lifecycle state.
    pub fn state(&self) -> CacheState {
        let state = self.inner.state.lock();
        state.current_state(self.inner.clock.now(), self.inner.expiry)
    }

    /// Returns cache statistics.
    pub fn stats(&self) -> CacheStats {
        let mut state = self.inner.state.lock();
        let current = state.current_state(self.inner.clock.now(), self.inner.expiry);
        CacheStats {
            hits: state.hits,
            misses: state.misses,
            joins: state.joins,
            fetches: state.fetches,
            failures: state.failures,
            broadcasts: state.broadcasts,
            subscribers: state.subscribers.active(),
            state: current,
        }
    }

    /// Returns the configured time-to-live.
    pub fn expiry(&self) -> Duration {
        self.inner.expiry
    }

    /// Returns the name used in log events.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    fn subscribe(&self, surface_errors: bool) -> Subscription<T> {
        let mut state = self.inner.state.lock();
        let now = self.inner.clock.now();

        if let Some(value) = state.fresh_value(now, self.inner.expiry) {
            state.hits += 1;
            debug!(cache = %self.inner.name, "Cache hit");
            let rx = state.subscribers.subscribe(Some(value));
            return Subscription::new(rx, None, surface_errors);
        }

        if state.in_flight.is_none() {
            state.misses += 1;
            debug!(cache = %self.inner.name, "Cache miss");
        }
        let outcome = self.start_or_join(&mut state);
        let rx = state.subscribers.subscribe(None);
        Subscription::new(rx, Some(outcome), surface_errors)
    }

    /// Returns the running fetch, starting one if none exists.
    ///
    /// Must be called with the state lock held so that exactly one caller
    /// wins the right to start a fetch.
    fn start_or_join(&self, state: &mut State<T>) -> Outcome {
        if let Some(flight) = &state.in_flight {
            state.joins += 1;
            debug!(cache = %self.inner.name, fetch = flight.id, "Joining in-flight fetch");
            return flight.outcome.clone();
        }

        let id = state.next_fetch_id;
        state.next_fetch_id += 1;
        state.fetches += 1;

        let task = tokio::spawn(Arc::clone(&self.inner).run_fetch(id));
        let inner = Arc::downgrade(&self.inner);
        let flight = InFlight::new(id, task, move || {
            if let Some(inner) = inner.upgrade() {
                inner.release_lost_fetch(id);
            }
        });
        let outcome = flight.outcome.clone();
        state.in_flight = Some(flight);
        outcome
    }
}
