//! Time sources for expiry decisions.
//!
//! The cache never reads the system time directly. It asks a [`Clock`] for a
//! monotonic offset, which lets tests drive expiry with a [`ManualClock`]
//! instead of sleeping.

use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::debug;

/// Supplies monotonically non-decreasing time.
///
/// The returned value is an offset from an arbitrary, clock-specific origin.
/// Only differences between two readings of the same clock are meaningful.
pub trait Clock: Send + Sync {
    /// Returns the current time as an offset from the clock's origin.
    fn now(&self) -> Duration;
}

/// Wall-clock time backed by [`Instant`].
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    /// Creates a clock whose origin is the moment of construction.
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Virtual clock that only moves when told to.
///
/// Share it as `Arc<ManualClock>`: hand one clone to the cache and keep
/// another to advance time.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Mutex<Duration>,
}

impl ManualClock {
    /// Creates a clock starting at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a clock starting at the given offset.
    pub fn starting_at(start: Duration) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Moves time forward by `by`.
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock();
        *now = now.saturating_add(by);
    }

    /// Jumps to an absolute offset.
    ///
    /// Moving backwards is ignored so readings stay monotonic.
    pub fn set(&self, to: Duration) {
        let mut now = self.now.lock();
        if to < *now {
            debug!(current = ?*now, requested = ?to, "Ignoring backwards clock move");
            return;
        }
        *now = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        *self.now.lock()
    }
}
