//! State and statistics snapshots.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Where a cache currently sits in its lifecycle.
///
/// Derived on read: an in-flight fetch wins over whatever entry is present,
/// and staleness is computed against the clock at the moment of the call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheState {
    /// No entry and no fetch running.
    Empty,
    /// A fetch is running; an older entry may or may not exist.
    Fetching,
    /// An entry exists and is within its expiry window.
    Fresh,
    /// An entry exists but has expired.
    Stale,
}

impl CacheState {
    /// Returns true if a read right now would be served from memory.
    pub fn is_fresh(&self) -> bool {
        matches!(self, CacheState::Fresh)
    }
}

impl fmt::Display for CacheState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            CacheState::Empty => "empty",
            CacheState::Fetching => "fetching",
            CacheState::Fresh => "fresh",
            CacheState::Stale => "stale",
        };
        f.write_str(label)
    }
}

/// Cache statistics.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Reads served from a fresh entry
    pub hits: u64,
    /// Reads that started a fetch
    pub misses: u64,
    /// Calls attached to a fetch that was already running
    pub joins: u64,
    /// Source invocations
    pub fetches: u64,
    /// Source invocations that failed
    pub failures: u64,
    /// Values pushed to open subscriptions
    pub broadcasts: u64,
    /// Subscriptions currently open
    pub subscribers: usize,
    /// State at the time of the snapshot
    pub state: CacheState,
}

impl CacheStats {
    /// Fraction of reads served from memory, or `None` before the first read.
    pub fn hit_ratio(&self) -> Option<f64> {
        let reads = self.hits + self.misses + self.joins;
        if reads == 0 {
            None
        } else {
            Some(self.hits as f64 / reads as f64)
        }
    }
}
