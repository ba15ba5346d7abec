//! A slow, optionally flaky source for exercising caches from the command line.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use refetch_core::{BoxError, Source};

/// Value produced by [`SimulatedSource`].
#[derive(Clone, Debug)]
pub struct Snapshot {
    /// Which invocation produced this value (1-based)
    pub sequence: u64,
    /// Milliseconds of simulated work
    pub latency_ms: u64,
}

/// Source that sleeps for a fixed latency and fails every Nth call.
#[derive(Clone)]
pub struct SimulatedSource {
    latency: Duration,
    fail_every: Option<u64>,
    calls: Arc<AtomicU64>,
}

impl SimulatedSource {
    /// Creates a source that always succeeds after `latency`.
    pub fn new(latency: Duration) -> Self {
        Self {
            latency,
            fail_every: None,
            calls: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Makes every `n`th call fail. Zero disables failures.
    pub fn failing_every(mut self, n: u64) -> Self {
        self.fail_every = (n > 0).then_some(n);
        self
    }

    /// Number of invocations so far, shared across clones.
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Source<Snapshot> for SimulatedSource {
    async fn fetch(&self) -> Result<Snapshot, BoxError> {
        let sequence = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(sequence, latency_ms = self.latency.as_millis() as u64, "Simulated fetch");
        tokio::time::sleep(self.latency).await;

        if matches!(self.fail_every, Some(n) if sequence % n == 0) {
            return Err(format!("simulated failure on call {sequence}").into());
        }

        Ok(Snapshot {
            sequence,
            latency_ms: self.latency.as_millis() as u64,
        })
    }
}
