//! Property tests for the expiry window.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use proptest::prelude::*;
use refetch_cache::{BoxError, Clock, ManualClock, TtlCache};

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

/// Reads once at t=0, then once more at `t=offset`, returning the second
/// value and the number of source calls.
fn read_at(expiry_ms: u64, offset_ms: u64) -> (u64, u64) {
    runtime().block_on(async move {
        let clock = Arc::new(ManualClock::new());
        let calls = Arc::new(AtomicU64::new(0));

        let source_clock = clock.clone();
        let counter = calls.clone();
        let cache = TtlCache::with_clock(Duration::from_millis(expiry_ms), clock.clone(), move || {
            counter.fetch_add(1, Ordering::SeqCst);
            let now = source_clock.now().as_millis() as u64;
            async move { Ok::<_, BoxError>(now) }
        });

        cache.value().await.unwrap();
        clock.advance(Duration::from_millis(offset_ms));
        let value = cache.value().await.unwrap();

        (value, calls.load(Ordering::SeqCst))
    })
}

proptest! {
    #[test]
    fn reads_inside_window_hit_memory(expiry_ms in 1u64..10_000, fraction in 0.0f64..1.0) {
        let offset_ms = ((expiry_ms as f64) * fraction) as u64;
        prop_assume!(offset_ms < expiry_ms);

        let (value, calls) = read_at(expiry_ms, offset_ms);
        prop_assert_eq!(value, 0);
        prop_assert_eq!(calls, 1);
    }

    #[test]
    fn reads_past_window_fetch_once(expiry_ms in 1u64..10_000, extra_ms in 0u64..10_000) {
        let offset_ms = expiry_ms + extra_ms;

        let (value, calls) = read_at(expiry_ms, offset_ms);
        prop_assert_eq!(value, offset_ms);
        prop_assert_eq!(calls, 2);
    }
}

#[test]
fn documented_scenario() {
    runtime().block_on(async {
        let clock = Arc::new(ManualClock::new());
        let calls = Arc::new(AtomicU64::new(0));

        let source_clock = clock.clone();
        let counter = calls.clone();
        let cache = TtlCache::with_clock(Duration::from_millis(1000), clock.clone(), move || {
            counter.fetch_add(1, Ordering::SeqCst);
            let now = source_clock.now().as_millis() as u64;
            async move { Ok::<_, BoxError>(now) }
        });

        assert_eq!(cache.value().await.unwrap(), 0);

        clock.advance(Duration::from_millis(500));
        assert_eq!(cache.value().await.unwrap(), 0);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        clock.advance(Duration::from_millis(1000));
        assert_eq!(cache.value().await.unwrap(), 1500);
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        clock.advance(Duration::from_millis(300));
        assert_eq!(cache.value().await.unwrap(), 1500);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    });
}
