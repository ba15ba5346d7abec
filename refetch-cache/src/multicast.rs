//! Broadcast list of open subscriptions.
//!
//! Every `get`/`updates` subscription owns the receiving half of an
//! unbounded channel; the sending halves live here, inside the cache lock.
//! Publishing clones the value into each channel and drops senders whose
//! receiver has gone away. Registration also sweeps closed senders once the
//! list has doubled since the last sweep, so reads served from memory do not
//! accumulate dead channels between broadcasts.

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// Smallest list length that triggers a sweep on registration.
const MIN_SWEEP_LEN: usize = 16;

pub(crate) struct Subscribers<T> {
    senders: Vec<UnboundedSender<T>>,
    /// Live senders left after the last sweep
    swept_len: usize,
}

impl<T: Clone> Subscribers<T> {
    pub(crate) fn new() -> Self {
        Self {
            senders: Vec::new(),
            swept_len: 0,
        }
    }

    /// Registers a new subscriber, optionally seeding it with a first value.
    pub(crate) fn subscribe(&mut self, initial: Option<T>) -> UnboundedReceiver<T> {
        if self.senders.len() >= (self.swept_len * 2).max(MIN_SWEEP_LEN) {
            self.active();
        }

        let (tx, rx) = mpsc::unbounded_channel();
        if let Some(value) = initial {
            // rx is still in scope, the send cannot fail
            let _ = tx.send(value);
        }
        self.senders.push(tx);
        rx
    }

    /// Delivers `value` to every open subscriber and returns how many got it.
    pub(crate) fn broadcast(&mut self, value: &T) -> usize {
        self.senders.retain(|tx| tx.send(value.clone()).is_ok());
        self.swept_len = self.senders.len();
        self.senders.len()
    }

    /// Number of subscribers whose receiver is still alive.
    pub(crate) fn active(&mut self) -> usize {
        self.senders.retain(|tx| !tx.is_closed());
        self.swept_len = self.senders.len();
        self.senders.len()
    }

    /// Registered senders, closed or not.
    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.senders.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_value_is_first() {
        let mut subs = Subscribers::new();
        let mut rx = subs.subscribe(Some(1u32));
        subs.broadcast(&2);

        assert_eq!(rx.try_recv().unwrap(), 1);
        assert_eq!(rx.try_recv().unwrap(), 2);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_broadcast_reaches_everyone() {
        let mut subs = Subscribers::new();
        let mut a = subs.subscribe(None);
        let mut b = subs.subscribe(Some("old"));

        assert_eq!(subs.broadcast(&"new"), 2);
        assert_eq!(a.try_recv().unwrap(), "new");
        assert_eq!(b.try_recv().unwrap(), "old");
        assert_eq!(b.try_recv().unwrap(), "new");
    }

    #[test]
    fn test_dropped_receivers_are_pruned() {
        let mut subs = Subscribers::new();
        let kept = subs.subscribe(None);
        let dropped = subs.subscribe(None);
        assert_eq!(subs.active(), 2);

        drop(dropped);
        assert_eq!(subs.active(), 1);
        assert_eq!(subs.broadcast(&7u8), 1);

        drop(kept);
        assert_eq!(subs.broadcast(&8u8), 0);
    }

    #[test]
    fn test_dropped_receivers_swept_without_broadcast() {
        let mut subs = Subscribers::<u64>::new();

        for i in 0..10_000 {
            drop(subs.subscribe(Some(i)));
        }

        assert!(subs.len() <= MIN_SWEEP_LEN, "retained {} senders", subs.len());
    }

    #[test]
    fn test_sweep_keeps_live_receivers() {
        let mut subs = Subscribers::<u64>::new();
        let live: Vec<_> = (0..40).map(|_| subs.subscribe(None)).collect();

        for _ in 0..10_000 {
            drop(subs.subscribe(None));
        }

        assert!(subs.len() <= live.len() * 2 + 1, "retained {} senders", subs.len());
        assert_eq!(subs.broadcast(&9), live.len());
    }
}
