//! Delivery counters.
//!
//! [`RecorderMetrics`] is a point-in-time snapshot of counters the
//! producers and the delivery thread bump as they go.

use std::sync::atomic::{AtomicU64, Ordering};

/// Cumulative recorder counters.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RecorderMetrics {
    /// Updates accepted onto the queue.
    pub enqueued: u64,
    /// Updates taken off the queue and fanned out.
    pub delivered: u64,
    /// Objects initialized through `init_object`.
    pub objects_initialized: u64,
    /// Listener calls that returned an error.
    pub listener_errors: u64,
    /// Listener calls that panicked.
    pub listener_panics: u64,
    /// Updates still queued when the recorder shut down.
    pub discarded: u64,
}

#[derive(Default)]
pub(crate) struct Counters {
    pub(crate) enqueued: AtomicU64,
    pub(crate) delivered: AtomicU64,
    pub(crate) objects_initialized: AtomicU64,
    pub(crate) listener_errors: AtomicU64,
    pub(crate) listener_panics: AtomicU64,
    pub(crate) discarded: AtomicU64,
}

impl Counters {
    pub(crate) fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> RecorderMetrics {
        RecorderMetrics {
            enqueued: self.enqueued.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            objects_initialized: self.objects_initialized.load(Ordering::Relaxed),
            listener_errors: self.listener_errors.load(Ordering::Relaxed),
            listener_panics: self.listener_panics.load(Ordering::Relaxed),
            discarded: self.discarded.load(Ordering::Relaxed),
        }
    }
}
