//! Relay lifecycle state and counters.

use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Lifecycle state of a relay's dispatch loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RelayState {
    /// Initialised but not yet started.
    #[default]
    Idle,
    /// Accepting input and forwarding.
    Running,
    /// Input closed or stop requested; buffered items may remain.
    Draining,
    /// Terminal: the worker has exited and nothing is buffered.
    Stopped,
}

impl RelayState {
    /// Returns the state as a string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Draining => "draining",
            Self::Stopped => "stopped",
        }
    }
}

impl fmt::Display for RelayState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time relay statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct RelayStats {
    /// Items taken from the input endpoint.
    pub received: u64,
    /// Items accepted into the internal buffer.
    pub accepted: u64,
    /// Items dropped because their key was pending.
    pub duplicates: u64,
    /// Items sent to the output endpoint.
    pub forwarded: u64,
    /// Accepted items discarded on close or because the output closed.
    pub abandoned: u64,
    /// Items currently buffered (equal to the number of pending keys).
    pub pending: usize,
}

/// Counters written by the worker and read by the handle.
///
/// Only the worker writes, so relaxed ordering is enough; readers see a
/// snapshot that may trail the worker by a few items.
#[derive(Debug, Default)]
pub(crate) struct RelayCounters {
    received: AtomicU64,
    accepted: AtomicU64,
    duplicates: AtomicU64,
    forwarded: AtomicU64,
    abandoned: AtomicU64,
    pending: AtomicUsize,
}

impl RelayCounters {
    pub(crate) fn record_received(&self) {
        self.received.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("unique_queue_items_received_total").increment(1);
    }

    pub(crate) fn record_accepted(&self, pending: usize) {
        self.accepted.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("unique_queue_items_accepted_total").increment(1);
        self.set_pending(pending);
    }

    pub(crate) fn record_duplicate(&self) {
        self.duplicates.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("unique_queue_duplicates_dropped_total").increment(1);
    }

    pub(crate) fn record_forwarded(&self, pending: usize) {
        self.forwarded.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("unique_queue_items_forwarded_total").increment(1);
        self.set_pending(pending);
    }

    pub(crate) fn record_abandoned(&self, count: usize, pending: usize) {
        let count = count as u64;
        self.abandoned.fetch_add(count, Ordering::Relaxed);
        metrics::counter!("unique_queue_items_abandoned_total").increment(count);
        self.set_pending(pending);
    }

    #[allow(clippy::cast_precision_loss)]
    fn set_pending(&self, pending: usize) {
        self.pending.store(pending, Ordering::Relaxed);
        metrics::gauge!("unique_queue_pending").set(pending as f64);
    }

    pub(crate) fn snapshot(&self) -> RelayStats {
        RelayStats {
            received: self.received.load(Ordering::Relaxed),
            accepted: self.accepted.load(Ordering::Relaxed),
            duplicates: self.duplicates.load(Ordering::Relaxed),
            forwarded: self.forwarded.load(Ordering::Relaxed),
            abandoned: self.abandoned.load(Ordering::Relaxed),
            pending: self.pending.load(Ordering::Relaxed),
        }
    }
}
