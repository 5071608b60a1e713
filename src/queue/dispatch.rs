//! The relay's dispatch loop.
//!
//! Each iteration makes one non-blocking attempt on each path:
//!
//! 1. receive one item from the input (while the buffer has room) and either
//!    accept it or drop it as a duplicate;
//! 2. if the output has room, pop the head of the buffer, clear its key and
//!    send it.
//!
//! When neither path makes progress the loop parks on whichever happens first:
//! stop requested, input has data, or output has room. Neither path ever waits
//! behind the other.
//!
//! ```text
//!   Running ──input closed / stop──▶ Draining ──stop ∧ input done ∧ buffer empty──▶ Stopped
//!      │                                                                              ▲
//!      └───────────────────────────── output closed ──────────────────────────────────┘
//! ```

use super::outlet::{Outlet, OutletClosed};
use super::pending::{Admission, PendingQueue};
use super::stats::{RelayCounters, RelayState};
use crate::config::ClosePolicy;
use std::sync::Arc;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, instrument, warn};

/// Consecutive busy iterations after which the worker yields to the scheduler.
const YIELD_EVERY: u32 = 64;

/// What woke an idle worker.
enum Wake<T> {
    Stop,
    Input(Option<T>),
    OutletReady(Result<(), OutletClosed>),
    Idle,
}

/// State owned by the worker task. Nothing here is shared except the counters.
pub(crate) struct Dispatcher<T, O> {
    pub(crate) pending: PendingQueue<T>,
    pub(crate) input: mpsc::Receiver<T>,
    pub(crate) output: O,
    pub(crate) stop: watch::Receiver<bool>,
    pub(crate) state: watch::Sender<RelayState>,
    pub(crate) counters: Arc<RelayCounters>,
    pub(crate) close_policy: ClosePolicy,
}

impl<T, O> Dispatcher<T, O>
where
    T: Send + 'static,
    O: Outlet<T>,
{
    /// Runs until stopped, then publishes [`RelayState::Stopped`].
    #[instrument(
        name = "unique_queue.dispatch",
        skip_all,
        fields(
            capacity = self.pending.capacity(),
            close_policy = %self.close_policy
        )
    )]
    pub(crate) async fn run(mut self) {
        let mut input_open = true;
        let mut stop_requested = false;
        let mut busy_streak = 0_u32;

        self.set_state(RelayState::Running);
        info!("Relay started");

        loop {
            if !stop_requested && self.stop_signalled() {
                stop_requested = true;
                input_open = self.on_stop(input_open);
            }

            let mut progressed = false;

            if input_open && !self.pending.is_full() {
                match self.input.try_recv() {
                    Ok(item) => {
                        self.accept(item);
                        progressed = true;
                    },
                    Err(TryRecvError::Empty) => {},
                    Err(TryRecvError::Disconnected) => {
                        input_open = false;
                        self.enter_draining("input closed");
                    },
                }
            }

            if !self.pending.is_empty() && self.output.has_room() {
                if self.forward_head().await.is_err() {
                    self.abandon_all("output closed");
                    break;
                }
                progressed = true;
            }

            if stop_requested && !input_open && self.pending.is_empty() {
                break;
            }

            if progressed {
                busy_streak += 1;
                if busy_streak >= YIELD_EVERY {
                    busy_streak = 0;
                    tokio::task::yield_now().await;
                }
                continue;
            }
            busy_streak = 0;

            let accepting = input_open && !self.pending.is_full();
            let forwarding = !self.pending.is_empty();

            let wake = tokio::select! {
                _ = self.stop.changed(), if !stop_requested => Wake::Stop,
                received = self.input.recv(), if accepting => Wake::Input(received),
                ready = self.output.ready(), if forwarding => Wake::OutletReady(ready),
                else => Wake::Idle,
            };

            match wake {
                Wake::Stop => {
                    stop_requested = true;
                    input_open = self.on_stop(input_open);
                },
                Wake::Input(Some(item)) => self.accept(item),
                Wake::Input(None) => {
                    input_open = false;
                    self.enter_draining("input closed");
                },
                Wake::OutletReady(Ok(())) => {},
                Wake::OutletReady(Err(OutletClosed)) => {
                    self.abandon_all("output closed");
                    break;
                },
                // Nothing left to wait on.
                Wake::Idle => break,
            }
        }

        self.input.close();
        self.set_state(RelayState::Stopped);

        let stats = self.counters.snapshot();
        info!(
            received = stats.received,
            accepted = stats.accepted,
            duplicates = stats.duplicates,
            forwarded = stats.forwarded,
            abandoned = stats.abandoned,
            "Relay stopped"
        );
    }

    /// True once the handle asked to stop, or went away without asking.
    fn stop_signalled(&self) -> bool {
        match self.stop.has_changed() {
            Ok(changed) => changed && *self.stop.borrow(),
            Err(_) => true,
        }
    }

    /// Applies the close policy. Returns whether the input is still open.
    fn on_stop(&mut self, input_open: bool) -> bool {
        // Producers see a closed channel from here on; anything already queued
        // in the input can still be received.
        self.input.close();

        match self.close_policy {
            ClosePolicy::Flush => {
                self.enter_draining("stop requested");
                input_open
            },
            ClosePolicy::Abandon => {
                self.abandon_all("stop requested");
                false
            },
        }
    }

    fn accept(&mut self, item: T) {
        self.counters.record_received();
        let key = self.pending.key_of(&item);

        match self.pending.admit(key.clone(), item) {
            Admission::Accepted => {
                let pending = self.pending.pending_len();
                self.counters.record_accepted(pending);
                debug!(key = %key, pending, "Item accepted");
            },
            Admission::Duplicate => {
                self.counters.record_duplicate();
                debug!(key = %key, "Item is already queued");
            },
            Admission::Full(_) => {
                // Only reachable if the caller ignored `is_full`.
                self.counters
                    .record_abandoned(1, self.pending.pending_len());
                warn!(key = %key, "Internal buffer full, item dropped");
            },
        }
    }

    async fn forward_head(&mut self) -> Result<(), OutletClosed> {
        let Some((key, item)) = self.pending.pop_with_key() else {
            return Ok(());
        };
        let pending = self.pending.pending_len();

        match self.output.forward(item).await {
            Ok(()) => {
                self.counters.record_forwarded(pending);
                debug!(key = %key, pending, "Item forwarded");
                Ok(())
            },
            Err(_) => {
                self.counters.record_abandoned(1, pending);
                warn!(key = %key, "Output endpoint closed, item dropped");
                Err(OutletClosed)
            },
        }
    }

    fn abandon_all(&mut self, reason: &'static str) {
        self.input.close();
        let discarded = self.pending.clear();
        if discarded > 0 {
            self.counters.record_abandoned(discarded, 0);
            warn!(discarded, reason, "Abandoned buffered items");
        }
    }

    fn enter_draining(&self, reason: &'static str) {
        if *self.state.borrow() == RelayState::Running {
            debug!(reason, "Relay draining");
            self.set_state(RelayState::Draining);
        }
    }

    fn set_state(&self, state: RelayState) {
        self.state.send_replace(state);
    }
}
