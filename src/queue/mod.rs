//! Deduplicating relay.
//!
//! # Architecture
//!
//! ```text
//! producer ──▶ input (mpsc) ──▶ ┌──────────────── Dispatcher (one task) ────────────────┐
//!                               │  KeyExtractor ─▶ DedupIndex ─▶ InternalBuffer (FIFO)  │ ──▶ Outlet ──▶ consumer
//!                               └───────────────────────────────────────────────────────┘
//! ```
//!
//! [`UniqueQueue`] owns the endpoints and lifecycle. On [`UniqueQueue::run`] the
//! index, buffer and endpoints move into a single worker task, so the pending
//! set is never shared and needs no lock.
//!
//! # Pending window
//!
//! A key blocks duplicates from the moment its item is accepted into the
//! buffer until the moment it is popped for forwarding. Forwarded keys can be
//! accepted again immediately, even if the consumer has not processed them.

mod buffer;
mod dispatch;
mod handle;
mod identity;
mod index;
mod outlet;
mod pending;
mod stats;

pub use buffer::InternalBuffer;
pub use handle::{UniqueQueue, UniqueQueueConfig};
pub use identity::{DisplayKey, KeyExtractor};
pub use index::DedupIndex;
pub use outlet::{Outlet, OutletClosed};
pub use pending::{Admission, PendingQueue};
pub use stats::{RelayState, RelayStats};
