//! # Unique Queue
//!
//! A deduplicating relay between a producer channel and a consumer channel.
//!
//! Items sent to the input channel are buffered and forwarded to the output
//! channel in arrival order. Any incoming item whose identity key is already
//! buffered (accepted, but not yet forwarded) is silently dropped.
//!
//! ## Features
//!
//! - One background tokio task per relay, no locks on the hot path
//! - Keys are re-admitted as soon as their previous occurrence is forwarded
//! - Backpressure from a slow consumer flows back through the bounded channels
//! - Configurable close policy (flush buffered items or abandon them)
//! - `tracing` diagnostics and `metrics` counters
//!
//! ## Example
//!
//! ```rust,ignore
//! use unique_queue::{UniqueQueue, UniqueQueueConfig};
//!
//! let config = UniqueQueueConfig::new(|url: &String| url.clone());
//! let mut queue = UniqueQueue::init(config)?;
//! let input = queue.take_input_sender().unwrap();
//! let mut output = queue.take_output_receiver().unwrap();
//!
//! queue.run()?;
//! input.send("https://example.com".to_string()).await?;
//! input.send("https://example.com".to_string()).await?;
//!
//! assert_eq!(output.recv().await.as_deref(), Some("https://example.com"));
//! let stats = queue.close().await?;
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![allow(clippy::multiple_crate_versions)]

use std::time::Duration;
use thiserror::Error as ThisError;

// Module declarations
pub mod config;
pub mod observability;
pub mod queue;

// Re-exports for convenience
pub use config::{ClosePolicy, DEFAULT_BUFFER_SIZE, MAX_BUFFER_SIZE, QueueSettings};
pub use queue::{
    Admission, DedupIndex, DisplayKey, InternalBuffer, KeyExtractor, Outlet, OutletClosed,
    PendingQueue, RelayState, RelayStats, UniqueQueue, UniqueQueueConfig,
};

/// Error type for relay operations.
///
/// Uses `thiserror` for automatic `Display` and `Error` trait implementations.
///
/// # Error Variant Triggers
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `InvalidConfig` | Output capacity below 1, missing endpoint, malformed settings |
/// | `AlreadyRunning` | `run` is called on a relay that has already started |
/// | `Closed` | `run` is called on a relay that has been closed |
/// | `Timeout` | `close_with_timeout` elapses before the worker stops |
/// | `OperationFailed` | No tokio runtime, worker panicked, settings file unreadable |
#[derive(Debug, ThisError)]
pub enum Error {
    /// The relay is misconfigured and refuses to start.
    ///
    /// Raised when:
    /// - The output endpoint has a capacity of 0 (the relay would deadlock)
    /// - An input or output endpoint is missing at `run` time
    /// - A settings file or log filter cannot be parsed
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The relay worker has already been started.
    #[error("relay is already running")]
    AlreadyRunning,

    /// The relay has been closed and cannot be restarted.
    ///
    /// Construct a new relay to forward items again.
    #[error("relay is closed")]
    Closed,

    /// An operation did not complete in time.
    #[error("operation '{operation}' timed out after {after:?}")]
    Timeout {
        /// The operation that timed out.
        operation: String,
        /// How long the caller waited.
        after: Duration,
    },

    /// An operation failed.
    ///
    /// Raised when:
    /// - `run` is called outside a tokio runtime
    /// - The worker task panicked (e.g. the key extractor panicked)
    /// - A settings file cannot be read
    /// - The tracing subscriber cannot be installed
    #[error("operation '{operation}' failed: {cause}")]
    OperationFailed {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },
}

/// Result type alias for relay operations.
pub type Result<T> = std::result::Result<T, Error>;
