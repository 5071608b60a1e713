//! The public relay handle and its configuration.

use super::dispatch::Dispatcher;
use super::identity::KeyExtractor;
use super::outlet::Outlet;
use super::pending::PendingQueue;
use super::stats::{RelayCounters, RelayState, RelayStats};
use crate::config::{ClosePolicy, MAX_BUFFER_SIZE, QueueSettings};
use crate::{Error, Result};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument};

/// Configuration for a [`UniqueQueue`].
///
/// The key extractor is required; the endpoints default to new bounded
/// channels whose capacity is the buffer size.
///
/// # Example
///
/// ```rust
/// use unique_queue::{ClosePolicy, UniqueQueueConfig};
///
/// let (input_tx, input_rx) = tokio::sync::mpsc::channel::<String>(16);
/// let config = UniqueQueueConfig::new(|url: &String| url.clone())
///     .with_input(input_rx)
///     .with_buffer_size(32)
///     .with_close_policy(ClosePolicy::Abandon);
///
/// assert_eq!(config.settings().buffer_size, 32);
/// # drop(input_tx);
/// ```
pub struct UniqueQueueConfig<T, O = mpsc::Sender<T>> {
    extractor: Box<dyn KeyExtractor<T>>,
    input: Option<mpsc::Receiver<T>>,
    output: Option<O>,
    settings: QueueSettings,
}

impl<T: Send + 'static> UniqueQueueConfig<T> {
    /// Creates a configuration with default settings and auto-allocated endpoints.
    pub fn new(extractor: impl KeyExtractor<T> + 'static) -> Self {
        Self {
            extractor: Box::new(extractor),
            input: None,
            output: None,
            settings: QueueSettings::default(),
        }
    }
}

impl<T, O> UniqueQueueConfig<T, O>
where
    T: Send + 'static,
    O: Outlet<T>,
{
    /// Uses an existing channel as the input endpoint.
    #[must_use]
    pub fn with_input(mut self, input: mpsc::Receiver<T>) -> Self {
        self.input = Some(input);
        self
    }

    /// Uses an existing endpoint as the output.
    #[must_use]
    pub fn with_output<P: Outlet<T>>(self, output: P) -> UniqueQueueConfig<T, P> {
        UniqueQueueConfig {
            extractor: self.extractor,
            input: self.input,
            output: Some(output),
            settings: self.settings,
        }
    }

    /// Sets the internal buffer size (0 selects the default).
    #[must_use]
    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.settings.buffer_size = buffer_size;
        self
    }

    /// Sets what `close` does with buffered items.
    #[must_use]
    pub fn with_close_policy(mut self, close_policy: ClosePolicy) -> Self {
        self.settings.close_policy = close_policy;
        self
    }

    /// Replaces all settings, e.g. with [`QueueSettings::from_env`].
    #[must_use]
    pub fn with_settings(mut self, settings: QueueSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Returns the current settings.
    #[must_use]
    pub const fn settings(&self) -> &QueueSettings {
        &self.settings
    }
}

impl<T, O> fmt::Debug for UniqueQueueConfig<T, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UniqueQueueConfig")
            .field("settings", &self.settings)
            .field("has_input", &self.input.is_some())
            .field("has_output", &self.output.is_some())
            .finish_non_exhaustive()
    }
}

/// A deduplicating relay from an input channel to an output endpoint.
///
/// Lifecycle: [`init`](Self::init) → [`run`](Self::run) →
/// [`close`](Self::close). A closed relay cannot be restarted.
///
/// Items whose key is already buffered are dropped; a key becomes admissible
/// again as soon as its item has been forwarded. Accepted items are forwarded
/// in the order they were accepted.
///
/// Dropping the handle without closing it signals the worker to stop; the
/// worker then winds down according to the close policy.
pub struct UniqueQueue<T, O = mpsc::Sender<T>>
where
    O: Outlet<T>,
{
    settings: QueueSettings,
    extractor: Option<Box<dyn KeyExtractor<T>>>,
    input: Option<mpsc::Receiver<T>>,
    input_sender: Option<mpsc::Sender<T>>,
    output: Option<O>,
    output_receiver: Option<O::Receiver>,
    stop: watch::Sender<bool>,
    state_sender: Option<watch::Sender<RelayState>>,
    state: watch::Receiver<RelayState>,
    counters: Arc<RelayCounters>,
    worker: Option<JoinHandle<()>>,
    closed: bool,
}

impl<T, O> UniqueQueue<T, O>
where
    T: Send + 'static,
    O: Outlet<T>,
{
    /// Normalizes the configuration and allocates missing endpoints.
    ///
    /// An unset (0) buffer size becomes [`DEFAULT_BUFFER_SIZE`](crate::DEFAULT_BUFFER_SIZE).
    /// When the input is not supplied, its sender is available from
    /// [`take_input_sender`](Self::take_input_sender); when the output is not
    /// supplied, its receiver is available from
    /// [`take_output_receiver`](Self::take_output_receiver).
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if the buffer size exceeds
    /// [`MAX_BUFFER_SIZE`].
    pub fn init(config: UniqueQueueConfig<T, O>) -> Result<Self> {
        let UniqueQueueConfig {
            extractor,
            input,
            output,
            settings,
        } = config;

        let buffer_size = settings.effective_buffer_size();
        if buffer_size > MAX_BUFFER_SIZE {
            return Err(Error::InvalidConfig(format!(
                "buffer size {buffer_size} exceeds the maximum of {MAX_BUFFER_SIZE}"
            )));
        }
        let settings = settings.with_buffer_size(buffer_size);

        let (input, input_sender) = match input {
            Some(receiver) => (receiver, None),
            None => {
                let (sender, receiver) = mpsc::channel(buffer_size);
                (receiver, Some(sender))
            },
        };
        let (output, output_receiver) = match output {
            Some(output) => (output, None),
            None => {
                let (output, receiver) = O::bounded(buffer_size);
                (output, Some(receiver))
            },
        };

        let (stop, _) = watch::channel(false);
        let (state_sender, state) = watch::channel(RelayState::Idle);

        debug!(
            buffer_size,
            close_policy = %settings.close_policy,
            input_allocated = input_sender.is_some(),
            output_allocated = output_receiver.is_some(),
            "Relay initialised"
        );

        Ok(Self {
            settings,
            extractor: Some(extractor),
            input: Some(input),
            input_sender,
            output: Some(output),
            output_receiver,
            stop,
            state_sender: Some(state_sender),
            state,
            counters: Arc::new(RelayCounters::default()),
            worker: None,
            closed: false,
        })
    }

    /// Starts the background relay and returns immediately.
    ///
    /// # Errors
    ///
    /// - [`Error::Closed`] if the relay has been closed
    /// - [`Error::AlreadyRunning`] if the relay was already started
    /// - [`Error::InvalidConfig`] if an endpoint is missing or the output
    ///   capacity is 0
    /// - [`Error::OperationFailed`] if called outside a tokio runtime
    #[instrument(skip_all, fields(buffer_size = self.settings.buffer_size))]
    pub fn run(&mut self) -> Result<()> {
        if self.closed {
            return Err(Error::Closed);
        }
        if self.worker.is_some() {
            return Err(Error::AlreadyRunning);
        }
        self.preflight_checks()?;

        let runtime =
            tokio::runtime::Handle::try_current().map_err(|e| Error::OperationFailed {
                operation: "relay_run".to_string(),
                cause: e.to_string(),
            })?;

        let dispatcher = Dispatcher {
            pending: PendingQueue::with_boxed_extractor(
                self.settings.buffer_size,
                self.extractor.take().ok_or(Error::AlreadyRunning)?,
            ),
            input: self.input.take().ok_or(Error::AlreadyRunning)?,
            output: self.output.take().ok_or(Error::AlreadyRunning)?,
            stop: self.stop.subscribe(),
            state: self.state_sender.take().ok_or(Error::AlreadyRunning)?,
            counters: Arc::clone(&self.counters),
            close_policy: self.settings.close_policy,
        };

        self.worker = Some(runtime.spawn(dispatcher.run()));
        info!("Relay worker spawned");
        Ok(())
    }

    fn preflight_checks(&self) -> Result<()> {
        if self.input.is_none() {
            return Err(Error::InvalidConfig(
                "input endpoint doesn't exist".to_string(),
            ));
        }
        let Some(output) = &self.output else {
            return Err(Error::InvalidConfig(
                "output endpoint doesn't exist".to_string(),
            ));
        };
        if output.max_capacity() == 0 {
            return Err(Error::InvalidConfig(
                "output endpoint capacity must be at least 1 to avoid deadlocks".to_string(),
            ));
        }
        Ok(())
    }

    /// Stops the relay and waits until the worker has exited.
    ///
    /// With [`ClosePolicy::Flush`] every accepted item is forwarded first, so
    /// this waits for the consumer to make room for them. An output send that
    /// is already in progress is never interrupted.
    ///
    /// Closing a relay that never ran is allowed. Closing again returns the
    /// same statistics.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OperationFailed`] if the worker panicked, for example
    /// because the key extractor panicked.
    pub async fn close(&mut self) -> Result<RelayStats> {
        self.request_stop();

        let joined = match self.worker.take() {
            Some(worker) => Some(worker.await),
            None => None,
        };
        self.finish();

        if let Some(joined) = joined {
            joined.map_err(join_error)?;
        }
        Ok(self.stats())
    }

    /// Like [`close`](Self::close), giving up after `timeout`.
    ///
    /// On timeout the worker keeps running towards its stop and a later call
    /// to `close` can still wait for it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Timeout`] if the worker did not stop in time, or
    /// [`Error::OperationFailed`] if it panicked.
    pub async fn close_with_timeout(&mut self, timeout: Duration) -> Result<RelayStats> {
        self.request_stop();

        if let Some(worker) = self.worker.as_mut() {
            let Ok(joined) = tokio::time::timeout(timeout, worker).await else {
                return Err(Error::Timeout {
                    operation: "relay_close".to_string(),
                    after: timeout,
                });
            };
            self.worker = None;
            self.finish();
            joined.map_err(join_error)?;
        }

        self.finish();
        Ok(self.stats())
    }

    fn request_stop(&self) {
        if !self.closed {
            debug!("Relay close requested");
        }
        self.stop.send_replace(true);
    }

    fn finish(&mut self) {
        self.closed = true;
        self.extractor = None;
        self.input = None;
        self.input_sender = None;
        self.output = None;
        if let Some(state) = self.state_sender.take() {
            state.send_replace(RelayState::Stopped);
        }
    }

    /// Returns a sender for the auto-allocated input channel.
    ///
    /// `None` if the input was supplied by the caller, or after
    /// [`take_input_sender`](Self::take_input_sender) or close.
    #[must_use]
    pub fn input_sender(&self) -> Option<mpsc::Sender<T>> {
        self.input_sender.clone()
    }

    /// Takes the relay's own sender for the auto-allocated input channel.
    ///
    /// Once every sender is dropped the relay sees its input as closed.
    pub fn take_input_sender(&mut self) -> Option<mpsc::Sender<T>> {
        self.input_sender.take()
    }

    /// Takes the consumer half of the auto-allocated output endpoint.
    pub fn take_output_receiver(&mut self) -> Option<O::Receiver> {
        self.output_receiver.take()
    }

    /// Returns the current lifecycle state.
    ///
    /// Always [`RelayState::Stopped`] once `close` has returned, even if the
    /// worker died before publishing it.
    #[must_use]
    pub fn state(&self) -> RelayState {
        if self.closed {
            return RelayState::Stopped;
        }
        *self.state.borrow()
    }

    /// Returns a receiver that observes lifecycle state changes.
    #[must_use]
    pub fn subscribe_state(&self) -> watch::Receiver<RelayState> {
        self.state.clone()
    }

    /// Returns a snapshot of the relay counters.
    #[must_use]
    pub fn stats(&self) -> RelayStats {
        self.counters.snapshot()
    }

    /// Returns the normalized settings.
    #[must_use]
    pub const fn settings(&self) -> QueueSettings {
        self.settings
    }

    /// Returns true while the worker task is alive.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.worker
            .as_ref()
            .is_some_and(|worker| !worker.is_finished())
    }
}

impl<T, O> fmt::Debug for UniqueQueue<T, O>
where
    O: Outlet<T>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UniqueQueue")
            .field("settings", &self.settings)
            .field("state", &*self.state.borrow())
            .field("stats", &self.counters.snapshot())
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

/// Helper to convert worker join errors.
#[allow(clippy::needless_pass_by_value)]
fn join_error(e: tokio::task::JoinError) -> Error {
    let cause = if e.is_panic() {
        "relay worker panicked".to_string()
    } else {
        e.to_string()
    };
    Error::OperationFailed {
        operation: "relay_close".to_string(),
        cause,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DEFAULT_BUFFER_SIZE;

    #[test]
    fn test_init_applies_defaults() {
        let mut queue: UniqueQueue<String> =
            UniqueQueue::init(UniqueQueueConfig::new(|s: &String| s.clone()).with_buffer_size(0))
                .unwrap();

        assert_eq!(queue.settings().buffer_size, DEFAULT_BUFFER_SIZE);
        assert_eq!(queue.state(), RelayState::Idle);
        assert_eq!(queue.stats(), RelayStats::default());

        let sender = queue.take_input_sender().unwrap();
        assert_eq!(sender.max_capacity(), DEFAULT_BUFFER_SIZE);
        let receiver = queue.take_output_receiver().unwrap();
        assert_eq!(receiver.max_capacity(), DEFAULT_BUFFER_SIZE);

        assert!(queue.take_input_sender().is_none());
        assert!(queue.take_output_receiver().is_none());
    }

    #[test]
    fn test_init_keeps_supplied_endpoints() {
        let (_input_tx, input_rx) = mpsc::channel::<String>(3);
        let (output_tx, _output_rx) = mpsc::channel::<String>(5);

        let queue = UniqueQueue::init(
            UniqueQueueConfig::new(|s: &String| s.clone())
                .with_input(input_rx)
                .with_output(output_tx),
        )
        .unwrap();

        assert!(queue.input_sender().is_none());
        assert_eq!(queue.settings().buffer_size, DEFAULT_BUFFER_SIZE);
    }

    #[test]
    fn test_init_rejects_oversized_buffer() {
        let result: Result<UniqueQueue<String>> = UniqueQueue::init(
            UniqueQueueConfig::new(|s: &String| s.clone()).with_buffer_size(usize::MAX),
        );
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_run_outside_runtime_fails() {
        let mut queue: UniqueQueue<String> =
            UniqueQueue::init(UniqueQueueConfig::new(|s: &String| s.clone())).unwrap();

        let result = queue.run();
        assert!(matches!(result, Err(Error::OperationFailed { .. })));
        assert!(!queue.is_running());
    }

    #[tokio::test]
    async fn test_close_without_run() {
        let mut queue: UniqueQueue<String> =
            UniqueQueue::init(UniqueQueueConfig::new(|s: &String| s.clone())).unwrap();
        let sender = queue.take_input_sender().unwrap();

        let stats = queue.close().await.unwrap();
        assert_eq!(stats, RelayStats::default());
        assert_eq!(queue.state(), RelayState::Stopped);
        assert!(sender.is_closed());
        assert!(matches!(queue.run(), Err(Error::Closed)));
    }

    #[tokio::test]
    async fn test_debug_format() {
        let queue: UniqueQueue<String> =
            UniqueQueue::init(UniqueQueueConfig::new(|s: &String| s.clone())).unwrap();
        let debug = format!("{queue:?}");
        assert!(debug.contains("UniqueQueue"));
        assert!(debug.contains("Idle"));
    }
}
