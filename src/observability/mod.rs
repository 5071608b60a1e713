//! Observability: `tracing` subscriber installation.
//!
//! The relay itself only emits `tracing` events and `metrics` samples. Embedding
//! applications that do not install their own subscriber can call [`init`].

mod logging;

pub use logging::{LogFormat, LoggingConfig};

use crate::{Error, Result};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Installs a global `tracing` subscriber for the given configuration.
///
/// # Errors
///
/// Returns an error if the filter directive is invalid or a global subscriber
/// has already been installed.
pub fn init(config: &LoggingConfig) -> Result<()> {
    let filter = build_filter(&config.filter)?;

    match config.format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_thread_names(true),
            )
            .with(filter)
            .try_init()
            .map_err(init_error),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .pretty()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_thread_names(true),
            )
            .with(filter)
            .try_init()
            .map_err(init_error),
    }
}

/// Initializes logging using environment variables.
///
/// # Errors
///
/// See [`init`].
pub fn init_from_env() -> Result<()> {
    init(&LoggingConfig::from_env())
}

fn build_filter(directive: &str) -> Result<EnvFilter> {
    EnvFilter::try_new(directive)
        .map_err(|e| Error::InvalidConfig(format!("log filter '{directive}': {e}")))
}

/// Helper to convert init errors.
#[allow(clippy::needless_pass_by_value)]
fn init_error(e: tracing_subscriber::util::TryInitError) -> Error {
    Error::OperationFailed {
        operation: "observability_init".to_string(),
        cause: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_filter_accepts_directives() {
        assert!(build_filter("info").is_ok());
        assert!(build_filter("unique_queue=debug,tokio=warn").is_ok());
    }

    #[test]
    fn test_build_filter_rejects_garbage() {
        let result = build_filter("unique_queue=loud");
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }
}
