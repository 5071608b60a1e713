//! Configuration management.
//!
//! Relay settings come from three layers, later layers winning:
//! built-in defaults, an optional TOML file, and environment variables.
//!
//! # Environment Variables
//!
//! | Variable | Type | Default | Description |
//! |----------|------|---------|-------------|
//! | `UNIQUE_QUEUE_BUFFER_SIZE` | usize | `100` | Internal buffer and default endpoint capacity |
//! | `UNIQUE_QUEUE_CLOSE_POLICY` | `flush` \| `abandon` | `flush` | What `close` does with buffered items |

use crate::observability::LoggingConfig;
use crate::{Error, Result};
use serde::Deserialize;
use std::fmt;
use std::path::Path;

/// Default capacity of the internal buffer and of auto-allocated endpoints.
pub const DEFAULT_BUFFER_SIZE: usize = 100;

/// Largest buffer size a bounded tokio channel accepts.
pub const MAX_BUFFER_SIZE: usize = usize::MAX >> 3;

/// What the relay does with buffered items when it is closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClosePolicy {
    /// Forward every accepted item before stopping.
    #[default]
    Flush,
    /// Discard buffered items and stop at once.
    Abandon,
}

impl ClosePolicy {
    /// Returns the policy as a string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Flush => "flush",
            Self::Abandon => "abandon",
        }
    }

    /// Parses a policy string (case-insensitive).
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "flush" | "drain" => Some(Self::Flush),
            "abandon" | "drop" => Some(Self::Abandon),
            _ => None,
        }
    }
}

impl fmt::Display for ClosePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Relay settings that do not depend on the item type.
///
/// # Example
///
/// ```rust
/// use unique_queue::{ClosePolicy, QueueSettings};
///
/// let settings = QueueSettings::default()
///     .with_buffer_size(16)
///     .with_close_policy(ClosePolicy::Abandon);
/// assert_eq!(settings.buffer_size, 16);
/// assert_eq!(settings.close_policy, ClosePolicy::Abandon);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueSettings {
    /// Capacity of the internal buffer and of auto-allocated endpoints.
    ///
    /// A value of 0 means "unset" and is replaced by [`DEFAULT_BUFFER_SIZE`]
    /// when the relay is initialised.
    pub buffer_size: usize,
    /// What `close` does with buffered items.
    pub close_policy: ClosePolicy,
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            close_policy: ClosePolicy::Flush,
        }
    }
}

impl QueueSettings {
    /// Loads settings from environment variables, falling back to defaults.
    #[must_use]
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Applies environment variable overrides.
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|name| std::env::var(name).ok())
    }

    /// Applies overrides from an arbitrary variable lookup.
    ///
    /// Unparseable values are ignored.
    #[must_use]
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(size) = lookup("UNIQUE_QUEUE_BUFFER_SIZE").and_then(|v| v.parse().ok()) {
            self.buffer_size = size;
        }
        if let Some(policy) =
            lookup("UNIQUE_QUEUE_CLOSE_POLICY").and_then(|v| ClosePolicy::parse(&v))
        {
            self.close_policy = policy;
        }
        self
    }

    /// Builder method to set the buffer size.
    #[must_use]
    pub const fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    /// Builder method to set the close policy.
    #[must_use]
    pub const fn with_close_policy(mut self, close_policy: ClosePolicy) -> Self {
        self.close_policy = close_policy;
        self
    }

    /// Returns the buffer size with the default applied when unset.
    #[must_use]
    pub const fn effective_buffer_size(&self) -> usize {
        if self.buffer_size == 0 {
            DEFAULT_BUFFER_SIZE
        } else {
            self.buffer_size
        }
    }

    /// Parses settings from the `[queue]` section of a TOML document.
    ///
    /// Missing keys keep their defaults.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let file = ConfigFile::parse(contents)?;
        Ok(Self::default().with_file(&file))
    }

    /// Loads settings from a TOML file, then applies environment overrides.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = ConfigFile::load(path)?;
        Ok(Self::default().with_file(&file).with_env_overrides())
    }

    fn with_file(mut self, file: &ConfigFile) -> Self {
        if let Some(queue) = &file.queue {
            if let Some(size) = queue.buffer_size {
                self.buffer_size = size;
            }
            if let Some(policy) = queue.close_policy {
                self.close_policy = policy;
            }
        }
        self
    }
}

/// Configuration file structure (for TOML parsing).
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    /// Queue section.
    pub queue: Option<ConfigFileQueue>,
    /// Logging section.
    pub logging: Option<ConfigFileLogging>,
}

/// Queue section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileQueue {
    /// Buffer size.
    pub buffer_size: Option<usize>,
    /// Close policy.
    pub close_policy: Option<ClosePolicy>,
}

/// Logging section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileLogging {
    /// `EnvFilter` directive, e.g. `unique_queue=debug`.
    pub filter: Option<String>,
    /// Output format: `json` or `pretty`.
    pub format: Option<String>,
}

impl ConfigFile {
    /// Parses a TOML document.
    pub fn parse(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| Error::InvalidConfig(e.to_string()))
    }

    /// Reads and parses a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| Error::OperationFailed {
            operation: "read_config".to_string(),
            cause: format!("{}: {}", path.display(), e),
        })?;
        Self::parse(&contents)
    }

    /// Builds the logging configuration, applying environment overrides.
    #[must_use]
    pub fn logging_config(&self) -> LoggingConfig {
        LoggingConfig::from_settings(self.logging.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use test_case::test_case;

    #[test]
    fn test_default_settings() {
        let settings = QueueSettings::default();
        assert_eq!(settings.buffer_size, 100);
        assert_eq!(settings.close_policy, ClosePolicy::Flush);
    }

    #[test_case("flush", Some(ClosePolicy::Flush); "flush")]
    #[test_case("DRAIN", Some(ClosePolicy::Flush); "drain alias")]
    #[test_case(" Abandon ", Some(ClosePolicy::Abandon); "abandon padded")]
    #[test_case("drop", Some(ClosePolicy::Abandon); "drop alias")]
    #[test_case("later", None; "unknown")]
    fn test_close_policy_parse(input: &str, expected: Option<ClosePolicy>) {
        assert_eq!(ClosePolicy::parse(input), expected);
    }

    #[test]
    fn test_effective_buffer_size() {
        assert_eq!(
            QueueSettings::default()
                .with_buffer_size(0)
                .effective_buffer_size(),
            DEFAULT_BUFFER_SIZE
        );
        assert_eq!(
            QueueSettings::default()
                .with_buffer_size(7)
                .effective_buffer_size(),
            7
        );
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("UNIQUE_QUEUE_BUFFER_SIZE", "32"),
            ("UNIQUE_QUEUE_CLOSE_POLICY", "abandon"),
        ]
        .into_iter()
        .collect();

        let settings =
            QueueSettings::default().with_overrides(|name| vars.get(name).map(ToString::to_string));

        assert_eq!(settings.buffer_size, 32);
        assert_eq!(settings.close_policy, ClosePolicy::Abandon);
    }

    #[test]
    fn test_invalid_overrides_are_ignored() {
        let settings = QueueSettings::default().with_overrides(|name| match name {
            "UNIQUE_QUEUE_BUFFER_SIZE" => Some("lots".to_string()),
            "UNIQUE_QUEUE_CLOSE_POLICY" => Some("sometimes".to_string()),
            _ => None,
        });

        assert_eq!(settings, QueueSettings::default());
    }

    #[test]
    fn test_from_toml_str() {
        let settings = QueueSettings::from_toml_str(
            r#"
            [queue]
            buffer_size = 8
            close_policy = "abandon"
            "#,
        )
        .unwrap();

        assert_eq!(settings.buffer_size, 8);
        assert_eq!(settings.close_policy, ClosePolicy::Abandon);
    }

    #[test]
    fn test_from_toml_str_partial() {
        let settings = QueueSettings::from_toml_str("[queue]\nbuffer_size = 3\n").unwrap();
        assert_eq!(settings.buffer_size, 3);
        assert_eq!(settings.close_policy, ClosePolicy::Flush);

        let settings = QueueSettings::from_toml_str("").unwrap();
        assert_eq!(settings, QueueSettings::default());
    }

    #[test]
    fn test_from_toml_str_rejects_bad_policy() {
        let result = QueueSettings::from_toml_str("[queue]\nclose_policy = \"later\"\n");
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_config_file_load() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[queue]\nbuffer_size = 12\n\n[logging]\nfilter = \"unique_queue=debug\"\nformat = \"json\""
        )
        .unwrap();

        let config = ConfigFile::load(file.path()).unwrap();
        let queue = config.queue.as_ref().unwrap();
        assert_eq!(queue.buffer_size, Some(12));
        let logging = config.logging.as_ref().unwrap();
        assert_eq!(logging.filter.as_deref(), Some("unique_queue=debug"));
        assert_eq!(logging.format.as_deref(), Some("json"));
    }

    #[test]
    fn test_config_file_load_missing() {
        let result = ConfigFile::load("/nonexistent/unique-queue.toml");
        assert!(matches!(result, Err(Error::OperationFailed { .. })));
    }
}
