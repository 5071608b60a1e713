//! Structured logging configuration.

use crate::config::ConfigFileLogging;
use std::fmt;

const DEFAULT_FILTER: &str = "info";

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// One JSON object per line.
    Json,
    /// Human-readable multi-line output.
    #[default]
    Pretty,
}

impl LogFormat {
    /// Parses a format string (case-insensitive).
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "json" => Some(Self::Json),
            "pretty" | "text" => Some(Self::Pretty),
            _ => None,
        }
    }

    /// Returns the format as a string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Pretty => "pretty",
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Logging configuration.
///
/// | Variable | Description | Default |
/// |----------|-------------|---------|
/// | `UNIQUE_QUEUE_LOG` | `EnvFilter` directive | `info` |
/// | `UNIQUE_QUEUE_LOG_FORMAT` | `json` or `pretty` | `pretty` |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// `EnvFilter` directive.
    pub filter: String,
    /// Output format.
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: DEFAULT_FILTER.to_string(),
            format: LogFormat::default(),
        }
    }
}

impl LoggingConfig {
    /// Builds logging configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_settings(None)
    }

    /// Builds logging configuration from config settings with env overrides.
    #[must_use]
    pub fn from_settings(settings: Option<&ConfigFileLogging>) -> Self {
        let filter = settings
            .and_then(|config| config.filter.clone())
            .unwrap_or_else(|| DEFAULT_FILTER.to_string());
        let format = settings
            .and_then(|config| config.format.as_deref())
            .and_then(LogFormat::parse)
            .unwrap_or_default();

        Self { filter, format }.with_overrides(|name| std::env::var(name).ok())
    }

    /// Applies overrides from an arbitrary variable lookup.
    #[must_use]
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(filter) = lookup("UNIQUE_QUEUE_LOG").filter(|v| !v.trim().is_empty()) {
            self.filter = filter;
        }
        if let Some(format) =
            lookup("UNIQUE_QUEUE_LOG_FORMAT").and_then(|v| LogFormat::parse(&v))
        {
            self.format = format;
        }
        self
    }

    /// Builder method to set the filter directive.
    #[must_use]
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = filter.into();
        self
    }

    /// Builder method to set the output format.
    #[must_use]
    pub const fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_parse() {
        assert_eq!(LogFormat::parse("JSON"), Some(LogFormat::Json));
        assert_eq!(LogFormat::parse("text"), Some(LogFormat::Pretty));
        assert_eq!(LogFormat::parse("xml"), None);
    }

    #[test]
    fn test_overrides() {
        let config = LoggingConfig::default().with_overrides(|name| match name {
            "UNIQUE_QUEUE_LOG" => Some("unique_queue=trace".to_string()),
            "UNIQUE_QUEUE_LOG_FORMAT" => Some("json".to_string()),
            _ => None,
        });

        assert_eq!(config.filter, "unique_queue=trace");
        assert_eq!(config.format, LogFormat::Json);
    }

    #[test]
    fn test_blank_filter_override_ignored() {
        let config = LoggingConfig::default().with_overrides(|name| {
            (name == "UNIQUE_QUEUE_LOG").then(|| "   ".to_string())
        });
        assert_eq!(config.filter, "info");
    }
}
