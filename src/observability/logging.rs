//! Structured logging configuration.

use crate::config::LoggingSettings;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Environment variables holding a filter directive, highest priority first.
pub const LOG_ENV: [&str; 2] = ["PERMSYNC_LOG", "RUST_LOG"];

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable output.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

impl LogFormat {
    /// Parses a format name, falling back to pretty.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Pretty,
        }
    }
}

/// Resolved logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Output format.
    pub format: LogFormat,
    /// Filter directive.
    pub filter: String,
    /// Log file; stderr when unset.
    pub file: Option<PathBuf>,
}

impl LoggingConfig {
    /// Builds the configuration from settings and process environment.
    #[must_use]
    pub fn from_settings(settings: Option<&LoggingSettings>, verbose: bool) -> Self {
        Self::resolve(settings, verbose, |key| std::env::var(key).ok())
    }

    /// Builds the configuration with an explicit variable lookup.
    ///
    /// The filter comes from the environment, then `verbose` (`debug`), then
    /// the settings level, then `warn`.
    #[must_use]
    pub fn resolve(
        settings: Option<&LoggingSettings>,
        verbose: bool,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Self {
        let from_env = LOG_ENV
            .iter()
            .find_map(|key| lookup(key).filter(|v| !v.trim().is_empty()));
        let filter = from_env
            .or_else(|| verbose.then(|| "debug".to_string()))
            .or_else(|| settings.and_then(|s| s.level.clone()))
            .unwrap_or_else(|| "warn".to_string());

        Self {
            format: settings
                .and_then(|s| s.format.as_deref())
                .map(LogFormat::parse)
                .unwrap_or_default(),
            filter,
            file: settings.and_then(|s| s.file.clone()),
        }
    }

    /// Builds the subscriber filter, falling back to `warn` on a bad directive.
    #[must_use]
    pub fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_new(&self.filter).unwrap_or_else(|_| EnvFilter::new("warn"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_parse() {
        assert_eq!(LogFormat::parse("JSON"), LogFormat::Json);
        assert_eq!(LogFormat::parse("pretty"), LogFormat::Pretty);
        assert_eq!(LogFormat::parse("fancy"), LogFormat::Pretty);
    }

    #[test]
    fn test_filter_priority() {
        let settings = LoggingSettings {
            format: Some("json".to_string()),
            level: Some("info".to_string()),
            file: None,
        };

        let config = LoggingConfig::resolve(Some(&settings), false, |_| None);
        assert_eq!(config.filter, "info");
        assert_eq!(config.format, LogFormat::Json);

        let config = LoggingConfig::resolve(Some(&settings), true, |_| None);
        assert_eq!(config.filter, "debug");

        let config = LoggingConfig::resolve(Some(&settings), true, |key| {
            (key == "RUST_LOG").then(|| "permsync=trace".to_string())
        });
        assert_eq!(config.filter, "permsync=trace");

        let config = LoggingConfig::resolve(None, false, |_| None);
        assert_eq!(config.filter, "warn");
        assert_eq!(config.format, LogFormat::Pretty);
    }
}
