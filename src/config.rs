//! Configuration types for ledgerq.
//!
//! This module contains the run configuration: how many producers and
//! consumers to spawn, how fast they pace themselves, how many tasks a run
//! produces in total, and how diagnostics are logged.

use crate::error::{LedgerError, LedgerResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Main configuration for a ledgerq run.
///
/// # Examples
///
/// ```rust
/// use ledgerq::config::{LedgerConfig, ProducerConfig, RunConfig};
///
/// // Use default configuration
/// let config = LedgerConfig::default();
///
/// // Custom configuration
/// let config = LedgerConfig {
///     producers: ProducerConfig::with_count(4).with_interval(50),
///     run: RunConfig {
///         production_limit: 200,
///         ..Default::default()
///     },
///     ..Default::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Producer pool configuration
    pub producers: ProducerConfig,

    /// Consumer pool configuration
    pub consumers: ConsumerConfig,

    /// Run-level configuration
    pub run: RunConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Producer pool configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProducerConfig {
    /// Number of producers to spawn
    pub count: usize,

    /// Pause after each append (in milliseconds)
    pub interval_ms: u64,
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self {
            count: 2,
            interval_ms: 200,
        }
    }
}

impl ProducerConfig {
    /// Create a producer configuration with a specific number of producers.
    pub fn with_count(count: usize) -> Self {
        Self {
            count,
            ..Default::default()
        }
    }

    /// Set the pause between appends.
    pub fn with_interval(mut self, interval_ms: u64) -> Self {
        self.interval_ms = interval_ms;
        self
    }

    /// Pause between appends as a `Duration`.
    pub fn interval(&self) -> Duration {
        self.interval_ms.millis()
    }
}

/// Consumer pool configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsumerConfig {
    /// Number of consumers to spawn
    pub count: usize,

    /// Pause after each tail inspection (in milliseconds)
    pub interval_ms: u64,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            count: 2,
            interval_ms: 100,
        }
    }
}

impl ConsumerConfig {
    /// Create a consumer configuration with a specific number of consumers.
    pub fn with_count(count: usize) -> Self {
        Self {
            count,
            ..Default::default()
        }
    }

    /// Set the pause between tail inspections.
    pub fn with_interval(mut self, interval_ms: u64) -> Self {
        self.interval_ms = interval_ms;
        self
    }

    /// Pause between tail inspections as a `Duration`.
    pub fn interval(&self) -> Duration {
        self.interval_ms.millis()
    }
}

/// Run-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Total number of tasks produced across all producers
    pub production_limit: usize,

    /// Time to wait for workers to stop after shutdown is requested (in seconds)
    pub shutdown_timeout_secs: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            production_limit: 1000,
            shutdown_timeout_secs: 5,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter
    pub level: LogLevel,

    /// Enable colored output
    pub colored: bool,

    /// Include target module in logs
    pub include_targets: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            colored: true,
            include_targets: false,
        }
    }
}

impl LoggingConfig {
    /// Install a global fmt subscriber writing to standard error.
    ///
    /// Standard output is reserved for report lines. Returns `false` if a
    /// global subscriber was already installed.
    pub fn init(&self) -> bool {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::from(self.level))
            .with_ansi(self.colored)
            .with_target(self.include_targets)
            .with_writer(std::io::stderr)
            .try_init()
            .is_ok()
    }
}

/// Log level enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace level
    Trace,
    /// Debug level
    Debug,
    /// Info level
    Info,
    /// Warn level
    Warn,
    /// Error level
    Error,
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            other => Err(LedgerError::config(format!("Unknown log level '{}'", other))),
        }
    }
}

/// Helper trait for converting durations in configuration.
pub trait DurationExt {
    /// Convert seconds to Duration
    fn secs(self) -> Duration;
    /// Convert milliseconds to Duration
    fn millis(self) -> Duration;
}

impl DurationExt for u64 {
    fn secs(self) -> Duration {
        Duration::from_secs(self)
    }

    fn millis(self) -> Duration {
        Duration::from_millis(self)
    }
}

impl LedgerConfig {
    /// Create a configuration for local experimentation: faster pacing,
    /// a shorter run and debug logging.
    pub fn development() -> Self {
        Self {
            producers: ProducerConfig::with_count(2).with_interval(50),
            consumers: ConsumerConfig::with_count(2).with_interval(25),
            run: RunConfig {
                production_limit: 100,
                ..Default::default()
            },
            logging: LoggingConfig {
                level: LogLevel::Debug,
                include_targets: true,
                ..Default::default()
            },
        }
    }

    /// Create a configuration for testing.
    pub fn testing() -> Self {
        Self {
            producers: ProducerConfig::with_count(2).with_interval(1),
            consumers: ConsumerConfig::with_count(2).with_interval(1),
            run: RunConfig {
                production_limit: 20,
                shutdown_timeout_secs: 2,
            },
            logging: LoggingConfig {
                level: LogLevel::Debug,
                colored: false,
                include_targets: true,
            },
        }
    }

    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> LedgerResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate().map_err(LedgerError::invalid)?;
        Ok(config)
    }

    /// Load a configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> LedgerResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            LedgerError::config(format!("Cannot read config {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&contents)
    }

    /// Time to wait for workers to stop after shutdown is requested.
    pub fn shutdown_timeout(&self) -> Duration {
        self.run.shutdown_timeout_secs.secs()
    }

    /// Validate the configuration and return any errors.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.producers.count == 0 {
            errors.push("Number of producers must be greater than 0".to_string());
        }

        if self.producers.count > 1000 {
            errors.push("Number of producers should not exceed 1000".to_string());
        }

        if self.consumers.count > 1000 {
            errors.push("Number of consumers should not exceed 1000".to_string());
        }

        if self.producers.interval_ms == 0 {
            errors.push("Producer interval must be greater than 0".to_string());
        }

        if self.consumers.interval_ms == 0 {
            errors.push("Consumer interval must be greater than 0".to_string());
        }

        if self.run.shutdown_timeout_secs == 0 {
            errors.push("Shutdown timeout must be greater than 0".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    #[test]
    fn test_default_config() {
        let config = LedgerConfig::default();
        assert_eq!(config.producers.count, 2);
        assert_eq!(config.consumers.count, 2);
        assert_eq!(config.run.production_limit, 1000);
        assert_eq!(config.producers.interval(), Duration::from_millis(200));
        assert_eq!(config.consumers.interval(), Duration::from_millis(100));
        assert_ok!(config.validate());
    }

    #[test]
    fn test_presets_are_valid() {
        let development = LedgerConfig::development();
        assert!(matches!(development.logging.level, LogLevel::Debug));
        assert_ok!(development.validate());

        let testing = LedgerConfig::testing();
        assert_eq!(testing.run.production_limit, 20);
        assert_ok!(testing.validate());
    }

    #[test]
    fn test_config_validation() {
        let mut config = LedgerConfig::default();

        config.producers.count = 0;
        config.consumers.interval_ms = 0;
        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().any(|e| e.contains("producers")));
        assert!(errors.iter().any(|e| e.contains("Consumer interval")));
    }

    #[test]
    fn test_zero_consumers_and_limit_are_allowed() {
        let mut config = LedgerConfig::default();
        config.consumers.count = 0;
        config.run.production_limit = 0;
        assert_ok!(config.validate());
    }

    #[test]
    fn test_json_partial_config() {
        let config = LedgerConfig::from_json_str(
            r#"{
                "producers": { "count": 3 },
                "run": { "production_limit": 10 },
                "logging": { "level": "warn" }
            }"#,
        )
        .unwrap();

        assert_eq!(config.producers.count, 3);
        assert_eq!(config.producers.interval_ms, 200);
        assert_eq!(config.consumers.count, 2);
        assert_eq!(config.run.production_limit, 10);
        assert_eq!(config.logging.level, LogLevel::Warn);
    }

    #[test]
    fn test_json_rejects_invalid_values() {
        let result = LedgerConfig::from_json_str(r#"{ "producers": { "count": 0 } }"#);
        assert!(matches!(result, Err(LedgerError::ConfigError { .. })));

        let result = LedgerConfig::from_json_str("not json");
        assert!(matches!(result, Err(LedgerError::Serialization(_))));
    }

    #[test]
    fn test_missing_file() {
        let result = LedgerConfig::from_json_file("/definitely/not/here.json");
        assert_err!(result);
    }

    #[test]
    fn test_log_level_parse() {
        assert_eq!("DEBUG".parse::<LogLevel>().unwrap(), LogLevel::Debug);
        assert_err!("loud".parse::<LogLevel>());
        assert_eq!(tracing::Level::from(LogLevel::Warn), tracing::Level::WARN);
    }

    #[test]
    fn test_builders() {
        let producers = ProducerConfig::with_count(8).with_interval(10);
        assert_eq!(producers.count, 8);
        assert_eq!(producers.interval_ms, 10);

        let consumers = ConsumerConfig::with_count(3).with_interval(5);
        assert_eq!(consumers.count, 3);
        assert_eq!(consumers.interval(), Duration::from_millis(5));
    }

    #[test]
    fn test_duration_ext() {
        assert_eq!(5u64.secs(), Duration::from_secs(5));
        assert_eq!(1500u64.millis(), Duration::from_millis(1500));
    }
}
