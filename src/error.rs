//! Error types for ledgerq operations.

use thiserror::Error;

/// Result type used throughout ledgerq.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Main error type for ledgerq operations.
///
/// The ledger and tracker themselves never fail; these variants cover
/// configuration and the orchestrator lifecycle.
#[derive(Error, Debug)]
pub enum LedgerError {
    /// Configuration error
    #[error("Configuration error: {message}")]
    ConfigError {
        /// Error message
        message: String,
    },

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error while reading configuration or standard input
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The run has already been started
    #[error("Run is already started")]
    AlreadyRunning,

    /// The run is not active
    #[error("Run is not active")]
    NotRunning,

    /// Workers did not stop in time
    #[error("Workers did not stop within {timeout_secs} seconds")]
    Timeout {
        /// Timeout duration in seconds
        timeout_secs: u64,
    },

    /// A worker task ended abnormally
    #[error("Worker {worker} failed: {message}")]
    WorkerFailed {
        /// Name of the worker
        worker: String,
        /// Failure description
        message: String,
    },
}

impl LedgerError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Create a configuration error from a list of validation problems
    pub fn invalid(problems: Vec<String>) -> Self {
        Self::config(problems.join("; "))
    }
}
