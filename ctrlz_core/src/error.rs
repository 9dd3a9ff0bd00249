//! Error types for the CTRL-Z core
//!
//! Structural failures (bad configuration, unknown channels, duplicate tasks,
//! lifecycle misuse) surface as [`CtrlzError`]. The hot path (`set_data` /
//! `get_data` inside a running cycle) never returns an error; a stale
//! timestamp is its only failure signal.

use thiserror::Error;

/// Result alias used throughout the framework
pub type CtrlzResult<T> = Result<T, CtrlzError>;

/// Main error type for CTRL-Z
#[derive(Debug, Error)]
pub enum CtrlzError {
    /// Configuration value missing, malformed or inconsistent
    #[error("Configuration error: {0}")]
    Config(String),

    /// Channel name not present in the channel set
    #[error("Channel '{0}' is not registered in this data center")]
    ChannelNotFound(String),

    /// A task list with this name already exists
    #[error("Task '{0}' already exists")]
    TaskExists(String),

    /// A second main thread task was requested
    #[error("Main thread task already exists ('{0}'), create task list failed")]
    MainTaskExists(String),

    /// No task list with this name
    #[error("Task '{0}' does not exist")]
    TaskNotFound(String),

    /// Operation is not allowed on the main thread task
    #[error("Main thread task '{name}' cannot be {operation}")]
    MainTaskImmutable {
        name: String,
        operation: &'static str,
    },

    /// Operation issued in the wrong scheduler lifecycle state
    #[error("Invalid scheduler state: {0}")]
    InvalidState(String),

    /// A worker failed to construct or initialize
    #[error("Worker error: {0}")]
    Worker(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Feature not available on this platform
    #[error("Unsupported: {0}")]
    Unsupported(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CtrlzError {
    /// Shorthand for a configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        CtrlzError::Config(msg.into())
    }

    /// Shorthand for a worker error
    pub fn worker<S: Into<String>>(msg: S) -> Self {
        CtrlzError::Worker(msg.into())
    }

    /// Shorthand for a lifecycle error
    pub fn invalid_state<S: Into<String>>(msg: S) -> Self {
        CtrlzError::InvalidState(msg.into())
    }
}

impl From<serde_yaml::Error> for CtrlzError {
    fn from(err: serde_yaml::Error) -> Self {
        CtrlzError::Config(format!("YAML parse error: {}", err))
    }
}

impl From<toml::de::Error> for CtrlzError {
    fn from(err: toml::de::Error) -> Self {
        CtrlzError::Config(format!("TOML parse error: {}", err))
    }
}
