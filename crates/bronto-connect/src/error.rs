//! Error types for bronto-connect
//!
//! Provides structured error handling for both the runner and the sync engine.

use crate::session::RemoteFault;
use std::fmt;
use thiserror::Error;

/// Result type alias for the runner
pub type Result<T> = std::result::Result<T, ConnectError>;

/// Result type alias for connector operations
pub type ConnectorResult<T> = std::result::Result<T, ConnectorError>;

/// Main error type for the runner
#[derive(Error, Debug)]
pub enum ConnectError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// A stream failed to sync
    #[error("Stream '{name}' failed: {source}")]
    Stream {
        name: String,
        #[source]
        source: ConnectorError,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Connector error outside of a stream sync
    #[error(transparent)]
    Connector(#[from] ConnectorError),
}

/// Errors that can occur while syncing a stream
#[derive(Debug, Error)]
pub enum ConnectorError {
    /// Configuration or catalog validation failed
    #[error("configuration error: {0}")]
    Config(String),

    /// Authentication against the remote API failed
    #[error("authentication error: {0}")]
    Auth(String),

    /// Timeout retries were exhausted
    #[error("timeout: {0}")]
    Timeout(String),

    /// Unrecoverable fault reported by the remote API
    #[error("remote fault: {0}")]
    Remote(#[from] RemoteFault),

    /// Checkpoint could not be read or parsed
    #[error("state error: {0}")]
    State(String),

    /// Sink rejected a message
    #[error("sink error: {0}")]
    Sink(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Generic error
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl ConnectorError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an authentication error
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Auth(msg.into())
    }

    /// Create a state error
    pub fn state(msg: impl Into<String>) -> Self {
        Self::State(msg.into())
    }

    /// Create a sink error
    pub fn sink(msg: impl Into<String>) -> Self {
        Self::Sink(msg.into())
    }

    /// Authentication failures terminate the process rather than a single stream
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Auth(_))
    }
}

impl ConnectError {
    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Wrap a connector error with the name of the stream that raised it
    pub fn stream(name: impl Into<String>, source: ConnectorError) -> Self {
        Self::Stream {
            name: name.into(),
            source,
        }
    }
}

/// Progress of a single stream within a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamStatus {
    /// Not started yet
    Pending,
    /// Currently syncing
    Syncing,
    /// Finished successfully
    Done,
    /// Aborted with a fatal error
    Failed,
}

impl fmt::Display for StreamStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Syncing => write!(f, "syncing"),
            Self::Done => write!(f, "done"),
            Self::Failed => write!(f, "failed"),
        }
    }
}
