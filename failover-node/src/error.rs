//! Error types for failover-node

use crate::replication::GtidMode;
use crate::transport::TransportError;
use thiserror::Error;

/// Result type alias for node operations
pub type NodeResult<T> = std::result::Result<T, NodeError>;

/// Errors surfaced by the connection manager and replication controller
#[derive(Error, Debug)]
pub enum NodeError {
    /// Establishing the administrative session failed (never retried)
    #[error("Connect to {address} failed: {source}")]
    ConnectFailed {
        address: String,
        #[source]
        source: TransportError,
    },

    /// The session kept breaking until the retry bound was used up
    #[error("Connection to {address} lost after {attempts} attempts: {source}")]
    ConnectionLost {
        address: String,
        attempts: u32,
        #[source]
        source: TransportError,
    },

    /// The server rejected the command (never retried)
    #[error("Command `{command}` failed: {source}")]
    CommandFailed {
        command: String,
        #[source]
        source: TransportError,
    },

    /// A server variable probe failed; `fallback` is still safe to use
    #[error("Probe failed, falling back to {fallback}: {source}")]
    ProbeFailed {
        fallback: GtidMode,
        #[source]
        source: Box<NodeError>,
    },

    /// Address could not be split into host and port
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// Result set has no cell at the given coordinates
    #[error("No cell at row {row}, column {column}")]
    CellNotFound { row: usize, column: usize },

    /// Result set has no column with the given name
    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error while reading configuration
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl NodeError {
    /// True when the failure was transport-level connection loss
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::ConnectionLost { .. } => true,
            Self::ProbeFailed { source, .. } => source.is_retryable(),
            _ => false,
        }
    }

    /// GTID mode a caller may rely on after a failed probe
    pub fn gtid_fallback(&self) -> Option<GtidMode> {
        match self {
            Self::ProbeFailed { fallback, .. } => Some(*fallback),
            _ => None,
        }
    }
}
