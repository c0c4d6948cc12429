//! Error types for the node daemon and its client.

use thiserror::Error;

use capwd::{CapwdError, ErrorKind};

/// Errors surfaced by capwd-node.
#[derive(Error, Debug)]
pub enum NodeError {
    /// The configuration file is unusable.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The configuration file is not valid TOML.
    #[error("config parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Local enforcement error.
    #[error(transparent)]
    Capwd(#[from] CapwdError),

    /// The broker answered with an error frame.
    #[error("remote error ({kind}): {message}")]
    Remote {
        /// Classification reported by the broker.
        kind: ErrorKind,
        /// Detail reported by the broker.
        message: String,
    },

    /// The peer sent something that is not part of the wire protocol.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The peer hung up.
    #[error("connection closed by peer")]
    Disconnected,

    /// Frame encoding error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Socket or file error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl NodeError {
    /// The broker-side classification, if this came from an error frame.
    pub fn remote_kind(&self) -> Option<ErrorKind> {
        match self {
            NodeError::Remote { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}
