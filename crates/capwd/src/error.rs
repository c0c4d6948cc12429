//! Error types for capwd enforcement.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use capwd_lattice::{Command, NarrowingError, UnknownName};

use crate::protocol::ChannelId;

/// Result type for capwd operations.
pub type Result<T> = std::result::Result<T, CapwdError>;

/// Errors a request can fail with.
#[derive(Error, Debug)]
pub enum CapwdError {
    /// Command not in the channel's command set.
    #[error("capability denied: command '{command}' is not permitted on this channel")]
    CommandDenied {
        /// The command that was refused.
        command: Command,
    },

    /// A proposed limit is not a subset of the installed one.
    #[error("capability denied: {0}")]
    NarrowingDenied(#[from] NarrowingError),

    /// The channel was closed, or never existed.
    #[error("channel {channel} is closed")]
    ChannelClosed {
        /// The channel that was addressed.
        channel: ChannelId,
    },

    /// The request could not be decoded or has the wrong shape.
    #[error("malformed request: {reason}")]
    MalformedRequest {
        /// What was wrong with it.
        reason: String,
    },

    /// The caller-supplied buffer cannot hold the record.
    #[error("buffer too small: record needs {needed} bytes, buffer holds {capacity}")]
    BufferTooSmall {
        /// Bytes the masked record needs.
        needed: usize,
        /// Bytes the caller offered.
        capacity: usize,
    },

    /// A passwd file line could not be parsed.
    #[error("invalid passwd entry at line {line}: {reason}")]
    InvalidEntry {
        /// One-based line number.
        line: usize,
        /// What was wrong with it.
        reason: String,
    },

    /// IO error from the record source.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<UnknownName> for CapwdError {
    fn from(err: UnknownName) -> Self {
        CapwdError::MalformedRequest {
            reason: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for CapwdError {
    fn from(err: serde_json::Error) -> Self {
        CapwdError::MalformedRequest {
            reason: err.to_string(),
        }
    }
}

impl CapwdError {
    /// The wire-level classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CapwdError::CommandDenied { .. } | CapwdError::NarrowingDenied(_) => {
                ErrorKind::CapabilityDenied
            }
            CapwdError::ChannelClosed { .. } => ErrorKind::ChannelClosed,
            CapwdError::MalformedRequest { .. } => ErrorKind::MalformedRequest,
            CapwdError::BufferTooSmall { .. } => ErrorKind::BufferTooSmall,
            CapwdError::InvalidEntry { .. } | CapwdError::Io(_) => ErrorKind::Source,
        }
    }
}

/// Error classification carried in error frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Command or narrowing refused.
    CapabilityDenied,
    /// Channel closed or unknown.
    ChannelClosed,
    /// Undecodable or ill-shaped request.
    MalformedRequest,
    /// Caller buffer too small for the record.
    BufferTooSmall,
    /// The record source failed.
    Source,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::CapabilityDenied => "capability_denied",
            ErrorKind::ChannelClosed => "channel_closed",
            ErrorKind::MalformedRequest => "malformed_request",
            ErrorKind::BufferTooSmall => "buffer_too_small",
            ErrorKind::Source => "source",
        };
        f.write_str(name)
    }
}
