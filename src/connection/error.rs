// ABOUTME: Typed errors for connection adapters and the connection manager.
// ABOUTME: Covers transport, authentication, filesystem, and registration failures.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConnectionError {
    /// Fatal configuration error: no adapter factory registered for the
    /// host's connection type. Never retried.
    #[error("no connection adapter registered for connection type \"{0}\"")]
    UnknownConnectionType(String),

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("authentication failed: no valid credentials")]
    AuthenticationFailed,

    #[error("SSH agent not available: {0}")]
    AgentUnavailable(String),

    #[error("failed to load key from {path}: {reason}")]
    KeyLoadFailed { path: PathBuf, reason: String },

    #[error("path not found: {0}")]
    PathNotFound(PathBuf),

    #[error("permission denied: {0}")]
    Permission(PathBuf),

    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("command execution failed: {0}")]
    CommandFailed(String),

    #[error("channel closed unexpectedly without exit status")]
    ChannelClosed,

    #[error("invalid connection settings: {0}")]
    InvalidSettings(String),

    #[error("SSH protocol error: {0}")]
    Protocol(#[from] russh::Error),

    #[error("SSH key error: {0}")]
    Key(#[from] russh::keys::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConnectionError>;
