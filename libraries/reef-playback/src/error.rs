//! Error types for playback coordination

use thiserror::Error;

/// Playback errors
#[derive(Debug, Error)]
pub enum PlaybackError {
    /// A session command with an unknown name was received
    #[error("unsupported session command: {0}")]
    UnsupportedCommand(String),

    /// Index out of bounds
    #[error("index out of bounds: {0}")]
    IndexOutOfBounds(usize),

    /// Invalid operation
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// The session did not become ready within the configured timeout
    #[error("session connect timed out")]
    ConnectTimeout,

    /// The session task is gone and can no longer accept commands
    #[error("session channel closed")]
    ChannelClosed,
}

/// Result type for playback operations
pub type Result<T> = std::result::Result<T, PlaybackError>;
