//! Log bus error types.

use thiserror::Error;

/// Errors raised while delivering log events.
///
/// These never reach the publisher's caller; they are logged locally.
#[derive(Debug, Error)]
pub enum LogBusError {
    /// The sink refused or failed to deliver the event.
    #[error("Sink error: {0}")]
    Sink(String),

    /// The publish channel is full.
    #[error("Log channel full, event dropped")]
    ChannelFull,

    /// The forwarding task has stopped.
    #[error("Log channel closed, event dropped")]
    ChannelClosed,

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Convenience type alias for log bus results.
pub type Result<T> = std::result::Result<T, LogBusError>;
