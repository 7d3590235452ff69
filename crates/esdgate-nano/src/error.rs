//! Error types for the serial link.

use std::time::Duration;

/// Result type alias for link operations.
pub type Result<T> = std::result::Result<T, LinkError>;

/// Errors that can occur while establishing the serial link.
///
/// Once established, the link never errors out: read faults are swallowed
/// by the reader loop and commands on a dead link are dropped with a log
/// line.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    /// The serial port could not be opened.
    #[error("Failed to open serial port {port}: {message}")]
    Open { port: String, message: String },

    /// The controller did not announce itself within the handshake budget.
    ///
    /// This must be surfaced to the operator: the link stays non-functional
    /// and every command becomes a no-op.
    #[error("Handshake timed out after {0:?}")]
    HandshakeTimeout(Duration),
}

impl LinkError {
    /// Create a new open error.
    pub fn open(port: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Open {
            port: port.into(),
            message: message.into(),
        }
    }
}
