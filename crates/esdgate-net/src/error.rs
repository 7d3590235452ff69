//! Error types for backend communication.

/// Result type alias for backend operations.
pub type Result<T> = std::result::Result<T, NetError>;

/// Errors that can occur talking to the backend.
#[derive(Debug, thiserror::Error)]
pub enum NetError {
    /// The backend rejected the credential (HTTP 401).
    #[error("Unauthorized")]
    Unauthorized,

    /// The request did not complete within the per-request budget.
    #[error("Request timed out")]
    Timeout,

    /// The backend answered with an unexpected status.
    #[error("Unexpected HTTP status: {status}")]
    Http { status: u16 },

    /// The response body could not be decoded.
    #[error("Invalid response body: {0}")]
    Decode(String),

    /// Connection-level failure.
    #[error("Transport error: {0}")]
    Transport(String),
}

impl From<reqwest::Error> for NetError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            NetError::Timeout
        } else if error.is_decode() {
            NetError::Decode(error.to_string())
        } else {
            NetError::Transport(error.to_string())
        }
    }
}
