//! Error types for digital I/O operations.

/// Result type alias for hardware operations.
pub type Result<T> = std::result::Result<T, HardwareError>;

/// Errors that can occur on the station's digital I/O.
#[derive(Debug, thiserror::Error)]
pub enum HardwareError {
    /// A sensor input could not be read.
    #[error("Sensor read failed on {pin}: {message}")]
    SensorRead { pin: String, message: String },

    /// The gate relay output could not be written.
    #[error("Relay write failed on {pin}: {message}")]
    RelayWrite { pin: String, message: String },

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl HardwareError {
    /// Create a new sensor read error.
    pub fn sensor_read(pin: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SensorRead {
            pin: pin.into(),
            message: message.into(),
        }
    }

    /// Create a new relay write error.
    pub fn relay_write(pin: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RelayWrite {
            pin: pin.into(),
            message: message.into(),
        }
    }
}
