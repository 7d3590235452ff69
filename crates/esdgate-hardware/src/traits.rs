//! Digital pin trait definitions.
//!
//! These traits establish the contract between the sensor poller and the
//! physical pins, enabling substitution between mock pins and real GPIO
//! drivers. Reads and writes are synchronous and must return promptly; the
//! control loop calls them every tick.

use crate::error::Result;

/// A digital input pin (IR motion sensor, foot light sensors).
pub trait DigitalInput: Send {
    /// Read the current logic level (`true` = high).
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying pin cannot be read. Callers are
    /// expected to degrade the value rather than propagate the failure.
    fn read(&mut self) -> Result<bool>;
}

/// A digital output pin (gate relay).
pub trait DigitalOutput: Send {
    /// Drive the pin to the given logic level (`true` = high).
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying pin cannot be written.
    fn write(&mut self, high: bool) -> Result<()>;
}
