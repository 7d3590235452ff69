//! Mock pin implementation for testing and development.
//!
//! This module provides a simulated digital pin that can be controlled
//! programmatically without requiring physical hardware. Each pin comes
//! with a handle for driving its level and injecting faults.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::{HardwareError, Result};
use crate::traits::{DigitalInput, DigitalOutput};

/// Mock digital pin for testing and development.
///
/// Implements both [`DigitalInput`] and [`DigitalOutput`]; sensor pins use
/// the input side (with the handle driving the level), the relay uses the
/// output side (with the handle observing the level).
///
/// # Examples
///
/// ```
/// use esdgate_hardware::mock::MockPin;
/// use esdgate_hardware::traits::DigitalInput;
///
/// let (mut pin, handle) = MockPin::new("ir-motion");
/// handle.set_high();
/// assert!(pin.read().unwrap());
/// ```
#[derive(Debug)]
pub struct MockPin {
    name: String,
    level: Arc<AtomicBool>,
    failing: Arc<AtomicBool>,
}

impl MockPin {
    /// Create a new mock pin, initially low and healthy.
    ///
    /// Returns a tuple of (`MockPin`, `MockPinHandle`) where the handle
    /// drives the simulated level and fault state.
    pub fn new(name: impl Into<String>) -> (Self, MockPinHandle) {
        let name = name.into();
        let level = Arc::new(AtomicBool::new(false));
        let failing = Arc::new(AtomicBool::new(false));

        let pin = Self {
            name: name.clone(),
            level: Arc::clone(&level),
            failing: Arc::clone(&failing),
        };
        let handle = MockPinHandle { name, level, failing };

        (pin, handle)
    }
}

impl DigitalInput for MockPin {
    fn read(&mut self) -> Result<bool> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(HardwareError::sensor_read(&self.name, "simulated fault"));
        }
        Ok(self.level.load(Ordering::SeqCst))
    }
}

impl DigitalOutput for MockPin {
    fn write(&mut self, high: bool) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(HardwareError::relay_write(&self.name, "simulated fault"));
        }
        self.level.store(high, Ordering::SeqCst);
        Ok(())
    }
}

/// Handle for controlling a [`MockPin`].
///
/// Cloneable; all clones observe and drive the same pin.
#[derive(Debug, Clone)]
pub struct MockPinHandle {
    name: String,
    level: Arc<AtomicBool>,
    failing: Arc<AtomicBool>,
}

impl MockPinHandle {
    /// Drive the pin high.
    pub fn set_high(&self) {
        self.level.store(true, Ordering::SeqCst);
    }

    /// Drive the pin low.
    pub fn set_low(&self) {
        self.level.store(false, Ordering::SeqCst);
    }

    /// Drive the pin to the given level.
    pub fn set_level(&self, high: bool) {
        self.level.store(high, Ordering::SeqCst);
    }

    /// Current pin level.
    #[must_use]
    pub fn level(&self) -> bool {
        self.level.load(Ordering::SeqCst)
    }

    /// Make every subsequent read/write on this pin fail (or heal it).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Pin name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handle_drives_input_level() {
        let (mut pin, handle) = MockPin::new("foot-left");

        assert!(!pin.read().unwrap());
        handle.set_high();
        assert!(pin.read().unwrap());
        handle.set_low();
        assert!(!pin.read().unwrap());
    }

    #[test]
    fn handle_observes_output_level() {
        let (mut pin, handle) = MockPin::new("gate-relay");

        pin.write(true).unwrap();
        assert!(handle.level());
        pin.write(false).unwrap();
        assert!(!handle.level());
    }

    #[test]
    fn fault_injection_affects_reads_and_writes() {
        let (mut pin, handle) = MockPin::new("ir-motion");

        handle.set_failing(true);
        assert!(pin.read().is_err());
        assert!(pin.write(true).is_err());

        handle.set_failing(false);
        assert!(pin.read().is_ok());
    }
}
