//! Digital I/O abstraction for the ESD gate station.
//!
//! This crate provides trait-based abstractions for the station's GPIO
//! peripherals (IR motion sensor, two foot light sensors, the gate relay)
//! and the [`SensorPoller`] that owns them. The traits enable substitution
//! between mock pins (for development and testing) and real pin drivers.
//!
//! # Design Philosophy
//!
//! - **Non-blocking**: pin reads and writes return immediately; the control
//!   loop polls them on a fixed cadence.
//! - **Fault-tolerant**: an I/O fault on a sensor degrades to "no signal"
//!   and is logged; it never propagates out of the poller. A faulty sensor
//!   must never crash the control loop.
//! - **Exclusive relay ownership**: the gate relay is written only by the
//!   [`SensorPoller`], which enforces the gate timeout on every tick.

pub mod error;
pub mod mock;
pub mod sensors;
pub mod traits;

pub use error::{HardwareError, Result};
pub use mock::{MockPin, MockPinHandle};
pub use sensors::SensorPoller;
pub use traits::{DigitalInput, DigitalOutput};
