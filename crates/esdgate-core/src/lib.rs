//! Shared types, timing primitives and constants for the ESD gate station.

pub mod constants;
pub mod error;
pub mod timer;
pub mod types;

pub use error::{Error, Result};
pub use timer::Timer;
pub use types::*;

/// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
