//! Station controller for the unattended ESD gate kiosk.
//!
//! This crate ties the whole station together: the
//! [`StationStateMachine`](machine::StationStateMachine) owns the mode and
//! the active session and decides every transition; the
//! [`Station`](runtime::Station) runtime drives it from one cooperative
//! control loop that polls sensors on a fixed tick, runs network work on
//! spawned tasks, and feeds camera frames through the face-match batcher.
//!
//! The excluded GUI layer consumes only the
//! [`StationView`](machine::StationView) snapshot (current mode, operator
//! message, session, foot state and rendering hints) and feeds back raw
//! badge input and camera frames.

pub mod config;
pub mod input;
pub mod machine;
pub mod runtime;

pub use config::StationConfig;
pub use input::spawn_badge_reader;
pub use machine::{StationAction, StationEvent, StationStateMachine, StationView};
pub use runtime::{Station, StationHandle};
