//! Backend protocol for the ESD gate station.
//!
//! The station talks to one HTTP backend for three things: exchanging a
//! username for a verified identity, relaying camera frames to the face
//! classifier, and reporting test results. This crate defines the
//! [`StationBackend`] seam, its production [`HttpBackend`] implementation,
//! and the two clients built on top of it: [`AuthClient`] and
//! [`ResultRecorder`].
//!
//! Every call is bounded by the per-request timeout and has a defined
//! fallback: authentication fails open on transport errors, result saves
//! fall back to a local append-only file, and face-match failures merely
//! rank last in their flush window (see `esdgate-face`). No network error
//! is ever fatal to the station.

pub mod auth;
pub mod backend;
pub mod error;
pub mod mock;
pub mod recorder;

pub use auth::{AuthClient, AuthOutcome};
pub use backend::{AuthReply, FaceReply, HttpBackend, StationBackend};
pub use error::{NetError, Result};
pub use recorder::ResultRecorder;
