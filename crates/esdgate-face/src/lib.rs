//! Face-match request batching for the ESD gate station.
//!
//! Camera frames arrive much faster than the classifier can answer. The
//! [`FaceMatchBatcher`] turns that stream into one authoritative decision
//! per flush window without saturating the network: frames are admitted
//! through a throttle, sent as concurrent non-blocking requests, and the
//! accumulated responses are ranked by a deterministic tie-break when the
//! window flushes.

pub mod batcher;

pub use batcher::{FaceMatchBatcher, FlushOutcome};
