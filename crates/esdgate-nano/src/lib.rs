//! Serial link to the dedicated ESD test-hardware controller.
//!
//! The controller speaks a newline-delimited ASCII protocol at a fixed baud
//! rate: it announces itself with a `Connected` banner, then streams foot
//! status lines (`LP,RF` and friends) while a test runs. Commands going the
//! other way are short fire-and-forget ASCII writes (`T`, `E`,
//! `O,<seconds>`) with no acknowledgment.
//!
//! [`NanoLink`] owns the connection: a background reader assembles inbound
//! lines character by character and publishes link state and foot state
//! over watch channels, while the writer side exposes the command methods.
//! A link that never completes its handshake stays non-functional and all
//! commands become no-ops; construct a new link to retry.

pub mod error;
pub mod link;
pub mod protocol;

pub use error::{LinkError, Result};
pub use link::{LinkState, NanoLink};
