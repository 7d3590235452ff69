//! Wire protocol spoken by the test-hardware controller.
//!
//! Inbound lines:
//! - a line containing the literal token `Connected` completes the
//!   handshake;
//! - `L?,R?` where `?` is `P` (contact) or `F` (no contact) reports the
//!   foot sensors, e.g. `LP,RF`;
//! - anything else means "no valid contact reported".
//!
//! Outbound commands are plain ASCII with no terminator; the controller
//! parses them independently of its status stream.

use esdgate_core::types::FootState;

/// Handshake token announced by the controller after power-up.
pub const HANDSHAKE_TOKEN: &str = "Connected";

/// Begin an ESD test.
pub const CMD_BEGIN_TEST: &str = "T";

/// End the running ESD test.
pub const CMD_END_TEST: &str = "E";

/// Command asking the controller to hold the gate open for `seconds`.
#[must_use]
pub fn gate_command(seconds: u64) -> String {
    format!("O,{seconds}")
}

/// Decoded inbound line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineEvent {
    /// Handshake banner; the link is now connected.
    Handshake,

    /// Foot status report.
    Status(FootState),

    /// Anything else; feet are treated as "no valid contact reported".
    Unrecognized,
}

/// Decode one inbound line (without its terminator).
///
/// The status pattern is anchored at the start of the line; trailing bytes
/// are ignored, matching the controller's occasionally chatty firmware.
#[must_use]
pub fn parse_line(line: &str) -> LineEvent {
    if line.contains(HANDSHAKE_TOKEN) {
        return LineEvent::Handshake;
    }

    let bytes = line.as_bytes();
    if bytes.len() >= 5 && bytes[0] == b'L' && bytes[2] == b',' && bytes[3] == b'R' {
        return LineEvent::Status(FootState::contact(bytes[1] == b'P', bytes[4] == b'P'));
    }

    LineEvent::Unrecognized
}
