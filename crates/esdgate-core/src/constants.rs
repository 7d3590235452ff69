//! Timing budgets, wire constants and operator messages for the station.
//!
//! Every timeout that shapes the control flow lives here so the state
//! machine, the sensor poller and the network components stay in agreement.
//! Changing these values changes safety-relevant behavior (most notably
//! [`GATE_TIMEOUT`]); review the station flow before touching them.

use std::time::Duration;

// ============================================================================
// Control loop cadence
// ============================================================================

/// Fast cadence of the cooperative control loop.
///
/// Sensor polling, gate timeout enforcement and state machine ticks all run
/// at this interval. The gate can therefore never stay open more than one
/// tick past its timeout, regardless of the active mode.
pub const TICK_INTERVAL: Duration = Duration::from_millis(10);

// ============================================================================
// Network budgets
// ============================================================================

/// Per-request budget for every backend call (authenticate, face, save).
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(1);

/// Face match flush window: in-flight requests are gathered and ranked at
/// most this often.
pub const FLUSH_INTERVAL: Duration = Duration::from_millis(100);

/// Upper bound on waiting for a whole flush group. Requests still pending
/// when this expires are abandoned, not cancelled.
pub const FLUSH_GROUP_CEILING: Duration = Duration::from_secs(10);

/// Admit every Nth camera frame while requests are already in flight.
pub const FRAME_THROTTLE: u32 = 2;

// ============================================================================
// Station timing
// ============================================================================

/// How long the gate relay stays energized after a passed test.
pub const GATE_TIMEOUT: Duration = Duration::from_secs(7);

/// Budget for one face recognition attempt before falling back to the
/// barcode scanner.
pub const RECOGNIZE_TIMEOUT: Duration = Duration::from_secs(3);

/// Camera keepalive: the camera hint turns off after this long without a
/// face-bearing response.
pub const CAMERA_TIMEOUT: Duration = Duration::from_secs(300);

/// Holdoff before the camera may be woken again after closing.
pub const CAMERA_REOPEN_HOLDOFF: Duration = Duration::from_secs(1);

/// Overall budget for one ESD test. A failed outcome is recorded when this
/// expires, not earlier.
pub const ESD_TEST_TIMEOUT: Duration = Duration::from_secs(7);

/// Both feet must stay in contact this long, measured from the first moment
/// of double contact, before a pass is recorded.
pub const CONTACT_HOLD: Duration = Duration::from_secs(1);

/// Result message display time before the station refreshes to BarcodeScan.
pub const REFRESH_DELAY: Duration = Duration::from_secs(3);

/// Display time for the unauthorized message.
pub const UNAUTHORIZED_DELAY: Duration = Duration::from_secs(1);

// ============================================================================
// Serial test controller
// ============================================================================

/// Fixed baud rate of the ESD test-hardware controller.
pub const NANO_BAUD_RATE: u32 = 9600;

/// How long to wait for the controller's handshake banner after opening the
/// port. A silent controller leaves the link non-functional.
pub const NANO_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(2);

// ============================================================================
// Operator messages (the deployed station speaks Vietnamese)
// ============================================================================

/// Greeting shown while waiting for a badge scan.
pub const MSG_WELCOME: &str = "Chào mừng bạn đến với Spartronics VN!";

/// Shown while the station idles between users.
pub const MSG_IDLE: &str = "Chúc bạn một ngày làm việc vui vẻ!";

/// Shown while a face recognition attempt is running.
pub const MSG_RECOGNIZING: &str = "Đang nhận diện...";

/// Shown after a passed test while the gate is open.
pub const MSG_TEST_PASSED: &str = "Chúc bạn một ngày làm việc vui vẻ! ^_^";

/// Shown after a failed test.
pub const MSG_TEST_FAILED: &str = "Test thất bại! Mời bạn thử lại lần nữa!";

/// Shown when recognition timed out and the user should scan a badge.
pub const MSG_SCAN_CODE: &str = "Mời bạn quét mã số";

/// Shown when the camera could not be opened.
pub const MSG_CAMERA_FAILED: &str = "<Camera Failed>";
