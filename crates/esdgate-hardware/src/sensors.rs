//! Sensor polling and gate relay control.
//!
//! The [`SensorPoller`] owns the station's three digital inputs (IR motion,
//! left/right foot light sensors) and has exclusive write control of the
//! gate relay. The control loop calls [`SensorPoller::close_gate_if_due`]
//! on every tick regardless of mode, so the gate can never remain open past
//! its timeout even if the controlling mode changes abruptly.

use esdgate_core::Timer;
use esdgate_core::constants::GATE_TIMEOUT;
use esdgate_core::types::FootState;
use tracing::{debug, warn};

use crate::traits::{DigitalInput, DigitalOutput};

/// Debounced reader of the station's sensors and owner of the gate relay.
pub struct SensorPoller<M, L, R, G> {
    motion: M,
    left: L,
    right: R,
    gate: G,
    gate_timer: Timer,
    gate_open: bool,
}

impl<M, L, R, G> SensorPoller<M, L, R, G>
where
    M: DigitalInput,
    L: DigitalInput,
    R: DigitalInput,
    G: DigitalOutput,
{
    /// Build a poller over the given pins. The gate starts closed.
    pub fn new(motion: M, left: L, right: R, gate: G) -> Self {
        Self {
            motion,
            left,
            right,
            gate,
            gate_timer: Timer::new(GATE_TIMEOUT),
            gate_open: false,
        }
    }

    /// True when the IR sensor reports presence.
    ///
    /// A read fault is logged and reported as "no motion".
    pub fn poll_motion(&mut self) -> bool {
        match self.motion.read() {
            Ok(active) => active,
            Err(error) => {
                warn!(%error, "motion sensor read failed");
                false
            }
        }
    }

    /// Sample both foot sensors.
    ///
    /// The light sensors report "light detected" as logic 0, so the exposed
    /// contact flag is the negation of the raw level. A read fault is
    /// logged and reported as "no contact".
    pub fn poll_feet(&mut self) -> FootState {
        let left = match self.left.read() {
            Ok(raw) => !raw,
            Err(error) => {
                warn!(%error, "left foot sensor read failed");
                false
            }
        };
        let right = match self.right.read() {
            Ok(raw) => !raw,
            Err(error) => {
                warn!(%error, "right foot sensor read failed");
                false
            }
        };
        FootState::contact(left, right)
    }

    /// Energize the gate relay and arm the auto-close timer.
    ///
    /// The timer is armed even if the relay write fails, so a later
    /// [`close_gate_if_due`](Self::close_gate_if_due) still drives the pin
    /// low.
    pub fn open_gate(&mut self) {
        self.gate_timer.reset();
        self.gate_open = true;
        match self.gate.write(true) {
            Ok(()) => debug!("gate opened"),
            Err(error) => warn!(%error, "gate relay write failed on open"),
        }
    }

    /// Release the relay if the gate is open and its timer has elapsed.
    ///
    /// Idempotent: once closed, further calls are no-ops. On a relay write
    /// fault the gate stays marked open and the next tick retries.
    pub fn close_gate_if_due(&mut self) {
        if !(self.gate_open && self.gate_timer.is_timeout()) {
            return;
        }
        match self.gate.write(false) {
            Ok(()) => {
                self.gate_open = false;
                debug!("gate closed");
            }
            Err(error) => warn!(%error, "gate relay write failed on close; retrying next tick"),
        }
    }

    /// Whether the gate relay is currently energized.
    #[must_use]
    pub fn is_gate_open(&self) -> bool {
        self.gate_open
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockPin;
    use esdgate_core::constants::GATE_TIMEOUT;
    use std::time::Duration;
    use tokio::time::advance;

    fn poller() -> (
        SensorPoller<MockPin, MockPin, MockPin, MockPin>,
        crate::mock::MockPinHandle,
        crate::mock::MockPinHandle,
        crate::mock::MockPinHandle,
        crate::mock::MockPinHandle,
    ) {
        let (motion, motion_h) = MockPin::new("ir-motion");
        let (left, left_h) = MockPin::new("foot-left");
        let (right, right_h) = MockPin::new("foot-right");
        let (gate, gate_h) = MockPin::new("gate-relay");
        // resting state: light reaches both sensors, nobody standing
        left_h.set_high();
        right_h.set_high();
        (
            SensorPoller::new(motion, left, right, gate),
            motion_h,
            left_h,
            right_h,
            gate_h,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn feet_are_the_negation_of_the_light_level() {
        let (mut poller, _, left_h, right_h, _) = poller();

        assert_eq!(poller.poll_feet(), FootState::contact(false, false));

        left_h.set_low();
        assert_eq!(poller.poll_feet(), FootState::contact(true, false));

        right_h.set_low();
        assert_eq!(poller.poll_feet(), FootState::contact(true, true));
    }

    #[tokio::test(start_paused = true)]
    async fn gate_closes_exactly_at_timeout_never_earlier() {
        let (mut poller, _, _, _, gate_h) = poller();

        poller.open_gate();
        assert!(poller.is_gate_open());
        assert!(gate_h.level());

        advance(GATE_TIMEOUT - Duration::from_millis(1)).await;
        poller.close_gate_if_due();
        assert!(poller.is_gate_open());
        assert!(gate_h.level());

        advance(Duration::from_millis(1)).await;
        poller.close_gate_if_due();
        assert!(!poller.is_gate_open());
        assert!(!gate_h.level());
    }

    #[tokio::test(start_paused = true)]
    async fn close_gate_if_due_is_idempotent() {
        let (mut poller, _, _, _, gate_h) = poller();

        poller.open_gate();
        advance(GATE_TIMEOUT).await;
        poller.close_gate_if_due();
        assert!(!poller.is_gate_open());

        // repeated calls after closing are no-ops
        poller.close_gate_if_due();
        poller.close_gate_if_due();
        assert!(!poller.is_gate_open());
        assert!(!gate_h.level());
    }

    #[tokio::test(start_paused = true)]
    async fn reopening_rearms_the_timer() {
        let (mut poller, _, _, _, _) = poller();

        poller.open_gate();
        advance(GATE_TIMEOUT - Duration::from_secs(1)).await;
        poller.open_gate();

        advance(Duration::from_secs(1)).await;
        poller.close_gate_if_due();
        assert!(poller.is_gate_open());

        advance(GATE_TIMEOUT - Duration::from_secs(1)).await;
        poller.close_gate_if_due();
        assert!(!poller.is_gate_open());
    }

    #[tokio::test(start_paused = true)]
    async fn sensor_faults_degrade_to_no_signal() {
        let (mut poller, motion_h, left_h, _, _) = poller();

        motion_h.set_high();
        assert!(poller.poll_motion());

        motion_h.set_failing(true);
        assert!(!poller.poll_motion());

        left_h.set_low();
        left_h.set_failing(true);
        let feet = poller.poll_feet();
        assert_eq!(feet.left, Some(false));
        assert_eq!(feet.right, Some(false));

        // the poller keeps working once the fault clears
        motion_h.set_failing(false);
        assert!(poller.poll_motion());
    }

    #[tokio::test(start_paused = true)]
    async fn relay_fault_on_close_retries_next_tick() {
        let (mut poller, _, _, _, gate_h) = poller();

        poller.open_gate();
        advance(GATE_TIMEOUT).await;

        gate_h.set_failing(true);
        poller.close_gate_if_due();
        assert!(poller.is_gate_open());

        gate_h.set_failing(false);
        poller.close_gate_if_due();
        assert!(!poller.is_gate_open());
        assert!(!gate_h.level());
    }
}
