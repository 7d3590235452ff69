//! Monotonic interval/timeout primitive used by every station component.
//!
//! A [`Timer`] is a recorded instant plus a configured interval. It is used
//! both as a single-shot countdown (gate auto-close, test timeout) and as a
//! recurring cadence gate ("act at most every 100 ms" — check, act, reset).
//! All operations are non-blocking reads of monotonic time; timers share no
//! state with each other, so resetting one never affects another.
//!
//! The timer is built on [`tokio::time::Instant`] so tests running under
//! paused time (`#[tokio::test(start_paused = true)]`) control it
//! deterministically with `tokio::time::advance`.

use std::time::Duration;
use tokio::time::Instant;

/// Resettable countdown over monotonic time.
#[derive(Debug, Clone)]
pub struct Timer {
    started_at: Instant,
    interval: Duration,
}

impl Timer {
    /// Create a timer that times out `interval` after creation.
    ///
    /// A zero interval produces a timer that is immediately timed out,
    /// which is the idiom for "act on the first check".
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self {
            started_at: Instant::now(),
            interval,
        }
    }

    /// Restart the countdown from now. The interval is unchanged.
    pub fn reset(&mut self) {
        self.started_at = Instant::now();
    }

    /// Change the interval and restart the countdown.
    pub fn set_interval(&mut self, interval: Duration) {
        self.interval = interval;
        self.reset();
    }

    /// The configured interval.
    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Time elapsed since creation or the last reset.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Elapsed time in seconds, rounded to two decimals.
    ///
    /// This is the resolution test durations are reported at.
    #[must_use]
    pub fn elapsed_secs(&self) -> f64 {
        (self.elapsed().as_secs_f64() * 100.0).round() / 100.0
    }

    /// True iff the elapsed time has reached the configured interval.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        self.elapsed() >= self.interval
    }

    /// True iff the elapsed time has reached `interval`, ignoring the
    /// configured one. The configured interval is not modified.
    #[must_use]
    pub fn is_timeout_after(&self, interval: Duration) -> bool {
        self.elapsed() >= interval
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::advance;

    #[tokio::test(start_paused = true)]
    async fn times_out_exactly_at_interval_never_earlier() {
        let timer = Timer::new(Duration::from_secs(7));
        assert!(!timer.is_timeout());

        advance(Duration::from_millis(6999)).await;
        assert!(!timer.is_timeout());

        advance(Duration::from_millis(1)).await;
        assert!(timer.is_timeout());
    }

    #[tokio::test(start_paused = true)]
    async fn zero_interval_is_immediately_timed_out() {
        let timer = Timer::new(Duration::ZERO);
        assert!(timer.is_timeout());
    }

    #[tokio::test(start_paused = true)]
    async fn reset_restarts_the_countdown() {
        let mut timer = Timer::new(Duration::from_secs(1));
        advance(Duration::from_secs(2)).await;
        assert!(timer.is_timeout());

        timer.reset();
        assert!(!timer.is_timeout());
        advance(Duration::from_secs(1)).await;
        assert!(timer.is_timeout());
    }

    #[tokio::test(start_paused = true)]
    async fn set_interval_resets_the_origin() {
        let mut timer = Timer::new(Duration::from_secs(1));
        advance(Duration::from_millis(900)).await;

        timer.set_interval(Duration::from_secs(3));
        assert_eq!(timer.interval(), Duration::from_secs(3));
        advance(Duration::from_millis(2999)).await;
        assert!(!timer.is_timeout());
        advance(Duration::from_millis(1)).await;
        assert!(timer.is_timeout());
    }

    #[tokio::test(start_paused = true)]
    async fn override_does_not_mutate_the_interval() {
        let timer = Timer::new(Duration::from_secs(7));
        advance(Duration::from_secs(1)).await;

        assert!(timer.is_timeout_after(Duration::from_secs(1)));
        assert!(!timer.is_timeout());
        assert_eq!(timer.interval(), Duration::from_secs(7));
    }

    #[tokio::test(start_paused = true)]
    async fn elapsed_secs_rounds_to_two_decimals() {
        let timer = Timer::new(Duration::ZERO);
        advance(Duration::from_millis(6324)).await;
        assert_eq!(timer.elapsed_secs(), 6.32);
    }
}
