//! Frame clock driving the tick loop.
//!
//! The clock owns the iteration counter and the frame period. Each pass of
//! the loop records a start instant, runs the tick body, then sleeps the
//! rest of the frame. A tick that overruns its frame sleeps zero and the
//! lost time is not made up.
//!
//! Timing uses [`tokio::time::Instant`] so tests can drive pacing with a
//! paused runtime clock.

use std::time::Duration;

use tokio::time::Instant;

/// Errors that can occur during clock operations.
#[derive(Debug, thiserror::Error)]
pub enum ClockError {
    /// Iteration counter would overflow.
    #[error("iteration counter overflow: cannot advance beyond u64::MAX")]
    IterationOverflow,

    /// The frame period is zero.
    #[error("invalid frame period: frame_ms must be at least 1")]
    ZeroFrame,
}

/// Iteration counter paired with a target frame period.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameClock {
    /// Current iteration (starts at 0, advanced after each successful tick).
    iteration: u64,

    /// Target minimum period between consecutive tick starts.
    frame: Duration,
}

impl FrameClock {
    /// Create a clock at iteration 0 with the given frame period in
    /// milliseconds.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::ZeroFrame`] if `frame_ms` is 0.
    pub const fn new(frame_ms: u64) -> Result<Self, ClockError> {
        if frame_ms == 0 {
            return Err(ClockError::ZeroFrame);
        }
        Ok(Self {
            iteration: 0,
            frame: Duration::from_millis(frame_ms),
        })
    }

    /// Return the current iteration number.
    pub const fn iteration(&self) -> u64 {
        self.iteration
    }

    /// Return the frame period.
    pub const fn frame(&self) -> Duration {
        self.frame
    }

    /// Advance to the next iteration. Returns the new iteration number.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::IterationOverflow`] if the counter would
    /// exceed `u64::MAX`.
    pub fn advance(&mut self) -> Result<u64, ClockError> {
        self.iteration = self
            .iteration
            .checked_add(1)
            .ok_or(ClockError::IterationOverflow)?;
        Ok(self.iteration)
    }

    /// Time left in the frame that started at `started`, or zero if the
    /// frame has already overrun.
    pub fn remaining(&self, started: Instant) -> Duration {
        self.frame.saturating_sub(started.elapsed())
    }

    /// Sleep out the rest of the frame that started at `started`.
    pub async fn pace(&self, started: Instant) {
        let remaining = self.remaining(started);
        if !remaining.is_zero() {
            tokio::time::sleep(remaining).await;
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn clock_starts_at_iteration_zero() {
        let clock = FrameClock::new(50).unwrap();
        assert_eq!(clock.iteration(), 0);
        assert_eq!(clock.frame(), Duration::from_millis(50));
    }

    #[test]
    fn clock_advances() {
        let mut clock = FrameClock::new(50).unwrap();
        assert_eq!(clock.advance().unwrap(), 1);
        assert_eq!(clock.advance().unwrap(), 2);
        assert_eq!(clock.iteration(), 2);
    }

    #[test]
    fn zero_frame_rejected() {
        assert!(matches!(FrameClock::new(0), Err(ClockError::ZeroFrame)));
    }

    #[tokio::test(start_paused = true)]
    async fn remaining_shrinks_with_elapsed_time() {
        let clock = FrameClock::new(100).unwrap();
        let started = Instant::now();
        tokio::time::advance(Duration::from_millis(30)).await;
        assert_eq!(clock.remaining(started), Duration::from_millis(70));
    }

    #[tokio::test(start_paused = true)]
    async fn overrun_frame_has_no_remaining_time() {
        let clock = FrameClock::new(100).unwrap();
        let started = Instant::now();
        tokio::time::advance(Duration::from_millis(250)).await;
        assert_eq!(clock.remaining(started), Duration::ZERO);

        // No catch-up: pacing an overrun frame returns immediately.
        let before = Instant::now();
        clock.pace(started).await;
        assert_eq!(before.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn pace_sleeps_out_the_frame() {
        let clock = FrameClock::new(100).unwrap();
        let started = Instant::now();
        tokio::time::advance(Duration::from_millis(40)).await;
        clock.pace(started).await;
        assert!(started.elapsed() >= Duration::from_millis(100));
    }
}
