use std::time::Duration;

use super::clock::{Clock, SystemClock};
use super::frame_clock::{FrameClock, FrameTime};
use super::pacing;

/// Final stretch of each frame that is busy-waited instead of slept.
pub const DEFAULT_SPIN_WINDOW: Duration = Duration::from_millis(2);

/// Holds a render loop to a target frame rate.
///
/// `begin_frame` marks the frame start; `end_frame` waits until the
/// drift-corrected budget has elapsed. The measured begin-to-begin interval
/// feeds back into the next budget so the long-run average converges on
/// the target even when individual sleeps overshoot.
#[derive(Debug)]
pub struct FrameSynchronizer<C: Clock = SystemClock> {
    clock: C,
    frame: FrameClock,
    spin_window: Duration,
}

impl FrameSynchronizer<SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for FrameSynchronizer<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> FrameSynchronizer<C> {
    pub fn with_clock(clock: C) -> Self {
        Self {
            clock,
            frame: FrameClock::new(),
            spin_window: DEFAULT_SPIN_WINDOW,
        }
    }

    pub fn with_spin_window(mut self, spin_window: Duration) -> Self {
        self.spin_window = spin_window;
        self
    }

    pub fn frame_clock(&self) -> &FrameClock {
        &self.frame
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn begin_frame(&mut self) -> FrameTime {
        let now = self.clock.now();
        self.frame.start_frame(now)
    }

    /// Blocks until the frame budget for `target_hz` has elapsed.
    ///
    /// Returns the time spent waiting. Non-positive or non-finite rates
    /// disable pacing and return immediately.
    pub fn end_frame(&mut self, target_hz: f64) -> Duration {
        let interval = pacing::interval_for(target_hz);
        self.frame.set_interval(interval);

        let (Some(interval), Some(start)) = (interval, self.frame.frame_start()) else {
            return Duration::ZERO;
        };

        let entered = self.clock.now();
        let elapsed = entered.saturating_duration_since(start);
        let plan = pacing::plan_wait(elapsed, interval, self.frame.drift_nanos(), self.spin_window);
        if plan.is_none() {
            return Duration::ZERO;
        }

        if !plan.sleep.is_zero() {
            self.clock.sleep(plan.sleep);
        }
        // Deadline is at most two intervals past `start`.
        while self.clock.now().saturating_duration_since(start) < plan.deadline {
            self.clock.spin();
        }

        self.clock.now().saturating_duration_since(entered)
    }
}
