use std::time::{Duration, Instant};

use super::pacing;

/// Frame timing snapshot handed to the update callback.
#[derive(Debug, Copy, Clone)]
pub struct FrameTime {
    /// Time elapsed since the previous frame start, in seconds (clamped).
    pub dt: f32,

    /// Monotonic timestamp taken at frame start.
    pub now: Instant,

    /// Monotonic frame counter.
    pub frame_index: u64,
}

/// Timing state of one render loop.
///
/// Only the frame synchronizer mutates it; everything else reads.
///
/// Delta time is clamped to avoid pathological values when the application
/// is paused by the debugger, minimized, or stalls. Drift is the signed sum
/// of (measured interval - target interval), clamped to one interval.
#[derive(Debug, Clone)]
pub struct FrameClock {
    frame_start: Option<Instant>,
    interval: Option<Duration>,
    drift_ns: i64,
    frame_index: u64,
    dt_min: Duration,
    dt_max: Duration,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::with_clamps(Duration::from_micros(100), Duration::from_millis(250))
    }

    /// Creates a clock with custom delta-time clamps.
    pub fn with_clamps(dt_min: Duration, dt_max: Duration) -> Self {
        debug_assert!(dt_min <= dt_max);
        Self {
            frame_start: None,
            interval: None,
            drift_ns: 0,
            frame_index: 0,
            dt_min,
            dt_max,
        }
    }

    pub fn frame_start(&self) -> Option<Instant> {
        self.frame_start
    }

    /// Target interval, `None` while pacing is disabled.
    pub fn interval(&self) -> Option<Duration> {
        self.interval
    }

    /// Accumulated lateness in nanoseconds; positive means behind schedule.
    pub fn drift_nanos(&self) -> i64 {
        self.drift_ns
    }

    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// Forgets the previous frame start and drift.
    ///
    /// Useful after a surface reconfigure or when resuming from suspension.
    pub fn reset(&mut self) {
        self.frame_start = None;
        self.drift_ns = 0;
    }

    /// Records a frame start and folds the measured begin-to-begin interval
    /// into the drift.
    pub(crate) fn start_frame(&mut self, now: Instant) -> FrameTime {
        let measured = self
            .frame_start
            .map(|prev| now.saturating_duration_since(prev));

        if let (Some(actual), Some(interval)) = (measured, self.interval) {
            self.drift_ns = pacing::accumulate_drift(self.drift_ns, actual, interval);
        }
        self.frame_start = Some(now);

        let dt = measured
            .unwrap_or(Duration::ZERO)
            .clamp(self.dt_min, self.dt_max);

        let ft = FrameTime {
            dt: dt.as_secs_f32(),
            now,
            frame_index: self.frame_index,
        };
        self.frame_index = self.frame_index.wrapping_add(1);
        ft
    }

    /// Changing the target invalidates the drift measured against the old one.
    pub(crate) fn set_interval(&mut self, interval: Option<Duration>) {
        if self.interval != interval {
            self.interval = interval;
            self.drift_ns = 0;
        }
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_frame_uses_minimum_dt() {
        let mut clock = FrameClock::new();
        let ft = clock.start_frame(Instant::now());
        assert_eq!(ft.frame_index, 0);
        assert!((ft.dt - 0.0001).abs() < 1e-6);
    }

    #[test]
    fn dt_is_clamped_after_a_stall() {
        let mut clock = FrameClock::new();
        let t0 = Instant::now();
        clock.start_frame(t0);
        let ft = clock.start_frame(t0 + Duration::from_secs(3));
        assert_eq!(ft.frame_index, 1);
        assert!((ft.dt - 0.25).abs() < 1e-6);
    }

    #[test]
    fn drift_accumulates_only_with_a_target() {
        let mut clock = FrameClock::new();
        let t0 = Instant::now();
        clock.start_frame(t0);
        clock.start_frame(t0 + Duration::from_millis(20));
        assert_eq!(clock.drift_nanos(), 0);

        clock.set_interval(Some(Duration::from_millis(10)));
        clock.start_frame(t0 + Duration::from_millis(32));
        assert_eq!(clock.drift_nanos(), 2_000_000);
    }

    #[test]
    fn changing_target_resets_drift() {
        let mut clock = FrameClock::new();
        clock.set_interval(Some(Duration::from_millis(10)));
        let t0 = Instant::now();
        clock.start_frame(t0);
        clock.start_frame(t0 + Duration::from_millis(15));
        assert_ne!(clock.drift_nanos(), 0);

        clock.set_interval(Some(Duration::from_millis(20)));
        assert_eq!(clock.drift_nanos(), 0);
    }
}
