//! Wait planning for frame pacing.
//!
//! Everything here is a pure function of durations, so the pacing policy is
//! testable without a clock.

use std::time::Duration;

/// How the synchronizer should wait out the rest of a frame.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct WaitPlan {
    /// Coarse sleep to perform first.
    pub sleep: Duration,
    /// Elapsed-since-frame-start to busy-wait up to after sleeping.
    pub deadline: Duration,
}

impl WaitPlan {
    pub const NONE: WaitPlan = WaitPlan {
        sleep: Duration::ZERO,
        deadline: Duration::ZERO,
    };

    pub fn is_none(&self) -> bool {
        self.deadline.is_zero()
    }
}

/// Target interval for a rate, `None` when pacing is disabled.
pub fn interval_for(target_hz: f64) -> Option<Duration> {
    if !target_hz.is_finite() || target_hz <= 0.0 {
        return None;
    }
    Duration::try_from_secs_f64(1.0 / target_hz)
        .ok()
        .filter(|d| !d.is_zero())
}

/// Frame budget after drift correction, clamped to `[0, 2 * interval]`.
pub fn budget(interval: Duration, drift_ns: i64) -> Duration {
    let interval_ns = nanos(interval);
    let b = interval_ns
        .saturating_sub(drift_ns)
        .clamp(0, interval_ns.saturating_mul(2));
    Duration::from_nanos(b as u64)
}

/// Folds one measured frame into the drift. Clamped to one interval so a
/// long stall never turns into a burst of zero-length frames.
pub fn accumulate_drift(drift_ns: i64, actual: Duration, interval: Duration) -> i64 {
    let interval_ns = nanos(interval);
    drift_ns
        .saturating_add(nanos(actual))
        .saturating_sub(interval_ns)
        .clamp(-interval_ns, interval_ns)
}

/// Plans the wait for a frame that has run for `elapsed` so far.
///
/// Sleeps for the remaining budget minus `spin_window`, then busy-waits up
/// to the budget. Frames already over budget do not wait.
pub fn plan_wait(
    elapsed: Duration,
    interval: Duration,
    drift_ns: i64,
    spin_window: Duration,
) -> WaitPlan {
    let deadline = budget(interval, drift_ns);
    if elapsed >= deadline {
        return WaitPlan::NONE;
    }

    let remaining = deadline - elapsed;
    WaitPlan {
        sleep: remaining.saturating_sub(spin_window),
        deadline,
    }
}

fn nanos(d: Duration) -> i64 {
    i64::try_from(d.as_nanos()).unwrap_or(i64::MAX)
}
