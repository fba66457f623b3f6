use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Time source used for frame pacing.
pub trait Clock {
    fn now(&self) -> Instant;

    /// Coarse, OS-level sleep. May overshoot.
    fn sleep(&self, duration: Duration);

    /// One busy-wait step.
    fn spin(&self) {
        std::hint::spin_loop();
    }
}

/// Wall clock backed by `Instant::now` and `thread::sleep`.
#[derive(Debug, Copy, Clone, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }

    fn spin(&self) {
        std::thread::yield_now();
    }
}

/// Deterministic clock that only moves when told to.
///
/// Sleeping advances it by the requested duration plus a configurable
/// oversleep; each spin advances it by a fixed step. Clones share the same
/// time, so a test can keep one and hand another to a synchronizer.
#[derive(Debug, Clone)]
pub struct ManualClock {
    inner: Rc<ManualInner>,
}

#[derive(Debug)]
struct ManualInner {
    base: Instant,
    offset: Cell<Duration>,
    oversleep: Cell<Duration>,
    spin_step: Duration,
    sleeps: Cell<u32>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::with_spin_step(Duration::from_micros(10))
    }

    pub fn with_spin_step(spin_step: Duration) -> Self {
        Self {
            inner: Rc::new(ManualInner {
                base: Instant::now(),
                offset: Cell::new(Duration::ZERO),
                oversleep: Cell::new(Duration::ZERO),
                spin_step: spin_step.max(Duration::from_nanos(1)),
                sleeps: Cell::new(0),
            }),
        }
    }

    /// Extra time added to every sleep, like a real scheduler would.
    pub fn set_oversleep(&self, oversleep: Duration) {
        self.inner.oversleep.set(oversleep);
    }

    pub fn advance(&self, by: Duration) {
        let inner = &self.inner;
        inner.offset.set(inner.offset.get() + by);
    }

    /// Time advanced since creation.
    pub fn elapsed(&self) -> Duration {
        self.inner.offset.get()
    }

    pub fn sleep_calls(&self) -> u32 {
        self.inner.sleeps.get()
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.inner.base + self.inner.offset.get()
    }

    fn sleep(&self, duration: Duration) {
        self.inner.sleeps.set(self.inner.sleeps.get() + 1);
        self.advance(duration + self.inner.oversleep.get());
    }

    fn spin(&self) {
        self.advance(self.inner.spin_step);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_time() {
        let a = ManualClock::new();
        let b = a.clone();
        a.advance(Duration::from_millis(5));
        assert_eq!(b.elapsed(), Duration::from_millis(5));
        assert_eq!(a.now(), b.now());
    }

    #[test]
    fn sleep_applies_oversleep() {
        let clock = ManualClock::new();
        clock.set_oversleep(Duration::from_micros(300));
        clock.sleep(Duration::from_millis(1));
        assert_eq!(clock.elapsed(), Duration::from_micros(1300));
        assert_eq!(clock.sleep_calls(), 1);
    }
}
