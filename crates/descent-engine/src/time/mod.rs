//! Frame timing.
//!
//! - `FrameClock`: per-loop timing state (frame start, drift, target interval)
//! - `pacing`: the pure wait-planning math
//! - `FrameSynchronizer`: sleeps/spins to hold a target rate, over a `Clock`
//!
//! Clocks are injectable so pacing can be tested without real sleeping.

mod clock;
mod frame_clock;
pub mod pacing;
mod sync;

pub use clock::{Clock, ManualClock, SystemClock};
pub use frame_clock::{FrameClock, FrameTime};
pub use sync::{DEFAULT_SPIN_WINDOW, FrameSynchronizer};
