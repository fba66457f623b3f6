//! Input vocabulary and per-window input state.
//!
//! Public API is platform-agnostic and does not expose winit types.
//! Platform backends translate their events into these.

mod state;
mod types;

pub use state::InputState;
pub use types::{Key, KeyState, Modifiers, MouseButton, ScrollDelta};
