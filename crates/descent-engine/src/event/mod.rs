//! Event normalization and dispatch.
//!
//! Platform backends queue `NativeEvent`s per window. `EventDispatcher`
//! drains them, turns them into typed `Event`s and hands each one to every
//! listener registered for its category, in registration order.

mod dispatcher;
mod native;
mod types;

pub use dispatcher::{EventDispatcher, ListenerCtl, ListenerId};
pub use native::NativeEvent;
pub use types::{
    CharEvent, CursorEvent, Event, EventCategories, GamepadEvent, GamepadEventKind, KeyEvent,
    MouseButtonEvent, MouseMoveEvent, ScrollEvent, WindowEvent,
};
