use crate::input::{Key, KeyState, Modifiers, MouseButton, ScrollDelta};

use super::types::GamepadEvent;

/// Platform event as queued by a window backend, before normalization.
///
/// Cursor positions are absolute, in logical pixels; keyboard events may
/// carry the text they produce.
#[derive(Debug, Clone, PartialEq)]
pub enum NativeEvent {
    Key {
        key: Key,
        scancode: u32,
        state: KeyState,
        repeat: bool,
        text: Option<String>,
    },
    ModifiersChanged(Modifiers),
    /// Committed text not tied to a key event (IME).
    Text(String),
    CursorMoved {
        x: f32,
        y: f32,
    },
    CursorEntered,
    CursorLeft,
    MouseButton {
        button: MouseButton,
        state: KeyState,
    },
    Scroll(ScrollDelta),
    Resized {
        width: u32,
        height: u32,
    },
    FramebufferResized {
        width: u32,
        height: u32,
    },
    Moved {
        x: i32,
        y: i32,
    },
    Focused(bool),
    Minimized(bool),
    RefreshRequested,
    CloseRequested,
    Gamepad(GamepadEvent),
}
