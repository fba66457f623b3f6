use bitflags::bitflags;

use crate::input::{Key, KeyState, Modifiers, MouseButton, ScrollDelta};

/// Raw key transition, by physical key.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct KeyEvent {
    pub key: Key,
    /// Platform scancode, stable for a given physical key.
    pub scancode: u32,
    pub state: KeyState,
    /// True for auto-repeat presses.
    pub repeat: bool,
    pub modifiers: Modifiers,
}

/// One character of committed text input.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CharEvent {
    pub ch: char,
    pub modifiers: Modifiers,
}

/// Pointer position in logical pixels plus the delta from the previous
/// position. The delta is zero for the first move after entering.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct MouseMoveEvent {
    pub x: f32,
    pub y: f32,
    pub dx: f32,
    pub dy: f32,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct MouseButtonEvent {
    pub button: MouseButton,
    pub state: KeyState,
    pub x: f32,
    pub y: f32,
    pub modifiers: Modifiers,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ScrollEvent {
    pub delta: ScrollDelta,
    pub modifiers: Modifiers,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum CursorEvent {
    Entered,
    Left,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum WindowEvent {
    /// Window size in logical pixels.
    Resized { width: u32, height: u32 },
    /// Drawable size in physical pixels.
    FramebufferResized { width: u32, height: u32 },
    /// Outer position in physical pixels.
    Moved { x: i32, y: i32 },
    Focused(bool),
    /// The window was minimized or fully occluded (`true`), or shown again.
    Minimized(bool),
    /// Contents must be redrawn, e.g. after being uncovered.
    RefreshRequested,
    /// Surfaced once per window.
    CloseRequested,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct GamepadEvent {
    pub gamepad: u32,
    pub kind: GamepadEventKind,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum GamepadEventKind {
    Connected,
    Disconnected,
    Button { button: u8, state: KeyState },
    /// Axis value in `[-1, 1]`.
    Axis { axis: u8, value: f32 },
}

/// Typed application event.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Event {
    Key(KeyEvent),
    Character(CharEvent),
    MouseMove(MouseMoveEvent),
    MouseButton(MouseButtonEvent),
    Scroll(ScrollEvent),
    Cursor(CursorEvent),
    Window(WindowEvent),
    Gamepad(GamepadEvent),
}

bitflags! {
    /// Categories used to route events to listeners.
    #[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
    pub struct EventCategories: u16 {
        const KEY = 1 << 0;
        const CHARACTER = 1 << 1;
        const MOUSE_MOVE = 1 << 2;
        const MOUSE_BUTTON = 1 << 3;
        const SCROLL = 1 << 4;
        const CURSOR = 1 << 5;
        const WINDOW = 1 << 6;
        const GAMEPAD = 1 << 7;

        const KEYBOARD = Self::KEY.bits() | Self::CHARACTER.bits();
        const MOUSE = Self::MOUSE_MOVE.bits()
            | Self::MOUSE_BUTTON.bits()
            | Self::SCROLL.bits()
            | Self::CURSOR.bits();
    }
}

impl Event {
    /// The single category this event belongs to.
    pub fn category(&self) -> EventCategories {
        match self {
            Event::Key(_) => EventCategories::KEY,
            Event::Character(_) => EventCategories::CHARACTER,
            Event::MouseMove(_) => EventCategories::MOUSE_MOVE,
            Event::MouseButton(_) => EventCategories::MOUSE_BUTTON,
            Event::Scroll(_) => EventCategories::SCROLL,
            Event::Cursor(_) => EventCategories::CURSOR,
            Event::Window(_) => EventCategories::WINDOW,
            Event::Gamepad(_) => EventCategories::GAMEPAD,
        }
    }
}
