use std::collections::HashSet;

use crate::event::{CursorEvent, Event, WindowEvent};

use super::types::{Key, KeyState, Modifiers, MouseButton};

/// Current input state for a single window, kept up to date by the event
/// dispatcher before listeners see each event.
#[derive(Debug, Default, Clone)]
pub struct InputState {
    pub modifiers: Modifiers,
    pub focused: bool,
    /// Pointer position in logical pixels, `None` while outside the window.
    pub pointer: Option<(f32, f32)>,
    keys_down: HashSet<Key>,
    buttons_down: HashSet<MouseButton>,
}

impl InputState {
    pub(crate) fn apply(&mut self, ev: &Event) {
        match ev {
            Event::Key(k) => {
                self.modifiers = k.modifiers;
                match k.state {
                    KeyState::Pressed => {
                        self.keys_down.insert(k.key);
                    }
                    KeyState::Released => {
                        self.keys_down.remove(&k.key);
                    }
                }
            }
            Event::MouseMove(m) => self.pointer = Some((m.x, m.y)),
            Event::MouseButton(b) => {
                self.modifiers = b.modifiers;
                match b.state {
                    KeyState::Pressed => {
                        self.buttons_down.insert(b.button);
                    }
                    KeyState::Released => {
                        self.buttons_down.remove(&b.button);
                    }
                }
            }
            Event::Scroll(s) => self.modifiers = s.modifiers,
            Event::Cursor(CursorEvent::Left) => self.pointer = None,
            Event::Window(WindowEvent::Focused(focused)) => {
                self.focused = *focused;
                if !*focused {
                    // Releases can be lost while unfocused; avoid stuck keys.
                    self.keys_down.clear();
                    self.buttons_down.clear();
                }
            }
            _ => {}
        }
    }

    pub fn key_down(&self, key: Key) -> bool {
        self.keys_down.contains(&key)
    }

    pub fn button_down(&self, button: MouseButton) -> bool {
        self.buttons_down.contains(&button)
    }

    pub fn keys_down(&self) -> impl Iterator<Item = Key> + '_ {
        self.keys_down.iter().copied()
    }
}
