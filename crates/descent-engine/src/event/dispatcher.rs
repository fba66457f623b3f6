use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use crate::error::WindowError;
use crate::input::{InputState, KeyState, Modifiers};
use crate::window::{WindowId, WindowManager};

use super::native::NativeEvent;
use super::types::{
    CharEvent, CursorEvent, Event, EventCategories, KeyEvent, MouseButtonEvent, MouseMoveEvent,
    ScrollEvent, WindowEvent,
};

/// Identifies a registered listener.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct ListenerId(u64);

type Callback = Box<dyn FnMut(&Event, &mut ListenerCtl<'_>)>;

struct Listener {
    id: ListenerId,
    categories: EventCategories,
    callback: Callback,
}

enum Change {
    Add(Listener),
    Remove(ListenerId),
}

/// Handed to listeners during dispatch.
///
/// Registrations made here are queued and take effect at the start of the
/// next dispatch cycle of the target window.
pub struct ListenerCtl<'a> {
    window: WindowId,
    input: &'a InputState,
    next_id: &'a mut u64,
    deferred: &'a mut Vec<(WindowId, Change)>,
}

impl ListenerCtl<'_> {
    /// Window whose events are being dispatched.
    pub fn window(&self) -> WindowId {
        self.window
    }

    /// Input state with the current event already applied.
    pub fn input(&self) -> &InputState {
        self.input
    }

    pub fn add_listener<F>(
        &mut self,
        window: WindowId,
        categories: EventCategories,
        callback: F,
    ) -> ListenerId
    where
        F: FnMut(&Event, &mut ListenerCtl<'_>) + 'static,
    {
        let id = next_listener_id(self.next_id);
        self.deferred.push((
            window,
            Change::Add(Listener {
                id,
                categories,
                callback: Box::new(callback),
            }),
        ));
        id
    }

    pub fn remove_listener(&mut self, window: WindowId, id: ListenerId) {
        self.deferred.push((window, Change::Remove(id)));
    }
}

fn next_listener_id(counter: &mut u64) -> ListenerId {
    *counter += 1;
    ListenerId(*counter)
}

/// Turns native events into typed events. Keeps the state needed for
/// relative cursor deltas and event modifiers.
#[derive(Debug, Default)]
struct Normalizer {
    cursor: Option<(f32, f32)>,
    modifiers: Modifiers,
}

impl Normalizer {
    fn normalize(&mut self, native: NativeEvent, out: &mut Vec<Event>) {
        let modifiers = self.modifiers;
        match native {
            NativeEvent::Key {
                key,
                scancode,
                state,
                repeat,
                text,
            } => {
                out.push(Event::Key(KeyEvent {
                    key,
                    scancode,
                    state,
                    repeat,
                    modifiers,
                }));
                if state == KeyState::Pressed {
                    if let Some(text) = text {
                        self.push_chars(&text, out);
                    }
                }
            }
            NativeEvent::ModifiersChanged(m) => self.modifiers = m,
            NativeEvent::Text(text) => self.push_chars(&text, out),
            NativeEvent::CursorMoved { x, y } => {
                let (dx, dy) = self
                    .cursor
                    .map_or((0.0, 0.0), |(px, py)| (x - px, y - py));
                self.cursor = Some((x, y));
                out.push(Event::MouseMove(MouseMoveEvent { x, y, dx, dy }));
            }
            NativeEvent::CursorEntered => out.push(Event::Cursor(CursorEvent::Entered)),
            NativeEvent::CursorLeft => {
                self.cursor = None;
                out.push(Event::Cursor(CursorEvent::Left));
            }
            NativeEvent::MouseButton { button, state } => {
                let (x, y) = self.cursor.unwrap_or((0.0, 0.0));
                out.push(Event::MouseButton(MouseButtonEvent {
                    button,
                    state,
                    x,
                    y,
                    modifiers,
                }));
            }
            NativeEvent::Scroll(delta) => {
                out.push(Event::Scroll(ScrollEvent { delta, modifiers }));
            }
            NativeEvent::Resized { width, height } => {
                out.push(Event::Window(WindowEvent::Resized { width, height }));
            }
            NativeEvent::FramebufferResized { width, height } => {
                out.push(Event::Window(WindowEvent::FramebufferResized { width, height }));
            }
            NativeEvent::Moved { x, y } => out.push(Event::Window(WindowEvent::Moved { x, y })),
            NativeEvent::Focused(focused) => {
                if !focused {
                    self.modifiers = Modifiers::default();
                }
                out.push(Event::Window(WindowEvent::Focused(focused)));
            }
            NativeEvent::Minimized(m) => out.push(Event::Window(WindowEvent::Minimized(m))),
            NativeEvent::RefreshRequested => out.push(Event::Window(WindowEvent::RefreshRequested)),
            NativeEvent::CloseRequested => out.push(Event::Window(WindowEvent::CloseRequested)),
            NativeEvent::Gamepad(g) => out.push(Event::Gamepad(g)),
        }
    }

    fn push_chars(&self, text: &str, out: &mut Vec<Event>) {
        out.extend(
            text.chars()
                .filter(|c| !c.is_control())
                .map(|ch| {
                    Event::Character(CharEvent {
                        ch,
                        modifiers: self.modifiers,
                    })
                }),
        );
    }
}

#[derive(Default)]
struct WindowSlot {
    listeners: Vec<Listener>,
    pending: Vec<Change>,
    input: InputState,
    normalizer: Normalizer,
}

impl WindowSlot {
    fn apply_pending(&mut self) {
        for change in self.pending.drain(..) {
            match change {
                Change::Add(listener) => self.listeners.push(listener),
                Change::Remove(id) => self.listeners.retain(|l| l.id != id),
            }
        }
    }
}

/// Per-window listener registry and dispatch loop.
///
/// Single-threaded: listeners run on the engine thread, in registration
/// order, once per event, in the order the platform produced the events.
/// Every matching listener sees every event; there is no propagation stop.
#[derive(Default)]
pub struct EventDispatcher {
    windows: HashMap<WindowId, WindowSlot>,
    next_id: u64,
    deferred: Vec<(WindowId, Change)>,
    native: Vec<NativeEvent>,
    events: Vec<Event>,
}

impl fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("windows", &self.windows.len())
            .finish_non_exhaustive()
    }
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `callback` for the given categories on `window`. Takes
    /// effect at the start of the window's next dispatch cycle.
    pub fn add_listener<F>(
        &mut self,
        window: WindowId,
        categories: EventCategories,
        callback: F,
    ) -> ListenerId
    where
        F: FnMut(&Event, &mut ListenerCtl<'_>) + 'static,
    {
        let id = next_listener_id(&mut self.next_id);
        self.slot(window).pending.push(Change::Add(Listener {
            id,
            categories,
            callback: Box::new(callback),
        }));
        id
    }

    /// Shorthand for listeners that never register others.
    pub fn on<F>(&mut self, window: WindowId, categories: EventCategories, mut callback: F) -> ListenerId
    where
        F: FnMut(&Event) + 'static,
    {
        self.add_listener(window, categories, move |ev, _| callback(ev))
    }

    pub fn remove_listener(&mut self, window: WindowId, id: ListenerId) {
        if let Some(slot) = self.windows.get_mut(&window) {
            slot.pending.push(Change::Remove(id));
        }
    }

    /// Listeners currently active for `window` (pending changes excluded).
    pub fn listener_count(&self, window: WindowId) -> usize {
        self.windows.get(&window).map_or(0, |s| s.listeners.len())
    }

    pub fn input(&self, window: WindowId) -> Option<&InputState> {
        self.windows.get(&window).map(|s| &s.input)
    }

    /// Forgets listeners and input state of a destroyed window.
    pub fn remove_window(&mut self, window: WindowId) {
        self.windows.remove(&window);
    }

    pub fn clear(&mut self) {
        self.windows.clear();
        self.deferred.clear();
    }

    /// Drains every buffered native event of `window` and dispatches it.
    ///
    /// Returns the number of events dispatched. Close requests are surfaced
    /// once; framebuffer resizes are applied to the window's surface before
    /// listeners run.
    pub fn poll_events(
        &mut self,
        windows: &mut WindowManager,
        window: WindowId,
    ) -> Result<usize, WindowError> {
        self.native.clear();
        windows.collect_native_events(window, &mut self.native)?;

        let slot = self.windows.entry(window).or_default();
        slot.apply_pending();

        self.events.clear();
        for native in self.native.drain(..) {
            slot.normalizer.normalize(native, &mut self.events);
        }

        let WindowSlot {
            listeners, input, ..
        } = slot;
        let mut dispatched = 0;
        for ev in self.events.drain(..) {
            match ev {
                Event::Window(WindowEvent::CloseRequested) => {
                    if !windows.mark_close_surfaced(window) {
                        continue;
                    }
                }
                Event::Window(WindowEvent::FramebufferResized { width, height }) => {
                    windows.resize_surface(window, width, height);
                }
                _ => {}
            }

            input.apply(&ev);
            let category = ev.category();
            let mut ctl = ListenerCtl {
                window,
                input,
                next_id: &mut self.next_id,
                deferred: &mut self.deferred,
            };
            for listener in listeners
                .iter_mut()
                .filter(|l| l.categories.contains(category))
            {
                (listener.callback)(&ev, &mut ctl);
            }
            dispatched += 1;
        }

        for (target, change) in self.deferred.drain(..) {
            match windows.state(target) {
                Some(state) if !state.is_destroyed() => {
                    self.windows.entry(target).or_default().pending.push(change);
                }
                _ => log::debug!("listener change for closed window {target} dropped"),
            }
        }

        if dispatched > 0 {
            log::trace!("dispatched {dispatched} event(s) for {window}");
        }
        Ok(dispatched)
    }

    /// Sleeps until the platform has events or `timeout` elapses, then
    /// dispatches whatever arrived for `window`.
    pub fn wait_events(
        &mut self,
        windows: &mut WindowManager,
        window: WindowId,
        timeout: Duration,
    ) -> Result<usize, WindowError> {
        if windows.state(window).is_some_and(|s| !s.is_destroyed()) {
            windows.wait_events(timeout);
        }
        self.poll_events(windows, window)
    }

    fn slot(&mut self, window: WindowId) -> &mut WindowSlot {
        self.windows.entry(window).or_default()
    }
}
