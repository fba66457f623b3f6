//! In-process platform with no OS window, GPU or display.
//!
//! Events are injected through [`HeadlessController`], which also exposes
//! what the engine did to the fake native objects (created/destroyed
//! handles, presented frames) so lifecycle behavior can be asserted.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;
use std::time::Duration;

use crate::error::ContextCreationError;
use crate::event::NativeEvent;
use crate::paint::Color;
use crate::render::ResolvedDraw;
use crate::resource::{GpuResourceDescriptor, NativeHandle};
use crate::window::{WindowConfig, WindowId};

use super::{
    FrameStatus, GraphicsBackend, GraphicsCapabilities, MonitorInfo, NativeWindow, WindowSystem,
};

const DEFAULT_CAPABILITIES: GraphicsCapabilities = GraphicsCapabilities {
    max_samples: 4,
    vsync: true,
    max_texture_size: 8192,
};

#[derive(Debug, Default)]
struct WindowRecord {
    events: Vec<NativeEvent>,
    title: String,
    visible: bool,
    minimized: bool,
    size: (u32, u32),
    position: (i32, i32),
    surface: (u32, u32),
    vsync: bool,
    open: bool,
    clear: Option<Color>,
}

#[derive(Debug)]
struct Shared {
    capabilities: GraphicsCapabilities,
    fail_window: Option<String>,
    fail_resource: Option<String>,
    windows: HashMap<WindowId, WindowRecord>,
    next_handle: u64,
    live: HashSet<NativeHandle>,
    destroyed: HashMap<NativeHandle, u32>,
    frames_presented: u64,
    draw_calls: u64,
    pumps: u64,
    waits: Vec<Duration>,
    monitor: Option<MonitorInfo>,
    clipboard: Option<String>,
}

impl Default for Shared {
    fn default() -> Self {
        Self {
            capabilities: DEFAULT_CAPABILITIES,
            fail_window: None,
            fail_resource: None,
            windows: HashMap::new(),
            next_handle: 0,
            live: HashSet::new(),
            destroyed: HashMap::new(),
            frames_presented: 0,
            draw_calls: 0,
            pumps: 0,
            waits: Vec::new(),
            monitor: Some(MonitorInfo {
                name: Some("headless".to_string()),
                position: (0, 0),
                size: (1920, 1080),
                scale_factor: 1.0,
            }),
            clipboard: None,
        }
    }
}

type SharedRef = Rc<RefCell<Shared>>;

/// Headless [`WindowSystem`].
#[derive(Debug)]
pub struct HeadlessSystem {
    shared: SharedRef,
}

/// Script and inspect a [`HeadlessSystem`] from the outside.
#[derive(Debug, Clone)]
pub struct HeadlessController {
    shared: SharedRef,
}

impl HeadlessSystem {
    pub fn new() -> (Self, HeadlessController) {
        let shared = SharedRef::default();
        (
            Self {
                shared: shared.clone(),
            },
            HeadlessController { shared },
        )
    }
}

impl WindowSystem for HeadlessSystem {
    fn name(&self) -> &'static str {
        "headless"
    }

    fn create_window(
        &mut self,
        id: WindowId,
        config: &WindowConfig,
    ) -> Result<Box<dyn NativeWindow>, ContextCreationError> {
        let mut shared = self.shared.borrow_mut();
        if let Some(reason) = shared.fail_window.take() {
            return Err(ContextCreationError::native(config.request(), reason));
        }
        shared.windows.insert(
            id,
            WindowRecord {
                title: config.title.clone(),
                visible: config.visible,
                size: config.size,
                surface: config.size,
                vsync: config.vsync_enabled,
                open: true,
                ..WindowRecord::default()
            },
        );
        Ok(Box::new(HeadlessWindow {
            id,
            shared: self.shared.clone(),
        }))
    }

    fn pump_events(&mut self) {
        self.shared.borrow_mut().pumps += 1;
    }

    /// Never sleeps; the requested timeout is recorded for inspection.
    fn wait_events(&mut self, timeout: Duration) {
        let mut shared = self.shared.borrow_mut();
        shared.pumps += 1;
        shared.waits.push(timeout);
    }

    fn clipboard_text(&mut self) -> Option<String> {
        self.shared.borrow().clipboard.clone()
    }

    fn set_clipboard_text(&mut self, text: &str) -> bool {
        self.shared.borrow_mut().clipboard = Some(text.to_string());
        true
    }
}

struct HeadlessWindow {
    id: WindowId,
    shared: SharedRef,
}

impl HeadlessWindow {
    fn with_record<R>(&self, f: impl FnOnce(&mut WindowRecord) -> R) -> Option<R> {
        self.shared.borrow_mut().windows.get_mut(&self.id).map(f)
    }
}

impl NativeWindow for HeadlessWindow {
    fn create_context(
        &mut self,
        _config: &WindowConfig,
    ) -> Result<Box<dyn GraphicsBackend>, ContextCreationError> {
        let capabilities = self.shared.borrow().capabilities;
        Ok(Box::new(HeadlessBackend {
            window: self.id,
            shared: self.shared.clone(),
            capabilities,
            frame: None,
        }))
    }

    fn drain_events(&mut self, out: &mut Vec<NativeEvent>) {
        self.with_record(|w| out.append(&mut w.events));
    }

    fn set_title(&mut self, title: &str) {
        self.with_record(|w| w.title = title.to_string());
    }

    fn set_visible(&mut self, visible: bool) {
        self.with_record(|w| w.visible = visible);
    }

    fn set_minimized(&mut self, minimized: bool) {
        self.with_record(|w| {
            if w.minimized != minimized {
                w.minimized = minimized;
                w.events.push(NativeEvent::Minimized(minimized));
            }
        });
    }

    /// Applies immediately at a scale factor of 1.
    fn set_size(&mut self, width: u32, height: u32) {
        self.with_record(|w| {
            w.size = (width, height);
            w.events.push(NativeEvent::FramebufferResized { width, height });
            w.events.push(NativeEvent::Resized { width, height });
        });
    }

    fn position(&self) -> Option<(i32, i32)> {
        self.with_record(|w| w.position)
    }

    fn monitor(&self) -> Option<MonitorInfo> {
        self.shared.borrow().monitor.clone()
    }

    fn framebuffer_size(&self) -> (u32, u32) {
        self.with_record(|w| w.surface).unwrap_or((0, 0))
    }

    fn scale_factor(&self) -> f64 {
        1.0
    }
}

impl Drop for HeadlessWindow {
    fn drop(&mut self) {
        self.with_record(|w| {
            w.open = false;
            w.events.clear();
        });
    }
}

struct HeadlessBackend {
    window: WindowId,
    shared: SharedRef,
    capabilities: GraphicsCapabilities,
    frame: Option<FrameStatus>,
}

impl GraphicsBackend for HeadlessBackend {
    fn capabilities(&self) -> GraphicsCapabilities {
        self.capabilities
    }

    fn make_current(&mut self) -> Result<(), String> {
        Ok(())
    }

    fn set_vsync(&mut self, enabled: bool) -> Result<(), String> {
        if enabled && !self.capabilities.vsync {
            return Err("vsync not supported".to_string());
        }
        let window = self.window;
        if let Some(w) = self.shared.borrow_mut().windows.get_mut(&window) {
            w.vsync = enabled;
        }
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) {
        let window = self.window;
        if let Some(w) = self.shared.borrow_mut().windows.get_mut(&window) {
            w.surface = (width, height);
        }
    }

    fn create_resource(&mut self, _desc: &GpuResourceDescriptor) -> Result<NativeHandle, String> {
        let mut shared = self.shared.borrow_mut();
        if let Some(diagnostic) = shared.fail_resource.take() {
            return Err(diagnostic);
        }
        shared.next_handle += 1;
        let handle = NativeHandle(shared.next_handle);
        shared.live.insert(handle);
        Ok(handle)
    }

    fn destroy_resource(&mut self, handle: NativeHandle) {
        let mut shared = self.shared.borrow_mut();
        shared.live.remove(&handle);
        *shared.destroyed.entry(handle).or_default() += 1;
    }

    fn begin_frame(&mut self, clear: Color) -> Result<FrameStatus, String> {
        let window = self.window;
        let mut shared = self.shared.borrow_mut();
        let status = match shared.windows.get_mut(&window) {
            Some(w) if w.surface.0 > 0 && w.surface.1 > 0 => {
                w.clear = Some(clear);
                FrameStatus::Ready
            }
            _ => FrameStatus::Skipped,
        };
        self.frame = Some(status);
        Ok(status)
    }

    fn draw(&mut self, _draw: &ResolvedDraw) -> Result<(), String> {
        match self.frame {
            Some(FrameStatus::Ready) => {
                self.shared.borrow_mut().draw_calls += 1;
                Ok(())
            }
            Some(FrameStatus::Skipped) => Ok(()),
            None => Err("draw outside of a frame".to_string()),
        }
    }

    fn swap_buffers(&mut self) -> Result<(), String> {
        if self.frame.take() == Some(FrameStatus::Ready) {
            self.shared.borrow_mut().frames_presented += 1;
        }
        Ok(())
    }
}

impl HeadlessController {
    /// Queues a native event as if the OS had produced it for `window`.
    /// Ignored for windows that are gone.
    pub fn push_event(&self, window: WindowId, event: NativeEvent) {
        if let Some(w) = self.shared.borrow_mut().windows.get_mut(&window) {
            if w.open {
                w.events.push(event);
            }
        }
    }

    /// Capabilities reported by contexts created from now on.
    pub fn set_capabilities(&self, capabilities: GraphicsCapabilities) {
        self.shared.borrow_mut().capabilities = capabilities;
    }

    /// Makes the next window creation fail with `reason`.
    pub fn fail_window_creation(&self, reason: impl Into<String>) {
        self.shared.borrow_mut().fail_window = Some(reason.into());
    }

    /// Makes the next native resource creation fail with `diagnostic`.
    pub fn fail_next_resource(&self, diagnostic: impl Into<String>) {
        self.shared.borrow_mut().fail_resource = Some(diagnostic.into());
    }

    /// How many times the native object was destroyed.
    pub fn destroy_count(&self, handle: NativeHandle) -> u32 {
        self.shared
            .borrow()
            .destroyed
            .get(&handle)
            .copied()
            .unwrap_or(0)
    }

    pub fn live_resources(&self) -> usize {
        self.shared.borrow().live.len()
    }

    pub fn frames_presented(&self) -> u64 {
        self.shared.borrow().frames_presented
    }

    pub fn draw_calls(&self) -> u64 {
        self.shared.borrow().draw_calls
    }

    pub fn pumps(&self) -> u64 {
        self.shared.borrow().pumps
    }

    /// Timeouts passed to every `wait_events` call so far.
    pub fn waits(&self) -> Vec<Duration> {
        self.shared.borrow().waits.clone()
    }

    /// Monitor reported for every window; `None` simulates a platform that
    /// cannot tell.
    pub fn set_monitor(&self, monitor: Option<MonitorInfo>) {
        self.shared.borrow_mut().monitor = monitor;
    }

    pub fn clipboard(&self) -> Option<String> {
        self.shared.borrow().clipboard.clone()
    }

    /// Puts `text` on the clipboard as if another program had copied it.
    pub fn set_clipboard(&self, text: impl Into<String>) {
        self.shared.borrow_mut().clipboard = Some(text.into());
    }

    /// Moves the window as if the user had dragged it.
    pub fn move_window(&self, window: WindowId, x: i32, y: i32) {
        if let Some(w) = self.shared.borrow_mut().windows.get_mut(&window) {
            if w.open {
                w.position = (x, y);
                w.events.push(NativeEvent::Moved { x, y });
            }
        }
    }

    pub fn is_minimized(&self, window: WindowId) -> Option<bool> {
        self.shared.borrow().windows.get(&window).map(|w| w.minimized)
    }

    /// Last client-area size requested for `window`, in logical pixels.
    pub fn window_size(&self, window: WindowId) -> Option<(u32, u32)> {
        self.shared.borrow().windows.get(&window).map(|w| w.size)
    }

    pub fn title(&self, window: WindowId) -> Option<String> {
        self.shared
            .borrow()
            .windows
            .get(&window)
            .map(|w| w.title.clone())
    }

    pub fn is_visible(&self, window: WindowId) -> Option<bool> {
        self.shared.borrow().windows.get(&window).map(|w| w.visible)
    }

    pub fn is_open(&self, window: WindowId) -> bool {
        self.shared
            .borrow()
            .windows
            .get(&window)
            .is_some_and(|w| w.open)
    }

    pub fn surface_size(&self, window: WindowId) -> Option<(u32, u32)> {
        self.shared.borrow().windows.get(&window).map(|w| w.surface)
    }

    pub fn vsync(&self, window: WindowId) -> Option<bool> {
        self.shared.borrow().windows.get(&window).map(|w| w.vsync)
    }

    /// Clear color of the last frame begun on `window`.
    pub fn last_clear(&self, window: WindowId) -> Option<Color> {
        self.shared.borrow().windows.get(&window).and_then(|w| w.clear)
    }
}
