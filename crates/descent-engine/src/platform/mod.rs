//! Seams between the engine core and the native layer.
//!
//! `WindowSystem` creates windows and pumps the OS event loop,
//! `NativeWindow` buffers a window's events and creates its graphics
//! context, `GraphicsBackend` owns that context's GPU objects. The winit +
//! wgpu implementation lives in [`winit`] and [`crate::device`]; [`headless`]
//! is a scriptable stand-in used by tests and offscreen runs.

use std::fmt;
use std::time::Duration;

use crate::error::{ContextCreationError, GraphicsRequest};
use crate::event::NativeEvent;
use crate::paint::Color;
use crate::render::ResolvedDraw;
use crate::resource::{GpuResourceDescriptor, NativeHandle};
use crate::window::{WindowConfig, WindowId};

pub mod headless;
pub mod winit;

/// What a graphics context can do. Reported on context creation and used
/// to validate requests and descriptors.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct GraphicsCapabilities {
    pub max_samples: u32,
    pub vsync: bool,
    pub max_texture_size: u32,
}

impl GraphicsCapabilities {
    /// Nothing known yet (no adapter was found).
    pub const NONE: Self = Self {
        max_samples: 0,
        vsync: false,
        max_texture_size: 0,
    };
}

impl fmt::Display for GraphicsCapabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "max_samples={}, vsync={}, max_texture_size={}",
            self.max_samples,
            if self.vsync { "on" } else { "off" },
            self.max_texture_size
        )
    }
}

/// Rejects a request the context cannot honor.
pub fn check_capabilities(
    request: GraphicsRequest,
    caps: GraphicsCapabilities,
) -> Result<(), ContextCreationError> {
    let reason = if request.samples == 0 || !request.samples.is_power_of_two() {
        Some(format!("sample count {} is not a power of two", request.samples))
    } else if request.samples > caps.max_samples {
        Some(format!("{}x multisampling not supported", request.samples))
    } else if request.vsync && !caps.vsync {
        Some("vsync not supported by the presentation engine".to_string())
    } else {
        None
    };

    match reason {
        None => Ok(()),
        Some(reason) => Err(ContextCreationError {
            requested: request,
            available: caps,
            reason,
        }),
    }
}

/// The display a window currently sits on.
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorInfo {
    pub name: Option<String>,
    /// Top-left corner in the desktop's physical coordinates.
    pub position: (i32, i32),
    /// Resolution in physical pixels.
    pub size: (u32, u32),
    pub scale_factor: f64,
}

/// Outcome of starting a frame.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum FrameStatus {
    Ready,
    /// Nothing can be presented this iteration (surface timeout, zero size).
    Skipped,
}

pub trait WindowSystem {
    fn name(&self) -> &'static str;

    fn create_window(
        &mut self,
        id: WindowId,
        config: &WindowConfig,
    ) -> Result<Box<dyn NativeWindow>, ContextCreationError>;

    /// Moves pending OS events into the per-window queues without blocking.
    fn pump_events(&mut self);

    /// Like `pump_events`, but sleeps until the OS has something or
    /// `timeout` elapses.
    fn wait_events(&mut self, timeout: Duration);

    fn clipboard_text(&mut self) -> Option<String>;
    fn set_clipboard_text(&mut self, text: &str) -> bool;
}

pub trait NativeWindow {
    fn create_context(
        &mut self,
        config: &WindowConfig,
    ) -> Result<Box<dyn GraphicsBackend>, ContextCreationError>;

    /// Appends buffered events in the order the OS produced them.
    fn drain_events(&mut self, out: &mut Vec<NativeEvent>);

    fn set_title(&mut self, title: &str);
    fn set_visible(&mut self, visible: bool);
    fn set_minimized(&mut self, minimized: bool);

    /// Requests a client-area size in logical pixels. The platform reports
    /// the applied size through resize events.
    fn set_size(&mut self, width: u32, height: u32);

    /// Outer top-left corner in desktop coordinates, when the platform
    /// exposes it.
    fn position(&self) -> Option<(i32, i32)>;
    fn monitor(&self) -> Option<MonitorInfo>;

    /// Drawable size in physical pixels.
    fn framebuffer_size(&self) -> (u32, u32);
    fn scale_factor(&self) -> f64;

    /// Called right before the context presents.
    fn pre_present(&self) {}
}

/// One graphics context. Errors are native diagnostics; the window manager
/// wraps them into typed errors.
pub trait GraphicsBackend {
    fn capabilities(&self) -> GraphicsCapabilities;

    fn make_current(&mut self) -> Result<(), String>;
    fn set_vsync(&mut self, enabled: bool) -> Result<(), String>;
    fn resize(&mut self, width: u32, height: u32);

    fn create_resource(&mut self, desc: &GpuResourceDescriptor) -> Result<NativeHandle, String>;
    fn destroy_resource(&mut self, handle: NativeHandle);

    fn begin_frame(&mut self, clear: Color) -> Result<FrameStatus, String>;
    fn draw(&mut self, draw: &ResolvedDraw) -> Result<(), String>;
    /// Presents the frame. A skipped frame presents nothing.
    fn swap_buffers(&mut self) -> Result<(), String>;
}
