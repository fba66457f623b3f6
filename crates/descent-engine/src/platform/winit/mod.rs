//! Native windows through winit, drawn with wgpu.
//!
//! The engine owns its loop, so winit is driven with `pump_app_events`
//! instead of `run_app`. Windows are created from inside the pump, the only
//! place winit hands out an `ActiveEventLoop`.

mod keymap;

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use winit::application::ApplicationHandler;
use winit::dpi::{LogicalSize, PhysicalPosition};
use winit::error::OsError;
use winit::event::{Ime, MouseScrollDelta, StartCause, WindowEvent};
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::platform::pump_events::{EventLoopExtPumpEvents, PumpStatus};
use winit::window::{Fullscreen, Window, WindowAttributes, WindowId as WinitWindowId};

use crate::device::WgpuContext;
use crate::error::ContextCreationError;
use crate::event::NativeEvent;
use crate::input::ScrollDelta;
use crate::window::{WindowConfig, WindowId};

use super::{GraphicsBackend, MonitorInfo, NativeWindow, WindowSystem};
use keymap::{map_key, map_modifiers, map_mouse_button, map_state};

/// Pumps allowed for a requested window to show up.
const CREATE_PUMP_LIMIT: usize = 64;

struct Route {
    window: WindowId,
    scale_factor: f64,
    events: Vec<NativeEvent>,
}

type Routes = Rc<RefCell<HashMap<WinitWindowId, Route>>>;

/// winit-backed [`WindowSystem`]. One per process; winit refuses a second
/// event loop.
pub struct WinitSystem {
    event_loop: EventLoop<()>,
    routes: Routes,
    resumed: bool,
    clipboard: Option<arboard::Clipboard>,
}

impl WinitSystem {
    pub fn new() -> anyhow::Result<Self> {
        let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
        Ok(Self {
            event_loop,
            routes: Routes::default(),
            resumed: false,
            clipboard: None,
        })
    }

    fn pump(&mut self, timeout: Duration) {
        let routes = self.routes.clone();
        let mut resumed = self.resumed;
        let mut pump = Pump {
            routes: &routes,
            resumed: &mut resumed,
            request: None,
            created: None,
        };
        if let PumpStatus::Exit(code) = self.event_loop.pump_app_events(Some(timeout), &mut pump) {
            log::warn!("winit event loop exited with {code}");
        }
        self.resumed = resumed;
    }

    /// Opened on first use; some sessions have no clipboard at all.
    fn clipboard(&mut self) -> Option<&mut arboard::Clipboard> {
        if self.clipboard.is_none() {
            match arboard::Clipboard::new() {
                Ok(clipboard) => self.clipboard = Some(clipboard),
                Err(e) => {
                    log::warn!("clipboard unavailable: {e}");
                    return None;
                }
            }
        }
        self.clipboard.as_mut()
    }
}

impl WindowSystem for WinitSystem {
    fn name(&self) -> &'static str {
        "winit"
    }

    fn create_window(
        &mut self,
        id: WindowId,
        config: &WindowConfig,
    ) -> Result<Box<dyn NativeWindow>, ContextCreationError> {
        let (w, h) = config.size;
        let mut attrs = Window::default_attributes()
            .with_title(config.title.clone())
            .with_inner_size(LogicalSize::new(f64::from(w), f64::from(h)))
            .with_resizable(config.resizable)
            .with_visible(config.visible);
        if config.fullscreen {
            attrs = attrs.with_fullscreen(Some(Fullscreen::Borderless(None)));
        }

        let routes = self.routes.clone();
        let mut resumed = self.resumed;
        let mut pump = Pump {
            routes: &routes,
            resumed: &mut resumed,
            request: Some((id, attrs)),
            created: None,
        };

        let mut created = None;
        for _ in 0..CREATE_PUMP_LIMIT {
            let status = self
                .event_loop
                .pump_app_events(Some(Duration::ZERO), &mut pump);
            if let Some(result) = pump.created.take() {
                created = Some(result);
                break;
            }
            if let PumpStatus::Exit(code) = status {
                return Err(ContextCreationError::native(
                    config.request(),
                    format!("event loop exited ({code}) before the window was created"),
                ));
            }
        }
        self.resumed = resumed;

        let window = match created {
            Some(Ok(window)) => Arc::new(window),
            Some(Err(e)) => {
                return Err(ContextCreationError::native(
                    config.request(),
                    format!("failed to create window: {e}"),
                ));
            }
            None => {
                return Err(ContextCreationError::native(
                    config.request(),
                    format!("no window after {CREATE_PUMP_LIMIT} event loop pumps"),
                ));
            }
        };

        log::debug!("winit window {:?} mapped to {id}", window.id());
        Ok(Box::new(WinitWindow {
            winit_id: window.id(),
            window,
            routes,
        }))
    }

    fn pump_events(&mut self) {
        self.pump(Duration::ZERO);
    }

    fn wait_events(&mut self, timeout: Duration) {
        self.pump(timeout);
    }

    fn clipboard_text(&mut self) -> Option<String> {
        match self.clipboard()?.get_text() {
            Ok(text) => Some(text),
            Err(arboard::Error::ContentNotAvailable) => None,
            Err(e) => {
                log::warn!("clipboard read failed: {e}");
                None
            }
        }
    }

    fn set_clipboard_text(&mut self, text: &str) -> bool {
        let Some(clipboard) = self.clipboard() else {
            return false;
        };
        match clipboard.set_text(text) {
            Ok(()) => true,
            Err(e) => {
                log::warn!("clipboard write failed: {e}");
                false
            }
        }
    }
}

struct Pump<'a> {
    routes: &'a Routes,
    resumed: &'a mut bool,
    request: Option<(WindowId, WindowAttributes)>,
    created: Option<Result<Window, OsError>>,
}

impl Pump<'_> {
    fn try_create(&mut self, event_loop: &ActiveEventLoop) {
        if !*self.resumed {
            return;
        }
        let Some((id, attrs)) = self.request.take() else {
            return;
        };
        let result = event_loop.create_window(attrs);
        if let Ok(window) = &result {
            // Routed before the window's first event can arrive.
            self.routes.borrow_mut().insert(
                window.id(),
                Route {
                    window: id,
                    scale_factor: window.scale_factor(),
                    events: Vec::new(),
                },
            );
        }
        self.created = Some(result);
    }
}

impl ApplicationHandler for Pump<'_> {
    fn new_events(&mut self, event_loop: &ActiveEventLoop, _cause: StartCause) {
        self.try_create(event_loop);
    }

    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        *self.resumed = true;
        self.try_create(event_loop);
    }

    fn window_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        window_id: WinitWindowId,
        event: WindowEvent,
    ) {
        let mut routes = self.routes.borrow_mut();
        match routes.get_mut(&window_id) {
            Some(route) => translate(route, event),
            None => log::trace!("event for unrouted window {window_id:?}"),
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        self.try_create(event_loop);
    }
}

fn to_logical(route: &Route, pos: PhysicalPosition<f64>) -> (f32, f32) {
    let logical = pos.to_logical::<f64>(route.scale_factor);
    (logical.x as f32, logical.y as f32)
}

/// Queues the engine-side events for one winit window event.
fn translate(route: &mut Route, event: WindowEvent) {
    let native = match event {
        WindowEvent::KeyboardInput { event, .. } => {
            let (key, scancode) = map_key(event.physical_key);
            NativeEvent::Key {
                key,
                scancode,
                state: map_state(event.state),
                repeat: event.repeat,
                text: event.text.map(|t| t.to_string()),
            }
        }
        WindowEvent::ModifiersChanged(m) => NativeEvent::ModifiersChanged(map_modifiers(m.state())),
        WindowEvent::Ime(Ime::Commit(text)) if !text.is_empty() => NativeEvent::Text(text),
        WindowEvent::CursorMoved { position, .. } => {
            let (x, y) = to_logical(route, position);
            NativeEvent::CursorMoved { x, y }
        }
        WindowEvent::CursorEntered { .. } => NativeEvent::CursorEntered,
        WindowEvent::CursorLeft { .. } => NativeEvent::CursorLeft,
        WindowEvent::MouseInput { state, button, .. } => NativeEvent::MouseButton {
            button: map_mouse_button(button),
            state: map_state(state),
        },
        WindowEvent::MouseWheel { delta, .. } => NativeEvent::Scroll(match delta {
            MouseScrollDelta::LineDelta(x, y) => ScrollDelta::Line { x, y },
            MouseScrollDelta::PixelDelta(p) => {
                let (x, y) = to_logical(route, p);
                ScrollDelta::Pixel { x, y }
            }
        }),
        WindowEvent::Resized(size) => {
            route.events.push(NativeEvent::FramebufferResized {
                width: size.width,
                height: size.height,
            });
            let logical = size.to_logical::<f64>(route.scale_factor);
            NativeEvent::Resized {
                width: logical.width.round() as u32,
                height: logical.height.round() as u32,
            }
        }
        WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
            // The matching Resized follows.
            route.scale_factor = scale_factor;
            return;
        }
        WindowEvent::Moved(pos) => NativeEvent::Moved { x: pos.x, y: pos.y },
        WindowEvent::Focused(focused) => NativeEvent::Focused(focused),
        WindowEvent::Occluded(occluded) => NativeEvent::Minimized(occluded),
        WindowEvent::RedrawRequested => NativeEvent::RefreshRequested,
        WindowEvent::CloseRequested => NativeEvent::CloseRequested,
        _ => return,
    };
    route.events.push(native);
}

struct WinitWindow {
    winit_id: WinitWindowId,
    window: Arc<Window>,
    routes: Routes,
}

impl NativeWindow for WinitWindow {
    fn create_context(
        &mut self,
        config: &WindowConfig,
    ) -> Result<Box<dyn GraphicsBackend>, ContextCreationError> {
        let context = WgpuContext::new(self.window.clone(), config)?;
        Ok(Box::new(context))
    }

    fn drain_events(&mut self, out: &mut Vec<NativeEvent>) {
        if let Some(route) = self.routes.borrow_mut().get_mut(&self.winit_id) {
            out.append(&mut route.events);
        }
    }

    fn set_title(&mut self, title: &str) {
        self.window.set_title(title);
    }

    fn set_visible(&mut self, visible: bool) {
        self.window.set_visible(visible);
    }

    fn set_minimized(&mut self, minimized: bool) {
        self.window.set_minimized(minimized);
    }

    fn set_size(&mut self, width: u32, height: u32) {
        let requested = LogicalSize::new(f64::from(width), f64::from(height));
        // Some platforms apply the size at once and never send Resized.
        if let Some(applied) = self.window.request_inner_size(requested) {
            if let Some(route) = self.routes.borrow_mut().get_mut(&self.winit_id) {
                translate(route, WindowEvent::Resized(applied));
            }
        }
    }

    fn position(&self) -> Option<(i32, i32)> {
        self.window.outer_position().ok().map(|p| (p.x, p.y))
    }

    fn monitor(&self) -> Option<MonitorInfo> {
        let monitor = self.window.current_monitor()?;
        let position = monitor.position();
        let size = monitor.size();
        Some(MonitorInfo {
            name: monitor.name(),
            position: (position.x, position.y),
            size: (size.width, size.height),
            scale_factor: monitor.scale_factor(),
        })
    }

    fn framebuffer_size(&self) -> (u32, u32) {
        let size = self.window.inner_size();
        (size.width, size.height)
    }

    fn scale_factor(&self) -> f64 {
        self.window.scale_factor()
    }

    fn pre_present(&self) {
        self.window.pre_present_notify();
    }
}

impl Drop for WinitWindow {
    fn drop(&mut self) {
        if let Some(route) = self.routes.borrow_mut().remove(&self.winit_id) {
            log::debug!("winit window {:?} ({}) closed", self.winit_id, route.window);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use winit::dpi::PhysicalSize;

    fn route(scale_factor: f64) -> Route {
        Route {
            window: WindowId::from_raw(1),
            scale_factor,
            events: Vec::new(),
        }
    }

    #[test]
    fn resize_reports_physical_then_logical() {
        let mut r = route(2.0);
        translate(&mut r, WindowEvent::Resized(PhysicalSize::new(1600, 1200)));
        assert_eq!(
            r.events,
            vec![
                NativeEvent::FramebufferResized { width: 1600, height: 1200 },
                NativeEvent::Resized { width: 800, height: 600 },
            ]
        );
    }

    #[test]
    fn lifecycle_events_translate() {
        let mut r = route(1.0);
        translate(&mut r, WindowEvent::Occluded(true));
        translate(&mut r, WindowEvent::RedrawRequested);
        translate(&mut r, WindowEvent::CloseRequested);
        translate(&mut r, WindowEvent::Moved(PhysicalPosition::new(-5, 10)));
        translate(&mut r, WindowEvent::Destroyed);
        assert_eq!(
            r.events,
            vec![
                NativeEvent::Minimized(true),
                NativeEvent::RefreshRequested,
                NativeEvent::CloseRequested,
                NativeEvent::Moved { x: -5, y: 10 },
            ]
        );
    }
}
