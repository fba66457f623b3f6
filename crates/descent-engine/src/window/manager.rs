use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::time::Duration;

use crate::error::{ContextCreationError, RenderError, ResourceError, WindowError};
use crate::event::NativeEvent;
use crate::platform::{
    check_capabilities, FrameStatus, GraphicsBackend, GraphicsCapabilities, MonitorInfo,
    NativeWindow, WindowSystem,
};
use crate::render::{DrawCommand, ResolvedDraw};
use crate::resource::{
    ContextId, GpuResource, GpuResourceDescriptor, ResourceInfo, ResourceKind, ResourceRegistry,
    ResourceState,
};

use super::config::WindowConfig;
use super::state::WindowState;

/// Identifies a window for its whole lifetime, including after destruction.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct WindowId(u64);

impl WindowId {
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

struct ManagedWindow {
    config: WindowConfig,
    state: WindowState,
    context: ContextId,
    capabilities: GraphicsCapabilities,
    // Field order is drop order: context before its window.
    backend: Option<Box<dyn GraphicsBackend>>,
    native: Option<Box<dyn NativeWindow>>,
    close_requested: bool,
    close_surfaced: bool,
    frame: Option<FrameStatus>,
}

impl ManagedWindow {
    fn backend_error(&self, id: WindowId, message: String) -> WindowError {
        WindowError::Backend {
            window: id,
            message,
        }
    }
}

/// Owns windows, their graphics contexts and every GPU resource.
///
/// Not `Send`: a context is current on the engine thread only.
pub struct WindowManager {
    system: Box<dyn WindowSystem>,
    windows: BTreeMap<WindowId, ManagedWindow>,
    contexts: HashMap<ContextId, WindowId>,
    registry: ResourceRegistry,
    next_window: u64,
    next_context: u64,
    current: Option<WindowId>,
}

impl fmt::Debug for WindowManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WindowManager")
            .field("system", &self.system.name())
            .field("windows", &self.windows.keys().collect::<Vec<_>>())
            .field("current", &self.current)
            .finish_non_exhaustive()
    }
}

impl WindowManager {
    pub fn new(system: Box<dyn WindowSystem>) -> Self {
        Self {
            system,
            windows: BTreeMap::new(),
            contexts: HashMap::new(),
            registry: ResourceRegistry::new(),
            next_window: 0,
            next_context: 0,
            current: None,
        }
    }

    pub fn system_name(&self) -> &'static str {
        self.system.name()
    }

    /// Creates a native window and its graphics context.
    ///
    /// Fails without retrying when the context cannot honor the configured
    /// sample count or vsync. Nothing is left behind on failure.
    pub fn create(&mut self, config: &WindowConfig) -> Result<WindowId, ContextCreationError> {
        self.next_window += 1;
        let id = WindowId(self.next_window);

        let mut native = self.system.create_window(id, config).inspect_err(|e| {
            log::error!("window {id}: {e}");
        })?;
        let backend = native.create_context(config).inspect_err(|e| {
            log::error!("window {id}: {e}");
        })?;

        let capabilities = backend.capabilities();
        if let Err(e) = check_capabilities(config.request(), capabilities) {
            log::error!("window {id}: {e}");
            drop(backend);
            drop(native);
            return Err(e);
        }

        self.next_context += 1;
        let context = ContextId::from_raw(self.next_context);
        self.contexts.insert(context, id);

        let mut state = WindowState::Uninitialized;
        state.advance(WindowState::Created);
        self.windows.insert(
            id,
            ManagedWindow {
                config: config.clone(),
                state,
                context,
                capabilities,
                backend: Some(backend),
                native: Some(native),
                close_requested: false,
                close_surfaced: false,
                frame: None,
            },
        );

        log::info!(
            "window {id} created on {} ({}x{}, \"{}\", {context}: {capabilities})",
            self.system.name(),
            config.size.0,
            config.size.1,
            config.title
        );
        Ok(id)
    }

    /// Makes the window's context current. The first call moves the window
    /// from `Created` to `Running`.
    pub fn make_current(&mut self, id: WindowId) -> Result<(), WindowError> {
        let window = self.live_mut(id)?;
        let result = match window.backend.as_mut() {
            Some(backend) => backend.make_current(),
            None => return Err(WindowError::Destroyed(id)),
        };
        result.map_err(|m| window.backend_error(id, m))?;
        if window.state == WindowState::Created {
            window.state.advance(WindowState::Running);
        }
        self.current = Some(id);
        Ok(())
    }

    /// Window whose context was made current last.
    pub fn current(&self) -> Option<WindowId> {
        self.current
    }

    /// Presents the frame in progress.
    pub fn swap_buffers(&mut self, id: WindowId) -> Result<(), WindowError> {
        let window = self.live_mut(id)?;
        if window.frame.take().is_none() {
            return Err(WindowError::NoFrame(id));
        }
        if let Some(native) = window.native.as_ref() {
            native.pre_present();
        }
        let result = match window.backend.as_mut() {
            Some(backend) => backend.swap_buffers(),
            None => return Err(WindowError::Destroyed(id)),
        };
        result.map_err(|m| window.backend_error(id, m))
    }

    /// Makes the context current and clears to the configured color.
    pub fn begin_frame(&mut self, id: WindowId) -> Result<FrameStatus, WindowError> {
        self.make_current(id)?;
        let window = self.live_mut(id)?;
        let clear = window.config.clear_color;
        let result = match window.backend.as_mut() {
            Some(backend) => backend.begin_frame(clear),
            None => return Err(WindowError::Destroyed(id)),
        };
        let status = result.map_err(|m| window.backend_error(id, m))?;
        window.frame = Some(status);
        Ok(status)
    }

    /// Whether a frame is in progress on `id`.
    pub fn in_frame(&self, id: WindowId) -> bool {
        self.windows.get(&id).is_some_and(|w| w.frame.is_some())
    }

    /// Resolves every handle of `cmd` against `id`'s context and submits it.
    pub fn draw(&mut self, id: WindowId, cmd: &DrawCommand) -> Result<(), RenderError> {
        let Self {
            windows, registry, ..
        } = self;
        let window = live(windows, id)?;
        if window.frame.is_none() {
            return Err(WindowError::NoFrame(id).into());
        }
        if cmd.elements.start > cmd.elements.end {
            return Err(RenderError::InvalidDraw(format!(
                "element range {:?} is reversed",
                cmd.elements
            )));
        }

        let ctx = window.context;
        let resolved = ResolvedDraw {
            program: registry.resolve_for(cmd.program, ctx, is(ResourceKind::Shader), ResourceKind::Shader)?,
            vertices: registry.resolve_for(cmd.vertices, ctx, is(ResourceKind::Buffer), ResourceKind::Buffer)?,
            indices: cmd
                .indices
                .map(|r| registry.resolve_for(r, ctx, is(ResourceKind::Buffer), ResourceKind::Buffer))
                .transpose()?,
            texture: cmd
                .texture
                .map(|r| registry.resolve_for(r, ctx, ResourceKind::samplable, ResourceKind::Texture))
                .transpose()?,
            elements: cmd.elements.clone(),
        };

        let Some(backend) = window.backend.as_mut() else {
            return Err(WindowError::Destroyed(id).into());
        };
        backend
            .draw(&resolved)
            .map_err(|m| window.backend_error(id, m).into())
    }

    pub fn poll_close_requested(&self, id: WindowId) -> bool {
        self.windows
            .get(&id)
            .is_none_or(|w| w.state >= WindowState::ClosePending)
    }

    /// Asks the window to close. The request is surfaced as a
    /// `CloseRequested` event on the next poll, like a native one.
    pub fn request_close(&mut self, id: WindowId) {
        match self.windows.get_mut(&id) {
            Some(w) if w.state < WindowState::ClosePending => {
                log::debug!("window {id}: close requested");
                w.close_requested = true;
            }
            Some(_) => {}
            None => log::warn!("close requested for unknown window {id}"),
        }
    }

    /// Destroys the window's GPU resources, its context and the native
    /// window, in that order. Safe to call any number of times.
    pub fn destroy(&mut self, id: WindowId) {
        let Self {
            windows,
            registry,
            current,
            ..
        } = self;
        let Some(window) = windows.get_mut(&id) else {
            log::warn!("destroy: unknown window {id}");
            return;
        };
        if window.state.is_destroyed() {
            log::debug!("destroy: window {id} already destroyed");
            return;
        }

        window.state.step_to(WindowState::ClosePending);
        let destroyed = match window.backend.as_mut() {
            Some(backend) => registry.invalidate_all(window.context, |h| backend.destroy_resource(h)),
            None => 0,
        };
        window.frame = None;
        window.backend = None;
        window.native = None;
        window.state.step_to(WindowState::Destroyed);
        if *current == Some(id) {
            *current = None;
        }

        log::info!("window {id} destroyed ({destroyed} GPU resource(s) released)");
    }

    pub fn destroy_all(&mut self) {
        let ids: Vec<WindowId> = self
            .windows
            .iter()
            .filter(|(_, w)| !w.state.is_destroyed())
            .map(|(id, _)| *id)
            .collect();
        for id in ids {
            self.destroy(id);
        }
    }

    /// Validates `desc` against the window's context and creates it there.
    pub fn acquire(
        &mut self,
        id: WindowId,
        desc: &GpuResourceDescriptor,
    ) -> Result<GpuResource, ResourceError> {
        let Self {
            windows, registry, ..
        } = self;
        let window = windows
            .get_mut(&id)
            .ok_or(ResourceError::UnknownWindow(id))?;
        let Some(backend) = window.backend.as_mut() else {
            return Err(ResourceError::ContextUnavailable(window.context));
        };
        desc.validate(&window.capabilities)?;
        registry.acquire(window.context, desc, |d| backend.create_resource(d))
    }

    pub fn retain(&mut self, res: GpuResource) -> Result<u32, ResourceError> {
        self.registry.retain(res)
    }

    /// Drops one reference; the native object is destroyed at zero.
    pub fn release(&mut self, res: GpuResource) -> Result<u32, ResourceError> {
        let Self {
            windows,
            contexts,
            registry,
            ..
        } = self;
        let backend = contexts
            .get(&res.context())
            .and_then(|id| windows.get_mut(id))
            .and_then(|w| w.backend.as_mut());
        registry.release(res, |h| {
            if let Some(backend) = backend {
                backend.destroy_resource(h);
            }
        })
    }

    pub fn info(&self, res: GpuResource) -> Result<&ResourceInfo, ResourceError> {
        self.registry.info(res)
    }

    pub fn resource_state(&self, res: GpuResource) -> ResourceState {
        self.registry.state(res)
    }

    /// Live GPU resources owned by the window's context.
    pub fn live_resources(&self, id: WindowId) -> usize {
        self.windows
            .get(&id)
            .map_or(0, |w| self.registry.live_count(w.context))
    }

    pub fn set_title(&mut self, id: WindowId, title: &str) -> Result<(), WindowError> {
        let window = self.live_mut(id)?;
        window.config.title = title.to_string();
        if let Some(native) = window.native.as_mut() {
            native.set_title(title);
        }
        Ok(())
    }

    pub fn set_visible(&mut self, id: WindowId, visible: bool) -> Result<(), WindowError> {
        let window = self.live_mut(id)?;
        window.config.visible = visible;
        if let Some(native) = window.native.as_mut() {
            native.set_visible(visible);
        }
        Ok(())
    }

    pub fn set_minimized(&mut self, id: WindowId, minimized: bool) -> Result<(), WindowError> {
        let window = self.live_mut(id)?;
        if let Some(native) = window.native.as_mut() {
            native.set_minimized(minimized);
        }
        Ok(())
    }

    /// Requests a new client-area size in logical pixels. Zero extents are
    /// clamped to one. The surface follows once the resize is reported
    /// through the event stream.
    pub fn set_size(&mut self, id: WindowId, width: u32, height: u32) -> Result<(), WindowError> {
        let window = self.live_mut(id)?;
        let size = (width.max(1), height.max(1));
        window.config.size = size;
        if let Some(native) = window.native.as_mut() {
            native.set_size(size.0, size.1);
        }
        Ok(())
    }

    /// Outer top-left corner of the window; `None` where the platform
    /// keeps it private.
    pub fn position(&self, id: WindowId) -> Result<Option<(i32, i32)>, WindowError> {
        let window = self.live(id)?;
        Ok(window.native.as_ref().and_then(|n| n.position()))
    }

    /// Display the window currently sits on.
    pub fn monitor(&self, id: WindowId) -> Result<Option<MonitorInfo>, WindowError> {
        let window = self.live(id)?;
        Ok(window.native.as_ref().and_then(|n| n.monitor()))
    }

    pub fn clipboard_text(&mut self) -> Option<String> {
        self.system.clipboard_text()
    }

    pub fn set_clipboard_text(&mut self, text: &str) -> bool {
        self.system.set_clipboard_text(text)
    }

    /// Sleeps until the platform has events or `timeout` elapses. The
    /// events stay queued for the next poll.
    pub fn wait_events(&mut self, timeout: Duration) {
        self.system.wait_events(timeout);
    }

    pub fn set_vsync(&mut self, id: WindowId, enabled: bool) -> Result<(), WindowError> {
        let window = self.live_mut(id)?;
        let result = match window.backend.as_mut() {
            Some(backend) => backend.set_vsync(enabled),
            None => return Err(WindowError::Destroyed(id)),
        };
        result.map_err(|m| window.backend_error(id, m))?;
        window.config.vsync_enabled = enabled;
        Ok(())
    }

    /// Drawable size in physical pixels.
    pub fn framebuffer_size(&self, id: WindowId) -> Result<(u32, u32), WindowError> {
        let window = self.live(id)?;
        Ok(window
            .native
            .as_ref()
            .map_or((0, 0), |n| n.framebuffer_size()))
    }

    pub fn scale_factor(&self, id: WindowId) -> Result<f64, WindowError> {
        let window = self.live(id)?;
        Ok(window.native.as_ref().map_or(1.0, |n| n.scale_factor()))
    }

    pub fn state(&self, id: WindowId) -> Option<WindowState> {
        self.windows.get(&id).map(|w| w.state)
    }

    pub fn config(&self, id: WindowId) -> Option<&WindowConfig> {
        self.windows.get(&id).map(|w| &w.config)
    }

    pub fn context(&self, id: WindowId) -> Option<ContextId> {
        self.windows.get(&id).map(|w| w.context)
    }

    pub fn capabilities(&self, id: WindowId) -> Option<GraphicsCapabilities> {
        self.windows.get(&id).map(|w| w.capabilities)
    }

    /// Windows that have not been destroyed, oldest first.
    pub fn live_windows(&self) -> Vec<WindowId> {
        self.windows
            .iter()
            .filter(|(_, w)| !w.state.is_destroyed())
            .map(|(id, _)| *id)
            .collect()
    }

    /// Pumps the platform and moves the window's buffered events into
    /// `out`, followed by a pending application close request.
    pub(crate) fn collect_native_events(
        &mut self,
        id: WindowId,
        out: &mut Vec<NativeEvent>,
    ) -> Result<(), WindowError> {
        live(&mut self.windows, id)?;
        self.system.pump_events();

        let window = live(&mut self.windows, id)?;
        if let Some(native) = window.native.as_mut() {
            native.drain_events(out);
        }
        if std::mem::take(&mut window.close_requested) {
            out.push(NativeEvent::CloseRequested);
        }
        Ok(())
    }

    /// Records that a close request reached the application. Returns
    /// false for every request after the first.
    pub(crate) fn mark_close_surfaced(&mut self, id: WindowId) -> bool {
        match self.windows.get_mut(&id) {
            Some(w) if !w.close_surfaced && !w.state.is_destroyed() => {
                w.close_surfaced = true;
                w.close_requested = false;
                w.state.step_to(WindowState::ClosePending);
                log::info!("window {id}: close requested");
                true
            }
            _ => false,
        }
    }

    pub(crate) fn resize_surface(&mut self, id: WindowId, width: u32, height: u32) {
        if let Some(backend) = self.windows.get_mut(&id).and_then(|w| w.backend.as_mut()) {
            backend.resize(width, height);
        }
    }

    fn live(&self, id: WindowId) -> Result<&ManagedWindow, WindowError> {
        match self.windows.get(&id) {
            None => Err(WindowError::Unknown(id)),
            Some(w) if w.state.is_destroyed() => Err(WindowError::Destroyed(id)),
            Some(w) => Ok(w),
        }
    }

    fn live_mut(&mut self, id: WindowId) -> Result<&mut ManagedWindow, WindowError> {
        live(&mut self.windows, id)
    }
}

impl Drop for WindowManager {
    fn drop(&mut self) {
        self.destroy_all();
    }
}

fn live(
    windows: &mut BTreeMap<WindowId, ManagedWindow>,
    id: WindowId,
) -> Result<&mut ManagedWindow, WindowError> {
    match windows.get_mut(&id) {
        None => Err(WindowError::Unknown(id)),
        Some(w) if w.state.is_destroyed() => Err(WindowError::Destroyed(id)),
        Some(w) => Ok(w),
    }
}

fn is(kind: ResourceKind) -> impl Fn(ResourceKind) -> bool {
    move |k| k == kind
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventDispatcher;
    use crate::paint::Color;
    use crate::platform::headless::{HeadlessController, HeadlessSystem};
    use crate::render::Vertex;
    use crate::resource::{BufferDescriptor, ShaderDescriptor, TextureDescriptor};

    fn manager() -> (WindowManager, HeadlessController) {
        let (system, controller) = HeadlessSystem::new();
        (WindowManager::new(Box::new(system)), controller)
    }

    fn quad_resources(
        windows: &mut WindowManager,
        id: WindowId,
    ) -> (GpuResource, GpuResource, GpuResource) {
        let program = windows
            .acquire(id, &ShaderDescriptor::sprite().into())
            .unwrap();
        let vertices = windows
            .acquire(
                id,
                &BufferDescriptor::vertices(&Vertex::quad([0.0, 0.0], [8.0, 8.0], Color::WHITE))
                    .into(),
            )
            .unwrap();
        let texture = windows
            .acquire(id, &TextureDescriptor::rgba8(1, 1, vec![255; 4]).into())
            .unwrap();
        (program, vertices, texture)
    }

    #[test]
    fn lifecycle_moves_forward_only() {
        let (mut windows, ctl) = manager();
        let id = windows.create(&WindowConfig::default()).unwrap();
        assert_eq!(windows.state(id), Some(WindowState::Created));

        windows.make_current(id).unwrap();
        windows.make_current(id).unwrap();
        assert_eq!(windows.state(id), Some(WindowState::Running));
        assert_eq!(windows.current(), Some(id));

        windows.destroy(id);
        assert_eq!(windows.state(id), Some(WindowState::Destroyed));
        assert!(!ctl.is_open(id));
        assert_eq!(windows.current(), None);
        windows.destroy(id);
        windows.destroy(id);
        assert_eq!(windows.state(id), Some(WindowState::Destroyed));
        assert_eq!(windows.make_current(id), Err(WindowError::Destroyed(id)));
    }

    #[test]
    fn unsupported_samples_fail_creation() {
        let (mut windows, ctl) = manager();
        let err = windows
            .create(&WindowConfig::default().with_samples(16))
            .unwrap_err();
        assert_eq!(err.requested.samples, 16);
        assert_eq!(err.available.max_samples, 4);
        assert!(windows.live_windows().is_empty());
        assert!(!ctl.is_open(WindowId::from_raw(1)));
    }

    #[test]
    fn vsync_requires_capability() {
        let (mut windows, ctl) = manager();
        ctl.set_capabilities(GraphicsCapabilities {
            max_samples: 1,
            vsync: false,
            max_texture_size: 1024,
        });
        assert!(windows.create(&WindowConfig::default()).is_err());
        let id = windows
            .create(&WindowConfig::default().with_vsync(false))
            .unwrap();
        assert!(matches!(
            windows.set_vsync(id, true),
            Err(WindowError::Backend { .. })
        ));
        assert_eq!(windows.config(id).map(|c| c.vsync_enabled), Some(false));
    }

    #[test]
    fn native_window_failure_is_context_error() {
        let (mut windows, ctl) = manager();
        ctl.fail_window_creation("no display");
        let err = windows.create(&WindowConfig::default()).unwrap_err();
        assert_eq!(err.reason, "no display");
        assert_eq!(err.available, GraphicsCapabilities::NONE);
    }

    #[test]
    fn destroy_invalidates_resources_once() {
        let (mut windows, ctl) = manager();
        let id = windows.create(&WindowConfig::default()).unwrap();
        let (program, vertices, texture) = quad_resources(&mut windows, id);
        windows.retain(texture).unwrap();
        assert_eq!(windows.live_resources(id), 3);
        let native = windows.registry.resolve(texture).unwrap();

        windows.destroy(id);
        assert_eq!(ctl.live_resources(), 0);
        assert_eq!(ctl.destroy_count(native), 1);
        for res in [program, vertices, texture] {
            assert_eq!(windows.resource_state(res), ResourceState::Invalid);
            assert_eq!(
                windows.retain(res),
                Err(ResourceError::UseAfterInvalidation { kind: res.kind() })
            );
            assert!(windows.release(res).is_err());
        }
        assert_eq!(ctl.destroy_count(native), 1);
        assert_eq!(
            windows.acquire(id, &ShaderDescriptor::sprite().into()),
            Err(ResourceError::ContextUnavailable(program.context()))
        );
    }

    #[test]
    fn release_destroys_at_zero() {
        let (mut windows, ctl) = manager();
        let id = windows.create(&WindowConfig::default()).unwrap();
        let (_, _, texture) = quad_resources(&mut windows, id);
        let native = windows.registry.resolve(texture).unwrap();

        assert_eq!(windows.retain(texture), Ok(2));
        assert_eq!(windows.release(texture), Ok(1));
        assert_eq!(ctl.destroy_count(native), 0);
        assert_eq!(windows.release(texture), Ok(0));
        assert_eq!(ctl.destroy_count(native), 1);
        assert_eq!(windows.release(texture), Err(ResourceError::UseAfterRelease));
        assert_eq!(ctl.destroy_count(native), 1);
    }

    #[test]
    fn oversized_texture_is_rejected_before_native_creation() {
        let (mut windows, ctl) = manager();
        let id = windows.create(&WindowConfig::default()).unwrap();
        let desc = TextureDescriptor::rgba8(9000, 1, vec![0; 9000 * 4]).into();
        assert!(matches!(
            windows.acquire(id, &desc),
            Err(ResourceError::Creation(_))
        ));
        assert_eq!(ctl.live_resources(), 0);
        assert_eq!(windows.live_resources(id), 0);
    }

    #[test]
    fn native_creation_failure_carries_diagnostic() {
        let (mut windows, ctl) = manager();
        let id = windows.create(&WindowConfig::default()).unwrap();
        ctl.fail_next_resource("out of device memory");
        let err = windows
            .acquire(id, &ShaderDescriptor::sprite().with_label("sprite").into())
            .unwrap_err();
        match err {
            ResourceError::Creation(e) => {
                assert_eq!(e.kind, ResourceKind::Shader);
                assert_eq!(e.label.as_deref(), Some("sprite"));
                assert_eq!(e.diagnostic, "out of device memory");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(windows.live_resources(id), 0);
    }

    #[test]
    fn malformed_wgsl_never_reaches_the_backend() {
        let (mut windows, ctl) = manager();
        let id = windows.create(&WindowConfig::default()).unwrap();
        let broken = ShaderDescriptor::wgsl("fn vs_main() -> i32 { return \"x\"; }\nfn fs_main( {");
        let err = windows.acquire(id, &broken.into()).unwrap_err();
        match err {
            ResourceError::Creation(e) => {
                assert_eq!(e.kind, ResourceKind::Shader);
                assert!(!e.diagnostic.is_empty());
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(windows.live_resources(id), 0);
        assert_eq!(ctl.live_resources(), 0);
    }

    #[test]
    fn draw_checks_frame_kind_and_context() {
        let (mut windows, ctl) = manager();
        let a = windows.create(&WindowConfig::default()).unwrap();
        let b = windows.create(&WindowConfig::default()).unwrap();
        let (program, vertices, texture) = quad_resources(&mut windows, a);
        let cmd = DrawCommand::new(program, vertices, 0..6).with_texture(texture);

        assert_eq!(
            windows.draw(a, &cmd),
            Err(RenderError::Window(WindowError::NoFrame(a)))
        );

        windows.begin_frame(a).unwrap();
        windows.draw(a, &cmd).unwrap();
        let swapped = DrawCommand::new(texture, vertices, 0..6);
        assert!(matches!(
            windows.draw(a, &swapped),
            Err(RenderError::Resource(ResourceError::WrongKind { .. }))
        ));
        windows.swap_buffers(a).unwrap();
        assert_eq!(ctl.frames_presented(), 1);
        assert_eq!(ctl.draw_calls(), 1);

        windows.begin_frame(b).unwrap();
        assert!(matches!(
            windows.draw(b, &cmd),
            Err(RenderError::Resource(ResourceError::ForeignContext { .. }))
        ));
        windows.swap_buffers(b).unwrap();
    }

    #[test]
    fn setters_reach_the_native_window() {
        let (mut windows, ctl) = manager();
        let id = windows.create(&WindowConfig::default().with_size(640, 480)).unwrap();
        windows.set_title(id, "renamed").unwrap();
        windows.set_visible(id, false).unwrap();
        assert_eq!(ctl.title(id).as_deref(), Some("renamed"));
        assert_eq!(ctl.is_visible(id), Some(false));
        assert_eq!(windows.framebuffer_size(id), Ok((640, 480)));
        assert_eq!(windows.scale_factor(id), Ok(1.0));
        windows.set_vsync(id, false).unwrap();
        assert_eq!(ctl.vsync(id), Some(false));
    }

    #[test]
    fn geometry_and_clipboard_reach_the_platform() {
        let (mut windows, ctl) = manager();
        let id = windows.create(&WindowConfig::default().with_size(640, 480)).unwrap();

        windows.set_size(id, 320, 0).unwrap();
        assert_eq!(ctl.window_size(id), Some((320, 1)));
        assert_eq!(windows.config(id).map(|c| c.size), Some((320, 1)));

        assert_eq!(windows.position(id), Ok(Some((0, 0))));
        ctl.move_window(id, 40, -12);
        assert_eq!(windows.position(id), Ok(Some((40, -12))));

        windows.set_minimized(id, true).unwrap();
        assert_eq!(ctl.is_minimized(id), Some(true));

        let monitor = windows.monitor(id).unwrap().unwrap();
        assert_eq!(monitor.size, (1920, 1080));
        ctl.set_monitor(None);
        assert_eq!(windows.monitor(id), Ok(None));

        assert_eq!(windows.clipboard_text(), None);
        ctl.set_clipboard("pasted");
        assert_eq!(windows.clipboard_text().as_deref(), Some("pasted"));
        assert!(windows.set_clipboard_text("copied"));
        assert_eq!(ctl.clipboard().as_deref(), Some("copied"));

        windows.wait_events(Duration::from_millis(250));
        assert_eq!(ctl.waits(), vec![Duration::from_millis(250)]);

        windows.destroy(id);
        assert_eq!(windows.position(id), Err(WindowError::Destroyed(id)));
        assert_eq!(windows.set_size(id, 10, 10), Err(WindowError::Destroyed(id)));
    }

    #[test]
    fn close_on_a_never_current_window_walks_every_state() {
        let (mut windows, ctl) = manager();
        let mut dispatcher = EventDispatcher::new();
        let id = windows.create(&WindowConfig::default()).unwrap();
        assert_eq!(windows.state(id), Some(WindowState::Created));

        windows.request_close(id);
        assert_eq!(dispatcher.poll_events(&mut windows, id), Ok(1));
        assert_eq!(windows.state(id), Some(WindowState::ClosePending));
        assert!(windows.poll_close_requested(id));

        // Close already surfaced; later requests are swallowed.
        ctl.push_event(id, NativeEvent::CloseRequested);
        assert_eq!(dispatcher.poll_events(&mut windows, id), Ok(0));

        let b = windows.create(&WindowConfig::default()).unwrap();
        windows.destroy(b);
        assert_eq!(windows.state(b), Some(WindowState::Destroyed));
        assert!(!ctl.is_open(b));
    }

    #[test]
    fn drop_tears_everything_down() {
        let (mut windows, ctl) = manager();
        let a = windows.create(&WindowConfig::default()).unwrap();
        let b = windows.create(&WindowConfig::default()).unwrap();
        quad_resources(&mut windows, a);
        quad_resources(&mut windows, b);
        assert_eq!(ctl.live_resources(), 6);
        drop(windows);
        assert_eq!(ctl.live_resources(), 0);
        assert!(!ctl.is_open(a) && !ctl.is_open(b));
    }
}
