use std::time::Duration;

use crate::error::{RenderError, WindowError};
use crate::platform::FrameStatus;
use crate::time::{Clock, FrameSynchronizer, FrameTime, SystemClock};
use crate::window::{WindowId, WindowManager};

use super::command::DrawCommand;

/// Begin / draw / end frame on top of the window manager, paced by a
/// [`FrameSynchronizer`].
#[derive(Debug)]
pub struct RenderSurface<C: Clock = SystemClock> {
    sync: FrameSynchronizer<C>,
    active: Option<(WindowId, FrameStatus)>,
}

impl RenderSurface<SystemClock> {
    pub fn new() -> Self {
        Self::with_synchronizer(FrameSynchronizer::new())
    }
}

impl Default for RenderSurface<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> RenderSurface<C> {
    pub fn with_synchronizer(sync: FrameSynchronizer<C>) -> Self {
        Self { sync, active: None }
    }

    pub fn synchronizer(&self) -> &FrameSynchronizer<C> {
        &self.sync
    }

    /// Makes `window`'s context current and clears it.
    pub fn begin_frame(
        &mut self,
        windows: &mut WindowManager,
        window: WindowId,
    ) -> Result<FrameTime, RenderError> {
        let time = self.sync.begin_frame();
        let status = windows.begin_frame(window)?;
        if status == FrameStatus::Skipped {
            log::trace!("frame {} skipped on {window}", time.frame_index);
        }
        self.active = Some((window, status));
        Ok(time)
    }

    /// Window and status of the frame in progress.
    pub fn active(&self) -> Option<(WindowId, FrameStatus)> {
        self.active
    }

    /// Draws into the frame in progress.
    pub fn draw(&mut self, windows: &mut WindowManager, cmd: &DrawCommand) -> Result<(), RenderError> {
        let Some((window, _)) = self.active else {
            return Err(RenderError::InvalidDraw("no frame in progress".to_string()));
        };
        windows.draw(window, cmd)
    }

    /// Presents and then waits out the rest of the frame budget.
    /// Returns the time spent waiting.
    pub fn end_frame(
        &mut self,
        windows: &mut WindowManager,
        window: WindowId,
        target_hz: f64,
    ) -> Result<Duration, RenderError> {
        match self.active {
            Some((active, _)) if active == window => {}
            _ => return Err(WindowError::NoFrame(window).into()),
        }
        self.active = None;
        windows.swap_buffers(window)?;
        Ok(self.sync.end_frame(target_hz))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::error::ResourceError;
    use crate::paint::Color;
    use crate::platform::headless::HeadlessSystem;
    use crate::render::Vertex;
    use crate::resource::{BufferDescriptor, ShaderDescriptor};
    use crate::time::ManualClock;
    use crate::window::WindowConfig;

    #[test]
    fn frame_draws_presents_and_paces() {
        let (system, ctl) = HeadlessSystem::new();
        let mut windows = WindowManager::new(Box::new(system));
        let clear = Color::rgb(0.2, 0.3, 0.4);
        let id = windows
            .create(&WindowConfig::default().with_clear_color(clear))
            .unwrap();
        let program = windows.acquire(id, &ShaderDescriptor::sprite().into()).unwrap();
        let quad = Vertex::quad([0.0, 0.0], [32.0, 32.0], Color::WHITE);
        let vertices = windows.acquire(id, &BufferDescriptor::vertices(&quad).into()).unwrap();

        let clock = ManualClock::new();
        let mut surface = RenderSurface::with_synchronizer(FrameSynchronizer::with_clock(clock.clone()));
        let time = surface.begin_frame(&mut windows, id).unwrap();
        assert_eq!(time.frame_index, 0);
        assert_eq!(ctl.last_clear(id), Some(clear));

        surface.draw(&mut windows, &DrawCommand::new(program, vertices, 0..6)).unwrap();
        clock.advance(Duration::from_millis(4));
        let waited = surface.end_frame(&mut windows, id, 100.0).unwrap();
        assert!(waited >= Duration::from_millis(6));
        assert_eq!(ctl.frames_presented(), 1);
        assert_eq!(ctl.draw_calls(), 1);
        assert!(surface.active().is_none());
    }

    #[test]
    fn draw_after_teardown_reports_invalidation() {
        let (system, _ctl) = HeadlessSystem::new();
        let mut windows = WindowManager::new(Box::new(system));
        let a = windows.create(&WindowConfig::default()).unwrap();
        let b = windows.create(&WindowConfig::default()).unwrap();
        let program = windows.acquire(a, &ShaderDescriptor::sprite().into()).unwrap();
        let vertices = windows
            .acquire(a, &BufferDescriptor::vertices(&[Vertex::default(); 3]).into())
            .unwrap();
        windows.destroy(a);

        let mut surface = RenderSurface::new();
        surface.begin_frame(&mut windows, b).unwrap();
        assert_eq!(
            surface.draw(&mut windows, &DrawCommand::new(program, vertices, 0..3)),
            Err(RenderError::Resource(ResourceError::UseAfterInvalidation {
                kind: program.kind()
            }))
        );
        surface.end_frame(&mut windows, b, 0.0).unwrap();
    }

    #[test]
    fn end_frame_requires_matching_begin() {
        let (system, _ctl) = HeadlessSystem::new();
        let mut windows = WindowManager::new(Box::new(system));
        let id = windows.create(&WindowConfig::default()).unwrap();
        let mut surface = RenderSurface::new();
        assert_eq!(
            surface.end_frame(&mut windows, id, 60.0),
            Err(RenderError::Window(WindowError::NoFrame(id)))
        );
    }
}
