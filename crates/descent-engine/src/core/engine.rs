use std::process::ExitCode;
use std::time::Duration;

use crate::audio::{AudioConfig, AudioContext};
use crate::error::{ContextCreationError, EngineError, RenderError};
use crate::event::EventDispatcher;
use crate::input::InputState;
use crate::logging::{LoggingConfig, init_logging};
use crate::platform::WindowSystem;
use crate::platform::headless::HeadlessSystem;
use crate::platform::winit::WinitSystem;
use crate::render::{DrawCommand, RenderSurface};
use crate::time::FrameTime;
use crate::window::{WindowConfig, WindowId, WindowManager, WindowState};

use super::app::{App, AppControl, FnApp};
use super::handoff::{HandoffQueue, HandoffSender};

/// Platform the engine runs on.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum BackendKind {
    /// winit windows with wgpu contexts.
    #[default]
    Native,
    /// Scriptable in-memory windows; no display or GPU needed.
    Headless,
}

/// Engine startup configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub window: WindowConfig,
    pub audio: AudioConfig,
    pub backend: BackendKind,
    /// Frames per second; `<= 0` or non-finite runs unpaced.
    pub target_hz: f64,
    /// `None` leaves logger setup to the host.
    pub logging: Option<LoggingConfig>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            window: WindowConfig::default(),
            audio: AudioConfig::default(),
            backend: BackendKind::default(),
            target_hz: 60.0,
            logging: Some(LoggingConfig::default()),
        }
    }
}

impl EngineConfig {
    pub fn with_window(mut self, window: WindowConfig) -> Self {
        self.window = window;
        self
    }

    pub fn with_audio(mut self, audio: AudioConfig) -> Self {
        self.audio = audio;
        self
    }

    pub fn with_backend(mut self, backend: BackendKind) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_target_hz(mut self, target_hz: f64) -> Self {
        self.target_hz = target_hz;
        self
    }

    pub fn with_logging(mut self, logging: Option<LoggingConfig>) -> Self {
        self.logging = logging;
        self
    }
}

/// The running engine: primary window, listeners, audio and frame pacing.
///
/// Torn down in reverse dependency order by [`Engine::run`], or on drop.
pub struct Engine {
    // Drop order matters less than `shutdown`, which runs first.
    events: EventDispatcher,
    audio: AudioContext,
    surface: RenderSurface,
    handoff: HandoffQueue,
    windows: WindowManager,
    primary: WindowId,
    target_hz: f64,
    exit_requested: bool,
    shut_down: bool,
}

impl Engine {
    /// Creates the platform, the primary window and the audio context.
    pub fn new(config: &EngineConfig) -> Result<Self, EngineError> {
        if let Some(logging) = &config.logging {
            init_logging(logging.clone());
        }

        let system: Box<dyn WindowSystem> = match config.backend {
            BackendKind::Native => Box::new(WinitSystem::new().map_err(|e| {
                ContextCreationError::native(config.window.request(), format!("{e:#}"))
            })?),
            BackendKind::Headless => Box::new(HeadlessSystem::new().0),
        };
        Self::with_system(system, config)
    }

    /// Like [`Engine::new`] over an already built window system. Logging is
    /// left alone.
    pub fn with_system(system: Box<dyn WindowSystem>, config: &EngineConfig) -> Result<Self, EngineError> {
        let mut windows = WindowManager::new(system);
        let primary = windows.create(&config.window)?;
        windows.make_current(primary)?;

        let audio = AudioContext::init(&config.audio).map_err(EngineError::AudioInit)?;

        log::info!(
            "engine started on {} (window {primary}, audio {})",
            windows.system_name(),
            audio.backend_name().unwrap_or("off")
        );

        Ok(Self {
            events: EventDispatcher::new(),
            audio,
            surface: RenderSurface::new(),
            handoff: HandoffQueue::new(),
            windows,
            primary,
            target_hz: config.target_hz,
            exit_requested: false,
            shut_down: false,
        })
    }

    /// Replaces the audio context, shutting the previous one down.
    pub fn with_audio(mut self, audio: AudioContext) -> Self {
        self.audio.shutdown();
        self.audio = audio;
        self
    }

    /// Builds an engine from `config` and runs `app` to completion.
    pub fn run_app<A: App>(config: EngineConfig, app: &mut A) -> Result<(), EngineError> {
        Self::new(&config)?.run(app)
    }

    pub fn primary(&self) -> WindowId {
        self.primary
    }

    pub fn windows(&self) -> &WindowManager {
        &self.windows
    }

    pub fn windows_mut(&mut self) -> &mut WindowManager {
        &mut self.windows
    }

    pub fn events(&self) -> &EventDispatcher {
        &self.events
    }

    pub fn events_mut(&mut self) -> &mut EventDispatcher {
        &mut self.events
    }

    pub fn audio(&self) -> &AudioContext {
        &self.audio
    }

    pub fn audio_mut(&mut self) -> &mut AudioContext {
        &mut self.audio
    }

    /// Input state of the primary window.
    pub fn input(&self) -> Option<&InputState> {
        self.events.input(self.primary)
    }

    pub fn target_hz(&self) -> f64 {
        self.target_hz
    }

    pub fn set_target_hz(&mut self, target_hz: f64) {
        self.target_hz = target_hz;
    }

    /// Creates a secondary window. It is destroyed once its close request
    /// has been dispatched.
    pub fn create_window(&mut self, config: &WindowConfig) -> Result<WindowId, EngineError> {
        let id = self.windows.create(config)?;
        self.windows.make_current(id)?;
        Ok(id)
    }

    /// Draws into the primary window's frame in progress.
    pub fn draw(&mut self, cmd: &DrawCommand) -> Result<(), RenderError> {
        self.surface.draw(&mut self.windows, cmd)
    }

    /// Ends the loop at the top of the next iteration.
    pub fn request_exit(&mut self) {
        self.exit_requested = true;
    }

    pub fn exit_requested(&self) -> bool {
        self.exit_requested
    }

    pub fn handoff(&self) -> HandoffSender {
        self.handoff.sender()
    }

    /// Runs `work` on a background thread and `then` with its result on the
    /// engine thread, at the start of a later iteration.
    pub fn spawn_blocking<T, W, F>(&self, work: W, then: F) -> std::io::Result<()>
    where
        T: Send + 'static,
        W: FnOnce() -> T + Send + 'static,
        F: FnOnce(&mut Engine, T) + Send + 'static,
    {
        let sender = self.handoff.sender();
        std::thread::Builder::new()
            .name("descent-blocking".to_string())
            .spawn(move || {
                let out = work();
                if !sender.post(move |engine| then(engine, out)) {
                    log::debug!("engine gone; dropping background result");
                }
            })
            .map(|_| ())
    }

    /// Runs `app` until it exits, the primary window closes, or an error
    /// escapes the loop. Shutdown runs in every case.
    pub fn run<A: App>(mut self, app: &mut A) -> Result<(), EngineError> {
        let result = self.drive(app);
        if let Err(e) = &result {
            log::error!("run loop failed: {e}");
        }

        app.shutdown(&mut self);
        self.shutdown();
        result
    }

    fn drive<A: App>(&mut self, app: &mut A) -> Result<(), EngineError> {
        app.initialize(self)?;

        while !self.should_exit() {
            self.step(app)?;
        }
        log::info!("run loop finished");
        Ok(())
    }

    fn should_exit(&self) -> bool {
        self.exit_requested || self.windows.poll_close_requested(self.primary)
    }

    /// One loop iteration.
    pub(crate) fn step<A: App>(&mut self, app: &mut A) -> Result<Duration, EngineError> {
        for job in self.handoff.take_ready() {
            job(self);
        }

        self.dispatch_events()?;

        let time: FrameTime = self.surface.begin_frame(&mut self.windows, self.primary)?;
        if app.update(self, time)? == AppControl::Exit {
            self.exit_requested = true;
        }
        self.audio.collect_finished();

        let waited = self
            .surface
            .end_frame(&mut self.windows, self.primary, self.target_hz)?;
        Ok(waited)
    }

    fn dispatch_events(&mut self) -> Result<(), EngineError> {
        for id in self.windows.live_windows() {
            self.events.poll_events(&mut self.windows, id)?;

            if id != self.primary && self.windows.state(id) == Some(WindowState::ClosePending) {
                self.windows.destroy(id);
                self.events.remove_window(id);
            }
        }
        Ok(())
    }

    /// Tears down audio (sources, then buffers, then the device), then every
    /// window with its GPU resources and context. Idempotent.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            log::debug!("engine already shut down");
            return;
        }
        self.shut_down = true;

        self.audio.shutdown();
        self.windows.destroy_all();
        self.events.clear();
        log::info!("engine shut down");
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Runs an application made of three callbacks and maps the outcome to a
/// process exit code: 0 on clean shutdown, 1 when no graphics context could
/// be created, 2 when required audio is unavailable, 3 on application error,
/// 4 on any other failure.
pub fn run<I, U, S>(config: EngineConfig, initialize: I, update: U, shutdown: S) -> ExitCode
where
    I: FnMut(&mut Engine) -> anyhow::Result<()>,
    U: FnMut(&mut Engine, FrameTime) -> anyhow::Result<AppControl>,
    S: FnMut(&mut Engine),
{
    let mut app = FnApp::new(initialize, update, shutdown);
    match Engine::run_app(config, &mut app) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::from(e.exit_code())
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;
    use crate::audio::{AudioBackendKind, AudioMode, NullAudioBackend};
    use crate::event::{EventCategories, NativeEvent};
    use crate::platform::headless::HeadlessController;

    fn config() -> EngineConfig {
        EngineConfig::default()
            .with_backend(BackendKind::Headless)
            .with_audio(AudioConfig::default().with_backend(AudioBackendKind::Null))
            .with_target_hz(0.0)
            .with_logging(None)
    }

    fn engine() -> (Engine, HeadlessController) {
        let (system, ctl) = HeadlessSystem::new();
        let engine = Engine::with_system(Box::new(system), &config()).unwrap();
        (engine, ctl)
    }

    #[test]
    fn update_exit_stops_after_presenting_the_frame() {
        let (engine, ctl) = engine();
        let primary = engine.primary();
        let frames = Rc::new(Cell::new(0));
        let counted = frames.clone();
        let mut app = FnApp::new(
            |_| Ok(()),
            move |_, time| {
                counted.set(time.frame_index + 1);
                Ok(if time.frame_index == 2 {
                    AppControl::Exit
                } else {
                    AppControl::Continue
                })
            },
            |_| {},
        );

        engine.run(&mut app).unwrap();
        assert_eq!(frames.get(), 3);
        assert_eq!(ctl.frames_presented(), 3);
        assert!(!ctl.is_open(primary));
    }

    #[test]
    fn close_request_is_observed_at_the_next_iteration() {
        let (engine, ctl) = engine();
        let primary = engine.primary();
        let closes = Rc::new(Cell::new(0));
        let seen = closes.clone();

        let mut app = FnApp::new(
            move |e| {
                let seen = seen.clone();
                e.events_mut()
                    .on(primary, EventCategories::WINDOW, move |_| seen.set(seen.get() + 1));
                Ok(())
            },
            |e, time| {
                if time.frame_index == 0 {
                    let primary = e.primary();
                    e.windows_mut().request_close(primary);
                }
                Ok(AppControl::Continue)
            },
            |_| {},
        );

        engine.run(&mut app).unwrap();
        assert_eq!(closes.get(), 1);
        assert_eq!(ctl.frames_presented(), 2);
    }

    #[test]
    fn application_error_still_shuts_down() {
        let (engine, ctl) = engine();
        let shut = Rc::new(Cell::new(false));
        let flag = shut.clone();
        let mut app = FnApp::new(
            |_| Ok(()),
            |_, _| Err(anyhow::anyhow!("level missing")),
            move |_| flag.set(true),
        );

        let err = engine.run(&mut app).unwrap_err();
        assert_eq!(err.exit_code(), 3);
        assert!(shut.get());
        assert!(!ctl.is_open(WindowId::from_raw(1)));
    }

    #[test]
    fn secondary_window_is_destroyed_after_its_close_request() {
        let (mut engine, ctl) = engine();
        let second = engine.create_window(&WindowConfig::default()).unwrap();
        ctl.push_event(second, NativeEvent::CloseRequested);

        let mut app = FnApp::new(|_| Ok(()), |_, _| Ok(AppControl::Continue), |_| {});
        engine.step(&mut app).unwrap();

        assert_eq!(engine.windows().state(second), Some(WindowState::Destroyed));
        assert_eq!(engine.windows().live_windows(), vec![engine.primary()]);
        assert!(!engine.exit_requested());
    }

    #[test]
    fn handoff_jobs_run_before_update() {
        let (mut engine, _ctl) = engine();
        assert!(engine.handoff().post(|e| e.request_exit()));

        let saw_exit = Rc::new(Cell::new(false));
        let seen = saw_exit.clone();
        let mut app = FnApp::new(
            |_| Ok(()),
            move |e, _| {
                seen.set(e.exit_requested());
                Ok(AppControl::Continue)
            },
            |_| {},
        );
        engine.step(&mut app).unwrap();
        assert!(saw_exit.get());
    }

    #[test]
    fn spawn_blocking_result_arrives_through_the_handoff_queue() {
        let (mut engine, _ctl) = engine();
        engine
            .spawn_blocking(|| 24.0, |e, hz| e.set_target_hz(hz))
            .unwrap();

        let mut app = FnApp::new(|_| Ok(()), |_, _| Ok(AppControl::Continue), |_| {});
        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while engine.target_hz() != 24.0 && std::time::Instant::now() < deadline {
            engine.step(&mut app).unwrap();
            std::thread::sleep(Duration::from_millis(1));
        }
        assert_eq!(engine.target_hz(), 24.0);
    }

    #[test]
    fn required_audio_on_null_backend_opens() {
        let (system, _ctl) = HeadlessSystem::new();
        let config = config().with_audio(
            AudioConfig::default()
                .with_mode(AudioMode::Required)
                .with_backend(AudioBackendKind::Null),
        );
        let engine = Engine::with_system(Box::new(system), &config).unwrap();
        assert_eq!(engine.audio().backend_name(), Some("null"));

        let engine = engine.with_audio(AudioContext::with_backend(Box::new(NullAudioBackend::new())));
        assert!(engine.audio().is_open());
    }

    #[test]
    fn context_creation_failure_maps_to_exit_code_one() {
        let (system, ctl) = HeadlessSystem::new();
        ctl.fail_window_creation("no display");
        let err = Engine::with_system(Box::new(system), &config()).err().unwrap();
        assert!(matches!(err, EngineError::ContextCreation(_)));
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn shutdown_twice_is_a_no_op() {
        let (mut engine, ctl) = engine();
        engine.shutdown();
        engine.shutdown();
        assert!(!ctl.is_open(engine.primary()));
        assert!(!engine.audio().is_open());
    }
}
