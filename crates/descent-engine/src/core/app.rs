use crate::time::FrameTime;

use super::engine::Engine;

/// Control directive returned by app callbacks.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AppControl {
    Continue,
    Exit,
}

/// Application contract driven by [`Engine::run`].
pub trait App {
    /// Called once, after the window, context and audio exist.
    fn initialize(&mut self, engine: &mut Engine) -> anyhow::Result<()> {
        let _ = engine;
        Ok(())
    }

    /// Called once per frame, between event dispatch and present.
    fn update(&mut self, engine: &mut Engine, time: FrameTime) -> anyhow::Result<AppControl>;

    /// Called once before audio and windows are torn down, also when the
    /// loop ended with an error.
    fn shutdown(&mut self, engine: &mut Engine) {
        let _ = engine;
    }
}

/// [`App`] made of three closures.
pub struct FnApp<I, U, S> {
    pub initialize: I,
    pub update: U,
    pub shutdown: S,
}

impl<I, U, S> FnApp<I, U, S>
where
    I: FnMut(&mut Engine) -> anyhow::Result<()>,
    U: FnMut(&mut Engine, FrameTime) -> anyhow::Result<AppControl>,
    S: FnMut(&mut Engine),
{
    pub fn new(initialize: I, update: U, shutdown: S) -> Self {
        Self {
            initialize,
            update,
            shutdown,
        }
    }
}

impl<I, U, S> App for FnApp<I, U, S>
where
    I: FnMut(&mut Engine) -> anyhow::Result<()>,
    U: FnMut(&mut Engine, FrameTime) -> anyhow::Result<AppControl>,
    S: FnMut(&mut Engine),
{
    fn initialize(&mut self, engine: &mut Engine) -> anyhow::Result<()> {
        (self.initialize)(engine)
    }

    fn update(&mut self, engine: &mut Engine, time: FrameTime) -> anyhow::Result<AppControl> {
        (self.update)(engine, time)
    }

    fn shutdown(&mut self, engine: &mut Engine) {
        (self.shutdown)(engine)
    }
}
