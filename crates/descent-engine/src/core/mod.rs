//! Run loop and application contract.
//!
//! `Engine` ties the window manager, event dispatcher, audio context and
//! render surface together and drives them one iteration at a time:
//! handoff queue, events, application update, audio reaping, present, pacing.

mod app;
mod engine;
mod handoff;

pub use app::{App, AppControl, FnApp};
pub use engine::{BackendKind, Engine, EngineConfig, run};
pub use handoff::{HandoffQueue, HandoffSender};
