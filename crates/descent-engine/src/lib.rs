//! Descent engine crate.
//!
//! Owns a native window, its graphics context, the audio device and the
//! platform event stream, and exposes them through handles that stay safe
//! to hold after the underlying native objects are gone.
//!
//! Layering, leaf first:
//! - `platform`: native window/graphics seams (winit + wgpu, or headless)
//! - `resource`: GPU handle registry with per-context invalidation
//! - `time`: frame clock and frame pacing
//! - `window`: window + context lifecycle
//! - `event`: native event normalization and listener dispatch
//! - `audio`: audio context, sound buffers and sources
//! - `render`: per-frame drawing contract
//! - `core`: the run loop tying it together

pub mod audio;
pub mod core;
pub mod device;
pub mod error;
pub mod event;
pub mod input;
pub mod logging;
pub mod paint;
pub mod platform;
pub mod render;
pub mod resource;
pub mod text;
pub mod time;
pub mod window;

pub use crate::core::{App, AppControl, BackendKind, Engine, EngineConfig, run};
pub use crate::error::{EngineError, Result};
