//! Error taxonomy.
//!
//! - `ContextCreationError`: fatal, startup only
//! - `ResourceError`: GPU handle misuse and creation failures
//! - `AudioError` / `DecodeError`: audio context and asset decoding
//! - `WindowError` / `RenderError`: per-frame failures returned to the caller
//! - `EngineError`: everything above plus application errors, for `run`

use std::fmt;

use thiserror::Error;

use crate::platform::GraphicsCapabilities;
use crate::resource::{ContextId, ResourceKind};
use crate::window::WindowId;

pub type Result<T, E = EngineError> = std::result::Result<T, E>;

/// Capabilities an application asked for when creating a window.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct GraphicsRequest {
    pub samples: u32,
    pub vsync: bool,
}

impl fmt::Display for GraphicsRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "samples={}, vsync={}",
            self.samples,
            if self.vsync { "on" } else { "off" }
        )
    }
}

/// The native layer could not provide a compatible window or graphics context.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("graphics context creation failed: {reason} (requested {requested}; available {available})")]
pub struct ContextCreationError {
    pub requested: GraphicsRequest,
    pub available: GraphicsCapabilities,
    pub reason: String,
}

impl ContextCreationError {
    /// Failure before any capability information was known (no adapter, no event loop).
    pub fn native(requested: GraphicsRequest, reason: impl Into<String>) -> Self {
        Self {
            requested,
            available: GraphicsCapabilities::NONE,
            reason: reason.into(),
        }
    }
}

/// Native creation of a GPU object failed. Nothing was registered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to create {kind} resource{}: {diagnostic}", label_suffix(.label))]
pub struct ResourceCreationError {
    pub kind: ResourceKind,
    pub label: Option<String>,
    pub diagnostic: String,
}

fn label_suffix(label: &Option<String>) -> String {
    label
        .as_deref()
        .map(|l| format!(" '{l}'"))
        .unwrap_or_default()
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResourceError {
    #[error(transparent)]
    Creation(#[from] ResourceCreationError),

    #[error("{kind} resource used after its graphics context was torn down")]
    UseAfterInvalidation { kind: ResourceKind },

    #[error("resource used after its last reference was released")]
    UseAfterRelease,

    #[error("{kind} resource cannot take more references")]
    RefCountOverflow { kind: ResourceKind },

    #[error("expected a {expected} resource, got {actual}")]
    WrongKind {
        expected: ResourceKind,
        actual: ResourceKind,
    },

    #[error("resource belongs to {resource}, not {context}")]
    ForeignContext {
        resource: ContextId,
        context: ContextId,
    },

    #[error("{0} is not available")]
    ContextUnavailable(ContextId),

    #[error("unknown window {0}")]
    UnknownWindow(WindowId),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WindowError {
    #[error("unknown window {0}")]
    Unknown(WindowId),

    #[error("window {0} has been destroyed")]
    Destroyed(WindowId),

    #[error("no frame in progress for window {0}")]
    NoFrame(WindowId),

    #[error("graphics backend failure on window {window}: {message}")]
    Backend { window: WindowId, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error(transparent)]
    Window(#[from] WindowError),

    #[error(transparent)]
    Resource(#[from] ResourceError),

    #[error("draw call rejected: {0}")]
    InvalidDraw(String),
}

/// Malformed or unsupported asset bytes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to decode {what}: {message}")]
pub struct DecodeError {
    pub what: &'static str,
    pub message: String,
}

impl DecodeError {
    pub fn new(what: &'static str, message: impl Into<String>) -> Self {
        Self {
            what,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AudioError {
    #[error("audio initialization failed: {0}")]
    Init(String),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("audio context is closed")]
    ContextClosed,

    #[error("invalid playback options: {0}")]
    InvalidPlaybackOptions(String),

    #[error("unknown sound buffer")]
    UnknownBuffer,

    #[error("unknown sound source")]
    UnknownSource,

    #[error("audio backend error: {0}")]
    Backend(String),
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    ContextCreation(#[from] ContextCreationError),

    #[error("required audio device unavailable: {0}")]
    AudioInit(AudioError),

    #[error(transparent)]
    Audio(#[from] AudioError),

    #[error(transparent)]
    Window(#[from] WindowError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Resource(#[from] ResourceError),

    #[error("application error: {0:#}")]
    Application(#[from] anyhow::Error),
}

impl EngineError {
    /// Process exit code reported by [`crate::run`].
    pub fn exit_code(&self) -> u8 {
        match self {
            EngineError::ContextCreation(_) => 1,
            EngineError::AudioInit(_) => 2,
            EngineError::Application(_) => 3,
            _ => 4,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_follow_error_class() {
        let ctx = ContextCreationError::native(
            GraphicsRequest { samples: 1, vsync: true },
            "no adapter",
        );
        assert_eq!(EngineError::from(ctx).exit_code(), 1);
        assert_eq!(
            EngineError::AudioInit(AudioError::Init("no device".into())).exit_code(),
            2
        );
        assert_eq!(EngineError::from(anyhow::anyhow!("boom")).exit_code(), 3);
        assert_eq!(
            EngineError::from(WindowError::NoFrame(WindowId::from_raw(1))).exit_code(),
            4
        );
    }

    #[test]
    fn context_error_reports_requested_and_available() {
        let err = ContextCreationError {
            requested: GraphicsRequest { samples: 16, vsync: true },
            available: GraphicsCapabilities {
                max_samples: 4,
                vsync: true,
                max_texture_size: 4096,
            },
            reason: "sample count not supported".into(),
        };
        let text = err.to_string();
        assert!(text.contains("samples=16"));
        assert!(text.contains("max_samples=4"));
    }

    #[test]
    fn creation_error_includes_label() {
        let err = ResourceCreationError {
            kind: ResourceKind::Shader,
            label: Some("sprite".into()),
            diagnostic: "missing entry point".into(),
        };
        assert_eq!(
            err.to_string(),
            "failed to create shader resource 'sprite': missing entry point"
        );
    }
}
