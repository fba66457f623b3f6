//! Audio context, sound buffers and playback sources.
//!
//! Decoding goes through symphonia; playback through an [`AudioBackend`],
//! either the device-backed kira implementation or a silent null one.

mod backend;
mod config;
mod context;
mod decode;
mod device;

pub use backend::{AudioBackend, AudioOp, BackendSound, NullAudioBackend, NullAudioProbe, Voice};
pub use config::{AudioBackendKind, AudioConfig, AudioMode, PlaybackOptions};
pub use context::{AudioContext, SoundBuffer, SoundSource};
pub use decode::{decode_sound, DecodedSound};
pub use device::KiraBackend;
