use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use crate::error::AudioError;

use super::config::PlaybackOptions;
use super::decode::DecodedSound;

/// Backend-side id of uploaded sound data.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct BackendSound(pub u64);

/// Backend-side id of one playback.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct Voice(pub u64);

/// Playback device seam. Handle bookkeeping lives in `AudioContext`;
/// backends only map ids to native objects.
pub trait AudioBackend {
    fn name(&self) -> &'static str;

    fn upload(&mut self, sound: &DecodedSound) -> Result<BackendSound, AudioError>;
    fn play(&mut self, sound: BackendSound, options: &PlaybackOptions) -> Result<Voice, AudioError>;
    fn stop(&mut self, voice: Voice);
    fn is_playing(&self, voice: Voice) -> bool;
    fn unload(&mut self, sound: BackendSound);

    /// Releases the device. Nothing may be called afterwards.
    fn close(&mut self);
}

/// Recorded [`NullAudioBackend`] call.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AudioOp {
    Upload(BackendSound),
    Play(Voice, BackendSound),
    Stop(Voice),
    Unload(BackendSound),
    Close,
}

#[derive(Debug, Default)]
struct NullState {
    next_id: u64,
    sounds: HashSet<BackendSound>,
    playing: HashSet<Voice>,
    ops: Vec<AudioOp>,
    closed: bool,
}

/// Silent backend. Voices play until stopped or finished through the probe.
#[derive(Debug, Default)]
pub struct NullAudioBackend {
    state: Rc<RefCell<NullState>>,
}

/// Observes and drives a [`NullAudioBackend`].
#[derive(Debug, Clone)]
pub struct NullAudioProbe {
    state: Rc<RefCell<NullState>>,
}

impl NullAudioBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn probe(&self) -> NullAudioProbe {
        NullAudioProbe {
            state: self.state.clone(),
        }
    }
}

impl AudioBackend for NullAudioBackend {
    fn name(&self) -> &'static str {
        "null"
    }

    fn upload(&mut self, _sound: &DecodedSound) -> Result<BackendSound, AudioError> {
        let mut s = self.state.borrow_mut();
        s.next_id += 1;
        let id = BackendSound(s.next_id);
        s.sounds.insert(id);
        s.ops.push(AudioOp::Upload(id));
        Ok(id)
    }

    fn play(&mut self, sound: BackendSound, _options: &PlaybackOptions) -> Result<Voice, AudioError> {
        let mut s = self.state.borrow_mut();
        if !s.sounds.contains(&sound) {
            return Err(AudioError::Backend(format!("sound {} not uploaded", sound.0)));
        }
        s.next_id += 1;
        let voice = Voice(s.next_id);
        s.playing.insert(voice);
        s.ops.push(AudioOp::Play(voice, sound));
        Ok(voice)
    }

    fn stop(&mut self, voice: Voice) {
        let mut s = self.state.borrow_mut();
        s.playing.remove(&voice);
        s.ops.push(AudioOp::Stop(voice));
    }

    fn is_playing(&self, voice: Voice) -> bool {
        self.state.borrow().playing.contains(&voice)
    }

    fn unload(&mut self, sound: BackendSound) {
        let mut s = self.state.borrow_mut();
        s.sounds.remove(&sound);
        s.ops.push(AudioOp::Unload(sound));
    }

    fn close(&mut self) {
        let mut s = self.state.borrow_mut();
        s.closed = true;
        s.ops.push(AudioOp::Close);
    }
}

impl NullAudioProbe {
    /// Every backend call so far, in order.
    pub fn ops(&self) -> Vec<AudioOp> {
        self.state.borrow().ops.clone()
    }

    /// Ends a voice as if its sound had played out.
    pub fn finish(&self, voice: Voice) {
        self.state.borrow_mut().playing.remove(&voice);
    }

    pub fn playing(&self) -> Vec<Voice> {
        self.state.borrow().playing.iter().copied().collect()
    }

    pub fn uploaded(&self) -> usize {
        self.state.borrow().sounds.len()
    }

    pub fn is_closed(&self) -> bool {
        self.state.borrow().closed
    }
}
