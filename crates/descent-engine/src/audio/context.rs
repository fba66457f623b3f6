use std::fmt;
use std::time::Duration;

use slotmap::{SlotMap, new_key_type};

use crate::error::AudioError;

use super::backend::{AudioBackend, BackendSound, NullAudioBackend, Voice};
use super::config::{AudioBackendKind, AudioConfig, AudioMode, PlaybackOptions};
use super::decode::{decode_sound, DecodedSound};
use super::device::KiraBackend;

new_key_type! {
    /// Decoded sound data, immutable after load.
    pub struct SoundBuffer;
    /// One playback of a [`SoundBuffer`].
    pub struct SoundSource;
}

struct BufferEntry {
    sound: BackendSound,
    sample_rate: u32,
    channels: u16,
    duration: Duration,
}

struct SourceEntry {
    buffer: SoundBuffer,
    voice: Voice,
    looping: bool,
}

/// Owns the audio device and every buffer and source played on it.
///
/// A context without a backend is "closed": every call fails with
/// [`AudioError::ContextClosed`]. That is the state after `shutdown`, and
/// the state the engine runs in when optional audio is unavailable.
pub struct AudioContext {
    backend: Option<Box<dyn AudioBackend>>,
    buffers: SlotMap<SoundBuffer, BufferEntry>,
    sources: SlotMap<SoundSource, SourceEntry>,
}

impl fmt::Debug for AudioContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioContext")
            .field("backend", &self.backend_name())
            .field("buffers", &self.buffers.len())
            .field("sources", &self.sources.len())
            .finish()
    }
}

impl AudioContext {
    /// Opens audio according to `config`.
    ///
    /// Only fails in [`AudioMode::Required`]; optional audio that cannot be
    /// opened yields a closed context.
    pub fn init(config: &AudioConfig) -> Result<Self, AudioError> {
        if config.mode == AudioMode::Disabled {
            log::info!("audio disabled");
            return Ok(Self::closed());
        }

        let backend: Result<Box<dyn AudioBackend>, AudioError> = match config.backend {
            AudioBackendKind::Device => KiraBackend::open().map(|b| Box::new(b) as _),
            AudioBackendKind::Null => Ok(Box::new(NullAudioBackend::new())),
        };

        match (backend, config.mode) {
            (Ok(backend), _) => Ok(Self::with_backend(backend)),
            (Err(e), AudioMode::Required) => {
                log::error!("{e}");
                Err(e)
            }
            (Err(e), _) => {
                log::warn!("{e}; continuing without audio");
                Ok(Self::closed())
            }
        }
    }

    pub fn with_backend(backend: Box<dyn AudioBackend>) -> Self {
        log::debug!("audio context opened on {} backend", backend.name());
        Self {
            backend: Some(backend),
            buffers: SlotMap::with_key(),
            sources: SlotMap::with_key(),
        }
    }

    pub fn closed() -> Self {
        Self {
            backend: None,
            buffers: SlotMap::with_key(),
            sources: SlotMap::with_key(),
        }
    }

    pub fn is_open(&self) -> bool {
        self.backend.is_some()
    }

    pub fn backend_name(&self) -> Option<&'static str> {
        self.backend.as_ref().map(|b| b.name())
    }

    /// Decodes `bytes` and uploads the result. Nothing is created on failure.
    pub fn load_sound(&mut self, bytes: &[u8]) -> Result<SoundBuffer, AudioError> {
        self.backend()?;
        let decoded = decode_sound(bytes)?;
        self.load_decoded(&decoded)
    }

    /// Uploads sound data decoded elsewhere (e.g. on a background thread).
    pub fn load_decoded(&mut self, sound: &DecodedSound) -> Result<SoundBuffer, AudioError> {
        let handle = self.backend()?.upload(sound)?;
        let buffer = self.buffers.insert(BufferEntry {
            sound: handle,
            sample_rate: sound.sample_rate,
            channels: sound.channels,
            duration: sound.duration(),
        });
        log::debug!(
            "loaded sound {buffer:?} ({} ch, {} Hz, {:.2}s)",
            sound.channels,
            sound.sample_rate,
            sound.duration().as_secs_f32()
        );
        Ok(buffer)
    }

    pub fn duration(&self, buffer: SoundBuffer) -> Result<Duration, AudioError> {
        self.buffer(buffer).map(|b| b.duration)
    }

    /// `(channels, sample_rate)` of a loaded buffer.
    pub fn format(&self, buffer: SoundBuffer) -> Result<(u16, u32), AudioError> {
        self.buffer(buffer).map(|b| (b.channels, b.sample_rate))
    }

    pub fn play(
        &mut self,
        buffer: SoundBuffer,
        options: PlaybackOptions,
    ) -> Result<SoundSource, AudioError> {
        self.backend()?;
        options.validate()?;
        let sound = self.buffer(buffer)?.sound;

        let voice = self.backend()?.play(sound, &options)?;
        Ok(self.sources.insert(SourceEntry {
            buffer,
            voice,
            looping: options.looping,
        }))
    }

    pub fn stop(&mut self, source: SoundSource) -> Result<(), AudioError> {
        self.backend()?;
        let entry = self
            .sources
            .remove(source)
            .ok_or(AudioError::UnknownSource)?;
        self.backend()?.stop(entry.voice);
        Ok(())
    }

    /// False once a one-shot source has played out. Finished sources stay
    /// known until `collect_finished` or `stop`.
    pub fn is_playing(&self, source: SoundSource) -> Result<bool, AudioError> {
        let backend = self.backend.as_ref().ok_or(AudioError::ContextClosed)?;
        let entry = self.sources.get(source).ok_or(AudioError::UnknownSource)?;
        Ok(backend.is_playing(entry.voice))
    }

    /// Stops every source playing `buffer`, then frees it.
    pub fn release_sound(&mut self, buffer: SoundBuffer) -> Result<(), AudioError> {
        let Self {
            backend,
            buffers,
            sources,
        } = self;
        let backend = backend.as_mut().ok_or(AudioError::ContextClosed)?;
        let entry = buffers.remove(buffer).ok_or(AudioError::UnknownBuffer)?;
        sources.retain(|_, s| {
            if s.buffer == buffer {
                backend.stop(s.voice);
                false
            } else {
                true
            }
        });
        backend.unload(entry.sound);
        Ok(())
    }

    /// Forgets one-shot sources that have finished. Returns how many.
    pub fn collect_finished(&mut self) -> usize {
        let Some(backend) = self.backend.as_ref() else {
            return 0;
        };
        let before = self.sources.len();
        self.sources
            .retain(|_, s| s.looping || backend.is_playing(s.voice));
        before - self.sources.len()
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    pub fn buffer_count(&self) -> usize {
        self.buffers.len()
    }

    /// Stops every source, frees every buffer, then closes the device.
    /// Idempotent.
    pub fn shutdown(&mut self) {
        let Some(mut backend) = self.backend.take() else {
            log::debug!("audio context already closed");
            return;
        };

        let sources = self.sources.len();
        for (_, source) in self.sources.drain() {
            backend.stop(source.voice);
        }
        let buffers = self.buffers.len();
        for (_, buffer) in self.buffers.drain() {
            backend.unload(buffer.sound);
        }
        backend.close();
        log::info!("audio shut down ({sources} source(s) stopped, {buffers} buffer(s) released)");
    }

    fn backend(&mut self) -> Result<&mut Box<dyn AudioBackend>, AudioError> {
        self.backend.as_mut().ok_or(AudioError::ContextClosed)
    }

    fn buffer(&self, buffer: SoundBuffer) -> Result<&BufferEntry, AudioError> {
        self.buffers.get(buffer).ok_or(AudioError::UnknownBuffer)
    }
}

impl Drop for AudioContext {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::AudioOp;
    use crate::audio::decode::tests::wav_bytes;

    fn null_context() -> (AudioContext, crate::audio::NullAudioProbe) {
        let backend = NullAudioBackend::new();
        let probe = backend.probe();
        (AudioContext::with_backend(Box::new(backend)), probe)
    }

    #[test]
    fn malformed_bytes_create_nothing() {
        let (mut audio, probe) = null_context();
        assert!(matches!(
            audio.load_sound(b"RIFF garbage"),
            Err(AudioError::Decode(_))
        ));
        assert_eq!(audio.buffer_count(), 0);
        assert_eq!(probe.uploaded(), 0);
    }

    #[test]
    fn shutdown_stops_sources_before_closing() {
        let (mut audio, probe) = null_context();
        let buffer = audio.load_sound(&wav_bytes(1, 8000, 800)).unwrap();
        assert_eq!(audio.duration(buffer).unwrap(), Duration::from_millis(100));
        let source = audio.play(buffer, PlaybackOptions::default()).unwrap();
        assert_eq!(audio.is_playing(source), Ok(true));

        audio.shutdown();
        let ops = probe.ops();
        let stop = ops.iter().position(|op| matches!(op, AudioOp::Stop(_))).unwrap();
        let unload = ops.iter().position(|op| matches!(op, AudioOp::Unload(_))).unwrap();
        let close = ops.iter().position(|op| *op == AudioOp::Close).unwrap();
        assert!(stop < unload && unload < close);
        assert!(probe.playing().is_empty());

        assert_eq!(audio.play(buffer, PlaybackOptions::default()), Err(AudioError::ContextClosed));
        assert_eq!(audio.is_playing(source), Err(AudioError::ContextClosed));
        assert_eq!(audio.load_sound(&wav_bytes(1, 8000, 8)), Err(AudioError::ContextClosed));

        audio.shutdown();
        assert_eq!(probe.ops().iter().filter(|op| **op == AudioOp::Close).count(), 1);
    }

    #[test]
    fn invalid_options_are_rejected_before_playback() {
        let (mut audio, probe) = null_context();
        let buffer = audio.load_sound(&wav_bytes(1, 8000, 80)).unwrap();
        let err = audio
            .play(buffer, PlaybackOptions::default().with_pitch(-1.0))
            .unwrap_err();
        assert!(matches!(err, AudioError::InvalidPlaybackOptions(_)));
        assert!(probe.playing().is_empty());
    }

    #[test]
    fn finished_one_shots_are_collected() {
        let (mut audio, probe) = null_context();
        let buffer = audio.load_sound(&wav_bytes(2, 8000, 80)).unwrap();
        let once = audio.play(buffer, PlaybackOptions::default()).unwrap();
        let looped = audio
            .play(buffer, PlaybackOptions::default().looping(true))
            .unwrap();

        for voice in probe.playing() {
            probe.finish(voice);
        }
        assert_eq!(audio.is_playing(once), Ok(false));
        assert_eq!(audio.collect_finished(), 1);
        assert_eq!(audio.is_playing(once), Err(AudioError::UnknownSource));
        assert_eq!(audio.stop(looped), Ok(()));
        assert_eq!(audio.stop(looped), Err(AudioError::UnknownSource));
    }

    #[test]
    fn releasing_a_buffer_stops_its_sources() {
        let (mut audio, probe) = null_context();
        let a = audio.load_sound(&wav_bytes(1, 8000, 80)).unwrap();
        let b = audio.load_sound(&wav_bytes(1, 8000, 80)).unwrap();
        audio.play(a, PlaybackOptions::default()).unwrap();
        audio.play(a, PlaybackOptions::default()).unwrap();
        let keep = audio.play(b, PlaybackOptions::default()).unwrap();

        audio.release_sound(a).unwrap();
        assert_eq!(audio.source_count(), 1);
        assert_eq!(audio.is_playing(keep), Ok(true));
        assert_eq!(probe.uploaded(), 1);
        assert_eq!(audio.release_sound(a), Err(AudioError::UnknownBuffer));
        assert_eq!(
            audio.play(a, PlaybackOptions::default()),
            Err(AudioError::UnknownBuffer)
        );
    }

    #[test]
    fn optional_audio_degrades_to_closed() {
        let audio = AudioContext::init(&AudioConfig::default().with_mode(AudioMode::Disabled)).unwrap();
        assert!(!audio.is_open());
        let audio = AudioContext::init(&AudioConfig::default().with_backend(AudioBackendKind::Null)).unwrap();
        assert_eq!(audio.backend_name(), Some("null"));
    }
}
