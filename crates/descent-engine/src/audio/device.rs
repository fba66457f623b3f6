use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use kira::sound::PlaybackState;
use kira::sound::static_sound::{StaticSoundData, StaticSoundHandle, StaticSoundSettings};
use kira::{AudioManager, AudioManagerSettings, Decibels, DefaultBackend, Frame, PlaybackRate, Tween};

use crate::error::AudioError;

use super::backend::{AudioBackend, BackendSound, Voice};
use super::config::PlaybackOptions;
use super::decode::DecodedSound;

// At most one device-backed context per process.
static DEVICE_OPEN: AtomicBool = AtomicBool::new(false);

/// Default output device through kira (cpal).
pub struct KiraBackend {
    manager: Option<AudioManager<DefaultBackend>>,
    sounds: HashMap<BackendSound, StaticSoundData>,
    voices: HashMap<Voice, StaticSoundHandle>,
    next_id: u64,
}

impl KiraBackend {
    /// Opens the default output device.
    pub fn open() -> Result<Self, AudioError> {
        if DEVICE_OPEN
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(AudioError::Init(
                "an audio device is already open in this process".to_string(),
            ));
        }

        let manager = AudioManager::<DefaultBackend>::new(AudioManagerSettings::default())
            .map_err(|e| {
                DEVICE_OPEN.store(false, Ordering::Release);
                AudioError::Init(e.to_string())
            })?;

        log::info!("audio device opened");
        Ok(Self {
            manager: Some(manager),
            sounds: HashMap::new(),
            voices: HashMap::new(),
            next_id: 0,
        })
    }

    fn next(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

fn to_frames(sound: &DecodedSound) -> Arc<[Frame]> {
    let channels = usize::from(sound.channels.max(1));
    sound
        .samples
        .chunks_exact(channels)
        .map(|c| match c {
            [mono] => Frame::from_mono(*mono),
            [left, right, ..] => Frame {
                left: *left,
                right: *right,
            },
            [] => Frame::ZERO,
        })
        .collect()
}

fn gain_to_decibels(gain: f32) -> Decibels {
    if gain <= 0.0 {
        Decibels::SILENCE
    } else {
        Decibels(20.0 * gain.log10())
    }
}

impl AudioBackend for KiraBackend {
    fn name(&self) -> &'static str {
        "kira"
    }

    fn upload(&mut self, sound: &DecodedSound) -> Result<BackendSound, AudioError> {
        let data = StaticSoundData {
            sample_rate: sound.sample_rate,
            frames: to_frames(sound),
            settings: StaticSoundSettings::default(),
            slice: None,
        };
        let id = BackendSound(self.next());
        self.sounds.insert(id, data);
        Ok(id)
    }

    fn play(&mut self, sound: BackendSound, options: &PlaybackOptions) -> Result<Voice, AudioError> {
        let data = self
            .sounds
            .get(&sound)
            .ok_or_else(|| AudioError::Backend(format!("sound {} not uploaded", sound.0)))?;
        let mut data = data
            .volume(gain_to_decibels(options.gain))
            .playback_rate(PlaybackRate(f64::from(options.pitch)));
        if options.looping {
            data = data.loop_region(0.0..);
        }

        let manager = self.manager.as_mut().ok_or(AudioError::ContextClosed)?;
        let handle = manager
            .play(data)
            .map_err(|e| AudioError::Backend(format!("{e:?}")))?;
        let voice = Voice(self.next());
        self.voices.insert(voice, handle);
        Ok(voice)
    }

    fn stop(&mut self, voice: Voice) {
        if let Some(mut handle) = self.voices.remove(&voice) {
            handle.stop(Tween::default());
        }
    }

    fn is_playing(&self, voice: Voice) -> bool {
        self.voices
            .get(&voice)
            .is_some_and(|h| h.state() != PlaybackState::Stopped)
    }

    fn unload(&mut self, sound: BackendSound) {
        self.sounds.remove(&sound);
    }

    fn close(&mut self) {
        for (_, mut handle) in self.voices.drain() {
            handle.stop(Tween::default());
        }
        self.sounds.clear();
        if self.manager.take().is_some() {
            DEVICE_OPEN.store(false, Ordering::Release);
            log::info!("audio device closed");
        }
    }
}

impl Drop for KiraBackend {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gain_maps_to_decibels() {
        assert_eq!(gain_to_decibels(1.0), Decibels(0.0));
        assert_eq!(gain_to_decibels(0.0), Decibels::SILENCE);
        assert!((gain_to_decibels(0.5).0 + 6.0206).abs() < 1e-3);
    }

    #[test]
    fn interleaved_samples_become_frames() {
        let stereo = DecodedSound {
            sample_rate: 48_000,
            channels: 2,
            samples: vec![0.1, 0.2, 0.3, 0.4].into(),
        };
        let frames = to_frames(&stereo);
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1], Frame { left: 0.3, right: 0.4 });

        let mono = DecodedSound {
            sample_rate: 48_000,
            channels: 1,
            samples: vec![0.5].into(),
        };
        assert_eq!(to_frames(&mono)[0], Frame::from_mono(0.5));
    }
}
