use crate::error::AudioError;

/// What happens when no audio device can be opened.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum AudioMode {
    /// Startup fails.
    Required,
    /// A warning is logged and the engine runs with a closed context.
    #[default]
    Optional,
    /// No device is opened at all.
    Disabled,
}

#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum AudioBackendKind {
    /// Default output device through kira/cpal.
    #[default]
    Device,
    /// Accepts everything, plays nothing.
    Null,
}

#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct AudioConfig {
    pub mode: AudioMode,
    pub backend: AudioBackendKind,
}

impl AudioConfig {
    pub fn with_mode(mut self, mode: AudioMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_backend(mut self, backend: AudioBackendKind) -> Self {
        self.backend = backend;
        self
    }
}

/// Per-playback settings.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PlaybackOptions {
    pub looping: bool,
    /// Linear gain in `[0, 1]`.
    pub gain: f32,
    /// Playback rate multiplier, `> 0`.
    pub pitch: f32,
}

impl Default for PlaybackOptions {
    fn default() -> Self {
        Self {
            looping: false,
            gain: 1.0,
            pitch: 1.0,
        }
    }
}

impl PlaybackOptions {
    pub fn looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    pub fn with_gain(mut self, gain: f32) -> Self {
        self.gain = gain;
        self
    }

    pub fn with_pitch(mut self, pitch: f32) -> Self {
        self.pitch = pitch;
        self
    }

    pub fn validate(&self) -> Result<(), AudioError> {
        if !(0.0..=1.0).contains(&self.gain) {
            return Err(AudioError::InvalidPlaybackOptions(format!(
                "gain {} outside [0, 1]",
                self.gain
            )));
        }
        if !(self.pitch.is_finite() && self.pitch > 0.0) {
            return Err(AudioError::InvalidPlaybackOptions(format!(
                "pitch {} must be positive",
                self.pitch
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validates_gain_and_pitch() {
        assert!(PlaybackOptions::default().validate().is_ok());
        assert!(PlaybackOptions::default().with_gain(0.0).validate().is_ok());
        for bad in [
            PlaybackOptions::default().with_gain(1.5),
            PlaybackOptions::default().with_gain(-0.1),
            PlaybackOptions::default().with_gain(f32::NAN),
            PlaybackOptions::default().with_pitch(0.0),
            PlaybackOptions::default().with_pitch(f32::INFINITY),
        ] {
            assert!(matches!(
                bad.validate(),
                Err(AudioError::InvalidPlaybackOptions(_))
            ));
        }
    }
}
