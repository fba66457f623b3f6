use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::error::DecodeError;

/// Fully decoded PCM, interleaved `f32` samples. Immutable and cheap to clone.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedSound {
    pub sample_rate: u32,
    pub channels: u16,
    pub samples: Arc<[f32]>,
}

impl DecodedSound {
    pub fn frames(&self) -> usize {
        self.samples.len() / usize::from(self.channels.max(1))
    }

    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.frames() as f64 / f64::from(self.sample_rate))
    }
}

/// Decodes any container/codec symphonia knows into PCM.
///
/// Corrupt packets are skipped; a stream without a single decodable frame
/// is an error. Safe to call off the engine thread.
pub fn decode_sound(bytes: &[u8]) -> Result<DecodedSound, DecodeError> {
    if bytes.is_empty() {
        return Err(DecodeError::new("audio", "no data"));
    }

    let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes.to_vec())), Default::default());
    let probed = symphonia::default::get_probe()
        .format(
            &Hint::new(),
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| DecodeError::new("audio", e.to_string()))?;
    let mut reader = probed.format;

    let track = reader
        .default_track()
        .ok_or_else(|| DecodeError::new("audio", "no audio track"))?;
    let track_id = track.id;
    let mut sample_rate = track.codec_params.sample_rate.unwrap_or(0);
    let mut channels = track
        .codec_params
        .channels
        .map_or(0, |c| c.count() as u16);

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| DecodeError::new("audio", e.to_string()))?;

    let mut samples = Vec::<f32>::new();
    let mut skipped = 0usize;
    loop {
        let packet = match reader.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(_)) | Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(DecodeError::new("audio", e.to_string())),
        };
        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                sample_rate = spec.rate;
                channels = spec.channels.count() as u16;
                let mut buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                buf.copy_interleaved_ref(decoded);
                samples.extend_from_slice(buf.samples());
            }
            Err(SymphoniaError::DecodeError(e)) => {
                skipped += 1;
                log::debug!("skipping corrupt audio packet: {e}");
            }
            Err(e) => return Err(DecodeError::new("audio", e.to_string())),
        }
    }

    if samples.is_empty() || channels == 0 || sample_rate == 0 {
        return Err(DecodeError::new("audio", "stream contains no decodable frames"));
    }
    if skipped > 0 {
        log::warn!("decoded audio with {skipped} corrupt packet(s) skipped");
    }

    Ok(DecodedSound {
        sample_rate,
        channels,
        samples: samples.into(),
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// 16-bit PCM WAV of a sine tone.
    pub(crate) fn wav_bytes(channels: u16, sample_rate: u32, frames: usize) -> Vec<u8> {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            for i in 0..frames {
                let t = i as f32 / sample_rate as f32;
                let s = (t * 440.0 * std::f32::consts::TAU).sin();
                for _ in 0..channels {
                    writer.write_sample((s * i16::MAX as f32 * 0.5) as i16).unwrap();
                }
            }
            writer.finalize().unwrap();
        }
        cursor.into_inner()
    }

    #[test]
    fn decodes_wav() {
        let sound = decode_sound(&wav_bytes(2, 22_050, 2205)).unwrap();
        assert_eq!(sound.channels, 2);
        assert_eq!(sound.sample_rate, 22_050);
        assert_eq!(sound.frames(), 2205);
        assert!((sound.duration().as_secs_f64() - 0.1).abs() < 1e-6);
        assert!(sound.samples.iter().all(|s| (-1.0..=1.0).contains(s)));
    }

    #[test]
    fn rejects_garbage() {
        assert!(decode_sound(b"").is_err());
        let err = decode_sound(b"definitely not a sound file").unwrap_err();
        assert_eq!(err.what, "audio");
    }

    #[test]
    fn rejects_truncated_header() {
        let bytes = wav_bytes(1, 8000, 100);
        assert!(decode_sound(&bytes[..20]).is_err());
    }
}
