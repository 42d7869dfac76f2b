//! Waveform ingestion and normalization.
//!
//! Answers arrive as uploaded audio files at arbitrary sample rates and
//! channel counts. Everything downstream (pitch tracking, silence split)
//! assumes mono f32 at one canonical rate, so normalization happens here,
//! before any frequency analysis.

pub mod resample;

use std::io::Read;
use std::path::Path;

use crate::error::{Result, VivaError};

/// Canonical analysis sample rate (Hz).
pub const CANONICAL_SAMPLE_RATE: u32 = 16_000;

/// A mono PCM waveform at a known sample rate.
///
/// Ownership is transient: loaded per submission, dropped after feature
/// extraction.
#[derive(Debug, Clone)]
pub struct Waveform {
    /// Mono f32 samples in [-1.0, 1.0].
    pub samples: Vec<f32>,
    /// Sample rate in Hz.
    pub sample_rate: u32,
}

impl Waveform {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// Decode a WAV file from disk. Stereo is downmixed to mono.
    pub fn from_wav_file(path: &Path) -> Result<Self> {
        let reader = hound::WavReader::open(path)
            .map_err(|e| VivaError::UnreadableAudio(format!("{}: {e}", path.display())))?;
        Self::from_wav(reader)
    }

    /// Decode a WAV byte stream. Stereo is downmixed to mono.
    pub fn from_wav_reader<R: Read>(reader: R) -> Result<Self> {
        let reader = hound::WavReader::new(reader)
            .map_err(|e| VivaError::UnreadableAudio(e.to_string()))?;
        Self::from_wav(reader)
    }

    fn from_wav<R: Read>(mut reader: hound::WavReader<R>) -> Result<Self> {
        let spec = reader.spec();
        let channels = spec.channels.max(1) as usize;

        let interleaved: Vec<f32> = match (spec.sample_format, spec.bits_per_sample) {
            (hound::SampleFormat::Float, 32) => reader
                .samples::<f32>()
                .collect::<std::result::Result<_, _>>()
                .map_err(|e| VivaError::UnreadableAudio(e.to_string()))?,
            (hound::SampleFormat::Int, bits) => {
                let scale = 1.0 / (1i64 << (bits - 1)) as f32;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|v| v as f32 * scale))
                    .collect::<std::result::Result<_, _>>()
                    .map_err(|e| VivaError::UnreadableAudio(e.to_string()))?
            }
            (fmt, bits) => {
                return Err(VivaError::UnreadableAudio(format!(
                    "unsupported WAV format: {fmt:?} @ {bits} bits"
                )))
            }
        };

        let samples = downmix(&interleaved, channels);
        if samples.is_empty() {
            return Err(VivaError::UnreadableAudio("WAV contains no samples".into()));
        }

        Ok(Self::new(samples, spec.sample_rate))
    }

    /// Resample to the canonical analysis rate if needed. Mono is assumed.
    pub fn to_canonical_rate(&self) -> Result<Self> {
        if self.sample_rate == CANONICAL_SAMPLE_RATE {
            return Ok(self.clone());
        }
        let resampled =
            resample::resample_all(&self.samples, self.sample_rate, CANONICAL_SAMPLE_RATE)?;
        Ok(Self::new(resampled, CANONICAL_SAMPLE_RATE))
    }

    /// Returns the duration of this waveform in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Average interleaved channels down to mono.
fn downmix(interleaved: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return interleaved.to_vec();
    }
    interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}
