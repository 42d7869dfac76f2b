//! Sample-rate conversion using a rubato `FastFixedIn` resampler.
//!
//! Uploaded answers commonly arrive at 44.1 or 48 kHz; the analysis chain
//! runs at 16 kHz mono. Unlike a streaming capture path, a whole utterance
//! is available up front, so `resample_all` feeds rubato in fixed chunks
//! and zero-pads the tail, trimming the output back to the exact expected
//! length.

use rubato::{FastFixedIn, PolynomialDegree, Resampler};
use tracing::debug;

use crate::error::{Result, VivaError};

/// Input frame count per rubato call.
const CHUNK_SIZE: usize = 1024;

/// Resample a complete mono buffer from `from_rate` to `to_rate`.
///
/// Passthrough (a copy) when the rates already match.
pub fn resample_all(samples: &[f32], from_rate: u32, to_rate: u32) -> Result<Vec<f32>> {
    if from_rate == to_rate {
        return Ok(samples.to_vec());
    }
    if samples.is_empty() {
        return Ok(Vec::new());
    }

    let ratio = to_rate as f64 / from_rate as f64;

    let mut resampler = FastFixedIn::<f32>::new(
        ratio,
        1.0, // fixed ratio — no dynamic adjustment
        PolynomialDegree::Cubic,
        CHUNK_SIZE,
        1, // mono
    )
    .map_err(|e| VivaError::Resample(format!("resampler init: {e}")))?;

    let max_out = resampler.output_frames_max();
    let mut output_buf = vec![vec![0f32; max_out]; 1];
    let expected_len = (samples.len() as f64 * ratio).round() as usize;
    let mut out = Vec::with_capacity(expected_len + CHUNK_SIZE);

    let mut offset = 0;
    while offset < samples.len() {
        let end = (offset + CHUNK_SIZE).min(samples.len());
        let chunk = &samples[offset..end];

        if chunk.len() == CHUNK_SIZE {
            let (_, produced) = resampler
                .process_into_buffer(&[chunk], &mut output_buf, None)
                .map_err(|e| VivaError::Resample(format!("resampler process: {e}")))?;
            out.extend_from_slice(&output_buf[0][..produced]);
        } else {
            // Tail: zero-pad to a full chunk, trim after the loop.
            let mut padded = vec![0f32; CHUNK_SIZE];
            padded[..chunk.len()].copy_from_slice(chunk);
            let (_, produced) = resampler
                .process_into_buffer(&[padded.as_slice()], &mut output_buf, None)
                .map_err(|e| VivaError::Resample(format!("resampler process: {e}")))?;
            out.extend_from_slice(&output_buf[0][..produced]);
        }
        offset = end;
    }

    // Rubato's polynomial filter has a short settling delay; one extra
    // zero chunk flushes the remaining real samples out of it.
    let flush = vec![0f32; CHUNK_SIZE];
    let (_, produced) = resampler
        .process_into_buffer(&[flush.as_slice()], &mut output_buf, None)
        .map_err(|e| VivaError::Resample(format!("resampler flush: {e}")))?;
    out.extend_from_slice(&output_buf[0][..produced]);

    out.truncate(expected_len);
    debug!(
        from_rate,
        to_rate,
        in_len = samples.len(),
        out_len = out.len(),
        "resampled waveform"
    );
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passthrough_identity() {
        let samples: Vec<f32> = (0..480).map(|i| i as f32 * 0.001).collect();
        let out = resample_all(&samples, 16_000, 16_000).unwrap();
        assert_eq!(out, samples);
    }

    #[test]
    fn empty_input_is_empty_output() {
        let out = resample_all(&[], 48_000, 16_000).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn downsample_48k_to_16k_length() {
        let samples = vec![0.25f32; 48_000];
        let out = resample_all(&samples, 48_000, 16_000).unwrap();
        assert_eq!(out.len(), 16_000);
    }

    #[test]
    fn upsample_8k_to_16k_length() {
        let samples = vec![0.1f32; 4_000];
        let out = resample_all(&samples, 8_000, 16_000).unwrap();
        assert_eq!(out.len(), 8_000);
    }

    #[test]
    fn sine_survives_resampling() {
        // 100 Hz sine at 48 kHz should stay roughly unit-amplitude at 16 kHz.
        let samples: Vec<f32> = (0..48_000)
            .map(|i| (2.0 * std::f32::consts::PI * 100.0 * i as f32 / 48_000.0).sin())
            .collect();
        let out = resample_all(&samples, 48_000, 16_000).unwrap();
        let peak = out.iter().fold(0f32, |m, s| m.max(s.abs()));
        assert!(peak > 0.9 && peak <= 1.05, "peak={peak}");
    }
}
