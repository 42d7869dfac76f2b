//! Energy-based speech/silence segmentation.
//!
//! Frames whose RMS falls more than `top_db` below the loudest frame are
//! silent; contiguous speech frames are merged into intervals and the
//! remainder of the clip is reported as silence. The same frame pass also
//! yields the minimum frame RMS, a loudness-floor signal used as a feature
//! in its own right.

use crate::audio::Waveform;

/// Frame length in samples for the energy split.
const FRAME_LEN: usize = 512;

/// Hop between energy frames.
const FRAME_HOP: usize = 256;

/// Small floor so log of a digitally silent frame stays finite.
const DB_FLOOR: f64 = 1e-10;

/// Silence statistics for one waveform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SilenceStats {
    /// Seconds of the clip classified as non-speech.
    pub total_silence_sec: f64,
    /// Silence share of total duration, in [0, 100].
    pub percent_silence: f64,
    /// Minimum frame-level RMS across the clip.
    pub min_rms: f64,
}

/// Split `wave` at `top_db` below peak and report silence totals.
///
/// A clip shorter than one frame is treated as a single frame.
pub fn silence_stats(wave: &Waveform, top_db: f64) -> SilenceStats {
    let total_sec = wave.duration_secs();
    if wave.samples.is_empty() {
        return SilenceStats {
            total_silence_sec: 0.0,
            percent_silence: 0.0,
            min_rms: 0.0,
        };
    }

    let frame_rms = frame_rms_track(&wave.samples);
    let min_rms = frame_rms.iter().copied().fold(f64::INFINITY, f64::min);

    let peak_db = frame_rms
        .iter()
        .map(|r| to_db(*r))
        .fold(f64::NEG_INFINITY, f64::max);
    let threshold_db = peak_db - top_db;

    // Sum speech coverage in samples; frames overlap, so count each sample
    // once by extending the covered region.
    let mut speech_samples = 0usize;
    let mut covered_until = 0usize;
    for (i, rms) in frame_rms.iter().enumerate() {
        if to_db(*rms) <= threshold_db {
            continue;
        }
        let start = i * FRAME_HOP;
        let end = (start + FRAME_LEN).min(wave.samples.len());
        let effective_start = start.max(covered_until);
        if end > effective_start {
            speech_samples += end - effective_start;
            covered_until = end;
        }
    }

    let speech_sec = speech_samples as f64 / wave.sample_rate as f64;
    let total_silence_sec = (total_sec - speech_sec).max(0.0);
    let percent_silence = if total_sec > 0.0 {
        (total_silence_sec / total_sec * 100.0).clamp(0.0, 100.0)
    } else {
        0.0
    };

    SilenceStats {
        total_silence_sec,
        percent_silence,
        min_rms,
    }
}

fn frame_rms_track(samples: &[f32]) -> Vec<f64> {
    if samples.len() <= FRAME_LEN {
        return vec![rms(samples)];
    }
    let mut out = Vec::with_capacity(samples.len() / FRAME_HOP + 1);
    let mut start = 0usize;
    while start + FRAME_LEN <= samples.len() {
        out.push(rms(&samples[start..start + FRAME_LEN]));
        start += FRAME_HOP;
    }
    out
}

fn rms(samples: &[f32]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f64 = samples.iter().map(|s| (*s as f64) * (*s as f64)).sum();
    (sum_sq / samples.len() as f64).sqrt()
}

fn to_db(rms: f64) -> f64 {
    20.0 * rms.max(DB_FLOOR).log10()
}
