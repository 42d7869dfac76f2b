//! Acoustic (prosodic) feature extraction.
//!
//! Turns a normalized waveform into the fixed set of prosodic scalars the
//! fusion layer expects: pitch range and slopes, silence totals, and a
//! loudness floor. Pitch-derived fields are `Option` — a clip with fewer
//! than 2 voiced frames yields "missing", which downstream code must not
//! confuse with flat pitch.

pub mod pitch;
pub mod silence;

use tracing::debug;

use crate::audio::Waveform;
use crate::error::{Result, VivaError};
use crate::stats;

/// Semitone reference frequency (A1). Cancels out of slopes and ranges.
const SEMITONE_REF_HZ: f64 = 55.0;

/// Tuning for the acoustic extractor.
#[derive(Debug, Clone)]
pub struct AcousticConfig {
    /// Lower pitch search bound (Hz). Default: 50.
    pub fmin: f64,
    /// Upper pitch search bound (Hz). Default: 600.
    pub fmax: f64,
    /// Pitch frame hop in samples. Default: 256.
    pub hop: usize,
    /// Moving-average smoothing window in milliseconds. Default: 30.
    pub smooth_ms: f64,
    /// Length of the utterance-final slope window in seconds. Default: 1.5.
    pub end_window_s: f64,
    /// Silence threshold in dB below peak. Default: 40.
    pub top_db: f64,
    /// Use 5th/95th percentiles for min/max pitch instead of raw extremes.
    pub robust: bool,
}

impl Default for AcousticConfig {
    fn default() -> Self {
        Self {
            fmin: 50.0,
            fmax: 600.0,
            hop: 256,
            smooth_ms: 30.0,
            end_window_s: 1.5,
            top_db: 40.0,
            robust: false,
        }
    }
}

/// Prosodic scalars for one spoken answer.
///
/// Pitch-derived fields are `None` when the clip had fewer than 2 voiced
/// frames — insufficient signal, not zero.
#[derive(Debug, Clone, PartialEq)]
pub struct AcousticFeatures {
    pub min_f0_hz: Option<f64>,
    pub max_f0_hz: Option<f64>,
    pub range_f0_hz: Option<f64>,
    /// Absolute overall semitone-per-second slope of the smoothed track.
    pub abs_slope_f0_st_per_s: Option<f64>,
    /// Slope over the last `end_window_s` seconds (signed: fall vs rise).
    pub end_slope_f0_st_per_s: Option<f64>,
    /// Number of voiced frames the pitch statistics are based on.
    pub n_f0_used: usize,
    pub total_silence_sec: f64,
    pub percent_silence: f64,
    pub min_rms: f64,
}

/// Extract prosodic features from a mono waveform.
///
/// The waveform should already be at the canonical analysis rate; see
/// [`Waveform::to_canonical_rate`].
///
/// # Errors
/// `VivaError::InvalidInput` when the waveform is empty.
pub fn extract_acoustic(wave: &Waveform, cfg: &AcousticConfig) -> Result<AcousticFeatures> {
    if wave.is_empty() {
        return Err(VivaError::InvalidInput("waveform is empty".into()));
    }

    let sil = silence::silence_stats(wave, cfg.top_db);

    let mut track = pitch::track_pitch(wave, cfg.fmin, cfg.fmax, cfg.hop);
    let n_f0_used = track.voiced_count();

    if n_f0_used < 2 {
        debug!(n_f0_used, "too few voiced frames — pitch features missing");
        return Ok(AcousticFeatures {
            min_f0_hz: None,
            max_f0_hz: None,
            range_f0_hz: None,
            abs_slope_f0_st_per_s: None,
            end_slope_f0_st_per_s: None,
            n_f0_used,
            total_silence_sec: sil.total_silence_sec,
            percent_silence: sil.percent_silence,
            min_rms: sil.min_rms,
        });
    }

    track.interpolate_gaps();

    let voiced_hz: Vec<f64> = track.f0_hz.iter().filter_map(|f| *f).collect();
    let (min_f0, max_f0) = if cfg.robust {
        (
            stats::percentile(&voiced_hz, 5.0),
            stats::percentile(&voiced_hz, 95.0),
        )
    } else {
        (
            voiced_hz.iter().copied().fold(f64::INFINITY, f64::min),
            voiced_hz.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        )
    };

    let spacing = track
        .median_frame_spacing()
        .unwrap_or(cfg.hop as f64 / wave.sample_rate as f64);
    let window_frames = ((cfg.smooth_ms / 1000.0) / spacing).round().max(1.0) as usize;

    let semitones = track.to_semitones(SEMITONE_REF_HZ);
    let smoothed = pitch::smooth_semitones(&semitones, window_frames);

    let (times, values): (Vec<f64>, Vec<f64>) = track
        .times
        .iter()
        .zip(&smoothed)
        .filter_map(|(t, st)| st.map(|v| (*t, v)))
        .unzip();

    let abs_slope = stats::linear_slope(&times, &values).map(f64::abs);

    let end_slope = match times.last() {
        Some(&last_t) => {
            let cutoff = last_t - cfg.end_window_s;
            let (end_t, end_v): (Vec<f64>, Vec<f64>) = times
                .iter()
                .zip(&values)
                .filter(|(t, _)| **t >= cutoff)
                .map(|(t, v)| (*t, *v))
                .unzip();
            stats::linear_slope(&end_t, &end_v)
        }
        None => None,
    };

    debug!(
        n_f0_used,
        min_f0 = format_args!("{min_f0:.1}"),
        max_f0 = format_args!("{max_f0:.1}"),
        window_frames,
        percent_silence = format_args!("{:.1}", sil.percent_silence),
        "acoustic features extracted"
    );

    Ok(AcousticFeatures {
        min_f0_hz: Some(min_f0),
        max_f0_hz: Some(max_f0),
        range_f0_hz: Some(max_f0 - min_f0),
        abs_slope_f0_st_per_s: abs_slope,
        end_slope_f0_st_per_s: end_slope,
        n_f0_used,
        total_silence_sec: sil.total_silence_sec,
        percent_silence: sil.percent_silence,
        min_rms: sil.min_rms,
    })
}
