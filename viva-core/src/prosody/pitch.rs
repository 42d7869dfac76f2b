//! Autocorrelation pitch tracking.
//!
//! ## Algorithm
//!
//! 1. Slice the waveform into Hann-windowed frames at `hop` intervals.
//! 2. Per frame, compute the autocorrelation via FFT (zero-padded to 2×
//!    the window so the correlation is linear, not circular).
//! 3. Search the lag range `[sr/fmax, sr/fmin]` for the strongest peak,
//!    refine it with parabolic interpolation, and accept the frame as
//!    voiced when the normalized peak clears the clarity threshold.
//! 4. Candidates within a 5 % margin of either frequency bound are
//!    discarded as unreliable tracker output.
//!
//! Unvoiced frames are `None`, never 0 Hz — treating them as zero would
//! corrupt every slope/range statistic computed downstream.

use rustfft::{num_complex::Complex, FftPlanner};

use crate::audio::Waveform;
use crate::stats;

/// Normalized autocorrelation peak required to call a frame voiced.
const CLARITY_THRESHOLD: f32 = 0.30;

/// Frame RMS below this is treated as unvoiced regardless of clarity.
const ENERGY_FLOOR: f32 = 1e-4;

/// Margin applied to the `[fmin, fmax]` search bounds; estimates hugging
/// a bound are tracker artifacts more often than real pitch.
const BOUND_MARGIN: f64 = 0.05;

/// An ordered sequence of per-frame pitch estimates.
///
/// `f0_hz[i]` is `None` for unvoiced frames. Times are frame centers in
/// seconds.
#[derive(Debug, Clone)]
pub struct PitchTrack {
    pub times: Vec<f64>,
    pub f0_hz: Vec<Option<f64>>,
}

impl PitchTrack {
    pub fn voiced_count(&self) -> usize {
        self.f0_hz.iter().filter(|f| f.is_some()).count()
    }

    /// Median spacing between consecutive frame centers, in seconds.
    pub fn median_frame_spacing(&self) -> Option<f64> {
        if self.times.len() < 2 {
            return None;
        }
        let diffs: Vec<f64> = self.times.windows(2).map(|w| w[1] - w[0]).collect();
        Some(stats::percentile(&diffs, 50.0))
    }

    /// Linearly interpolate unvoiced gaps that lie *between* two voiced
    /// frames. Leading and trailing unvoiced runs are left as `None` —
    /// extrapolating past the first/last voiced frame would invent pitch.
    pub fn interpolate_gaps(&mut self) {
        let first = match self.f0_hz.iter().position(|f| f.is_some()) {
            Some(i) => i,
            None => return,
        };
        let last = self.f0_hz.iter().rposition(|f| f.is_some()).unwrap_or(first);

        let mut i = first;
        while i < last {
            if self.f0_hz[i + 1].is_some() {
                i += 1;
                continue;
            }
            // Gap starts at i+1; find the next voiced frame.
            let gap_end = (i + 2..=last)
                .find(|&j| self.f0_hz[j].is_some())
                .unwrap_or(last);
            let (t0, f0) = (self.times[i], self.f0_hz[i].unwrap_or(0.0));
            let (t1, f1) = (self.times[gap_end], self.f0_hz[gap_end].unwrap_or(f0));
            for j in i + 1..gap_end {
                let alpha = if t1 > t0 {
                    (self.times[j] - t0) / (t1 - t0)
                } else {
                    0.0
                };
                self.f0_hz[j] = Some(f0 + (f1 - f0) * alpha);
            }
            i = gap_end;
        }
    }

    /// Convert voiced frames to semitones relative to `ref_hz`.
    ///
    /// Pitch statistics are linear in log-frequency, not Hz; the reference
    /// only shifts the scale and cancels out of slopes and ranges.
    pub fn to_semitones(&self, ref_hz: f64) -> Vec<Option<f64>> {
        self.f0_hz
            .iter()
            .map(|f| f.map(|hz| 12.0 * (hz / ref_hz).log2()))
            .collect()
    }
}

/// Track pitch over a mono waveform, restricted to `[fmin, fmax]` Hz.
pub fn track_pitch(wave: &Waveform, fmin: f64, fmax: f64, hop: usize) -> PitchTrack {
    let sr = wave.sample_rate as f64;
    // Window long enough to hold at least two periods of fmin.
    let min_window = (2.0 * sr / fmin).ceil() as usize;
    let window = min_window.next_power_of_two();
    let fft_len = window * 2;

    let hop = hop.max(1);
    let mut planner = FftPlanner::<f32>::new();
    let fft_fwd = planner.plan_fft_forward(fft_len);
    let fft_inv = planner.plan_fft_inverse(fft_len);

    let lag_min = (sr / fmax).floor().max(1.0) as usize;
    let lag_max = ((sr / fmin).ceil() as usize).min(window - 1);

    let hann: Vec<f32> = (0..window)
        .map(|i| {
            let phase = std::f32::consts::PI * i as f32 / (window - 1) as f32;
            phase.sin() * phase.sin()
        })
        .collect();

    let mut times = Vec::new();
    let mut f0_hz = Vec::new();
    let mut buf = vec![Complex::new(0f32, 0f32); fft_len];

    let mut start = 0usize;
    while start + window <= wave.samples.len() {
        let frame = &wave.samples[start..start + window];
        times.push((start + window / 2) as f64 / sr);
        f0_hz.push(estimate_frame_f0(
            frame, &hann, &mut buf, &*fft_fwd, &*fft_inv, sr, fmin, fmax, lag_min, lag_max,
        ));
        start += hop;
    }

    PitchTrack { times, f0_hz }
}

#[allow(clippy::too_many_arguments)]
fn estimate_frame_f0(
    frame: &[f32],
    hann: &[f32],
    buf: &mut [Complex<f32>],
    fft_fwd: &dyn rustfft::Fft<f32>,
    fft_inv: &dyn rustfft::Fft<f32>,
    sr: f64,
    fmin: f64,
    fmax: f64,
    lag_min: usize,
    lag_max: usize,
) -> Option<f64> {
    let rms = {
        let sum_sq: f32 = frame.iter().map(|s| s * s).sum();
        (sum_sq / frame.len() as f32).sqrt()
    };
    if rms < ENERGY_FLOOR {
        return None;
    }

    // Windowed, zero-padded frame → linear autocorrelation via FFT.
    for (i, slot) in buf.iter_mut().enumerate() {
        let v = if i < frame.len() {
            frame[i] * hann[i]
        } else {
            0.0
        };
        *slot = Complex::new(v, 0.0);
    }
    fft_fwd.process(buf);
    for slot in buf.iter_mut() {
        let mag_sq = slot.norm_sqr();
        *slot = Complex::new(mag_sq, 0.0);
    }
    fft_inv.process(buf);

    let r0 = buf[0].re;
    if r0 <= f32::EPSILON {
        return None;
    }

    // Strongest normalized peak in the admissible lag range.
    let mut best_lag = 0usize;
    let mut best_val = f32::MIN;
    for lag in lag_min..=lag_max {
        let v = buf[lag].re / r0;
        if v > best_val {
            best_val = v;
            best_lag = lag;
        }
    }
    if best_val < CLARITY_THRESHOLD || best_lag == 0 {
        return None;
    }

    // Parabolic refinement around the integer-lag peak.
    let refined_lag = if best_lag > lag_min && best_lag < lag_max {
        let ym1 = buf[best_lag - 1].re / r0;
        let y0 = buf[best_lag].re / r0;
        let yp1 = buf[best_lag + 1].re / r0;
        let denom = ym1 - 2.0 * y0 + yp1;
        if denom.abs() > f32::EPSILON {
            let delta = 0.5 * (ym1 - yp1) / denom;
            best_lag as f64 + delta.clamp(-1.0, 1.0) as f64
        } else {
            best_lag as f64
        }
    } else {
        best_lag as f64
    };

    let f0 = sr / refined_lag;
    // Reject estimates hugging the search bounds.
    if f0 < fmin * (1.0 + BOUND_MARGIN) || f0 > fmax * (1.0 - BOUND_MARGIN) {
        return None;
    }
    Some(f0)
}

/// Centered moving average over a voiced span, window forced odd.
///
/// `None` entries (leading/trailing unvoiced runs) stay `None`. The window
/// shrinks symmetrically at span edges so the average stays centered.
pub fn smooth_semitones(semitones: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    let window = if window % 2 == 0 { window + 1 } else { window }.max(1);
    let half = window / 2;

    semitones
        .iter()
        .enumerate()
        .map(|(i, st)| {
            (*st)?;
            // Largest symmetric half-window fully inside the voiced run.
            let mut reach = half;
            for r in 1..=half {
                let left_ok = i >= r && semitones[i - r].is_some();
                let right_ok = i + r < semitones.len() && semitones[i + r].is_some();
                if !left_ok || !right_ok {
                    reach = r - 1;
                    break;
                }
            }
            let lo = i - reach;
            let hi = i + reach;
            let vals: Vec<f64> = semitones[lo..=hi].iter().filter_map(|v| *v).collect();
            Some(stats::mean(&vals))
        })
        .collect()
}
