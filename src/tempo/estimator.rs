//! Autocorrelation-based BPM estimation from neural activations
//!
//! Estimates tempo directly from the raw beat/downbeat activation curves
//! instead of timing discrete beat events, which avoids quantisation error
//! from thresholded detections.
//!
//! # Algorithm
//!
//! 1. Sum beat + downbeat activations into one periodicity signal.
//! 2. Compute its linear autocorrelation via FFT: `ACF = IFFT(|FFT(s)|^2)`
//!    with zero-padding to the next power of two >= 2N.
//! 3. Pick the strongest lag in the 60-180 BPM range.
//! 4. Refine the integer lag with parabolic interpolation when it is a
//!    strict local peak.
//! 5. Convert to BPM (`60 * fps / lag`, rounded) and optionally fold the
//!    result into the DJ tempo range by doubling or halving.

use crate::dsp::fft;
use rustfft::num_complex::Complex;

/// Activation frame rate in Hz
pub const FPS: f32 = 50.0;

/// Lower bound of the searched tempo range
pub const MIN_BPM: f32 = 60.0;

/// Upper bound of the searched tempo range
pub const MAX_BPM: f32 = 180.0;

/// Lower bound of the DJ range used for octave correction
pub const DJ_MIN_BPM: f32 = 75.0;

/// Upper bound of the DJ range used for octave correction
pub const DJ_MAX_BPM: f32 = 165.0;

/// Estimate BPM from beat and downbeat activation curves
///
/// Both slices are chronological and sampled at [`FPS`]; when their lengths
/// differ only the common prefix is used. Returns 0 for fewer than one
/// second of frames.
///
/// # Arguments
///
/// * `beat_activations` - Beat probabilities, one per frame
/// * `downbeat_activations` - Downbeat probabilities, one per frame
/// * `octave_correction` - Fold results outside [75, 165] BPM back into
///   range by doubling/halving
///
/// # Example
///
/// ```
/// use pulsekey::tempo::estimator;
///
/// // 120 BPM: one activation pulse every 25 frames
/// let beats: Vec<f32> = (0..300).map(|i| if i % 25 == 0 { 1.0 } else { 0.0 }).collect();
/// let downbeats = vec![0.0f32; 300];
/// let bpm = estimator::estimate(&beats, &downbeats, true);
/// assert!((bpm - 120.0).abs() <= 2.0);
/// ```
pub fn estimate(
    beat_activations: &[f32],
    downbeat_activations: &[f32],
    octave_correction: bool,
) -> f32 {
    let num_frames = beat_activations.len().min(downbeat_activations.len());
    if num_frames < FPS as usize {
        return 0.0;
    }

    let signal: Vec<f32> = beat_activations[..num_frames]
        .iter()
        .zip(&downbeat_activations[..num_frames])
        .map(|(&b, &d)| b + d)
        .collect();

    let autocorr = autocorrelation_fft(&signal);

    // Lag bounds for the searched tempo range
    let min_lag = (FPS * 60.0 / MAX_BPM) as usize;
    let mut max_lag = (FPS * 60.0 / MIN_BPM) as usize;
    if max_lag >= num_frames {
        max_lag = num_frames - 1;
    }
    if min_lag >= max_lag {
        return 0.0;
    }

    // Strongest lag in range
    let mut peak_idx = min_lag;
    let mut peak_val = autocorr[min_lag];
    for (i, &v) in autocorr.iter().enumerate().take(max_lag).skip(min_lag + 1) {
        if v > peak_val {
            peak_val = v;
            peak_idx = i;
        }
    }

    // Sub-frame refinement, only across a strict local maximum
    let mut refined_lag = peak_idx as f32;
    if peak_idx > 0 && peak_idx < num_frames - 1 {
        let y0 = autocorr[peak_idx - 1];
        let y1 = autocorr[peak_idx];
        let y2 = autocorr[peak_idx + 1];
        if y1 > y0 && y1 > y2 {
            let denom = y0 - 2.0 * y1 + y2;
            if denom.abs() > 1e-8 {
                refined_lag = peak_idx as f32 + 0.5 * (y0 - y2) / denom;
            }
        }
    }

    let mut bpm = (60.0 * FPS / refined_lag).round();

    if octave_correction && bpm > 0.0 {
        bpm = fold_into_dj_range(bpm);
    }

    log::debug!(
        "Tempo estimate: {} frames, peak lag {} (refined {:.2}) -> {} BPM",
        num_frames,
        peak_idx,
        refined_lag,
        bpm
    );

    bpm
}

/// Double or halve a tempo to land inside the DJ range when possible
fn fold_into_dj_range(bpm: f32) -> f32 {
    let doubled = bpm * 2.0;
    let halved = bpm / 2.0;

    if bpm < DJ_MIN_BPM && (DJ_MIN_BPM..=DJ_MAX_BPM).contains(&doubled) {
        doubled
    } else if bpm > DJ_MAX_BPM && (DJ_MIN_BPM..=DJ_MAX_BPM).contains(&halved) {
        halved
    } else {
        bpm
    }
}

/// Linear autocorrelation via FFT, normalised by the zero-lag value
///
/// Zero-pads to the next power of two >= 2N so the circular convolution
/// theorem yields the linear autocorrelation over the first N lags.
fn autocorrelation_fft(signal: &[f32]) -> Vec<f32> {
    let n = signal.len();
    let fft_size = (2 * n).next_power_of_two();

    let mut buffer: Vec<Complex<f32>> = signal.iter().map(|&x| Complex::new(x, 0.0)).collect();
    buffer.resize(fft_size, Complex::new(0.0, 0.0));

    fft::forward_in_place(&mut buffer);

    // Power spectrum into the real slots
    for x in buffer.iter_mut() {
        *x = Complex::new(x.norm_sqr(), 0.0);
    }

    fft::inverse_in_place(&mut buffer);

    let zero_lag = buffer[0].re + 1e-8;
    buffer[..n].iter().map(|x| x.re / zero_lag).collect()
}
