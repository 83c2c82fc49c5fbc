//! CQT kernel construction
//!
//! One complex kernel per bin: a periodic Hann window of the bin's filter
//! length multiplied by a complex exponential at the bin's centre frequency.
//! Filter lengths follow `N_k = ceil(Q * sr / f_k)` with
//! `Q = 1 / (2^(1/bins_per_octave) - 1)`, which keeps the quality factor
//! constant across bins.

use super::{BINS_PER_OCTAVE, F_MIN, N_BINS, SAMPLE_RATE};
use rustfft::num_complex::Complex;

/// Constant Q factor for the bin spacing
pub fn q_factor(bins_per_octave: usize) -> f64 {
    1.0 / (2.0f64.powf(1.0 / bins_per_octave as f64) - 1.0)
}

/// Centre frequency of bin `k`: `f_min * 2^(k / bins_per_octave)`
pub fn center_frequency(k: usize, f_min: f32, bins_per_octave: usize) -> f32 {
    f_min * 2.0f32.powf(k as f32 / bins_per_octave as f32)
}

/// Create a periodic Hann window (scipy `fftbins=true` convention)
fn periodic_hann(length: usize) -> Vec<f32> {
    (0..length)
        .map(|i| {
            let x = 2.0 * std::f64::consts::PI * i as f64 / length as f64;
            (0.5 * (1.0 - x.cos())) as f32
        })
        .collect()
}

/// Pre-computed complex kernel for a single CQT bin
#[derive(Debug, Clone)]
pub struct CqtKernel {
    /// Centre frequency in Hz
    pub center_freq: f32,

    /// Window length in samples
    pub len: usize,

    /// Windowed complex exponential `w[n] * exp(+2*pi*i * f * n / sr)`
    pub coeffs: Vec<Complex<f32>>,
}

impl CqtKernel {
    /// Build the kernel for one bin
    pub fn new(center_freq: f32, len: usize, sample_rate: usize) -> Self {
        let window = periodic_hann(len);
        let freq_ratio = 2.0 * std::f64::consts::PI * center_freq as f64 / sample_rate as f64;

        let coeffs = window
            .iter()
            .enumerate()
            .map(|(n, &w)| {
                let phase = freq_ratio * n as f64;
                Complex::new(w * phase.cos() as f32, w * phase.sin() as f32)
            })
            .collect();

        Self {
            center_freq,
            len,
            coeffs,
        }
    }
}

/// Build the full kernel bank for the key-network geometry
pub fn build_kernels() -> Vec<CqtKernel> {
    let q = q_factor(BINS_PER_OCTAVE);

    (0..N_BINS)
        .map(|k| {
            let freq = center_frequency(k, F_MIN, BINS_PER_OCTAVE);
            let len = (q * SAMPLE_RATE as f64 / freq as f64).ceil() as usize;
            CqtKernel::new(freq, len, SAMPLE_RATE)
        })
        .collect()
}
