//! Fast Fourier Transform primitives
//!
//! Real-to-complex forward transforms of arbitrary length (the mel front end
//! uses a 1411-point FFT with no zero-padding) and complex-to-complex
//! transforms for the autocorrelation path. Scaling follows the numpy
//! convention: unscaled forward, `1/N` on the inverse.

use rustfft::num_complex::Complex;
use rustfft::FftPlanner;
use std::sync::Arc;

/// Size-fixed real-to-complex FFT
///
/// The plan is built once at construction and reused for every frame.
/// For a real input of length `N` the output keeps `N/2 + 1` bins (DC
/// through Nyquist for even `N`, DC through the last unique bin for odd `N`).
///
/// # Example
///
/// ```
/// use pulsekey::dsp::fft::Fft;
///
/// let fft = Fft::new(1411);
/// assert_eq!(fft.output_len(), 706);
///
/// let impulse = {
///     let mut x = vec![0.0f32; 1411];
///     x[0] = 1.0;
///     x
/// };
/// let spectrum = fft.forward_real(&impulse);
/// assert!((spectrum[0].re - 1.0).abs() < 1e-6);
/// ```
pub struct Fft {
    len: usize,
    plan: Arc<dyn rustfft::Fft<f32>>,
}

impl Fft {
    /// Create an FFT plan for the given transform length
    ///
    /// Any length is supported, not just powers of two.
    pub fn new(len: usize) -> Self {
        let mut planner = FftPlanner::new();
        let plan = planner.plan_fft_forward(len);
        Self { len, plan }
    }

    /// Transform length
    pub fn len(&self) -> usize {
        self.len
    }

    /// True if the transform length is zero
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of output bins for real input (`len/2 + 1`)
    pub fn output_len(&self) -> usize {
        self.len / 2 + 1
    }

    /// Compute the real-to-complex forward FFT
    ///
    /// Input shorter than the transform length is zero-padded at the end.
    /// Returns the first `len/2 + 1` bins of the complex spectrum, unscaled.
    pub fn forward_real(&self, input: &[f32]) -> Vec<Complex<f32>> {
        let mut buffer: Vec<Complex<f32>> = input
            .iter()
            .take(self.len)
            .map(|&x| Complex::new(x, 0.0))
            .collect();
        buffer.resize(self.len, Complex::new(0.0, 0.0));

        self.plan.process(&mut buffer);

        buffer.truncate(self.output_len());
        buffer
    }
}

/// Elementwise magnitude `|z|` of a complex spectrum
pub fn magnitude(spectrum: &[Complex<f32>]) -> Vec<f32> {
    spectrum.iter().map(|z| z.norm()).collect()
}

/// Elementwise power `|z|^2` of a complex spectrum
pub fn power_spectrum(spectrum: &[Complex<f32>]) -> Vec<f32> {
    spectrum.iter().map(|z| z.norm_sqr()).collect()
}

/// In-place complex-to-complex forward FFT
///
/// Unscaled; any length is supported. The autocorrelation path uses this
/// with power-of-two buffers.
pub fn forward_in_place(buffer: &mut [Complex<f32>]) {
    if buffer.is_empty() {
        return;
    }
    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(buffer.len());
    fft.process(buffer);
}

/// In-place complex-to-complex inverse FFT with `1/N` scaling
pub fn inverse_in_place(buffer: &mut [Complex<f32>]) {
    if buffer.is_empty() {
        return;
    }
    let mut planner = FftPlanner::new();
    let ifft = planner.plan_fft_inverse(buffer.len());
    ifft.process(buffer);

    let scale = 1.0 / buffer.len() as f32;
    for x in buffer.iter_mut() {
        *x *= scale;
    }
}
