//! DSP primitives
//!
//! Shared signal-processing building blocks:
//! - FFT (real and complex transforms, magnitude/power helpers)
//! - 2:1 anti-aliased resampling

pub mod fft;
pub mod resampler;
