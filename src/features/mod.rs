//! Feature extraction modules
//!
//! The two spectral front ends feeding the neural classifiers:
//! - Log-filterbank spectrogram (beat network input, 50 Hz)
//! - Constant-Q transform (key network input, ~5 Hz)

pub mod cqt;
pub mod mel;
