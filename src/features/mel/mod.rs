//! Log-filterbank spectrogram features for the beat network
//!
//! Streaming 22.05 kHz audio -> 272-dimensional feature frames at 50 Hz.
//! Each frame stacks 136 log-magnitude filterbank bands with their
//! half-wave-rectified first-order differences.

pub mod extractor;
pub mod filterbank;

pub use extractor::{MelExtractor, StreamingMelExtractor};
pub use filterbank::LogFilterbank;

/// Input sample rate in Hz
pub const SAMPLE_RATE: usize = 22050;

/// Hop between frames in samples (20 ms -> 50 Hz frame rate)
pub const HOP_LENGTH: usize = 441;

/// Analysis window length in samples (64 ms)
pub const WIN_LENGTH: usize = 1411;

/// FFT length (equal to the window length, no zero-padding)
pub const FFT_LENGTH: usize = 1411;

/// Filterbank resolution in bands per octave
pub const BANDS_PER_OCTAVE: usize = 24;

/// Lowest filterbank frequency in Hz
pub const F_MIN: f32 = 30.0;

/// Highest filterbank frequency in Hz
pub const F_MAX: f32 = 17000.0;

/// Reference frequency for the log-spaced band grid (A4)
pub const F_REF: f32 = 440.0;

/// Number of filterbank bands
pub const N_BANDS: usize = 136;

/// Output feature dimension (bands + differences)
pub const FEATURE_DIM: usize = 272;

/// Output frame rate in Hz
pub const FPS: f32 = SAMPLE_RATE as f32 / HOP_LENGTH as f32;
