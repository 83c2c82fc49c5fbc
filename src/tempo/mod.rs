//! Tempo estimation from beat activations
//!
//! Converts the beat network's activation stream into a BPM estimate:
//! - FFT-accelerated autocorrelation with sub-frame peak refinement
//! - Bounded activation history with amortised recomputation

pub mod estimator;
pub mod ring;

pub use ring::ActivationRing;
