//! # Pulsekey
//!
//! A real-time BPM and musical key detection engine for DJ applications.
//! Feed it a monophonic 44.1 kHz stream and it continuously maintains two
//! estimates: the tempo in beats per minute and the musical key (one of 24
//! major/minor classes, reported in Camelot and conventional notation).
//!
//! ## Features
//!
//! - **BPM detection**: recurrent beat-activation network over a streaming
//!   log-filterbank spectrogram, with FFT-autocorrelation tempo estimation
//!   and octave correction
//! - **Key detection**: convolutional key classifier over a growing
//!   Constant-Q spectrogram, re-inferred periodically as context accumulates
//! - **Streaming-first**: chunk-size-invariant extractors and a single
//!   `process_audio` call suitable for live capture or batch files
//!
//! ## Quick Start
//!
//! ```no_run
//! use pulsekey::Engine;
//!
//! let mut engine = Engine::new();
//! engine.load_beat_model("models/beatnet.onnx")?;
//! engine.load_key_model("models/keynet.onnx")?;
//!
//! // Feed 44.1 kHz mono samples as they arrive
//! let samples: Vec<f32> = vec![0.0; 4410];
//! engine.process_audio(&samples, None);
//!
//! println!("BPM: {:.0}", engine.current_bpm());          // after ~2 s
//! let key = engine.current_key();                        // after ~20 s
//! if key.valid {
//!     println!("Key: {} ({})", key.camelot, key.notation);
//! }
//! # Ok::<(), pulsekey::EngineError>(())
//! ```
//!
//! ## Architecture
//!
//! ```text
//! 44100 Hz audio ──┬─> CQT extractor ─> key model ─────> key result
//!                  │
//!                  └─> resample 2:1 ─> mel extractor ─> beat model ─> BPM
//! ```
//!
//! Neural network execution is delegated to ONNX Runtime; model artifacts
//! are opaque files supplied by the host. The engine persists nothing and
//! holds all state per instance; call [`Engine::reset`] between tracks.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod dsp;
pub mod engine;
pub mod error;
pub mod features;
pub mod ml;
pub mod result;
pub mod tempo;

// Re-export main types
pub use config::EngineConfig;
pub use engine::Engine;
pub use error::EngineError;
pub use result::{FrameResult, KeyClass, KeyResult};
