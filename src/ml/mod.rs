//! Neural inference adapters
//!
//! Uniform contract over the ONNX Runtime back-end: the beat classifier
//! (recurrent, one frame per call) and the key classifier (convolutional,
//! variable-length input). Model artifacts are opaque files loaded lazily
//! from host-provided paths.

pub mod beat_model;
pub mod key_model;
pub mod runtime;

pub use beat_model::BeatModel;
pub use key_model::{KeyModel, KeyPrediction};
