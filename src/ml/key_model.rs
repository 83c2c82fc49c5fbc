//! Key network adapter
//!
//! Wraps the convolutional key classifier:
//!
//! - Input: `[1, 1, 105, T]` log-magnitude CQT spectrogram, `T >= 1`.
//! - Output: `[1, 24]` logits over the key classes.
//!
//! The network pools adaptively over time, so any number of frames is
//! accepted; more context improves accuracy. The adapter applies a
//! numerically-stable softmax, takes the argmax as the predicted class, and
//! resolves the Camelot/notation labels from the fixed tables in
//! [`crate::result`].

use crate::error::EngineError;
use crate::ml::runtime;
use crate::result::{KeyClass, NUM_KEY_CLASSES};
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Tensor;

/// CQT frequency bins per frame
pub const INPUT_FREQ_BINS: usize = 105;

/// Recommended minimum time frames for reliable output (~20 s)
pub const RECOMMENDED_TIME_FRAMES: usize = 100;

/// Prediction for one inference over the accumulated spectrogram
#[derive(Debug, Clone)]
pub struct KeyPrediction {
    /// Predicted key class (argmax)
    pub key: KeyClass,

    /// Softmax probability of the predicted class
    pub confidence: f32,

    /// Full probability distribution over all 24 classes
    ///
    /// Useful for host-side voting or averaging across inferences.
    pub probabilities: [f32; NUM_KEY_CLASSES],
}

/// Key classifier session
pub struct KeyModel {
    session: Session,
}

impl KeyModel {
    /// Load the model from an ONNX file
    ///
    /// # Errors
    ///
    /// Returns `EngineError::ModelLoad` when the file is missing,
    /// unreadable, or not a valid model.
    pub fn load(path: &str, intra_threads: Option<usize>) -> Result<Self, EngineError> {
        runtime::ensure_initialized()?;

        let mut builder = Session::builder()
            .and_then(|b| b.with_optimization_level(GraphOptimizationLevel::Level3))
            .map_err(|e| EngineError::ModelLoad(e.to_string()))?;

        if let Some(threads) = intra_threads {
            builder = builder
                .with_intra_threads(threads)
                .map_err(|e| EngineError::ModelLoad(e.to_string()))?;
        }

        let session = builder
            .commit_from_file(path)
            .map_err(|e| EngineError::ModelLoad(format!("{}: {}", path, e)))?;

        log::info!("Key model loaded from {}", path);

        Ok(Self { session })
    }

    /// Classify a time-major CQT spectrogram of `num_frames` frames
    ///
    /// `spectrogram` holds `num_frames * 105` values laid out
    /// `[time][freq]`, as accumulated by the engine; the adapter transposes
    /// to the network's `[freq][time]` layout.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::InvalidInput` for an empty or wrongly-sized
    /// spectrogram and `EngineError::Inference` when the back-end rejects
    /// the request.
    pub fn infer(
        &mut self,
        spectrogram: &[f32],
        num_frames: usize,
    ) -> Result<KeyPrediction, EngineError> {
        if num_frames == 0 {
            return Err(EngineError::InvalidInput(
                "Key inference needs at least one frame".to_string(),
            ));
        }
        if spectrogram.len() != num_frames * INPUT_FREQ_BINS {
            return Err(EngineError::InvalidInput(format!(
                "Spectrogram length {} does not match {} frames x {} bins",
                spectrogram.len(),
                num_frames,
                INPUT_FREQ_BINS
            )));
        }

        // Transpose [time][freq] -> [freq][time] for the input tensor
        let mut transposed = vec![0.0f32; spectrogram.len()];
        for t in 0..num_frames {
            for f in 0..INPUT_FREQ_BINS {
                transposed[f * num_frames + t] = spectrogram[t * INPUT_FREQ_BINS + f];
            }
        }

        let input = Tensor::from_array(([1usize, 1, INPUT_FREQ_BINS, num_frames], transposed))?;
        let outputs = self.session.run(ort::inputs!["input" => input])?;

        let (_shape, logits) = outputs["output"].try_extract_tensor::<f32>()?;
        if logits.len() < NUM_KEY_CLASSES {
            return Err(EngineError::Inference(format!(
                "Key model returned {} values, expected {}",
                logits.len(),
                NUM_KEY_CLASSES
            )));
        }

        let mut probabilities = [0.0f32; NUM_KEY_CLASSES];
        probabilities.copy_from_slice(&logits[..NUM_KEY_CLASSES]);
        softmax_in_place(&mut probabilities);

        let (best_index, &confidence) = probabilities
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
            .unwrap_or((0, &probabilities[0]));

        let key = KeyClass::from_index(best_index).ok_or_else(|| {
            EngineError::Inference(format!("Class index {} out of range", best_index))
        })?;

        log::debug!(
            "Key inference over {} frames: {} ({}) p={:.3}",
            num_frames,
            key.camelot(),
            key.notation(),
            confidence
        );

        Ok(KeyPrediction {
            key,
            confidence,
            probabilities,
        })
    }

    /// Run one zero-input inference to trigger back-end compilation
    ///
    /// Uses the recommended context length so hardware back-ends compile
    /// for a realistic shape. The classifier is stateless, so nothing needs
    /// resetting afterwards.
    pub fn warm_up(&mut self) -> Result<(), EngineError> {
        let zeros = vec![0.0f32; RECOMMENDED_TIME_FRAMES * INPUT_FREQ_BINS];
        self.infer(&zeros, RECOMMENDED_TIME_FRAMES)?;
        Ok(())
    }
}

/// Numerically-stable softmax over a score vector
fn softmax_in_place(scores: &mut [f32]) {
    let max = scores.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
    let mut sum = 0.0f32;
    for s in scores.iter_mut() {
        *s = (*s - max).exp();
        sum += *s;
    }
    for s in scores.iter_mut() {
        *s /= sum;
    }
}
