//! Beat network adapter
//!
//! Wraps the recurrent beat/downbeat classifier:
//!
//! - Input: `[1, 1, 272]` feature frame plus hidden and cell state tensors
//!   of shape `[2, 1, 150]`, named `input` / `hidden_in` / `cell_in`.
//! - Output: `[1, 1, 3]` class scores ordered `[beat, downbeat, non-beat]`
//!   plus updated `hidden_out` / `cell_out`.
//!
//! The recurrent state is owned here and threaded across calls so the
//! network sees one continuous stream; it is zeroed on load and on
//! [`reset_state`](BeatModel::reset_state). Some model exports emit
//! probabilities and some raw logits, so the adapter normalises with a
//! softmax whenever the outputs do not already sum to one.

use crate::error::EngineError;
use crate::ml::runtime;
use crate::result::FrameResult;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Tensor;

/// Feature dimension of one input frame
pub const INPUT_DIM: usize = 272;

/// Recurrent hidden size per layer
pub const HIDDEN_DIM: usize = 150;

/// Number of recurrent layers
pub const NUM_LAYERS: usize = 2;

/// Output classes: beat, downbeat, non-beat
pub const OUTPUT_CLASSES: usize = 3;

/// Number of zero-input inferences run by [`BeatModel::warm_up`]
const WARM_UP_RUNS: usize = 5;

/// Recurrent beat classifier session with owned state
pub struct BeatModel {
    session: Session,
    hidden: Vec<f32>,
    cell: Vec<f32>,
}

impl BeatModel {
    /// Load the model from an ONNX file
    ///
    /// Initialises the shared runtime environment on first use and starts
    /// with zeroed recurrent state.
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

        log::info!("Beat model loaded from {}", path);

        Ok(Self {
            session,
            hidden: vec![0.0; NUM_LAYERS * HIDDEN_DIM],
            cell: vec![0.0; NUM_LAYERS * HIDDEN_DIM],
        })
    }

    /// Zero the recurrent state (call when starting a new audio stream)
    pub fn reset_state(&mut self) {
        self.hidden.fill(0.0);
        self.cell.fill(0.0);
    }

    /// Classify one 272-dimensional feature frame
    ///
    /// Updates the recurrent state in place on success; a failed call
    /// leaves it untouched.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::InvalidInput` for a wrongly-sized frame and
    /// `EngineError::Inference` when the back-end rejects the request.
    pub fn infer(&mut self, features: &[f32]) -> Result<FrameResult, EngineError> {
        if features.len() != INPUT_DIM {
            return Err(EngineError::InvalidInput(format!(
                "Expected {} features, got {}",
                INPUT_DIM,
                features.len()
            )));
        }

        let input = Tensor::from_array(([1usize, 1, INPUT_DIM], features.to_vec()))?;
        let hidden_in = Tensor::from_array(([NUM_LAYERS, 1, HIDDEN_DIM], self.hidden.clone()))?;
        let cell_in = Tensor::from_array(([NUM_LAYERS, 1, HIDDEN_DIM], self.cell.clone()))?;

        let outputs = self.session.run(ort::inputs![
            "input" => input,
            "hidden_in" => hidden_in,
            "cell_in" => cell_in,
        ])?;

        let (_shape, scores) = outputs["output"].try_extract_tensor::<f32>()?;
        if scores.len() < OUTPUT_CLASSES {
            return Err(EngineError::Inference(format!(
                "Beat model returned {} values, expected {}",
                scores.len(),
                OUTPUT_CLASSES
            )));
        }
        let mut class_scores = [scores[0], scores[1], scores[2]];

        let (_shape, hidden_out) = outputs["hidden_out"].try_extract_tensor::<f32>()?;
        if hidden_out.len() >= self.hidden.len() {
            self.hidden.copy_from_slice(&hidden_out[..NUM_LAYERS * HIDDEN_DIM]);
        }
        let (_shape, cell_out) = outputs["cell_out"].try_extract_tensor::<f32>()?;
        if cell_out.len() >= self.cell.len() {
            self.cell.copy_from_slice(&cell_out[..NUM_LAYERS * HIDDEN_DIM]);
        }

        // Exports differ in whether a softmax is baked into the graph
        let sum: f32 = class_scores.iter().sum();
        if (sum - 1.0).abs() > 0.01 {
            softmax_in_place(&mut class_scores);
        }

        Ok(FrameResult {
            beat_activation: class_scores[0],
            downbeat_activation: class_scores[1],
        })
    }

    /// Run a few zero-input inferences to trigger back-end compilation
    ///
    /// Hardware-accelerated execution providers often compile lazily on the
    /// first request, which can cost 100 ms or more. The recurrent state is
    /// zeroed afterwards so the warm-up leaves no trace in real output.
    pub fn warm_up(&mut self) -> Result<(), EngineError> {
        let zeros = vec![0.0f32; INPUT_DIM];
        for _ in 0..WARM_UP_RUNS {
            self.infer(&zeros)?;
        }
        self.reset_state();
        Ok(())
    }
}

/// Numerically-stable softmax over a small score vector
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_softmax_normalises_logits() {
        let mut scores = [2.0f32, 1.0, 0.1];
        softmax_in_place(&mut scores);

        let sum: f32 = scores.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
        assert!(scores[0] > scores[1] && scores[1] > scores[2]);
    }

    #[test]
    fn test_softmax_stable_for_large_logits() {
        let mut scores = [1000.0f32, 999.0, 0.0];
        softmax_in_place(&mut scores);

        assert!(scores.iter().all(|s| s.is_finite()));
        let sum: f32 = scores.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_load_missing_file_fails() {
        let result = BeatModel::load("/nonexistent/beatnet.onnx", Some(1));
        assert!(matches!(result, Err(EngineError::ModelLoad(_))));
    }
}
