//! Engine orchestration
//!
//! Threads the DSP front ends, the neural adapters, and the tempo machinery
//! into one `process_audio` call:
//!
//! ```text
//! 44100 Hz audio ──┬─> CQT extractor ─> key model ─────> key result
//!                  │
//!                  └─> resample 2:1 ─> mel extractor ─> beat model ─> activation ring ─> BPM
//! ```
//!
//! Both pipelines observe the same input block; the key side runs first so
//! a slow key inference never delays CQT accumulation for later calls.

use crate::config::EngineConfig;
use crate::dsp::resampler::Resampler;
use crate::error::EngineError;
use crate::features::cqt::{self, StreamingCqtExtractor};
use crate::features::mel::StreamingMelExtractor;
use crate::ml::{BeatModel, KeyModel};
use crate::result::{FrameResult, KeyResult};
use crate::tempo::ActivationRing;

/// Native input sample rate in Hz
pub const SAMPLE_RATE: usize = 44100;

/// Sample rate of the resampled BPM pipeline in Hz
pub const BPM_SAMPLE_RATE: usize = 22050;

/// BPM-side frame rate in Hz
pub const BPM_FPS: f32 = 50.0;

/// Key-side frame rate in Hz
pub const KEY_FPS: f32 = cqt::FPS;

/// Real-time BPM and key detection engine
///
/// Owns every pipeline component exclusively; nothing is shared between
/// instances. The engine itself is single-threaded: all processing runs
/// inline on the thread calling [`process_audio`](Engine::process_audio),
/// and callers bridging from a realtime audio callback must serialise
/// access themselves (a try-lock that drops blocks while the engine is
/// busy; a key inference can hold the engine for tens of milliseconds).
///
/// # Example
///
/// ```no_run
/// use pulsekey::Engine;
///
/// let mut engine = Engine::new();
/// engine.load_beat_model("models/beatnet.onnx")?;
/// engine.load_key_model("models/keynet.onnx")?;
///
/// let samples = vec![0.0f32; 4410]; // 100 ms at 44.1 kHz
/// engine.process_audio(&samples, None);
///
/// println!("BPM: {}", engine.current_bpm());
/// println!("Key: {:?}", engine.current_key());
/// # Ok::<(), pulsekey::EngineError>(())
/// ```
pub struct Engine {
    config: EngineConfig,

    // BPM side
    resampler: Resampler,
    mel_extractor: StreamingMelExtractor,
    beat_model: Option<BeatModel>,
    activation_ring: ActivationRing,

    // Key side
    cqt_extractor: StreamingCqtExtractor,
    key_model: Option<KeyModel>,
    /// Time-major accumulation of CQT frames, `key_frame_count x 105`
    cqt_matrix: Vec<f32>,
    cqt_frame_count: usize,
    frames_since_key_inference: usize,
    key_inference_count: usize,
    current_key: KeyResult,
}

impl Engine {
    /// Create an engine with the default configuration, in reset state
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// Create an engine with an explicit configuration
    pub fn with_config(config: EngineConfig) -> Self {
        let activation_ring = ActivationRing::with_params(
            config.ring_capacity,
            config.min_bpm_frames,
            config.bpm_recompute_interval,
        );

        // Room for roughly two minutes of CQT history up front; the matrix
        // keeps growing past that until reset
        let cqt_matrix = Vec::with_capacity(cqt::N_BINS * 600);

        Self {
            config,
            resampler: Resampler::new(SAMPLE_RATE as u32, BPM_SAMPLE_RATE as u32),
            mel_extractor: StreamingMelExtractor::new(),
            beat_model: None,
            activation_ring,
            cqt_extractor: StreamingCqtExtractor::new(),
            key_model: None,
            cqt_matrix,
            cqt_frame_count: 0,
            frames_since_key_inference: 0,
            key_inference_count: 0,
            current_key: KeyResult::default(),
        }
    }

    /// Return every component to its initial state
    ///
    /// Clears the activation ring, the CQT matrix, the recurrent model
    /// state, all extractor and resampler history, the cached BPM, and the
    /// key result. Loaded models stay loaded. Call between tracks; this is
    /// also the only way to release the CQT matrix memory.
    pub fn reset(&mut self) {
        self.resampler.reset();
        self.mel_extractor.reset();
        if let Some(model) = self.beat_model.as_mut() {
            model.reset_state();
        }
        self.activation_ring.clear();

        self.cqt_extractor.reset();
        self.cqt_matrix.clear();
        self.cqt_frame_count = 0;
        self.frames_since_key_inference = 0;
        self.key_inference_count = 0;
        self.current_key = KeyResult::default();

        log::debug!("Engine reset");
    }

    // =========================================================================
    // BPM detection
    // =========================================================================

    /// Load the beat model from an ONNX file
    ///
    /// On failure the BPM side stays in its previous state.
    pub fn load_beat_model(&mut self, path: &str) -> Result<(), EngineError> {
        let model = BeatModel::load(path, self.config.intra_threads)?;
        self.beat_model = Some(model);
        Ok(())
    }

    /// True once the beat model has loaded successfully
    pub fn beat_ready(&self) -> bool {
        self.beat_model.is_some()
    }

    /// Pre-compile the beat model with a few dummy inferences
    ///
    /// Preserves clean recurrent state: the warm-up's state is discarded.
    pub fn warm_up_beat(&mut self) -> Result<(), EngineError> {
        match self.beat_model.as_mut() {
            Some(model) => model.warm_up(),
            None => Err(EngineError::ModelLoad("Beat model not loaded".to_string())),
        }
    }

    /// Latest BPM estimate; 0 until ~2 seconds of audio have been seen
    pub fn current_bpm(&self) -> f32 {
        self.activation_ring.cached_bpm()
    }

    /// Force an immediate BPM recomputation (e.g. when stopping a recording)
    pub fn estimate_bpm(&mut self) -> f32 {
        self.activation_ring.estimate(self.config.octave_correction)
    }

    /// Number of activation frames currently held for BPM estimation
    pub fn bpm_frame_count(&self) -> usize {
        self.activation_ring.len()
    }

    // =========================================================================
    // Key detection
    // =========================================================================

    /// Load the key model from an ONNX file
    ///
    /// On failure the key side stays in its previous state.
    pub fn load_key_model(&mut self, path: &str) -> Result<(), EngineError> {
        let model = KeyModel::load(path, self.config.intra_threads)?;
        self.key_model = Some(model);
        Ok(())
    }

    /// True once the key model has loaded successfully
    pub fn key_ready(&self) -> bool {
        self.key_model.is_some()
    }

    /// Pre-compile the key model with a dummy inference
    pub fn warm_up_key(&mut self) -> Result<(), EngineError> {
        match self.key_model.as_mut() {
            Some(model) => model.warm_up(),
            None => Err(EngineError::ModelLoad("Key model not loaded".to_string())),
        }
    }

    /// Latest key detection result; invalid until ~20 seconds of audio
    pub fn current_key(&self) -> KeyResult {
        self.current_key.clone()
    }

    /// Total CQT frames accumulated since the last reset
    pub fn key_frame_count(&self) -> usize {
        self.cqt_frame_count
    }

    /// Number of key inferences performed since the last reset
    pub fn key_inference_count(&self) -> usize {
        self.key_inference_count
    }

    /// Run key inference over the whole accumulated matrix
    ///
    /// On success the key result is replaced wholesale; on failure the
    /// previous result stays visible and the next scheduled inference will
    /// try again.
    fn run_key_inference(&mut self) {
        let Some(model) = self.key_model.as_mut() else {
            return;
        };

        match model.infer(&self.cqt_matrix, self.cqt_frame_count) {
            Ok(prediction) => {
                self.key_inference_count += 1;
                self.frames_since_key_inference = 0;
                self.current_key = KeyResult {
                    key: Some(prediction.key),
                    camelot: prediction.key.camelot().to_string(),
                    notation: prediction.key.notation().to_string(),
                    confidence: prediction.confidence,
                    valid: true,
                };
            }
            Err(e) => {
                log::warn!("Key inference failed, keeping previous result: {}", e);
            }
        }
    }

    // =========================================================================
    // Audio processing
    // =========================================================================

    /// Process a block of 44.1 kHz mono samples through both pipelines
    ///
    /// The key side accumulates CQT frames and periodically re-infers the
    /// key; the BPM side resamples to 22.05 kHz and classifies every mel
    /// frame. Each side runs only while its model is loaded; with neither
    /// model the call is a no-op returning 0.
    ///
    /// Per-frame activations are copied into `out_frames` when provided,
    /// bounded by its length. The return value is the number of frames
    /// copied, or the total number produced when `out_frames` is `None`.
    pub fn process_audio(
        &mut self,
        samples: &[f32],
        out_frames: Option<&mut [FrameResult]>,
    ) -> usize {
        // Key pipeline (native rate)
        if self.key_model.is_some() {
            let frames = self.cqt_extractor.push(samples);
            for frame in &frames {
                self.cqt_matrix.extend_from_slice(frame);
                self.cqt_frame_count += 1;
                self.frames_since_key_inference += 1;
            }

            // First inference once enough context exists, then one every
            // key_inference_interval frames
            let has_min_frames = self.cqt_frame_count >= self.config.key_min_frames;
            let due = self.key_inference_count == 0
                || self.frames_since_key_inference >= self.config.key_inference_interval;
            if has_min_frames && due {
                self.run_key_inference();
            }
        }

        // BPM pipeline (resampled)
        if self.beat_model.is_none() {
            return 0;
        }
        let resampled = self.resampler.process_streaming(samples);
        self.process_audio_for_bpm(&resampled, out_frames)
    }

    /// Process audio already at 22.05 kHz through the BPM pipeline only
    ///
    /// Legacy entry point for hosts with a pure 22.05 kHz contract; skips
    /// resampling and the key pipeline but is otherwise identical to the
    /// BPM half of [`process_audio`](Engine::process_audio).
    pub fn process_audio_for_bpm(
        &mut self,
        samples: &[f32],
        mut out_frames: Option<&mut [FrameResult]>,
    ) -> usize {
        let Engine {
            mel_extractor,
            beat_model,
            activation_ring,
            ..
        } = self;
        let Some(model) = beat_model.as_mut() else {
            return 0;
        };

        let frames = mel_extractor.push(samples);

        let mut total_produced = 0usize;
        let mut copied = 0usize;
        for features in &frames {
            let activation = match model.infer(features) {
                Ok(activation) => activation,
                Err(e) => {
                    log::warn!("Beat inference failed, skipping frame: {}", e);
                    continue;
                }
            };

            activation_ring.push(activation.beat_activation, activation.downbeat_activation);
            total_produced += 1;

            if let Some(out) = out_frames.as_deref_mut() {
                if copied < out.len() {
                    out[copied] = activation;
                    copied += 1;
                }
            }
        }

        if out_frames.is_some() {
            copied
        } else {
            total_produced
        }
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}
