//! Configuration parameters for the detection engine

/// Engine configuration parameters
///
/// The DSP front ends (filterbank layout, CQT geometry, frame rates) are fixed
/// by the trained models and are not configurable; this struct only tunes the
/// estimation and scheduling behaviour built on top of them.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    // BPM estimation
    /// Capacity of the activation ring buffer in frames (default: 512, ~10 s at 50 Hz)
    pub ring_capacity: usize,

    /// Minimum activation frames before any BPM is reported (default: 100, ~2 s)
    pub min_bpm_frames: usize,

    /// Recompute the cached BPM every this many pushes (default: 25, ~500 ms)
    ///
    /// Trades responsiveness for cost at roughly two updates per second.
    pub bpm_recompute_interval: usize,

    /// Apply octave folding when a recomputation is forced explicitly
    /// (default: true)
    ///
    /// The periodic recomputation during audio processing always folds
    /// estimates outside the DJ tempo range back into it by doubling or
    /// halving; this flag only governs forced estimates.
    pub octave_correction: bool,

    // Key detection scheduling
    /// Minimum CQT frames before the first key inference (default: 100, ~20 s)
    pub key_min_frames: usize,

    /// Re-run key inference every this many new CQT frames (default: 25, ~5 s)
    pub key_inference_interval: usize,

    // Neural back-end
    /// Intra-op thread count for model sessions (default: Some(2))
    ///
    /// Realtime callers should keep this at 1-2 to minimize latency jitter;
    /// batch callers may raise it for throughput. `None` lets the runtime
    /// pick based on CPU cores.
    pub intra_threads: Option<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ring_capacity: 512,
            min_bpm_frames: 100,
            bpm_recompute_interval: 25,
            octave_correction: true,
            key_min_frames: 100,
            key_inference_interval: 25,
            intra_threads: Some(2),
        }
    }
}
