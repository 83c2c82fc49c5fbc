//! Bounded activation history with cached BPM
//!
//! Circular buffer holding the most recent beat/downbeat activation pairs.
//! Pushes are O(1); the cached BPM is recomputed at a fixed cadence once
//! enough history has accumulated, so callers get a fresh estimate without
//! polling and without paying for an autocorrelation on every frame.

use super::estimator;

/// Default ring capacity in frames (~10 s at 50 Hz)
pub const DEFAULT_CAPACITY: usize = 512;

/// Minimum stored frames before any BPM is produced (~2 s)
pub const MIN_FRAMES_FOR_BPM: usize = 100;

/// Default recompute cadence in pushes (~500 ms)
pub const DEFAULT_RECOMPUTE_INTERVAL: usize = 25;

/// Fixed-capacity ring of activations with amortised BPM recomputation
///
/// Consumers always observe the stored activations oldest-to-newest; the
/// wrap-around never reorders the autocorrelation input.
///
/// # Example
///
/// ```
/// use pulsekey::tempo::ActivationRing;
///
/// let mut ring = ActivationRing::new(512);
/// for i in 0..300 {
///     let beat = if i % 25 == 0 { 1.0 } else { 0.0 };
///     ring.push(beat, 0.0);
/// }
/// assert!((ring.cached_bpm() - 120.0).abs() <= 2.0);
/// ```
#[derive(Debug)]
pub struct ActivationRing {
    capacity: usize,
    head: usize,
    count: usize,
    beat_activations: Vec<f32>,
    downbeat_activations: Vec<f32>,

    min_frames: usize,
    recompute_interval: usize,

    cached_bpm: f32,
    pushes_since_compute: usize,
}

impl ActivationRing {
    /// Create a ring with the given capacity and default cadence
    pub fn new(capacity: usize) -> Self {
        Self::with_params(capacity, MIN_FRAMES_FOR_BPM, DEFAULT_RECOMPUTE_INTERVAL)
    }

    /// Create a ring with explicit estimation parameters
    pub fn with_params(capacity: usize, min_frames: usize, recompute_interval: usize) -> Self {
        debug_assert!(capacity > 0);
        Self {
            capacity,
            head: 0,
            count: 0,
            beat_activations: vec![0.0; capacity],
            downbeat_activations: vec![0.0; capacity],
            min_frames,
            recompute_interval: recompute_interval.max(1),
            cached_bpm: 0.0,
            pushes_since_compute: 0,
        }
    }

    /// Number of stored activation pairs (saturates at capacity)
    pub fn len(&self) -> usize {
        self.count
    }

    /// True when no activations are stored
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Ring capacity in frames
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Store one activation pair, overwriting the oldest at capacity
    ///
    /// Once `min_frames` pairs have accumulated, the cached BPM is
    /// recomputed every `recompute_interval` pushes, always with octave
    /// correction applied.
    pub fn push(&mut self, beat_activation: f32, downbeat_activation: f32) {
        self.beat_activations[self.head] = beat_activation;
        self.downbeat_activations[self.head] = downbeat_activation;
        self.head = (self.head + 1) % self.capacity;
        if self.count < self.capacity {
            self.count += 1;
        }
        self.pushes_since_compute += 1;

        if self.count >= self.min_frames && self.pushes_since_compute >= self.recompute_interval {
            self.recompute();
        }
    }

    /// Last cached BPM; 0 until `min_frames` pairs have been stored
    pub fn cached_bpm(&self) -> f32 {
        self.cached_bpm
    }

    /// Force an immediate recomputation and return the estimate
    ///
    /// The result is cached. Returns 0 below `min_frames`.
    pub fn estimate(&mut self, octave_correction: bool) -> f32 {
        if self.count < self.min_frames {
            return 0.0;
        }

        let (beats, downbeats) = self.extract_in_order();
        self.cached_bpm = estimator::estimate(&beats, &downbeats, octave_correction);
        self.pushes_since_compute = 0;
        self.cached_bpm
    }

    /// Empty the ring and zero the cached BPM
    pub fn clear(&mut self) {
        self.head = 0;
        self.count = 0;
        self.cached_bpm = 0.0;
        self.pushes_since_compute = 0;
    }

    fn recompute(&mut self) {
        let (beats, downbeats) = self.extract_in_order();
        // The automatic path always folds into the DJ range; only a forced
        // estimate() takes a caller-supplied flag
        self.cached_bpm = estimator::estimate(&beats, &downbeats, true);
        self.pushes_since_compute = 0;
    }

    /// Copy the stored activations out oldest-to-newest
    fn extract_in_order(&self) -> (Vec<f32>, Vec<f32>) {
        let start = if self.count < self.capacity {
            0
        } else {
            self.head
        };

        let mut beats = Vec::with_capacity(self.count);
        let mut downbeats = Vec::with_capacity(self.count);
        for i in 0..self.count {
            let idx = (start + i) % self.capacity;
            beats.push(self.beat_activations[idx]);
            downbeats.push(self.downbeat_activations[idx]);
        }
        (beats, downbeats)
    }
}

impl Default for ActivationRing {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn push_pattern(ring: &mut ActivationRing, bpm: f32, num_frames: usize) {
        let frames_per_beat = estimator::FPS * 60.0 / bpm;
        for i in 0..num_frames {
            let phase = (i as f32) % frames_per_beat;
            let beat = if phase < frames_per_beat * 0.1 {
                1.0 - phase / (frames_per_beat * 0.1)
            } else {
                0.0
            };
            ring.push(beat, 0.0);
        }
    }

    #[test]
    fn test_empty_ring() {
        let ring = ActivationRing::default();
        assert!(ring.is_empty());
        assert_eq!(ring.len(), 0);
        assert_eq!(ring.capacity(), DEFAULT_CAPACITY);
        assert_eq!(ring.cached_bpm(), 0.0);
    }

    #[test]
    fn test_no_bpm_below_minimum() {
        let mut ring = ActivationRing::default();
        push_pattern(&mut ring, 120.0, MIN_FRAMES_FOR_BPM - 1);
        assert_eq!(ring.cached_bpm(), 0.0);
        assert_eq!(ring.estimate(true), 0.0);
    }

    #[test]
    fn test_cached_bpm_after_300_frames() {
        let mut ring = ActivationRing::default();
        push_pattern(&mut ring, 120.0, 300);
        assert_eq!(ring.len(), 300);
        assert!(
            (ring.cached_bpm() - 120.0).abs() <= 2.0,
            "cached {}",
            ring.cached_bpm()
        );
    }

    #[test]
    fn test_amortised_recompute_cadence() {
        let mut ring = ActivationRing::default();
        push_pattern(&mut ring, 120.0, MIN_FRAMES_FOR_BPM);
        let first = ring.cached_bpm();
        assert!(first > 0.0);

        // Cache only refreshes every DEFAULT_RECOMPUTE_INTERVAL pushes;
        // a handful more identical pushes leaves it untouched
        for _ in 0..DEFAULT_RECOMPUTE_INTERVAL - 1 {
            ring.push(0.0, 0.0);
        }
        assert_eq!(ring.cached_bpm(), first);
    }

    #[test]
    fn test_automatic_recompute_applies_octave_correction() {
        // A 60 BPM pattern folds to ~120 in the periodic path; without
        // correction it would cache ~61
        let mut ring = ActivationRing::default();
        push_pattern(&mut ring, 60.0, 300);

        let cached = ring.cached_bpm();
        assert!(
            (75.0..=165.0).contains(&cached),
            "cached {} outside the DJ range",
            cached
        );
        assert!((cached - 120.0).abs() <= 4.0, "cached {}", cached);
    }

    #[test]
    fn test_estimate_forces_recompute() {
        let mut ring = ActivationRing::default();
        push_pattern(&mut ring, 128.0, 260);
        let forced = ring.estimate(true);
        assert!((forced - 128.0).abs() <= 2.0, "forced {}", forced);
        assert_eq!(ring.cached_bpm(), forced);
    }

    #[test]
    fn test_wraparound_preserves_estimate() {
        // Push far past capacity; the replayed signal must stay phase
        // continuous across the wrap point
        let mut ring = ActivationRing::new(DEFAULT_CAPACITY);
        push_pattern(&mut ring, 120.0, DEFAULT_CAPACITY * 3);

        assert_eq!(ring.len(), DEFAULT_CAPACITY);
        let bpm = ring.estimate(true);
        assert!((bpm - 120.0).abs() <= 2.0, "after wrap {}", bpm);
    }

    #[test]
    fn test_extraction_order_across_wrap() {
        let mut ring = ActivationRing::new(8);
        for i in 0..11 {
            ring.push(i as f32, 0.0);
        }

        let (beats, _) = ring.extract_in_order();
        assert_eq!(beats, vec![3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0]);
    }

    #[test]
    fn test_clear_resets_everything() {
        let mut ring = ActivationRing::default();
        push_pattern(&mut ring, 120.0, 300);
        assert!(ring.cached_bpm() > 0.0);

        ring.clear();
        assert!(ring.is_empty());
        assert_eq!(ring.cached_bpm(), 0.0);

        // Refills behave like a fresh ring
        push_pattern(&mut ring, 100.0, 300);
        assert!((ring.cached_bpm() - 100.0).abs() <= 2.0);
    }
}
