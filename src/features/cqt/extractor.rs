//! Constant-Q transform extraction
//!
//! Per-frame processing: for each bin, the inner product of the centre
//! `N_k` samples with the conjugate of that bin's kernel, normalised by
//! `sqrt(N_k) / 2` to match the amplitude convention the key classifier was
//! trained on, followed by `log1p` of the complex magnitude.
//!
//! The streaming wrapper keeps a circular buffer long enough for the lowest
//! bin's window plus one hop, pre-filled with half a window of zeros so
//! frame `n` is centred on input sample `n * hop`.

use super::kernel::{build_kernels, CqtKernel};
use super::{HOP_LENGTH, N_BINS};

/// Single-frame CQT processor with pre-computed kernels
///
/// # Example
///
/// ```
/// use pulsekey::features::cqt::CqtExtractor;
///
/// let extractor = CqtExtractor::new();
/// let audio = vec![0.0f32; extractor.max_filter_len()];
/// let bins = extractor.process_frame(&audio);
/// assert_eq!(bins.len(), 105);
/// ```
pub struct CqtExtractor {
    kernels: Vec<CqtKernel>,
    max_filter_len: usize,
}

impl CqtExtractor {
    /// Build the extractor, precomputing all 105 kernels
    pub fn new() -> Self {
        let kernels = build_kernels();
        let max_filter_len = kernels.iter().map(|k| k.len).max().unwrap_or(0);

        log::debug!(
            "CQT extractor ready: {} bins, max filter length {}",
            kernels.len(),
            max_filter_len
        );

        Self {
            kernels,
            max_filter_len,
        }
    }

    /// Longest kernel window (lowest bin), in samples
    pub fn max_filter_len(&self) -> usize {
        self.max_filter_len
    }

    /// Centre frequency of every bin, in Hz
    pub fn center_frequencies(&self) -> Vec<f32> {
        self.kernels.iter().map(|k| k.center_freq).collect()
    }

    /// Kernel window length of every bin, in samples
    pub fn filter_lengths(&self) -> Vec<usize> {
        self.kernels.iter().map(|k| k.len).collect()
    }

    /// Compute one 105-bin log-magnitude CQT frame
    ///
    /// `audio` is interpreted as centred on the frame position and should
    /// span at least the longest kernel; bins whose window exceeds the
    /// provided audio produce 0.
    pub fn process_frame(&self, audio: &[f32]) -> Vec<f32> {
        let mut bins = Vec::with_capacity(N_BINS);

        for kernel in &self.kernels {
            if audio.len() < kernel.len {
                bins.push(0.0);
                continue;
            }

            // Centre this bin's window inside the provided audio
            let offset = (audio.len() - kernel.len) / 2;
            let centered = &audio[offset..offset + kernel.len];

            // Inner product with the conjugate kernel
            let mut real_sum = 0.0f32;
            let mut imag_sum = 0.0f32;
            for (&sample, c) in centered.iter().zip(kernel.coeffs.iter()) {
                real_sum += sample * c.re;
                imag_sum -= sample * c.im;
            }

            // Amplitude convention of the key classifier's training data
            let norm = (kernel.len as f32).sqrt() * 0.5;
            let magnitude =
                ((real_sum / norm).powi(2) + (imag_sum / norm).powi(2)).sqrt();

            bins.push(magnitude.ln_1p());
        }

        bins
    }
}

impl Default for CqtExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// Streaming CQT extractor with centred hop-based framing
///
/// Frame `n` becomes available once `n * hop + max_filter_len / 2` samples
/// have been received. Frame bookkeeping advances even when the caller's
/// output capacity is exhausted, so a capacity-limited consumer never sees
/// duplicate frames.
pub struct StreamingCqtExtractor {
    extractor: CqtExtractor,
    buffer: Vec<f32>,
    padding: usize,
    samples_received: u64,
    frame_count: u64,
}

impl StreamingCqtExtractor {
    /// Create a streaming extractor in the padded cold-start state
    pub fn new() -> Self {
        let extractor = CqtExtractor::new();
        let max_len = extractor.max_filter_len();

        Self {
            extractor,
            buffer: vec![0.0; max_len + HOP_LENGTH],
            padding: max_len / 2,
            samples_received: 0,
            frame_count: 0,
        }
    }

    /// Total frames made available so far (monotone, survives capped reads)
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Restore the padded cold-start state
    pub fn reset(&mut self) {
        self.buffer.fill(0.0);
        self.samples_received = 0;
        self.frame_count = 0;
    }

    /// Push audio samples, returning every completed CQT frame
    pub fn push(&mut self, samples: &[f32]) -> Vec<Vec<f32>> {
        // Upper bound on frames this call can complete
        let capacity = samples.len() / HOP_LENGTH + 2;
        let mut flat = vec![0.0f32; capacity * N_BINS];
        let produced = self.push_into(samples, &mut flat, capacity);

        flat.truncate(produced * N_BINS);
        flat.chunks(N_BINS).map(|c| c.to_vec()).collect()
    }

    /// Push audio samples, writing at most `max_frames` frames into `out`
    ///
    /// `out` must hold at least `max_frames * N_BINS` floats. Returns the
    /// number of frames written. Frames that become available beyond
    /// `max_frames` are dropped but still counted, so later calls resume
    /// after them instead of re-emitting.
    pub fn push_into(&mut self, samples: &[f32], out: &mut [f32], max_frames: usize) -> usize {
        let buffer_len = self.buffer.len() as u64;
        let max_len = self.extractor.max_filter_len();
        let mut frames_produced = 0usize;
        let mut frame_audio = vec![0.0f32; max_len];

        for &sample in samples {
            let write_pos = self.padding as u64 + self.samples_received;
            self.buffer[(write_pos % buffer_len) as usize] = sample;
            self.samples_received += 1;

            // Frame n is centred on sample n * hop and needs half a window
            // of context past the centre
            let samples_needed =
                self.frame_count * HOP_LENGTH as u64 + (max_len / 2) as u64;

            if self.samples_received >= samples_needed {
                if frames_produced < max_frames {
                    let frame_center = self.frame_count as i64 * HOP_LENGTH as i64;
                    let start_sample = frame_center - (max_len / 2) as i64;

                    for (j, slot) in frame_audio.iter_mut().enumerate() {
                        let sample_idx = start_sample + j as i64;
                        let buf_idx =
                            (self.padding as i64 + sample_idx).rem_euclid(buffer_len as i64);
                        *slot = self.buffer[buf_idx as usize];
                    }

                    let bins = self.extractor.process_frame(&frame_audio);
                    let offset = frames_produced * N_BINS;
                    out[offset..offset + N_BINS].copy_from_slice(&bins);
                    frames_produced += 1;
                }

                // Advance even when the output is full so scheduling stays
                // in sync and no frame is emitted twice
                self.frame_count += 1;
            }
        }

        frames_produced
    }
}

impl Default for StreamingCqtExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::cqt::{self, kernel};

    fn sine(freq: f32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / 44100.0).sin())
            .collect()
    }

    #[test]
    fn test_output_finite_non_negative() {
        let extractor = CqtExtractor::new();
        let max_len = extractor.max_filter_len();

        let inputs: [Vec<f32>; 4] = [
            vec![0.0; max_len],
            vec![0.7; max_len],
            vec![1.0; max_len],
            sine(440.0, max_len).iter().map(|&x| x * 1e5).collect(),
        ];

        for input in &inputs {
            let bins = extractor.process_frame(input);
            assert_eq!(bins.len(), cqt::N_BINS);
            for &v in &bins {
                assert!(v.is_finite());
                assert!(v >= 0.0);
            }
        }
    }

    #[test]
    fn test_sine_peak_bin_maps_to_440hz() {
        // A 440 Hz tone must peak in a bin whose centre is near 440 Hz
        let extractor = CqtExtractor::new();
        let audio = sine(440.0, extractor.max_filter_len());
        let bins = extractor.process_frame(&audio);

        let peak_bin = bins
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
            .map(|(i, _)| i)
            .unwrap();

        let peak_freq = extractor.center_frequencies()[peak_bin];
        assert!(
            (400.0..=480.0).contains(&peak_freq),
            "peak bin {} at {} Hz",
            peak_bin,
            peak_freq
        );
    }

    #[test]
    fn test_short_audio_zeroes_long_bins() {
        let extractor = CqtExtractor::new();
        // Enough for the high bins but not the lowest octave
        let bins = extractor.process_frame(&sine(1000.0, 4000));
        assert_eq!(bins.len(), cqt::N_BINS);
        assert_eq!(bins[0], 0.0);
        assert!(bins.iter().all(|&v| v.is_finite()));
    }

    #[test]
    fn test_max_filter_length_matches_q() {
        let extractor = CqtExtractor::new();
        let expected = (kernel::q_factor(cqt::BINS_PER_OCTAVE) * cqt::SAMPLE_RATE as f64
            / cqt::F_MIN as f64)
            .ceil() as usize;
        assert_eq!(extractor.max_filter_len(), expected);
    }

    #[test]
    fn test_streaming_frame_timing() {
        let mut extractor = StreamingCqtExtractor::new();
        let half_window = CqtExtractor::new().max_filter_len() / 2;

        // Nothing until half a window has arrived
        assert_eq!(extractor.push(&vec![0.1; half_window - 1]).len(), 0);
        assert_eq!(extractor.frame_count(), 0);

        // One more sample completes frame 0
        assert_eq!(extractor.push(&[0.1]).len(), 1);
        assert_eq!(extractor.frame_count(), 1);

        // Next frame after one hop
        assert_eq!(extractor.push(&vec![0.1; HOP_LENGTH - 1]).len(), 0);
        assert_eq!(extractor.push(&[0.1]).len(), 1);
        assert_eq!(extractor.frame_count(), 2);
    }

    #[test]
    fn test_capped_output_advances_bookkeeping() {
        // Feed enough audio for 3 frames but allow only 1 out; the other
        // two are dropped, not replayed
        let max_len = CqtExtractor::new().max_filter_len();
        let total = max_len / 2 + 2 * HOP_LENGTH;
        let audio = sine(220.0, total);

        let mut extractor = StreamingCqtExtractor::new();
        let mut out = vec![0.0f32; N_BINS];
        let produced = extractor.push_into(&audio, &mut out, 1);

        assert_eq!(produced, 1);
        assert_eq!(extractor.frame_count(), 3);

        // The next hop yields exactly frame 3, not a duplicate
        let frames = extractor.push(&sine(220.0, HOP_LENGTH));
        assert_eq!(frames.len(), 1);
        assert_eq!(extractor.frame_count(), 4);
    }

    #[test]
    fn test_streaming_chunk_invariance() {
        let max_len = CqtExtractor::new().max_filter_len();
        let audio = sine(440.0, max_len / 2 + HOP_LENGTH + 123);

        let mut reference = StreamingCqtExtractor::new();
        let expected = reference.push(&audio);
        assert_eq!(expected.len(), 2);

        let mut chunked = StreamingCqtExtractor::new();
        let mut produced = Vec::new();
        for chunk in audio.chunks(1000) {
            produced.extend(chunked.push(chunk));
        }

        assert_eq!(produced, expected);
    }

    #[test]
    fn test_reset_clears_counters() {
        let max_len = CqtExtractor::new().max_filter_len();
        let mut extractor = StreamingCqtExtractor::new();

        extractor.push(&sine(440.0, max_len));
        assert!(extractor.frame_count() > 0);

        extractor.reset();
        assert_eq!(extractor.frame_count(), 0);

        // Cold start behaves like a fresh extractor
        let fresh = StreamingCqtExtractor::new().push(&sine(440.0, max_len));
        let after_reset = extractor.push(&sine(440.0, max_len));
        assert_eq!(fresh, after_reset);
    }
}
