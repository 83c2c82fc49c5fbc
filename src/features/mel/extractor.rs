//! Log-filterbank spectrogram extraction
//!
//! Per-frame processing: symmetric Hann window, real FFT (no zero-padding),
//! magnitude spectrum with the Nyquist bin excluded, triangular log
//! filterbank, `log10(1 + x)` compression, and a half-wave-rectified
//! first-order difference against the previous frame. The 136 compressed
//! bands and 136 differences stack into one 272-dimensional feature frame.
//!
//! The streaming wrapper performs centred hop-based framing: frame `n` is
//! centred on input sample `n * hop`, with implicit zero padding before the
//! start of the stream.

use super::filterbank::LogFilterbank;
use super::{FEATURE_DIM, FFT_LENGTH, HOP_LENGTH, N_BANDS, WIN_LENGTH};
use crate::dsp::fft::Fft;

/// Create a symmetric Hann window (scipy `hann` convention)
fn hann_window(length: usize) -> Vec<f32> {
    (0..length)
        .map(|i| {
            let x = 2.0 * std::f64::consts::PI * i as f64 / (length - 1) as f64;
            (0.5 * (1.0 - x.cos())) as f32
        })
        .collect()
}

/// Single-frame feature extractor
///
/// Stateful only in the previous frame's log-magnitude vector, which the
/// difference half of each feature frame is computed against. The first
/// frame after construction or [`reset`](MelExtractor::reset) emits an
/// all-zero difference half.
pub struct MelExtractor {
    fft: Fft,
    filterbank: LogFilterbank,
    window: Vec<f32>,
    previous_log_mel: Vec<f32>,
    has_previous_frame: bool,
}

impl MelExtractor {
    /// Create an extractor with the beat-network geometry
    pub fn new() -> Self {
        Self {
            fft: Fft::new(FFT_LENGTH),
            filterbank: LogFilterbank::default(),
            window: hann_window(WIN_LENGTH),
            previous_log_mel: vec![0.0; N_BANDS],
            has_previous_frame: false,
        }
    }

    /// Forget the previous frame, restoring the fresh-stream state
    pub fn reset(&mut self) {
        self.has_previous_frame = false;
        self.previous_log_mel.fill(0.0);
    }

    /// Process one window of audio into a 272-dimensional feature frame
    ///
    /// `frame` should hold `WIN_LENGTH` samples; shorter input is
    /// zero-padded. The output layout is `[log_mel[0..136], diff[0..136]]`.
    pub fn process_frame(&mut self, frame: &[f32]) -> Vec<f32> {
        // Window (and implicitly zero-pad) the frame
        let mut windowed = vec![0.0f32; WIN_LENGTH];
        for (out, (&sample, &w)) in windowed
            .iter_mut()
            .zip(frame.iter().zip(self.window.iter()))
        {
            *out = sample * w;
        }

        let spectrum = self.fft.forward_real(&windowed);

        // Magnitude spectrum, Nyquist bin excluded to match the filterbank
        let num_bins = self.filterbank.num_bins();
        let magnitude: Vec<f32> = spectrum[..num_bins].iter().map(|z| z.norm()).collect();

        let filtered = self.filterbank.apply(&magnitude);

        let log_mel: Vec<f32> = filtered.iter().map(|&x| (1.0 + x).log10()).collect();

        let mut features = Vec::with_capacity(FEATURE_DIM);
        features.extend_from_slice(&log_mel);

        if self.has_previous_frame {
            // Half-wave-rectified spectral difference
            for (curr, prev) in log_mel.iter().zip(self.previous_log_mel.iter()) {
                features.push((curr - prev).max(0.0));
            }
        } else {
            features.resize(FEATURE_DIM, 0.0);
            self.has_previous_frame = true;
        }

        self.previous_log_mel.copy_from_slice(&log_mel);

        features
    }
}

impl Default for MelExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// Streaming feature extractor with centred hop-based framing
///
/// Audio pushed in arbitrary-size chunks is written into a circular buffer
/// that begins with `WIN_LENGTH / 2` implicit zeros, so frame `n` is centred
/// on input sample `n * HOP_LENGTH`. The first frame is emitted once
/// `WIN_LENGTH - WIN_LENGTH / 2` samples have arrived, then one frame every
/// `HOP_LENGTH` samples. Output is identical for any chunking of the input.
///
/// # Example
///
/// ```
/// use pulsekey::features::mel::StreamingMelExtractor;
///
/// let mut extractor = StreamingMelExtractor::new();
/// let frames = extractor.push(&vec![0.0f32; 22050]);
/// assert_eq!(frames.len(), 49);
/// assert_eq!(frames[0].len(), 272);
/// ```
pub struct StreamingMelExtractor {
    extractor: MelExtractor,
    buffer: Vec<f32>,
    /// Monotone write cursor; starts past the implicit left padding
    write_pos: u64,
    samples_until_next_frame: i64,
}

/// Implicit zero padding before the first input sample
const PADDING: usize = WIN_LENGTH / 2;

impl StreamingMelExtractor {
    /// Create a streaming extractor in the padded cold-start state
    pub fn new() -> Self {
        Self {
            extractor: MelExtractor::new(),
            buffer: vec![0.0; WIN_LENGTH + HOP_LENGTH],
            write_pos: PADDING as u64,
            samples_until_next_frame: (WIN_LENGTH - PADDING) as i64,
        }
    }

    /// Restore the padded cold-start state
    pub fn reset(&mut self) {
        self.extractor.reset();
        self.buffer.fill(0.0);
        self.write_pos = PADDING as u64;
        self.samples_until_next_frame = (WIN_LENGTH - PADDING) as i64;
    }

    /// Push audio samples, returning every completed feature frame
    pub fn push(&mut self, samples: &[f32]) -> Vec<Vec<f32>> {
        let buffer_len = self.buffer.len() as u64;
        let mut frames = Vec::new();
        let mut frame = vec![0.0f32; WIN_LENGTH];

        for &sample in samples {
            self.buffer[(self.write_pos % buffer_len) as usize] = sample;
            self.write_pos += 1;
            self.samples_until_next_frame -= 1;

            if self.samples_until_next_frame <= 0 {
                // Assemble the window ending at the write cursor
                let start = self.write_pos - WIN_LENGTH as u64;
                for (j, slot) in frame.iter_mut().enumerate() {
                    *slot = self.buffer[((start + j as u64) % buffer_len) as usize];
                }

                frames.push(self.extractor.process_frame(&frame));
                self.samples_until_next_frame = HOP_LENGTH as i64;
            }
        }

        frames
    }
}

impl Default for StreamingMelExtractor {
    fn default() -> Self {
        Self::new()
    }
}
