//! 2:1 anti-aliased downsampling
//!
//! Windowed-sinc FIR decimation for feeding the 22.05 kHz beat pipeline from
//! 44.1 kHz input. The low-pass filter is a 127-tap sinc kernel with cutoff
//! at 0.45 of the input Nyquist, shaped by a Blackman window for stopband
//! attenuation above 60 dB, and normalised to unit DC gain.
//!
//! Two operating modes:
//! - **Block**: one-shot conversion of a complete buffer; edge taps are
//!   truncated at the block boundaries.
//! - **Streaming**: carries the last `filter_length - 1` input samples and
//!   the decimation phase across calls, so any chunking of the input stream
//!   produces bit-identical output.

const FILTER_LENGTH: usize = 127;

/// Generate windowed-sinc low-pass filter coefficients
///
/// Sinc kernel at the given normalised cutoff, multiplied by a Blackman
/// window and normalised to unit gain at DC.
fn generate_sinc_filter(length: usize, cutoff: f32) -> Vec<f32> {
    let half_len = (length / 2) as isize;
    let mut coeffs = vec![0.0f32; length];
    let mut sum = 0.0f32;

    for (i, c) in coeffs.iter_mut().enumerate() {
        let n = (i as isize - half_len) as f32;

        let sinc = if n.abs() < 1e-6 {
            1.0
        } else {
            (std::f32::consts::PI * cutoff * n).sin() / (std::f32::consts::PI * n)
        };

        let phase = i as f32 / (length - 1) as f32;
        let window = 0.42 - 0.5 * (2.0 * std::f32::consts::PI * phase).cos()
            + 0.08 * (4.0 * std::f32::consts::PI * phase).cos();

        *c = sinc * window;
        sum += *c;
    }

    for c in &mut coeffs {
        *c /= sum;
    }

    coeffs
}

/// Integer-ratio decimating resampler with streaming support
///
/// # Example
///
/// ```
/// use pulsekey::dsp::resampler::Resampler;
///
/// let mut resampler = Resampler::new(44100, 22050);
/// let input = vec![0.0f32; 4410];
/// let output = resampler.process_streaming(&input);
/// assert!(output.len() <= resampler.output_len(input.len()) + 1);
/// ```
pub struct Resampler {
    input_rate: u32,
    output_rate: u32,
    ratio: usize,
    coefficients: Vec<f32>,
    /// Last `FILTER_LENGTH - 1` input samples of the (zero-prefixed) stream
    history: Vec<f32>,
    /// Global index of `history[0]` in the zero-prefixed input stream
    buffer_start: u64,
    /// Global index of the next output's filter centre
    next_center: u64,
}

impl Resampler {
    /// Create a resampler for an integer downsampling ratio
    ///
    /// `input_rate` must be an integer multiple of `output_rate`; the engine
    /// uses 44100 -> 22050.
    pub fn new(input_rate: u32, output_rate: u32) -> Self {
        debug_assert!(output_rate > 0 && input_rate % output_rate == 0);
        let ratio = (input_rate / output_rate) as usize;

        // Cutoff below the output Nyquist: 0.9/ratio of the input band,
        // i.e. 0.45 of the input Nyquist for 2:1.
        let cutoff = 0.9 / ratio as f32;
        let coefficients = generate_sinc_filter(FILTER_LENGTH, cutoff);

        Self {
            input_rate,
            output_rate,
            ratio,
            coefficients,
            history: vec![0.0; FILTER_LENGTH - 1],
            buffer_start: 0,
            next_center: (FILTER_LENGTH / 2) as u64,
        }
    }

    /// Input sample rate in Hz
    pub fn input_rate(&self) -> u32 {
        self.input_rate
    }

    /// Output sample rate in Hz
    pub fn output_rate(&self) -> u32 {
        self.output_rate
    }

    /// Number of output samples produced for an input block of this size
    pub fn output_len(&self, input_len: usize) -> usize {
        input_len / self.ratio
    }

    /// Group delay in output samples (`filter_length / 2` input samples)
    pub fn delay(&self) -> usize {
        (FILTER_LENGTH / 2) / self.ratio
    }

    /// Clear the streaming history, returning to the cold-start state
    pub fn reset(&mut self) {
        self.history.fill(0.0);
        self.buffer_start = 0;
        self.next_center = (FILTER_LENGTH / 2) as u64;
    }

    /// Block mode: convert one complete buffer
    ///
    /// Produces `input.len() / ratio` samples centred at input positions
    /// `0, ratio, 2*ratio, ...`; filter taps falling outside the block are
    /// dropped, which slightly attenuates the first and last few outputs.
    pub fn process(&self, input: &[f32]) -> Vec<f32> {
        let half_len = FILTER_LENGTH / 2;
        let n_out = input.len() / self.ratio;
        let mut output = Vec::with_capacity(n_out);

        for m in 0..n_out {
            let center = (m * self.ratio) as isize;
            let mut sum = 0.0f32;
            for (k, &c) in self.coefficients.iter().enumerate() {
                let idx = center - half_len as isize + k as isize;
                if idx >= 0 && (idx as usize) < input.len() {
                    sum += input[idx as usize] * c;
                }
            }
            output.push(sum);
        }

        output
    }

    /// Streaming mode: convert the next chunk of a continuous stream
    ///
    /// Prepends the carried history to the chunk, emits every output whose
    /// full filter window is available, and keeps the tail for the next
    /// call. The decimation grid is anchored to the absolute stream
    /// position, so output is bit-identical regardless of how the stream is
    /// chunked. The stream starts with `filter_length - 1` implicit zeros
    /// of history.
    pub fn process_streaming(&mut self, input: &[f32]) -> Vec<f32> {
        let history_len = FILTER_LENGTH - 1;
        let half = (FILTER_LENGTH / 2) as u64;

        let mut buffer = Vec::with_capacity(history_len + input.len());
        buffer.extend_from_slice(&self.history);
        buffer.extend_from_slice(input);

        let buffer_end = self.buffer_start + buffer.len() as u64;
        let mut output = Vec::with_capacity(input.len() / self.ratio + 1);

        while self.next_center + half < buffer_end {
            let local = (self.next_center - self.buffer_start) as usize;
            let start = local - half as usize;

            let mut sum = 0.0f32;
            for (k, &c) in self.coefficients.iter().enumerate() {
                sum += buffer[start + k] * c;
            }
            output.push(sum);

            self.next_center += self.ratio as u64;
        }

        let tail_start = buffer.len() - history_len;
        self.history.copy_from_slice(&buffer[tail_start..]);
        self.buffer_start += input.len() as u64;

        output
    }
}
