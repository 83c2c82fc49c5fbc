//! Logarithmically-spaced triangular filterbank
//!
//! Builds the 136-band filterbank applied to magnitude spectra before the
//! beat network. Bands are spaced at a constant count per octave relative to
//! a reference frequency, snapped to FFT bins, and shaped as unit-sum
//! triangles between consecutive band centres.
//!
//! The construction is deterministic in the spectrogram parameters:
//!
//! 1. Enumerate log-spaced centre frequencies `f_k = f_ref * 2^((left+k)/B)`
//!    and keep those inside `[f_min, f_max]`.
//! 2. Snap each frequency to the nearest FFT bin (clamped to `[1, bins-1]`)
//!    and deduplicate preserving order.
//! 3. Build one triangular filter per consecutive bin triple; collapse
//!    triples narrower than two bins to a single-bin filter. Normalise each
//!    filter to unit sum.

/// Generate log-spaced frequencies between `f_min` and `f_max`
///
/// Frequencies are `f_ref * 2^(i / bands_per_octave)` for integer `i` in
/// `[floor(log2(f_min/f_ref)*B), ceil(log2(f_max/f_ref)*B))`, filtered to
/// the closed `[f_min, f_max]` interval.
fn log_frequencies(bands_per_octave: usize, f_min: f32, f_max: f32, f_ref: f32) -> Vec<f32> {
    let left = ((f_min as f64 / f_ref as f64).log2() * bands_per_octave as f64).floor() as i64;
    let right = ((f_max as f64 / f_ref as f64).log2() * bands_per_octave as f64).ceil() as i64;

    (left..right)
        .map(|i| f_ref * 2.0f32.powf(i as f32 / bands_per_octave as f32))
        .filter(|&f| f >= f_min && f <= f_max)
        .collect()
}

/// Snap frequencies to their nearest FFT bins, deduplicated
///
/// Each frequency is clamped into `[1, bins-1]` and assigned to the closer
/// of the two straddling bins; consecutive duplicates are dropped so every
/// resulting bin is unique.
fn frequencies_to_bins(frequencies: &[f32], bin_frequencies: &[f32]) -> Vec<usize> {
    let mut bins: Vec<usize> = Vec::with_capacity(frequencies.len());

    for &freq in frequencies {
        let idx = bin_frequencies.partition_point(|&b| b < freq);
        let idx = idx.clamp(1, bin_frequencies.len() - 1);

        let left = bin_frequencies[idx - 1];
        let right = bin_frequencies[idx];
        let idx = if freq - left < right - freq { idx - 1 } else { idx };

        if bins.last() != Some(&idx) {
            bins.push(idx);
        }
    }

    bins
}

/// Triangular log-spaced filterbank over magnitude spectra
///
/// # Example
///
/// ```
/// use pulsekey::features::mel;
/// use pulsekey::features::mel::LogFilterbank;
///
/// let bank = LogFilterbank::new(
///     mel::FFT_LENGTH,
///     mel::SAMPLE_RATE,
///     mel::BANDS_PER_OCTAVE,
///     mel::F_MIN,
///     mel::F_MAX,
///     mel::F_REF,
/// );
/// assert_eq!(bank.num_bands(), mel::N_BANDS);
/// ```
#[derive(Debug)]
pub struct LogFilterbank {
    num_bins: usize,
    filters: Vec<Vec<f32>>,
}

impl LogFilterbank {
    /// Build the filterbank for the given spectrogram geometry
    ///
    /// `fft_len / 2` spectrum bins are covered (the Nyquist bin is
    /// excluded); bin frequencies follow `i * sample_rate / (2 * bins)`.
    pub fn new(
        fft_len: usize,
        sample_rate: usize,
        bands_per_octave: usize,
        f_min: f32,
        f_max: f32,
        f_ref: f32,
    ) -> Self {
        let num_bins = fft_len / 2;

        let bin_frequencies: Vec<f32> = (0..num_bins)
            .map(|i| i as f32 * sample_rate as f32 / (num_bins * 2) as f32)
            .collect();

        let frequencies = log_frequencies(bands_per_octave, f_min, f_max, f_ref);
        let bins = frequencies_to_bins(&frequencies, &bin_frequencies);

        let mut filters = Vec::new();
        for triple in bins.windows(3) {
            let start = triple[0];
            let mut center = triple[1];
            let mut stop = triple[2];

            // Too-small triples collapse to a single bin
            if stop - start < 2 {
                center = start;
                stop = start + 1;
            }

            let mut filter = vec![0.0f32; num_bins];

            // Rising edge: linspace(0, 1) over [start, center)
            let rise = center - start;
            for k in 0..rise {
                if start + k < num_bins {
                    filter[start + k] = k as f32 / rise as f32;
                }
            }

            // Falling edge: linspace(1, 0) over [center, stop)
            let fall = stop - center;
            for k in 0..fall {
                if center + k < num_bins {
                    filter[center + k] = 1.0 - k as f32 / fall as f32;
                }
            }

            let sum: f32 = filter.iter().sum();
            if sum > 0.0 {
                for v in &mut filter {
                    *v /= sum;
                }
            }

            filters.push(filter);
        }

        log::debug!(
            "Built log filterbank: {} bands over {} bins ({}-{} Hz, {}/octave)",
            filters.len(),
            num_bins,
            f_min,
            f_max,
            bands_per_octave
        );

        Self { num_bins, filters }
    }

    /// Number of filterbank bands
    pub fn num_bands(&self) -> usize {
        self.filters.len()
    }

    /// Number of spectrum bins each filter spans
    pub fn num_bins(&self) -> usize {
        self.num_bins
    }

    /// Apply the filterbank to a magnitude spectrum
    ///
    /// `magnitude` must cover at least `num_bins` values; one output value
    /// per band is produced.
    pub fn apply(&self, magnitude: &[f32]) -> Vec<f32> {
        self.filters
            .iter()
            .map(|filter| {
                filter
                    .iter()
                    .zip(magnitude.iter())
                    .map(|(&w, &m)| w * m)
                    .sum()
            })
            .collect()
    }

    /// Borrow a single filter's weights (for inspection/tests)
    pub fn filter(&self, band: usize) -> &[f32] {
        &self.filters[band]
    }
}

/// Convenience constructor for the beat-network filterbank geometry
impl Default for LogFilterbank {
    fn default() -> Self {
        Self::new(
            super::FFT_LENGTH,
            super::SAMPLE_RATE,
            super::BANDS_PER_OCTAVE,
            super::F_MIN,
            super::F_MAX,
            super::F_REF,
        )
    }
}
