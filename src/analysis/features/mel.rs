// Mel module - mel scale conversions and triangular filterbank
//
// Filters are built on n_mel + 2 points equally spaced on the mel scale
// between f_min and f_max. Filter m rises from point m to point m + 1 and
// falls to point m + 2, evaluated at the centre frequency of every FFT bin.
// Peaks are 1.0 (no area normalization), so adjacent filters sum to one
// between their centres.

/// Convert frequency in Hz to mel (`2595·log10(1 + f/700)`)
pub fn hz_to_mel(hz: f64) -> f64 {
    2595.0 * (1.0 + hz / 700.0).log10()
}

/// Convert mel back to frequency in Hz
pub fn mel_to_hz(mel: f64) -> f64 {
    700.0 * (10.0_f64.powf(mel / 2595.0) - 1.0)
}

/// Triangular mel filterbank, `n_mel` rows of `n_fft / 2 + 1` weights
#[derive(Debug, Clone)]
pub struct MelFilterbank {
    filters: Vec<Vec<f64>>,
}

impl MelFilterbank {
    pub fn new(n_mel: usize, n_fft: usize, sample_rate: u32, f_min: f64, f_max: f64) -> Self {
        let n_bins = n_fft / 2 + 1;
        let bin_hz = sample_rate as f64 / n_fft as f64;

        let low_mel = hz_to_mel(f_min);
        let high_mel = hz_to_mel(f_max);
        let step = (high_mel - low_mel) / (n_mel + 1) as f64;
        let hz_points: Vec<f64> = (0..n_mel + 2)
            .map(|i| mel_to_hz(low_mel + i as f64 * step))
            .collect();

        let filters = (0..n_mel)
            .map(|m| {
                let (left, center, right) = (hz_points[m], hz_points[m + 1], hz_points[m + 2]);
                (0..n_bins)
                    .map(|k| {
                        let freq = k as f64 * bin_hz;
                        let rising = (freq - left) / (center - left);
                        let falling = (right - freq) / (right - center);
                        rising.min(falling).max(0.0)
                    })
                    .collect()
            })
            .collect();

        Self { filters }
    }

    pub fn n_mel(&self) -> usize {
        self.filters.len()
    }

    pub fn filters(&self) -> &[Vec<f64>] {
        &self.filters
    }

    /// Apply the filterbank to a power spectrum, writing one energy per filter
    ///
    /// Energies below `floor` are clamped to `floor`.
    pub fn apply(&self, power: &[f64], floor: f64, out: &mut [f64]) {
        for (energy, filter) in out.iter_mut().zip(&self.filters) {
            let sum: f64 = filter.iter().zip(power).map(|(w, p)| w * p).sum();
            *energy = sum.max(floor);
        }
    }
}
