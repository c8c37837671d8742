// MfccExtractor - deterministic MFCC feature extraction for cry classification
//
// This module maps a variable-length 16-bit sample stream onto a fixed-length
// feature vector. The stages mirror the preprocessing the classifier was
// trained with, so constants here are part of the model contract.
//
// Module organization:
// - window: Hamming analysis window
// - mel: mel scale conversions and triangular filterbank
// - dct: orthonormal DCT-II
// - types: FeatureVector
// - mod.rs: Coordinator (MfccExtractor)
//
// Pipeline per frame:
// 1. Normalize samples to [-1, 1] (divide by 32768)
// 2. Frame with n_fft / hop_length (one zero-padded frame for short input)
// 3. Hamming window
// 4. FFT, power spectrum (re² + im²) / n_fft over bins 0..=n_fft/2
// 5. Mel filterbank, energies floored at MEL_ENERGY_FLOOR
// 6. Natural log, DCT-II truncated to n_mfcc
// 7. Mean over frames

mod dct;
mod mel;
mod types;
mod window;

pub use mel::{hz_to_mel, mel_to_hz, MelFilterbank};
pub use types::FeatureVector;
pub use window::hamming_window;

use dct::Dct;

use crate::analysis::fft::Fft;
use crate::config::MfccConfig;
use crate::error::DspError;

/// Floor applied to mel energies before the logarithm
pub const MEL_ENERGY_FLOOR: f64 = 1e-10;

/// Full-scale value of a signed 16-bit sample
const I16_SCALE: f64 = 32768.0;

/// MfccExtractor coordinates the MFCC pipeline
///
/// The window, filterbank, DCT basis and FFT tables are built once in `new`
/// and shared by every call. Extraction takes `&self` and never fails, so one
/// extractor can serve a background worker and the caller concurrently.
pub struct MfccExtractor {
    config: MfccConfig,
    fft: Fft,
    window: Vec<f64>,
    filterbank: MelFilterbank,
    dct: Dct,
}

impl MfccExtractor {
    /// Create a new extractor from an MFCC configuration
    ///
    /// # Errors
    /// `DspError::InvalidConfig` if the configuration fails validation.
    pub fn new(config: MfccConfig) -> Result<Self, DspError> {
        config.validate()?;

        let fft = Fft::new(config.n_fft)?;
        let window = hamming_window(config.n_fft);
        let filterbank = MelFilterbank::new(
            config.n_mel,
            config.n_fft,
            config.sample_rate,
            config.f_min,
            config.effective_f_max(),
        );
        let dct = Dct::new(config.n_mel, config.n_mfcc);

        log::debug!(
            "[MfccExtractor] n_fft={} hop={} n_mel={} n_mfcc={} sr={}",
            config.n_fft,
            config.hop_length,
            config.n_mel,
            config.n_mfcc,
            config.sample_rate
        );

        Ok(Self {
            config,
            fft,
            window,
            filterbank,
            dct,
        })
    }

    pub fn config(&self) -> &MfccConfig {
        &self.config
    }

    /// Length of every feature vector this extractor produces
    pub fn n_mfcc(&self) -> usize {
        self.config.n_mfcc
    }

    /// Number of frames produced for a stream of `len` samples
    ///
    /// Zero for an empty stream, one for anything shorter than a frame,
    /// otherwise `1 + (len - n_fft) / hop_length` (a trailing partial hop is
    /// dropped).
    pub fn frame_count(&self, len: usize) -> usize {
        let n_fft = self.config.n_fft;
        if len == 0 {
            0
        } else if len < n_fft {
            1
        } else {
            1 + (len - n_fft) / self.config.hop_length
        }
    }

    /// Extract the mean-pooled MFCC vector from 16-bit samples
    ///
    /// An empty stream yields an all-zero vector of length `n_mfcc`.
    pub fn extract(&self, samples: &[i16]) -> FeatureVector {
        let normalized = normalize_i16(samples);
        self.mean_pool(&normalized)
    }

    /// Extract from samples already normalized to [-1, 1]
    pub fn extract_f32(&self, samples: &[f32]) -> FeatureVector {
        let normalized: Vec<f64> = samples.iter().map(|&s| s as f64).collect();
        self.mean_pool(&normalized)
    }

    /// Per-frame cepstral vectors, `frame_count(len)` rows of `n_mfcc` values
    pub fn extract_frames(&self, samples: &[i16]) -> Vec<Vec<f32>> {
        let normalized = normalize_i16(samples);
        self.cepstral_frames(&normalized)
            .into_iter()
            .map(|frame| frame.into_iter().map(|c| c as f32).collect())
            .collect()
    }

    fn mean_pool(&self, samples: &[f64]) -> FeatureVector {
        let n_mfcc = self.config.n_mfcc;
        let frames = self.cepstral_frames(samples);
        if frames.is_empty() {
            return FeatureVector::zeros(n_mfcc);
        }

        let mut sums = vec![0.0f64; n_mfcc];
        for frame in &frames {
            for (sum, c) in sums.iter_mut().zip(frame) {
                *sum += c;
            }
        }

        let count = frames.len() as f64;
        tracing::trace!(frames = frames.len(), "mean-pooled cepstral frames");
        FeatureVector::new(sums.into_iter().map(|s| (s / count) as f32).collect())
    }

    fn cepstral_frames(&self, samples: &[f64]) -> Vec<Vec<f64>> {
        let n_fft = self.config.n_fft;
        let hop = self.config.hop_length;
        let n_frames = self.frame_count(samples.len());

        let mut real = vec![0.0f64; n_fft];
        let mut imag = vec![0.0f64; n_fft];
        let mut power = vec![0.0f64; n_fft / 2 + 1];
        let mut mel_energies = vec![0.0f64; self.filterbank.n_mel()];
        let mut frames = Vec::with_capacity(n_frames);

        for t in 0..n_frames {
            let start = t * hop;
            let end = (start + n_fft).min(samples.len());
            let frame = &samples[start..end];

            // Windowed frame, zero-padded past the end of the stream
            for (i, slot) in real.iter_mut().enumerate() {
                *slot = frame.get(i).map_or(0.0, |s| s * self.window[i]);
            }
            imag.fill(0.0);

            if let Err(err) = self.fft.process(&mut real, &mut imag) {
                // Buffers are sized from the same n_fft as the transform
                log::error!("[MfccExtractor] FFT rejected frame {}: {}", t, err);
                return Vec::new();
            }

            power_spectrum(&real, &imag, &mut power);
            self.filterbank.apply(&power, MEL_ENERGY_FLOOR, &mut mel_energies);
            for energy in mel_energies.iter_mut() {
                *energy = energy.ln();
            }

            let mut cepstrum = vec![0.0f64; self.dct.n_out()];
            self.dct.apply(&mel_energies, &mut cepstrum);
            frames.push(cepstrum);
        }

        frames
    }
}

/// One-sided power spectrum `(re² + im²) / n` of an unnormalized transform
///
/// `n` is the transform length (`real.len()`); `out` holds bins `0..out.len()`.
fn power_spectrum(real: &[f64], imag: &[f64], out: &mut [f64]) {
    let n = real.len() as f64;
    for (k, p) in out.iter_mut().enumerate() {
        *p = (real[k] * real[k] + imag[k] * imag[k]) / n;
    }
}

fn normalize_i16(samples: &[i16]) -> Vec<f64> {
    samples.iter().map(|&s| s as f64 / I16_SCALE).collect()
}
