//! Configuration management for the cry classification pipeline
//!
//! This module provides runtime configuration loading from JSON files so
//! capture limits, MFCC parameters and the label table can be adjusted
//! without recompiling. The MFCC parameters must match the preprocessing the
//! deployed model was trained with.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{CaptureError, DspError, InferenceError, PipelineError};

/// Sample rate the bundled models were trained at.
pub const DEFAULT_SAMPLE_RATE: u32 = 22_050;

/// Upper bound on a single recording's sample budget (10 minutes at 48 kHz).
pub const MAX_CAPTURE_SAMPLES: usize = 48_000 * 600;

/// Label emitted for model classes beyond the configured label table.
pub const OTHER_LABEL: &str = "Other";

/// Default ordered label table (index = model output class).
pub const DEFAULT_LABELS: [&str; 7] = [
    "hungry",
    "tired",
    "discomfort",
    "belly_pain",
    "burping",
    "cold_hot",
    "lonely",
];

/// Complete application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub capture: CaptureConfig,
    #[serde(default)]
    pub features: MfccConfig,
    #[serde(default)]
    pub inference: InferenceConfig,
}

/// Capture buffer limits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Sample rate requested from the audio source in Hz
    pub sample_rate: u32,
    /// Hard cap on recording length in seconds
    pub max_duration_secs: f32,
    /// Recordings shorter than this yield no result
    pub min_duration_secs: f32,
    /// Samples requested per source read
    pub chunk_size: usize,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            max_duration_secs: 7.0,
            min_duration_secs: 0.5,
            chunk_size: 1024,
        }
    }
}

impl CaptureConfig {
    /// Maximum number of samples a single recording may hold
    pub fn max_samples(&self) -> usize {
        (self.max_duration_secs.max(0.0) * self.sample_rate as f32) as usize
    }

    /// Minimum number of samples for a usable recording
    pub fn min_samples(&self) -> usize {
        (self.min_duration_secs.max(0.0) * self.sample_rate as f32) as usize
    }

    pub fn validate(&self) -> Result<(), CaptureError> {
        if self.sample_rate == 0 {
            return Err(CaptureError::InvalidConfig {
                reason: "sample_rate must be > 0".to_string(),
            });
        }
        if self.chunk_size == 0 {
            return Err(CaptureError::InvalidConfig {
                reason: "chunk_size must be > 0".to_string(),
            });
        }
        if !self.max_duration_secs.is_finite() || self.max_duration_secs <= 0.0 {
            return Err(CaptureError::InvalidConfig {
                reason: format!(
                    "max_duration_secs must be positive (got {})",
                    self.max_duration_secs
                ),
            });
        }
        if self.max_samples() > MAX_CAPTURE_SAMPLES {
            return Err(CaptureError::InvalidConfig {
                reason: format!(
                    "max_duration_secs {} at {} Hz exceeds the {} sample cap",
                    self.max_duration_secs, self.sample_rate, MAX_CAPTURE_SAMPLES
                ),
            });
        }
        if !(0.0..=self.max_duration_secs).contains(&self.min_duration_secs) {
            return Err(CaptureError::InvalidConfig {
                reason: format!(
                    "min_duration_secs {} must lie in [0, {}]",
                    self.min_duration_secs, self.max_duration_secs
                ),
            });
        }
        Ok(())
    }
}

/// MFCC extraction parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MfccConfig {
    /// Sample rate of the incoming stream in Hz
    pub sample_rate: u32,
    /// Frame length and FFT size (power of two)
    pub n_fft: usize,
    /// Samples between successive frame starts
    pub hop_length: usize,
    /// Number of triangular mel filters
    pub n_mel: usize,
    /// Number of cepstral coefficients kept per frame
    pub n_mfcc: usize,
    /// Lower filterbank edge in Hz
    pub f_min: f64,
    /// Upper filterbank edge in Hz; `None` means Nyquist
    pub f_max: Option<f64>,
}

impl Default for MfccConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            n_fft: 512,
            hop_length: 256,
            n_mel: 40,
            n_mfcc: 40,
            f_min: 0.0,
            f_max: None,
        }
    }
}

impl MfccConfig {
    /// Upper filterbank edge, clamped to Nyquist
    pub fn effective_f_max(&self) -> f64 {
        let nyquist = self.sample_rate as f64 / 2.0;
        self.f_max.map(|f| f.min(nyquist)).unwrap_or(nyquist)
    }

    pub fn validate(&self) -> Result<(), DspError> {
        if self.sample_rate == 0 {
            return Err(DspError::InvalidConfig {
                reason: "sample_rate must be > 0".to_string(),
            });
        }
        if self.n_fft < 2 || !self.n_fft.is_power_of_two() {
            return Err(DspError::InvalidConfig {
                reason: format!("n_fft must be a power of two >= 2 (got {})", self.n_fft),
            });
        }
        if self.hop_length == 0 {
            return Err(DspError::InvalidConfig {
                reason: "hop_length must be > 0".to_string(),
            });
        }
        if self.n_mel == 0 || self.n_mfcc == 0 {
            return Err(DspError::InvalidConfig {
                reason: format!(
                    "n_mel and n_mfcc must be > 0 (got {} and {})",
                    self.n_mel, self.n_mfcc
                ),
            });
        }
        if self.f_min < 0.0 || self.f_min >= self.effective_f_max() {
            return Err(DspError::InvalidConfig {
                reason: format!(
                    "f_min {} must lie below f_max {}",
                    self.f_min,
                    self.effective_f_max()
                ),
            });
        }
        Ok(())
    }
}

/// Inference adapter configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    /// Ordered label table; index `i` names model output class `i`
    pub labels: Vec<String>,
    /// Model blob loaded when no path is given explicitly
    pub model_path: Option<PathBuf>,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            labels: DEFAULT_LABELS.iter().map(|l| l.to_string()).collect(),
            model_path: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from JSON file
    ///
    /// Missing sections take their defaults. If the file doesn't exist or the
    /// JSON is invalid, the full default configuration is returned.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    log::info!("[Config] Loaded configuration from {:?}", path.as_ref());
                    config
                }
                Err(err) => {
                    log::warn!(
                        "[Config] Failed to parse JSON from {:?}: {}. Using defaults.",
                        path.as_ref(),
                        err
                    );
                    Self::default()
                }
            },
            Err(err) => {
                log::warn!(
                    "[Config] Failed to read config file {:?}: {}. Using defaults.",
                    path.as_ref(),
                    err
                );
                Self::default()
            }
        }
    }

    /// Check every section plus cross-section consistency
    pub fn validate(&self) -> Result<(), PipelineError> {
        self.capture.validate()?;
        self.features.validate()?;
        if self.capture.sample_rate != self.features.sample_rate {
            return Err(PipelineError::Dsp(DspError::InvalidConfig {
                reason: format!(
                    "capture sample_rate {} differs from features sample_rate {}",
                    self.capture.sample_rate, self.features.sample_rate
                ),
            }));
        }
        if self.inference.labels.is_empty() {
            return Err(PipelineError::Inference(InferenceError::ModelLoadFailed {
                reason: "inference.labels must not be empty".to_string(),
            }));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.capture.sample_rate, 22_050);
        assert_eq!(config.features.n_fft, 512);
        assert_eq!(config.features.hop_length, 256);
        assert_eq!(config.inference.labels.len(), 7);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_sample_budgets() {
        let capture = CaptureConfig::default();
        assert_eq!(capture.max_samples(), 7 * 22_050);
        assert_eq!(capture.min_samples(), 11_025);
    }

    #[test]
    fn test_json_roundtrip() {
        let config = AppConfig::default();
        let json = serde_json::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let parsed: AppConfig =
            serde_json::from_str(r#"{ "features": { "n_mfcc": 13 } }"#).unwrap();
        assert_eq!(parsed.features.n_mfcc, 13);
        assert_eq!(parsed.features.n_fft, 512);
        assert_eq!(parsed.capture, CaptureConfig::default());
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = AppConfig::load_from_file("/nonexistent/cry_config.json");
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = AppConfig::default();
        config.features.n_fft = 500;
        assert!(matches!(
            config.validate(),
            Err(PipelineError::Dsp(DspError::InvalidConfig { .. }))
        ));

        let mut config = AppConfig::default();
        config.capture.min_duration_secs = 10.0;
        assert!(matches!(
            config.validate(),
            Err(PipelineError::Capture(CaptureError::InvalidConfig { .. }))
        ));

        let mut config = AppConfig::default();
        config.capture.sample_rate = 16_000;
        assert!(config.validate().is_err());

        for max in [f32::INFINITY, f32::NAN, 1.0e30, 3_600.0] {
            let mut config = AppConfig::default();
            config.capture.max_duration_secs = max;
            assert!(
                matches!(
                    config.validate(),
                    Err(PipelineError::Capture(CaptureError::InvalidConfig { .. }))
                ),
                "max_duration_secs {} should be rejected",
                max
            );
        }

        let mut config = AppConfig::default();
        config.inference.labels.clear();
        assert!(matches!(
            config.validate(),
            Err(PipelineError::Inference(InferenceError::ModelLoadFailed { .. }))
        ));
    }
}
