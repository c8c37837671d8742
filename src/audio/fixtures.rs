//! Deterministic audio sources for tests, diagnostics and offline use.
//!
//! `WavSource` replays a WAV file (any channel count, 16/24/32-bit int or
//! float) as mono PCM16 at the requested rate. `SyntheticSource` generates a
//! fixed-length waveform so capture and extraction can run without hardware.

use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;
use std::path::{Path, PathBuf};

use super::resample::{f32_to_i16, resample_linear};
use super::source::{AudioSource, ChunkRead, SampleStream, SourceFormat};
use crate::error::CaptureError;

/// Seed used when a synthetic noise source is not given one
pub const DEFAULT_NOISE_SEED: u64 = 0x5A5A_FFF0;

/// Supported deterministic waveform patterns.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum SyntheticPattern {
    Sine,
    Square,
    WhiteNoise,
    Silence,
}

/// Configuration for synthetic sources.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SyntheticSpec {
    pub pattern: SyntheticPattern,
    #[serde(default = "default_frequency_hz")]
    pub frequency_hz: f32,
    #[serde(default = "default_amplitude")]
    pub amplitude: f32,
    #[serde(default = "default_duration_ms")]
    pub duration_ms: u32,
    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl SyntheticSpec {
    pub fn sine(frequency_hz: f32, amplitude: f32, duration_ms: u32) -> Self {
        Self {
            pattern: SyntheticPattern::Sine,
            frequency_hz,
            amplitude,
            duration_ms,
            seed: DEFAULT_NOISE_SEED,
        }
    }

    pub fn silence(duration_ms: u32) -> Self {
        Self {
            pattern: SyntheticPattern::Silence,
            frequency_hz: default_frequency_hz(),
            amplitude: 0.0,
            duration_ms,
            seed: DEFAULT_NOISE_SEED,
        }
    }

    pub fn white_noise(amplitude: f32, duration_ms: u32, seed: u64) -> Self {
        Self {
            pattern: SyntheticPattern::WhiteNoise,
            frequency_hz: default_frequency_hz(),
            amplitude,
            duration_ms,
            seed,
        }
    }

    /// Render the whole waveform at `sample_rate`
    pub fn render(&self, sample_rate: u32) -> Vec<i16> {
        let total = duration_frames(self.duration_ms, sample_rate);
        let mut rng = StdRng::seed_from_u64(self.seed);
        let amplitude = self.amplitude.clamp(0.0, 1.0);
        let phase_step = self.frequency_hz.max(0.0) / sample_rate.max(1) as f32;
        let mut phase = 0.0f32;

        (0..total)
            .map(|_| {
                let value = match self.pattern {
                    SyntheticPattern::Sine => (2.0 * PI * phase).sin() * amplitude,
                    SyntheticPattern::Square => {
                        if phase < 0.5 {
                            amplitude
                        } else {
                            -amplitude
                        }
                    }
                    SyntheticPattern::WhiteNoise => {
                        if amplitude > 0.0 {
                            rng.gen_range(-amplitude..amplitude)
                        } else {
                            0.0
                        }
                    }
                    SyntheticPattern::Silence => 0.0,
                };
                phase += phase_step;
                if phase >= 1.0 {
                    phase -= phase.floor();
                }
                f32_to_i16(value)
            })
            .collect()
    }
}

fn default_frequency_hz() -> f32 {
    440.0
}

fn default_amplitude() -> f32 {
    0.5
}

fn default_duration_ms() -> u32 {
    1_000
}

fn default_seed() -> u64 {
    DEFAULT_NOISE_SEED
}

fn duration_frames(duration_ms: u32, sample_rate: u32) -> usize {
    ((duration_ms as f64 / 1_000.0) * sample_rate as f64).round() as usize
}

/// Replays pre-rendered PCM16 samples chunk by chunk
#[derive(Debug, Default)]
struct Playback {
    samples: Vec<i16>,
    cursor: usize,
}

impl Playback {
    fn read(&mut self, buffer: &mut [i16]) -> ChunkRead {
        let remaining = self.samples.len().saturating_sub(self.cursor);
        if remaining == 0 {
            return ChunkRead::EndOfStream;
        }
        let n = remaining.min(buffer.len());
        buffer[..n].copy_from_slice(&self.samples[self.cursor..self.cursor + n]);
        self.cursor += n;
        ChunkRead::Data(n)
    }
}

/// Source rendering a [`SyntheticSpec`] at the opened sample rate
pub struct SyntheticSource {
    spec: SyntheticSpec,
    playback: Option<Playback>,
}

impl SyntheticSource {
    pub fn new(spec: SyntheticSpec) -> Self {
        Self {
            spec,
            playback: None,
        }
    }

    pub fn spec(&self) -> &SyntheticSpec {
        &self.spec
    }
}

impl AudioSource for SyntheticSource {
    fn open(&mut self, format: &SourceFormat) -> Result<(), CaptureError> {
        format.ensure_mono_pcm16()?;
        self.playback = Some(Playback {
            samples: self.spec.render(format.sample_rate),
            cursor: 0,
        });
        Ok(())
    }

    fn read_chunk(&mut self, buffer: &mut [i16]) -> Result<ChunkRead, CaptureError> {
        match self.playback.as_mut() {
            Some(playback) => Ok(playback.read(buffer)),
            None => Err(CaptureError::ReadFailed {
                reason: "synthetic source not opened".to_string(),
            }),
        }
    }

    fn close(&mut self) {
        self.playback = None;
    }
}

/// Source replaying a WAV file as mono PCM16
pub struct WavSource {
    path: PathBuf,
    playback: Option<Playback>,
}

impl WavSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            playback: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AudioSource for WavSource {
    fn open(&mut self, format: &SourceFormat) -> Result<(), CaptureError> {
        format.ensure_mono_pcm16()?;
        let (samples, file_rate) = read_wav(&self.path)?;
        let resampled = resample_linear(&samples, file_rate, format.sample_rate);

        log::info!(
            "[WavSource] Opened {} ({} Hz -> {} Hz, {} samples)",
            self.path.display(),
            file_rate,
            format.sample_rate,
            resampled.len()
        );

        self.playback = Some(Playback {
            samples: resampled.into_iter().map(f32_to_i16).collect(),
            cursor: 0,
        });
        Ok(())
    }

    fn read_chunk(&mut self, buffer: &mut [i16]) -> Result<ChunkRead, CaptureError> {
        match self.playback.as_mut() {
            Some(playback) => Ok(playback.read(buffer)),
            None => Err(CaptureError::ReadFailed {
                reason: format!("{} not opened", self.path.display()),
            }),
        }
    }

    fn close(&mut self) {
        self.playback = None;
    }
}

/// Load a whole WAV file as a mono stream at `sample_rate`
pub fn load_wav_stream(path: &Path, sample_rate: u32) -> Result<SampleStream, CaptureError> {
    let (samples, file_rate) = read_wav(path)?;
    let resampled = resample_linear(&samples, file_rate, sample_rate);
    Ok(SampleStream::new(
        resampled.into_iter().map(f32_to_i16).collect(),
        sample_rate,
    ))
}

/// Read a WAV file, downmix to mono and normalize to [-1, 1]
///
/// Returns the samples and the file's own sample rate.
pub fn read_wav(path: &Path) -> Result<(Vec<f32>, u32), CaptureError> {
    let mut reader = hound::WavReader::open(path).map_err(|err| match err {
        hound::Error::IoError(io) => CaptureError::from(io),
        other => CaptureError::UnsupportedFormat {
            reason: format!("failed to open {}: {other}", path.display()),
        },
    })?;
    let spec = reader.spec();
    if spec.channels == 0 {
        return Err(CaptureError::UnsupportedFormat {
            reason: format!("{} has zero channels", path.display()),
        });
    }

    let read_err = |err: hound::Error| CaptureError::ReadFailed {
        reason: format!("error reading {}: {err}", path.display()),
    };

    let samples = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .map(|sample| sample.map_err(read_err))
            .collect::<Result<Vec<f32>, _>>()?,
        hound::SampleFormat::Int => match spec.bits_per_sample {
            16 => reader
                .samples::<i16>()
                .map(|sample| sample.map(|v| v as f32 / 32768.0).map_err(read_err))
                .collect::<Result<Vec<f32>, _>>()?,
            24 => reader
                .samples::<i32>()
                .map(|sample| sample.map(|v| v as f32 / 8_388_608.0).map_err(read_err))
                .collect::<Result<Vec<f32>, _>>()?,
            32 => reader
                .samples::<i32>()
                .map(|sample| sample.map(|v| v as f32 / 2_147_483_648.0).map_err(read_err))
                .collect::<Result<Vec<f32>, _>>()?,
            bits => {
                return Err(CaptureError::UnsupportedFormat {
                    reason: format!(
                        "unsupported bits_per_sample={} for {}",
                        bits,
                        path.display()
                    ),
                })
            }
        },
    };

    if spec.channels == 1 {
        return Ok((samples, spec.sample_rate));
    }

    let channels = spec.channels as usize;
    let mono = samples
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect();

    Ok((mono, spec.sample_rate))
}
