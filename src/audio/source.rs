// Audio source boundary and the captured sample stream

use std::path::Path;

use crate::error::CaptureError;

/// Sample encoding requested from a source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleEncoding {
    /// Signed 16-bit little-endian PCM
    Pcm16,
}

/// Format a source is opened with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceFormat {
    pub sample_rate: u32,
    pub channels: u16,
    pub encoding: SampleEncoding,
}

impl SourceFormat {
    /// Mono 16-bit PCM at `sample_rate`, the only format the capture loop uses
    pub fn mono_pcm16(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            channels: 1,
            encoding: SampleEncoding::Pcm16,
        }
    }

    /// Reject anything other than mono PCM16
    pub fn ensure_mono_pcm16(&self) -> Result<(), CaptureError> {
        if self.channels != 1 || self.encoding != SampleEncoding::Pcm16 {
            return Err(CaptureError::UnsupportedFormat {
                reason: format!(
                    "expected mono PCM16, got {} channel(s) {:?}",
                    self.channels, self.encoding
                ),
            });
        }
        if self.sample_rate == 0 {
            return Err(CaptureError::UnsupportedFormat {
                reason: "sample rate must be > 0".to_string(),
            });
        }
        Ok(())
    }
}

/// Result of one chunk read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkRead {
    /// `n` samples were written to the front of the buffer
    Data(usize),
    /// The source has no more samples
    EndOfStream,
}

/// A blocking PCM source read one chunk at a time.
///
/// `open` acquires the underlying device or file, `read_chunk` may block
/// for up to about one chunk of audio, and `close` releases the handle.
/// `close` must tolerate being called on a source that never opened.
pub trait AudioSource {
    fn open(&mut self, format: &SourceFormat) -> Result<(), CaptureError>;
    fn read_chunk(&mut self, buffer: &mut [i16]) -> Result<ChunkRead, CaptureError>;
    fn close(&mut self);
}

impl<S: AudioSource + ?Sized> AudioSource for Box<S> {
    fn open(&mut self, format: &SourceFormat) -> Result<(), CaptureError> {
        (**self).open(format)
    }

    fn read_chunk(&mut self, buffer: &mut [i16]) -> Result<ChunkRead, CaptureError> {
        (**self).read_chunk(buffer)
    }

    fn close(&mut self) {
        (**self).close()
    }
}

/// Mono 16-bit samples captured at a fixed rate
///
/// Created once per recording and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleStream {
    samples: Vec<i16>,
    sample_rate: u32,
}

impl SampleStream {
    pub fn new(samples: Vec<i16>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_secs(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f32 / self.sample_rate as f32
    }

    pub fn into_samples(self) -> Vec<i16> {
        self.samples
    }

    /// Write the stream as a mono 16-bit WAV file
    pub fn write_wav(&self, path: &Path) -> Result<(), CaptureError> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let to_err = |err: hound::Error| CaptureError::Unavailable {
            reason: format!("failed to write {}: {err}", path.display()),
        };

        let mut writer = hound::WavWriter::create(path, spec).map_err(to_err)?;
        for &sample in &self.samples {
            writer.write_sample(sample).map_err(to_err)?;
        }
        writer.finalize().map_err(to_err)
    }
}

impl AsRef<[i16]> for SampleStream {
    fn as_ref(&self) -> &[i16] {
        &self.samples
    }
}
