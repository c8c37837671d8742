// MicrophoneSource - default input device via cpal
//
// The cpal callback takes the first channel of each frame, converts it to
// f32 and pushes it into a lock-free rtrb ring. read_chunk drains the ring
// on the calling thread, resamples from the device rate to the requested
// rate and converts to PCM16. Samples that arrive while the ring is full are
// dropped and counted.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SizedSample};
use rtrb::{Consumer, Producer, RingBuffer};

use super::resample::{f32_to_i16, StreamResampler};
use super::source::{AudioSource, ChunkRead, SourceFormat};
use crate::error::CaptureError;

/// Ring capacity in seconds of device audio
const RING_SECONDS: u32 = 2;

/// Poll interval while waiting for the callback to deliver audio
const POLL_INTERVAL: Duration = Duration::from_millis(2);

/// Longest a single read may block: the playback duration of the chunk
fn read_wait_limit(chunk_len: usize, sample_rate: u32) -> Duration {
    let nanos = chunk_len as u128 * 1_000_000_000 / sample_rate.max(1) as u128;
    Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
}

struct ActiveStream {
    stream: cpal::Stream,
    consumer: Consumer<f32>,
    resampler: StreamResampler,
    device_rate: u32,
    target_rate: u32,
}

/// Live capture from the host's default input device
pub struct MicrophoneSource {
    active: Option<ActiveStream>,
    stream_failed: Arc<AtomicBool>,
    dropped_samples: Arc<AtomicU64>,
}

impl Default for MicrophoneSource {
    fn default() -> Self {
        Self::new()
    }
}

impl MicrophoneSource {
    pub fn new() -> Self {
        Self {
            active: None,
            stream_failed: Arc::new(AtomicBool::new(false)),
            dropped_samples: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Samples lost because the ring buffer was full
    pub fn dropped_samples(&self) -> u64 {
        self.dropped_samples.load(Ordering::Relaxed)
    }

    fn build_stream<T>(
        &self,
        device: &cpal::Device,
        config: &cpal::StreamConfig,
        mut producer: Producer<f32>,
    ) -> Result<cpal::Stream, CaptureError>
    where
        T: SizedSample + Send + 'static,
        f32: FromSample<T>,
    {
        let channels = config.channels.max(1) as usize;
        let dropped = Arc::clone(&self.dropped_samples);
        let failed = Arc::clone(&self.stream_failed);

        device
            .build_input_stream(
                config,
                move |data: &[T], _: &cpal::InputCallbackInfo| {
                    for frame in data.chunks(channels) {
                        let sample = frame.first().map_or(0.0, |s| s.to_sample::<f32>());
                        if producer.push(sample).is_err() {
                            dropped.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                },
                move |err| {
                    log::error!("[MicrophoneSource] Input stream error: {}", err);
                    failed.store(true, Ordering::Release);
                },
                None,
            )
            .map_err(|e| CaptureError::Unavailable {
                reason: format!("failed to build input stream: {}", e),
            })
    }
}

impl AudioSource for MicrophoneSource {
    fn open(&mut self, format: &SourceFormat) -> Result<(), CaptureError> {
        format.ensure_mono_pcm16()?;
        self.close();

        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or_else(|| CaptureError::Unavailable {
                reason: "No default input device found".to_string(),
            })?;

        let supported = device
            .default_input_config()
            .map_err(|e| CaptureError::Unavailable {
                reason: format!("Failed to get default input config: {}", e),
            })?;

        let stream_config: cpal::StreamConfig = supported.config();
        let device_rate = stream_config.sample_rate.0;
        let (producer, consumer) = RingBuffer::<f32>::new((device_rate * RING_SECONDS) as usize);

        self.stream_failed.store(false, Ordering::Release);
        self.dropped_samples.store(0, Ordering::Relaxed);

        let stream = match supported.sample_format() {
            cpal::SampleFormat::F32 => self.build_stream::<f32>(&device, &stream_config, producer)?,
            cpal::SampleFormat::I16 => self.build_stream::<i16>(&device, &stream_config, producer)?,
            cpal::SampleFormat::U16 => self.build_stream::<u16>(&device, &stream_config, producer)?,
            cpal::SampleFormat::I32 => self.build_stream::<i32>(&device, &stream_config, producer)?,
            other => {
                return Err(CaptureError::UnsupportedFormat {
                    reason: format!("device sample format {:?} is not supported", other),
                })
            }
        };

        stream.play().map_err(|e| CaptureError::Unavailable {
            reason: format!("failed to start input stream: {}", e),
        })?;

        log::info!(
            "[MicrophoneSource] Opened default input: {} Hz x {} ch -> {} Hz mono",
            device_rate,
            stream_config.channels,
            format.sample_rate
        );

        self.active = Some(ActiveStream {
            stream,
            consumer,
            resampler: StreamResampler::new(device_rate, format.sample_rate),
            device_rate,
            target_rate: format.sample_rate,
        });
        Ok(())
    }

    fn read_chunk(&mut self, buffer: &mut [i16]) -> Result<ChunkRead, CaptureError> {
        let active = self.active.as_mut().ok_or_else(|| CaptureError::ReadFailed {
            reason: "microphone not opened".to_string(),
        })?;

        // A short chunk at the limit keeps capture within its one-chunk slack
        let wait_limit =
            Instant::now().checked_add(read_wait_limit(buffer.len(), active.target_rate));
        let mut scratch = Vec::with_capacity(active.device_rate as usize / 10);
        let mut written = 0;

        while written < buffer.len() {
            if self.stream_failed.load(Ordering::Acquire) {
                return Err(CaptureError::ReadFailed {
                    reason: "input stream reported an error".to_string(),
                });
            }

            while let Some(sample) = active.resampler.pop() {
                buffer[written] = f32_to_i16(sample);
                written += 1;
                if written == buffer.len() {
                    break;
                }
            }
            if written == buffer.len() {
                break;
            }

            if wait_limit.is_some_and(|limit| Instant::now() >= limit) {
                break;
            }

            scratch.clear();
            while let Ok(sample) = active.consumer.pop() {
                scratch.push(sample);
            }
            if scratch.is_empty() {
                std::thread::sleep(POLL_INTERVAL);
            } else {
                active.resampler.push(&scratch);
            }
        }

        Ok(ChunkRead::Data(written))
    }

    fn close(&mut self) {
        if let Some(active) = self.active.take() {
            if let Err(e) = active.stream.pause() {
                log::warn!("[MicrophoneSource] Failed to pause stream: {}", e);
            }
            drop(active.stream);
            let dropped = self.dropped_samples();
            if dropped > 0 {
                log::warn!("[MicrophoneSource] Dropped {} samples (ring full)", dropped);
            }
            log::info!("[MicrophoneSource] Closed");
        }
    }
}

impl Drop for MicrophoneSource {
    fn drop(&mut self) {
        self.close();
    }
}
