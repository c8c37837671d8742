// CaptureBuffer - bounded, cancellable recording of one utterance
//
// Control loop:
// 1. Open the source as mono PCM16 at the configured rate
// 2. While the token is not cancelled and the budget is not reached, read a
//    chunk and append at most the remaining budget (excess is discarded)
// 3. Stop on cancellation, budget, end of stream, read error or deadline
// 4. Close the source (always, via SourceGuard)
// 5. Below the minimum duration -> CaptureOutcome::TooShort

use std::time::{Duration, Instant};

use super::cancel::CancellationToken;
use super::source::{AudioSource, ChunkRead, SampleStream, SourceFormat};
use crate::config::CaptureConfig;
use crate::error::{log_capture_error, CaptureError};

/// Chunks of sample storage reserved up front; the rest grows on demand
const PREALLOC_CHUNKS: usize = 64;

/// Result of a recording attempt that did not fail
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureOutcome {
    /// Enough audio was captured
    Captured(SampleStream),
    /// Fewer than `required` samples were captured; no result
    TooShort { samples: usize, required: usize },
}

impl CaptureOutcome {
    pub fn stream(&self) -> Option<&SampleStream> {
        match self {
            CaptureOutcome::Captured(stream) => Some(stream),
            CaptureOutcome::TooShort { .. } => None,
        }
    }

    pub fn into_stream(self) -> Option<SampleStream> {
        match self {
            CaptureOutcome::Captured(stream) => Some(stream),
            CaptureOutcome::TooShort { .. } => None,
        }
    }
}

/// Why the capture loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Cancelled,
    BudgetReached,
    EndOfStream,
    ReadError,
    Deadline,
}

/// Closes the wrapped source when dropped
struct SourceGuard<'a, S: AudioSource + ?Sized> {
    source: &'a mut S,
}

impl<S: AudioSource + ?Sized> Drop for SourceGuard<'_, S> {
    fn drop(&mut self) {
        self.source.close();
    }
}

/// Records one utterance from an [`AudioSource`]
///
/// Holds no per-recording state; one recording at a time per source.
#[derive(Debug, Clone)]
pub struct CaptureBuffer {
    config: CaptureConfig,
}

impl CaptureBuffer {
    /// # Errors
    /// `CaptureError::InvalidConfig` if the configuration fails validation.
    pub fn new(config: CaptureConfig) -> Result<Self, CaptureError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    /// Record until cancelled, the budget is full, or the source ends
    ///
    /// Only a failure to open the source is returned as an error. Read
    /// errors end the loop and are logged. The source is closed before this
    /// returns on every path.
    pub fn record<S: AudioSource + ?Sized>(
        &self,
        source: &mut S,
        token: &CancellationToken,
    ) -> Result<CaptureOutcome, CaptureError> {
        let (samples, reason) = self.fill(source, token)?;

        let required = self.config.min_samples();
        log::info!(
            "[CaptureBuffer] Stopped ({:?}) with {} samples ({:.2}s)",
            reason,
            samples.len(),
            samples.len() as f32 / self.config.sample_rate as f32
        );

        if samples.len() < required {
            log::info!(
                "[CaptureBuffer] Recording too short: {} < {} samples",
                samples.len(),
                required
            );
            return Ok(CaptureOutcome::TooShort {
                samples: samples.len(),
                required,
            });
        }

        Ok(CaptureOutcome::Captured(SampleStream::new(
            samples,
            self.config.sample_rate,
        )))
    }

    fn fill<S: AudioSource + ?Sized>(
        &self,
        source: &mut S,
        token: &CancellationToken,
    ) -> Result<(Vec<i16>, StopReason), CaptureError> {
        let mut guard = SourceGuard { source };
        let format = SourceFormat::mono_pcm16(self.config.sample_rate);
        if let Err(err) = guard.source.open(&format) {
            log_capture_error(&err, "CaptureBuffer::record");
            return Err(err);
        }

        let budget = self.config.max_samples();
        let deadline = self
            .wall_clock_limit()
            .and_then(|limit| Instant::now().checked_add(limit));
        let mut samples = Vec::with_capacity(budget.min(self.config.chunk_size * PREALLOC_CHUNKS));
        let mut chunk = vec![0i16; self.config.chunk_size];

        let reason = loop {
            if token.is_cancelled() {
                break StopReason::Cancelled;
            }
            if samples.len() >= budget {
                break StopReason::BudgetReached;
            }
            if deadline.is_some_and(|d| Instant::now() >= d) {
                log::warn!("[CaptureBuffer] Wall-clock limit reached before sample budget");
                break StopReason::Deadline;
            }

            match guard.source.read_chunk(&mut chunk) {
                Ok(ChunkRead::Data(n)) => {
                    let n = n.min(chunk.len());
                    let take = n.min(budget - samples.len());
                    samples.extend_from_slice(&chunk[..take]);
                    tracing::trace!(read = n, kept = take, total = samples.len(), "chunk");
                }
                Ok(ChunkRead::EndOfStream) => break StopReason::EndOfStream,
                Err(err) => {
                    log_capture_error(&err, "CaptureBuffer::record");
                    break StopReason::ReadError;
                }
            }
        };

        drop(guard);
        Ok((samples, reason))
    }

    // max duration plus one chunk of slack; None when not representable
    fn wall_clock_limit(&self) -> Option<Duration> {
        let chunk_secs = self.config.chunk_size as f64 / self.config.sample_rate as f64;
        Duration::try_from_secs_f64(self.config.max_duration_secs as f64 + chunk_secs).ok()
    }
}

#[cfg(test)]
#[path = "capture_tests.rs"]
mod tests;
