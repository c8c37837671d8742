// Audio module - sources and bounded capture of one utterance

pub mod cancel;
pub mod capture;
pub mod fixtures;
#[cfg(not(target_os = "android"))]
pub mod microphone;
pub mod resample;
pub mod source;

// Re-export commonly used types for convenience
pub use cancel::CancellationToken;
pub use capture::{CaptureBuffer, CaptureOutcome, StopReason};
pub use fixtures::{load_wav_stream, SyntheticPattern, SyntheticSource, SyntheticSpec, WavSource};
#[cfg(not(target_os = "android"))]
pub use microphone::MicrophoneSource;
pub use source::{AudioSource, ChunkRead, SampleEncoding, SampleStream, SourceFormat};
