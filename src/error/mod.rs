// Error types for the cry classifier core
//
// This module defines custom error types for capture, DSP and inference
// operations, providing structured error handling with error codes suitable
// for FFI communication with the host application.

mod capture;
mod dsp;
mod inference;
mod pipeline;

pub use capture::{log_capture_error, CaptureError, CaptureErrorCodes};
pub use dsp::{DspError, DspErrorCodes};
pub use inference::{log_inference_error, InferenceError, InferenceErrorCodes};
pub use pipeline::PipelineError;

/// Error codes for structured error reporting
///
/// This trait provides a standard way to get error codes and messages
/// from custom error types, enabling consistent error handling across
/// the FFI boundary.
pub trait ErrorCode {
    /// Get the numeric error code
    fn code(&self) -> i32;

    /// Get the human-readable error message
    fn message(&self) -> String;
}
