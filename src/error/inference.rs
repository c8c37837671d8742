// Inference error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Inference error code constants
///
/// Error code range: 2001-2005
pub struct InferenceErrorCodes {}

impl InferenceErrorCodes {
    /// `classify` called before `load` (or after `release`)
    pub const NOT_LOADED: i32 = 2001;

    /// Engine reported a failure during the forward pass
    pub const INFERENCE_FAILED: i32 = 2002;

    /// Model bytes could not be turned into an engine
    pub const MODEL_LOAD_FAILED: i32 = 2003;

    /// Engine returned an output the decoder cannot use
    pub const INVALID_OUTPUT: i32 = 2004;

    /// Shared adapter lock was poisoned
    pub const LOCK_POISONED: i32 = 2005;
}

/// Log an inference error with structured context
pub fn log_inference_error(err: &InferenceError, context: &str) {
    error!(
        "Inference error in {}: code={}, component=InferenceAdapter, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Inference-related errors
///
/// Unlike feature extraction, the inference boundary never degrades
/// silently: a missing or broken model is reported to the caller.
///
/// Error code range: 2001-2005
#[derive(Debug, Clone, PartialEq)]
pub enum InferenceError {
    /// No engine loaded
    NotLoaded,

    /// Engine failure during `run`, carrying the engine's own message
    InferenceFailed { message: String },

    /// Engine factory rejected the model bytes
    ModelLoadFailed { reason: String },

    /// Engine output was empty or otherwise undecodable
    InvalidOutput { reason: String },

    /// Mutex around the shared adapter was poisoned
    LockPoisoned,
}

impl ErrorCode for InferenceError {
    fn code(&self) -> i32 {
        match self {
            InferenceError::NotLoaded => InferenceErrorCodes::NOT_LOADED,
            InferenceError::InferenceFailed { .. } => InferenceErrorCodes::INFERENCE_FAILED,
            InferenceError::ModelLoadFailed { .. } => InferenceErrorCodes::MODEL_LOAD_FAILED,
            InferenceError::InvalidOutput { .. } => InferenceErrorCodes::INVALID_OUTPUT,
            InferenceError::LockPoisoned => InferenceErrorCodes::LOCK_POISONED,
        }
    }

    fn message(&self) -> String {
        match self {
            InferenceError::NotLoaded => {
                "Inference engine not loaded. Call load() first.".to_string()
            }
            InferenceError::InferenceFailed { message } => {
                format!("Inference failed: {}", message)
            }
            InferenceError::ModelLoadFailed { reason } => {
                format!("Failed to load model: {}", reason)
            }
            InferenceError::InvalidOutput { reason } => {
                format!("Invalid model output: {}", reason)
            }
            InferenceError::LockPoisoned => "Inference adapter lock poisoned".to_string(),
        }
    }
}

impl fmt::Display for InferenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "InferenceError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for InferenceError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inference_error_codes() {
        assert_eq!(
            InferenceError::NotLoaded.code(),
            InferenceErrorCodes::NOT_LOADED
        );
        assert_eq!(
            InferenceError::InferenceFailed {
                message: "boom".to_string()
            }
            .code(),
            InferenceErrorCodes::INFERENCE_FAILED
        );
        assert_eq!(
            InferenceError::ModelLoadFailed {
                reason: "bad".to_string()
            }
            .code(),
            InferenceErrorCodes::MODEL_LOAD_FAILED
        );
        assert_eq!(
            InferenceError::InvalidOutput {
                reason: "empty".to_string()
            }
            .code(),
            InferenceErrorCodes::INVALID_OUTPUT
        );
        assert_eq!(
            InferenceError::LockPoisoned.code(),
            InferenceErrorCodes::LOCK_POISONED
        );
    }

    #[test]
    fn test_inference_failed_keeps_engine_message() {
        let err = InferenceError::InferenceFailed {
            message: "tensor arena exhausted".to_string(),
        };
        assert_eq!(err.message(), "Inference failed: tensor arena exhausted");
    }

    #[test]
    fn test_inference_error_display() {
        let err = InferenceError::NotLoaded;
        let display = format!("{}", err);
        assert!(display.contains("InferenceError"));
        assert!(display.contains("2001"));
    }
}
