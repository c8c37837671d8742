// Pipeline error - union of the stage errors surfaced by PipelineContext

use crate::error::{CaptureError, DspError, ErrorCode, InferenceError};
use std::fmt;

/// Error returned by the end-to-end pipeline.
///
/// Codes are those of the wrapped stage error so the host sees the same
/// numbers whichever entry point it used.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineError {
    Capture(CaptureError),
    Dsp(DspError),
    Inference(InferenceError),
}

impl ErrorCode for PipelineError {
    fn code(&self) -> i32 {
        match self {
            PipelineError::Capture(err) => err.code(),
            PipelineError::Dsp(err) => err.code(),
            PipelineError::Inference(err) => err.code(),
        }
    }

    fn message(&self) -> String {
        match self {
            PipelineError::Capture(err) => err.message(),
            PipelineError::Dsp(err) => err.message(),
            PipelineError::Inference(err) => err.message(),
        }
    }
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::Capture(err) => err.fmt(f),
            PipelineError::Dsp(err) => err.fmt(f),
            PipelineError::Inference(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PipelineError::Capture(err) => Some(err),
            PipelineError::Dsp(err) => Some(err),
            PipelineError::Inference(err) => Some(err),
        }
    }
}

impl From<CaptureError> for PipelineError {
    fn from(err: CaptureError) -> Self {
        PipelineError::Capture(err)
    }
}

impl From<DspError> for PipelineError {
    fn from(err: DspError) -> Self {
        PipelineError::Dsp(err)
    }
}

impl From<InferenceError> for PipelineError {
    fn from(err: InferenceError) -> Self {
        PipelineError::Inference(err)
    }
}
