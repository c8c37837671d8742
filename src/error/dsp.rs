// DSP error types and constants
//
// These are programmer errors (size-mismatched transform calls, unusable
// extractor configuration). They never surface from a well-formed
// extraction call.

use crate::error::ErrorCode;
use std::fmt;

/// DSP error code constants
///
/// Error code range: 3001-3002
pub struct DspErrorCodes {}

impl DspErrorCodes {
    /// Buffer length does not match the transform size
    pub const INVALID_ARGUMENT: i32 = 3001;

    /// Extractor configuration is unusable
    pub const INVALID_CONFIG: i32 = 3002;
}

#[derive(Debug, Clone, PartialEq)]
pub enum DspError {
    /// Transform called with buffers of the wrong size
    InvalidArgument { reason: String },

    /// Extractor or transform built from an unusable configuration
    InvalidConfig { reason: String },
}

impl ErrorCode for DspError {
    fn code(&self) -> i32 {
        match self {
            DspError::InvalidArgument { .. } => DspErrorCodes::INVALID_ARGUMENT,
            DspError::InvalidConfig { .. } => DspErrorCodes::INVALID_CONFIG,
        }
    }

    fn message(&self) -> String {
        match self {
            DspError::InvalidArgument { reason } => format!("Invalid argument: {}", reason),
            DspError::InvalidConfig { reason } => {
                format!("Invalid DSP configuration: {}", reason)
            }
        }
    }
}

impl fmt::Display for DspError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "DspError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for DspError {}
