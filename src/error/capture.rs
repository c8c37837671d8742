// Capture error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Capture error code constants
///
/// Single source of truth for the numeric codes shared with the host
/// application.
///
/// Error code range: 1001-1005
pub struct CaptureErrorCodes {}

impl CaptureErrorCodes {
    /// Audio device could not be opened or is missing
    pub const UNAVAILABLE: i32 = 1001;

    /// Microphone permission denied
    pub const PERMISSION_DENIED: i32 = 1002;

    /// A chunk read failed after the source was opened
    pub const READ_FAILED: i32 = 1003;

    /// Device does not offer the requested format
    pub const UNSUPPORTED_FORMAT: i32 = 1004;

    /// Capture configuration is unusable
    pub const INVALID_CONFIG: i32 = 1005;
}

/// Log a capture error with structured context
///
/// Emits the numeric code, component and message on a single line so
/// host-side log scrapers can pick them up.
pub fn log_capture_error(err: &CaptureError, context: &str) {
    error!(
        "Capture error in {}: code={}, component=CaptureBuffer, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Capture-related errors
///
/// Only `Unavailable`, `PermissionDenied`, `UnsupportedFormat` and
/// `InvalidConfig` ever reach the caller of a recording. `ReadFailed` is
/// reported by sources and terminates the capture loop without surfacing.
///
/// Error code range: 1001-1005
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureError {
    /// Audio device missing or failed to open
    Unavailable { reason: String },

    /// Microphone permission denied
    PermissionDenied,

    /// Chunk read failed mid-recording
    ReadFailed { reason: String },

    /// Device cannot deliver the requested sample format
    UnsupportedFormat { reason: String },

    /// Capture configuration rejected before opening the source
    InvalidConfig { reason: String },
}

impl ErrorCode for CaptureError {
    fn code(&self) -> i32 {
        match self {
            CaptureError::Unavailable { .. } => CaptureErrorCodes::UNAVAILABLE,
            CaptureError::PermissionDenied => CaptureErrorCodes::PERMISSION_DENIED,
            CaptureError::ReadFailed { .. } => CaptureErrorCodes::READ_FAILED,
            CaptureError::UnsupportedFormat { .. } => CaptureErrorCodes::UNSUPPORTED_FORMAT,
            CaptureError::InvalidConfig { .. } => CaptureErrorCodes::INVALID_CONFIG,
        }
    }

    fn message(&self) -> String {
        match self {
            CaptureError::Unavailable { reason } => {
                format!("Audio capture unavailable: {}", reason)
            }
            CaptureError::PermissionDenied => {
                "Microphone permission denied. Please grant microphone access.".to_string()
            }
            CaptureError::ReadFailed { reason } => {
                format!("Audio read failed: {}", reason)
            }
            CaptureError::UnsupportedFormat { reason } => {
                format!("Unsupported capture format: {}", reason)
            }
            CaptureError::InvalidConfig { reason } => {
                format!("Invalid capture configuration: {}", reason)
            }
        }
    }
}

impl fmt::Display for CaptureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CaptureError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for CaptureError {}

impl From<std::io::Error> for CaptureError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::PermissionDenied => CaptureError::PermissionDenied,
            _ => CaptureError::Unavailable {
                reason: err.to_string(),
            },
        }
    }
}
