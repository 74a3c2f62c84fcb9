// SPDX-License-Identifier: GPL-3.0-only

//! Error types for the photo booth

use crate::app::CaptureStateKind;
use std::fmt;

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Main application error type
#[derive(Debug, Clone)]
pub enum AppError {
    /// Configuration errors
    Config(String),
    /// Storage/filesystem errors
    Storage(String),
}

/// Reasons a capture request failed
///
/// Backends never return these from a call; they travel on the camera's
/// event channel as `CameraEvent::CaptureError`. The `Display` text is the
/// message shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    /// `capture_photo` before a successful `initialize`
    NotInitialized,
    /// Device or tool vanished after initialization
    Unavailable(String),
    /// The device is not streaming
    PreviewNotActive,
    /// The capture endpoint has no frame yet
    NotReady,
    /// A capture is already in flight
    InProgress,
    /// No capture program could be started
    ProcessStartFailed,
    /// The capture program exited with a non-zero status
    ProcessExited { code: i32 },
    /// The capture program was killed by a signal
    ProcessCrashed,
    /// Writing the photo failed
    SaveFailed(String),
    /// The photo file is missing or is not a decodable image
    DecodeFailed(String),
    /// The operating system refused access to the device
    PermissionDenied(String),
    /// Any other device failure reported by the media stack
    Device(String),
}

impl CaptureError {
    /// Coarse category used in logs
    pub fn category(&self) -> &'static str {
        match self {
            CaptureError::NotInitialized | CaptureError::Unavailable(_) => "unavailable",
            CaptureError::PreviewNotActive | CaptureError::NotReady => "not-ready",
            CaptureError::InProgress => "in-progress",
            CaptureError::ProcessStartFailed
            | CaptureError::ProcessExited { .. }
            | CaptureError::ProcessCrashed => "process-failure",
            CaptureError::SaveFailed(_) | CaptureError::DecodeFailed(_) => "io-failure",
            CaptureError::PermissionDenied(_) => "permission-denied",
            CaptureError::Device(_) => "device",
        }
    }
}

/// Rejected coordinator intents
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoordinatorError {
    /// No usable camera, capture is disabled
    CameraUnavailable,
    /// The intent is not valid in the current state
    InvalidIntent {
        intent: &'static str,
        state: CaptureStateKind,
    },
    /// The id is not part of the choice catalog
    UnknownChoice(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(msg) => write!(f, "Configuration error: {}", msg),
            AppError::Storage(msg) => write!(f, "Storage error: {}", msg),
        }
    }
}

impl fmt::Display for CaptureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureError::NotInitialized => write!(f, "Camera not initialized"),
            CaptureError::Unavailable(msg) => write!(f, "Camera unavailable: {}", msg),
            CaptureError::PreviewNotActive => write!(f, "Camera preview not active"),
            CaptureError::NotReady => write!(f, "Camera not ready for capture"),
            CaptureError::InProgress => write!(f, "Capture already in progress"),
            CaptureError::ProcessStartFailed => {
                write!(f, "Failed to start camera capture process")
            }
            CaptureError::ProcessExited { code } => {
                write!(f, "Capture process failed with exit code: {}", code)
            }
            CaptureError::ProcessCrashed => write!(f, "Capture process terminated abnormally"),
            CaptureError::SaveFailed(msg) => write!(f, "{}", msg),
            CaptureError::DecodeFailed(msg) => write!(f, "Failed to load captured image: {}", msg),
            CaptureError::PermissionDenied(msg) => write!(f, "Camera permission denied: {}", msg),
            CaptureError::Device(msg) => write!(f, "Camera error: {}", msg),
        }
    }
}

impl fmt::Display for CoordinatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoordinatorError::CameraUnavailable => write!(f, "No camera available"),
            CoordinatorError::InvalidIntent { intent, state } => {
                write!(f, "'{}' is not allowed while {}", intent, state)
            }
            CoordinatorError::UnknownChoice(id) => write!(f, "Unknown choice: {}", id),
        }
    }
}

impl std::error::Error for AppError {}
impl std::error::Error for CaptureError {}
impl std::error::Error for CoordinatorError {}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_failures_are_labelled() {
        let err: AppError = serde_json::from_str::<serde_json::Value>("{").unwrap_err().into();
        assert!(matches!(err, AppError::Config(_)));
        assert!(err.to_string().starts_with("Configuration error: "));

        let err: AppError = std::io::Error::other("disk full").into();
        assert_eq!(err.to_string(), "Storage error: disk full");
    }

    #[test]
    fn exit_code_is_part_of_message() {
        let err = CaptureError::ProcessExited { code: 2 };
        assert!(err.to_string().contains("exit code: 2"));
        assert_eq!(err.category(), "process-failure");
    }

    #[test]
    fn in_progress_message() {
        assert!(
            CaptureError::InProgress
                .to_string()
                .contains("in progress")
        );
    }
}
