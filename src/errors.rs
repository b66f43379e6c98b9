// SPDX-License-Identifier: GPL-3.0-only

//! Error types for the capture-and-submit pipeline
//!
//! Each layer has its own error enum; [`AppError`] wraps them for callers that
//! drive the whole pipeline (the CLI and the page mount).

use crate::backends::camera::types::BackendError;
use thiserror::Error;

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Result type alias using CameraError
pub type CameraResult<T> = Result<T, CameraError>;

/// Main application error type
#[derive(Debug, Error)]
pub enum AppError {
    /// Camera-related errors
    #[error("Camera error: {0}")]
    Camera(#[from] CameraError),
    /// Media loading errors
    #[error("Media error: {0}")]
    Media(#[from] MediaError),
    /// Submission errors
    #[error("Submission error: {0}")]
    Submit(#[from] SubmitError),
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
    /// Storage/filesystem errors
    #[error("Storage error: {0}")]
    Storage(String),
}

/// Camera session errors
#[derive(Debug, Clone, Error)]
pub enum CameraError {
    /// No camera could be acquired on any fallback path
    #[error("No camera available")]
    DeviceUnavailable,
    /// The session was closed while the device was still being acquired
    #[error("Camera was closed before it finished opening")]
    OpenCancelled,
    /// Another open is still acquiring the device
    #[error("Camera is already opening")]
    OpenInProgress,
    /// Backend failure while live (frame grab, recording start)
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),
    /// Still image encoding failed
    #[error("Encoding failed: {0}")]
    Encoding(String),
}

/// Errors while turning a file into a media artifact
#[derive(Debug, Error)]
pub enum MediaError {
    /// The file could not be read
    #[error("Failed to read media: {0}")]
    Io(#[from] std::io::Error),
    /// Neither the extension nor the content identify an image or video
    #[error("Unsupported media format: {0}")]
    UnsupportedFormat(String),
    /// Zero-length payload
    #[error("Media file is empty")]
    Empty,
}

/// Submission failures
///
/// Every variant is recovered into a [`crate::app::state::FailureReason`];
/// the detail strings are for logs only.
#[derive(Debug, Clone, Error)]
pub enum SubmitError {
    /// Nothing was staged
    #[error("No media selected")]
    NoMediaSelected,
    /// Network or connection failure, including aborts
    #[error("Transport error: {0}")]
    Transport(String),
    /// The service answered with a non-200 status
    #[error("Server responded with status {0}")]
    Server(u16),
    /// 200 response without a usable result field
    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

impl From<reqwest::Error> for SubmitError {
    fn from(err: reqwest::Error) -> Self {
        SubmitError::Transport(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Storage(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AppError::from(SubmitError::Server(503));
        assert_eq!(
            err.to_string(),
            "Submission error: Server responded with status 503"
        );
    }

    #[test]
    fn test_backend_error_converts_to_camera_error() {
        let err: CameraError = BackendError::DeviceNotFound("none".into()).into();
        assert!(matches!(err, CameraError::Backend(_)));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let app_err: AppError = io_err.into();
        assert!(matches!(app_err, AppError::Storage(_)));
    }
}
