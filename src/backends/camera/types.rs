// SPDX-License-Identifier: GPL-3.0-only
// Shared types for camera backend abstraction

//! Shared types for camera backends

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

/// Receiver of encoded recording chunks, in capture order
///
/// Backends close the sending side once a recording has been flushed.
pub type ChunkReceiver = tokio::sync::mpsc::UnboundedReceiver<Vec<u8>>;

/// Sending side of a [`ChunkReceiver`]
pub type ChunkSender = tokio::sync::mpsc::UnboundedSender<Vec<u8>>;

/// Camera backend type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CameraBackendType {
    /// File-backed camera (still image plus optional clip)
    #[default]
    Virtual,
    /// Video4Linux2 webcam
    V4l2,
}

impl std::fmt::Display for CameraBackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CameraBackendType::Virtual => write!(f, "virtual"),
            CameraBackendType::V4l2 => write!(f, "v4l2"),
        }
    }
}

impl std::str::FromStr for CameraBackendType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "virtual" => Ok(CameraBackendType::Virtual),
            "v4l2" => Ok(CameraBackendType::V4l2),
            other => Err(format!("unknown camera backend: {}", other)),
        }
    }
}

/// Which way the requested camera should face
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FacingMode {
    /// Rear-facing ("environment") camera
    #[default]
    Environment,
    /// Front-facing ("user") camera
    User,
    /// Whatever camera is available
    Any,
}

impl std::fmt::Display for FacingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FacingMode::Environment => write!(f, "environment"),
            FacingMode::User => write!(f, "user"),
            FacingMode::Any => write!(f, "any"),
        }
    }
}

/// Pixel dimensions of a stream or raster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

impl FrameSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Number of bytes of an RGBA buffer of this size
    pub fn rgba_len(&self) -> usize {
        self.width as usize * self.height as usize * 4
    }
}

impl std::fmt::Display for FrameSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// A single RGBA frame grabbed from a live stream
#[derive(Clone)]
pub struct CameraFrame {
    pub width: u32,
    pub height: u32,
    /// Tightly packed RGBA (4 bytes per pixel)
    pub data: Arc<[u8]>,
    /// When the frame was captured
    pub captured_at: Instant,
}

impl CameraFrame {
    /// Wrap RGBA bytes, checking the buffer matches the dimensions
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> BackendResult<Self> {
        let expected = FrameSize::new(width, height).rgba_len();
        if data.len() != expected {
            return Err(BackendError::Other(format!(
                "RGBA buffer is {} bytes, expected {} for {}x{}",
                data.len(),
                expected,
                width,
                height
            )));
        }

        Ok(Self {
            width,
            height,
            data: Arc::from(data),
            captured_at: Instant::now(),
        })
    }

    pub fn size(&self) -> FrameSize {
        FrameSize::new(self.width, self.height)
    }
}

impl std::fmt::Debug for CameraFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CameraFrame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.data.len())
            .finish()
    }
}

/// A recording container the environment can produce
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordingFormat {
    /// Container MIME type, e.g. `video/mp4`
    pub mime: String,
}

impl RecordingFormat {
    pub fn new(mime: impl Into<String>) -> Self {
        Self { mime: mime.into() }
    }

    /// File extension for artifacts recorded in this format
    pub fn extension(&self) -> &'static str {
        crate::constants::file_formats::extension_for_mime(&self.mime)
    }
}

impl std::fmt::Display for RecordingFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.mime)
    }
}

/// A camera as listed by a backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraDevice {
    /// Human readable name
    pub name: String,
    /// Backend specific path (device node, file path)
    pub path: String,
    /// Reported facing, if the backend knows it
    pub facing: Option<FacingMode>,
}

/// Backend error type
#[derive(Debug, Clone, Error)]
pub enum BackendError {
    /// No device matched the request
    #[error("Device not found: {0}")]
    DeviceNotFound(String),
    /// A device exists but none faces the requested way
    #[error("No camera facing {0}")]
    FacingUnavailable(FacingMode),
    /// The device cannot do what was asked
    #[error("Not supported: {0}")]
    Unsupported(String),
    /// Device I/O failure
    #[error("I/O error: {0}")]
    Io(String),
    /// Anything else
    #[error("{0}")]
    Other(String),
}

impl From<std::io::Error> for BackendError {
    fn from(err: std::io::Error) -> Self {
        BackendError::Io(err.to_string())
    }
}

/// Result type for backend operations
pub type BackendResult<T> = Result<T, BackendError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_from_rgba_checks_length() {
        assert!(CameraFrame::from_rgba(2, 2, vec![0; 16]).is_ok());
        assert!(CameraFrame::from_rgba(2, 2, vec![0; 15]).is_err());
    }

    #[test]
    fn test_backend_type_parsing() {
        assert_eq!(
            "V4L2".parse::<CameraBackendType>(),
            Ok(CameraBackendType::V4l2)
        );
        assert!("pipewire".parse::<CameraBackendType>().is_err());
    }

    #[test]
    fn test_recording_format_extension() {
        assert_eq!(RecordingFormat::new("video/mp4").extension(), "mp4");
        assert_eq!(RecordingFormat::new("video/webm").extension(), "webm");
    }
}
