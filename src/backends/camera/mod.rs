// SPDX-License-Identifier: GPL-3.0-only

//! Camera backend abstraction
//!
//! The capture pipeline never talks to a concrete media stack. It is handed a
//! [`CameraBackend`] (device acquisition plus the recording capability set)
//! and works with the [`DeviceStream`] the backend hands out.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────┐
//! │    CameraSession    │  ← state machine, owns the stream
//! └──────────┬──────────┘
//!            │
//!            ▼
//! ┌─────────────────────┐
//! │  CameraBackend Trait│  ← acquire(preference), supported_formats()
//! └──────────┬──────────┘
//!            │
//!       ┌────┴─────┐
//!       ▼          ▼
//!   ┌───────┐  ┌───────┐
//!   │Virtual│  │ V4L2  │
//!   └───────┘  └───────┘
//! ```

pub mod types;
#[cfg(feature = "v4l2")]
pub mod v4l2;

pub use types::*;

use crate::config::Config;
use crate::errors::AppResult;
use async_trait::async_trait;
use std::sync::Arc;

/// Injected device capability
///
/// Implementations must be cheap to share; the session keeps one behind an
/// `Arc` for its whole lifetime.
#[async_trait]
pub trait CameraBackend: Send + Sync {
    /// Get the backend type identifier
    fn backend_type(&self) -> CameraBackendType;

    /// Enumerate available cameras on this backend
    fn enumerate_cameras(&self) -> Vec<CameraDevice>;

    /// Acquire a live stream from a camera facing `preference`
    ///
    /// # Returns
    /// * `Ok(stream)` - Device acquired and streaming
    /// * `Err(BackendError::FacingUnavailable)` - Cameras exist, none face that way
    /// * `Err(BackendError)` - No device could be acquired
    async fn acquire(&self, preference: FacingMode) -> BackendResult<Box<dyn DeviceStream>>;

    /// Recording containers the environment can produce, richest first
    ///
    /// May be empty; callers fall back to a documented default.
    fn supported_formats(&self) -> Vec<RecordingFormat>;
}

/// A live device stream
///
/// Exclusively owned by whoever acquired it. All methods are non-blocking.
pub trait DeviceStream: Send {
    /// Short description for logs
    fn label(&self) -> &str;

    /// Native resolution, if the device reports one
    fn native_size(&self) -> Option<FrameSize>;

    /// Copy of the most recent frame
    fn current_frame(&self) -> BackendResult<CameraFrame>;

    /// Start emitting encoded chunks in `format`
    ///
    /// Only one recording may run per stream.
    fn start_recording(&mut self, format: &RecordingFormat) -> BackendResult<ChunkReceiver>;

    /// Flush pending chunks and close the chunk channel
    ///
    /// No-op when not recording.
    fn stop_recording(&mut self);

    /// Stop all tracks and release the device
    ///
    /// Must be idempotent.
    fn stop(&mut self);

    /// Whether the tracks are still running
    fn is_live(&self) -> bool;
}

/// Build the backend selected in the configuration
pub fn get_backend(config: &Config) -> AppResult<Arc<dyn CameraBackend>> {
    match config.backend {
        CameraBackendType::Virtual => Ok(Arc::new(
            crate::backends::virtual_camera::VirtualCameraBackend::new(
                config.virtual_still.clone(),
                config.virtual_clip.clone(),
            ),
        )),
        #[cfg(feature = "v4l2")]
        CameraBackendType::V4l2 => Ok(Arc::new(v4l2::V4l2Backend::new(
            config.v4l2_device.clone(),
        ))),
        #[cfg(not(feature = "v4l2"))]
        CameraBackendType::V4l2 => Err(crate::errors::AppError::Config(
            "this build has no V4L2 support (enable the `v4l2` feature)".to_string(),
        )),
    }
}
