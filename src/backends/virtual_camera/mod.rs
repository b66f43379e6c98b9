// SPDX-License-Identifier: GPL-3.0-only

//! Virtual camera backed by files
//!
//! Presents a still image (or a generated test pattern) as the live frame and
//! replays a clip as the recording output. It reports itself as a rear-facing
//! device so the normal open path succeeds without a fallback.

pub mod file_source;

use crate::backends::camera::types::*;
use crate::backends::camera::{CameraBackend, DeviceStream};
use crate::constants::capture;
use async_trait::async_trait;
use file_source::ClipPump;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

/// File-backed camera backend
#[derive(Debug, Clone)]
pub struct VirtualCameraBackend {
    still: Option<PathBuf>,
    clip: Option<PathBuf>,
}

impl VirtualCameraBackend {
    /// Create a backend showing `still` and recording `clip`
    ///
    /// Without a still, a test pattern of the fallback resolution is shown.
    /// Without a clip, recording is not supported.
    pub fn new(still: Option<PathBuf>, clip: Option<PathBuf>) -> Self {
        Self { still, clip }
    }

    fn device_name(&self) -> String {
        match &self.still {
            Some(path) => format!("Virtual camera ({})", path.display()),
            None => "Virtual camera (test pattern)".to_string(),
        }
    }
}

#[async_trait]
impl CameraBackend for VirtualCameraBackend {
    fn backend_type(&self) -> CameraBackendType {
        CameraBackendType::Virtual
    }

    fn enumerate_cameras(&self) -> Vec<CameraDevice> {
        vec![CameraDevice {
            name: self.device_name(),
            path: self
                .still
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "virtual:pattern".to_string()),
            facing: Some(FacingMode::Environment),
        }]
    }

    async fn acquire(&self, preference: FacingMode) -> BackendResult<Box<dyn DeviceStream>> {
        if preference == FacingMode::User {
            return Err(BackendError::FacingUnavailable(preference));
        }

        let frame = match &self.still {
            Some(path) => file_source::load_image_as_frame(path).await?,
            None => file_source::test_pattern(FrameSize::new(
                capture::FALLBACK_WIDTH,
                capture::FALLBACK_HEIGHT,
            )),
        };

        let clip = match &self.clip {
            Some(path) => Some(file_source::load_clip(path).await?),
            None => None,
        };

        info!(
            device = %self.device_name(),
            size = %frame.size(),
            has_clip = clip.is_some(),
            "Virtual camera acquired"
        );

        Ok(Box::new(VirtualStream {
            label: self.device_name(),
            frame,
            clip,
            live: true,
            pump: None,
        }))
    }

    fn supported_formats(&self) -> Vec<RecordingFormat> {
        self.clip
            .as_deref()
            .and_then(file_source::clip_mime)
            .map(|mime| vec![RecordingFormat::new(mime)])
            .unwrap_or_default()
    }
}

/// Live stream of a [`VirtualCameraBackend`]
pub struct VirtualStream {
    label: String,
    frame: CameraFrame,
    clip: Option<(String, Arc<[u8]>)>,
    live: bool,
    pump: Option<ClipPump>,
}

impl DeviceStream for VirtualStream {
    fn label(&self) -> &str {
        &self.label
    }

    fn native_size(&self) -> Option<FrameSize> {
        Some(self.frame.size())
    }

    fn current_frame(&self) -> BackendResult<CameraFrame> {
        if !self.live {
            return Err(BackendError::Other("Stream is stopped".to_string()));
        }
        Ok(self.frame.clone())
    }

    fn start_recording(&mut self, format: &RecordingFormat) -> BackendResult<ChunkReceiver> {
        if self.pump.is_some() {
            return Err(BackendError::Other("Already recording".to_string()));
        }

        let Some((mime, clip)) = &self.clip else {
            return Err(BackendError::Unsupported(
                "virtual camera has no clip to record".to_string(),
            ));
        };

        if *mime != format.mime {
            return Err(BackendError::Unsupported(format!(
                "clip is {}, {} was requested",
                mime, format.mime
            )));
        }

        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        self.pump = Some(ClipPump::start(Arc::clone(clip), tx));
        debug!(format = %format, "Virtual recording started");
        Ok(rx)
    }

    fn stop_recording(&mut self) {
        if let Some(mut pump) = self.pump.take() {
            pump.finish();
        }
    }

    fn stop(&mut self) {
        if let Some(mut pump) = self.pump.take() {
            pump.abort();
        }
        if self.live {
            debug!(device = %self.label, "Virtual camera stopped");
        }
        self.live = false;
    }

    fn is_live(&self) -> bool {
        self.live
    }
}

impl Drop for VirtualStream {
    fn drop(&mut self) {
        self.stop();
    }
}
