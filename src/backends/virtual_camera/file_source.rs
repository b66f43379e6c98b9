// SPDX-License-Identifier: GPL-3.0-only

//! File sources for the virtual camera
//!
//! Loads the still image shown as the live frame and the clip replayed as
//! recording output.

use crate::backends::camera::types::{
    BackendError, BackendResult, CameraFrame, ChunkSender, FrameSize,
};
use crate::constants::{file_formats, virtual_camera as vc_timing};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

/// Load an image file as an RGBA frame
///
/// Decoding runs on the blocking pool.
pub async fn load_image_as_frame(path: &Path) -> BackendResult<CameraFrame> {
    let path_buf = path.to_path_buf();
    let frame = tokio::task::spawn_blocking(move || {
        let img = image::open(&path_buf)
            .map_err(|e| BackendError::Other(format!("Failed to load image: {}", e)))?;
        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();
        CameraFrame::from_rgba(width, height, rgba.into_raw())
    })
    .await
    .map_err(|e| BackendError::Other(format!("Image load task failed: {}", e)))??;

    debug!(
        path = %path.display(),
        width = frame.width,
        height = frame.height,
        "Loaded still for virtual camera"
    );
    Ok(frame)
}

/// Synthesize a gradient test pattern
pub fn test_pattern(size: FrameSize) -> CameraFrame {
    let mut data = Vec::with_capacity(size.rgba_len());
    for y in 0..size.height {
        for x in 0..size.width {
            let r = (x * 255 / size.width.max(1)) as u8;
            let g = (y * 255 / size.height.max(1)) as u8;
            data.extend_from_slice(&[r, g, 128, 255]);
        }
    }

    CameraFrame {
        width: size.width,
        height: size.height,
        data: Arc::from(data),
        captured_at: std::time::Instant::now(),
    }
}

/// Read a clip and work out its container MIME type from the extension
pub async fn load_clip(path: &Path) -> BackendResult<(String, Arc<[u8]>)> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    if !file_formats::is_video_extension(&extension) {
        return Err(BackendError::Unsupported(format!(
            "Clip is not a video file: {}",
            path.display()
        )));
    }

    let mime = clip_mime(path)
        .ok_or_else(|| BackendError::Unsupported(format!("Unknown clip type: {}", extension)))?;
    let bytes = tokio::fs::read(path).await?;

    info!(path = %path.display(), mime, size = bytes.len(), "Loaded clip for virtual camera");
    Ok((mime.to_string(), Arc::from(bytes)))
}

/// MIME type of a clip, from its extension
pub fn clip_mime(path: &Path) -> Option<&'static str> {
    let extension = path.extension()?.to_str()?;
    if !file_formats::is_video_extension(extension) {
        return None;
    }
    file_formats::mime_for_extension(extension)
}

/// Replays a clip as recording chunks
///
/// Emits one slice per tick; on stop, the rest of the clip is flushed as a
/// final chunk and the channel is closed so the recording is always a
/// complete file.
pub struct ClipPump {
    stop_tx: Option<oneshot::Sender<()>>,
    task: tokio::task::JoinHandle<()>,
}

impl ClipPump {
    /// Start pumping `clip` into `sender`
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(clip: Arc<[u8]>, sender: ChunkSender) -> Self {
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            let mut offset = 0usize;
            let mut ticker = tokio::time::interval(vc_timing::CHUNK_INTERVAL);
            // First tick completes immediately
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = &mut stop_rx => break,
                    _ = ticker.tick() => {
                        if offset < clip.len() {
                            let end = (offset + vc_timing::CHUNK_SIZE).min(clip.len());
                            if sender.send(clip[offset..end].to_vec()).is_err() {
                                warn!("Chunk receiver dropped, stopping clip pump");
                                return;
                            }
                            offset = end;
                        }
                    }
                }
            }

            if offset < clip.len() {
                let _ = sender.send(clip[offset..].to_vec());
            }
            debug!(bytes = clip.len(), "Clip pump flushed");
        });

        Self {
            stop_tx: Some(stop_tx),
            task,
        }
    }

    /// Ask the pump to flush the rest of the clip and close the channel
    pub fn finish(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
    }

    /// Drop the recording without flushing
    pub fn abort(&mut self) {
        self.stop_tx = None;
        self.task.abort();
    }
}
