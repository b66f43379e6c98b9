// SPDX-License-Identifier: GPL-3.0-only

//! Direct V4L2 webcam capture
//!
//! A capture thread pulls buffers from a memory-mapped stream and keeps the
//! latest one. Motion-JPEG is requested so recordings can be produced without
//! an encoder: while recording, every JPEG buffer is forwarded as a chunk.
//! Devices that refuse MJPG stay on their current format (YUYV is converted
//! for stills) and cannot record.

use super::types::*;
use super::{CameraBackend, DeviceStream};
use crate::constants::recording;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};
use v4l::buffer::Type;
use v4l::io::traits::CaptureStream;
use v4l::prelude::*;
use v4l::video::Capture;

const MJPG: &[u8; 4] = b"MJPG";
const YUYV: &[u8; 4] = b"YUYV";

/// V4L2 backend
///
/// V4L2 carries no facing information, so only [`FacingMode::Any`] can be
/// acquired; the session falls back to it when the rear camera is refused.
pub struct V4l2Backend {
    device: Option<String>,
}

impl V4l2Backend {
    /// Use `device` (e.g. `/dev/video0`), or the first capture node when `None`
    pub fn new(device: Option<String>) -> Self {
        Self { device }
    }

    fn resolve_device(&self) -> BackendResult<String> {
        if let Some(path) = &self.device {
            return Ok(path.clone());
        }
        self.enumerate_cameras()
            .into_iter()
            .next()
            .map(|d| d.path)
            .ok_or_else(|| BackendError::DeviceNotFound("no V4L2 capture device".to_string()))
    }
}

#[async_trait]
impl CameraBackend for V4l2Backend {
    fn backend_type(&self) -> CameraBackendType {
        CameraBackendType::V4l2
    }

    fn enumerate_cameras(&self) -> Vec<CameraDevice> {
        v4l::context::enum_devices()
            .into_iter()
            .filter_map(|node| {
                let path = node.path().to_string_lossy().to_string();
                let dev = Device::with_path(&path).ok()?;
                let caps = dev.query_caps().ok()?;
                if !caps
                    .capabilities
                    .contains(v4l::capability::Flags::VIDEO_CAPTURE)
                {
                    return None;
                }
                Some(CameraDevice {
                    name: node.name().unwrap_or_else(|| caps.card.clone()),
                    path,
                    facing: None,
                })
            })
            .collect()
    }

    async fn acquire(&self, preference: FacingMode) -> BackendResult<Box<dyn DeviceStream>> {
        if preference != FacingMode::Any {
            return Err(BackendError::FacingUnavailable(preference));
        }

        let device_path = self.resolve_device()?;
        info!(device_path = %device_path, "Opening V4L2 device");

        let running = Arc::new(AtomicBool::new(true));
        let shared = Arc::new(Mutex::new(Shared::default()));
        let (ready_tx, ready_rx) = oneshot::channel();

        let thread_running = Arc::clone(&running);
        let thread_shared = Arc::clone(&shared);
        let thread_path = device_path.clone();
        std::thread::spawn(move || {
            if let Err(e) = capture_loop(&thread_path, thread_shared, thread_running, ready_tx) {
                error!(error = %e, "V4L2 capture loop failed");
            }
        });

        let negotiated = ready_rx
            .await
            .map_err(|_| BackendError::Other("capture thread exited early".to_string()))??;

        Ok(Box::new(V4l2Stream {
            label: device_path,
            negotiated,
            running,
            shared,
        }))
    }

    fn supported_formats(&self) -> Vec<RecordingFormat> {
        vec![RecordingFormat::new(recording::MJPEG)]
    }
}

/// Format agreed with the driver
#[derive(Debug, Clone, Copy)]
struct Negotiated {
    size: FrameSize,
    fourcc: [u8; 4],
}

#[derive(Default)]
struct Shared {
    latest: Option<Vec<u8>>,
    recorder: Option<ChunkSender>,
}

/// A running V4L2 capture
pub struct V4l2Stream {
    label: String,
    negotiated: Negotiated,
    running: Arc<AtomicBool>,
    shared: Arc<Mutex<Shared>>,
}

impl V4l2Stream {
    fn shared(&self) -> std::sync::MutexGuard<'_, Shared> {
        self.shared
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl DeviceStream for V4l2Stream {
    fn label(&self) -> &str {
        &self.label
    }

    fn native_size(&self) -> Option<FrameSize> {
        Some(self.negotiated.size)
    }

    fn current_frame(&self) -> BackendResult<CameraFrame> {
        if !self.is_live() {
            return Err(BackendError::Other("Stream is stopped".to_string()));
        }
        let raw = self
            .shared()
            .latest
            .clone()
            .ok_or_else(|| BackendError::Other("No frame captured yet".to_string()))?;

        let size = self.negotiated.size;
        match &self.negotiated.fourcc {
            MJPG => {
                let img = image::load_from_memory_with_format(&raw, image::ImageFormat::Jpeg)
                    .map_err(|e| BackendError::Other(format!("Bad MJPG frame: {}", e)))?
                    .to_rgba8();
                let (width, height) = img.dimensions();
                CameraFrame::from_rgba(width, height, img.into_raw())
            }
            YUYV => CameraFrame::from_rgba(
                size.width,
                size.height,
                yuyv_to_rgba(&raw, size.width, size.height),
            ),
            other => Err(BackendError::Unsupported(format!(
                "pixel format {}",
                String::from_utf8_lossy(other)
            ))),
        }
    }

    fn start_recording(&mut self, format: &RecordingFormat) -> BackendResult<ChunkReceiver> {
        if format.mime != recording::MJPEG || &self.negotiated.fourcc != MJPG {
            return Err(BackendError::Unsupported(format!(
                "{} recording on a {} stream",
                format,
                String::from_utf8_lossy(&self.negotiated.fourcc)
            )));
        }

        let mut shared = self.shared();
        if shared.recorder.is_some() {
            return Err(BackendError::Other("Already recording".to_string()));
        }
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        shared.recorder = Some(tx);
        debug!(device = %self.label, "V4L2 recording started");
        Ok(rx)
    }

    fn stop_recording(&mut self) {
        // Buffers are forwarded as they arrive; dropping the sender is the flush.
        self.shared().recorder = None;
    }

    fn stop(&mut self) {
        if self.running.swap(false, Ordering::SeqCst) {
            info!(device = %self.label, "Stopping V4L2 capture");
        }
        self.shared().recorder = None;
    }

    fn is_live(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

impl Drop for V4l2Stream {
    fn drop(&mut self) {
        // The capture thread notices on its next buffer; not joined here.
        self.stop();
    }
}

/// Capture loop running in a separate thread
fn capture_loop(
    device_path: &str,
    shared: Arc<Mutex<Shared>>,
    running: Arc<AtomicBool>,
    ready: oneshot::Sender<BackendResult<Negotiated>>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    static FRAME_COUNTER: AtomicU64 = AtomicU64::new(0);

    let opened = open_device(device_path);
    let (dev, negotiated) = match opened {
        Ok(pair) => pair,
        Err(e) => {
            let _ = ready.send(Err(e.clone()));
            return Err(Box::new(e));
        }
    };

    let mut stream = match MmapStream::with_buffers(&dev, Type::VideoCapture, 4) {
        Ok(stream) => stream,
        Err(e) => {
            let err = BackendError::Io(format!("Failed to create buffer stream: {}", e));
            let _ = ready.send(Err(err.clone()));
            return Err(Box::new(err));
        }
    };

    if ready.send(Ok(negotiated)).is_err() {
        debug!("Acquire abandoned before the stream started");
        return Ok(());
    }
    info!(size = %negotiated.size, "V4L2 capture stream started");

    while running.load(Ordering::SeqCst) {
        match stream.next() {
            Ok((buf, meta)) => {
                let frame_num = FRAME_COUNTER.fetch_add(1, Ordering::Relaxed);
                let used = (meta.bytesused as usize).min(buf.len());
                let bytes = buf[..used].to_vec();

                let mut guard = shared
                    .lock()
                    .unwrap_or_else(|poisoned| poisoned.into_inner());
                if let Some(recorder) = &guard.recorder
                    && recorder.send(bytes.clone()).is_err()
                {
                    guard.recorder = None;
                }
                guard.latest = Some(bytes);

                if frame_num % 120 == 0 {
                    debug!(frame = frame_num, sequence = meta.sequence, size = used, "V4L2 frame");
                }
            }
            Err(e) => {
                warn!(error = %e, "Failed to capture V4L2 frame");
                std::thread::sleep(std::time::Duration::from_millis(10));
            }
        }
    }

    info!("V4L2 capture loop ended");
    Ok(())
}

fn open_device(device_path: &str) -> BackendResult<(Device, Negotiated)> {
    let dev = Device::with_path(device_path)
        .map_err(|e| BackendError::DeviceNotFound(format!("{}: {}", device_path, e)))?;

    let mut format = dev
        .format()
        .map_err(|e| BackendError::Io(format!("Failed to query format: {}", e)))?;
    format.fourcc = v4l::FourCC::new(MJPG);

    let format = match dev.set_format(&format) {
        Ok(f) => f,
        Err(e) => {
            warn!(error = %e, "Could not set MJPG, using current device format");
            dev.format()
                .map_err(|e| BackendError::Io(format!("Failed to query format: {}", e)))?
        }
    };

    let negotiated = Negotiated {
        size: FrameSize::new(format.width, format.height),
        fourcc: format.fourcc.repr,
    };
    info!(
        size = %negotiated.size,
        fourcc = %String::from_utf8_lossy(&negotiated.fourcc),
        "Negotiated V4L2 format"
    );
    Ok((dev, negotiated))
}

/// Convert packed YUYV 4:2:2 to RGBA (BT.601)
pub fn yuyv_to_rgba(yuyv: &[u8], width: u32, height: u32) -> Vec<u8> {
    let pixels = width as usize * height as usize;
    let mut rgba = Vec::with_capacity(pixels * 4);

    for block in yuyv.chunks_exact(4) {
        let (y0, u, y1, v) = (block[0], block[1], block[2], block[3]);
        for y in [y0, y1] {
            let c = y as f32 - 16.0;
            let d = u as f32 - 128.0;
            let e = v as f32 - 128.0;
            let r = 1.164 * c + 1.596 * e;
            let g = 1.164 * c - 0.392 * d - 0.813 * e;
            let b = 1.164 * c + 2.017 * d;
            rgba.extend_from_slice(&[
                r.clamp(0.0, 255.0) as u8,
                g.clamp(0.0, 255.0) as u8,
                b.clamp(0.0, 255.0) as u8,
                255,
            ]);
        }
    }

    // Short buffers are padded so the frame still matches its dimensions
    rgba.resize(pixels * 4, 0);
    rgba
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yuyv_black_and_white() {
        // Two pixels black, two pixels white
        let yuyv = [16, 128, 16, 128, 235, 128, 235, 128];
        let rgba = yuyv_to_rgba(&yuyv, 4, 1);
        assert_eq!(rgba.len(), 16);
        assert_eq!(&rgba[0..4], &[0, 0, 0, 255]);
        assert_eq!(rgba[8], 255);
        assert_eq!(rgba[15], 255);
    }

    #[test]
    fn test_yuyv_short_buffer_is_padded() {
        let rgba = yuyv_to_rgba(&[16, 128, 16, 128], 4, 2);
        assert_eq!(rgba.len(), 4 * 2 * 4);
    }

    #[tokio::test]
    async fn test_rear_camera_is_never_offered() {
        let backend = V4l2Backend::new(Some("/dev/null".to_string()));
        let err = backend.acquire(FacingMode::Environment).await.err().unwrap();
        assert!(matches!(err, BackendError::FacingUnavailable(_)));
    }
}
