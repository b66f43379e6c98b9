// SPDX-License-Identifier: GPL-3.0-only

//! Test doubles shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use detect_camera::backends::camera::{
    BackendError, BackendResult, CameraBackend, CameraBackendType, CameraDevice, CameraFrame,
    ChunkReceiver, ChunkSender, DeviceStream, FacingMode, FrameSize, RecordingFormat,
};
use detect_camera::errors::SubmitError;
use detect_camera::media::{MediaArtifact, MediaKind};
use detect_camera::submission::{ProgressReporter, Transport, TransportResponse, UploadRequest};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{Notify, oneshot};

/// Chunks a mock recording produces: two while running, one on flush
pub const RECORDED_BYTES: [u8; 6] = [1, 2, 3, 4, 5, 6];

/// Scriptable camera backend that counts device usage
pub struct MockBackend {
    pub rear_available: AtomicBool,
    pub any_available: AtomicBool,
    pub formats: Mutex<Vec<RecordingFormat>>,
    pub native_size: Mutex<Option<FrameSize>>,
    /// When set, `acquire` waits for a notification before resolving
    pub gate: Mutex<Option<Arc<Notify>>>,
    pub acquire_calls: Mutex<Vec<FacingMode>>,
    /// Streams handed out and not yet stopped
    pub live: Arc<AtomicUsize>,
    /// Streams stopped so far
    pub stopped: Arc<AtomicUsize>,
}

impl MockBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            rear_available: AtomicBool::new(true),
            any_available: AtomicBool::new(true),
            formats: Mutex::new(vec![RecordingFormat::new("video/webm")]),
            native_size: Mutex::new(Some(FrameSize::new(64, 48))),
            gate: Mutex::new(None),
            acquire_calls: Mutex::new(Vec::new()),
            live: Arc::new(AtomicUsize::new(0)),
            stopped: Arc::new(AtomicUsize::new(0)),
        })
    }

    pub fn without_rear_camera(self: Arc<Self>) -> Arc<Self> {
        self.rear_available.store(false, Ordering::SeqCst);
        self
    }

    pub fn without_cameras(self: Arc<Self>) -> Arc<Self> {
        self.rear_available.store(false, Ordering::SeqCst);
        self.any_available.store(false, Ordering::SeqCst);
        self
    }

    pub fn with_formats(self: Arc<Self>, mimes: &[&str]) -> Arc<Self> {
        *self.formats.lock().unwrap() = mimes.iter().map(|m| RecordingFormat::new(*m)).collect();
        self
    }

    pub fn with_native_size(self: Arc<Self>, size: Option<FrameSize>) -> Arc<Self> {
        *self.native_size.lock().unwrap() = size;
        self
    }

    /// Make `acquire` wait until the returned gate is notified
    pub fn gated(self: Arc<Self>) -> (Arc<Self>, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        *self.gate.lock().unwrap() = Some(Arc::clone(&gate));
        (self, gate)
    }

    pub fn live_streams(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    pub fn stopped_streams(&self) -> usize {
        self.stopped.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<FacingMode> {
        self.acquire_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CameraBackend for MockBackend {
    fn backend_type(&self) -> CameraBackendType {
        CameraBackendType::Virtual
    }

    fn enumerate_cameras(&self) -> Vec<CameraDevice> {
        vec![CameraDevice {
            name: "Mock camera".to_string(),
            path: "mock:0".to_string(),
            facing: Some(FacingMode::Environment),
        }]
    }

    async fn acquire(&self, preference: FacingMode) -> BackendResult<Box<dyn DeviceStream>> {
        self.acquire_calls.lock().unwrap().push(preference);

        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let available = match preference {
            FacingMode::Environment => self.rear_available.load(Ordering::SeqCst),
            FacingMode::User => false,
            FacingMode::Any => self.any_available.load(Ordering::SeqCst),
        };
        if !available {
            return Err(BackendError::FacingUnavailable(preference));
        }

        self.live.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockStream {
            size: *self.native_size.lock().unwrap(),
            live: true,
            live_count: Arc::clone(&self.live),
            stopped: Arc::clone(&self.stopped),
            recorder: None,
        }))
    }

    fn supported_formats(&self) -> Vec<RecordingFormat> {
        self.formats.lock().unwrap().clone()
    }
}

/// Stream handed out by [`MockBackend`]
pub struct MockStream {
    size: Option<FrameSize>,
    live: bool,
    live_count: Arc<AtomicUsize>,
    stopped: Arc<AtomicUsize>,
    recorder: Option<ChunkSender>,
}

impl DeviceStream for MockStream {
    fn label(&self) -> &str {
        "mock"
    }

    fn native_size(&self) -> Option<FrameSize> {
        self.size
    }

    fn current_frame(&self) -> BackendResult<CameraFrame> {
        if !self.live {
            return Err(BackendError::Other("stopped".to_string()));
        }
        let size = self.size.unwrap_or(FrameSize::new(32, 24));
        CameraFrame::from_rgba(size.width, size.height, vec![90; size.rgba_len()])
    }

    fn start_recording(&mut self, _format: &RecordingFormat) -> BackendResult<ChunkReceiver> {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let _ = tx.send(RECORDED_BYTES[..3].to_vec());
        let _ = tx.send(RECORDED_BYTES[3..5].to_vec());
        self.recorder = Some(tx);
        Ok(rx)
    }

    fn stop_recording(&mut self) {
        if let Some(tx) = self.recorder.take() {
            let _ = tx.send(RECORDED_BYTES[5..].to_vec());
        }
    }

    fn stop(&mut self) {
        self.recorder = None;
        if self.live {
            self.live = false;
            self.live_count.fetch_sub(1, Ordering::SeqCst);
            self.stopped.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn is_live(&self) -> bool {
        self.live
    }
}

impl Drop for MockStream {
    fn drop(&mut self) {
        self.stop();
    }
}

/// How a scripted upload ends
pub enum Outcome {
    Respond(TransportResponse),
    Fail(SubmitError),
    /// Resolves when the test sends on the paired channel
    Gated(oneshot::Receiver<Result<TransportResponse, SubmitError>>),
}

/// One scripted upload
pub struct Scripted {
    /// Progress reports made before the outcome, as (sent, total)
    pub progress: Vec<(u64, Option<u64>)>,
    pub outcome: Outcome,
}

impl Scripted {
    pub fn respond(response: TransportResponse) -> Self {
        Self {
            progress: Vec::new(),
            outcome: Outcome::Respond(response),
        }
    }

    pub fn fail(err: SubmitError) -> Self {
        Self {
            progress: Vec::new(),
            outcome: Outcome::Fail(err),
        }
    }

    pub fn gated() -> (Self, oneshot::Sender<Result<TransportResponse, SubmitError>>) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                progress: Vec::new(),
                outcome: Outcome::Gated(rx),
            },
            tx,
        )
    }

    pub fn with_progress(mut self, steps: &[(u64, Option<u64>)]) -> Self {
        self.progress = steps.to_vec();
        self
    }
}

/// Transport that plays back a script, one entry per upload
#[derive(Default)]
pub struct MockTransport {
    script: Mutex<VecDeque<Scripted>>,
    requests: Mutex<Vec<UploadRequest>>,
}

impl MockTransport {
    pub fn new(script: Vec<Scripted>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn push(&self, entry: Scripted) {
        self.script.lock().unwrap().push_back(entry);
    }

    pub fn requests(&self) -> Vec<UploadRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(
        &self,
        request: UploadRequest,
        progress: ProgressReporter,
    ) -> Result<TransportResponse, SubmitError> {
        self.requests.lock().unwrap().push(request);
        let entry = self.script.lock().unwrap().pop_front();
        let Some(entry) = entry else {
            return Err(SubmitError::Transport("no scripted response".to_string()));
        };

        for (sent, total) in entry.progress {
            progress.report(sent, total);
        }

        match entry.outcome {
            Outcome::Respond(response) => Ok(response),
            Outcome::Fail(err) => Err(err),
            Outcome::Gated(rx) => rx
                .await
                .unwrap_or_else(|_| Err(SubmitError::Transport("gate dropped".to_string()))),
        }
    }
}

pub fn image_artifact() -> MediaArtifact {
    MediaArtifact::new(MediaKind::Image, "image/png", "photo.png", vec![137u8, 80, 78, 71])
}

pub fn video_artifact() -> MediaArtifact {
    MediaArtifact::new(MediaKind::Video, "video/webm", "clip.webm", vec![26u8, 69, 223, 163])
}

pub fn image_success(annotated: &str) -> TransportResponse {
    TransportResponse::ok(format!(r#"{{"annotated_image": "{}"}}"#, annotated))
}
