// SPDX-License-Identifier: GPL-3.0-only

//! Camera session state machine
//!
//! ```text
//!            open()              acquired
//! Closed ───────────▶ Opening ───────────▶ Live ◀──────────┐
//!   ▲                    │                  │               │ finalize
//!   │ close()            │ close()          │ start_recording
//!   │ (any state)        ▼                  ▼               │
//!   └──────────────── Closed            Recording ──────────┘
//! ```
//!
//! The session is the only owner of the device stream. Every transition to
//! Closed stops the stream, and every capture ends with a close, so the
//! device is held only while it is actually needed.
//!
//! A generation counter, bumped by open, close and start_recording, lets an
//! async step find out that the session moved on while it was suspended: a
//! stream acquired after a close is stopped on arrival, and a capture that
//! outlived its session is discarded.

use crate::app::state::CameraStatus;
use crate::backends::camera::{
    CameraBackend, CameraFrame, DeviceStream, FacingMode, FrameSize, RecordingFormat,
};
use crate::constants::capture;
use crate::errors::{CameraError, CameraResult};
use crate::media::MediaArtifact;
use crate::pipelines::photo::StillEncoder;
use crate::pipelines::video::{finalize, record, select_recording_format};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// Receiving end for artifacts emitted by the session
pub type CaptureReceiver = mpsc::UnboundedReceiver<MediaArtifact>;

/// Capture parameters
#[derive(Debug, Clone, Copy)]
pub struct CaptureSettings {
    pub encoder: StillEncoder,
    /// Raster size used when the stream does not report one
    pub fallback_size: FrameSize,
    /// Recording auto-stop ceiling
    pub max_recording: Duration,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            encoder: StillEncoder::default(),
            fallback_size: FrameSize::new(capture::FALLBACK_WIDTH, capture::FALLBACK_HEIGHT),
            max_recording: capture::MAX_RECORDING_DURATION,
        }
    }
}

struct ActiveRecording {
    format: RecordingFormat,
    started_at: Instant,
    deadline: Instant,
    stop_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

enum SessionState {
    Closed,
    Opening,
    Live {
        stream: Box<dyn DeviceStream>,
    },
    Recording {
        stream: Box<dyn DeviceStream>,
        recording: ActiveRecording,
    },
}

struct SessionInner {
    generation: u64,
    state: SessionState,
}

/// Manages device acquisition, still capture and timed recording
pub struct CameraSession {
    inner: Arc<Mutex<SessionInner>>,
    backend: Arc<dyn CameraBackend>,
    captures: mpsc::UnboundedSender<MediaArtifact>,
    settings: CaptureSettings,
}

impl CameraSession {
    /// Create a closed session
    ///
    /// Captured artifacts are delivered on the returned receiver.
    pub fn new(
        backend: Arc<dyn CameraBackend>,
        settings: CaptureSettings,
    ) -> (Self, CaptureReceiver) {
        let (captures, receiver) = mpsc::unbounded_channel();
        let session = Self {
            inner: Arc::new(Mutex::new(SessionInner {
                generation: 0,
                state: SessionState::Closed,
            })),
            backend,
            captures,
            settings,
        };
        (session, receiver)
    }

    pub fn settings(&self) -> &CaptureSettings {
        &self.settings
    }

    /// Acquire a camera facing `preference`, falling back to any camera
    ///
    /// Only acts when Closed; an already live session returns `Ok` and an
    /// open still in progress returns [`CameraError::OpenInProgress`]. A
    /// [`close`](Self::close) issued while this is pending wins: the stream
    /// is stopped as soon as it arrives and [`CameraError::OpenCancelled`] is
    /// returned. Dropping the future before it resolves returns the session
    /// to Closed.
    pub async fn open(&self, preference: FacingMode) -> CameraResult<()> {
        let generation = {
            let mut inner = lock(&self.inner);
            match inner.state {
                SessionState::Closed => {}
                SessionState::Opening => {
                    debug!("Camera open already in progress");
                    return Err(CameraError::OpenInProgress);
                }
                SessionState::Live { .. } | SessionState::Recording { .. } => {
                    debug!("Camera already open");
                    return Ok(());
                }
            }
            inner.generation += 1;
            inner.state = SessionState::Opening;
            inner.generation
        };
        let mut pending = PendingOpen {
            inner: &self.inner,
            generation,
            armed: true,
        };

        info!(%preference, backend = %self.backend.backend_type(), "Opening camera");
        let acquired = match self.backend.acquire(preference).await {
            Ok(stream) => Ok(stream),
            Err(e) if preference != FacingMode::Any => {
                warn!(error = %e, %preference, "Preferred camera unavailable, trying any camera");
                self.backend.acquire(FacingMode::Any).await
            }
            Err(e) => Err(e),
        };

        pending.armed = false;
        let mut inner = lock(&self.inner);
        let current =
            inner.generation == generation && matches!(inner.state, SessionState::Opening);

        match acquired {
            Ok(mut stream) if !current => {
                drop(inner);
                info!(device = stream.label(), "Camera closed while opening, releasing");
                stream.stop();
                Err(CameraError::OpenCancelled)
            }
            Ok(stream) => {
                info!(
                    device = stream.label(),
                    size = ?stream.native_size(),
                    "Camera live"
                );
                inner.state = SessionState::Live { stream };
                Ok(())
            }
            Err(_) if !current => Err(CameraError::OpenCancelled),
            Err(e) => {
                error!(error = %e, "No camera available");
                inner.state = SessionState::Closed;
                Err(CameraError::DeviceUnavailable)
            }
        }
    }

    /// Stop the device and return to Closed, from any state
    pub fn close(&self) {
        close_inner(&self.inner);
    }

    /// Snapshot of the session state
    pub fn state(&self) -> CameraStatus {
        let inner = lock(&self.inner);
        match &inner.state {
            SessionState::Closed => CameraStatus::Closed,
            SessionState::Opening => CameraStatus::Opening,
            SessionState::Live { .. } => CameraStatus::Live,
            SessionState::Recording { recording, .. } => {
                let now = Instant::now();
                CameraStatus::Recording {
                    elapsed: now.saturating_duration_since(recording.started_at),
                    remaining: recording.deadline.saturating_duration_since(now),
                }
            }
        }
    }

    /// Container of the running recording
    pub fn recording_format(&self) -> Option<RecordingFormat> {
        match &lock(&self.inner).state {
            SessionState::Recording { recording, .. } => Some(recording.format.clone()),
            _ => None,
        }
    }

    /// Current frame for preview while Live or Recording
    pub fn preview_frame(&self) -> Option<CameraFrame> {
        let inner = lock(&self.inner);
        match &inner.state {
            SessionState::Live { stream } | SessionState::Recording { stream, .. } => {
                stream.current_frame().ok()
            }
            _ => None,
        }
    }

    /// Grab the current frame as a still artifact, then close
    ///
    /// No-op unless Live. The artifact is emitted on the capture channel
    /// before this returns.
    pub async fn capture_still(&self) -> CameraResult<()> {
        let (frame, target, generation) = {
            let inner = lock(&self.inner);
            let SessionState::Live { stream } = &inner.state else {
                debug!("Still capture ignored, camera not live");
                return Ok(());
            };
            (
                stream.current_frame(),
                stream.native_size().unwrap_or(self.settings.fallback_size),
                inner.generation,
            )
        };

        let frame = match frame {
            Ok(frame) => frame,
            Err(e) => {
                error!(error = %e, "Failed to grab frame");
                self.close();
                return Err(e.into());
            }
        };

        let encoded = self.settings.encoder.encode(frame, target).await;

        if lock(&self.inner).generation != generation {
            debug!("Session changed during encoding, discarding still");
            return Ok(());
        }
        self.close();

        let artifact = encoded.inspect_err(|e| error!(error = %e, "Still encoding failed"))?;
        info!(
            filename = artifact.filename(),
            size = artifact.len(),
            "Still captured"
        );
        let _ = self.captures.send(artifact);
        Ok(())
    }

    /// Begin recording, auto-stopping after `max_duration`
    ///
    /// No-op unless Live. The recording format is the richest one the
    /// backend offers.
    pub fn start_recording(&self, max_duration: Duration) -> CameraResult<()> {
        let mut inner = lock(&self.inner);
        let mut stream = match std::mem::replace(&mut inner.state, SessionState::Closed) {
            SessionState::Live { stream } => stream,
            other => {
                inner.state = other;
                debug!("Recording start ignored, camera not live");
                return Ok(());
            }
        };

        let choice = select_recording_format(&self.backend.supported_formats());
        let chunks = match stream.start_recording(&choice.format) {
            Ok(chunks) => chunks,
            Err(e) => {
                error!(error = %e, format = %choice.format, "Failed to start recording");
                inner.generation += 1;
                drop(inner);
                stream.stop();
                return Err(e.into());
            }
        };

        inner.generation += 1;
        let generation = inner.generation;
        let (stop_tx, stop_rx) = oneshot::channel();
        let started_at = Instant::now();
        let deadline = started_at + max_duration;

        let task = tokio::spawn(drive_recording(
            Arc::clone(&self.inner),
            self.captures.clone(),
            RecordingJob {
                chunks,
                stop_rx,
                deadline,
                format: choice.format.clone(),
                generation,
            },
        ));

        info!(
            format = %choice.format,
            fell_back = choice.fell_back,
            max_ms = max_duration.as_millis() as u64,
            "Recording started"
        );
        inner.state = SessionState::Recording {
            stream,
            recording: ActiveRecording {
                format: choice.format,
                started_at,
                deadline,
                stop_tx: Some(stop_tx),
                task: Some(task),
            },
        };
        Ok(())
    }

    /// Stop recording and wait for the artifact to be emitted
    ///
    /// No-op unless Recording. Loses silently to a deadline that already
    /// fired.
    pub async fn stop_recording(&self) {
        let task = {
            let mut inner = lock(&self.inner);
            match &mut inner.state {
                SessionState::Recording { recording, .. } => {
                    if let Some(stop_tx) = recording.stop_tx.take() {
                        let _ = stop_tx.send(());
                    }
                    recording.task.take()
                }
                _ => {
                    debug!("Recording stop ignored, not recording");
                    None
                }
            }
        };

        if let Some(task) = task
            && let Err(e) = task.await
            && !e.is_cancelled()
        {
            error!(error = %e, "Recording task failed");
        }
    }
}

impl Drop for CameraSession {
    fn drop(&mut self) {
        close_inner(&self.inner);
    }
}

/// Resets an abandoned Opening state when the `open` future is dropped
struct PendingOpen<'a> {
    inner: &'a Mutex<SessionInner>,
    generation: u64,
    armed: bool,
}

impl Drop for PendingOpen<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut inner = lock(self.inner);
        if inner.generation == self.generation && matches!(inner.state, SessionState::Opening) {
            debug!("Open abandoned before the camera was acquired");
            inner.generation += 1;
            inner.state = SessionState::Closed;
        }
    }
}

struct RecordingJob {
    chunks: crate::backends::camera::ChunkReceiver,
    stop_rx: oneshot::Receiver<()>,
    deadline: Instant,
    format: RecordingFormat,
    generation: u64,
}

/// Runs one recording to completion and emits its artifact
async fn drive_recording(
    inner: Arc<Mutex<SessionInner>>,
    captures: mpsc::UnboundedSender<MediaArtifact>,
    job: RecordingJob,
) {
    let generation = job.generation;
    let flush_inner = Arc::clone(&inner);
    let outcome = record(job.chunks, job.stop_rx, job.deadline, move || {
        let mut inner = lock(&flush_inner);
        if inner.generation != generation {
            return;
        }
        if let SessionState::Recording { stream, .. } = &mut inner.state {
            stream.stop_recording();
        }
    })
    .await;

    let artifact = finalize(outcome.chunks, &job.format);

    {
        let mut guard = lock(&inner);
        if guard.generation != generation {
            debug!("Session changed during recording, discarding clip");
            return;
        }
        // Back to Live before the close; the task handle is detached here.
        if let SessionState::Recording { stream, .. } =
            std::mem::replace(&mut guard.state, SessionState::Closed)
        {
            guard.state = SessionState::Live { stream };
        }
    }
    close_inner(&inner);

    info!(
        filename = artifact.filename(),
        size = artifact.len(),
        reason = ?outcome.reason,
        "Recording captured"
    );
    let _ = captures.send(artifact);
}

fn close_inner(inner: &Mutex<SessionInner>) {
    let mut guard = lock(inner);
    guard.generation += 1;
    match std::mem::replace(&mut guard.state, SessionState::Closed) {
        SessionState::Closed => {}
        SessionState::Opening => debug!("Close requested while opening"),
        SessionState::Live { mut stream } => {
            info!(device = stream.label(), "Closing camera");
            stream.stop();
        }
        SessionState::Recording {
            mut stream,
            recording,
        } => {
            info!(device = stream.label(), "Closing camera, recording discarded");
            if let Some(task) = recording.task {
                task.abort();
            }
            stream.stop();
        }
    }
}

fn lock(inner: &Mutex<SessionInner>) -> MutexGuard<'_, SessionInner> {
    inner
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}
