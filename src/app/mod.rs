// SPDX-License-Identifier: GPL-3.0-only

//! The detection page
//!
//! [`AppModel`] mounts the capture-and-submit pipeline: it owns the camera
//! session and the staging slot, routes user intents ([`Message`]) to them
//! and exposes the single [`ResultView`] the page renders.
//!
//! # Modules
//!
//! - `camera_session`: device acquisition, stills and timed recording
//! - `staging`: the active media slot and its preview handle
//! - `presenter`: submission state to view
//! - `state`: observable state types

pub mod camera_session;
pub mod presenter;
pub mod staging;
pub mod state;

pub use camera_session::{CameraSession, CaptureReceiver, CaptureSettings};
pub use presenter::{AnnotatedMedia, ResultPresenter, ResultView};
pub use staging::CaptureStaging;
pub use state::{CameraStatus, DetectionResult, FailureReason, SubmissionState};

use crate::backends::camera::{CameraBackend, FacingMode};
use crate::config::Config;
use crate::errors::{AppResult, CameraError};
use crate::media::{MediaArtifact, MediaSource};
use crate::submission::{DetectionEndpoint, SubmissionPipeline, Transport};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn};

/// User intents and camera events
#[derive(Debug, Clone)]
pub enum Message {
    // ===== Camera =====
    /// Acquire the rear camera (any camera as fallback)
    OpenCamera,
    /// Release the camera
    CloseCamera,
    /// Take a still and stage it
    CaptureStill,
    /// Start a recording with the configured limit
    StartRecording,
    /// Stop the recording and stage the clip
    StopRecording,

    // ===== Media =====
    /// Stage a file picked by the user
    SelectFile(PathBuf),
    /// Stage an artifact emitted by the camera
    Captured(MediaArtifact),
    /// Drop the staged media and any result
    Clear,

    // ===== Submission =====
    /// Submit the staged media
    Detect,
}

/// Page state
pub struct AppModel {
    config: Config,
    endpoint: DetectionEndpoint,
    session: CameraSession,
    captures: CaptureReceiver,
    staging: CaptureStaging,
    /// Last camera failure, shown until new media arrives
    camera_error: Option<FailureReason>,
}

impl AppModel {
    pub fn new(
        config: Config,
        backend: Arc<dyn CameraBackend>,
        transport: Arc<dyn Transport>,
    ) -> AppResult<Self> {
        let endpoint = DetectionEndpoint::parse(&config.endpoint)?;
        let (session, captures) = CameraSession::new(backend, config.capture_settings());
        let staging = CaptureStaging::new(SubmissionPipeline::new(transport));

        Ok(Self {
            config,
            endpoint,
            session,
            captures,
            staging,
            camera_error: None,
        })
    }

    /// Handle one message
    ///
    /// Failures are also reflected in [`view`](Self::view); the returned
    /// error is for callers that want to stop on them.
    pub async fn update(&mut self, message: Message) -> AppResult<()> {
        debug!(?message, "Handling message");
        match message {
            Message::OpenCamera => {
                if let Err(e) = self.session.open(FacingMode::Environment).await {
                    return self.camera_failed(e);
                }
                self.camera_error = None;
            }
            Message::CloseCamera => self.session.close(),
            Message::CaptureStill => {
                if let Err(e) = self.session.capture_still().await {
                    return self.camera_failed(e);
                }
                self.pump_captures();
            }
            Message::StartRecording => {
                let limit = self.session.settings().max_recording;
                if let Err(e) = self.session.start_recording(limit) {
                    return self.camera_failed(e);
                }
            }
            Message::StopRecording => {
                self.session.stop_recording().await;
                self.pump_captures();
            }
            Message::SelectFile(path) => {
                let artifact = MediaSource::File(path).into_artifact().await?;
                self.stage(artifact);
            }
            Message::Captured(artifact) => {
                let artifact = MediaSource::Captured(artifact).into_artifact().await?;
                self.stage(artifact);
            }
            Message::Clear => {
                self.staging.clear();
                self.camera_error = None;
            }
            Message::Detect => self.staging.submit(&self.endpoint)?,
        }
        Ok(())
    }

    /// Wait for the camera to emit an artifact (e.g. a recording hitting its
    /// deadline)
    ///
    /// The artifact is returned, not staged; send it back as
    /// [`Message::Captured`].
    pub async fn next_capture(&mut self) -> Option<MediaArtifact> {
        self.captures.recv().await
    }

    /// Stage artifacts the camera already emitted; returns how many
    pub fn pump_captures(&mut self) -> usize {
        let mut staged = 0;
        while let Ok(artifact) = self.captures.try_recv() {
            self.stage(artifact);
            staged += 1;
        }
        staged
    }

    /// Wait for the current submission to finish
    pub async fn wait_result(&self) -> SubmissionState {
        self.staging.pipeline().wait_terminal().await
    }

    /// What the page renders
    pub fn view(&self) -> ResultView {
        let state = self.staging.pipeline().state();
        match (self.camera_error, &state) {
            (Some(reason), SubmissionState::Idle) => ResultView::Message {
                text: presenter::message_for(reason),
                reason: Some(reason),
            },
            _ => ResultPresenter::present(&state),
        }
    }

    pub fn camera_state(&self) -> CameraStatus {
        self.session.state()
    }

    pub fn session(&self) -> &CameraSession {
        &self.session
    }

    pub fn staging(&self) -> &CaptureStaging {
        &self.staging
    }

    pub fn endpoint(&self) -> &DetectionEndpoint {
        &self.endpoint
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn stage(&mut self, artifact: MediaArtifact) {
        self.camera_error = None;
        self.staging.set_from_source(artifact);
    }

    fn camera_failed(&mut self, err: CameraError) -> AppResult<()> {
        match FailureReason::from_camera(&err) {
            Some(reason) => {
                warn!(error = %err, "Camera operation failed");
                self.camera_error = Some(reason);
                Err(err.into())
            }
            None => {
                debug!(error = %err, "Camera operation superseded");
                Ok(())
            }
        }
    }
}

impl Drop for AppModel {
    fn drop(&mut self) {
        // The session releases the camera in its own Drop
        self.staging.pipeline().cancel();
    }
}
