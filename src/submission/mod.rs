// SPDX-License-Identifier: GPL-3.0-only

//! Submission pipeline
//!
//! Sends the staged artifact to the detection service and publishes the
//! resulting [`SubmissionState`] on a watch channel.
//!
//! ```text
//! submit() ──▶ InFlight{0} ──▶ InFlight{..100} ──▶ Succeeded | Failed
//!    │
//!    └─ a newer submit() aborts this transfer; its late result is dropped
//! ```

pub mod response;
pub mod transport;

pub use transport::{HttpTransport, ProgressReporter, Transport, TransportResponse, UploadRequest};

use crate::app::state::{FailureReason, SubmissionState};
use crate::constants::detection;
use crate::errors::{AppError, AppResult, SubmitError};
use crate::media::{MediaArtifact, MediaKind};
use reqwest::Url;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;
use tokio::task::AbortHandle;
use tracing::{debug, info, warn};

/// Where detection requests go
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectionEndpoint {
    base: Url,
    image: Url,
    video: Url,
}

impl DetectionEndpoint {
    /// Parse a service base URL such as `http://localhost:8000`
    pub fn parse(base: &str) -> AppResult<Self> {
        let mut normalized = base.trim().to_string();
        if !normalized.ends_with('/') {
            normalized.push('/');
        }

        let invalid = |e: &dyn std::fmt::Display| {
            AppError::Config(format!("invalid detection endpoint {:?}: {}", base, e))
        };
        let base = Url::parse(&normalized).map_err(|e| invalid(&e))?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(invalid(&"scheme must be http or https"));
        }
        let image = base
            .join(detection::IMAGE_ROUTE)
            .map_err(|e| invalid(&e))?;
        let video = base
            .join(detection::VIDEO_ROUTE)
            .map_err(|e| invalid(&e))?;

        Ok(Self { base, image, video })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Route for media of `kind`
    pub fn url_for(&self, kind: MediaKind) -> &Url {
        match kind {
            MediaKind::Image => &self.image,
            MediaKind::Video => &self.video,
        }
    }
}

#[derive(Default)]
struct Control {
    generation: u64,
    task: Option<AbortHandle>,
}

/// Runs submissions; the latest one wins
///
/// Cloning yields another handle to the same pipeline.
#[derive(Clone)]
pub struct SubmissionPipeline {
    control: Arc<Mutex<Control>>,
    transport: Arc<dyn Transport>,
    state: Arc<watch::Sender<SubmissionState>>,
}

impl SubmissionPipeline {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        let (state, _) = watch::channel(SubmissionState::Idle);
        Self {
            control: Arc::new(Mutex::new(Control::default())),
            transport,
            state: Arc::new(state),
        }
    }

    /// Start submitting `artifact`, superseding any submission in flight
    ///
    /// Without an artifact the state becomes `Failed(NoMediaSelected)` and
    /// the same error is returned. Otherwise the transfer runs in the
    /// background; follow it with [`subscribe`](Self::subscribe) or
    /// [`wait_terminal`](Self::wait_terminal).
    pub fn submit(
        &self,
        artifact: Option<MediaArtifact>,
        endpoint: &DetectionEndpoint,
    ) -> Result<(), SubmitError> {
        let mut control = lock(&self.control);
        control.generation += 1;
        let generation = control.generation;

        if let Some(task) = control.task.take() {
            debug!("Superseding submission in flight");
            task.abort();
        }

        let Some(artifact) = artifact else {
            warn!("Submit requested with no media selected");
            self.state
                .send_replace(SubmissionState::Failed(FailureReason::NoMediaSelected));
            return Err(SubmitError::NoMediaSelected);
        };

        let kind = artifact.kind();
        let request = UploadRequest {
            url: endpoint.url_for(kind).clone(),
            artifact,
        };
        info!(
            url = %request.url,
            kind = %kind,
            size = request.artifact.len(),
            generation,
            "Submitting media"
        );

        self.state
            .send_replace(SubmissionState::InFlight { progress: Some(0) });

        let reporter = {
            let control = Arc::clone(&self.control);
            let state = Arc::clone(&self.state);
            ProgressReporter::new(move |percent| {
                if lock(&control).generation != generation {
                    return;
                }
                state.send_if_modified(|current| match current {
                    SubmissionState::InFlight { progress } => {
                        if progress.is_some_and(|p| percent <= p) {
                            return false;
                        }
                        *progress = Some(percent);
                        true
                    }
                    _ => false,
                });
            })
        };

        let transport = Arc::clone(&self.transport);
        let task_control = Arc::clone(&self.control);
        let task_state = Arc::clone(&self.state);
        let task = tokio::spawn(async move {
            let result = transport
                .send(request, reporter)
                .await
                .and_then(|response| response::interpret(response, kind));
            complete(&task_control, &task_state, generation, result);
        });
        control.task = Some(task.abort_handle());
        Ok(())
    }

    /// Current state
    pub fn state(&self) -> SubmissionState {
        self.state.borrow().clone()
    }

    /// Watch state transitions
    pub fn subscribe(&self) -> watch::Receiver<SubmissionState> {
        self.state.subscribe()
    }

    /// Wait until the state is Succeeded or Failed
    ///
    /// Returns immediately if it already is.
    pub async fn wait_terminal(&self) -> SubmissionState {
        let mut rx = self.state.subscribe();
        match rx.wait_for(SubmissionState::is_terminal).await {
            Ok(state) => state.clone(),
            Err(_) => self.state(),
        }
    }

    /// Return a finished state to Idle; a submission in flight is untouched
    pub fn reset(&self) {
        self.state.send_if_modified(|state| {
            if state.is_terminal() {
                *state = SubmissionState::Idle;
                true
            } else {
                false
            }
        });
    }

    /// Abort any submission in flight and return to Idle
    pub fn cancel(&self) {
        let mut control = lock(&self.control);
        control.generation += 1;
        if let Some(task) = control.task.take() {
            debug!("Cancelling submission in flight");
            task.abort();
        }
        self.state.send_if_modified(|state| {
            if state.is_in_flight() {
                *state = SubmissionState::Idle;
                true
            } else {
                false
            }
        });
    }
}

impl std::fmt::Debug for SubmissionPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubmissionPipeline")
            .field("state", &*self.state.borrow())
            .finish()
    }
}

fn complete(
    control: &Mutex<Control>,
    state: &watch::Sender<SubmissionState>,
    generation: u64,
    result: Result<crate::app::state::DetectionResult, SubmitError>,
) {
    let mut control = lock(control);
    if control.generation != generation {
        debug!(generation, "Dropping result of superseded submission");
        return;
    }
    control.task = None;

    let next = match result {
        Ok(result) => {
            info!(kind = %result.kind, "Detection succeeded");
            SubmissionState::Succeeded(result)
        }
        Err(e) => {
            warn!(error = %e, "Detection failed");
            SubmissionState::Failed(FailureReason::from(&e))
        }
    };
    state.send_replace(next);
}

fn lock(control: &Mutex<Control>) -> MutexGuard<'_, Control> {
    control
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_routes() {
        let endpoint = DetectionEndpoint::parse("http://example.com:8000").unwrap();
        assert_eq!(
            endpoint.url_for(MediaKind::Image).as_str(),
            "http://example.com:8000/detect"
        );
        assert_eq!(
            endpoint.url_for(MediaKind::Video).as_str(),
            "http://example.com:8000/detect-video"
        );
    }

    #[test]
    fn test_endpoint_keeps_base_path() {
        let endpoint = DetectionEndpoint::parse("https://host/api/").unwrap();
        assert_eq!(
            endpoint.url_for(MediaKind::Image).as_str(),
            "https://host/api/detect"
        );
    }

    #[test]
    fn test_endpoint_rejects_garbage() {
        assert!(DetectionEndpoint::parse("not a url").is_err());
        assert!(DetectionEndpoint::parse("ftp://host").is_err());
    }
}
