// SPDX-License-Identifier: GPL-3.0-only

//! Observable state of the camera session and the submission pipeline

use crate::errors::{CameraError, SubmitError};
use crate::media::MediaKind;
use std::time::Duration;

/// Snapshot of the camera session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CameraStatus {
    /// No device held
    #[default]
    Closed,
    /// Waiting for the device to be acquired
    Opening,
    /// Device streaming, preview available
    Live,
    /// Recording with a running deadline
    Recording {
        /// Time since recording started
        elapsed: Duration,
        /// Time left before auto-stop
        remaining: Duration,
    },
}

impl CameraStatus {
    pub fn is_recording(&self) -> bool {
        matches!(self, CameraStatus::Recording { .. })
    }
}

/// Annotated media returned by the detection service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectionResult {
    /// Kind of the submitted media
    pub kind: MediaKind,
    /// Data URI or hosted URL of the annotated media
    pub annotated: String,
}

/// Why a capture or submission failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureReason {
    DeviceUnavailable,
    NoMediaSelected,
    TransportError,
    ServerError(u16),
    MalformedResponse,
}

impl FailureReason {
    /// Reason to surface for a camera error
    ///
    /// A cancelled or overlapping open is not a failure and yields `None`.
    pub fn from_camera(err: &CameraError) -> Option<Self> {
        match err {
            CameraError::OpenCancelled | CameraError::OpenInProgress => None,
            CameraError::DeviceUnavailable
            | CameraError::Backend(_)
            | CameraError::Encoding(_) => Some(FailureReason::DeviceUnavailable),
        }
    }
}

impl From<&SubmitError> for FailureReason {
    fn from(err: &SubmitError) -> Self {
        match err {
            SubmitError::NoMediaSelected => FailureReason::NoMediaSelected,
            SubmitError::Transport(_) => FailureReason::TransportError,
            SubmitError::Server(status) => FailureReason::ServerError(*status),
            SubmitError::MalformedResponse(_) => FailureReason::MalformedResponse,
        }
    }
}

impl From<SubmitError> for FailureReason {
    fn from(err: SubmitError) -> Self {
        FailureReason::from(&err)
    }
}

/// Submission state machine
///
/// Exactly one value is live per pipeline; a new submission replaces it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SubmissionState {
    /// Nothing submitted, or a finished result was cleared
    #[default]
    Idle,
    /// Upload in progress
    InFlight {
        /// Percentage of the body sent, absent when the total is unknown
        progress: Option<u8>,
    },
    /// Service returned an annotated result
    Succeeded(DetectionResult),
    /// Submission failed
    Failed(FailureReason),
}

impl SubmissionState {
    /// Succeeded or Failed
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SubmissionState::Succeeded(_) | SubmissionState::Failed(_)
        )
    }

    pub fn is_in_flight(&self) -> bool {
        matches!(self, SubmissionState::InFlight { .. })
    }

    /// Upload progress, if in flight and known
    pub fn progress(&self) -> Option<u8> {
        match self {
            SubmissionState::InFlight { progress } => *progress,
            _ => None,
        }
    }
}
