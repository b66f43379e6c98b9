// SPDX-License-Identifier: GPL-3.0-only

//! Result rendering
//!
//! A pure function of [`SubmissionState`]. The surrounding page renders only
//! what [`ResultPresenter::present`] returns.

use crate::app::state::{FailureReason, SubmissionState};
use crate::media::MediaKind;
use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use tracing::warn;

/// Standard alphabet; services differ on whether they pad
const DATA_URI_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Annotated media ready to display
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnnotatedMedia {
    /// Decoded `data:` URI payload
    Inline {
        kind: MediaKind,
        mime: String,
        bytes: Vec<u8>,
    },
    /// Media hosted by the service
    Remote { kind: MediaKind, url: String },
}

/// What the page shows
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultView {
    Empty,
    Progress {
        /// Absent while the upload size is unknown
        percent: Option<u8>,
    },
    Annotated(AnnotatedMedia),
    Message {
        text: String,
        reason: Option<FailureReason>,
    },
}

/// Stateless presenter
#[derive(Debug, Default, Clone, Copy)]
pub struct ResultPresenter;

impl ResultPresenter {
    pub fn present(state: &SubmissionState) -> ResultView {
        match state {
            SubmissionState::Idle => ResultView::Empty,
            SubmissionState::InFlight { progress } => ResultView::Progress { percent: *progress },
            SubmissionState::Succeeded(result) => {
                let annotated = result.annotated.trim();
                if annotated.starts_with("data:") {
                    match decode_data_uri(annotated) {
                        Some((mime, bytes)) => ResultView::Annotated(AnnotatedMedia::Inline {
                            kind: result.kind,
                            mime,
                            bytes,
                        }),
                        None => {
                            warn!("Annotated result is not a decodable data URI");
                            ResultView::Message {
                                text: "The detection service returned an unreadable image."
                                    .to_string(),
                                reason: Some(FailureReason::MalformedResponse),
                            }
                        }
                    }
                } else {
                    ResultView::Annotated(AnnotatedMedia::Remote {
                        kind: result.kind,
                        url: annotated.to_string(),
                    })
                }
            }
            SubmissionState::Failed(reason) => ResultView::Message {
                text: message_for(*reason),
                reason: Some(*reason),
            },
        }
    }
}

/// Human readable text for a failure
pub fn message_for(reason: FailureReason) -> String {
    match reason {
        FailureReason::DeviceUnavailable => {
            "No camera is available. Check that a camera is connected and not in use.".to_string()
        }
        FailureReason::NoMediaSelected => {
            "Select an image or video, or capture one, before running detection.".to_string()
        }
        FailureReason::TransportError => {
            "Could not reach the detection service. Check your connection and try again."
                .to_string()
        }
        FailureReason::ServerError(status) => {
            format!("The detection service rejected the request (HTTP {}).", status)
        }
        FailureReason::MalformedResponse => {
            "The detection service sent a response that could not be understood.".to_string()
        }
    }
}

/// Split a base64 `data:` URI into MIME type and bytes
pub fn decode_data_uri(uri: &str) -> Option<(String, Vec<u8>)> {
    let rest = uri.strip_prefix("data:")?;
    let (header, payload) = rest.split_once(',')?;
    let mime = header.strip_suffix(";base64")?;
    let mime = if mime.is_empty() {
        "application/octet-stream"
    } else {
        mime
    };
    let bytes = DATA_URI_ENGINE.decode(payload.trim()).ok()?;
    Some((mime.to_string(), bytes))
}

impl std::fmt::Display for ResultView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResultView::Empty => Ok(()),
            ResultView::Progress { percent: Some(p) } => write!(f, "Uploading... {}%", p),
            ResultView::Progress { percent: None } => write!(f, "Uploading..."),
            ResultView::Annotated(AnnotatedMedia::Inline { kind, mime, bytes }) => {
                write!(f, "Annotated {} ({}, {} bytes)", kind, mime, bytes.len())
            }
            ResultView::Annotated(AnnotatedMedia::Remote { kind, url }) => {
                write!(f, "Annotated {}: {}", kind, url)
            }
            ResultView::Message { text, .. } => write!(f, "{}", text),
        }
    }
}
