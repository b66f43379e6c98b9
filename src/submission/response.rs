// SPDX-License-Identifier: GPL-3.0-only

//! Detection service response handling

use super::transport::TransportResponse;
use crate::app::state::DetectionResult;
use crate::errors::SubmitError;
use crate::media::MediaKind;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct DetectionResponse {
    annotated_image: Option<String>,
    annotated_video: Option<String>,
}

/// Turn a raw response into a detection result
///
/// Anything but 200 is a server error and its body is ignored. A 200 must
/// carry a non-empty string in the field matching `kind`.
pub fn interpret(
    response: TransportResponse,
    kind: MediaKind,
) -> Result<DetectionResult, SubmitError> {
    if response.status != 200 {
        return Err(SubmitError::Server(response.status));
    }

    let body = response
        .body
        .ok_or_else(|| SubmitError::MalformedResponse("empty body".to_string()))?;
    let parsed: DetectionResponse = serde_json::from_str(&body)
        .map_err(|e| SubmitError::MalformedResponse(e.to_string()))?;

    let annotated = match kind {
        MediaKind::Image => parsed.annotated_image,
        MediaKind::Video => parsed.annotated_video,
    };

    match annotated.filter(|value| !value.trim().is_empty()) {
        Some(annotated) => Ok(DetectionResult { kind, annotated }),
        None => Err(SubmitError::MalformedResponse(format!(
            "missing {}",
            kind.result_field()
        ))),
    }
}
