// SPDX-License-Identifier: GPL-3.0-only

//! Recording container selection

use crate::backends::camera::types::RecordingFormat;
use crate::constants::recording;
use tracing::{info, warn};

/// The container a recording will use
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatChoice {
    pub format: RecordingFormat,
    /// True when nothing from the preference list was offered
    pub fell_back: bool,
}

/// Pick the best container from a capability set
///
/// Ranks by `recording::PREFERENCE` (mp4, then webm, then Motion-JPEG). When
/// the set offers none of them, the first offered format is used, and only an
/// empty set falls back to `video/webm`.
pub fn select_recording_format(supported: &[RecordingFormat]) -> FormatChoice {
    let best = recording::PREFERENCE
        .iter()
        .find(|preferred| supported.iter().any(|f| f.mime == **preferred));

    if let Some(mime) = best {
        info!(format = mime, offered = supported.len(), "Selected recording format");
        return FormatChoice {
            format: RecordingFormat::new(*mime),
            fell_back: false,
        };
    }

    let format = match supported.first() {
        Some(first) => first.clone(),
        None => RecordingFormat::new(recording::FALLBACK),
    };
    warn!(
        offered = ?supported.iter().map(|f| f.mime.as_str()).collect::<Vec<_>>(),
        format = %format,
        "No preferred recording format offered, using fallback"
    );
    FormatChoice {
        format,
        fell_back: true,
    }
}
