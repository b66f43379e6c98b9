// SPDX-License-Identifier: GPL-3.0-only

//! Media artifacts and where they come from
//!
//! Everything submitted to the detection service is a [`MediaArtifact`]: one
//! immutable payload with its MIME type, synthetic filename and kind. An
//! artifact is produced either from a user-selected file or by the camera
//! session ([`MediaSource`]).
//!
//! # Modules
//!
//! - [`preview`]: revocable preview handles derived from the staged artifact

pub mod preview;

pub use preview::{PreviewHandle, PreviewRegistry};

use crate::constants::{capture, detection, file_formats};
use crate::errors::MediaError;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Whether an artifact is a still image or a video
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// Classify a MIME type; anything that is not `video/*` is an image
    pub fn from_mime(mime: &str) -> Self {
        if mime.starts_with("video/") {
            MediaKind::Video
        } else {
            MediaKind::Image
        }
    }

    /// Response field carrying the annotated result for this kind
    pub fn result_field(&self) -> &'static str {
        match self {
            MediaKind::Image => detection::IMAGE_RESULT_FIELD,
            MediaKind::Video => detection::VIDEO_RESULT_FIELD,
        }
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaKind::Image => write!(f, "image"),
            MediaKind::Video => write!(f, "video"),
        }
    }
}

/// An uploadable payload
///
/// Immutable once created; replaced wholesale, never edited. Cloning shares
/// the payload.
#[derive(Clone)]
pub struct MediaArtifact {
    id: Uuid,
    kind: MediaKind,
    mime: String,
    filename: String,
    data: Arc<[u8]>,
}

impl MediaArtifact {
    pub fn new(
        kind: MediaKind,
        mime: impl Into<String>,
        filename: impl Into<String>,
        data: impl Into<Arc<[u8]>>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            mime: mime.into(),
            filename: filename.into(),
            data: data.into(),
        }
    }

    /// Build an artifact from camera output, named `capture-<millis>.<ext>`
    pub fn captured(kind: MediaKind, mime: &str, data: impl Into<Arc<[u8]>>) -> Self {
        let filename = format!(
            "{}-{}.{}",
            capture::FILENAME_PREFIX,
            chrono::Utc::now().timestamp_millis(),
            file_formats::extension_for_mime(mime)
        );
        Self::new(kind, mime, filename, data)
    }

    /// Read a user-selected file
    ///
    /// The MIME type comes from the extension, falling back to sniffing the
    /// content for images.
    pub async fn from_file(path: &Path) -> Result<Self, MediaError> {
        let bytes = tokio::fs::read(path).await?;
        if bytes.is_empty() {
            return Err(MediaError::Empty);
        }

        let mime = detect_mime(path, &bytes)?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| format!("upload.{}", file_formats::extension_for_mime(mime)));

        debug!(path = %path.display(), mime, size = bytes.len(), "Loaded media file");
        Ok(Self::new(MediaKind::from_mime(mime), mime, filename, bytes))
    }

    /// Identity of this artifact, unique per creation
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    pub fn mime(&self) -> &str {
        &self.mime
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn data(&self) -> &Arc<[u8]> {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl std::fmt::Debug for MediaArtifact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaArtifact")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("mime", &self.mime)
            .field("filename", &self.filename)
            .field("bytes", &self.data.len())
            .finish()
    }
}

fn detect_mime(path: &Path, bytes: &[u8]) -> Result<&'static str, MediaError> {
    if let Some(mime) = path
        .extension()
        .and_then(|e| e.to_str())
        .and_then(file_formats::mime_for_extension)
    {
        return Ok(mime);
    }

    match image::guess_format(bytes) {
        Ok(format) => Ok(format.to_mime_type()),
        Err(_) => Err(MediaError::UnsupportedFormat(path.display().to_string())),
    }
}

/// Where the active media comes from
#[derive(Debug, Clone)]
pub enum MediaSource {
    /// A file picked by the user
    File(PathBuf),
    /// An artifact emitted by the camera session
    Captured(MediaArtifact),
}

impl MediaSource {
    /// Produce the artifact for this source
    pub async fn into_artifact(self) -> Result<MediaArtifact, MediaError> {
        match self {
            MediaSource::File(path) => MediaArtifact::from_file(&path).await,
            MediaSource::Captured(artifact) => Ok(artifact),
        }
    }
}
