// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Still image output format for camera captures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StillFormat {
    /// JPEG (lossy, small uploads)
    #[default]
    Jpeg,
    /// PNG (lossless)
    Png,
}

impl StillFormat {
    /// File extension used in synthetic filenames
    pub fn extension(&self) -> &'static str {
        match self {
            StillFormat::Jpeg => "jpg",
            StillFormat::Png => "png",
        }
    }

    /// MIME type of the encoded still
    pub fn mime_type(&self) -> &'static str {
        match self {
            StillFormat::Jpeg => "image/jpeg",
            StillFormat::Png => "image/png",
        }
    }

    /// Get display name for the format
    pub fn display_name(&self) -> &'static str {
        match self {
            StillFormat::Jpeg => "JPEG",
            StillFormat::Png => "PNG",
        }
    }
}

/// Camera capture defaults
pub mod capture {
    use super::Duration;

    /// Recording auto-stop ceiling
    pub const MAX_RECORDING_DURATION: Duration = Duration::from_millis(10_000);

    /// Raster size used when the stream does not report its native resolution
    pub const FALLBACK_WIDTH: u32 = 1280;
    pub const FALLBACK_HEIGHT: u32 = 720;

    /// Default JPEG quality (0-100) for still captures
    pub const JPEG_QUALITY: u8 = 92;

    /// Prefix of synthetic filenames for captured media
    pub const FILENAME_PREFIX: &str = "capture";
}

/// Detection service wire contract
pub mod detection {
    /// Default service location used when nothing is configured
    pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

    /// Route for still images
    pub const IMAGE_ROUTE: &str = "detect";

    /// Route for videos
    pub const VIDEO_ROUTE: &str = "detect-video";

    /// Name of the single multipart file field
    pub const FILE_FIELD: &str = "file";

    /// Response field carrying the annotated image
    pub const IMAGE_RESULT_FIELD: &str = "annotated_image";

    /// Response field carrying the annotated video
    pub const VIDEO_RESULT_FIELD: &str = "annotated_video";

    /// Size of the slices the upload body is streamed in
    pub const UPLOAD_CHUNK_SIZE: usize = 64 * 1024;
}

/// Recording container MIME types
pub mod recording {
    /// MPEG-4 container
    pub const MP4: &str = "video/mp4";

    /// WebM container, also the documented fallback
    pub const WEBM: &str = "video/webm";

    /// Concatenated JPEG frames (V4L2 devices)
    pub const MJPEG: &str = "video/x-motion-jpeg";

    /// Formats in preference order (richest first)
    pub const PREFERENCE: &[&str] = &[MP4, WEBM, MJPEG];

    /// Used when the capability set is empty
    pub const FALLBACK: &str = WEBM;
}

/// Virtual (file-backed) camera timing
pub mod virtual_camera {
    use super::Duration;

    /// Interval between emitted recording chunks
    pub const CHUNK_INTERVAL: Duration = Duration::from_millis(250);

    /// Bytes of the clip emitted per chunk
    pub const CHUNK_SIZE: usize = 256 * 1024;
}

/// Supported file formats
pub mod file_formats {
    /// Supported image file extensions
    pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "webp"];

    /// Supported video file extensions
    pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mkv", "webm", "avi", "mov"];

    /// Check if extension is a supported video format
    pub fn is_video_extension(ext: &str) -> bool {
        VIDEO_EXTENSIONS.contains(&ext.to_lowercase().as_str())
    }

    /// MIME type for a known extension
    pub fn mime_for_extension(ext: &str) -> Option<&'static str> {
        let mime = match ext.to_lowercase().as_str() {
            "png" => "image/png",
            "jpg" | "jpeg" => "image/jpeg",
            "gif" => "image/gif",
            "bmp" => "image/bmp",
            "webp" => "image/webp",
            "mp4" => "video/mp4",
            "mkv" => "video/x-matroska",
            "webm" => "video/webm",
            "avi" => "video/x-msvideo",
            "mov" => "video/quicktime",
            _ => return None,
        };
        Some(mime)
    }

    /// File extension for a MIME type, `bin` when unknown
    pub fn extension_for_mime(mime: &str) -> &'static str {
        match mime {
            "video/mp4" => "mp4",
            "video/webm" => "webm",
            "video/x-motion-jpeg" => "mjpeg",
            "video/x-matroska" => "mkv",
            "video/x-msvideo" => "avi",
            "video/quicktime" => "mov",
            "image/png" => "png",
            "image/jpeg" => "jpg",
            "image/gif" => "gif",
            "image/bmp" => "bmp",
            "image/webp" => "webp",
            _ => "bin",
        }
    }
}
