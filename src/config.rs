// SPDX-License-Identifier: GPL-3.0-only

use crate::app::camera_session::CaptureSettings;
use crate::backends::camera::{CameraBackendType, FrameSize};
use crate::constants::{StillFormat, capture, detection};
use crate::errors::{AppError, AppResult};
use crate::pipelines::photo::StillEncoder;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// Directory name under the platform config dir
const CONFIG_DIR: &str = "detect-camera";
const CONFIG_FILE: &str = "config.json";

/// User settings
///
/// Missing fields take their default, so older files keep loading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Detection service base URL
    pub endpoint: String,
    /// Camera backend (virtual or V4L2)
    pub backend: CameraBackendType,
    /// Recording auto-stop ceiling in milliseconds
    pub max_recording_ms: u64,
    /// Encoding of captured stills
    pub still_format: StillFormat,
    /// JPEG quality (1-100)
    pub jpeg_quality: u8,
    /// Raster width when the camera does not report a resolution
    pub fallback_width: u32,
    /// Raster height when the camera does not report a resolution
    pub fallback_height: u32,
    /// V4L2 device node; first capture device when unset
    pub v4l2_device: Option<String>,
    /// Image shown by the virtual camera; a test pattern when unset
    pub virtual_still: Option<PathBuf>,
    /// Clip replayed by the virtual camera when recording
    pub virtual_clip: Option<PathBuf>,
    /// Where annotated results are saved; the pictures dir when unset
    pub output_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: detection::DEFAULT_BASE_URL.to_string(),
            backend: CameraBackendType::default(),
            max_recording_ms: capture::MAX_RECORDING_DURATION.as_millis() as u64,
            still_format: StillFormat::default(),
            jpeg_quality: capture::JPEG_QUALITY,
            fallback_width: capture::FALLBACK_WIDTH,
            fallback_height: capture::FALLBACK_HEIGHT,
            v4l2_device: None,
            virtual_still: None,
            virtual_clip: None,
            output_dir: None,
        }
    }
}

impl Config {
    /// `<config_dir>/detect-camera/config.json`, if the platform has a config dir
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR).join(CONFIG_FILE))
    }

    /// Load the user's config, falling back to defaults
    ///
    /// A missing file is normal; an unreadable or invalid one is logged.
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            debug!("No config directory, using defaults");
            return Self::default();
        };
        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Self::default();
        }
        match Self::load_from(&path) {
            Ok(config) => config,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Ignoring invalid config");
                Self::default()
            }
        }
    }

    pub fn load_from(path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        serde_json::from_str(&contents)
            .map_err(|e| AppError::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn save_to(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| AppError::Config(e.to_string()))?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn max_recording_duration(&self) -> Duration {
        Duration::from_millis(self.max_recording_ms)
    }

    /// Capture parameters for the camera session
    pub fn capture_settings(&self) -> CaptureSettings {
        CaptureSettings {
            encoder: StillEncoder::new(self.still_format, self.jpeg_quality),
            fallback_size: FrameSize::new(self.fallback_width, self.fallback_height),
            max_recording: self.max_recording_duration(),
        }
    }
}
