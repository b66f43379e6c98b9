// SPDX-License-Identifier: GPL-3.0-only

//! Saving annotated results to disk

use crate::constants::file_formats;
use crate::errors::AppResult;
use std::path::{Path, PathBuf};
use tracing::info;

/// Folder under the pictures dir where results are kept
const DEFAULT_SAVE_FOLDER: &str = "detect-camera";

/// Default directory for saved results
pub fn get_result_directory() -> PathBuf {
    dirs::picture_dir()
        .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
        .join(DEFAULT_SAVE_FOLDER)
}

/// Write an annotated result into `dir` as `detection_<timestamp>.<ext>`
///
/// Creates `dir` if needed and returns the written path.
pub async fn save_result(bytes: &[u8], mime: &str, dir: &Path) -> AppResult<PathBuf> {
    tokio::fs::create_dir_all(dir).await?;

    let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S%.3f");
    let filename = format!(
        "detection_{}.{}",
        timestamp,
        file_formats::extension_for_mime(mime)
    );
    let path = dir.join(filename);

    tokio::fs::write(&path, bytes).await?;
    info!(path = %path.display(), size = bytes.len(), "Saved detection result");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_save_result_uses_mime_extension() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("results");

        let path = save_result(b"GIF89a", "image/gif", &nested).await.unwrap();
        assert_eq!(path.extension().unwrap(), "gif");
        assert!(path.starts_with(&nested));
        assert_eq!(std::fs::read(&path).unwrap(), b"GIF89a");
    }

    #[test]
    fn test_result_directory_name() {
        assert!(get_result_directory().ends_with(DEFAULT_SAVE_FOLDER));
    }
}
