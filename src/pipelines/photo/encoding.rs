// SPDX-License-Identifier: GPL-3.0-only

//! Async still encoding
//!
//! Draws a camera frame into a raster of the requested size and encodes it
//! as JPEG (with quality control) or PNG. Encoding runs on the blocking pool.

use crate::backends::camera::types::{CameraFrame, FrameSize};
use crate::constants::{StillFormat, capture};
use crate::errors::CameraError;
use crate::media::{MediaArtifact, MediaKind};
use image::{DynamicImage, RgbaImage, imageops::FilterType};
use tracing::{debug, info};

/// Still image encoder
#[derive(Debug, Clone, Copy)]
pub struct StillEncoder {
    format: StillFormat,
    quality: u8,
}

impl Default for StillEncoder {
    fn default() -> Self {
        Self::new(StillFormat::default(), capture::JPEG_QUALITY)
    }
}

impl StillEncoder {
    /// `quality` only affects JPEG and is clamped to 1-100
    pub fn new(format: StillFormat, quality: u8) -> Self {
        Self {
            format,
            quality: quality.clamp(1, 100),
        }
    }

    /// Encode `frame` into a `target`-sized still artifact
    pub async fn encode(
        &self,
        frame: CameraFrame,
        target: FrameSize,
    ) -> Result<MediaArtifact, CameraError> {
        info!(
            source = %frame.size(),
            target = %target,
            format = self.format.display_name(),
            "Encoding still"
        );

        let format = self.format;
        let quality = self.quality;

        let data = tokio::task::spawn_blocking(move || {
            let raster = draw_raster(&frame, target)?;
            let data = match format {
                StillFormat::Jpeg => encode_jpeg(raster, quality)?,
                StillFormat::Png => encode_png(raster)?,
            };
            debug!(size = data.len(), "Encoding complete");
            Ok::<_, CameraError>(data)
        })
        .await
        .map_err(|e| CameraError::Encoding(format!("Encoding task error: {}", e)))??;

        Ok(MediaArtifact::captured(
            MediaKind::Image,
            format.mime_type(),
            data,
        ))
    }
}

/// Copy the frame into an offscreen raster, scaling when the sizes differ
fn draw_raster(frame: &CameraFrame, target: FrameSize) -> Result<RgbaImage, CameraError> {
    if target.width == 0 || target.height == 0 {
        return Err(CameraError::Encoding(format!("Invalid raster size {}", target)));
    }

    let source = RgbaImage::from_raw(frame.width, frame.height, frame.data.to_vec())
        .ok_or_else(|| CameraError::Encoding("Frame buffer does not match its size".to_string()))?;

    if frame.size() == target {
        return Ok(source);
    }
    Ok(image::imageops::resize(
        &source,
        target.width,
        target.height,
        FilterType::Triangle,
    ))
}

fn encode_jpeg(raster: RgbaImage, quality: u8) -> Result<Vec<u8>, CameraError> {
    // JPEG has no alpha channel
    let rgb = DynamicImage::ImageRgba8(raster).to_rgb8();
    let mut buffer = Vec::new();
    let mut encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buffer, quality);
    encoder
        .encode(
            rgb.as_raw(),
            rgb.width(),
            rgb.height(),
            image::ExtendedColorType::Rgb8,
        )
        .map_err(|e| CameraError::Encoding(format!("JPEG encoding failed: {}", e)))?;
    Ok(buffer)
}

fn encode_png(raster: RgbaImage) -> Result<Vec<u8>, CameraError> {
    let mut buffer = Vec::new();
    raster
        .write_to(
            &mut std::io::Cursor::new(&mut buffer),
            image::ImageFormat::Png,
        )
        .map_err(|e| CameraError::Encoding(format!("PNG encoding failed: {}", e)))?;
    Ok(buffer)
}
