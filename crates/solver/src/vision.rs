//! Frame preparation and recognition
//!
//! Captured frames are normalized to RGB, downscaled so no side
//! exceeds 1280 px, and JPEG-encoded before upload; the backend is
//! asked to answer whatever question the image shows.

use crate::{BackendClient, BackendResult};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, RgbImage, RgbaImage};
use std::sync::Arc;

const MAX_DIMENSION: u32 = 1280;
const JPEG_QUALITY: u8 = 70;

const ANALYZE_PROMPT: &str = "Please analyze this image and answer any questions shown in it. \
Provide a concise, correct answer.";

/// Turns captured frames into backend answers
pub struct VisionService {
    backend: Arc<BackendClient>,
}

impl VisionService {
    pub fn new(backend: Arc<BackendClient>) -> Self {
        Self { backend }
    }

    /// One-shot recognition of a captured frame
    pub fn recognize(&self, frame: RgbaImage) -> BackendResult<String> {
        let jpeg = encode_frame(frame)?;
        self.backend.solve_with_image(&jpeg, ANALYZE_PROMPT)
    }

    /// Streaming recognition; `on_chunk` receives answer fragments in order
    pub fn recognize_stream<F>(&self, frame: RgbaImage, on_chunk: F) -> BackendResult<()>
    where
        F: FnMut(&str),
    {
        let jpeg = encode_frame(frame)?;
        self.backend
            .solve_with_image_stream(&jpeg, ANALYZE_PROMPT, on_chunk)
    }
}

/// JPEG-encode a frame for upload, downscaling oversized captures
fn encode_frame(frame: RgbaImage) -> BackendResult<Vec<u8>> {
    let (width, height) = frame.dimensions();
    let rgb: RgbImage = DynamicImage::ImageRgba8(frame).to_rgb8();

    let (target_w, target_h) = scaled_dimensions(width, height);
    let scaled = if (target_w, target_h) == (width, height) {
        rgb
    } else {
        log::debug!("downscaling frame {width}x{height} -> {target_w}x{target_h}");
        image::imageops::resize(&rgb, target_w, target_h, FilterType::Triangle)
    };

    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY).encode_image(&scaled)?;
    Ok(out)
}

/// Dimensions after capping the larger side at `MAX_DIMENSION`,
/// preserving aspect ratio and never collapsing a side to zero
fn scaled_dimensions(width: u32, height: u32) -> (u32, u32) {
    let max_dim = width.max(height);
    if max_dim <= MAX_DIMENSION {
        return (width, height);
    }
    let scale = MAX_DIMENSION as f64 / max_dim as f64;
    let w = ((width as f64 * scale).round() as u32).max(1);
    let h = ((height as f64 * scale).round() as u32).max(1);
    (w, h)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_frames_keep_their_dimensions() {
        assert_eq!(scaled_dimensions(1280, 720), (1280, 720));
        assert_eq!(scaled_dimensions(200, 150), (200, 150));
        assert_eq!(scaled_dimensions(1280, 1280), (1280, 1280));
    }

    #[test]
    fn oversized_frames_cap_the_larger_side() {
        assert_eq!(scaled_dimensions(2560, 1440), (1280, 720));
        assert_eq!(scaled_dimensions(1440, 2560), (720, 1280));
        assert_eq!(scaled_dimensions(3000, 1000), (1280, 427));
    }

    #[test]
    fn extreme_aspect_ratios_never_reach_zero() {
        let (w, h) = scaled_dimensions(100_000, 10);
        assert_eq!(w, 1280);
        assert!(h >= 1);
    }

    #[test]
    fn encode_produces_jpeg_with_scaled_size() {
        let frame = RgbaImage::from_pixel(2560, 1440, image::Rgba([120, 40, 200, 255]));
        let jpeg = encode_frame(frame).unwrap();
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
        let decoded = image::load_from_memory(&jpeg).unwrap();
        assert_eq!(decoded.width(), 1280);
        assert_eq!(decoded.height(), 720);
    }

    #[test]
    fn encode_keeps_small_frames_unscaled() {
        let frame = RgbaImage::from_pixel(320, 200, image::Rgba([10, 20, 30, 255]));
        let jpeg = encode_frame(frame).unwrap();
        let decoded = image::load_from_memory(&jpeg).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (320, 200));
    }
}
