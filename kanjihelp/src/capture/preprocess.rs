use std::io::Cursor;

use image::imageops::{self, FilterType};
use image::{DynamicImage, GenericImageView, GrayImage, ImageFormat, Luma, Rgba, RgbaImage};

use crate::config::CaptureConfig;
use crate::error::{KanjiError, Result};

use super::RegionOfInterest;

const MID_GREY: f32 = 128.0;

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizeOptions {
    pub grayscale: bool,
    pub contrast_factor: f32,
    pub max_dimension: Option<u32>,
}

impl From<&CaptureConfig> for NormalizeOptions {
    fn from(config: &CaptureConfig) -> Self {
        Self {
            grayscale: config.grayscale,
            contrast_factor: config.contrast,
            max_dimension: config.max_dimension,
        }
    }
}

/// Output of [`normalize`]: the filtered crop for recognition and the
/// unfiltered crop for display.
#[derive(Debug, Clone)]
pub struct NormalizedFrame {
    pub image: DynamicImage,
    pub preview: RgbaImage,
}

/// Crop `frame` to the centered region, then filter and downscale.
///
/// The crop is at least 1×1. Images are only ever made smaller.
pub fn normalize(
    frame: &RgbaImage,
    roi: RegionOfInterest,
    options: &NormalizeOptions,
) -> Result<NormalizedFrame> {
    let (width, height) = frame.dimensions();
    if width == 0 || height == 0 {
        return Err(KanjiError::Processing(format!(
            "Empty frame: {width}x{height}"
        )));
    }

    let crop_width = crop_extent(width, roi.width_fraction);
    let crop_height = crop_extent(height, roi.height_fraction);
    let x = (width - crop_width) / 2;
    let y = (height - crop_height) / 2;

    let mut preview = imageops::crop_imm(frame, x, y, crop_width, crop_height).to_image();

    let filtered = if options.grayscale {
        let gray = DynamicImage::ImageRgba8(preview.clone()).to_luma8();
        DynamicImage::ImageLuma8(adjust_gray(gray, options.contrast_factor))
    } else {
        DynamicImage::ImageRgba8(adjust_rgba(preview.clone(), options.contrast_factor))
    };

    let image = match options.max_dimension {
        Some(max_dim) => {
            if let Some((w, h)) = fit_within(crop_width, crop_height, max_dim) {
                preview = imageops::resize(&preview, w, h, FilterType::Lanczos3);
            }
            downscale_to_fit(filtered, max_dim)
        }
        None => filtered,
    };

    Ok(NormalizedFrame { image, preview })
}

pub fn encode_png(image: &DynamicImage) -> Result<Vec<u8>> {
    let mut output = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut output), ImageFormat::Png)
        .map_err(|e| KanjiError::Processing(format!("Failed to encode image: {e}")))?;
    Ok(output)
}

/// Resize so the longer edge is at most `max_dim`, keeping the aspect ratio.
/// Uses Lanczos3. Images already within bounds are returned unchanged.
pub fn downscale_to_fit(img: DynamicImage, max_dim: u32) -> DynamicImage {
    let (width, height) = img.dimensions();
    match fit_within(width, height, max_dim) {
        Some((w, h)) => img.resize_exact(w, h, FilterType::Lanczos3),
        None => img,
    }
}

fn fit_within(width: u32, height: u32, max_dim: u32) -> Option<(u32, u32)> {
    if max_dim == 0 || (width <= max_dim && height <= max_dim) {
        return None;
    }

    let ratio = max_dim as f32 / width.max(height) as f32;
    let new_width = ((width as f32 * ratio).round() as u32).clamp(1, max_dim);
    let new_height = ((height as f32 * ratio).round() as u32).clamp(1, max_dim);
    Some((new_width, new_height))
}

fn crop_extent(total: u32, fraction: f32) -> u32 {
    let fraction = if fraction.is_finite() {
        fraction.clamp(0.0, 1.0)
    } else {
        1.0
    };
    ((total as f32 * fraction).round() as u32).clamp(1, total)
}

fn contrast(value: u8, factor: f32) -> u8 {
    ((value as f32 - MID_GREY) * factor + MID_GREY)
        .round()
        .clamp(0.0, 255.0) as u8
}

fn adjust_gray(mut gray: GrayImage, factor: f32) -> GrayImage {
    for Luma([value]) in gray.pixels_mut() {
        *value = contrast(*value, factor);
    }
    gray
}

fn adjust_rgba(mut rgba: RgbaImage, factor: f32) -> RgbaImage {
    for Rgba([r, g, b, _alpha]) in rgba.pixels_mut() {
        *r = contrast(*r, factor);
        *g = contrast(*g, factor);
        *b = contrast(*b, factor);
    }
    rgba
}
