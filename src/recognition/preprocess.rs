use image::imageops::FilterType;
use image::{GrayImage, Luma};

use super::adapter::RecognitionError;

/// Longest image side accepted by recognition backends; larger screenshots
/// are scaled down to respect payload limits.
pub const MAX_RECOGNITION_DIMENSION: u32 = 1600;

/// Light normalization pass applied before recognition: decode, collapse
/// to a single luma channel, bound the dimensions, and stretch contrast to
/// counter low-contrast screenshots.
pub fn normalize_for_recognition(bytes: &[u8]) -> Result<GrayImage, RecognitionError> {
    let decoded = image::load_from_memory(bytes)?;
    let gray = decoded.to_luma8();
    let bounded = bound_dimensions(gray, MAX_RECOGNITION_DIMENSION);
    Ok(stretch_contrast(&bounded))
}

/// Scales the image down so the longest side fits `max_side`, preserving
/// aspect ratio. Images already within bounds pass through untouched.
fn bound_dimensions(img: GrayImage, max_side: u32) -> GrayImage {
    let (width, height) = img.dimensions();
    let longest = width.max(height);
    if longest <= max_side {
        return img;
    }

    let scale = max_side as f32 / longest as f32;
    let new_width = ((width as f32 * scale) as u32).max(1);
    let new_height = ((height as f32 * scale) as u32).max(1);

    image::imageops::resize(&img, new_width, new_height, FilterType::Triangle)
}

/// Linear contrast stretch: remaps the observed luma range to the full
/// 0-255 span. Flat images (single luma value) pass through unchanged.
fn stretch_contrast(img: &GrayImage) -> GrayImage {
    let mut lo = u8::MAX;
    let mut hi = u8::MIN;
    for pixel in img.pixels() {
        lo = lo.min(pixel[0]);
        hi = hi.max(pixel[0]);
    }

    if hi <= lo {
        return img.clone();
    }

    let range = (hi - lo) as f32;
    let (width, height) = img.dimensions();
    let mut out = GrayImage::new(width, height);
    for (x, y, pixel) in img.enumerate_pixels() {
        let stretched = ((pixel[0] - lo) as f32 * 255.0 / range).round() as u8;
        out.put_pixel(x, y, Luma([stretched]));
    }
    out
}
