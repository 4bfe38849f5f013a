//! Intensity thresholding for bright spot segmentation
//!
//! Masks use the OpenCV convention: foreground pixels are 255, background 0.

use image::{imageops, GrayImage, Luma};

const FOREGROUND: u8 = 255;
const BACKGROUND: u8 = 0;

/// Binary mask of the pixels whose intensity lies in `[lower, upper]`.
///
/// # Arguments
/// * `image` - Input greyscale frame
/// * `lower` - Inclusive lower intensity bound
/// * `upper` - Inclusive upper intensity bound
///
/// # Returns
/// A mask where 255 marks in-range pixels
pub fn in_range_mask(image: &GrayImage, lower: u8, upper: u8) -> GrayImage {
    let mut mask = GrayImage::new(image.width(), image.height());
    for (x, y, pixel) in image.enumerate_pixels() {
        let v = pixel[0];
        if v >= lower && v <= upper {
            mask.put_pixel(x, y, Luma([FOREGROUND]));
        }
    }
    mask
}

/// Binary mask of the pixels strictly brighter than `threshold`.
pub fn apply_threshold(image: &GrayImage, threshold: u8) -> GrayImage {
    let mut mask = image.clone();
    for pixel in mask.pixels_mut() {
        pixel[0] = if pixel[0] > threshold {
            FOREGROUND
        } else {
            BACKGROUND
        };
    }
    mask
}

/// True if the frame holds at least two distinct intensities.
pub fn has_contrast(image: &GrayImage) -> bool {
    let mut pixels = image.pixels();
    match pixels.next() {
        Some(first) => pixels.any(|p| p[0] != first[0]),
        None => false,
    }
}

/// Number of foreground (non-zero) pixels in a mask.
pub fn count_foreground(mask: &GrayImage) -> usize {
    mask.pixels().filter(|p| p[0] != BACKGROUND).count()
}

/// Surround a mask with `pad` pixels of background on every side.
///
/// Border following treats a region touching the frame edge as a hole, and
/// morphology is clipped there; padding keeps both away from the edge. The
/// original pixel `(x, y)` lands at `(x + pad, y + pad)`.
pub fn pad_mask(mask: &GrayImage, pad: u32) -> GrayImage {
    let (width, height) = mask.dimensions();
    let mut padded = GrayImage::new(width + 2 * pad, height + 2 * pad);
    imageops::replace(&mut padded, mask, i64::from(pad), i64::from(pad));
    padded
}
