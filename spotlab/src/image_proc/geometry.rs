//! Rotation, inscribed rectangles, cropping and upscaling

use image::{imageops, ImageBuffer, Pixel};
use imageproc::geometric_transformations::{warp_into, Interpolation, Projection};
use log::debug;
use ndarray::{Array2, ArrayView2};

use crate::error::{AnalysisError, Result};
use crate::image_size::ImageSize;

/// Rotate an image about its centre by `angle_deg`, counter-clockwise.
///
/// The canvas grows to the rotated bounding box,
/// `round(w|cos| + h|sin|) x round(w|sin| + h|cos|)`, so nothing is clipped.
/// Uncovered pixels are black. Whole multiples of 90 degrees are done by
/// exact pixel permutation; other angles are resampled bilinearly.
pub fn rotate_image<P>(
    image: &ImageBuffer<P, Vec<u8>>,
    angle_deg: f64,
) -> Result<ImageBuffer<P, Vec<u8>>>
where
    P: Pixel<Subpixel = u8> + Send + Sync + 'static,
{
    if !angle_deg.is_finite() {
        return Err(AnalysisError::InvalidParameter(format!(
            "rotation angle must be finite, got {angle_deg}"
        )));
    }

    if angle_deg.rem_euclid(90.0) == 0.0 {
        let quarter_turns = (angle_deg / 90.0).rem_euclid(4.0) as u8;
        return Ok(match quarter_turns {
            0 => image.clone(),
            1 => imageops::rotate270(image),
            2 => imageops::rotate180(image),
            _ => imageops::rotate90(image),
        });
    }

    let (width, height) = image.dimensions();
    let theta = angle_deg.to_radians();
    let (sin, cos) = (theta.sin().abs(), theta.cos().abs());
    let w = width as f64;
    let h = height as f64;
    let out_width = (w * cos + h * sin).round().max(1.0) as u32;
    let out_height = (w * sin + h * cos).round().max(1.0) as u32;

    let in_cx = (w - 1.0) / 2.0;
    let in_cy = (h - 1.0) / 2.0;
    let out_cx = (out_width as f64 - 1.0) / 2.0;
    let out_cy = (out_height as f64 - 1.0) / 2.0;

    // Rows grow downward, so a visually counter-clockwise turn is a negative
    // rotation in pixel coordinates.
    let projection = Projection::translate(out_cx as f32, out_cy as f32)
        * Projection::rotate(-theta as f32)
        * Projection::translate(-in_cx as f32, -in_cy as f32);

    let black = *P::from_slice(&[0u8; 4][..P::CHANNEL_COUNT as usize]);
    let mut out = ImageBuffer::from_pixel(out_width, out_height, black);
    warp_into(image, &projection, Interpolation::Bilinear, black, &mut out);

    debug!("Rotated {width}x{height} by {angle_deg} deg onto {out_width}x{out_height}");
    Ok(out)
}

/// Largest axis-aligned rectangle inside a `width x height` rectangle rotated
/// by `angle_rad`.
///
/// When the rectangle is long and thin relative to the angle, the best fit
/// touches only the two long sides and is limited by the short side (the
/// "half constrained" case). Otherwise all four corners touch.
///
/// # Returns
/// `(width, height)` of the inscribed rectangle
pub fn largest_rotated_rect(width: f64, height: f64, angle_rad: f64) -> Result<(f64, f64)> {
    if !(width.is_finite() && height.is_finite()) || width <= 0.0 || height <= 0.0 {
        return Err(AnalysisError::InvalidDimensions(format!(
            "rectangle must have positive finite sides, got {width}x{height}"
        )));
    }
    if !angle_rad.is_finite() {
        return Err(AnalysisError::InvalidParameter(format!(
            "rotation angle must be finite, got {angle_rad}"
        )));
    }

    let width_is_longer = width >= height;
    let (long_side, short_side) = if width_is_longer {
        (width, height)
    } else {
        (height, width)
    };
    let sin_a = angle_rad.sin().abs();
    let cos_a = angle_rad.cos().abs();

    if short_side <= 2.0 * sin_a * cos_a * long_side || (sin_a - cos_a).abs() < 1e-10 {
        let half = 0.5 * short_side;
        return Ok(if width_is_longer {
            (half / sin_a, half / cos_a)
        } else {
            (half / cos_a, half / sin_a)
        });
    }

    let cos_2a = cos_a * cos_a - sin_a * sin_a;
    Ok((
        (width * cos_a - height * sin_a) / cos_2a,
        (height * cos_a - width * sin_a) / cos_2a,
    ))
}

/// Crop `width x height` out of the middle of `image`.
///
/// Requested sizes larger than the image are clamped to the image. The
/// offset is `(W - w) / 2` rounded down on each axis. An empty source is an
/// [`AnalysisError::EmptyImage`].
pub fn crop_around_center<P>(
    image: &ImageBuffer<P, Vec<u8>>,
    width: u32,
    height: u32,
) -> Result<ImageBuffer<P, Vec<u8>>>
where
    P: Pixel<Subpixel = u8> + 'static,
{
    if width == 0 || height == 0 {
        return Err(AnalysisError::InvalidDimensions(format!(
            "crop size must be non-zero, got {width}x{height}"
        )));
    }

    ImageSize::of_image(image).ensure_non_empty()?;

    let (src_w, src_h) = image.dimensions();
    let w = width.min(src_w);
    let h = height.min(src_h);
    let x = (src_w - w) / 2;
    let y = (src_h - h) / 2;

    Ok(imageops::crop_imm(image, x, y, w, h).to_image())
}

/// Blow up an array by an integer factor, replicating each sample into a
/// `factor x factor` block.
pub fn upscale_nearest<T: Clone>(source: &ArrayView2<T>, factor: usize) -> Result<Array2<T>> {
    if factor == 0 {
        return Err(AnalysisError::InvalidParameter(
            "upscale factor must be at least 1".to_string(),
        ));
    }
    let (rows, cols) = source.dim();
    Ok(Array2::from_shape_fn(
        (rows * factor, cols * factor),
        |(r, c)| source[[r / factor, c / factor]].clone(),
    ))
}
