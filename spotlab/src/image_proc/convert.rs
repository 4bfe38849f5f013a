//! Conversions between `ndarray` frames and `image` buffers

use image::{GrayImage, Luma};
use ndarray::{Array2, ArrayView2};
use num_traits::ToPrimitive;

/// Converts an ndarray `u8` frame to an `image::GrayImage`
///
/// Array indices `[row, col]` map to pixel coordinates `(x = col, y = row)`.
/// Array dimensions are (height, width) while image dimensions are (width, height).
pub fn array_to_gray_image(arr: &ArrayView2<u8>) -> GrayImage {
    let (height, width) = arr.dim();
    GrayImage::from_fn(width as u32, height as u32, |x, y| {
        Luma([arr[[y as usize, x as usize]]])
    })
}

/// Converts a `GrayImage` to an `f64` array of shape (height, width)
pub fn gray_image_to_array(image: &GrayImage) -> Array2<f64> {
    let (width, height) = image.dimensions();
    Array2::from_shape_fn((height as usize, width as usize), |(row, col)| {
        image.get_pixel(col as u32, row as u32)[0] as f64
    })
}

/// Stretch an arbitrary numeric frame onto the full `u8` range.
///
/// The minimum maps to 0 and the maximum to 255. Frames with no dynamic range
/// come back black. Non-finite samples are ignored when finding the range and
/// written as 0.
pub fn normalize_to_gray<T>(arr: &ArrayView2<T>) -> GrayImage
where
    T: ToPrimitive + Copy,
{
    let (height, width) = arr.dim();

    let (min, max) = arr
        .iter()
        .filter_map(|v| v.to_f64())
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });

    let range = max - min;
    if !range.is_finite() || range <= 0.0 {
        return GrayImage::new(width as u32, height as u32);
    }

    GrayImage::from_fn(width as u32, height as u32, |x, y| {
        let value = arr[[y as usize, x as usize]]
            .to_f64()
            .filter(|v| v.is_finite())
            .map(|v| ((v - min) / range * 255.0).round().clamp(0.0, 255.0) as u8)
            .unwrap_or(0);
        Luma([value])
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr2;

    #[test]
    fn test_array_to_gray_image_layout() {
        let arr = arr2(&[[1u8, 2, 3], [4, 5, 6]]);
        let img = array_to_gray_image(&arr.view());
        assert_eq!(img.dimensions(), (3, 2));
        assert_eq!(img.get_pixel(2, 0)[0], 3);
        assert_eq!(img.get_pixel(0, 1)[0], 4);

        let back = gray_image_to_array(&img);
        assert_eq!(back[[1, 2]], 6.0);
    }

    #[test]
    fn test_normalize_stretches_range() {
        let arr = arr2(&[[10.0, 20.0], [30.0, 50.0]]);
        let img = normalize_to_gray(&arr.view());
        assert_eq!(img.get_pixel(0, 0)[0], 0);
        assert_eq!(img.get_pixel(1, 1)[0], 255);
        assert_eq!(img.get_pixel(1, 0)[0], 64);
    }

    #[test]
    fn test_normalize_flat_frame_is_black() {
        let arr = Array2::<u16>::from_elem((4, 4), 1000);
        let img = normalize_to_gray(&arr.view());
        assert!(img.pixels().all(|p| p[0] == 0));
    }

    #[test]
    fn test_normalize_ignores_nan() {
        let arr = arr2(&[[f64::NAN, 0.0], [1.0, 2.0]]);
        let img = normalize_to_gray(&arr.view());
        assert_eq!(img.get_pixel(0, 0)[0], 0);
        assert_eq!(img.get_pixel(1, 1)[0], 255);
    }
}
