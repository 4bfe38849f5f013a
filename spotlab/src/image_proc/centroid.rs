//! Bright blob centroid by segmentation and contour moments
//!
//! The pipeline is:
//! 1. keep pixels whose intensity lies in `[lower, upper]`, padded with a
//!    background margin wider than the morphology can reach
//! 2. dilate the mask with a square structuring element
//! 3. morphologically close it with the same element
//! 4. extract borders, either directly or from a Canny edge map
//! 5. take the outer contour with the largest enclosed area
//! 6. report `(m10 / m00, m01 / m00)` of that polygon

use image::{imageops, GrayImage};
use imageproc::distance_transform::Norm;
use imageproc::edges::canny;
use imageproc::morphology::{close, dilate};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::image_size::ImageSize;
use super::contours::largest_outer_contour;
use super::threshold::{count_foreground, has_contrast, in_range_mask, pad_mask};

/// How blob borders are extracted from the cleaned-up mask.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub enum EdgeMode {
    /// Follow the borders of the mask itself.
    #[default]
    Border,
    /// Run Canny on the mask first and follow the borders of the edge map.
    ///
    /// The edge map is dilated by one pixel so single-pixel breaks in the
    /// ring do not open it.
    Canny { low: f32, high: f32 },
}

impl EdgeMode {
    /// Canny with the lab's usual hysteresis thresholds.
    pub fn canny() -> Self {
        EdgeMode::Canny {
            low: 50.0,
            high: 200.0,
        }
    }
}

/// Parameters for [`find_centroid`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CentroidConfig {
    /// Lowest intensity counted as part of the spot
    pub lower: u8,
    /// Highest intensity counted as part of the spot
    pub upper: u8,
    /// L-infinity radius of the dilation element (2 gives a 5x5 square)
    pub dilate_radius: u8,
    /// Number of dilation passes
    pub dilate_iterations: usize,
    /// L-infinity radius of the closing element
    pub close_radius: u8,
    pub edge_mode: EdgeMode,
}

impl Default for CentroidConfig {
    fn default() -> Self {
        Self {
            lower: 240,
            upper: 255,
            dilate_radius: 2,
            dilate_iterations: 2,
            close_radius: 2,
            edge_mode: EdgeMode::Border,
        }
    }
}

/// Area centroid of the detected blob, in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Centroid {
    /// Column coordinate
    pub x: f64,
    /// Row coordinate
    pub y: f64,
    /// Enclosed area of the selected contour in square pixels
    pub area: f64,
}

/// Locate the centroid of the largest bright blob in a frame.
///
/// # Arguments
/// * `image` - Greyscale frame
/// * `config` - Threshold and morphology settings
///
/// # Returns
/// * `Some(Centroid)` - Centroid of the largest blob, inside the frame
/// * `None` - The frame is empty or uniform, nothing is in range, the whole
///   frame is in range, or the best contour encloses no area
pub fn find_centroid(image: &GrayImage, config: &CentroidConfig) -> Option<Centroid> {
    let size = ImageSize::of_image(image);
    if size.is_empty() {
        return None;
    }
    if !has_contrast(image) {
        debug!("Frame {size} has no contrast, skipping centroid");
        return None;
    }

    let (width, height) = image.dimensions();
    // Margin that the dilations and the closing can never grow across. Growth
    // past the frame size fills the frame, which is rejected below anyway.
    let pad = u32::from(config.dilate_radius)
        .saturating_mul(u32::try_from(config.dilate_iterations).unwrap_or(u32::MAX))
        .saturating_add(u32::from(config.close_radius))
        .saturating_add(1)
        .min(width.max(height).saturating_add(1));

    let mut mask = pad_mask(&in_range_mask(image, config.lower, config.upper), pad);
    for _ in 0..config.dilate_iterations {
        mask = dilate(&mask, Norm::LInf, config.dilate_radius);
    }
    mask = close(&mask, Norm::LInf, config.close_radius);

    let inner = imageops::crop_imm(&mask, pad, pad, width, height).to_image();
    let in_frame = count_foreground(&inner);
    if in_frame == 0 {
        debug!("No pixels in [{}, {}]", config.lower, config.upper);
        return None;
    }
    if in_frame == size.pixel_count() {
        debug!("Entire frame is foreground, no blob edge to follow");
        return None;
    }

    let borders = match config.edge_mode {
        EdgeMode::Border => mask,
        EdgeMode::Canny { low, high } => dilate(&canny(&mask, low, high), Norm::LInf, 1),
    };

    let best = largest_outer_contour(&borders)?;
    let (px, py) = best.moments.centroid()?;
    let x = (px - f64::from(pad)).clamp(0.0, f64::from(width - 1));
    let y = (py - f64::from(pad)).clamp(0.0, f64::from(height - 1));
    debug!(
        "Centroid at ({x:.2}, {y:.2}) from contour of {} points, area {:.1}",
        best.points.len(),
        best.area()
    );

    Some(Centroid {
        x,
        y,
        area: best.area(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;
    use imageproc::drawing::draw_filled_circle_mut;

    fn disc(width: u32, height: u32, cx: i32, cy: i32, radius: i32) -> GrayImage {
        let mut img = GrayImage::from_pixel(width, height, Luma([10]));
        draw_filled_circle_mut(&mut img, (cx, cy), radius, Luma([250]));
        img
    }

    #[test]
    fn test_centered_disc() {
        let img = disc(100, 80, 50, 40, 10);
        let c = find_centroid(&img, &CentroidConfig::default()).unwrap();
        assert!((c.x - 50.0).abs() < 1.0, "x = {}", c.x);
        assert!((c.y - 40.0).abs() < 1.0, "y = {}", c.y);
        assert!(c.area > 0.0);
    }

    #[test]
    fn test_canny_mode_agrees() {
        let img = disc(100, 80, 35, 45, 12);
        let config = CentroidConfig {
            edge_mode: EdgeMode::canny(),
            ..Default::default()
        };
        let c = find_centroid(&img, &config).unwrap();
        assert!((c.x - 35.0).abs() < 1.0, "x = {}", c.x);
        assert!((c.y - 45.0).abs() < 1.0, "y = {}", c.y);
    }

    #[test]
    fn test_uniform_frames_have_no_centroid() {
        let config = CentroidConfig::default();
        assert!(find_centroid(&GrayImage::from_pixel(32, 32, Luma([0])), &config).is_none());
        assert!(find_centroid(&GrayImage::from_pixel(32, 32, Luma([255])), &config).is_none());
        assert!(find_centroid(&GrayImage::new(0, 0), &config).is_none());
    }

    #[test]
    fn test_dim_frame_has_no_centroid() {
        let img = disc(64, 64, 32, 32, 8);
        let config = CentroidConfig {
            lower: 251,
            ..Default::default()
        };
        assert!(find_centroid(&img, &config).is_none());
    }

    #[test]
    fn test_largest_blob_wins() {
        let mut img = disc(120, 60, 30, 30, 5);
        draw_filled_circle_mut(&mut img, (85, 28), 14, Luma([255]));
        let c = find_centroid(&img, &CentroidConfig::default()).unwrap();
        assert!((c.x - 85.0).abs() < 1.0);
        assert!((c.y - 28.0).abs() < 1.0);
    }

    #[test]
    fn test_disc_touching_frame_edge() {
        let img = disc(160, 140, 3, 70, 3);
        let c = find_centroid(&img, &CentroidConfig::default()).unwrap();
        assert!((c.x - 3.0).abs() < 1.0, "x = {}", c.x);
        assert!((c.y - 70.0).abs() < 1.0, "y = {}", c.y);

        let img = disc(160, 140, 154, 134, 5);
        let c = find_centroid(&img, &CentroidConfig::default()).unwrap();
        assert!((c.x - 154.0).abs() < 1.0, "x = {}", c.x);
        assert!((c.y - 134.0).abs() < 1.0, "y = {}", c.y);
    }

    #[test]
    fn test_edge_blob_beats_smaller_interior_blob() {
        let mut img = disc(120, 60, 10, 30, 10);
        draw_filled_circle_mut(&mut img, (80, 30), 4, Luma([250]));
        let c = find_centroid(&img, &CentroidConfig::default()).unwrap();
        assert!((c.x - 10.0).abs() < 1.0, "x = {}", c.x);
        assert!((c.y - 30.0).abs() < 1.0, "y = {}", c.y);
    }

    #[test]
    fn test_config_roundtrip_json() {
        let config = CentroidConfig {
            edge_mode: EdgeMode::canny(),
            ..Default::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        let back: CentroidConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, back);
    }
}
