//! Moment-equivalent ellipse of a thresholded blob

use image::GrayImage;
use serde::{Deserialize, Serialize};

use super::contours::largest_outer_contour;
use super::threshold::{apply_threshold, pad_mask};

/// Fewest contour points accepted for an ellipse estimate.
const MIN_CONTOUR_POINTS: usize = 5;

/// Ellipse with the same area and second moments as a blob outline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ellipse {
    pub center_x: f64,
    pub center_y: f64,
    pub semi_major: f64,
    pub semi_minor: f64,
    /// Angle of the major axis from the +x axis, in pixel coordinates
    /// (rows grow downward), within `[-pi/2, pi/2]`
    pub angle_rad: f64,
}

impl Ellipse {
    pub fn area(&self) -> f64 {
        std::f64::consts::PI * self.semi_major * self.semi_minor
    }

    pub fn eccentricity(&self) -> f64 {
        if self.semi_major <= 0.0 {
            return 0.0;
        }
        (1.0 - (self.semi_minor / self.semi_major).powi(2))
            .max(0.0)
            .sqrt()
    }
}

/// Threshold `image` and describe its largest blob as an ellipse.
///
/// Pixels strictly above `threshold` are foreground. The outer contour with
/// the largest area is reduced to the ellipse whose uniform fill has the same
/// covariance: for a filled ellipse the variance along an axis is a quarter
/// of the squared semi-axis.
///
/// Returns `None` if there is no blob, the contour has fewer than five
/// points, or it encloses no area.
pub fn fit_ellipse(image: &GrayImage, threshold: u8) -> Option<Ellipse> {
    let mask = pad_mask(&apply_threshold(image, threshold), 1);
    let contour = largest_outer_contour(&mask)?;
    if contour.points.len() < MIN_CONTOUR_POINTS {
        return None;
    }

    let (padded_x, padded_y) = contour.moments.centroid()?;
    let (center_x, center_y) = (padded_x - 1.0, padded_y - 1.0);
    let (mu20, mu11, mu02) = contour.moments.normalized_central()?;

    let mean = (mu20 + mu02) / 2.0;
    let spread = (((mu20 - mu02) / 2.0).powi(2) + mu11 * mu11).sqrt();
    let major_var = mean + spread;
    let minor_var = (mean - spread).max(0.0);

    Some(Ellipse {
        center_x,
        center_y,
        semi_major: 2.0 * major_var.sqrt(),
        semi_minor: 2.0 * minor_var.sqrt(),
        angle_rad: 0.5 * (2.0 * mu11).atan2(mu20 - mu02),
    })
}
