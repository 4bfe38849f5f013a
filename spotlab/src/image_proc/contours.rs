//! Contour extraction and selection on binary masks

use image::GrayImage;
use imageproc::contours::{find_contours, BorderType, Contour};
use imageproc::point::Point;

use super::moments::PolygonMoments;

/// An outer contour together with its polygon moments.
#[derive(Debug, Clone)]
pub struct ScoredContour {
    pub points: Vec<Point<i32>>,
    pub moments: PolygonMoments,
}

impl ScoredContour {
    fn from_contour(contour: Contour<i32>) -> Self {
        let moments = PolygonMoments::from_points(&contour.points);
        Self {
            points: contour.points,
            moments,
        }
    }

    pub fn area(&self) -> f64 {
        self.moments.area()
    }
}

/// Outer borders of every foreground region in `mask`, in discovery order.
///
/// Non-zero pixels are foreground. Hole borders are skipped.
pub fn outer_contours(mask: &GrayImage) -> Vec<ScoredContour> {
    find_contours::<i32>(mask)
        .into_iter()
        .filter(|c| c.border_type == BorderType::Outer)
        .map(ScoredContour::from_contour)
        .collect()
}

/// Outer contour with the largest enclosed area.
///
/// Ties go to the contour found first. Returns `None` if the mask has no
/// foreground at all.
pub fn largest_outer_contour(mask: &GrayImage) -> Option<ScoredContour> {
    let mut best: Option<ScoredContour> = None;
    for contour in outer_contours(mask) {
        match &best {
            Some(current) if contour.area() <= current.area() => {}
            _ => best = Some(contour),
        }
    }
    best
}
