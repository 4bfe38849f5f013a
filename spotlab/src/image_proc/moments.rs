//! Spatial moments of closed polygons
//!
//! Contours come back from border following as ordered vertex lists. Their
//! moments are integrated over the enclosed region with Green's theorem, so
//! the area and centroid describe the filled shape rather than the outline
//! pixels.

use imageproc::point::Point;

/// Raw moments up to second order of a closed polygon.
///
/// The vertex order (clockwise or counter-clockwise) does not matter; the
/// moments are normalised so that `m00` is the non-negative enclosed area.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PolygonMoments {
    pub m00: f64,
    pub m10: f64,
    pub m01: f64,
    pub m20: f64,
    pub m11: f64,
    pub m02: f64,
}

impl PolygonMoments {
    /// Integrate the moments of the polygon through `points`.
    ///
    /// The last vertex connects back to the first. Fewer than three vertices
    /// enclose nothing and give all-zero moments.
    pub fn from_points(points: &[Point<i32>]) -> Self {
        let n = points.len();
        if n < 3 {
            return Self::default();
        }

        let mut m = Self::default();
        for i in 0..n {
            let p = points[i];
            let q = points[(i + 1) % n];
            let (xi, yi) = (p.x as f64, p.y as f64);
            let (xj, yj) = (q.x as f64, q.y as f64);

            let a = xi * yj - xj * yi;
            m.m00 += a;
            m.m10 += (xi + xj) * a;
            m.m01 += (yi + yj) * a;
            m.m20 += (xi * xi + xi * xj + xj * xj) * a;
            m.m02 += (yi * yi + yi * yj + yj * yj) * a;
            m.m11 += (xi * yj + 2.0 * xi * yi + 2.0 * xj * yj + xj * yi) * a;
        }

        m.m00 /= 2.0;
        m.m10 /= 6.0;
        m.m01 /= 6.0;
        m.m20 /= 12.0;
        m.m02 /= 12.0;
        m.m11 /= 24.0;

        if m.m00 < 0.0 {
            m.m00 = -m.m00;
            m.m10 = -m.m10;
            m.m01 = -m.m01;
            m.m20 = -m.m20;
            m.m02 = -m.m02;
            m.m11 = -m.m11;
        }
        m
    }

    /// Enclosed area.
    pub fn area(&self) -> f64 {
        self.m00
    }

    /// Area centroid `(m10 / m00, m01 / m00)`, or `None` for a degenerate polygon.
    pub fn centroid(&self) -> Option<(f64, f64)> {
        if self.m00 <= f64::EPSILON {
            return None;
        }
        let cx = self.m10 / self.m00;
        let cy = self.m01 / self.m00;
        (cx.is_finite() && cy.is_finite()).then_some((cx, cy))
    }

    /// Second order central moments normalised by area: `(mu20, mu11, mu02)`.
    ///
    /// These are the entries of the covariance matrix of a uniform density
    /// over the polygon.
    pub fn normalized_central(&self) -> Option<(f64, f64, f64)> {
        let (cx, cy) = self.centroid()?;
        let mu20 = self.m20 / self.m00 - cx * cx;
        let mu11 = self.m11 / self.m00 - cx * cy;
        let mu02 = self.m02 / self.m00 - cy * cy;
        Some((mu20, mu11, mu02))
    }
}
