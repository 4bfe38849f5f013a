//! Frame dimensions and size utilities

use image::GenericImageView;
use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::AnalysisError;

/// Frame dimensions in pixels.
///
/// Arrays are indexed `(row, col)`, so an array of shape `(height, width)`
/// has `ImageSize { width, height }`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageSize {
    /// Image width in pixels
    pub width: usize,
    /// Image height in pixels
    pub height: usize,
}

impl ImageSize {
    /// Size of an ndarray frame of shape `(height, width)`
    pub fn of_array<T>(array: &ArrayView2<'_, T>) -> Self {
        let (height, width) = array.dim();
        Self { width, height }
    }

    /// Size of an `image` crate buffer
    pub fn of_image<I: GenericImageView>(image: &I) -> Self {
        let (width, height) = image.dimensions();
        Self {
            width: width as usize,
            height: height as usize,
        }
    }

    /// Get total number of pixels
    pub fn pixel_count(&self) -> usize {
        self.width * self.height
    }

    /// True if either dimension is zero
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Larger of width and height
    pub fn max_dim(&self) -> usize {
        self.width.max(self.height)
    }

    /// Geometric centre `(x, y)` in pixel coordinates
    pub fn center(&self) -> (f64, f64) {
        (self.width as f64 / 2.0, self.height as f64 / 2.0)
    }

    /// Error out on zero-sized frames
    pub fn ensure_non_empty(&self) -> Result<(), AnalysisError> {
        if self.is_empty() {
            return Err(AnalysisError::EmptyImage {
                width: self.width,
                height: self.height,
            });
        }
        Ok(())
    }
}

impl fmt::Display for ImageSize {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}
