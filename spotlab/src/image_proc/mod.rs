//! Frame analysis routines
//!
//! Segmentation and geometry work on `image` crate buffers so they can lean on
//! `imageproc`; numeric fitting and peak finding work on `ndarray` views of
//! `f64` samples. [`convert`] moves frames between the two.

pub mod centroid;
pub mod contours;
pub mod convert;
pub mod ellipse;
pub mod gaussian_fit;
pub mod geometry;
pub mod moments;
pub mod peaks;
pub mod threshold;

pub use centroid::{find_centroid, Centroid, CentroidConfig, EdgeMode};
pub use convert::{array_to_gray_image, gray_image_to_array, normalize_to_gray};
pub use ellipse::{fit_ellipse, Ellipse};
pub use gaussian_fit::{
    fit_gaussian, gaussian_1d, gaussian_2d, FitError, GaussianFit, GaussianFitConfig,
    GaussianParams,
};
pub use geometry::{crop_around_center, largest_rotated_rect, rotate_image, upscale_nearest};
pub use moments::PolygonMoments;
pub use peaks::{describe_first_peak, find_peaks, Peak, PeakFinderConfig};
pub use threshold::{apply_threshold, has_contrast, in_range_mask};
