//! Test fixtures shared across the workspace.
//!
//! Two kinds of helpers live here:
//!
//! - workspace paths: [`find_project_root`], [`get_output_dir`] and
//!   [`output_path`] give tests a stable `test_output/` directory for
//!   artifacts worth inspecting by eye
//! - synthetic frames: bright discs, Gaussian spots, multi-peak fields and
//!   seeded noise with known ground truth
//!
//! ```rust
//! use test_helpers::{disc_image, output_path};
//!
//! let frame = disc_image(64, 48, 30.0, 20.0, 6.0, 10, 250);
//! frame.save(output_path("disc.png")).unwrap();
//! ```

use image::{GrayImage, Luma};
use ndarray::Array2;
use once_cell::sync::Lazy;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use std::env;
use std::path::{Path, PathBuf};

#[derive(thiserror::Error, Debug)]
pub enum TestHelperError {
    /// No `Cargo.toml` with a `[workspace]` table above the current directory.
    #[error("Failed to find project root: {0}")]
    ProjectRootNotFound(String),
}

/// Walk up from the current directory to the workspace `Cargo.toml`.
pub fn find_project_root() -> Result<PathBuf, TestHelperError> {
    let mut current_dir = env::current_dir().map_err(|e| {
        TestHelperError::ProjectRootNotFound(format!("Failed to get current directory: {e}"))
    })?;

    loop {
        let cargo_toml = current_dir.join("Cargo.toml");
        if cargo_toml.exists() {
            let content = std::fs::read_to_string(&cargo_toml).map_err(|e| {
                TestHelperError::ProjectRootNotFound(format!("Failed to read Cargo.toml: {e}"))
            })?;

            if content.contains("[workspace]") {
                return Ok(current_dir);
            }
        }

        if !current_dir.pop() {
            break;
        }
    }

    Err(TestHelperError::ProjectRootNotFound(
        "Workspace root not found".to_string(),
    ))
}

static PROJECT_ROOT: Lazy<PathBuf> =
    Lazy::new(|| find_project_root().expect("Failed to find project root directory"));

/// `<workspace>/test_output`, created on first use.
pub fn get_output_dir() -> PathBuf {
    let output_dir = PROJECT_ROOT.join("test_output");
    if !output_dir.exists() {
        std::fs::create_dir_all(&output_dir).expect("Failed to create output directory");
    }
    output_dir
}

/// Path of an artifact inside [`get_output_dir`].
pub fn output_path<P: AsRef<Path>>(path: P) -> PathBuf {
    get_output_dir().join(path)
}

/// Deterministic RNG for reproducible fixtures.
pub fn seeded_rng(seed: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed)
}

/// Uniform disc on a flat background.
///
/// Pixel `(x, y)` is `foreground` when its centre lies within `radius` of
/// `(cx, cy)`.
pub fn disc_image(
    width: u32,
    height: u32,
    cx: f64,
    cy: f64,
    radius: f64,
    background: u8,
    foreground: u8,
) -> GrayImage {
    let r2 = radius * radius;
    GrayImage::from_fn(width, height, |x, y| {
        let dx = x as f64 - cx;
        let dy = y as f64 - cy;
        if dx * dx + dy * dy <= r2 {
            Luma([foreground])
        } else {
            Luma([background])
        }
    })
}

/// Noiseless isotropic Gaussian of shape `(height, width)`.
///
/// `x0` is the column coordinate and `y0` the row coordinate of the centre.
pub fn gaussian_spot(
    width: usize,
    height: usize,
    x0: f64,
    y0: f64,
    sigma: f64,
    amplitude: f64,
) -> Array2<f64> {
    let mut frame = Array2::zeros((height, width));
    add_gaussian(&mut frame, x0, y0, sigma, amplitude);
    frame
}

/// Add a Gaussian spot to an existing frame.
pub fn add_gaussian(frame: &mut Array2<f64>, x0: f64, y0: f64, sigma: f64, amplitude: f64) {
    let two_s2 = 2.0 * sigma * sigma;
    for ((row, col), v) in frame.indexed_iter_mut() {
        let dx = col as f64 - x0;
        let dy = row as f64 - y0;
        *v += amplitude * (-(dx * dx + dy * dy) / two_s2).exp();
    }
}

/// Frame with one Gaussian per `(row, col, amplitude)` entry, all sharing
/// `sigma`.
pub fn peak_field(
    width: usize,
    height: usize,
    peaks: &[(usize, usize, f64)],
    sigma: f64,
) -> Array2<f64> {
    let mut frame = Array2::zeros((height, width));
    for &(row, col, amplitude) in peaks {
        add_gaussian(&mut frame, col as f64, row as f64, sigma, amplitude);
    }
    frame
}

/// Add zero-mean Gaussian noise in place.
pub fn add_normal_noise(frame: &mut Array2<f64>, std_dev: f64, seed: u64) {
    let mut rng = seeded_rng(seed);
    let normal = Normal::new(0.0, std_dev).expect("noise std dev must be finite and >= 0");
    frame.mapv_inplace(|v| v + normal.sample(&mut rng));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_root_exists() {
        let root = find_project_root().expect("Failed to find project root");
        assert!(root.join("Cargo.toml").exists());
        assert!(root.join("test_helpers").exists());
    }

    #[test]
    fn test_output_path() {
        let path = output_path("test.png");
        assert_eq!(path, get_output_dir().join("test.png"));
        assert!(get_output_dir().is_dir());
    }

    #[test]
    fn test_disc_image() {
        let img = disc_image(20, 20, 10.0, 10.0, 3.0, 0, 255);
        assert_eq!(img.get_pixel(10, 10)[0], 255);
        assert_eq!(img.get_pixel(13, 10)[0], 255);
        assert_eq!(img.get_pixel(14, 10)[0], 0);
        assert_eq!(img.get_pixel(0, 0)[0], 0);
    }

    #[test]
    fn test_gaussian_spot_peak() {
        let spot = gaussian_spot(21, 11, 10.0, 5.0, 2.0, 7.0);
        assert_eq!(spot.dim(), (11, 21));
        assert_eq!(spot[[5, 10]], 7.0);
        assert!(spot[[5, 12]] < 7.0);
    }

    #[test]
    fn test_noise_is_reproducible() {
        let mut a = Array2::zeros((8, 8));
        let mut b = Array2::zeros((8, 8));
        add_normal_noise(&mut a, 2.0, 99);
        add_normal_noise(&mut b, 2.0, 99);
        assert_eq!(a, b);
        assert!(a.iter().any(|&v| v != 0.0));
    }
}
