//! Isotropic 2D Gaussian spot fitting
//!
//! Fits `I(x, y) = H * exp(-((x - x0)^2 + (y - y0)^2) / (2 sigma^2))` to every
//! pixel of a patch with Levenberg-Marquardt. `x` is the column index and `y`
//! the row index.

use log::{debug, warn};
use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};
use spotlab_math::{
    levenberg_marquardt, Bounds, LmConfig, LmError, Model2D, Samples, Termination,
};
use thiserror::Error;

use crate::image_size::ImageSize;

/// Smallest sigma allowed in bounded mode; keeps the model finite.
const SIGMA_FLOOR: f64 = 1e-3;

/// Parameters of an isotropic Gaussian spot
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GaussianParams {
    /// Centre column
    pub x0: f64,
    /// Centre row
    pub y0: f64,
    /// Standard deviation in pixels
    pub sigma: f64,
    /// Peak height
    pub amplitude: f64,
}

impl GaussianParams {
    fn to_array(self) -> [f64; 4] {
        [self.x0, self.y0, self.sigma, self.amplitude]
    }

    fn from_array(p: [f64; 4]) -> Self {
        Self {
            x0: p[0],
            y0: p[1],
            sigma: p[2].abs(),
            amplitude: p[3],
        }
    }
}

/// A successful fit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GaussianFit {
    pub params: GaussianParams,
    /// Root-mean-square difference between model and data
    pub rms_residual: f64,
    /// Solver iterations used
    pub iterations: usize,
}

/// Why a Gaussian fit produced no parameters
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FitError {
    #[error("cannot fit an empty patch ({width}x{height})")]
    EmptyImage { width: usize, height: usize },

    #[error("patch contains non-finite samples")]
    NonFiniteData,

    #[error("fit did not converge after {iterations} iterations (rms residual {rms_residual:.4})")]
    NotConverged { iterations: usize, rms_residual: f64 },

    #[error("normal equations are singular")]
    Singular,

    #[error("fit cost became non-finite")]
    NonFinite,

    #[error("solver rejected the problem: {0}")]
    Solver(#[from] LmError),
}

/// Settings for [`fit_gaussian`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GaussianFitConfig {
    /// Initial sigma as a fraction of the larger patch dimension
    pub sigma_seed_fraction: f64,
    pub solver: LmConfig,
}

impl Default for GaussianFitConfig {
    fn default() -> Self {
        Self {
            sigma_seed_fraction: 0.1,
            solver: LmConfig::default(),
        }
    }
}

/// One-dimensional Gaussian `amplitude * exp(-(x - mu)^2 / (2 sigma^2))`
pub fn gaussian_1d(x: f64, amplitude: f64, mu: f64, sigma: f64) -> f64 {
    amplitude * (-(x - mu).powi(2) / (2.0 * sigma * sigma)).exp()
}

/// Evaluate the spot model at `(x, y)`
pub fn gaussian_2d(x: f64, y: f64, params: &GaussianParams) -> f64 {
    let r2 = (x - params.x0).powi(2) + (y - params.y0).powi(2);
    params.amplitude * (-r2 / (2.0 * params.sigma * params.sigma)).exp()
}

struct IsotropicGaussian;

impl Model2D<4> for IsotropicGaussian {
    fn evaluate(&self, x: f64, y: f64, p: &[f64; 4]) -> f64 {
        let [x0, y0, sigma, amplitude] = *p;
        let r2 = (x - x0).powi(2) + (y - y0).powi(2);
        amplitude * (-r2 / (2.0 * sigma * sigma)).exp()
    }

    fn jacobian_row(&self, x: f64, y: f64, p: &[f64; 4]) -> [f64; 4] {
        let [x0, y0, sigma, amplitude] = *p;
        let dx = x - x0;
        let dy = y - y0;
        let s2 = sigma * sigma;
        let r2 = dx * dx + dy * dy;
        let e = (-r2 / (2.0 * s2)).exp();
        [
            amplitude * e * dx / s2,
            amplitude * e * dy / s2,
            amplitude * e * r2 / (s2 * sigma),
            e,
        ]
    }
}

/// Fit an isotropic Gaussian to a patch.
///
/// The fit starts from the patch centre with `sigma = sigma_seed_fraction *
/// max(width, height)` and `amplitude = max(patch)`.
///
/// # Arguments
/// * `patch` - Samples indexed `[row, col]`
/// * `bounded` - Constrain `x0` to `[0, width]`, `y0` to `[0, height]`,
///   `sigma` to `(0, max(width, height)]` and `amplitude` to `[0, 2 * max]`
/// * `config` - Seed and solver settings
///
/// # Returns
/// * `Ok(GaussianFit)` - Converged parameters and residual
/// * `Err(FitError)` - The reason no parameters are available
pub fn fit_gaussian(
    patch: &ArrayView2<f64>,
    bounded: bool,
    config: &GaussianFitConfig,
) -> Result<GaussianFit, FitError> {
    let size = ImageSize::of_array(patch);
    if size.is_empty() {
        return Err(FitError::EmptyImage {
            width: size.width,
            height: size.height,
        });
    }
    if patch.iter().any(|v| !v.is_finite()) {
        return Err(FitError::NonFiniteData);
    }

    let n = size.pixel_count();
    let mut xs = Vec::with_capacity(n);
    let mut ys = Vec::with_capacity(n);
    let mut zs = Vec::with_capacity(n);
    for ((row, col), &value) in patch.indexed_iter() {
        xs.push(col as f64);
        ys.push(row as f64);
        zs.push(value);
    }

    let max_value = zs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let max_dim = size.max_dim() as f64;
    let (cx, cy) = size.center();
    let seed = GaussianParams {
        x0: cx,
        y0: cy,
        sigma: config.sigma_seed_fraction * max_dim,
        amplitude: max_value,
    };

    let bounds = if bounded {
        Some(Bounds::new(
            [0.0, 0.0, SIGMA_FLOOR, 0.0],
            [
                size.width as f64,
                size.height as f64,
                max_dim.max(SIGMA_FLOOR),
                (2.0 * max_value).max(0.0),
            ],
        )?)
    } else {
        None
    };

    let samples = Samples::new(&xs, &ys, &zs)?;
    let report = levenberg_marquardt(
        &IsotropicGaussian,
        samples,
        seed.to_array(),
        bounds.as_ref(),
        &config.solver,
    )?;

    let rms_residual = report.rms_residual(n);
    match report.termination {
        t if t.converged() => {
            let params = GaussianParams::from_array(report.params);
            debug!(
                "Gaussian fit on {size}: {params:?}, rms {rms_residual:.3e}, {} iterations",
                report.iterations
            );
            Ok(GaussianFit {
                params,
                rms_residual,
                iterations: report.iterations,
            })
        }
        Termination::Singular => {
            warn!("Gaussian fit hit singular normal equations");
            Err(FitError::Singular)
        }
        Termination::NonFinite => {
            warn!("Gaussian fit cost became non-finite");
            Err(FitError::NonFinite)
        }
        _ => {
            warn!(
                "Gaussian fit stopped ({:?}) after {} iterations",
                report.termination, report.iterations
            );
            Err(FitError::NotConverged {
                iterations: report.iterations,
                rms_residual,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::Array2;

    fn render(width: usize, height: usize, params: &GaussianParams) -> Array2<f64> {
        Array2::from_shape_fn((height, width), |(row, col)| {
            gaussian_2d(col as f64, row as f64, params)
        })
    }

    #[test]
    fn test_gaussian_1d_peak_and_width() {
        assert_relative_eq!(gaussian_1d(2.0, 5.0, 2.0, 1.5), 5.0);
        assert_relative_eq!(
            gaussian_1d(3.5, 5.0, 2.0, 1.5),
            5.0 * (-0.5f64).exp(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_recovers_noiseless_spot() {
        let truth = GaussianParams {
            x0: 14.6,
            y0: 17.2,
            sigma: 2.8,
            amplitude: 200.0,
        };
        let patch = render(32, 32, &truth);
        let fit = fit_gaussian(&patch.view(), false, &GaussianFitConfig::default()).unwrap();

        assert_relative_eq!(fit.params.x0, truth.x0, max_relative = 0.01);
        assert_relative_eq!(fit.params.y0, truth.y0, max_relative = 0.01);
        assert_relative_eq!(fit.params.sigma, truth.sigma, max_relative = 0.01);
        assert_relative_eq!(fit.params.amplitude, truth.amplitude, max_relative = 0.01);
        assert!(fit.rms_residual < 1e-6, "rms {}", fit.rms_residual);
    }

    #[test]
    fn test_rectangular_patch_axes() {
        // Wide patch: a swapped x/y seed would start off the frame
        let truth = GaussianParams {
            x0: 30.0,
            y0: 8.0,
            sigma: 3.0,
            amplitude: 80.0,
        };
        let patch = render(60, 16, &truth);
        let fit = fit_gaussian(&patch.view(), true, &GaussianFitConfig::default()).unwrap();
        assert_relative_eq!(fit.params.x0, 30.0, max_relative = 0.01);
        assert_relative_eq!(fit.params.y0, 8.0, max_relative = 0.01);
    }

    #[test]
    fn test_empty_and_nan_rejected() {
        let empty = Array2::<f64>::zeros((0, 5));
        assert!(matches!(
            fit_gaussian(&empty.view(), false, &GaussianFitConfig::default()),
            Err(FitError::EmptyImage { .. })
        ));

        let mut patch = Array2::<f64>::zeros((8, 8));
        patch[[3, 3]] = f64::NAN;
        assert_eq!(
            fit_gaussian(&patch.view(), false, &GaussianFitConfig::default()),
            Err(FitError::NonFiniteData)
        );
    }

    #[test]
    fn test_iteration_budget_reports_not_converged() {
        let truth = GaussianParams {
            x0: 10.0,
            y0: 12.0,
            sigma: 2.0,
            amplitude: 50.0,
        };
        let patch = render(24, 24, &truth);
        let config = GaussianFitConfig {
            solver: LmConfig {
                max_iterations: 1,
                ..Default::default()
            },
            ..Default::default()
        };
        let result = fit_gaussian(&patch.view(), false, &config);
        assert!(matches!(result, Err(FitError::NotConverged { iterations: 1, .. })));
    }
}
