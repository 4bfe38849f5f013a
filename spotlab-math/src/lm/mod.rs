//! Levenberg-Marquardt least squares for models sampled on a 2D grid
//!
//! The solver minimises `sum((z - f(x, y; p))^2)` over the parameter vector
//! `p`. Optional box constraints are honoured by projecting every trial step
//! back into the feasible region before it is evaluated.

mod bounds;
mod normal_equations;

use log::debug;
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use bounds::Bounds;
use normal_equations::{build_normal_equations, compute_cost};

/// Errors that can occur before or during optimisation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LmError {
    #[error("Invalid argument: {0}")]
    ArgumentError(String),

    #[error("Cost is not finite at the initial parameters")]
    NonFiniteCost,
}

/// A model evaluated at sample coordinates `(x, y)`.
///
/// `N` is the number of free parameters.
pub trait Model2D<const N: usize> {
    /// Evaluate the model at a point.
    fn evaluate(&self, x: f64, y: f64, params: &[f64; N]) -> f64;

    /// Partial derivatives of the model with respect to each parameter.
    fn jacobian_row(&self, x: f64, y: f64, params: &[f64; N]) -> [f64; N];
}

/// Borrowed sample set: coordinates and observed values, all the same length.
#[derive(Debug, Clone, Copy)]
pub struct Samples<'a> {
    pub x: &'a [f64],
    pub y: &'a [f64],
    pub z: &'a [f64],
}

impl<'a> Samples<'a> {
    /// Build a sample set, checking that all three slices agree in length.
    pub fn new(x: &'a [f64], y: &'a [f64], z: &'a [f64]) -> Result<Self, LmError> {
        if x.len() != y.len() || x.len() != z.len() {
            return Err(LmError::ArgumentError(format!(
                "sample length mismatch: x={}, y={}, z={}",
                x.len(),
                y.len(),
                z.len()
            )));
        }
        Ok(Self { x, y, z })
    }

    pub fn len(&self) -> usize {
        self.z.len()
    }

    pub fn is_empty(&self) -> bool {
        self.z.is_empty()
    }
}

/// Tuning knobs for the optimiser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LmConfig {
    /// Maximum number of accepted or rejected outer iterations.
    pub max_iterations: usize,
    /// Relative step size below which the parameters are considered converged.
    pub xtol: f64,
    /// Relative cost reduction below which the fit is considered converged.
    pub ftol: f64,
    /// Initial damping factor.
    pub initial_lambda: f64,
    /// Damping multiplier after a rejected step.
    pub lambda_up: f64,
    /// Damping multiplier after an accepted step.
    pub lambda_down: f64,
    /// Damping above which the solver gives up.
    pub max_lambda: f64,
}

impl Default for LmConfig {
    fn default() -> Self {
        Self {
            max_iterations: 200,
            xtol: 1e-10,
            ftol: 1e-12,
            initial_lambda: 1e-3,
            lambda_up: 10.0,
            lambda_down: 0.1,
            max_lambda: 1e12,
        }
    }
}

/// Why the optimiser stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Proposed step fell below `xtol`.
    ParameterTolerance,
    /// Relative cost reduction fell below `ftol`.
    CostTolerance,
    /// Model reproduces the data exactly.
    ZeroResidual,
    /// No damping level produced a lower cost.
    Stalled,
    /// Normal equations could not be solved at any damping level.
    Singular,
    /// Cost became non-finite.
    NonFinite,
    /// Iteration budget exhausted.
    MaxIterations,
}

impl Termination {
    /// True for the termination reasons that indicate a usable minimum.
    pub fn converged(&self) -> bool {
        matches!(
            self,
            Termination::ParameterTolerance | Termination::CostTolerance | Termination::ZeroResidual
        )
    }
}

/// Outcome of a Levenberg-Marquardt run.
#[derive(Debug, Clone, Copy)]
pub struct LmReport<const N: usize> {
    /// Best parameters found
    pub params: [f64; N],
    /// Sum of squared residuals at `params`
    pub chi2: f64,
    /// Number of outer iterations performed
    pub iterations: usize,
    /// Reason the solver stopped
    pub termination: Termination,
}

impl<const N: usize> LmReport<N> {
    /// Root-mean-square residual over `sample_count` samples.
    pub fn rms_residual(&self, sample_count: usize) -> f64 {
        if sample_count == 0 {
            return 0.0;
        }
        (self.chi2 / sample_count as f64).sqrt()
    }
}

/// Fit `model` to `samples` starting from `initial`.
///
/// # Arguments
/// * `model` - Model and its analytic Jacobian
/// * `samples` - Observations
/// * `initial` - Starting parameters (projected into `bounds` if given)
/// * `bounds` - Optional box constraints
/// * `config` - Solver tuning
///
/// # Returns
/// * `Ok(LmReport)` - Always returned once the arguments validate; inspect
///   `termination` to see whether the fit converged
/// * `Err(LmError)` - Invalid arguments or a non-finite starting cost
pub fn levenberg_marquardt<const N: usize, M: Model2D<N>>(
    model: &M,
    samples: Samples<'_>,
    initial: [f64; N],
    bounds: Option<&Bounds<N>>,
    config: &LmConfig,
) -> Result<LmReport<N>, LmError> {
    if N == 0 {
        return Err(LmError::ArgumentError(
            "model must have at least one parameter".to_string(),
        ));
    }
    if samples.len() < N {
        return Err(LmError::ArgumentError(format!(
            "need at least {N} samples, got {}",
            samples.len()
        )));
    }
    if initial.iter().any(|p| !p.is_finite()) {
        return Err(LmError::ArgumentError(
            "initial parameters must be finite".to_string(),
        ));
    }

    let mut params = initial;
    if let Some(b) = bounds {
        b.project(&mut params);
    }

    let mut chi2 = compute_cost(model, &samples, &params);
    if !chi2.is_finite() {
        return Err(LmError::NonFiniteCost);
    }

    let mut lambda = config.initial_lambda;
    let mut iterations = 0;
    let mut termination = Termination::MaxIterations;

    'outer: for iter in 0..config.max_iterations {
        iterations = iter + 1;

        if chi2 == 0.0 {
            termination = Termination::ZeroResidual;
            break;
        }

        let (hessian, gradient) = build_normal_equations(model, &samples, &params);

        loop {
            let Some(delta) = solve_damped(&hessian, &gradient, lambda) else {
                lambda *= config.lambda_up;
                if lambda > config.max_lambda {
                    termination = Termination::Singular;
                    break 'outer;
                }
                continue;
            };

            let mut candidate = params;
            for (p, d) in candidate.iter_mut().zip(delta.iter()) {
                *p += d;
            }
            if let Some(b) = bounds {
                b.project(&mut candidate);
            }

            let small_step = params
                .iter()
                .zip(candidate.iter())
                .all(|(&old, &new)| (new - old).abs() <= config.xtol * (old.abs() + config.xtol));

            let candidate_chi2 = compute_cost(model, &samples, &candidate);

            if candidate_chi2.is_finite() && candidate_chi2 <= chi2 {
                let reduction = (chi2 - candidate_chi2) / chi2;
                params = candidate;
                chi2 = candidate_chi2;
                lambda = (lambda * config.lambda_down).max(f64::MIN_POSITIVE);

                if small_step {
                    termination = Termination::ParameterTolerance;
                    break 'outer;
                }
                if reduction <= config.ftol {
                    termination = Termination::CostTolerance;
                    break 'outer;
                }
                continue 'outer;
            }

            // The step is already below resolution; the cost can't move any further.
            if small_step {
                termination = Termination::ParameterTolerance;
                break 'outer;
            }

            lambda *= config.lambda_up;
            if lambda > config.max_lambda {
                termination = if candidate_chi2.is_finite() {
                    Termination::Stalled
                } else {
                    Termination::NonFinite
                };
                break 'outer;
            }
        }
    }

    debug!(
        "LM finished after {iterations} iterations: {termination:?}, chi2={chi2:.3e}, lambda={lambda:.1e}"
    );

    Ok(LmReport {
        params,
        chi2,
        iterations,
        termination,
    })
}

/// Solve `(H + lambda * diag(H)) delta = g`.
///
/// Zero diagonal entries get `lambda` added directly so flat directions stay
/// invertible.
fn solve_damped<const N: usize>(
    hessian: &[[f64; N]; N],
    gradient: &[f64; N],
    lambda: f64,
) -> Option<[f64; N]> {
    let damped = DMatrix::from_fn(N, N, |i, j| {
        let h = hessian[i][j];
        if i == j {
            if h > 0.0 {
                h * (1.0 + lambda)
            } else {
                h + lambda
            }
        } else {
            h
        }
    });
    let rhs = DVector::from_column_slice(gradient);

    let solution = match damped.clone().cholesky() {
        Some(chol) => chol.solve(&rhs),
        None => damped.lu().solve(&rhs)?,
    };

    if solution.iter().any(|v| !v.is_finite()) {
        return None;
    }

    let mut delta = [0.0; N];
    delta.copy_from_slice(solution.as_slice());
    Some(delta)
}
