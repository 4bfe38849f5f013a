//! Numerical routines shared by the spot analysis crates.
//!
//! Currently this is a bounded Levenberg-Marquardt solver for models sampled
//! on a 2D grid, used by the Gaussian spot fitter.

pub mod lm;

pub use lm::{
    levenberg_marquardt, Bounds, LmConfig, LmError, LmReport, Model2D, Samples, Termination,
};
