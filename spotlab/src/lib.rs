//! Spot analysis for the optics lab tracking rig.
//!
//! Every analysis routine here is a stateless transform over a single frame:
//!
//! - [`image_proc::centroid`]: threshold, morphology and contour based blob centroid
//! - [`image_proc::gaussian_fit`]: isotropic 2D Gaussian least-squares fit
//! - [`image_proc::peaks`]: greedy peak finding with neighbourhood suppression
//! - [`image_proc::geometry`]: rotation, inscribed rectangle and centre crop
//!
//! The [`audio`] module is the one stateful piece: it turns the latest tracked
//! position into a tone on a dedicated render thread.

pub mod audio;
pub mod config;
pub mod error;
pub mod image_proc;
pub mod image_size;
pub mod viz;

pub use config::{ConfigError, SpotlabConfig};
pub use error::AnalysisError;
pub use image_size::ImageSize;
