//! Errors shared by the frame analysis routines.

use thiserror::Error;

/// Problems with the arguments handed to an analysis routine.
///
/// A missing detection is not an error; routines that can come up empty
/// return `Option` instead.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AnalysisError {
    #[error("image is empty ({width}x{height})")]
    EmptyImage { width: usize, height: usize },

    #[error("invalid dimensions: {0}")]
    InvalidDimensions(String),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
