//! Visualisation helpers for analysis results.

use thiserror::Error;

/// Errors raised while rendering.
#[derive(Debug, Error)]
pub enum VizError {
    /// Nothing to render.
    #[error("cannot render an empty frame ({width}x{height})")]
    EmptyImage { width: usize, height: usize },

    /// Overlay parameters that cannot be drawn.
    #[error("invalid overlay: {0}")]
    InvalidOverlay(String),
}

/// Result type for visualisation operations.
pub type Result<T> = std::result::Result<T, VizError>;

pub mod colormap;
pub mod overlay;
mod parula;

pub use colormap::{apply_colormap, Colormap};
pub use overlay::{render_fit_overlay, render_fit_overlay_styled, OverlayStyle};
