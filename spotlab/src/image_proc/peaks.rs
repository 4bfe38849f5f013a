//! Greedy peak finding with square-window suppression

use log::debug;
use ndarray::{s, Array2, ArrayView2};
use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, Result};

/// Settings for [`find_peaks`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PeakFinderConfig {
    /// Peaks must exceed `threshold_factor * noise_sigma`
    pub threshold_factor: f64,
    /// Half width of the square window cleared around each peak
    pub exclusion_half_size: usize,
    /// Hard cap on the number of peaks returned
    pub max_peaks: usize,
}

impl Default for PeakFinderConfig {
    fn default() -> Self {
        Self {
            threshold_factor: 3.0,
            exclusion_half_size: 10,
            max_peaks: 10_000,
        }
    }
}

/// A detected local maximum.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Peak {
    pub row: usize,
    pub col: usize,
    /// Sample value at the peak in the original frame
    pub value: f64,
}

/// Highest finite sample, first in row-major order on ties.
fn argmax(work: &Array2<f64>) -> Option<((usize, usize), f64)> {
    let mut best: Option<((usize, usize), f64)> = None;
    for (idx, &v) in work.indexed_iter() {
        if v.is_nan() {
            continue;
        }
        match best {
            Some((_, current)) if v <= current => {}
            _ => best = Some((idx, v)),
        }
    }
    best
}

/// Find all peaks above the noise threshold.
///
/// Repeatedly takes the brightest remaining sample. If it is strictly above
/// `threshold_factor * noise_sigma` it is recorded and the window
/// `[row - h, row + h] x [col - h, col + h]` (clipped to the frame) is zeroed
/// so nothing in it is picked again. Stops at the first sample below
/// threshold or once `max_peaks` peaks are found.
///
/// # Returns
/// Peaks in detection order, which is descending by value among survivors
pub fn find_peaks(
    image: &ArrayView2<f64>,
    noise_sigma: f64,
    config: &PeakFinderConfig,
) -> Result<Vec<Peak>> {
    if !noise_sigma.is_finite() || noise_sigma < 0.0 {
        return Err(AnalysisError::InvalidParameter(format!(
            "noise sigma must be finite and non-negative, got {noise_sigma}"
        )));
    }
    // Below zero the suppressed windows themselves would clear the threshold
    if !config.threshold_factor.is_finite() || config.threshold_factor < 0.0 {
        return Err(AnalysisError::InvalidParameter(format!(
            "threshold factor must be finite and non-negative, got {}",
            config.threshold_factor
        )));
    }

    let threshold = config.threshold_factor * noise_sigma;
    let (height, width) = image.dim();
    let h = config.exclusion_half_size;
    let mut work = image.to_owned();
    let mut peaks = Vec::new();

    while peaks.len() < config.max_peaks {
        let Some(((row, col), value)) = argmax(&work) else {
            break;
        };
        if value <= threshold {
            break;
        }

        peaks.push(Peak { row, col, value });

        let r0 = row.saturating_sub(h);
        let r1 = (row + h + 1).min(height);
        let c0 = col.saturating_sub(h);
        let c1 = (col + h + 1).min(width);
        work.slice_mut(s![r0..r1, c0..c1]).fill(0.0);
    }

    debug!(
        "Found {} peaks above {threshold:.3} in {width}x{height} frame",
        peaks.len()
    );
    Ok(peaks)
}

/// Human readable location of the first peak, for status lines.
///
/// Returns `" at position (x, y)"` with `x` the column and `y` the row, or an
/// empty string if there are no peaks.
pub fn describe_first_peak(peaks: &[Peak]) -> String {
    match peaks.first() {
        Some(p) => format!(" at position ({}, {})", p.col, p.row),
        None => String::new(),
    }
}
