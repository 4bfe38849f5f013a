//! Box constraints for the optimiser

use super::LmError;

/// Inclusive lower/upper limits per parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds<const N: usize> {
    pub lower: [f64; N],
    pub upper: [f64; N],
}

impl<const N: usize> Bounds<N> {
    /// Create bounds, rejecting NaN limits and inverted intervals.
    ///
    /// Infinite limits are allowed and mean "unbounded on that side".
    pub fn new(lower: [f64; N], upper: [f64; N]) -> Result<Self, LmError> {
        for i in 0..N {
            if lower[i].is_nan() || upper[i].is_nan() {
                return Err(LmError::ArgumentError(format!(
                    "bound {i} is NaN: [{}, {}]",
                    lower[i], upper[i]
                )));
            }
            if lower[i] > upper[i] {
                return Err(LmError::ArgumentError(format!(
                    "bound {i} is inverted: [{}, {}]",
                    lower[i], upper[i]
                )));
            }
        }
        Ok(Self { lower, upper })
    }

    /// Clamp every parameter into its interval.
    pub fn project(&self, params: &mut [f64; N]) {
        for ((p, &lo), &hi) in params.iter_mut().zip(&self.lower).zip(&self.upper) {
            *p = p.clamp(lo, hi);
        }
    }

    /// True when every parameter lies inside its interval.
    pub fn contains(&self, params: &[f64; N]) -> bool {
        params
            .iter()
            .zip(&self.lower)
            .zip(&self.upper)
            .all(|((&p, &lo), &hi)| p >= lo && p <= hi)
    }
}
