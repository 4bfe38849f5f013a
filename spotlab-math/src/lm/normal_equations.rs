//! Cost and normal-equation assembly

use super::{Model2D, Samples};

/// Sum of squared residuals.
pub(super) fn compute_cost<const N: usize, M: Model2D<N>>(
    model: &M,
    samples: &Samples<'_>,
    params: &[f64; N],
) -> f64 {
    samples
        .x
        .iter()
        .zip(samples.y)
        .zip(samples.z)
        .map(|((&x, &y), &z)| {
            let r = z - model.evaluate(x, y, params);
            r * r
        })
        .sum()
}

/// Build `J^T J` and `J^T r`.
///
/// Only the upper triangle is accumulated, then mirrored.
#[allow(clippy::needless_range_loop)]
pub(super) fn build_normal_equations<const N: usize, M: Model2D<N>>(
    model: &M,
    samples: &Samples<'_>,
    params: &[f64; N],
) -> ([[f64; N]; N], [f64; N]) {
    let mut hessian = [[0.0f64; N]; N];
    let mut gradient = [0.0f64; N];

    for ((&x, &y), &z) in samples.x.iter().zip(samples.y).zip(samples.z) {
        let row = model.jacobian_row(x, y, params);
        let r = z - model.evaluate(x, y, params);
        for i in 0..N {
            gradient[i] += row[i] * r;
            for j in i..N {
                hessian[i][j] += row[i] * row[j];
            }
        }
    }

    for i in 1..N {
        for j in 0..i {
            hessian[i][j] = hessian[j][i];
        }
    }

    (hessian, gradient)
}
