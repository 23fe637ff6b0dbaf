//! Weighted least squares solver.
//!
//! Every fit in this tool is a small linear regression problem:
//!
//! ```text
//! minimize Σ w_i (y_i - x_i^T β)^2
//! ```
//!
//! Rows are scaled by `sqrt(w_i)` and the resulting ordinary least squares
//! problem is solved with an SVD. The SVD also gives us a condition check, so a
//! degenerate design (e.g. every `x` identical) is rejected instead of
//! producing a minimum-norm answer that looks like a real fit.

use nalgebra::{DMatrix, DVector};

/// Smallest accepted ratio between the smallest and largest singular value.
const MIN_CONDITION_RATIO: f64 = 1e-12;

/// Solution of a weighted least squares problem.
#[derive(Debug, Clone)]
pub struct LeastSquares {
    pub beta: DVector<f64>,
    /// `(Xᵀ W X)⁻¹`, the parameter covariance for absolute weights.
    pub normal_inverse: DMatrix<f64>,
    /// Weighted residual sum of squares `Σ w_i r_i²`.
    pub chi2: f64,
}

/// Solve a weighted least squares problem.
///
/// Returns `None` if the shapes disagree, a weight is not finite and positive,
/// or the design is too ill-conditioned to solve.
pub fn weighted_least_squares(
    design: &DMatrix<f64>,
    y: &DVector<f64>,
    weights: &DVector<f64>,
) -> Option<LeastSquares> {
    let n = design.nrows();
    let p = design.ncols();
    if n < p || y.len() != n || weights.len() != n {
        return None;
    }
    if weights.iter().any(|w| !(w.is_finite() && *w > 0.0)) {
        return None;
    }

    let sqrt_w = weights.map(f64::sqrt);
    let a = DMatrix::from_fn(n, p, |i, j| design[(i, j)] * sqrt_w[i]);
    let b = y.component_mul(&sqrt_w);

    let svd = a.clone().svd(true, true);
    let s_max = svd.singular_values.max();
    let s_min = svd.singular_values.min();
    if !(s_max.is_finite() && s_max > 0.0) || s_min / s_max < MIN_CONDITION_RATIO {
        return None;
    }

    let beta = svd.solve(&b, s_max * f64::EPSILON).ok()?;
    if !beta.iter().all(|v| v.is_finite()) {
        return None;
    }

    let normal_inverse = (a.transpose() * &a).try_inverse()?;
    let chi2 = (&b - &a * &beta).norm_squared();

    Some(LeastSquares {
        beta,
        normal_inverse,
        chi2,
    })
}
