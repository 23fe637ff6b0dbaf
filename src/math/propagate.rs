//! First-order (Gaussian) propagation of uncertainty.
//!
//! For a derived quantity `f(p)` with parameter covariance `Σ` and gradient
//! `g = ∂f/∂p` evaluated at the nominal parameters:
//!
//! ```text
//! σ_f² = gᵀ Σ g
//! ```
//!
//! Callers supply analytic partial derivatives; this module only does the
//! linear algebra and assembles covariance matrices.

use nalgebra::{DMatrix, DVector};

use crate::domain::Measured;
use crate::error::AppError;

/// Propagate `covariance` through the gradient of a derived quantity.
pub fn propagate(value: f64, gradient: &[f64], covariance: &DMatrix<f64>) -> Result<Measured, AppError> {
    let n = gradient.len();
    if covariance.nrows() != n || covariance.ncols() != n {
        return Err(AppError::new(
            4,
            format!(
                "Gradient has {n} entries but the covariance is {}x{}.",
                covariance.nrows(),
                covariance.ncols()
            ),
        ));
    }
    if !value.is_finite() || gradient.iter().any(|g| !g.is_finite()) {
        return Err(AppError::new(4, "Derived quantity or its gradient is not finite."));
    }

    let g = DVector::from_column_slice(gradient);
    let variance = (g.transpose() * covariance * &g)[(0, 0)];
    // Rounding can leave a tiny negative variance for perfectly correlated inputs.
    Ok(Measured::new(value, variance.max(0.0).sqrt()))
}

/// Extend a covariance matrix with independent variables of the given sigmas.
///
/// The result is block diagonal: `[[cov, 0], [0, diag(σ²)]]`.
pub fn with_independent(covariance: &DMatrix<f64>, sigmas: &[f64]) -> DMatrix<f64> {
    let k = covariance.nrows();
    let n = k + sigmas.len();
    DMatrix::from_fn(n, n, |i, j| {
        if i < k && j < k {
            covariance[(i, j)]
        } else if i == j {
            sigmas[i - k] * sigmas[i - k]
        } else {
            0.0
        }
    })
}
