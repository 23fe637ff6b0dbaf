//! Straight-line regression with measurement uncertainties.
//!
//! Three flavours are used by the experiments:
//!
//! - **ordinary**: no usable y-uncertainty; unit weights and the covariance is
//!   scaled by the residual variance `SSE / (n - 2)`
//! - **weighted**: weights `1/σy²`; the covariance is the absolute-sigma
//!   covariance `(Xᵀ W X)⁻¹` and is *not* rescaled by χ²
//! - **effective variance**: both axes carry uncertainty. A σy-only fit seeds
//!   the slope `m0`, then a single weighted pass uses
//!   `σ_eff = sqrt(σy² + (m0 σx)²)`

use log::debug;
use nalgebra::{DMatrix, DVector};

use crate::domain::{FitMethod, LinearFit, Measured};
use crate::error::AppError;
use crate::math::ols::{LeastSquares, weighted_least_squares};

/// Fit `y = m x + b`, weighting by `sigma_y` when it carries information.
///
/// `sigma_y == None` or all-zero sigmas fall back to ordinary least squares.
pub fn fit_line(x: &[f64], y: &[f64], sigma_y: Option<&[f64]>) -> Result<LinearFit, AppError> {
    check_series(x, y)?;
    match resolve_sigma(sigma_y, x.len(), "y")? {
        Some(sigma) => weighted_fit(x, y, &sigma, FitMethod::Weighted),
        None => ordinary_fit(x, y),
    }
}

/// Effective-variance fit for data with uncertainty on both axes.
pub fn fit_effective_variance(
    x: &[f64],
    y: &[f64],
    sigma_x: &[f64],
    sigma_y: &[f64],
) -> Result<LinearFit, AppError> {
    check_series(x, y)?;
    if sigma_x.len() != x.len() {
        return Err(AppError::new(
            2,
            format!("Got {} x-uncertainties for {} points.", sigma_x.len(), x.len()),
        ));
    }
    if sigma_x.iter().any(|s| !(s.is_finite() && *s >= 0.0)) {
        return Err(AppError::new(2, "x-uncertainties must be finite and >= 0."));
    }
    let sigma_y = resolve_sigma(Some(sigma_y), x.len(), "y")?.ok_or_else(|| {
        AppError::new(2, "Effective-variance fit requires positive y-uncertainties.")
    })?;

    // Pass 1: seed slope from the y-uncertainty alone.
    let seed = weighted_fit(x, y, &sigma_y, FitMethod::Weighted)?;
    let m0 = seed.slope.value;
    debug!("effective variance: seed slope m0 = {m0:.6e}");

    // Pass 2: fold the x-uncertainty into y through the seed slope.
    let sigma_eff: Vec<f64> = sigma_y
        .iter()
        .zip(sigma_x)
        .map(|(&sy, &sx)| (sy * sy + (m0 * sx).powi(2)).sqrt())
        .collect();

    weighted_fit(x, y, &sigma_eff, FitMethod::EffectiveVariance)
}

fn check_series(x: &[f64], y: &[f64]) -> Result<(), AppError> {
    if x.len() != y.len() {
        return Err(AppError::new(
            4,
            format!("x and y differ in length ({} vs {}).", x.len(), y.len()),
        ));
    }
    if x.len() < 2 {
        return Err(AppError::new(
            3,
            format!("A line fit needs at least 2 points, got {}.", x.len()),
        ));
    }
    if x.iter().chain(y).any(|v| !v.is_finite()) {
        return Err(AppError::new(4, "Non-finite value in fit data."));
    }
    Ok(())
}

/// Validate per-point sigmas.
///
/// Returns `None` when no sigma information is available (missing or all
/// zero), which means the fit reduces to ordinary least squares.
fn resolve_sigma(sigma: Option<&[f64]>, n: usize, axis: &str) -> Result<Option<Vec<f64>>, AppError> {
    let Some(sigma) = sigma else {
        return Ok(None);
    };
    if sigma.len() != n {
        return Err(AppError::new(
            2,
            format!("Got {} {axis}-uncertainties for {n} points.", sigma.len()),
        ));
    }
    if sigma.iter().any(|s| !(s.is_finite() && *s >= 0.0)) {
        return Err(AppError::new(
            2,
            format!("{axis}-uncertainties must be finite and >= 0."),
        ));
    }

    let zeros = sigma.iter().filter(|s| **s == 0.0).count();
    if zeros == n {
        return Ok(None);
    }
    if zeros > 0 {
        return Err(AppError::new(
            2,
            format!("{zeros} of {n} {axis}-uncertainties are zero; weights would be infinite."),
        ));
    }
    Ok(Some(sigma.to_vec()))
}

fn weighted_fit(x: &[f64], y: &[f64], sigma: &[f64], method: FitMethod) -> Result<LinearFit, AppError> {
    let weights = DVector::from_iterator(sigma.len(), sigma.iter().map(|s| 1.0 / (s * s)));
    let ls = solve_line(x, y, &weights)?;
    let fit = line_from_solution(&ls, 1.0, x.len(), method, sigma.to_vec());
    debug!(
        "{}: m = {:.6e}, b = {:.6e}, chi2 = {:.4}",
        method.display_name(),
        fit.slope.value,
        fit.intercept.value,
        fit.chi2
    );
    Ok(fit)
}

fn ordinary_fit(x: &[f64], y: &[f64]) -> Result<LinearFit, AppError> {
    let n = x.len();
    if n < 3 {
        return Err(AppError::new(
            3,
            "Without y-uncertainties at least 3 points are needed to estimate the parameter uncertainty.",
        ));
    }
    let ls = solve_line(x, y, &DVector::from_element(n, 1.0))?;
    let residual_variance = ls.chi2 / (n - 2) as f64;
    let fit = line_from_solution(
        &ls,
        residual_variance,
        n,
        FitMethod::Ordinary,
        vec![residual_variance.sqrt(); n],
    );
    debug!(
        "ordinary least squares: m = {:.6e}, b = {:.6e}, s^2 = {:.4e}",
        fit.slope.value, fit.intercept.value, residual_variance
    );
    Ok(fit)
}

fn solve_line(x: &[f64], y: &[f64], weights: &DVector<f64>) -> Result<LeastSquares, AppError> {
    let n = x.len();
    let design = DMatrix::from_fn(n, 2, |i, j| if j == 0 { x[i] } else { 1.0 });
    let y = DVector::from_column_slice(y);
    weighted_least_squares(&design, &y, weights).ok_or_else(|| {
        AppError::new(
            4,
            "Line fit is singular (are all x values identical?).",
        )
    })
}

fn line_from_solution(
    ls: &LeastSquares,
    covariance_scale: f64,
    n: usize,
    method: FitMethod,
    sigma_used: Vec<f64>,
) -> LinearFit {
    let cov = &ls.normal_inverse * covariance_scale;
    let covariance = [[cov[(0, 0)], cov[(0, 1)]], [cov[(1, 0)], cov[(1, 1)]]];
    LinearFit {
        method,
        slope: Measured::new(ls.beta[0], cov[(0, 0)].max(0.0).sqrt()),
        intercept: Measured::new(ls.beta[1], cov[(1, 1)].max(0.0).sqrt()),
        covariance,
        chi2: ls.chi2,
        dof: n.saturating_sub(2),
        sigma_used,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() <= tol * (1.0 + b.abs())
    }

    #[test]
    fn noise_free_line_is_recovered_exactly() {
        let x: Vec<f64> = (0..10).map(f64::from).collect();
        let y: Vec<f64> = x.iter().map(|x| 2.0 * x + 1.0).collect();

        let fit = fit_line(&x, &y, None).unwrap();
        assert_eq!(fit.method, FitMethod::Ordinary);
        assert!(close(fit.slope.value, 2.0, 1e-12));
        assert!(close(fit.intercept.value, 1.0, 1e-12));
        assert!(fit.slope.sigma < 1e-9);
        assert!(fit.intercept.sigma < 1e-9);
    }

    #[test]
    fn zero_sigma_reduces_to_ordinary_least_squares() {
        let x = [0.0, 1.0, 2.0, 3.0, 4.0];
        let y = [1.1, 2.9, 5.2, 6.8, 9.1];

        let ols = fit_line(&x, &y, None).unwrap();
        let zero = fit_line(&x, &y, Some(&[0.0; 5][..])).unwrap();
        assert_eq!(zero.method, FitMethod::Ordinary);
        assert_eq!(ols.slope, zero.slope);
        assert_eq!(ols.intercept, zero.intercept);

        // Textbook OLS slope/intercept.
        let n = x.len() as f64;
        let sx: f64 = x.iter().sum();
        let sy: f64 = y.iter().sum();
        let sxx: f64 = x.iter().map(|v| v * v).sum();
        let sxy: f64 = x.iter().zip(&y).map(|(a, b)| a * b).sum();
        let slope = (n * sxy - sx * sy) / (n * sxx - sx * sx);
        let intercept = (sy - slope * sx) / n;
        assert!(close(zero.slope.value, slope, 1e-12));
        assert!(close(zero.intercept.value, intercept, 1e-12));
    }

    #[test]
    fn ordinary_sigmas_follow_residual_variance() {
        let x = [0.0, 1.0, 2.0, 3.0, 4.0];
        let y = [1.1, 2.9, 5.2, 6.8, 9.1];

        let fit = fit_line(&x, &y, None).unwrap();
        assert_eq!(fit.method, FitMethod::Ordinary);

        let n = x.len() as f64;
        let sx: f64 = x.iter().sum();
        let sxx: f64 = x.iter().map(|v| v * v).sum();
        let delta = n * sxx - sx * sx;
        let sse: f64 = x
            .iter()
            .zip(&y)
            .map(|(&xi, &yi)| (yi - fit.eval(xi)).powi(2))
            .sum();
        let s2 = sse / (n - 2.0);

        assert!(s2 > 0.0);
        assert!(close(fit.slope.sigma, (s2 * n / delta).sqrt(), 1e-10));
        assert!(close(fit.intercept.sigma, (s2 * sxx / delta).sqrt(), 1e-10));
        assert!(close(fit.covariance[0][1], -s2 * sx / delta, 1e-10));
        assert!(fit.sigma_used.iter().all(|&s| close(s, s2.sqrt(), 1e-12)));
    }

    #[test]
    fn constant_sigma_matches_closed_form_covariance() {
        let x = [1.0, 2.0, 3.0, 4.0];
        let y = [2.0, 4.1, 5.9, 8.2];
        let sigma = 0.5;

        let fit = fit_line(&x, &y, Some(&[sigma; 4][..])).unwrap();
        assert_eq!(fit.method, FitMethod::Weighted);

        let w = 1.0 / (sigma * sigma);
        let s = 4.0 * w;
        let sx = 10.0 * w;
        let sxx = 30.0 * w;
        let delta = s * sxx - sx * sx;
        assert!(close(fit.covariance[0][0], s / delta, 1e-10));
        assert!(close(fit.covariance[1][1], sxx / delta, 1e-10));
        assert!(close(fit.covariance[0][1], -sx / delta, 1e-10));
        assert!(close(fit.covariance[1][0], fit.covariance[0][1], 1e-12));
        assert_eq!(fit.dof, 2);
    }

    #[test]
    fn absolute_sigma_is_not_rescaled_by_chi2() {
        let x = [1.0, 2.0, 3.0, 4.0];
        let y_small = [2.0, 4.0, 6.0, 8.0];
        let y_noisy = [2.5, 3.5, 6.5, 7.5];
        let sigma = [1.0; 4];

        let a = fit_line(&x, &y_small, Some(&sigma[..])).unwrap();
        let b = fit_line(&x, &y_noisy, Some(&sigma[..])).unwrap();
        assert_eq!(a.slope.sigma, b.slope.sigma);
        assert!(b.chi2 > a.chi2);
    }

    #[test]
    fn refitting_is_bit_identical() {
        let x = [0.1, 0.7, 1.3, 2.2, 3.9];
        let y = [0.3, 1.9, 3.5, 5.1, 8.8];
        let sx = [0.05; 5];
        let sy = [0.2, 0.2, 0.3, 0.3, 0.4];

        let a = fit_effective_variance(&x, &y, &sx, &sy).unwrap();
        let b = fit_effective_variance(&x, &y, &sx, &sy).unwrap();
        assert_eq!(a.slope.value.to_bits(), b.slope.value.to_bits());
        assert_eq!(a.intercept.value.to_bits(), b.intercept.value.to_bits());
        assert_eq!(a.covariance, b.covariance);
    }

    #[test]
    fn effective_variance_without_x_error_equals_weighted_fit() {
        let x = [1.0, 2.0, 3.0, 4.0, 5.0];
        let y = [1.8, 4.2, 6.1, 7.7, 10.3];
        let sy = [0.3, 0.3, 0.4, 0.4, 0.5];

        let weighted = fit_line(&x, &y, Some(&sy[..])).unwrap();
        let eff = fit_effective_variance(&x, &y, &[0.0; 5], &sy).unwrap();
        assert_eq!(eff.method, FitMethod::EffectiveVariance);
        assert!(close(eff.slope.value, weighted.slope.value, 1e-12));
        assert!(close(eff.slope.sigma, weighted.slope.sigma, 1e-12));
    }

    #[test]
    fn effective_variance_inflates_sigma_by_seed_slope() {
        let x = [1.0, 2.0, 3.0, 4.0];
        let y = [2.0, 4.0, 6.0, 8.0];
        let sx = [0.1; 4];
        let sy = [0.2; 4];

        let fit = fit_effective_variance(&x, &y, &sx, &sy).unwrap();
        // Seed slope is exactly 2, so σ_eff = sqrt(0.04 + 0.04).
        for s in &fit.sigma_used {
            assert!(close(*s, 0.08_f64.sqrt(), 1e-12));
        }
    }

    #[test]
    fn mixed_zero_and_positive_sigma_is_an_error() {
        let err = fit_line(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0], Some(&[0.1, 0.0, 0.1][..])).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn identical_x_values_are_singular() {
        let err = fit_line(&[2.0, 2.0, 2.0], &[1.0, 2.0, 3.0], Some(&[0.1; 3][..])).unwrap_err();
        assert_eq!(err.exit_code(), 4);
    }

    #[test]
    fn too_few_points_is_an_error() {
        assert_eq!(fit_line(&[1.0], &[1.0], None).unwrap_err().exit_code(), 3);
        assert_eq!(fit_line(&[1.0, 2.0], &[1.0, 2.0], None).unwrap_err().exit_code(), 3);
        assert!(fit_line(&[1.0, 2.0], &[1.0, 2.0], Some(&[0.1, 0.1][..])).is_ok());
    }

    #[test]
    fn mismatched_lengths_are_a_numerical_error() {
        let err = fit_line(&[1.0, 2.0, 3.0], &[1.0, 2.0], None).unwrap_err();
        assert_eq!(err.exit_code(), 4);
        let err = fit_line(&[1.0, 2.0, f64::NAN], &[1.0, 2.0, 3.0], None).unwrap_err();
        assert_eq!(err.exit_code(), 4);
    }
}
