//! Linear least squares via SVD.
//!
//! Two callers in this project:
//!
//! - the Gauss-Newton strategy, which solves `J δ = r` once per iteration
//! - the Fermi-linear background fallback, which fits `y = a·x + b` directly
//!   when the edge windows are too small for the trimmed-slope heuristic
//!
//! Implementation choices:
//! - SVD handles tall design matrices (many samples, 2-5 columns) and
//!   near-collinear columns without panicking. Nalgebra's `QR::solve` is for
//!   square systems only.
//! - The Jacobians here can be nearly rank-deficient (e.g. a vanishing step
//!   amplitude makes the temperature column numerically zero), so we try
//!   progressively looser tolerances before giving up.

use nalgebra::{DMatrix, DVector};

/// Solve `min ||a·beta - y||` using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(a: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = a.clone().svd(true, true);

    for &tol in &[1e-10, 1e-8, 1e-6] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}

/// Fit `y = slope * x + intercept` by ordinary least squares.
///
/// Returns `(slope, intercept)`, or `None` when the system is degenerate
/// (e.g. all `x` identical).
pub fn fit_line(x: &[f64], y: &[f64]) -> Option<(f64, f64)> {
    if x.len() != y.len() || x.len() < 2 {
        return None;
    }
    let n = x.len();
    let mut design = DMatrix::zeros(n, 2);
    for (i, &xi) in x.iter().enumerate() {
        design[(i, 0)] = xi;
        design[(i, 1)] = 1.0;
    }
    let rhs = DVector::from_column_slice(y);
    let beta = solve_least_squares(&design, &rhs)?;
    Some((beta[0], beta[1]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn least_squares_solves_simple_system() {
        // Fit y = 2 + 3x on x = [0,1,2]
        let a = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
        let y = DVector::from_row_slice(&[2.0, 5.0, 8.0]);

        let beta = solve_least_squares(&a, &y).unwrap();
        assert!((beta[0] - 2.0).abs() < 1e-10);
        assert!((beta[1] - 3.0).abs() < 1e-10);
    }

    #[test]
    fn fit_line_recovers_slope_intercept() {
        let x: Vec<f64> = (0..20).map(|i| i as f64).collect();
        let y: Vec<f64> = x.iter().map(|&v| -0.75 * v + 4.0).collect();
        let (slope, intercept) = fit_line(&x, &y).unwrap();
        assert!((slope + 0.75).abs() < 1e-10);
        assert!((intercept - 4.0).abs() < 1e-10);
    }

    #[test]
    fn fit_line_rejects_degenerate_input() {
        assert!(fit_line(&[1.0], &[2.0]).is_none());
        assert!(fit_line(&[1.0, 2.0], &[3.0]).is_none());
    }
}
