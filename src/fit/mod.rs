//! Parameter estimation and curve fitting for the four model families.
//!
//! Responsibilities:
//!
//! - compute data-driven initial guesses per family (the delicate part)
//! - drive the nonlinear solver from those guesses, with per-parameter bounds
//! - apply model-specific post-processing and retry heuristics
//! - normalize solver output into a uniform `FitOutcome`

pub mod double_gaussian;
pub mod fermi_linear;
pub mod gaussian;
pub mod sine;

pub use double_gaussian::*;
pub use fermi_linear::*;
pub use gaussian::*;
pub use sine::*;

use crate::domain::{Advisory, FitOutcome, ModelKind};
use crate::error::AppError;
use crate::solver::SolveOutput;

/// Validate a sample series against the per-model guardrails.
///
/// Fails fast with a descriptive error instead of producing a misleading fit.
pub(crate) fn validate_series(x: &[f64], y: &[f64], kind: ModelKind) -> Result<(), AppError> {
    if x.len() != y.len() {
        return Err(AppError::invalid_input(
            format!("Series length mismatch: x has {} samples, y has {}.", x.len(), y.len()),
        ));
    }
    let min = kind.min_samples();
    if x.len() < min {
        return Err(AppError::insufficient_data(
            format!(
                "Too few samples for a {} fit: got {}, need at least {min}.",
                kind.display_name(),
                x.len()
            ),
        ));
    }
    if x.iter().chain(y.iter()).any(|v| !v.is_finite()) {
        return Err(AppError::invalid_input("Series contains non-finite values."));
    }
    if x.windows(2).any(|w| w[1] < w[0]) {
        return Err(AppError::invalid_input(
            "Independent variable must be monotonically non-decreasing.",
        ));
    }
    Ok(())
}

/// Package raw solver output into the uniform result structure.
pub(crate) fn outcome_from_solve(
    kind: ModelKind,
    solve: SolveOutput,
    initial: Vec<f64>,
    mut advisories: Vec<Advisory>,
) -> FitOutcome {
    if !solve.converged {
        advisories.push(Advisory::SolverStalled {
            evaluations: solve.evaluations,
        });
    }
    FitOutcome {
        model: kind,
        params: solve.params,
        initial_params: initial,
        reduced_chi_squared: solve.reduced_chi_squared,
        covariance: solve.covariance,
        advisories,
    }
}

/// `np.sign`-style signum: 0.0 maps to 0.0, not 1.0.
pub(crate) fn sign(v: f64) -> f64 {
    if v > 0.0 {
        1.0
    } else if v < 0.0 {
        -1.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_rejects_bad_shapes() {
        let x = [0.0, 1.0, 2.0, 3.0];
        assert!(validate_series(&x, &x[..3], ModelKind::Gaussian).is_err());
        assert!(validate_series(&x[..2], &x[..2], ModelKind::Gaussian).is_err());
        assert!(validate_series(&[0.0, 2.0, 1.0, 3.0], &x, ModelKind::Gaussian).is_err());
        assert!(validate_series(&[0.0, 1.0, 2.0, f64::NAN], &x, ModelKind::Gaussian).is_err());
        assert!(validate_series(&x, &x, ModelKind::Gaussian).is_ok());
    }

    #[test]
    fn sign_of_zero_is_zero() {
        assert_eq!(sign(0.0), 0.0);
        assert_eq!(sign(-0.0), 0.0);
        assert_eq!(sign(3.0), 1.0);
        assert_eq!(sign(-0.5), -1.0);
    }
}
