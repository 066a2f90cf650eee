//! Single-Gaussian estimation and fitting.

use crate::domain::{Advisory, FitOutcome, ModelKind};
use crate::error::AppError;
use crate::fit::{outcome_from_solve, validate_series};
use crate::math::percentile;
use crate::models::gaussian;
use crate::solver::{Bound, solve_curve};

/// Initial guess for a single Gaussian.
///
/// Heuristics:
/// - sigma from `(P98(x) - P2(x)) / 20`, a range proxy insensitive to a few
///   outliers at the sweep extremes
/// - mean at the sample of maximal y
/// - amplitude from the y-range (or the y-maximum when no offset slot exists)
///
/// A constant signal yields a zero-amplitude guess; the downstream fit is then
/// valid but uninformative, which is the documented behavior rather than an
/// error. The series is validated up front so a caller probing a guess on a
/// malformed series gets the same error the full fit would give.
pub fn estimate_gaussian(
    x: &[f64],
    y: &[f64],
    include_offset: bool,
) -> Result<Vec<f64>, AppError> {
    let kind = if include_offset {
        ModelKind::Gaussian
    } else {
        ModelKind::GaussianNoOffset
    };
    validate_series(x, y, kind)?;

    let sigma = (percentile(x, 98.0) - percentile(x, 2.0)) / 20.0;

    let mut y_max = f64::NEG_INFINITY;
    let mut y_min = f64::INFINITY;
    let mut mean = 0.0;
    for (&xi, &yi) in x.iter().zip(y) {
        if yi > y_max {
            y_max = yi;
            mean = xi;
        }
        y_min = y_min.min(yi);
    }

    if include_offset {
        Ok(vec![mean, sigma, y_max - y_min, y_min])
    } else {
        Ok(vec![mean, sigma, y_max])
    }
}

/// Fit a single Gaussian.
///
/// When `initial` is `None` the guess comes from [`estimate_gaussian`]. The
/// amplitude is lower-bounded at 0 in the solver.
pub fn fit_gaussian(
    x: &[f64],
    y: &[f64],
    initial: Option<&[f64]>,
    include_offset: bool,
) -> Result<FitOutcome, AppError> {
    let kind = if include_offset {
        ModelKind::Gaussian
    } else {
        ModelKind::GaussianNoOffset
    };
    validate_series(x, y, kind)?;

    let initial = match initial {
        Some(p) => p.to_vec(),
        None => estimate_gaussian(x, y, include_offset)?,
    };

    let mut advisories = Vec::new();
    if y.iter().all(|&v| v == y[0]) {
        advisories.push(Advisory::FlatSignal);
    }

    let f = move |xi: f64, p: &[f64]| {
        let offset = if include_offset { p[3] } else { 0.0 };
        gaussian(xi, p[0], p[1], p[2], offset)
    };
    let bounds = [Bound::at_least("amplitude", 0.0)];
    let solved = solve_curve(
        crate::domain::SolverStrategy::Lm,
        kind,
        f,
        x,
        y,
        &initial,
        &bounds,
    )?;

    Ok(outcome_from_solve(kind, solved, initial, advisories))
}
