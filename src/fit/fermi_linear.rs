//! Fermi-linear estimation and fitting (addition-line analysis).
//!
//! The signal is modeled as a Fermi step on a linear background. Estimation is
//! two-stage:
//!
//! 1. the linear background, from a trimmed-mean slope over windows at both
//!    ends of the sweep (the step lives in the middle)
//! 2. the step center and amplitude, from a derivative-of-Gaussian filter
//!    applied to the background-subtracted residual
//!
//! The fit refines all five parameters at once through either solver strategy.

use crate::domain::{
    AdditionLineFit, Advisory, FermiLinearFit, FittedCurves, ModelKind, SolverStrategy,
};
use crate::error::AppError;
use crate::fit::{outcome_from_solve, sign, validate_series};
use crate::math::{
    convolve_full, diff, fit_line, gaussian_derivative_filter, mean, std_dev, trimmed_mean,
};
use crate::models::fermi_linear;
use crate::solver::{Bound, solve_curve};

/// Initial guess for the Fermi-linear model:
/// `[slope, intercept, center, step_amplitude, temperature]`.
///
/// Returns the guess plus any advisories raised along the way (currently only
/// the step-direction consistency check, which warns but never alters the
/// estimate).
pub fn estimate_fermi_linear(x: &[f64], y: &[f64]) -> Result<(Vec<f64>, Vec<Advisory>), AppError> {
    validate_series(x, y, ModelKind::FermiLinear)?;

    let n = x.len();
    let window = n.div_ceil(5);

    if window < 4 {
        // Too few samples for the edge-window heuristic: plain OLS on the
        // head of the series, step amplitude seeded at zero.
        let head = n.min(100);
        let (slope, intercept) = fit_line(&x[..head], &y[..head])
            .ok_or_else(|| AppError::numerical("Degenerate linear background fit."))?;
        let guess = vec![slope, intercept, mean(x), 0.0, std_dev(x) / 10.0];
        return Ok((guess, Vec::new()));
    }

    // Stage 1: linear background from the edge windows.
    let (slope, intercept) = estimate_linear_background(x, y, window)?;

    // Stage 2: step center/amplitude on the background-subtracted residual.
    let residual: Vec<f64> = x
        .iter()
        .zip(y)
        .map(|(&xi, &yi)| yi - (slope * xi + intercept))
        .collect();
    let (center, amplitude, advisories) = estimate_step_center_amplitude(x, &residual);

    let temperature = std_dev(x) / 100.0;
    // The step biases the background level by half its height; remove it.
    let intercept = intercept - amplitude / 2.0;

    Ok((vec![slope, intercept, center, amplitude, temperature], advisories))
}

/// Trimmed-mean slope over windows at both ends of the sweep.
fn estimate_linear_background(x: &[f64], y: &[f64], window: usize) -> Result<(f64, f64), AppError> {
    let n = x.len();
    let mut dx = diff(&x[..window]);
    dx.extend(diff(&x[n - window..]));
    let spacing = mean(&dx);
    if !(spacing.is_finite() && spacing.abs() > f64::EPSILON) {
        return Err(AppError::numerical(
            "Edge windows have zero mean spacing; cannot estimate background slope.",
        ));
    }

    let mut dy = diff(&y[..window]);
    dy.extend(diff(&y[n - window..]));
    // Smooth before trimming so single-sample spikes do not survive the trim.
    let smoothed = convolve_full(&dy, &[1.0 / 3.0, 1.0 / 3.0, 1.0 / 3.0]);

    let slope = if smoothed.len() > 15 {
        trimmed_mean(&smoothed, smoothed.len() / 10) / spacing
    } else {
        mean(&smoothed) / spacing
    };

    let intercept = mean(y) - slope * mean(x);
    Ok((slope, intercept))
}

/// Locate the step in a background-subtracted residual.
///
/// The center is the x-value at the maximal absolute filtered derivative,
/// unless that index falls within the outer 1% of the series (an edge
/// artifact), in which case the mean of x is used. The amplitude comes from
/// the difference of the residual means on either side of a 10%-offset split.
fn estimate_step_center_amplitude(x: &[f64], residual: &[f64]) -> (f64, f64, Vec<Advisory>) {
    let n = x.len();
    let sigma = n as f64 / 250.0;
    let filtered = gaussian_derivative_filter(residual, sigma);

    // assume the step is steeper than any leftover overall slope
    let mut peak_index = 0;
    let mut peak_abs = f64::NEG_INFINITY;
    for (i, &v) in filtered.iter().enumerate() {
        if v.abs() > peak_abs {
            peak_abs = v.abs();
            peak_index = i;
        }
    }

    let edge = 0.01 * n as f64;
    let center = if (peak_index as f64) < edge || (peak_index as f64) > n as f64 - edge {
        mean(x)
    } else {
        x[peak_index]
    };

    let center_index = n / 2;
    let split_offset = n / 10;
    let mean_left = mean(&residual[..center_index.saturating_sub(split_offset)]);
    let mean_right = mean(&residual[(center_index + split_offset).min(n - 1)..]);
    let amplitude = -(mean_right - mean_left);

    let mut advisories = Vec::new();
    if sign(-filtered[peak_index]) != sign(amplitude) {
        advisories.push(Advisory::StepSignMismatch);
    }

    (center, amplitude, advisories)
}

/// Fit the Fermi-linear model.
///
/// `strategy` selects between the Levenberg-Marquardt backend and the damped
/// Gauss-Newton path; both consume the same initial guess and agree up to
/// solver tolerance. The temperature is lower-bounded at 0.
pub fn fit_fermi_linear(
    x: &[f64],
    y: &[f64],
    strategy: SolverStrategy,
    lever_arm: f64,
) -> Result<FermiLinearFit, AppError> {
    let kind = ModelKind::FermiLinear;
    validate_series(x, y, kind)?;
    if !(lever_arm.is_finite() && lever_arm != 0.0) {
        return Err(AppError::invalid_input("Lever arm must be finite and non-zero."));
    }

    let (initial, advisories) = estimate_fermi_linear(x, y)?;

    let f = move |xi: f64, p: &[f64]| fermi_linear(xi, p[0], p[1], p[2], p[3], p[4], lever_arm);
    let bounds = [Bound::at_least("temperature", 0.0)];
    let solved = solve_curve(strategy, kind, f, x, y, &initial, &bounds)?;

    let outcome = outcome_from_solve(kind, solved, initial, advisories);
    let center = outcome.params[2];
    Ok(FermiLinearFit {
        outcome,
        center,
        lever_arm,
    })
}

/// Fit the addition line and reduce the result to its step center.
///
/// With `trim_border` set, `max(min(n/40, 100), 1)` samples are removed from
/// both ends *before* estimation, since the estimation windows reference the
/// trimmed series. The returned packaging includes the fitted and
/// initial-guess curves on the trimmed grid.
pub fn fit_addition_line(
    x: &[f64],
    y: &[f64],
    trim_border: bool,
    strategy: SolverStrategy,
    lever_arm: f64,
) -> Result<AdditionLineFit, AppError> {
    if x.len() != y.len() {
        return Err(AppError::invalid_input(
            format!("Series length mismatch: x has {} samples, y has {}.", x.len(), y.len()),
        ));
    }

    // Input series are immutable; trimming works on copies.
    let (x, y): (Vec<f64>, Vec<f64>) = if trim_border {
        let cut = (x.len() / 40).min(100).max(1);
        if x.len() <= 2 * cut + ModelKind::FermiLinear.min_samples() {
            return Err(AppError::insufficient_data(
                format!("Series too short to trim {cut} border samples from each end."),
            ));
        }
        (x[cut..x.len() - cut].to_vec(), y[cut..y.len() - cut].to_vec())
    } else {
        (x.to_vec(), y.to_vec())
    };

    let fit = fit_fermi_linear(&x, &y, strategy, lever_arm)?;

    let eval = |params: &[f64]| -> Vec<f64> {
        x.iter()
            .map(|&xi| {
                fermi_linear(xi, params[0], params[1], params[2], params[3], params[4], lever_arm)
            })
            .collect()
    };
    let curves = FittedCurves {
        y_fit: eval(&fit.outcome.params),
        y_initial: eval(&fit.outcome.initial_params),
        x,
    };

    Ok(AdditionLineFit {
        center: fit.center,
        fit,
        curves,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DEFAULT_LEVER_ARM;
    use rand::prelude::*;
    use rand_distr::Normal;

    fn synthetic_step(
        n: usize,
        slope: f64,
        intercept: f64,
        center: f64,
        amplitude: f64,
        temperature: f64,
        noise: f64,
        seed: u64,
    ) -> (Vec<f64>, Vec<f64>) {
        let mut rng = StdRng::seed_from_u64(seed);
        let dist = Normal::new(0.0, noise.max(1e-12)).unwrap();
        let x: Vec<f64> = (0..n).map(|i| -2.0 + 4.0 * i as f64 / (n - 1) as f64).collect();
        let y: Vec<f64> = x
            .iter()
            .map(|&xi| {
                fermi_linear(xi, slope, intercept, center, amplitude, temperature, DEFAULT_LEVER_ARM)
                    + dist.sample(&mut rng)
            })
            .collect();
        (x, y)
    }

    #[test]
    fn estimate_locates_center_and_step() {
        let (x, y) = synthetic_step(500, 0.2, 0.1, 0.3, 1.0, 0.05, 0.0, 1);
        let (guess, advisories) = estimate_fermi_linear(&x, &y).unwrap();
        assert!((guess[0] - 0.2).abs() < 0.05, "slope guess {}", guess[0]);
        assert!((guess[2] - 0.3).abs() < 0.1, "center guess {}", guess[2]);
        assert!((guess[3] - 1.0).abs() < 0.3, "amplitude guess {}", guess[3]);
        assert!(guess[4] > 0.0);
        assert!(advisories.is_empty());
    }

    #[test]
    fn short_series_falls_back_to_plain_ols() {
        let x: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let y: Vec<f64> = x.iter().map(|&xi| 0.5 * xi + 1.0).collect();
        let (guess, _) = estimate_fermi_linear(&x, &y).unwrap();
        assert!((guess[0] - 0.5).abs() < 1e-6);
        assert!((guess[3]).abs() < 1e-12, "step amplitude seeded at zero");
    }

    #[test]
    fn both_strategies_recover_the_center() {
        let (x, y) = synthetic_step(500, 0.15, 0.2, 0.4, 0.8, 0.04, 0.005, 2);
        let spacing = x[1] - x[0];

        let lm = fit_fermi_linear(&x, &y, SolverStrategy::Lm, DEFAULT_LEVER_ARM).unwrap();
        let gn = fit_fermi_linear(&x, &y, SolverStrategy::GaussNewton, DEFAULT_LEVER_ARM).unwrap();

        assert!((lm.center - 0.4).abs() < spacing, "lm center {}", lm.center);
        assert!((gn.center - 0.4).abs() < spacing, "gn center {}", gn.center);
        assert!((lm.center - gn.center).abs() < spacing, "strategies disagree");
    }

    #[test]
    fn addition_line_trims_before_estimation() {
        let (x, y) = synthetic_step(600, 0.1, 0.0, -0.2, 0.6, 0.05, 0.0, 3);
        let fit = fit_addition_line(&x, &y, true, SolverStrategy::Lm, DEFAULT_LEVER_ARM).unwrap();

        let cut = (x.len() / 40).min(100).max(1);
        assert_eq!(fit.curves.x.len(), x.len() - 2 * cut);
        let spacing = x[1] - x[0];
        assert!((fit.center + 0.2).abs() < spacing, "center {}", fit.center);
        assert_eq!(fit.curves.y_fit.len(), fit.curves.x.len());
        assert_eq!(fit.curves.y_initial.len(), fit.curves.x.len());
    }

    #[test]
    fn trim_on_tiny_series_is_an_error() {
        let x = [0.0, 1.0, 2.0, 3.0, 4.0, 5.0];
        let y = [0.0; 6];
        assert!(fit_addition_line(&x, &y, true, SolverStrategy::Lm, DEFAULT_LEVER_ARM).is_err());
    }

    #[test]
    fn downward_step_amplitude_is_negative() {
        // fermi_linear adds `amplitude` on the *left* of the center, so a
        // signal that steps up rightwards needs a negative amplitude.
        let (x, y) = synthetic_step(400, 0.0, 0.0, 0.0, -0.5, 0.05, 0.0, 4);
        let (guess, advisories) = estimate_fermi_linear(&x, &y).unwrap();
        assert!(guess[3] < 0.0, "amplitude guess {}", guess[3]);
        assert!(advisories.is_empty(), "sign check should pass: {advisories:?}");
    }

    #[test]
    fn refit_from_fitted_parameters_is_idempotent() {
        let (x, y) = synthetic_step(500, 0.1, 0.3, 0.2, 0.7, 0.05, 0.01, 5);
        let first = fit_fermi_linear(&x, &y, SolverStrategy::Lm, DEFAULT_LEVER_ARM).unwrap();

        let f = |xi: f64, p: &[f64]| {
            fermi_linear(xi, p[0], p[1], p[2], p[3], p[4], DEFAULT_LEVER_ARM)
        };
        let bounds = [Bound::at_least("temperature", 0.0)];
        let again = solve_curve(
            SolverStrategy::Lm,
            ModelKind::FermiLinear,
            f,
            &x,
            &y,
            &first.outcome.params,
            &bounds,
        )
        .unwrap();
        assert!(again.reduced_chi_squared <= first.outcome.reduced_chi_squared * (1.0 + 1e-9));
    }
}
