//! Sine estimation and fitting.

use crate::domain::{Advisory, FitOutcome, ModelKind, SolverStrategy};
use crate::error::AppError;
use crate::fit::{outcome_from_solve, validate_series};
use crate::math::{diff, dominant_frequency, mean};
use crate::models::sine;
use crate::solver::{Bound, solve_curve};

/// Initial guess for a sinusoid: `[amplitude, frequency, phase, offset]`.
///
/// The frequency comes from the dominant-frequency estimator applied to y with
/// the DC component removed, using the sample rate implied by the mean x
/// spacing. The phase aligns the estimated peak with the sine's natural
/// maximum: `pi/2 - 2 pi f x[argmax y]`.
///
/// The series is validated up front, so calling this directly on an empty or
/// undersized series reports the usual descriptive error instead of panicking.
pub fn estimate_sine(x: &[f64], y: &[f64]) -> Result<Vec<f64>, AppError> {
    validate_series(x, y, ModelKind::Sine)?;

    let mut y_max = f64::NEG_INFINITY;
    let mut y_min = f64::INFINITY;
    let mut x_at_max = x[0];
    for (&xi, &yi) in x.iter().zip(y) {
        if yi > y_max {
            y_max = yi;
            x_at_max = xi;
        }
        y_min = y_min.min(yi);
    }

    let amplitude = (y_max - y_min) / 2.0;
    let offset = mean(y);

    let spacing = mean(&diff(x));
    let frequency = if spacing > 0.0 {
        dominant_frequency(y, 1.0 / spacing, true)
    } else {
        0.0
    };
    let phase = std::f64::consts::FRAC_PI_2 - 2.0 * std::f64::consts::PI * frequency * x_at_max;

    Ok(vec![amplitude, frequency, phase, offset])
}

/// Fit a sine wave.
///
/// `positive_amplitude` adds a non-negativity bound on the amplitude (the
/// phase slot absorbs the sign instead).
pub fn fit_sine(
    x: &[f64],
    y: &[f64],
    initial: Option<&[f64]>,
    positive_amplitude: bool,
) -> Result<FitOutcome, AppError> {
    let kind = ModelKind::Sine;
    validate_series(x, y, kind)?;

    let initial = match initial {
        Some(p) => p.to_vec(),
        None => estimate_sine(x, y)?,
    };

    let mut advisories = Vec::new();
    if y.iter().all(|&v| v == y[0]) {
        advisories.push(Advisory::FlatSignal);
    }

    let f = |xi: f64, p: &[f64]| sine(xi, p[0], p[1], p[2], p[3]);
    let mut bounds = Vec::new();
    if positive_amplitude {
        bounds.push(Bound::at_least("amplitude", 0.0));
    }
    let solved = solve_curve(SolverStrategy::Lm, kind, f, x, y, &initial, &bounds)?;

    Ok(outcome_from_solve(kind, solved, initial, advisories))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::prelude::*;
    use rand_distr::Normal;
    use std::f64::consts::PI;

    fn synthetic_sine(
        amplitude: f64,
        frequency: f64,
        phase: f64,
        offset: f64,
        noise: f64,
    ) -> (Vec<f64>, Vec<f64>) {
        let mut rng = StdRng::seed_from_u64(17);
        let dist = Normal::new(0.0, noise.max(1e-12)).unwrap();
        let x: Vec<f64> = (0..800).map(|i| i as f64 * 0.01).collect();
        let y: Vec<f64> = x
            .iter()
            .map(|&xi| sine(xi, amplitude, frequency, phase, offset) + dist.sample(&mut rng))
            .collect();
        (x, y)
    }

    #[test]
    fn estimate_finds_frequency_and_amplitude() {
        let (x, y) = synthetic_sine(2.0, 1.5, 0.4, 1.0, 0.0);
        let guess = estimate_sine(&x, &y).unwrap();
        assert!((guess[0] - 2.0).abs() < 0.2, "amplitude {}", guess[0]);
        assert!((guess[1] - 1.5).abs() < 0.2, "frequency {}", guess[1]);
        assert!((guess[3] - 1.0).abs() < 0.2, "offset {}", guess[3]);
    }

    #[test]
    fn estimate_rejects_empty_series() {
        let err = estimate_sine(&[], &[]).unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn fit_recovers_parameters() {
        let (x, y) = synthetic_sine(1.5, 2.0, 0.3, -0.5, 0.05);
        let fit = fit_sine(&x, &y, None, true).unwrap();
        assert!((fit.param("amplitude").unwrap() - 1.5).abs() < 0.05);
        assert!((fit.param("frequency").unwrap() - 2.0).abs() < 0.02);
        assert!((fit.param("offset").unwrap() + 0.5).abs() < 0.05);
        // phase agreement modulo 2 pi
        let dphase = (fit.param("phase").unwrap() - 0.3).rem_euclid(2.0 * PI);
        assert!(dphase < 0.1 || dphase > 2.0 * PI - 0.1, "phase delta {dphase}");
    }

    #[test]
    fn positive_amplitude_bound_is_respected() {
        let (x, y) = synthetic_sine(1.0, 1.0, 0.0, 0.0, 0.0);
        let fit = fit_sine(&x, &y, None, true).unwrap();
        assert!(fit.param("amplitude").unwrap() >= 0.0);
    }
}
