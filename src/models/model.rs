//! Model evaluation for the four fitted families.
//!
//! The fitters rely on two primitive operations:
//! - evaluate `y(x)` for a parameter vector (residuals, Jacobians, plots)
//! - evaluate whole curves over an x grid (exports, overlays)
//!
//! Parameter slot order per family is defined by `ModelKind::param_names` in
//! `domain::types`; the functions here take the same order.

use crate::domain::ModelKind;

/// Lever arm baked into the Fermi-linear model when none is given explicitly.
///
/// The lever arm converts gate voltage to energy; 1.16 matches the measurement
/// setup this heuristic suite was calibrated against.
pub const DEFAULT_LEVER_ARM: f64 = 1.16;

/// Floor for the Fermi temperature denominator.
///
/// The solver keeps `T >= 0` via bounds; this guard only prevents a literal
/// division by zero at the boundary.
const TEMPERATURE_FLOOR: f64 = 1e-12;

/// Gaussian bell: `offset + amplitude * exp(-(x - mean)^2 / (2 sigma^2))`.
///
/// A vanishing sigma collapses the bell to its offset away from the mean,
/// which is the well-defined limit.
pub fn gaussian(x: f64, mean: f64, sigma: f64, amplitude: f64, offset: f64) -> f64 {
    if sigma == 0.0 {
        return if x == mean { offset + amplitude } else { offset };
    }
    let z = (x - mean) / sigma;
    offset + amplitude * (-0.5 * z * z).exp()
}

/// Fermi step: `amplitude / (exp((x - center) / T) + 1)`.
pub fn fermi(x: f64, center: f64, amplitude: f64, temperature: f64) -> f64 {
    let t = temperature.abs().max(TEMPERATURE_FLOOR);
    amplitude / (((x - center) / t).exp() + 1.0)
}

/// Fermi step on a linear background, with an explicit lever arm:
/// `slope*x + intercept + amplitude / (exp(lever_arm*(x - center) / T) + 1)`.
pub fn fermi_linear(
    x: f64,
    slope: f64,
    intercept: f64,
    center: f64,
    amplitude: f64,
    temperature: f64,
    lever_arm: f64,
) -> f64 {
    let t = temperature.abs().max(TEMPERATURE_FLOOR);
    slope * x + intercept + amplitude / ((lever_arm * (x - center) / t).exp() + 1.0)
}

/// Sinusoid: `amplitude * sin(2π * frequency * x + phase) + offset`.
pub fn sine(x: f64, amplitude: f64, frequency: f64, phase: f64, offset: f64) -> f64 {
    amplitude * (2.0 * std::f64::consts::PI * frequency * x + phase).sin() + offset
}

/// Predict `y(x)` for the given model kind and parameter vector.
///
/// The Fermi-linear family uses [`DEFAULT_LEVER_ARM`] here; fits with a custom
/// lever arm evaluate `fermi_linear` directly.
///
/// # Panics
/// Panics if `params` is shorter than `model.param_len()`. Callers size
/// parameter vectors through the schema table.
pub fn predict(model: ModelKind, x: f64, params: &[f64]) -> f64 {
    match model {
        ModelKind::Gaussian => gaussian(x, params[0], params[1], params[2], params[3]),
        ModelKind::GaussianNoOffset => gaussian(x, params[0], params[1], params[2], 0.0),
        ModelKind::DoubleGaussian => {
            gaussian(x, params[4], params[2], params[0], 0.0)
                + gaussian(x, params[5], params[3], params[1], 0.0)
        }
        ModelKind::Sine => sine(x, params[0], params[1], params[2], params[3]),
        ModelKind::FermiLinear => fermi_linear(
            x,
            params[0],
            params[1],
            params[2],
            params[3],
            params[4],
            DEFAULT_LEVER_ARM,
        ),
    }
}

/// Evaluate a whole curve over `x`.
pub fn predict_series(model: ModelKind, x: &[f64], params: &[f64]) -> Vec<f64> {
    x.iter().map(|&xi| predict(model, xi, params)).collect()
}
