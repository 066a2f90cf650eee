//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during fitting
//! - exported to JSON for downstream analysis
//! - printed by the terminal report

use std::path::PathBuf;

use clap::ValueEnum;
use serde::Serialize;

/// Model family selected on the command line.
///
/// This is the user-facing selector; it resolves to a concrete [`ModelKind`]
/// once fit options (e.g. `--no-offset`) are known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ModelChoice {
    Gaussian,
    DoubleGaussian,
    Sine,
    FermiLinear,
}

/// Concrete fitted model kind.
///
/// `GaussianNoOffset` is the three-parameter variant used when the caller
/// declines the offset slot; it is a distinct kind so parameter schemas stay
/// fixed-length per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    Gaussian,
    GaussianNoOffset,
    DoubleGaussian,
    Sine,
    FermiLinear,
}

impl ModelKind {
    /// Human-readable label for terminal output.
    pub fn display_name(self) -> &'static str {
        match self {
            ModelKind::Gaussian => "Gaussian",
            ModelKind::GaussianNoOffset => "Gaussian (no offset)",
            ModelKind::DoubleGaussian => "Double Gaussian",
            ModelKind::Sine => "Sine",
            ModelKind::FermiLinear => "Fermi + linear",
        }
    }

    /// Ordered parameter names for this kind.
    ///
    /// This is the single source of truth for slot order. Bounds are declared
    /// by name and resolved to indices through this table, so nothing relies
    /// on incidental ordering elsewhere.
    pub fn param_names(self) -> &'static [&'static str] {
        match self {
            ModelKind::Gaussian => &["mean", "sigma", "amplitude", "offset"],
            ModelKind::GaussianNoOffset => &["mean", "sigma", "amplitude"],
            ModelKind::DoubleGaussian => &[
                "amplitude_low",
                "amplitude_high",
                "sigma_low",
                "sigma_high",
                "mean_low",
                "mean_high",
            ],
            ModelKind::Sine => &["amplitude", "frequency", "phase", "offset"],
            ModelKind::FermiLinear => {
                &["slope", "intercept", "center", "step_amplitude", "temperature"]
            }
        }
    }

    /// Number of fitted parameters.
    pub fn param_len(self) -> usize {
        self.param_names().len()
    }

    /// Index of a named parameter slot.
    pub fn param_index(self, name: &str) -> Option<usize> {
        self.param_names().iter().position(|&n| n == name)
    }

    /// Minimum series length required to attempt a fit of this kind.
    pub fn min_samples(self) -> usize {
        match self {
            ModelKind::Gaussian | ModelKind::GaussianNoOffset => 4,
            // the split-half estimator needs a few samples on each side
            ModelKind::DoubleGaussian => 8,
            ModelKind::Sine => 4,
            ModelKind::FermiLinear => 4,
        }
    }
}

/// How the double-Gaussian estimator separates the two populations.
///
/// The historical behavior splits the series at its midpoint *index*, which
/// assumes the two populations are roughly separated in acquisition order.
/// That assumption is a property of the measurement procedure, not of the
/// data, so it is exposed here instead of being buried in slicing code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SplitPolicy {
    /// Split at the midpoint index (acquisition-order separability).
    Index,
    /// Split where x crosses the midpoint of its range.
    Value,
}

/// Which initial-guess variant the double-Gaussian estimator uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum EstimateMode {
    /// Closed-form guess: sigma as a fixed fraction of the x-range, means at
    /// fixed offsets inside the range.
    Fast,
    /// Area-based guess: sigma from the integral of y (Gaussian-area
    /// identity), mean as the y-weighted centroid.
    Integral,
}

/// Nonlinear refinement strategy for the Fermi-linear fit.
///
/// Both strategies consume the same initial parameter vector and agree up to
/// solver tolerance; they exist because the damped Gauss-Newton path has no
/// external backend while the Levenberg-Marquardt path supports bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SolverStrategy {
    /// Levenberg-Marquardt via the `levenberg-marquardt` crate.
    Lm,
    /// Damped Gauss-Newton on SVD linear solves.
    GaussNewton,
}

/// Advisory raised during estimation or fitting.
///
/// Advisories are attached to the [`FitOutcome`] instead of being written to a
/// global warning stream, so callers (and tests) can inspect them
/// deterministically. They never abort a fit.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Advisory {
    /// The sign of the detected slope peak disagrees with the sign of the
    /// computed step amplitude; the step size may be incorrect.
    StepSignMismatch,
    /// The signal is constant; the estimate degenerates to amplitude 0 and
    /// the fit is defined but uninformative.
    FlatSignal,
    /// The solver stopped on its iteration budget rather than a convergence
    /// criterion; the best parameters found are still returned.
    SolverStalled { evaluations: usize },
}

impl std::fmt::Display for Advisory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Advisory::StepSignMismatch => {
                write!(f, "step amplitude sign disagrees with detected slope peak")
            }
            Advisory::FlatSignal => write!(f, "signal is constant; fit is degenerate"),
            Advisory::SolverStalled { evaluations } => {
                write!(f, "solver stopped on iteration budget ({evaluations} evaluations)")
            }
        }
    }
}

/// Normalized result of a single fit call.
///
/// Created once per fit and never mutated afterwards; the double-Gaussian
/// refit heuristic may replace a result wholesale but never edits one.
#[derive(Debug, Clone, Serialize)]
pub struct FitOutcome {
    pub model: ModelKind,
    /// Refined parameters, slot order per `model.param_names()`.
    pub params: Vec<f64>,
    /// Initial guess the solver started from (same slot order).
    pub initial_params: Vec<f64>,
    /// Reduced chi-squared of the fit (lower is better).
    pub reduced_chi_squared: f64,
    /// Per-parameter variance (diagonal of the scaled covariance), when the
    /// solver could estimate it.
    pub covariance: Option<Vec<f64>>,
    /// Non-fatal diagnostics collected along the way.
    pub advisories: Vec<Advisory>,
}

impl FitOutcome {
    /// Look up a fitted parameter by schema name.
    pub fn param(&self, name: &str) -> Option<f64> {
        self.model.param_index(name).map(|i| self.params[i])
    }
}

/// One Gaussian peak viewed as `(mean, sigma, amplitude)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PeakParams {
    pub mean: f64,
    pub sigma: f64,
    pub amplitude: f64,
}

/// Double-Gaussian fit with its derived separation quantities.
///
/// Invariant: the low slots hold the peak with the smaller mean (enforced by a
/// whole-triple swap after the solver returns).
#[derive(Debug, Clone, Serialize)]
pub struct DoubleGaussianFit {
    pub outcome: FitOutcome,
    /// Distance between the two means measured in summed sigmas.
    pub separation: f64,
    /// Point between the peaks that separates the two levels, weighted toward
    /// the peak with the larger spread.
    pub split: f64,
}

impl DoubleGaussianFit {
    /// The peak with the smaller mean.
    pub fn low(&self) -> PeakParams {
        let p = &self.outcome.params;
        PeakParams {
            mean: p[4],
            sigma: p[2],
            amplitude: p[0],
        }
    }

    /// The peak with the larger mean.
    pub fn high(&self) -> PeakParams {
        let p = &self.outcome.params;
        PeakParams {
            mean: p[5],
            sigma: p[3],
            amplitude: p[1],
        }
    }
}

/// Fermi-linear fit with its derived step center.
#[derive(Debug, Clone, Serialize)]
pub struct FermiLinearFit {
    pub outcome: FitOutcome,
    /// Fitted x-position of the step transition (the addition line).
    pub center: f64,
    /// Lever arm the model was evaluated with.
    pub lever_arm: f64,
}

/// Fitted and initial-guess curves sampled on the (possibly trimmed) x grid.
///
/// Convenience packaging for downstream consumers (plots, exports); carries no
/// information the fit itself depends on.
#[derive(Debug, Clone, Serialize)]
pub struct FittedCurves {
    pub x: Vec<f64>,
    pub y_fit: Vec<f64>,
    pub y_initial: Vec<f64>,
}

/// Addition-line fit: the scalar of interest plus the full fit behind it.
#[derive(Debug, Clone, Serialize)]
pub struct AdditionLineFit {
    /// x-value of the middle of the addition line.
    pub center: f64,
    pub fit: FermiLinearFit,
    pub curves: FittedCurves,
}

/// A full run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus defaults).
#[derive(Debug, Clone)]
pub struct FitConfig {
    pub inputs: Vec<PathBuf>,
    pub model: ModelChoice,

    /// Gaussian: include the offset slot.
    pub include_offset: bool,
    /// Sine: constrain the amplitude to be non-negative.
    pub positive_amplitude: bool,

    /// Double Gaussian: estimator variant and split policy.
    pub estimate_mode: EstimateMode,
    pub split_policy: SplitPolicy,
    /// Double Gaussian: run the asymmetric-amplitude refit pass.
    pub refit: bool,
    /// Amplitude ratio above which the refit pass re-estimates the small peak.
    pub refit_ratio: f64,

    /// Fermi-linear: refinement strategy and lever arm.
    pub strategy: SolverStrategy,
    pub lever_arm: f64,
    /// Fermi-linear: trim the border samples before estimation and fitting.
    pub trim_border: bool,

    pub plot: bool,
    pub plot_width: usize,
    pub plot_height: usize,
    pub export: Option<PathBuf>,
}
