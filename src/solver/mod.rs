//! Nonlinear least-squares solver adapters.
//!
//! The estimation code talks to solvers through one narrow contract:
//!
//! ```text
//! solve_curve(strategy, kind, model_fn, x, y, initial, bounds) -> SolveOutput
//! ```
//!
//! Two interchangeable strategies implement it:
//!
//! - `lm`: the `levenberg-marquardt` crate (library-based)
//! - `gauss_newton`: damped Gauss-Newton on SVD linear solves (gradient-based)
//!
//! Bounds are declared by parameter *name* and resolved to slot indices via
//! the per-model schema table, so the contract never depends on incidental
//! ordering. Both strategies enforce bounds by projection.

pub mod gauss_newton;
pub mod lm;

use nalgebra::{DMatrix, DVector};

use crate::domain::ModelKind;
use crate::domain::SolverStrategy;
use crate::error::AppError;

/// A named box constraint on one parameter.
#[derive(Debug, Clone, Copy)]
pub struct Bound {
    pub name: &'static str,
    pub lower: f64,
    pub upper: f64,
}

impl Bound {
    /// Lower bound only.
    pub fn at_least(name: &'static str, lower: f64) -> Self {
        Self {
            name,
            lower,
            upper: f64::INFINITY,
        }
    }

    /// Two-sided bound.
    pub fn within(name: &'static str, lower: f64, upper: f64) -> Self {
        Self { name, lower, upper }
    }
}

/// Raw solver output, before normalization into a `FitOutcome`.
#[derive(Debug, Clone)]
pub struct SolveOutput {
    pub params: Vec<f64>,
    pub reduced_chi_squared: f64,
    /// Per-parameter variance (diagonal of the redchi-scaled covariance).
    pub covariance: Option<Vec<f64>>,
    /// False when the solver stopped on its iteration budget.
    pub converged: bool,
    pub evaluations: usize,
}

/// Run one fit through the selected strategy.
pub fn solve_curve<F>(
    strategy: SolverStrategy,
    kind: ModelKind,
    f: F,
    x: &[f64],
    y: &[f64],
    initial: &[f64],
    bounds: &[Bound],
) -> Result<SolveOutput, AppError>
where
    F: Fn(f64, &[f64]) -> f64,
{
    if x.len() != y.len() {
        return Err(AppError::invalid_input("Solver inputs x and y differ in length."));
    }
    if x.is_empty() {
        return Err(AppError::insufficient_data("Solver received an empty series."));
    }
    if initial.len() != kind.param_len() {
        return Err(AppError::invalid_input(
            format!(
                "Initial parameter vector has length {} but {} expects {}.",
                initial.len(),
                kind.display_name(),
                kind.param_len()
            ),
        ));
    }

    let (lower, upper) = resolve_bounds(kind, bounds)?;

    match strategy {
        SolverStrategy::Lm => lm::solve(&f, x, y, initial, &lower, &upper),
        SolverStrategy::GaussNewton => gauss_newton::solve(&f, x, y, initial, &lower, &upper),
    }
}

/// Resolve named bounds into per-slot lower/upper vectors.
fn resolve_bounds(kind: ModelKind, bounds: &[Bound]) -> Result<(Vec<f64>, Vec<f64>), AppError> {
    let mut lower = vec![f64::NEG_INFINITY; kind.param_len()];
    let mut upper = vec![f64::INFINITY; kind.param_len()];
    for b in bounds {
        let Some(idx) = kind.param_index(b.name) else {
            return Err(AppError::invalid_input(
                format!("Unknown parameter '{}' in bound for {}.", b.name, kind.display_name()),
            ));
        };
        if !(b.lower <= b.upper) {
            return Err(AppError::invalid_input(
                format!("Empty bound interval for parameter '{}'.", b.name),
            ));
        }
        lower[idx] = b.lower;
        upper[idx] = b.upper;
    }
    Ok((lower, upper))
}

/// Project parameters into their box constraints, in place.
pub(crate) fn clamp_to_bounds(params: &mut [f64], lower: &[f64], upper: &[f64]) {
    for ((p, &lo), &hi) in params.iter_mut().zip(lower).zip(upper) {
        *p = p.clamp(lo, hi);
    }
}

/// Residual vector `f(x; params) - y`.
pub(crate) fn residual_vector<F>(f: &F, x: &[f64], y: &[f64], params: &[f64]) -> DVector<f64>
where
    F: Fn(f64, &[f64]) -> f64,
{
    DVector::from_iterator(x.len(), x.iter().zip(y).map(|(&xi, &yi)| f(xi, params) - yi))
}

/// Central-difference Jacobian of the model with respect to the parameters.
pub(crate) fn numeric_jacobian<F>(f: &F, x: &[f64], params: &[f64]) -> DMatrix<f64>
where
    F: Fn(f64, &[f64]) -> f64,
{
    let n = x.len();
    let p = params.len();
    let mut jac = DMatrix::zeros(n, p);
    let mut work = params.to_vec();
    for j in 0..p {
        let h = 1e-6 * params[j].abs().max(1e-3);
        work[j] = params[j] + h;
        let plus: Vec<f64> = x.iter().map(|&xi| f(xi, &work)).collect();
        work[j] = params[j] - h;
        let minus: Vec<f64> = x.iter().map(|&xi| f(xi, &work)).collect();
        work[j] = params[j];
        for i in 0..n {
            jac[(i, j)] = (plus[i] - minus[i]) / (2.0 * h);
        }
    }
    jac
}

/// Reduced chi-squared from a residual sum of squares.
pub(crate) fn reduced_chi_squared(ssr: f64, n: usize, p: usize) -> f64 {
    let dof = n.saturating_sub(p).max(1);
    ssr / dof as f64
}

/// Diagonal of the covariance estimate `redchi * (JᵀJ)⁻¹` at the solution.
///
/// Returns `None` when `JᵀJ` is not invertible (the solver could not estimate
/// parameter uncertainties).
pub(crate) fn covariance_diagonal<F>(
    f: &F,
    x: &[f64],
    params: &[f64],
    redchi: f64,
) -> Option<Vec<f64>>
where
    F: Fn(f64, &[f64]) -> f64,
{
    let jac = numeric_jacobian(f, x, params);
    let jtj = jac.transpose() * &jac;
    let inv = jtj.try_inverse()?;
    let diag: Vec<f64> = (0..params.len()).map(|i| inv[(i, i)] * redchi).collect();
    if diag.iter().all(|v| v.is_finite()) {
        Some(diag)
    } else {
        None
    }
}
