//! Reporting utilities: residual statistics and formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the math/fitting code stays clean and testable
//! - output changes are localized (important for future snapshot tests)

pub mod format;

pub use format::*;

use crate::domain::FitOutcome;
use crate::error::AppError;
use crate::models::predict;

/// Residual summary for a fitted trace.
#[derive(Debug, Clone)]
pub struct ResidualStats {
    pub n: usize,
    pub rmse: f64,
    pub max_abs: f64,
}

/// Compute fitted-vs-observed residual statistics.
pub fn residual_stats(x: &[f64], y: &[f64], outcome: &FitOutcome) -> Result<ResidualStats, AppError> {
    let mut sse = 0.0;
    let mut max_abs: f64 = 0.0;
    for (&xi, &yi) in x.iter().zip(y) {
        let y_fit = predict(outcome.model, xi, &outcome.params);
        if !y_fit.is_finite() {
            return Err(AppError::numerical("Non-finite model prediction during residual computation."));
        }
        let r = yi - y_fit;
        sse += r * r;
        max_abs = max_abs.max(r.abs());
    }
    let n = x.len();
    let rmse = if n > 0 { (sse / n as f64).sqrt() } else { 0.0 };
    Ok(ResidualStats { n, rmse, max_abs })
}

/// Residual statistics from precomputed fitted values.
pub fn residual_stats_from_series(y_obs: &[f64], y_fit: &[f64]) -> ResidualStats {
    let mut sse = 0.0;
    let mut max_abs: f64 = 0.0;
    for (&yi, &fi) in y_obs.iter().zip(y_fit) {
        let r = yi - fi;
        sse += r * r;
        max_abs = max_abs.max(r.abs());
    }
    let n = y_obs.len().min(y_fit.len());
    let rmse = if n > 0 { (sse / n as f64).sqrt() } else { 0.0 };
    ResidualStats { n, rmse, max_abs }
}
