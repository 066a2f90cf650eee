//! Export fit results to JSON.
//!
//! The export is meant to be easy to consume from notebooks or downstream
//! scripts: parameter values are keyed by schema name next to the raw vectors.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use serde::Serialize;

use crate::domain::{Advisory, FitOutcome, FittedCurves, ModelKind};
use crate::error::AppError;

/// Serialized form of a fit, with named parameters for readability.
#[derive(Debug, Serialize)]
pub struct ExportedFit<'a> {
    pub tool: &'static str,
    pub model: ModelKind,
    pub parameters: Vec<NamedParam>,
    pub initial_parameters: Vec<f64>,
    pub reduced_chi_squared: f64,
    pub covariance: Option<&'a [f64]>,
    pub advisories: &'a [Advisory],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub curves: Option<&'a FittedCurves>,
}

#[derive(Debug, Serialize)]
pub struct NamedParam {
    pub name: &'static str,
    pub value: f64,
    /// Variance of this parameter, when the solver estimated one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variance: Option<f64>,
}

/// Build the export view of a fit outcome.
pub fn export_view<'a>(
    outcome: &'a FitOutcome,
    curves: Option<&'a FittedCurves>,
) -> ExportedFit<'a> {
    let parameters = outcome
        .model
        .param_names()
        .iter()
        .enumerate()
        .map(|(i, &name)| NamedParam {
            name,
            value: outcome.params[i],
            variance: outcome.covariance.as_ref().map(|c| c[i]),
        })
        .collect();

    ExportedFit {
        tool: "pfit",
        model: outcome.model,
        parameters,
        initial_parameters: outcome.initial_params.clone(),
        reduced_chi_squared: outcome.reduced_chi_squared,
        covariance: outcome.covariance.as_deref(),
        advisories: &outcome.advisories,
        curves,
    }
}

/// Write a fit outcome (and optional curves) to a JSON file.
pub fn write_fit_json(
    path: &Path,
    outcome: &FitOutcome,
    curves: Option<&FittedCurves>,
) -> Result<(), AppError> {
    let view = export_view(outcome, curves);
    let json = serde_json::to_string_pretty(&view)
        .map_err(|e| AppError::numerical(format!("Failed to serialize fit result: {e}")))?;

    let mut file = File::create(path)
        .map_err(|e| AppError::invalid_input(format!("Failed to create '{}': {e}", path.display())))?;
    file.write_all(json.as_bytes())
        .map_err(|e| AppError::invalid_input(format!("Failed to write '{}': {e}", path.display())))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn export_view_names_every_parameter() {
        let outcome = FitOutcome {
            model: ModelKind::Sine,
            params: vec![1.0, 2.0, 3.0, 4.0],
            initial_params: vec![0.9, 2.1, 2.9, 4.1],
            reduced_chi_squared: 0.01,
            covariance: Some(vec![0.1, 0.2, 0.3, 0.4]),
            advisories: Vec::new(),
        };
        let view = export_view(&outcome, None);
        assert_eq!(view.parameters.len(), 4);
        assert_eq!(view.parameters[1].name, "frequency");
        assert_eq!(view.parameters[1].value, 2.0);
        assert_eq!(view.parameters[1].variance, Some(0.2));

        let json = serde_json::to_string(&view).unwrap();
        assert!(json.contains("\"frequency\""));
        assert!(json.contains("reduced_chi_squared"));
    }
}
