use crate::domain::{AdditionLineFit, DoubleGaussianFit, FitOutcome};
use crate::report::ResidualStats;

/// Format the full fit summary (parameters + diagnostics + advisories).
pub fn format_fit_summary(label: &str, outcome: &FitOutcome, stats: &ResidualStats) -> String {
    let mut out = String::new();

    out.push_str(&format!("=== pfit - {} fit ===\n", outcome.model.display_name()));
    out.push_str(&format!("Trace: {label}\n"));
    out.push_str(&format!("Points: n={}\n", stats.n));

    out.push_str("\nParameters:\n");
    out.push_str(&format_param_table(outcome));

    out.push_str("\nDiagnostics:\n");
    out.push_str(&format!(
        "- reduced chi-squared: {:.6e}\n",
        outcome.reduced_chi_squared
    ));
    out.push_str(&format!("- RMSE: {:.6e}\n", stats.rmse));
    out.push_str(&format!("- max |residual|: {:.6e}\n", stats.max_abs));

    if !outcome.advisories.is_empty() {
        out.push_str("\nAdvisories:\n");
        for advisory in &outcome.advisories {
            out.push_str(&format!("- {advisory}\n"));
        }
    }

    out
}

/// Extra lines for a double-Gaussian result (derived quantities).
pub fn format_double_gaussian_extras(fit: &DoubleGaussianFit) -> String {
    let low = fit.low();
    let high = fit.high();
    let mut out = String::new();
    out.push_str("\nPeaks:\n");
    out.push_str(&format!(
        "- low : mean={:.6} sigma={:.6} amplitude={:.6}\n",
        low.mean, low.sigma, low.amplitude
    ));
    out.push_str(&format!(
        "- high: mean={:.6} sigma={:.6} amplitude={:.6}\n",
        high.mean, high.sigma, high.amplitude
    ));
    out.push_str(&format!("- separation: {:.6}\n", fit.separation));
    out.push_str(&format!("- split: {:.6}\n", fit.split));
    out
}

/// Extra lines for an addition-line result.
pub fn format_addition_line_extras(fit: &AdditionLineFit) -> String {
    let mut out = String::new();
    out.push_str("\nTransition:\n");
    out.push_str(&format!("- center: {:.6}\n", fit.center));
    out.push_str(&format!("- lever arm: {:.6}\n", fit.fit.lever_arm));
    out
}

fn format_param_table(outcome: &FitOutcome) -> String {
    let mut out = String::new();
    out.push_str(
        format!(
            "{:<14} {:>14} {:>14} {:>14}\n",
            "name", "value", "initial", "stderr"
        )
        .trim_end(),
    );
    out.push('\n');
    out.push_str(
        format!("{:-<14} {:-<14} {:-<14} {:-<14}\n", "", "", "", "").trim_end(),
    );
    out.push('\n');

    for (i, name) in outcome.model.param_names().iter().enumerate() {
        let stderr = outcome
            .covariance
            .as_ref()
            .and_then(|cov| cov.get(i))
            .map(|&v| format!("{:>14.6}", v.max(0.0).sqrt()))
            .unwrap_or_else(|| format!("{:>14}", "n/a"));
        out.push_str(
            format!(
                "{:<14} {:>14.6} {:>14.6} {stderr}\n",
                name, outcome.params[i], outcome.initial_params[i]
            )
            .trim_end(),
        );
        out.push('\n');
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Advisory, ModelKind};
    use crate::report::ResidualStats;

    fn outcome() -> FitOutcome {
        FitOutcome {
            model: ModelKind::Gaussian,
            params: vec![1.0, 1.5, 5.0, 0.5],
            initial_params: vec![0.9, 1.4, 4.8, 0.4],
            reduced_chi_squared: 0.01,
            covariance: Some(vec![0.04, 0.01, 0.09, 0.0025]),
            advisories: vec![Advisory::FlatSignal],
        }
    }

    #[test]
    fn summary_lists_every_parameter() {
        let stats = ResidualStats { n: 100, rmse: 0.1, max_abs: 0.3 };
        let text = format_fit_summary("demo", &outcome(), &stats);
        for name in ModelKind::Gaussian.param_names() {
            assert!(text.contains(name), "missing {name}");
        }
        assert!(text.contains("Advisories:"));
    }

    #[test]
    fn missing_covariance_renders_na() {
        let mut o = outcome();
        o.covariance = None;
        let stats = ResidualStats { n: 10, rmse: 0.0, max_abs: 0.0 };
        let text = format_fit_summary("demo", &o, &stats);
        assert!(text.contains("n/a"));
    }
}
