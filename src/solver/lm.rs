//! Levenberg-Marquardt strategy (library-based).
//!
//! Wraps the `levenberg-marquardt` crate behind the solver contract. The crate
//! has no native box constraints, so bounds are enforced by projection inside
//! `set_params`; for the gentle constraints used here (non-negative
//! amplitudes, means inside an expanded x-range) this converges to the same
//! point as a constrained solve.

use levenberg_marquardt::{LeastSquaresProblem, LevenbergMarquardt, TerminationReason};
use nalgebra::storage::Owned;
use nalgebra::{DMatrix, DVector, Dyn};

use crate::error::AppError;
use crate::solver::{
    SolveOutput, clamp_to_bounds, covariance_diagonal, numeric_jacobian, reduced_chi_squared,
    residual_vector,
};

struct CurveProblem<'a, F> {
    f: &'a F,
    x: &'a [f64],
    y: &'a [f64],
    lower: &'a [f64],
    upper: &'a [f64],
    params: Vec<f64>,
}

impl<'a, F> LeastSquaresProblem<f64, Dyn, Dyn> for CurveProblem<'a, F>
where
    F: Fn(f64, &[f64]) -> f64,
{
    type ResidualStorage = Owned<f64, Dyn>;
    type JacobianStorage = Owned<f64, Dyn, Dyn>;
    type ParameterStorage = Owned<f64, Dyn>;

    fn set_params(&mut self, params: &DVector<f64>) {
        self.params.copy_from_slice(params.as_slice());
        clamp_to_bounds(&mut self.params, self.lower, self.upper);
    }

    fn params(&self) -> DVector<f64> {
        DVector::from_column_slice(&self.params)
    }

    fn residuals(&self) -> Option<DVector<f64>> {
        let r = residual_vector(self.f, self.x, self.y, &self.params);
        if r.iter().all(|v| v.is_finite()) {
            Some(r)
        } else {
            None
        }
    }

    fn jacobian(&self) -> Option<DMatrix<f64>> {
        let jac = numeric_jacobian(self.f, self.x, &self.params);
        if jac.iter().all(|v| v.is_finite()) {
            Some(jac)
        } else {
            None
        }
    }
}

/// Solve through the `levenberg-marquardt` crate.
pub fn solve<F>(
    f: &F,
    x: &[f64],
    y: &[f64],
    initial: &[f64],
    lower: &[f64],
    upper: &[f64],
) -> Result<SolveOutput, AppError>
where
    F: Fn(f64, &[f64]) -> f64,
{
    let mut start = initial.to_vec();
    clamp_to_bounds(&mut start, lower, upper);

    let problem = CurveProblem {
        f,
        x,
        y,
        lower,
        upper,
        params: start,
    };

    let (problem, report) = LevenbergMarquardt::new().minimize(problem);

    let converged = if report.termination.was_successful()
        || matches!(report.termination, TerminationReason::NoImprovementPossible(_))
    {
        true
    } else if matches!(report.termination, TerminationReason::LostPatience) {
        // Iteration budget exhausted: the best point found is still a valid
        // (if unconverged) fit, mirroring how model-fitting libraries report
        // rather than raise in this situation.
        false
    } else {
        return Err(AppError::numerical(
            format!("Nonlinear solver failed: {:?}", report.termination),
        ));
    };

    let params = problem.params;
    if params.iter().any(|v| !v.is_finite()) {
        return Err(AppError::numerical("Nonlinear solver produced non-finite parameters."));
    }

    // objective_function is 0.5 * ||r||^2
    let ssr = 2.0 * report.objective_function;
    let redchi = reduced_chi_squared(ssr, x.len(), params.len());
    let covariance = covariance_diagonal(f, x, &params, redchi);

    Ok(SolveOutput {
        params,
        reduced_chi_squared: redchi,
        covariance,
        converged,
        evaluations: report.number_of_evaluations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::sine;

    #[test]
    fn refines_a_sine_from_a_close_guess() {
        let f = |x: f64, p: &[f64]| sine(x, p[0], p[1], p[2], p[3]);
        let x: Vec<f64> = (0..400).map(|i| i as f64 * 0.01).collect();
        let truth = [1.5, 1.2, 0.3, 0.5];
        let y: Vec<f64> = x.iter().map(|&xi| f(xi, &truth)).collect();

        let initial = [1.3, 1.1, 0.2, 0.4];
        let lower = vec![f64::NEG_INFINITY; 4];
        let upper = vec![f64::INFINITY; 4];
        let out = solve(&f, &x, &y, &initial, &lower, &upper).unwrap();

        assert!(out.converged);
        for i in 0..4 {
            assert!(
                (out.params[i] - truth[i]).abs() < 1e-4,
                "param {i}: {} vs {}",
                out.params[i],
                truth[i]
            );
        }
        assert!(out.reduced_chi_squared < 1e-8);
    }

    #[test]
    fn respects_lower_bound() {
        // Data drawn from a negative-amplitude bell; amplitude bounded at 0.
        let f = |x: f64, p: &[f64]| crate::models::gaussian(x, p[0], p[1], p[2], p[3]);
        let x: Vec<f64> = (0..100).map(|i| -2.0 + i as f64 * 0.04).collect();
        let y: Vec<f64> = x.iter().map(|&xi| f(xi, &[0.0, 0.5, -1.0, 0.0])).collect();

        let initial = [0.0, 0.5, 0.5, 0.0];
        let lower = [f64::NEG_INFINITY, f64::NEG_INFINITY, 0.0, f64::NEG_INFINITY];
        let upper = [f64::INFINITY; 4];
        let out = solve(&f, &x, &y, &initial, &lower, &upper).unwrap();
        assert!(out.params[2] >= 0.0, "amplitude stayed in bounds: {}", out.params[2]);
    }
}
