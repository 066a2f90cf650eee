//! Damped Gauss-Newton strategy (gradient-based).
//!
//! Each iteration linearizes the model around the current parameters and
//! solves the Marquardt-damped system `[J; sqrt(lambda) D] delta = [r; 0]`
//! with the shared SVD least-squares kernel, where `D` scales each column by
//! its norm in `J`. The damping factor adapts per trial: down on improvement,
//! up when a step is rejected, so the iteration degrades gracefully toward
//! scaled gradient descent in narrow valleys instead of stalling on a pure
//! Gauss-Newton direction. Bounds are enforced by projecting every trial
//! point.
//!
//! This is the dependency-light twin of the Levenberg-Marquardt strategy; the
//! two must agree up to solver tolerance on well-posed problems.

use nalgebra::{DMatrix, DVector};

use crate::error::AppError;
use crate::math::solve_least_squares;
use crate::solver::{
    SolveOutput, clamp_to_bounds, covariance_diagonal, numeric_jacobian, reduced_chi_squared,
    residual_vector,
};

const MAX_ITERATIONS: usize = 200;
const MAX_REJECTED_TRIALS: usize = 16;

const LAMBDA_INITIAL: f64 = 1e-3;
const LAMBDA_UP: f64 = 11.0;
const LAMBDA_DOWN: f64 = 9.0;
const LAMBDA_MIN: f64 = 1e-12;
const LAMBDA_MAX: f64 = 1e12;

/// Relative step size below which the iteration is considered converged.
const STEP_TOL: f64 = 1e-10;
/// Relative residual improvement below which the iteration is considered
/// converged.
const FTOL: f64 = 1e-14;

/// Solve via damped Gauss-Newton iterations.
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
    let mut params = initial.to_vec();
    clamp_to_bounds(&mut params, lower, upper);

    let mut ssr = residual_vector(f, x, y, &params).norm_squared();
    if !ssr.is_finite() {
        return Err(AppError::numerical("Initial parameters give non-finite residuals."));
    }

    let n = x.len();
    let p = params.len();
    let mut lambda = LAMBDA_INITIAL;
    let mut evaluations = 1;
    let mut converged = false;

    for _ in 0..MAX_ITERATIONS {
        let jac = numeric_jacobian(f, x, &params);
        if jac.iter().any(|v| !v.is_finite()) {
            return Err(AppError::numerical("Non-finite Jacobian during Gauss-Newton iteration."));
        }

        // Marquardt column scaling: D_jj = ||J_col_j||, floored so columns
        // that vanish at the current point still receive damping.
        let col_norms: Vec<f64> = (0..p)
            .map(|j| jac.column(j).norm().max(1e-12))
            .collect();

        // residual_vector returns f - y; the linearized system wants y - f.
        let r = -residual_vector(f, x, y, &params);

        let mut improved = false;
        for _ in 0..MAX_REJECTED_TRIALS {
            // Augmented system [J; sqrt(lambda) D] delta = [r; 0]: the normal
            // equations of (JtJ + lambda D^2) delta = Jt r, solved without
            // forming JtJ.
            let mut augmented = DMatrix::zeros(n + p, p);
            augmented.view_mut((0, 0), (n, p)).copy_from(&jac);
            for j in 0..p {
                augmented[(n + j, j)] = lambda.sqrt() * col_norms[j];
            }
            let mut rhs = DVector::zeros(n + p);
            rhs.rows_mut(0, n).copy_from(&r);

            let Some(delta) = solve_least_squares(&augmented, &rhs) else {
                lambda = (lambda * LAMBDA_UP).min(LAMBDA_MAX);
                continue;
            };

            let mut trial = params.clone();
            for (t, d) in trial.iter_mut().zip(delta.iter()) {
                *t += d;
            }
            clamp_to_bounds(&mut trial, lower, upper);

            let trial_ssr = residual_vector(f, x, y, &trial).norm_squared();
            evaluations += 1;
            if trial_ssr.is_finite() && trial_ssr < ssr {
                let step_norm: f64 = params
                    .iter()
                    .zip(&trial)
                    .map(|(a, b)| (a - b) * (a - b))
                    .sum::<f64>()
                    .sqrt();
                let scale: f64 = params.iter().map(|v| v * v).sum::<f64>().sqrt().max(1.0);
                let reduction = (ssr - trial_ssr) / ssr.max(f64::MIN_POSITIVE);

                params = trial;
                ssr = trial_ssr;
                improved = true;
                lambda = (lambda / LAMBDA_DOWN).max(LAMBDA_MIN);

                if step_norm < STEP_TOL * scale || reduction < FTOL {
                    converged = true;
                }
                break;
            }
            lambda = (lambda * LAMBDA_UP).min(LAMBDA_MAX);
        }

        if !improved {
            // Even a near-gradient-descent step at maximal damping cannot
            // reduce the residual: local optimum at this resolution.
            converged = true;
        }
        if converged {
            break;
        }
    }

    let redchi = reduced_chi_squared(ssr, x.len(), params.len());
    let covariance = covariance_diagonal(f, x, &params, redchi);

    Ok(SolveOutput {
        params,
        reduced_chi_squared: redchi,
        covariance,
        converged,
        evaluations,
    })
}
