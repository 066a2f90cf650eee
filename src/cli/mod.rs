//! Command-line parsing for the peak/transition curve fitter.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the modeling/math code.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::domain::{EstimateMode, ModelChoice, SolverStrategy, SplitPolicy};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "pfit", version, about = "1-D Peak and Transition Curve Fitter")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fit a model to one or more x,y CSV traces and print diagnostics.
    Fit(FitArgs),
    /// Fit a synthetic trace (no input files needed).
    Demo(DemoArgs),
}

/// Common fit options (model, estimator variants, solver, output).
#[derive(Debug, Parser, Clone)]
pub struct FitArgs {
    /// Input CSV files, each with two columns: x,y.
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Model family to fit.
    #[arg(short = 'm', long, value_enum, default_value_t = ModelChoice::Gaussian)]
    pub model: ModelChoice,

    /// Gaussian: drop the constant offset (three-parameter variant).
    #[arg(long)]
    pub no_offset: bool,

    /// Sine: constrain the amplitude to be non-negative.
    #[arg(long)]
    pub positive_amplitude: bool,

    /// Double Gaussian: initial-guess variant.
    #[arg(long, value_enum, default_value_t = EstimateMode::Integral)]
    pub estimate_mode: EstimateMode,

    /// Double Gaussian: how to split the trace into the two peak halves.
    #[arg(long, value_enum, default_value_t = SplitPolicy::Index)]
    pub split_policy: SplitPolicy,

    /// Double Gaussian: run the asymmetric-amplitude refit pass.
    #[arg(long)]
    pub refit: bool,

    /// Amplitude ratio above which the refit pass re-estimates the small peak.
    #[arg(long, default_value_t = 8.0)]
    pub refit_ratio: f64,

    /// Nonlinear refinement strategy.
    #[arg(long, value_enum, default_value_t = SolverStrategy::Lm)]
    pub strategy: SolverStrategy,

    /// Fermi-linear: lever arm scaling the step width.
    #[arg(long, default_value_t = crate::models::DEFAULT_LEVER_ARM)]
    pub lever_arm: f64,

    /// Fermi-linear: trim border samples before estimation and fitting.
    #[arg(long)]
    pub trim_border: bool,

    /// Render an ASCII plot in the terminal.
    #[arg(long)]
    pub plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 25)]
    pub height: usize,

    /// Export fit results to JSON (one file per input, suffixed by index
    /// when fitting multiple traces).
    #[arg(long)]
    pub export: Option<PathBuf>,
}

/// Options for the synthetic-trace demo.
#[derive(Debug, Parser, Clone)]
pub struct DemoArgs {
    /// Model family to generate and fit.
    #[arg(short = 'm', long, value_enum, default_value_t = ModelChoice::Gaussian)]
    pub model: ModelChoice,

    /// Number of samples to generate.
    #[arg(short = 'n', long, default_value_t = 200)]
    pub sample_count: usize,

    /// Random seed for sample generation.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Gaussian noise sigma added to the generated trace.
    #[arg(long, default_value_t = 0.1)]
    pub noise: f64,

    /// Render an ASCII plot in the terminal.
    #[arg(long)]
    pub plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 25)]
    pub height: usize,

    /// Export fit results to JSON.
    #[arg(long)]
    pub export: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_args_parse_with_defaults() {
        let cli = Cli::parse_from(["pfit", "fit", "trace.csv"]);
        match cli.command {
            Command::Fit(args) => {
                assert_eq!(args.inputs.len(), 1);
                assert_eq!(args.model, ModelChoice::Gaussian);
                assert_eq!(args.strategy, SolverStrategy::Lm);
                assert!(!args.refit);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn demo_args_parse_model_selection() {
        let cli = Cli::parse_from(["pfit", "demo", "-m", "fermi-linear", "--seed", "7"]);
        match cli.command {
            Command::Demo(args) => {
                assert_eq!(args.model, ModelChoice::FermiLinear);
                assert_eq!(args.seed, 7);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn fit_requires_an_input() {
        assert!(Cli::try_parse_from(["pfit", "fit"]).is_err());
    }
}
