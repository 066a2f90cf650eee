//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - reads traces (or generates a synthetic one)
//! - runs estimation + nonlinear refinement
//! - prints reports/plots
//! - writes optional exports

use std::path::PathBuf;

use clap::Parser;

use crate::cli::{Command, DemoArgs, FitArgs};
use crate::data::{generate_trace, SampleConfig};
use crate::domain::FitConfig;
use crate::error::AppError;

pub mod pipeline;

use pipeline::{ModelFit, TraceFit};

/// Entry point for the `pfit` binary.
pub fn run() -> Result<(), AppError> {
    let cli = crate::cli::Cli::parse();

    match cli.command {
        Command::Fit(args) => handle_fit(args),
        Command::Demo(args) => handle_demo(args),
    }
}

fn handle_fit(args: FitArgs) -> Result<(), AppError> {
    let config = fit_config_from_args(&args);
    let fits = pipeline::run_fit(&config)?;

    let multiple = fits.len() > 1;
    for (i, fit) in fits.iter().enumerate() {
        print_trace_fit(fit, &config);

        if let Some(path) = &config.export {
            let path = if multiple { suffixed_path(path, i) } else { path.clone() };
            write_export(&path, fit)?;
        }
    }

    Ok(())
}

fn handle_demo(args: DemoArgs) -> Result<(), AppError> {
    let sample = SampleConfig {
        model: args.model,
        sample_count: args.sample_count,
        seed: args.seed,
        noise: args.noise,
    };
    let trace = generate_trace(&sample)?;

    let config = FitConfig {
        inputs: Vec::new(),
        model: args.model,
        include_offset: true,
        positive_amplitude: false,
        estimate_mode: crate::domain::EstimateMode::Integral,
        split_policy: crate::domain::SplitPolicy::Index,
        refit: false,
        refit_ratio: 8.0,
        strategy: crate::domain::SolverStrategy::Lm,
        lever_arm: crate::models::DEFAULT_LEVER_ARM,
        trim_border: false,
        plot: args.plot,
        plot_width: args.width,
        plot_height: args.height,
        export: args.export.clone(),
    };

    let label = format!("demo seed={} noise={}", args.seed, args.noise);
    let fit = pipeline::fit_trace(label, trace.x, trace.y, &config)?;

    println!("Ground truth: {:?}", trace.truth);
    print_trace_fit(&fit, &config);

    if let Some(path) = &config.export {
        write_export(path, &fit)?;
    }

    Ok(())
}

fn print_trace_fit(fit: &TraceFit, config: &FitConfig) {
    let outcome = fit.result.outcome();
    print!(
        "{}",
        crate::report::format_fit_summary(&fit.label, outcome, &fit.stats)
    );

    match &fit.result {
        ModelFit::Double(double) => {
            print!("{}", crate::report::format_double_gaussian_extras(double));
        }
        ModelFit::AdditionLine(addition) => {
            print!("{}", crate::report::format_addition_line_extras(addition));
        }
        ModelFit::Single(_) => {}
    }
    println!();

    if config.plot {
        let plot = match &fit.result {
            ModelFit::AdditionLine(addition) => crate::plot::render_ascii_plot_from_series(
                &fit.x,
                &fit.y,
                &addition.curves.x,
                &addition.curves.y_fit,
                config.plot_width,
                config.plot_height,
            ),
            _ => crate::plot::render_ascii_plot(
                &fit.x,
                &fit.y,
                fit.result.outcome(),
                config.plot_width,
                config.plot_height,
            ),
        };
        println!("{plot}");
    }
}

fn write_export(path: &PathBuf, fit: &TraceFit) -> Result<(), AppError> {
    let curves = match &fit.result {
        ModelFit::AdditionLine(addition) => Some(&addition.curves),
        _ => None,
    };
    crate::io::export::write_fit_json(path, fit.result.outcome(), curves)
}

fn suffixed_path(path: &PathBuf, index: usize) -> PathBuf {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("fit");
    let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("json");
    path.with_file_name(format!("{stem}-{index}.{ext}"))
}

fn fit_config_from_args(args: &FitArgs) -> FitConfig {
    FitConfig {
        inputs: args.inputs.clone(),
        model: args.model,
        include_offset: !args.no_offset,
        positive_amplitude: args.positive_amplitude,
        estimate_mode: args.estimate_mode,
        split_policy: args.split_policy,
        refit: args.refit,
        refit_ratio: args.refit_ratio,
        strategy: args.strategy,
        lever_arm: args.lever_arm,
        trim_border: args.trim_border,
        plot: args.plot,
        plot_width: args.width,
        plot_height: args.height,
        export: args.export.clone(),
    }
}
