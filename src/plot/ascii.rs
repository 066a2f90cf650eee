//! ASCII/Unicode plotting for terminal output.
//!
//! This is intentionally "dumb" (fixed-size grid), optimized for:
//! - quick visual sanity checks in a terminal
//! - deterministic output (helpful for golden tests)
//!
//! Plot elements:
//! - observed points: `o`
//! - fitted curve: `-` line

use crate::domain::FitOutcome;
use crate::models::predict;

/// Render a plot overlaying observed points on the fitted curve.
pub fn render_ascii_plot(
    x: &[f64],
    y: &[f64],
    outcome: &FitOutcome,
    width: usize,
    height: usize,
) -> String {
    let (x_min, x_max) = x_range(x).unwrap_or((0.0, 1.0));
    let curve = sample_curve(outcome, x_min, x_max, width.max(2));
    render_plot(x, y, &curve, x_min, x_max, width, height)
}

/// Render a plot from precomputed curve samples (used when the curve cannot
/// be reproduced from `predict`, e.g. a non-default lever arm).
pub fn render_ascii_plot_from_series(
    x: &[f64],
    y: &[f64],
    curve_x: &[f64],
    curve_y: &[f64],
    width: usize,
    height: usize,
) -> String {
    let (x_min, x_max) = x_range(x).unwrap_or((0.0, 1.0));
    let curve: Vec<(f64, f64)> = curve_x.iter().zip(curve_y).map(|(&a, &b)| (a, b)).collect();
    render_plot(x, y, &curve, x_min, x_max, width, height)
}

fn render_plot(
    x: &[f64],
    y: &[f64],
    curve_points: &[(f64, f64)],
    x_min: f64,
    x_max: f64,
    width: usize,
    height: usize,
) -> String {
    let width = width.max(10);
    let height = height.max(5);

    // Determine y-range from observed points and curve points.
    let (y_min, y_max) = y_range(y, curve_points).unwrap_or((0.0, 1.0));
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

    let mut grid = vec![vec![' '; width]; height];

    // Draw curve first (so points can overlay).
    draw_curve(&mut grid, curve_points, x_min, x_max, y_min, y_max);

    for (&xi, &yi) in x.iter().zip(y) {
        let col = map_x(xi, x_min, x_max, width);
        let row = map_y(yi, y_min, y_max, height);
        grid[row][col] = 'o';
    }

    // Build final string. We include a small header with ranges.
    let mut out = String::new();
    out.push_str(&format!(
        "Plot: x=[{x_min:.3}, {x_max:.3}] | y=[{y_min:.3}, {y_max:.3}]\n"
    ));

    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }

    out
}

fn sample_curve(outcome: &FitOutcome, x_min: f64, x_max: f64, n: usize) -> Vec<(f64, f64)> {
    let n = n.max(2);
    let mut out = Vec::with_capacity(n);
    for i in 0..n {
        let u = i as f64 / (n as f64 - 1.0);
        let xi = x_min + u * (x_max - x_min);
        let yi = predict(outcome.model, xi, &outcome.params);
        out.push((xi, yi));
    }
    out
}

fn draw_curve(
    grid: &mut [Vec<char>],
    curve: &[(f64, f64)],
    x_min: f64,
    x_max: f64,
    y_min: f64,
    y_max: f64,
) {
    let height = grid.len();
    let width = grid.first().map(|r| r.len()).unwrap_or(0);
    if width == 0 || height == 0 {
        return;
    }
    for &(xi, yi) in curve {
        if !yi.is_finite() {
            continue;
        }
        let col = map_x(xi, x_min, x_max, width);
        let row = map_y(yi, y_min, y_max, height);
        grid[row][col] = '-';
    }
}

fn x_range(x: &[f64]) -> Option<(f64, f64)> {
    let mut min_x = f64::INFINITY;
    let mut max_x = f64::NEG_INFINITY;
    for &xi in x {
        min_x = min_x.min(xi);
        max_x = max_x.max(xi);
    }
    if min_x.is_finite() && max_x.is_finite() && max_x > min_x {
        Some((min_x, max_x))
    } else {
        None
    }
}

fn y_range(y: &[f64], curve: &[(f64, f64)]) -> Option<(f64, f64)> {
    let mut min_y = f64::INFINITY;
    let mut max_y = f64::NEG_INFINITY;

    for &yi in y {
        min_y = min_y.min(yi);
        max_y = max_y.max(yi);
    }
    for &(_, yi) in curve {
        if yi.is_finite() {
            min_y = min_y.min(yi);
            max_y = max_y.max(yi);
        }
    }

    if min_y.is_finite() && max_y.is_finite() && max_y > min_y {
        Some((min_y, max_y))
    } else {
        None
    }
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(v: f64, v_min: f64, v_max: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = ((v - v_min) / (v_max - v_min)).clamp(0.0, 1.0);
    ((u * (width as f64 - 1.0)).round() as usize).min(width - 1)
}

fn map_y(v: f64, v_min: f64, v_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((v - v_min) / (v_max - v_min)).clamp(0.0, 1.0);
    // Row 0 is the top of the plot.
    let inv = 1.0 - u;
    ((inv * (height as f64 - 1.0)).round() as usize).min(height - 1)
}
