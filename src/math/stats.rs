//! Robust scalar statistics used by the initial-guess heuristics.
//!
//! The estimators lean on order statistics (percentiles, trimmed means) rather
//! than plain moments because measurement traces routinely carry outliers at
//! the sweep edges. All functions here accept plain slices and never mutate
//! their inputs (sorting happens on copies).

/// Arithmetic mean. Returns 0.0 for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation (divide by `n`, not `n - 1`).
pub fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / values.len() as f64;
    var.sqrt()
}

/// Linear-interpolation percentile, `p` in `[0, 100]`.
///
/// Matches the conventional "linear" definition: rank `= p/100 * (n-1)`,
/// interpolated between the surrounding order statistics.
pub fn percentile(values: &[f64], p: f64) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let rank = (p / 100.0).clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        return sorted[lo];
    }
    let frac = rank - lo as f64;
    sorted[lo] + frac * (sorted[hi] - sorted[lo])
}

/// Mean after dropping the `trim` smallest and `trim` largest values.
///
/// Falls back to the plain mean when the trim would consume the whole slice.
pub fn trimmed_mean(values: &[f64], trim: usize) -> f64 {
    if values.len() <= 2 * trim {
        return mean(values);
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    mean(&sorted[trim..sorted.len() - trim])
}

/// First differences `v[i+1] - v[i]`.
pub fn diff(values: &[f64]) -> Vec<f64> {
    values.windows(2).map(|w| w[1] - w[0]).collect()
}

/// Full convolution of `signal` with `kernel` (output length `n + k - 1`).
///
/// Used to smooth edge-window difference sequences before trimming; the full
/// (not "same") output matches how the slope heuristic was calibrated.
pub fn convolve_full(signal: &[f64], kernel: &[f64]) -> Vec<f64> {
    if signal.is_empty() || kernel.is_empty() {
        return Vec::new();
    }
    let n = signal.len() + kernel.len() - 1;
    let mut out = vec![0.0; n];
    for (i, &s) in signal.iter().enumerate() {
        for (j, &k) in kernel.iter().enumerate() {
            out[i + j] += s * k;
        }
    }
    out
}

/// Integral of `y` over `x` using per-sample spacing weights.
///
/// The spacing of the last sample is extended from its predecessor, so a
/// uniform grid reduces to `sum(y) * dx`. This is the area proxy behind the
/// Gaussian-area sigma estimate.
pub fn sample_integral(x: &[f64], y: &[f64]) -> f64 {
    debug_assert_eq!(x.len(), y.len());
    if x.len() < 2 {
        return 0.0;
    }
    let mut total = 0.0;
    for i in 0..x.len() {
        let dx = if i + 1 < x.len() {
            x[i + 1] - x[i]
        } else {
            x[i] - x[i - 1]
        };
        total += dx * y[i];
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentile_interpolates() {
        let v = [0.0, 1.0, 2.0, 3.0, 4.0];
        assert!((percentile(&v, 0.0) - 0.0).abs() < 1e-12);
        assert!((percentile(&v, 50.0) - 2.0).abs() < 1e-12);
        assert!((percentile(&v, 100.0) - 4.0).abs() < 1e-12);
        assert!((percentile(&v, 25.0) - 1.0).abs() < 1e-12);
        // unsorted input is handled
        let u = [4.0, 0.0, 3.0, 1.0, 2.0];
        assert!((percentile(&u, 50.0) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn trimmed_mean_drops_extremes() {
        let v = [100.0, 1.0, 2.0, 3.0, -50.0];
        assert!((trimmed_mean(&v, 1) - 2.0).abs() < 1e-12);
        // degenerate trim falls back to the plain mean
        assert!((trimmed_mean(&[1.0, 2.0], 1) - 1.5).abs() < 1e-12);
    }

    #[test]
    fn sample_integral_uniform_grid() {
        let x: Vec<f64> = (0..10).map(|i| i as f64 * 0.5).collect();
        let y = vec![2.0; 10];
        // 10 samples of height 2 with dx = 0.5
        assert!((sample_integral(&x, &y) - 10.0).abs() < 1e-12);
    }

    #[test]
    fn convolve_full_length_and_values() {
        let out = convolve_full(&[1.0, 2.0, 3.0], &[1.0, 1.0, 1.0]);
        assert_eq!(out.len(), 5);
        assert!((out[2] - 6.0).abs() < 1e-12);
    }

    #[test]
    fn std_dev_is_population() {
        let v = [1.0, 3.0];
        assert!((std_dev(&v) - 1.0).abs() < 1e-12);
    }
}
