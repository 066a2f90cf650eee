//! Dominant-frequency estimation via the FFT magnitude spectrum.
//!
//! Used by the sine estimator to seed the frequency parameter. We take the
//! argmax of the magnitude over the positive-frequency half of the spectrum;
//! optionally the DC bin is zeroed first so a large offset does not win.

use rustfft::FftPlanner;
use rustfft::num_complex::Complex64;

/// Estimate the dominant frequency of a real signal.
///
/// `sample_rate` is in samples per unit of the independent variable, so the
/// returned frequency is in cycles per that same unit.
///
/// Returns 0.0 for signals shorter than 2 samples (no resolvable frequency).
pub fn dominant_frequency(signal: &[f64], sample_rate: f64, remove_dc: bool) -> f64 {
    let n = signal.len();
    if n < 2 || !sample_rate.is_finite() || sample_rate <= 0.0 {
        return 0.0;
    }

    let mut buf: Vec<Complex64> = signal.iter().map(|&v| Complex64::new(v, 0.0)).collect();
    let mut planner = FftPlanner::new();
    planner.plan_fft_forward(n).process(&mut buf);

    if remove_dc {
        buf[0] = Complex64::new(0.0, 0.0);
    }

    let half = (n / 2).max(1);
    let mut best_idx = 0;
    let mut best_mag = f64::NEG_INFINITY;
    for (i, c) in buf.iter().take(half).enumerate() {
        let mag = c.norm();
        if mag > best_mag {
            best_mag = mag;
            best_idx = i;
        }
    }

    best_idx as f64 * sample_rate / n as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn recovers_pure_tone() {
        let sample_rate = 100.0;
        let freq = 7.0;
        let signal: Vec<f64> = (0..1000)
            .map(|i| (2.0 * PI * freq * i as f64 / sample_rate).sin())
            .collect();
        let est = dominant_frequency(&signal, sample_rate, true);
        assert!((est - freq).abs() < 0.2, "estimated {est}");
    }

    #[test]
    fn dc_removal_ignores_offset() {
        let sample_rate = 50.0;
        let freq = 3.0;
        let signal: Vec<f64> = (0..500)
            .map(|i| 100.0 + 0.1 * (2.0 * PI * freq * i as f64 / sample_rate).sin())
            .collect();
        let est = dominant_frequency(&signal, sample_rate, true);
        assert!((est - freq).abs() < 0.2, "estimated {est}");
    }

    #[test]
    fn degenerate_inputs_return_zero() {
        assert_eq!(dominant_frequency(&[], 1.0, true), 0.0);
        assert_eq!(dominant_frequency(&[1.0], 1.0, true), 0.0);
        assert_eq!(dominant_frequency(&[1.0, 2.0], 0.0, true), 0.0);
    }
}
