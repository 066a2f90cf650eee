//! Derivative-of-Gaussian smoothing filter.
//!
//! The step detector needs the derivative of a *smoothed* signal: convolving
//! with the first derivative of a Gaussian kernel yields exactly that, because
//! differentiation commutes with convolution. A rising step therefore produces
//! a positive peak in the filtered output.
//!
//! Boundary handling is reflect (`a b c | c b a`), so edge samples do not leak
//! artificial steps into the interior.

/// Kernel radius as a multiple of sigma.
const TRUNCATE: f64 = 4.0;

/// Convolve `signal` with the first derivative of a Gaussian of width `sigma`.
///
/// Output has the same length as the input. `sigma` is clamped below at a
/// small positive value so short traces still get a usable (if crude) kernel.
pub fn gaussian_derivative_filter(signal: &[f64], sigma: f64) -> Vec<f64> {
    let n = signal.len();
    if n == 0 {
        return Vec::new();
    }
    let sigma = sigma.max(0.5);
    let radius = ((TRUNCATE * sigma + 0.5) as usize).max(1);

    // g'(j) = -(j / sigma^2) * g(j), with g normalized to unit sum.
    let mut gauss = Vec::with_capacity(2 * radius + 1);
    for j in -(radius as i64)..=(radius as i64) {
        let t = j as f64;
        gauss.push((-t * t / (2.0 * sigma * sigma)).exp());
    }
    let norm: f64 = gauss.iter().sum();
    let kernel: Vec<f64> = (-(radius as i64)..=(radius as i64))
        .zip(gauss.iter())
        .map(|(j, g)| -(j as f64) / (sigma * sigma) * g / norm)
        .collect();

    let reflect = |i: i64| -> usize {
        // reflect about the array edges until the index lands inside
        let mut i = i;
        let n = n as i64;
        loop {
            if i < 0 {
                i = -i - 1;
            } else if i >= n {
                i = 2 * n - i - 1;
            } else {
                return i as usize;
            }
        }
    };

    let mut out = vec![0.0; n];
    for (i, o) in out.iter_mut().enumerate() {
        let mut acc = 0.0;
        for (k, &w) in kernel.iter().enumerate() {
            let j = k as i64 - radius as i64;
            // convolution: out[i] = sum_j kernel(j) * signal(i - j)
            acc += w * signal[reflect(i as i64 - j)];
        }
        *o = acc;
    }
    out
}
