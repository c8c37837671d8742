// Window module - analysis window applied to each frame before the FFT

use std::f64::consts::PI;

/// Hamming window of length `n`
///
/// `w[i] = 0.54 - 0.46 cos(2πi / (n - 1))`. A single-sample window is `[1.0]`
/// and an empty request yields an empty vector.
pub fn hamming_window(n: usize) -> Vec<f64> {
    if n <= 1 {
        return vec![1.0; n];
    }
    (0..n)
        .map(|i| 0.54 - 0.46 * (2.0 * PI * i as f64 / (n - 1) as f64).cos())
        .collect()
}
