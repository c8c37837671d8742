// DCT module - orthonormal type-II DCT truncated to the kept coefficients

use std::f64::consts::PI;

/// Precomputed DCT-II basis of `n_out` rows over `n_in` inputs
///
/// `c[k] = s_k Σ x[n] cos(πk(2n + 1) / 2N)` with `s_0 = √(1/N)` and
/// `s_k = √(2/N)`. Rows with `k >= n_in` have no basis function and are zero,
/// which keeps the output length fixed at `n_out`.
#[derive(Debug, Clone)]
pub struct Dct {
    n_in: usize,
    basis: Vec<Vec<f64>>,
}

impl Dct {
    pub fn new(n_in: usize, n_out: usize) -> Self {
        let n = n_in as f64;
        let basis = (0..n_out)
            .map(|k| {
                if k >= n_in {
                    return vec![0.0; n_in];
                }
                let scale = if k == 0 { (1.0 / n).sqrt() } else { (2.0 / n).sqrt() };
                (0..n_in)
                    .map(|i| scale * (PI * k as f64 * (2 * i + 1) as f64 / (2.0 * n)).cos())
                    .collect()
            })
            .collect();

        Self { n_in, basis }
    }

    pub fn n_out(&self) -> usize {
        self.basis.len()
    }

    /// Transform `input` (length `n_in`) into `out` (length `n_out`)
    pub fn apply(&self, input: &[f64], out: &mut [f64]) {
        debug_assert_eq!(input.len(), self.n_in);
        for (value, row) in out.iter_mut().zip(&self.basis) {
            *value = row.iter().zip(input).map(|(b, x)| b * x).sum();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_input_only_excites_dc() {
        let dct = Dct::new(16, 16);
        let input = vec![2.0; 16];
        let mut out = vec![0.0; 16];
        dct.apply(&input, &mut out);

        assert!((out[0] - 2.0 * 4.0).abs() < 1e-12, "c0 = x·√N, got {}", out[0]);
        for (k, v) in out.iter().enumerate().skip(1) {
            assert!(v.abs() < 1e-12, "coefficient {} should vanish, got {}", k, v);
        }
    }

    #[test]
    fn test_basis_is_orthonormal() {
        let dct = Dct::new(12, 12);
        for a in 0..12 {
            for b in 0..12 {
                let dot: f64 = dct.basis[a]
                    .iter()
                    .zip(&dct.basis[b])
                    .map(|(x, y)| x * y)
                    .sum();
                let expected = if a == b { 1.0 } else { 0.0 };
                assert!((dot - expected).abs() < 1e-10, "rows {} {} dot {}", a, b, dot);
            }
        }
    }

    #[test]
    fn test_rows_beyond_inputs_are_zero() {
        let dct = Dct::new(4, 6);
        assert_eq!(dct.n_out(), 6);
        let mut out = vec![9.0; 6];
        dct.apply(&[1.0, -2.0, 3.0, 0.5], &mut out);
        assert_eq!(out[4], 0.0);
        assert_eq!(out[5], 0.0);
    }
}
