// FFT module - fixed-size radix-2 Cooley-Tukey transform
//
// The transform size is fixed at construction so the twiddle factors can be
// tabulated once. Tables hold N/2 entries of cos(2πk/N) and sin(2πk/N);
// a butterfly in a stage of size `len` reads entry `k * (N / len)`.
//
// Output is unnormalized. Callers computing power divide by N exactly once.
// NaN and infinite inputs are not checked and propagate through the output.

use std::f64::consts::PI;

use crate::error::DspError;

/// In-place complex FFT over power-of-two buffers of a fixed size
#[derive(Debug, Clone)]
pub struct Fft {
    size: usize,
    cos_table: Vec<f64>,
    sin_table: Vec<f64>,
}

impl Fft {
    /// Create a transform for buffers of exactly `size` elements
    ///
    /// # Errors
    /// `DspError::InvalidArgument` if `size` is zero or not a power of two.
    pub fn new(size: usize) -> Result<Self, DspError> {
        if size == 0 || !size.is_power_of_two() {
            return Err(DspError::InvalidArgument {
                reason: format!("FFT size must be a power of two (got {})", size),
            });
        }

        let half = size / 2;
        let cos_table = (0..half)
            .map(|k| (2.0 * PI * k as f64 / size as f64).cos())
            .collect();
        let sin_table = (0..half)
            .map(|k| (2.0 * PI * k as f64 / size as f64).sin())
            .collect();

        Ok(Self {
            size,
            cos_table,
            sin_table,
        })
    }

    /// Transform size N
    pub fn size(&self) -> usize {
        self.size
    }

    /// Forward transform in place
    ///
    /// # Errors
    /// `DspError::InvalidArgument` if either buffer length differs from N.
    /// Buffers are untouched in that case.
    pub fn process(&self, real: &mut [f64], imag: &mut [f64]) -> Result<(), DspError> {
        self.check_len(real.len(), imag.len())?;
        self.transform(real, imag);
        Ok(())
    }

    /// Inverse transform in place (conjugate, forward, conjugate, scale by 1/N)
    pub fn inverse(&self, real: &mut [f64], imag: &mut [f64]) -> Result<(), DspError> {
        self.check_len(real.len(), imag.len())?;

        for v in imag.iter_mut() {
            *v = -*v;
        }
        self.transform(real, imag);

        let scale = 1.0 / self.size as f64;
        for v in real.iter_mut() {
            *v *= scale;
        }
        for v in imag.iter_mut() {
            *v *= -scale;
        }
        Ok(())
    }

    fn check_len(&self, real_len: usize, imag_len: usize) -> Result<(), DspError> {
        if real_len != self.size || imag_len != self.size {
            return Err(DspError::InvalidArgument {
                reason: format!(
                    "FFT expects {} real and imaginary values (got {} and {})",
                    self.size, real_len, imag_len
                ),
            });
        }
        Ok(())
    }

    fn transform(&self, real: &mut [f64], imag: &mut [f64]) {
        let n = self.size;
        if n <= 1 {
            return;
        }

        // Bit-reversal permutation
        let mut j = 0usize;
        for i in 0..n - 1 {
            if i < j {
                real.swap(i, j);
                imag.swap(i, j);
            }
            let mut k = n >> 1;
            while k <= j {
                j -= k;
                k >>= 1;
            }
            j += k;
        }

        // Butterfly stages of size 2, 4, ..., N
        let mut len = 2;
        while len <= n {
            let half = len >> 1;
            let stride = n / len;

            let mut start = 0;
            while start < n {
                for k in 0..half {
                    // e^{-2πi k/len} = cos(2π k·stride/N) - i sin(2π k·stride/N)
                    let w_r = self.cos_table[k * stride];
                    let w_i = -self.sin_table[k * stride];

                    let u = start + k;
                    let v = u + half;

                    let t_r = w_r * real[v] - w_i * imag[v];
                    let t_i = w_r * imag[v] + w_i * real[v];

                    real[v] = real[u] - t_r;
                    imag[v] = imag[u] - t_i;
                    real[u] += t_r;
                    imag[u] += t_i;
                }
                start += len;
            }
            len <<= 1;
        }
    }
}
