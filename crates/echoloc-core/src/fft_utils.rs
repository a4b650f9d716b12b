//! FFT utilities for real-valued audio analysis
//!
//! Thin wrapper around RustFFT shared by the spectral peak estimator, the
//! GCC-PHAT correlator, and the band energy analyzer. Audio here is
//! real-valued, so the interesting part of a spectrum is the first
//! `n/2 + 1` bins (up to Nyquist); the half-spectrum helpers below encode
//! that convention once.
//!
//! ```text
//! samples ──window──► FFT ──► |X[k]|, |X[k]|²   k = 0 .. n/2
//!                                  │
//!                                  └─► argmax + parabolic interpolation
//!                                      for sub-bin peak frequency
//! ```

use num_complex::Complex64;
use rustfft::{Fft, FftPlanner};
use std::fmt;
use std::sync::Arc;

/// Planned forward/inverse FFT of a fixed size with a reusable scratch
/// buffer.
pub struct FftProcessor {
    size: usize,
    fft_forward: Arc<dyn Fft<f64>>,
    fft_inverse: Arc<dyn Fft<f64>>,
    scratch: Vec<Complex64>,
}

impl fmt::Debug for FftProcessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FftProcessor")
            .field("size", &self.size)
            .finish()
    }
}

impl FftProcessor {
    /// Create a processor for the given transform size (any size, not
    /// just powers of two).
    pub fn new(size: usize) -> Self {
        let mut planner = FftPlanner::new();
        let fft_forward = planner.plan_fft_forward(size);
        let fft_inverse = planner.plan_fft_inverse(size);
        let scratch_len = fft_forward
            .get_inplace_scratch_len()
            .max(fft_inverse.get_inplace_scratch_len());
        let scratch = vec![Complex64::new(0.0, 0.0); scratch_len];
        Self {
            size,
            fft_forward,
            fft_inverse,
            scratch,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Forward FFT in-place. `buffer.len()` must equal the planned size.
    pub fn fft_inplace(&mut self, buffer: &mut [Complex64]) {
        assert_eq!(buffer.len(), self.size);
        self.fft_forward
            .process_with_scratch(buffer, &mut self.scratch);
    }

    /// Inverse FFT in-place, normalized by `1/n`.
    pub fn ifft_inplace(&mut self, buffer: &mut [Complex64]) {
        assert_eq!(buffer.len(), self.size);
        self.fft_inverse
            .process_with_scratch(buffer, &mut self.scratch);
        let scale = 1.0 / self.size as f64;
        for sample in buffer.iter_mut() {
            *sample *= scale;
        }
    }

    /// Forward FFT of a real signal, zero-padded (or truncated) to the
    /// planned size.
    pub fn fft_real(&mut self, signal: &[f64]) -> Vec<Complex64> {
        let mut buffer = real_to_complex(signal, self.size);
        self.fft_inplace(&mut buffer);
        buffer
    }
}

/// Copy a real signal into a complex buffer of length `size`,
/// zero-padding or truncating as needed.
pub fn real_to_complex(signal: &[f64], size: usize) -> Vec<Complex64> {
    let mut buffer = vec![Complex64::new(0.0, 0.0); size];
    for (slot, &s) in buffer.iter_mut().zip(signal.iter()) {
        *slot = Complex64::new(s, 0.0);
    }
    buffer
}

/// Symmetric Hann window of length `n`.
pub fn hann_window(n: usize) -> Vec<f64> {
    if n <= 1 {
        return vec![1.0; n];
    }
    let denom = (n - 1) as f64;
    (0..n)
        .map(|i| 0.5 * (1.0 - (2.0 * std::f64::consts::PI * i as f64 / denom).cos()))
        .collect()
}

/// Magnitude of the non-negative-frequency half of a spectrum
/// (`n/2 + 1` bins, DC through Nyquist).
pub fn magnitude_half_spectrum(spectrum: &[Complex64]) -> Vec<f64> {
    spectrum
        .iter()
        .take(spectrum.len() / 2 + 1)
        .map(|c| c.norm())
        .collect()
}

/// Power (magnitude squared) of the non-negative-frequency half of a
/// spectrum.
pub fn power_half_spectrum(spectrum: &[Complex64]) -> Vec<f64> {
    spectrum
        .iter()
        .take(spectrum.len() / 2 + 1)
        .map(|c| c.norm_sqr())
        .collect()
}

/// Frequency in Hz of half-spectrum bin `bin` for an `fft_size`-point
/// transform.
pub fn bin_frequency(bin: usize, sample_rate: f64, fft_size: usize) -> f64 {
    bin as f64 * sample_rate / fft_size as f64
}

/// Circularly shift a buffer so the zero-lag / zero-frequency element
/// moves to index `n/2`.
pub fn fft_shift<T: Clone>(buffer: &[T]) -> Vec<T> {
    let n = buffer.len();
    let mid = n.div_ceil(2);
    let mut shifted = Vec::with_capacity(n);
    shifted.extend_from_slice(&buffer[mid..]);
    shifted.extend_from_slice(&buffer[..mid]);
    shifted
}

/// Sub-bin peak offset from three-point parabolic interpolation.
///
/// `alpha`, `beta`, `gamma` are the magnitudes at bins peak-1, peak,
/// peak+1. Returns an offset in bins, in (-0.5, 0.5); zero when the
/// denominator vanishes (flat neighborhood).
pub fn parabolic_offset(alpha: f64, beta: f64, gamma: f64) -> f64 {
    let denom = alpha - 2.0 * beta + gamma;
    if denom.abs() < 1e-12 {
        0.0
    } else {
        0.5 * (alpha - gamma) / denom
    }
}
