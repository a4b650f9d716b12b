//! Spectral peak estimation — dominant frequency with sub-bin accuracy
//!
//! Finds the strongest frequency component of a mono window inside a
//! caller-chosen search band. The window is Hann-weighted to suppress
//! spectral leakage, zero-padded up to the FFT size if shorter (and
//! truncated if longer), and the magnitude peak is refined with
//! three-point parabolic interpolation for sub-bin accuracy.
//!
//! Frequency resolution is `sample_rate / fft_size`; a larger FFT size
//! buys finer frequency resolution at the cost of time resolution, which
//! is why the size is a constructor parameter rather than a constant.
//!
//! ## Example
//!
//! ```rust
//! use echoloc_core::spectral_peak::SpectralPeakEstimator;
//!
//! let fs = 16000.0;
//! let tone: Vec<f64> = (0..4096)
//!     .map(|i| (2.0 * std::f64::consts::PI * 1000.0 * i as f64 / fs).sin())
//!     .collect();
//!
//! let estimator = SpectralPeakEstimator::new(fs, 4096);
//! let freq = estimator.estimate(&tone);
//! assert!((freq - 1000.0).abs() < fs / 4096.0);
//! ```

use crate::fft_utils::{
    bin_frequency, hann_window, magnitude_half_spectrum, parabolic_offset, FftProcessor,
};
use rustfft::num_complex::Complex64;

/// Default low edge of the search band in Hz.
pub const DEFAULT_LOW_HZ: f64 = 20.0;
/// Default high edge of the search band in Hz.
pub const DEFAULT_HIGH_HZ: f64 = 20_000.0;

/// FFT-based dominant-frequency estimator.
///
/// Pure and stateless: `estimate` has no side effects and identical
/// inputs always produce bit-identical outputs.
#[derive(Debug, Clone)]
pub struct SpectralPeakEstimator {
    sample_rate: f64,
    fft_size: usize,
    low_hz: f64,
    high_hz: f64,
}

impl SpectralPeakEstimator {
    /// Create an estimator searching the default 20 Hz - 20 kHz band.
    pub fn new(sample_rate: f64, fft_size: usize) -> Self {
        Self {
            sample_rate,
            fft_size,
            low_hz: DEFAULT_LOW_HZ,
            high_hz: DEFAULT_HIGH_HZ,
        }
    }

    /// Restrict the search to `[low_hz, high_hz]`.
    pub fn band(mut self, low_hz: f64, high_hz: f64) -> Self {
        self.low_hz = low_hz;
        self.high_hz = high_hz;
        self
    }

    /// Dominant frequency of `window` in Hz.
    ///
    /// Returns `0.0` when no FFT bin falls inside the search band, or
    /// when the windowed signal carries no energy (silence) — degraded
    /// results, never errors, since both cases are routine in field
    /// recordings.
    pub fn estimate(&self, window: &[f64]) -> f64 {
        let n = self.fft_size;
        if n == 0 || self.sample_rate <= 0.0 {
            return 0.0;
        }

        // Zero-pad/truncate to the FFT size, then Hann-window the whole
        // analysis buffer.
        let hann = hann_window(n);
        let mut buffer = vec![Complex64::new(0.0, 0.0); n];
        for (i, (&s, &w)) in window.iter().zip(hann.iter()).enumerate() {
            buffer[i] = Complex64::new(s * w, 0.0);
        }

        let mut processor = FftProcessor::new(n);
        processor.fft_inplace(&mut buffer);
        let mags = magnitude_half_spectrum(&buffer);

        // Bins whose frequency lies inside [low_hz, high_hz].
        let bin_width = self.sample_rate / n as f64;
        let in_band = |bin: usize| {
            let f = bin_frequency(bin, self.sample_rate, n);
            f >= self.low_hz && f <= self.high_hz
        };
        let lo = match (0..mags.len()).find(|&b| in_band(b)) {
            Some(b) => b,
            None => return 0.0,
        };
        let hi = (lo..mags.len()).take_while(|&b| in_band(b)).last().unwrap_or(lo);

        let mut peak = lo;
        let mut peak_mag = f64::NEG_INFINITY;
        for bin in lo..=hi {
            if mags[bin] > peak_mag {
                peak_mag = mags[bin];
                peak = bin;
            }
        }
        if peak_mag <= 0.0 {
            // Silence: no meaningful peak.
            return 0.0;
        }

        // Parabolic refinement only for interior bins.
        if peak > lo && peak < hi {
            let p = parabolic_offset(mags[peak - 1], mags[peak], mags[peak + 1]);
            bin_frequency(peak, self.sample_rate, n) + p * bin_width
        } else {
            bin_frequency(peak, self.sample_rate, n)
        }
    }
}

/// Convenience wrapper: dominant frequency of `samples` within
/// `[low_hz, high_hz]` using an `fft_size`-point transform.
pub fn dominant_frequency(
    samples: &[f64],
    sample_rate: f64,
    fft_size: usize,
    low_hz: f64,
    high_hz: f64,
) -> f64 {
    SpectralPeakEstimator::new(sample_rate, fft_size)
        .band(low_hz, high_hz)
        .estimate(samples)
}
