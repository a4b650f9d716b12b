//! GCC-PHAT — Generalized Cross-Correlation with Phase Transform
//!
//! Estimates the time delay between two microphone signals by whitening
//! the cross-power spectrum before correlating. The phase transform
//! discards magnitude information and keeps only phase, which sharpens
//! the correlation peak and makes the estimate robust to reverberation
//! and colored noise.
//!
//! ```text
//! sig1 ──FFT──► S1 ─┐
//!                   ├─► R = S1 · conj(S2) ──► R / max(|R|, ε) ──IFFT──► cc(lag)
//! sig2 ──FFT──► S2 ─┘                                                   │
//!                                              argmax |cc| in ±max_delay┘
//! ```
//!
//! Sign convention: a **positive** delay means `sig1` lags `sig2` (the
//! wavefront reached microphone 2 first). This sign is what the DOA
//! estimator converts into an arrival angle.
//!
//! This block measures *time delay* only. Doppler velocity is a
//! *frequency shift* measurement and is handled by the spectral-peak
//! path in [`crate::doppler_estimator`]; the two must not be conflated.
//!
//! ## Example
//!
//! ```rust
//! use echoloc_core::gcc_phat::GccPhatCorrelator;
//!
//! let fs = 16000.0;
//! // A short broadband burst, received 8 samples later on mic 1.
//! let mut early = vec![0.0; 512];
//! let mut late = vec![0.0; 512];
//! for i in 0..64 {
//!     let s = (i as f64 * 0.9).sin() * (-((i as f64 - 32.0) / 12.0).powi(2)).exp();
//!     early[100 + i] = s;
//!     late[108 + i] = s;
//! }
//! let result = GccPhatCorrelator::new(fs).correlate(&late, &early);
//! assert!((result.delay_s - 8.0 / fs).abs() < 1.0 / fs);
//! ```

use crate::fft_utils::{fft_shift, real_to_complex, FftProcessor};
use serde::{Deserialize, Serialize};

/// Floor applied to the cross-spectrum magnitude before the PHAT
/// division. Deliberate numerical-stability policy: bins with
/// essentially no energy would otherwise blow up to arbitrary phase at
/// infinite weight.
const PHAT_EPSILON: f64 = 1e-10;

/// Delay estimate plus the full (fftshifted) correlation function, with
/// lag zero at index `len / 2`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GccPhatResult {
    /// Estimated delay in seconds; positive means signal 1 lags signal 2.
    pub delay_s: f64,
    /// PHAT-weighted correlation over lag, zero lag at the center.
    pub correlation: Vec<f64>,
}

/// Phase-transform-weighted cross-correlator for time-delay estimation.
#[derive(Debug, Clone)]
pub struct GccPhatCorrelator {
    sample_rate: f64,
    max_delay_s: Option<f64>,
}

impl GccPhatCorrelator {
    pub fn new(sample_rate: f64) -> Self {
        Self {
            sample_rate,
            max_delay_s: None,
        }
    }

    /// Restrict the peak search to lags within `±max_delay_s` of zero.
    ///
    /// For a microphone pair this should be the physical maximum
    /// `baseline / speed_of_sound`; lags outside it cannot correspond to
    /// a real arrival-time difference.
    pub fn max_delay(mut self, max_delay_s: f64) -> Self {
        self.max_delay_s = Some(max_delay_s);
        self
    }

    /// Estimate the delay between two equal-rate signals.
    ///
    /// The signals may have different lengths; both are zero-padded to
    /// the next power of two at or above `len1 + len2 - 1` so the
    /// correlation is linear, not circular.
    pub fn correlate(&self, sig1: &[f64], sig2: &[f64]) -> GccPhatResult {
        if sig1.is_empty() || sig2.is_empty() || self.sample_rate <= 0.0 {
            return GccPhatResult {
                delay_s: 0.0,
                correlation: Vec::new(),
            };
        }

        let n = sig1.len() + sig2.len() - 1;
        let n_fft = n.next_power_of_two();
        let mut processor = FftProcessor::new(n_fft);

        let mut s1 = real_to_complex(sig1, n_fft);
        let mut s2 = real_to_complex(sig2, n_fft);
        processor.fft_inplace(&mut s1);
        processor.fft_inplace(&mut s2);

        // Cross-power spectrum with PHAT weighting.
        for (a, b) in s1.iter_mut().zip(s2.iter()) {
            let r = *a * b.conj();
            *a = r / r.norm().max(PHAT_EPSILON);
        }

        processor.ifft_inplace(&mut s1);
        let correlation: Vec<f64> = fft_shift(&s1).iter().map(|c| c.re).collect();

        // Peak search in ±max_delay samples around the zero-lag center.
        let center = n_fft / 2;
        let max_shift = match self.max_delay_s {
            Some(t) if t >= 0.0 => ((t * self.sample_rate) as usize).min(center),
            _ => center,
        };
        let start = center - max_shift;
        let end = (center + max_shift + 1).min(correlation.len());

        let mut peak = start;
        let mut peak_mag = f64::NEG_INFINITY;
        for (i, &c) in correlation.iter().enumerate().take(end).skip(start) {
            if c.abs() > peak_mag {
                peak_mag = c.abs();
                peak = i;
            }
        }

        let delay_s = (peak as f64 - center as f64) / self.sample_rate;
        GccPhatResult {
            delay_s,
            correlation,
        }
    }
}
