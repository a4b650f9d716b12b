//! Dominant-frequency tracking over time
//!
//! Frames a mono buffer with overlapping windows and applies the
//! spectral peak estimator to each frame, producing a time series of
//! dominant frequency. This track is the only bridge between raw audio
//! and the Doppler estimator: velocity is computed from how the tracked
//! frequency moves, never from cross-correlation delay.
//!
//! Frame count is `max(1, floor((N - frame_samples) / hop_samples) + 1)`;
//! a buffer shorter than one frame still yields a single (zero-padded)
//! frame. Each frame's timestamp is the frame center.
//!
//! ## Example
//!
//! ```rust
//! use echoloc_core::frequency_tracker::FrequencyTracker;
//!
//! let fs = 16000.0;
//! let tone: Vec<f64> = (0..16000)
//!     .map(|i| (2.0 * std::f64::consts::PI * 1000.0 * i as f64 / fs).sin())
//!     .collect();
//!
//! let track = FrequencyTracker::new(fs).track(&tone);
//! assert_eq!(track.len(), 19); // (16000 - 1600) / 800 + 1
//! assert!(track.frequencies.iter().all(|f| (f - 1000.0).abs() < 15.0));
//! ```

use crate::spectral_peak::{SpectralPeakEstimator, DEFAULT_HIGH_HZ, DEFAULT_LOW_HZ};
use serde::{Deserialize, Serialize};

/// Default analysis frame length in seconds.
pub const DEFAULT_FRAME_S: f64 = 0.1;
/// Default hop between frame starts in seconds.
pub const DEFAULT_HOP_S: f64 = 0.05;

/// Paired frame-center times (seconds) and dominant frequencies (Hz).
///
/// Immutable after creation; recomputing from the same buffer and
/// configuration reproduces it bit-for-bit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrequencyTrack {
    pub times: Vec<f64>,
    pub frequencies: Vec<f64>,
}

impl FrequencyTrack {
    /// Number of frames.
    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Iterate over `(time_s, frequency_hz)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.times.iter().copied().zip(self.frequencies.iter().copied())
    }
}

/// Overlapped-frame dominant-frequency tracker.
#[derive(Debug, Clone)]
pub struct FrequencyTracker {
    sample_rate: f64,
    frame_length_s: f64,
    hop_length_s: f64,
    low_hz: f64,
    high_hz: f64,
}

impl FrequencyTracker {
    pub fn new(sample_rate: f64) -> Self {
        Self {
            sample_rate,
            frame_length_s: DEFAULT_FRAME_S,
            hop_length_s: DEFAULT_HOP_S,
            low_hz: DEFAULT_LOW_HZ,
            high_hz: DEFAULT_HIGH_HZ,
        }
    }

    /// Frame length in seconds. Sets the per-frame FFT size and thus the
    /// track's frequency resolution (`sample_rate / frame_samples`).
    pub fn frame_length(mut self, seconds: f64) -> Self {
        self.frame_length_s = seconds;
        self
    }

    /// Hop between frame starts in seconds.
    pub fn hop_length(mut self, seconds: f64) -> Self {
        self.hop_length_s = seconds;
        self
    }

    /// Search band passed through to the spectral peak estimator.
    pub fn band(mut self, low_hz: f64, high_hz: f64) -> Self {
        self.low_hz = low_hz;
        self.high_hz = high_hz;
        self
    }

    /// Build the frequency track for a mono buffer.
    ///
    /// The input is only read; each frame is copied into the estimator's
    /// transient FFT buffer.
    pub fn track(&self, samples: &[f64]) -> FrequencyTrack {
        let frame_samples = ((self.frame_length_s * self.sample_rate) as usize).max(1);
        let hop_samples = ((self.hop_length_s * self.sample_rate) as usize).max(1);

        let n = samples.len();
        let n_frames = if n >= frame_samples {
            (n - frame_samples) / hop_samples + 1
        } else {
            1
        };

        let estimator = SpectralPeakEstimator::new(self.sample_rate, frame_samples)
            .band(self.low_hz, self.high_hz);

        let mut times = Vec::with_capacity(n_frames);
        let mut frequencies = Vec::with_capacity(n_frames);
        for i in 0..n_frames {
            let start = i * hop_samples;
            let end = start + frame_samples;
            let frame = &samples[start.min(n)..end.min(n)];
            times.push((start + end) as f64 / 2.0 / self.sample_rate);
            frequencies.push(estimator.estimate(frame));
        }

        FrequencyTrack { times, frequencies }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn tone(freq: f64, fs: f64, n: usize) -> Vec<f64> {
        (0..n).map(|i| (2.0 * PI * freq * i as f64 / fs).sin()).collect()
    }

    #[test]
    fn test_frame_count_formula() {
        let fs = 16000.0;
        let tracker = FrequencyTracker::new(fs); // frame 1600, hop 800
        for n in [16000usize, 15999, 1600, 1601, 2399, 2400, 100, 0] {
            let track = tracker.track(&vec![0.0; n]);
            let expected = if n >= 1600 { (n - 1600) / 800 + 1 } else { 1 };
            assert_eq!(track.len(), expected, "n={n}");
            assert_eq!(track.times.len(), track.frequencies.len());
        }
    }

    #[test]
    fn test_frame_center_times() {
        let fs = 16000.0;
        let track = FrequencyTracker::new(fs).track(&vec![0.0; 3200]);
        // Frames start at 0 and 800; centers at (0+1600)/2 and (800+2400)/2.
        assert_eq!(track.len(), 3);
        assert!((track.times[0] - 0.05).abs() < 1e-12);
        assert!((track.times[1] - 0.1).abs() < 1e-12);
        assert!((track.times[2] - 0.15).abs() < 1e-12);
    }

    #[test]
    fn test_constant_tone_track() {
        let fs = 16000.0;
        let track = FrequencyTracker::new(fs).track(&tone(1000.0, fs, 16000));
        assert_eq!(track.len(), 19);
        for (_, f) in track.iter() {
            assert!((f - 1000.0).abs() < 15.0, "f={f}");
        }
    }

    #[test]
    fn test_short_buffer_single_zero_padded_frame() {
        let fs = 16000.0;
        // 400 samples of tone, frame is 1600: one zero-padded frame.
        let track = FrequencyTracker::new(fs).track(&tone(1000.0, fs, 400));
        assert_eq!(track.len(), 1);
        assert!((track.frequencies[0] - 1000.0).abs() < 25.0);
    }

    #[test]
    fn test_silence_tracks_zero() {
        let track = FrequencyTracker::new(16000.0).track(&vec![0.0; 8000]);
        assert!(track.frequencies.iter().all(|&f| f == 0.0));
    }

    #[test]
    fn test_band_restriction_applies_per_frame() {
        let fs = 16000.0;
        let samples: Vec<f64> = (0..8000)
            .map(|i| {
                let t = i as f64 / fs;
                (2.0 * PI * 400.0 * t).sin() + 0.3 * (2.0 * PI * 5000.0 * t).sin()
            })
            .collect();
        let track = FrequencyTracker::new(fs).band(2000.0, 8000.0).track(&samples);
        for (_, f) in track.iter() {
            assert!((f - 5000.0).abs() < 20.0, "f={f}");
        }
    }

    #[test]
    fn test_recompute_is_bit_identical() {
        let fs = 16000.0;
        let samples = tone(777.0, fs, 6400);
        let tracker = FrequencyTracker::new(fs);
        assert_eq!(tracker.track(&samples), tracker.track(&samples));
    }
}
