//! Direction of Arrival estimation from pairwise time delays
//!
//! Converts GCC-PHAT time-delay estimates into arrival angles using the
//! known microphone geometry. For a pair with baseline `d` and measured
//! delay `tau`:
//!
//! ```text
//! angle = asin( clamp(c * tau / d, -1, 1) )
//! ```
//!
//! with `c` the speed of sound. The clamp is mandatory: measurement
//! noise routinely pushes the argument slightly outside `[-1, 1]` and
//! must saturate at endfire rather than produce a domain error.
//!
//! Angles are in degrees, 0 = broadside (source perpendicular to the
//! baseline), +/-90 = endfire; the sign follows the delay sign.
//!
//! For an array, every non-reference channel is paired with the
//! reference channel. Per-pair results are returned unaggregated — how
//! to fuse them is the caller's decision, though [`DoaEstimator::fuse_pairs`]
//! offers a baseline-weighted average for convenience.
//!
//! ## Example
//!
//! ```rust
//! use echoloc_core::doa_estimator::DoaEstimator;
//!
//! let fs = 16000.0;
//! // Broadband burst arriving 3 samples later on mic 2 (0.5 m baseline).
//! let mut m1 = vec![0.0; 1024];
//! let mut m2 = vec![0.0; 1024];
//! for i in 0..64 {
//!     let s = (i as f64 * 1.1).sin() * (-((i as f64 - 32.0) / 10.0).powi(2)).exp();
//!     m1[200 + i] = s;
//!     m2[203 + i] = s;
//! }
//! let angle = DoaEstimator::new(fs).estimate_pair(&m2, &m1, 0.5).unwrap();
//! let expected = (343.0 * 3.0 / fs / 0.5).asin().to_degrees();
//! assert!((angle - expected).abs() < 3.0);
//! ```

use crate::gcc_phat::GccPhatCorrelator;
use crate::types::{
    AudioBuffer, DspError, DspResult, MicrophoneGeometry, MIN_BASELINE_M, SPEED_OF_SOUND_AIR,
};
use serde::{Deserialize, Serialize};

/// DOA estimate for one microphone pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoaPairResult {
    /// Reference channel of the pair.
    pub ref_channel: usize,
    /// Non-reference channel of the pair.
    pub channel: usize,
    /// Baseline length between the two microphones, in metres.
    pub distance_m: f64,
    /// Estimated time difference of arrival, in seconds.
    pub delay_s: f64,
    /// Arrival angle in degrees, -90..=90, 0 = broadside.
    pub angle_deg: f64,
}

/// Pairwise and array DOA estimator.
#[derive(Debug, Clone)]
pub struct DoaEstimator {
    sample_rate: f64,
    speed_of_sound: f64,
}

impl DoaEstimator {
    pub fn new(sample_rate: f64) -> Self {
        Self {
            sample_rate,
            speed_of_sound: SPEED_OF_SOUND_AIR,
        }
    }

    /// Override the propagation speed (e.g. ~1500 m/s underwater).
    pub fn speed_of_sound(mut self, speed_of_sound: f64) -> Self {
        self.speed_of_sound = speed_of_sound;
        self
    }

    /// Arrival angle for one microphone pair, in degrees.
    ///
    /// The GCC-PHAT search window is limited to the physical maximum
    /// delay `mic_distance / speed_of_sound`. Fails with
    /// [`DspError::DegenerateGeometry`] when the baseline is too short
    /// to carry direction information.
    pub fn estimate_pair(
        &self,
        sig1: &[f64],
        sig2: &[f64],
        mic_distance: f64,
    ) -> DspResult<f64> {
        let result = self.pair_result(sig1, sig2, 0, 1, mic_distance)?;
        Ok(result.angle_deg)
    }

    /// Per-pair DOA for every non-reference channel of a multi-channel
    /// buffer.
    ///
    /// Channels whose position coincides with the reference microphone
    /// (baseline below [`MIN_BASELINE_M`]) carry no direction
    /// information and are skipped, not errors. Results are ordered by
    /// channel index and deliberately unaggregated.
    pub fn estimate_array(
        &self,
        buffer: &AudioBuffer,
        geometry: &MicrophoneGeometry,
    ) -> DspResult<Vec<DoaPairResult>> {
        let channels = self.array_channels(buffer, geometry)?;
        let ref_channel = geometry.ref_channel();
        let ref_sig = buffer.channel(ref_channel)?;

        let mut results = Vec::with_capacity(channels.len());
        for (channel, distance_m) in channels {
            let sig = buffer.channel(channel)?;
            results.push(self.pair_result(ref_sig, sig, ref_channel, channel, distance_m)?);
        }
        Ok(results)
    }

    /// Optional fusion: baseline-length-weighted mean angle over a set
    /// of pair results (longer baselines resolve delay more finely).
    ///
    /// Returns `None` for an empty set. The per-pair results remain the
    /// primary output; this is a convenience on top of them.
    pub fn fuse_pairs(pairs: &[DoaPairResult]) -> Option<f64> {
        let total: f64 = pairs.iter().map(|p| p.distance_m).sum();
        if pairs.is_empty() || total <= 0.0 {
            return None;
        }
        Some(pairs.iter().map(|p| p.angle_deg * p.distance_m).sum::<f64>() / total)
    }

    /// Validate buffer/geometry agreement and list the usable
    /// (channel, baseline) pairs.
    fn array_channels(
        &self,
        buffer: &AudioBuffer,
        geometry: &MicrophoneGeometry,
    ) -> DspResult<Vec<(usize, f64)>> {
        if geometry.num_channels() != buffer.num_channels() {
            return Err(DspError::ChannelCountMismatch {
                expected: geometry.num_channels(),
                actual: buffer.num_channels(),
            });
        }
        let ref_channel = geometry.ref_channel();
        let mut channels = Vec::new();
        for channel in 0..buffer.num_channels() {
            if channel == ref_channel {
                continue;
            }
            let distance_m = geometry.baseline_m(channel)?;
            if distance_m <= MIN_BASELINE_M {
                continue; // coincident with the reference mic
            }
            channels.push((channel, distance_m));
        }
        Ok(channels)
    }

    pub(crate) fn pair_result(
        &self,
        ref_sig: &[f64],
        sig: &[f64],
        ref_channel: usize,
        channel: usize,
        distance_m: f64,
    ) -> DspResult<DoaPairResult> {
        if distance_m <= MIN_BASELINE_M {
            return Err(DspError::DegenerateGeometry { distance_m });
        }
        let max_delay = distance_m / self.speed_of_sound;
        let correlation = GccPhatCorrelator::new(self.sample_rate)
            .max_delay(max_delay)
            .correlate(ref_sig, sig);
        let delay_s = correlation.delay_s;
        Ok(DoaPairResult {
            ref_channel,
            channel,
            distance_m,
            delay_s,
            angle_deg: self.angle_from_delay(delay_s, distance_m),
        })
    }

    /// `asin(clamp(c * tau / d))` in degrees.
    fn angle_from_delay(&self, delay_s: f64, distance_m: f64) -> f64 {
        let arg = (self.speed_of_sound * delay_s / distance_m).clamp(-1.0, 1.0);
        arg.asin().to_degrees()
    }
}
