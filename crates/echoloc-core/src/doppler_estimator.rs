//! Doppler velocity estimation from frequency shift
//!
//! Estimates the radial velocity of a moving sound source from the
//! shift of its dominant frequency, either between two consecutive
//! chunks or across a whole [`FrequencyTrack`].
//!
//! Physics: a source emitting `f0` and moving at radial velocity `v`
//! relative to a stationary observer is heard at
//!
//! ```text
//! f_observed = f0 * c / (c -/+ v)      (approaching / receding)
//! ```
//!
//! which rearranges to the form computed here:
//!
//! ```text
//! v = c * (f_observed - f0) / f_observed
//! ```
//!
//! Positive velocity means approaching. A frequency *shift* is the only
//! valid input to this equation — cross-correlation delay measures
//! arrival-time difference, belongs to [`crate::gcc_phat`], and must
//! never be fed into the velocity formula.
//!
//! Fallback policy (absorbed, never raised, and echoed in the result so
//! callers can surface them): an unknown source frequency defaults to
//! the first chunk's (or first nonzero tracked) frequency, 1.0 Hz if
//! that is zero, 1000 Hz for an entirely silent track; chunks too short
//! to analyze degrade to a 0 Hz estimate and a stationary label.
//!
//! ## Example
//!
//! ```rust
//! use echoloc_core::doppler_estimator::{DopplerEstimator, MotionDirection};
//!
//! let fs = 16000.0;
//! let tone = |f: f64| -> Vec<f64> {
//!     (0..8192).map(|i| (2.0 * std::f64::consts::PI * f * i as f64 / fs).sin()).collect()
//! };
//!
//! // Observed frequency rises 1000 -> 1020 Hz: the source approaches.
//! let est = DopplerEstimator::new(fs).fft_size(8192);
//! let result = est.velocity_between(&tone(1000.0), &tone(1020.0));
//! assert_eq!(result.direction, MotionDirection::Approaching);
//! assert!(result.velocity_mps > 0.0);
//! ```

use crate::frequency_tracker::{FrequencyTrack, FrequencyTracker, DEFAULT_FRAME_S, DEFAULT_HOP_S};
use crate::spectral_peak::SpectralPeakEstimator;
use crate::types::SPEED_OF_SOUND_AIR;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Frequency deltas smaller than this are labelled stationary. Chosen
/// to absorb FFT bin-resolution noise at typical frame sizes.
pub const DIRECTION_TOLERANCE_HZ: f64 = 2.0;

/// Velocities at or below this magnitude (m/s) produce no travel-time
/// estimate; dividing a distance by a near-zero speed would report a
/// meaningless near-infinite time.
pub const MIN_TRAVEL_VELOCITY_MPS: f64 = 0.1;

/// Fallback source frequency for an entirely silent track, in Hz.
const SILENT_TRACK_FALLBACK_HZ: f64 = 1000.0;

/// Motion label derived from the sign of the frequency shift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MotionDirection {
    Approaching,
    Receding,
    Stationary,
}

impl MotionDirection {
    /// Classify a frequency delta with the stationary tolerance band.
    pub fn from_delta(delta_hz: f64) -> Self {
        if delta_hz.abs() < DIRECTION_TOLERANCE_HZ {
            MotionDirection::Stationary
        } else if delta_hz > 0.0 {
            MotionDirection::Approaching
        } else {
            MotionDirection::Receding
        }
    }
}

impl fmt::Display for MotionDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MotionDirection::Approaching => "approaching",
            MotionDirection::Receding => "receding",
            MotionDirection::Stationary => "stationary",
        };
        f.write_str(s)
    }
}

/// Two-chunk Doppler estimate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DopplerEstimate {
    /// Dominant frequency of the first chunk, in Hz.
    pub f1_hz: f64,
    /// Dominant frequency of the second chunk, in Hz.
    pub f2_hz: f64,
    /// Frequency shift `f2 - f1`, in Hz.
    pub delta_hz: f64,
    /// Estimated radial velocity in m/s; positive = approaching.
    pub velocity_mps: f64,
    pub direction: MotionDirection,
    /// Source frequency used (caller-supplied, or the documented
    /// fallback — echoed so callers can log defaulting decisions).
    pub source_frequency_hz: f64,
    pub speed_of_sound_mps: f64,
}

/// Per-frame result of a full-track analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DopplerFrame {
    /// Frame center time, in seconds.
    pub time_s: f64,
    /// Tracked dominant frequency, in Hz.
    pub frequency_hz: f64,
    /// Shift relative to the source frequency, in Hz.
    pub delta_hz: f64,
    /// Radial velocity in m/s; positive = approaching.
    pub velocity_mps: f64,
    pub direction: MotionDirection,
    /// `distance / |velocity|` when a propagation distance was supplied
    /// and the speed is above [`MIN_TRAVEL_VELOCITY_MPS`].
    pub travel_time_s: Option<f64>,
}

/// Aggregate statistics over a full-track analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DopplerSummary {
    pub mean_velocity_mps: f64,
    pub max_abs_velocity_mps: f64,
    /// Majority-vote direction over all frames.
    pub dominant_direction: MotionDirection,
    pub num_frames: usize,
    pub duration_s: f64,
    /// Mean of the defined per-frame travel times, if any.
    pub mean_travel_time_s: Option<f64>,
}

/// Full-track Doppler analysis: the underlying frequency track,
/// per-frame estimates, and a summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DopplerTrackResult {
    pub track: FrequencyTrack,
    pub frames: Vec<DopplerFrame>,
    pub summary: DopplerSummary,
}

/// Motion context for downstream fusion (hybrid classification).
///
/// Collapses either a two-chunk estimate or a track summary into the
/// velocity/direction pair the classifier cares about.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotionContext {
    pub velocity_mps: f64,
    pub direction: MotionDirection,
}

impl MotionContext {
    pub fn is_moving(&self) -> bool {
        self.direction != MotionDirection::Stationary
    }
}

impl From<&DopplerEstimate> for MotionContext {
    fn from(estimate: &DopplerEstimate) -> Self {
        Self {
            velocity_mps: estimate.velocity_mps,
            direction: estimate.direction,
        }
    }
}

impl From<&DopplerSummary> for MotionContext {
    fn from(summary: &DopplerSummary) -> Self {
        Self {
            velocity_mps: summary.mean_velocity_mps,
            direction: summary.dominant_direction,
        }
    }
}

/// FFT-frequency-shift Doppler estimator.
#[derive(Debug, Clone)]
pub struct DopplerEstimator {
    sample_rate: f64,
    speed_of_sound: f64,
    source_frequency: Option<f64>,
    fft_size: usize,
}

impl DopplerEstimator {
    pub fn new(sample_rate: f64) -> Self {
        Self {
            sample_rate,
            speed_of_sound: SPEED_OF_SOUND_AIR,
            source_frequency: None,
            fft_size: 4096,
        }
    }

    /// Override the propagation speed (e.g. ~1500 m/s underwater).
    pub fn speed_of_sound(mut self, speed_of_sound: f64) -> Self {
        self.speed_of_sound = speed_of_sound;
        self
    }

    /// Known emission frequency of the source. Without it, the first
    /// chunk (or first nonzero tracked frame) serves as the reference —
    /// which assumes the recording starts with the source effectively
    /// stationary.
    pub fn source_frequency(mut self, frequency_hz: f64) -> Self {
        self.source_frequency = Some(frequency_hz);
        self
    }

    /// FFT size for the two-chunk path (default 4096).
    pub fn fft_size(mut self, fft_size: usize) -> Self {
        self.fft_size = fft_size;
        self
    }

    /// Velocity estimate from two consecutive chunks.
    ///
    /// Chunks shorter than the FFT size are zero-padded; a chunk with no
    /// detectable peak degrades to a 0 Hz estimate and a stationary
    /// label rather than failing.
    pub fn velocity_between(&self, chunk1: &[f64], chunk2: &[f64]) -> DopplerEstimate {
        let peak = SpectralPeakEstimator::new(self.sample_rate, self.fft_size);
        let f1 = peak.estimate(chunk1);
        let f2 = peak.estimate(chunk2);

        let source_frequency_hz = match self.source_frequency {
            Some(f0) => f0,
            // 1.0 Hz guards the silent-first-chunk case against division
            // misuse downstream; the value is echoed in the result.
            None if f1 > 0.0 => f1,
            None => 1.0,
        };

        let delta_hz = f2 - f1;
        let velocity_mps = if f2 > 0.0 {
            self.speed_of_sound * delta_hz / f2
        } else {
            0.0
        };

        DopplerEstimate {
            f1_hz: f1,
            f2_hz: f2,
            delta_hz,
            velocity_mps,
            direction: MotionDirection::from_delta(delta_hz),
            source_frequency_hz,
            speed_of_sound_mps: self.speed_of_sound,
        }
    }

    /// Per-frame Doppler analysis of an existing frequency track.
    ///
    /// `distance_m`, if given, adds a travel-time estimate to every
    /// frame whose speed exceeds [`MIN_TRAVEL_VELOCITY_MPS`]. The
    /// summary duration is derived from the frame timestamps; prefer
    /// [`DopplerEstimator::analyze`] when the raw buffer is at hand.
    pub fn analyze_track(
        &self,
        track: &FrequencyTrack,
        distance_m: Option<f64>,
    ) -> DopplerTrackResult {
        let source_frequency_hz = match self.source_frequency {
            Some(f0) => f0,
            None => track
                .frequencies
                .iter()
                .copied()
                .find(|&f| f > 0.0)
                .unwrap_or(SILENT_TRACK_FALLBACK_HZ),
        };

        let mut frames = Vec::with_capacity(track.len());
        for (time_s, frequency_hz) in track.iter() {
            let delta_hz = frequency_hz - source_frequency_hz;
            let velocity_mps = if frequency_hz > 0.0 {
                self.speed_of_sound * delta_hz / frequency_hz
            } else {
                0.0
            };
            let travel_time_s = distance_m.and_then(|d| {
                if velocity_mps.abs() > MIN_TRAVEL_VELOCITY_MPS {
                    Some(d / velocity_mps.abs())
                } else {
                    None
                }
            });
            frames.push(DopplerFrame {
                time_s,
                frequency_hz,
                delta_hz,
                velocity_mps,
                direction: MotionDirection::from_delta(delta_hz),
                travel_time_s,
            });
        }

        let summary = Self::summarize(&frames, track);
        DopplerTrackResult {
            track: track.clone(),
            frames,
            summary,
        }
    }

    /// Full analysis of a raw mono buffer: build the frequency track,
    /// then analyze it. `frame_length_s`/`hop_length_s` control the
    /// framing (see [`DEFAULT_FRAME_S`], [`DEFAULT_HOP_S`]).
    pub fn analyze(
        &self,
        samples: &[f64],
        frame_length_s: f64,
        hop_length_s: f64,
        distance_m: Option<f64>,
    ) -> DopplerTrackResult {
        let track = FrequencyTracker::new(self.sample_rate)
            .frame_length(frame_length_s)
            .hop_length(hop_length_s)
            .track(samples);
        let mut result = self.analyze_track(&track, distance_m);
        // Exact duration is known here, unlike in analyze_track.
        result.summary.duration_s = samples.len() as f64 / self.sample_rate;
        result
    }

    /// Same as [`DopplerEstimator::analyze`] with the default framing.
    pub fn analyze_default(&self, samples: &[f64], distance_m: Option<f64>) -> DopplerTrackResult {
        self.analyze(samples, DEFAULT_FRAME_S, DEFAULT_HOP_S, distance_m)
    }

    fn summarize(frames: &[DopplerFrame], track: &FrequencyTrack) -> DopplerSummary {
        let n = frames.len();
        let mean_velocity_mps = if n > 0 {
            frames.iter().map(|f| f.velocity_mps).sum::<f64>() / n as f64
        } else {
            0.0
        };
        let max_abs_velocity_mps = frames
            .iter()
            .map(|f| f.velocity_mps.abs())
            .fold(0.0, f64::max);

        // Majority vote; ties resolve in the fixed order below, which
        // keeps the result deterministic.
        let mut dominant_direction = MotionDirection::Stationary;
        let mut best_count = 0usize;
        for dir in [
            MotionDirection::Stationary,
            MotionDirection::Approaching,
            MotionDirection::Receding,
        ] {
            let count = frames.iter().filter(|f| f.direction == dir).count();
            if count > best_count {
                best_count = count;
                dominant_direction = dir;
            }
        }

        let travel_times: Vec<f64> = frames.iter().filter_map(|f| f.travel_time_s).collect();
        let mean_travel_time_s = if travel_times.is_empty() {
            None
        } else {
            Some(travel_times.iter().sum::<f64>() / travel_times.len() as f64)
        };

        // Frame centers are symmetric about the buffer: first center +
        // last center spans the framed extent.
        let duration_s = match (track.times.first(), track.times.last()) {
            (Some(first), Some(last)) => first + last,
            _ => 0.0,
        };

        DopplerSummary {
            mean_velocity_mps,
            max_abs_velocity_mps,
            dominant_direction,
            num_frames: n,
            duration_s,
            mean_travel_time_s,
        }
    }
}
