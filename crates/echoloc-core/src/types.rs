//! Core types for acoustic geolocation and motion inference
//!
//! This module defines the fundamental value types shared across the
//! estimator blocks: sample buffers, microphone geometry, and the error
//! taxonomy.
//!
//! ## Buffer ownership
//!
//! Every estimator borrows an [`AudioBuffer`] (or a raw `&[f64]` slice)
//! read-only and copies into transient work buffers as needed for
//! zero-padding and windowing. Nothing in this crate mutates caller data
//! or holds state between calls.
//!
//! ## Error policy
//!
//! Structural and configuration problems (mismatched channel counts,
//! degenerate geometry, invalid band tables) are reported as typed
//! [`DspError`] values. Numerical edge cases that are expected in real
//! field recordings (silence, near-zero denominators, short frames) are
//! absorbed into documented fallback values by the individual estimators
//! and never raise.

use serde::{Deserialize, Serialize};

/// A floating point audio sample.
pub type Sample = f64;

/// Speed of sound in dry air at ~20 C sea level, in m/s.
///
/// Underwater deployments should override this with ~1500 m/s on the
/// estimators that accept a speed-of-sound parameter.
pub const SPEED_OF_SOUND_AIR: f64 = 343.0;

/// Microphone baselines below this length (metres) are treated as
/// coincident and skipped in pairwise estimates.
pub const MIN_BASELINE_M: f64 = 1e-6;

/// Result type for DSP operations.
pub type DspResult<T> = Result<T, DspError>;

/// Errors that can occur during DSP operations.
///
/// Only structural/configuration problems appear here; numerical edge
/// cases degrade to documented fallback values instead.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DspError {
    #[error("channel length mismatch: expected {expected} samples, got {actual}")]
    ChannelLengthMismatch { expected: usize, actual: usize },

    #[error("channel count mismatch: geometry has {expected} positions, buffer has {actual} channels")]
    ChannelCountMismatch { expected: usize, actual: usize },

    #[error("channel {channel} out of range for {num_channels}-channel buffer")]
    ChannelOutOfRange { channel: usize, num_channels: usize },

    #[error("degenerate geometry: microphone baseline {distance_m} m is below the usable minimum")]
    DegenerateGeometry { distance_m: f64 },

    #[error("band table is empty")]
    EmptyBandTable,

    #[error("invalid band {name:?}: [{low_hz}, {high_hz}) Hz is not a valid range")]
    InvalidBand {
        name: String,
        low_hz: f64,
        high_hz: f64,
    },

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

/// A borrowed-by-the-core, caller-owned block of audio.
///
/// Channel-major storage: `channels[c][n]` is sample `n` of channel `c`.
/// All channels share the same length and sample rate; this invariant is
/// enforced at construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioBuffer {
    channels: Vec<Vec<f64>>,
    sample_rate: f64,
}

impl AudioBuffer {
    /// Create a single-channel buffer.
    pub fn mono(samples: Vec<f64>, sample_rate: f64) -> DspResult<Self> {
        Self::multi(vec![samples], sample_rate)
    }

    /// Create a multi-channel buffer from channel-major sample vectors.
    ///
    /// Fails with [`DspError::ChannelLengthMismatch`] if the channels do
    /// not all have the same length.
    pub fn multi(channels: Vec<Vec<f64>>, sample_rate: f64) -> DspResult<Self> {
        if sample_rate <= 0.0 {
            return Err(DspError::InvalidParameter(format!(
                "sample rate must be positive, got {sample_rate}"
            )));
        }
        if channels.is_empty() {
            return Err(DspError::InvalidParameter(
                "buffer must have at least one channel".into(),
            ));
        }
        let expected = channels[0].len();
        for ch in &channels {
            if ch.len() != expected {
                return Err(DspError::ChannelLengthMismatch {
                    expected,
                    actual: ch.len(),
                });
            }
        }
        Ok(Self {
            channels,
            sample_rate,
        })
    }

    /// Create a buffer from interleaved samples (frame-major, as produced
    /// by most capture hardware): `[c0, c1, .., cN, c0, c1, ..]`.
    pub fn from_interleaved(
        samples: &[f64],
        num_channels: usize,
        sample_rate: f64,
    ) -> DspResult<Self> {
        if num_channels == 0 {
            return Err(DspError::InvalidParameter(
                "buffer must have at least one channel".into(),
            ));
        }
        if samples.len() % num_channels != 0 {
            return Err(DspError::InvalidParameter(format!(
                "interleaved length {} is not a multiple of {} channels",
                samples.len(),
                num_channels
            )));
        }
        let frames = samples.len() / num_channels;
        let mut channels = vec![Vec::with_capacity(frames); num_channels];
        for frame in samples.chunks_exact(num_channels) {
            for (c, &s) in frame.iter().enumerate() {
                channels[c].push(s);
            }
        }
        Self::multi(channels, sample_rate)
    }

    /// Samples of one channel.
    pub fn channel(&self, index: usize) -> DspResult<&[f64]> {
        self.channels
            .get(index)
            .map(|c| c.as_slice())
            .ok_or(DspError::ChannelOutOfRange {
                channel: index,
                num_channels: self.channels.len(),
            })
    }

    /// All channels, channel-major.
    pub fn channels(&self) -> &[Vec<f64>] {
        &self.channels
    }

    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    /// Samples per channel.
    pub fn len(&self) -> usize {
        self.channels.first().map_or(0, |c| c.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn duration_s(&self) -> f64 {
        self.len() as f64 / self.sample_rate
    }
}

/// 3-D microphone position in metres. Planar arrays use `z = 0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MicPosition {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl MicPosition {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Planar position with `z = 0`.
    pub fn new_2d(x: f64, y: f64) -> Self {
        Self { x, y, z: 0.0 }
    }

    /// Euclidean distance to another position, in metres.
    pub fn distance_to(&self, other: &MicPosition) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2) + (self.z - other.z).powi(2))
            .sqrt()
    }
}

/// Positions of the microphones in a capture array, with a designated
/// reference channel for pairwise delay estimation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MicrophoneGeometry {
    positions: Vec<MicPosition>,
    ref_channel: usize,
}

impl MicrophoneGeometry {
    /// Create a geometry. `ref_channel` must index into `positions`.
    pub fn new(positions: Vec<MicPosition>, ref_channel: usize) -> DspResult<Self> {
        if ref_channel >= positions.len() {
            return Err(DspError::ChannelOutOfRange {
                channel: ref_channel,
                num_channels: positions.len(),
            });
        }
        Ok(Self {
            positions,
            ref_channel,
        })
    }

    pub fn positions(&self) -> &[MicPosition] {
        &self.positions
    }

    pub fn ref_channel(&self) -> usize {
        self.ref_channel
    }

    pub fn num_channels(&self) -> usize {
        self.positions.len()
    }

    /// Baseline length between a channel and the reference channel, in
    /// metres.
    pub fn baseline_m(&self, channel: usize) -> DspResult<f64> {
        let pos = self
            .positions
            .get(channel)
            .ok_or(DspError::ChannelOutOfRange {
                channel,
                num_channels: self.positions.len(),
            })?;
        Ok(pos.distance_to(&self.positions[self.ref_channel]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mono_buffer() {
        let buf = AudioBuffer::mono(vec![0.0; 128], 16000.0).unwrap();
        assert_eq!(buf.num_channels(), 1);
        assert_eq!(buf.len(), 128);
        assert!((buf.duration_s() - 0.008).abs() < 1e-12);
    }

    #[test]
    fn test_multi_channel_length_mismatch() {
        let err = AudioBuffer::multi(vec![vec![0.0; 10], vec![0.0; 9]], 16000.0).unwrap_err();
        assert_eq!(
            err,
            DspError::ChannelLengthMismatch {
                expected: 10,
                actual: 9
            }
        );
    }

    #[test]
    fn test_invalid_sample_rate() {
        let err = AudioBuffer::mono(vec![0.0; 4], 0.0).unwrap_err();
        assert!(matches!(err, DspError::InvalidParameter(_)));
    }

    #[test]
    fn test_from_interleaved() {
        let buf = AudioBuffer::from_interleaved(&[1.0, 10.0, 2.0, 20.0, 3.0, 30.0], 2, 8000.0)
            .unwrap();
        assert_eq!(buf.channel(0).unwrap(), &[1.0, 2.0, 3.0]);
        assert_eq!(buf.channel(1).unwrap(), &[10.0, 20.0, 30.0]);
    }

    #[test]
    fn test_from_interleaved_ragged() {
        let err = AudioBuffer::from_interleaved(&[1.0, 2.0, 3.0], 2, 8000.0).unwrap_err();
        assert!(matches!(err, DspError::InvalidParameter(_)));
    }

    #[test]
    fn test_channel_out_of_range() {
        let buf = AudioBuffer::mono(vec![0.0; 4], 16000.0).unwrap();
        let err = buf.channel(3).unwrap_err();
        assert_eq!(
            err,
            DspError::ChannelOutOfRange {
                channel: 3,
                num_channels: 1
            }
        );
    }

    #[test]
    fn test_mic_distance() {
        let a = MicPosition::new(0.0, 0.0, 0.0);
        let b = MicPosition::new(3.0, 4.0, 0.0);
        assert!((a.distance_to(&b) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_geometry_ref_channel_validation() {
        let err = MicrophoneGeometry::new(vec![MicPosition::new_2d(0.0, 0.0)], 1).unwrap_err();
        assert_eq!(
            err,
            DspError::ChannelOutOfRange {
                channel: 1,
                num_channels: 1
            }
        );
    }

    #[test]
    fn test_geometry_baseline() {
        let geom = MicrophoneGeometry::new(
            vec![MicPosition::new_2d(0.0, 0.0), MicPosition::new_2d(0.05, 0.0)],
            0,
        )
        .unwrap();
        assert!((geom.baseline_m(1).unwrap() - 0.05).abs() < 1e-12);
    }
}
