//! Parallel batch processing
//!
//! Rayon-backed batch variants of the frequency tracker, classifier and
//! array DOA estimator. Enable with the `parallel` feature flag:
//!
//! ```toml
//! [dependencies]
//! echoloc-core = { version = "0.1", features = ["parallel"] }
//! ```
//!
//! All functions here are result-identical to their sequential
//! counterparts; parallelism only changes throughput. It pays off for
//! batches of independent recordings or arrays with many channels; for
//! a single short window the sequential path is usually faster.

use rayon::prelude::*;

use crate::doa_estimator::{DoaEstimator, DoaPairResult};
use crate::frequency_tracker::{FrequencyTrack, FrequencyTracker};
use crate::hybrid_classifier::{HybridClassification, HybridClassifier};
use crate::types::{AudioBuffer, DspResult, MicrophoneGeometry, MIN_BASELINE_M};

/// Track the dominant frequency of many independent recordings, one
/// rayon task per buffer.
pub fn track_batch(tracker: &FrequencyTracker, buffers: &[Vec<f64>]) -> Vec<FrequencyTrack> {
    buffers.par_iter().map(|b| tracker.track(b)).collect()
}

/// Classify many independent windows without motion context, one rayon
/// task per window.
pub fn classify_batch(
    classifier: &HybridClassifier,
    windows: &[Vec<f64>],
) -> DspResult<Vec<HybridClassification>> {
    windows
        .par_iter()
        .map(|w| classifier.classify(w, None))
        .collect()
}

/// Array DOA with the per-pair GCC-PHAT correlations run in parallel.
///
/// Same validation, skipping and ordering rules as
/// [`DoaEstimator::estimate_array`]; results are collected back into
/// channel order.
pub fn doa_array_parallel(
    estimator: &DoaEstimator,
    buffer: &AudioBuffer,
    geometry: &MicrophoneGeometry,
) -> DspResult<Vec<DoaPairResult>> {
    if geometry.num_channels() != buffer.num_channels() {
        return Err(crate::types::DspError::ChannelCountMismatch {
            expected: geometry.num_channels(),
            actual: buffer.num_channels(),
        });
    }
    let ref_channel = geometry.ref_channel();
    let ref_sig = buffer.channel(ref_channel)?;

    let mut channels = Vec::new();
    for channel in 0..buffer.num_channels() {
        if channel == ref_channel {
            continue;
        }
        let distance_m = geometry.baseline_m(channel)?;
        if distance_m <= MIN_BASELINE_M {
            continue;
        }
        channels.push((channel, distance_m));
    }

    channels
        .par_iter()
        .map(|&(channel, distance_m)| {
            let sig = buffer.channel(channel)?;
            estimator.pair_result(ref_sig, sig, ref_channel, channel, distance_m)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MicPosition;
    use std::f64::consts::PI;

    fn tone(freq: f64, fs: f64, n: usize) -> Vec<f64> {
        (0..n).map(|i| (2.0 * PI * freq * i as f64 / fs).sin()).collect()
    }

    fn noise_burst(len: usize, seed: u64) -> Vec<f64> {
        let mut state = seed;
        (0..len)
            .map(|_| {
                state = state
                    .wrapping_mul(6364136223846793005)
                    .wrapping_add(1442695040888963407);
                (state >> 11) as f64 / (1u64 << 53) as f64 - 0.5
            })
            .collect()
    }

    #[test]
    fn test_track_batch_matches_sequential() {
        let fs = 16000.0;
        let buffers: Vec<Vec<f64>> = [440.0, 1000.0, 2500.0]
            .iter()
            .map(|&f| tone(f, fs, 8000))
            .collect();
        let tracker = FrequencyTracker::new(fs);
        let parallel = track_batch(&tracker, &buffers);
        for (buf, par) in buffers.iter().zip(parallel.iter()) {
            assert_eq!(*par, tracker.track(buf));
        }
    }

    #[test]
    fn test_classify_batch_matches_sequential() {
        let fs = 16000.0;
        let windows: Vec<Vec<f64>> = [150.0, 600.0, 5000.0]
            .iter()
            .map(|&f| tone(f, fs, 4096))
            .collect();
        let classifier = HybridClassifier::new(fs);
        let parallel = classify_batch(&classifier, &windows).unwrap();
        for (w, par) in windows.iter().zip(parallel.iter()) {
            assert_eq!(*par, classifier.classify(w, None).unwrap());
        }
    }

    #[test]
    fn test_doa_array_parallel_matches_sequential() {
        let fs = 16000.0;
        let burst = noise_burst(200, 99);
        let mut channels = Vec::new();
        for shift in [0usize, 2, 4, 6] {
            let mut ch = vec![0.0; 2048];
            ch[300 + shift..300 + shift + burst.len()].copy_from_slice(&burst);
            channels.push(ch);
        }
        let buffer = AudioBuffer::multi(channels, fs).unwrap();
        let geometry = MicrophoneGeometry::new(
            vec![
                MicPosition::new_2d(0.0, 0.0),
                MicPosition::new_2d(1.5, 0.0),
                MicPosition::new_2d(3.0, 0.0),
                MicPosition::new_2d(4.5, 0.0),
            ],
            0,
        )
        .unwrap();

        let estimator = DoaEstimator::new(fs);
        let parallel = doa_array_parallel(&estimator, &buffer, &geometry).unwrap();
        let sequential = estimator.estimate_array(&buffer, &geometry).unwrap();
        assert_eq!(parallel, sequential);
    }
}
