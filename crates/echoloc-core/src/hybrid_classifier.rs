//! Hybrid source classification — band energies fused with motion
//!
//! Scores candidate source labels from the band-energy profile of a
//! window, then adjusts the ranking with Doppler-derived motion
//! context: a moving source makes motion-capable labels (drone,
//! vehicle, aircraft) more plausible and static ones less so.
//!
//! The scores are heuristic ranking weights in `[0, 1]`, not calibrated
//! probabilities; they order hypotheses and nothing more.
//!
//! ## Example
//!
//! ```rust
//! use echoloc_core::hybrid_classifier::HybridClassifier;
//!
//! let fs = 16000.0;
//! let hum: Vec<f64> = (0..4096)
//!     .map(|i| (2.0 * std::f64::consts::PI * 200.0 * i as f64 / fs).sin())
//!     .collect();
//!
//! let result = HybridClassifier::new(fs).classify(&hum, None).unwrap();
//! assert!(!result.candidates.is_empty());
//! assert!(result.candidates.iter().all(|c| (0.0..=1.0).contains(&c.confidence)));
//! ```

use crate::band_energy::{BandEnergy, BandEnergyAnalyzer, BandTable};
use crate::doppler_estimator::{DopplerEstimator, DopplerTrackResult, MotionContext};
use crate::frequency_tracker::{DEFAULT_FRAME_S, DEFAULT_HOP_S};
use crate::types::DspResult;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Labels whose sources can plausibly produce a Doppler shift.
pub const MOVING_SOURCES: [&str; 5] =
    ["drone", "car_truck", "fixed_wing", "helicopter", "marine_vessel"];

/// Confidence multiplier for motion-capable labels when the source is
/// moving (result capped at 1.0).
const MOTION_BOOST: f64 = 1.3;
/// Confidence multiplier for static labels when the source is moving.
const MOTION_PENALTY: f64 = 0.7;

/// Default number of ranked candidates kept.
const DEFAULT_TOP_K: usize = 3;

/// One ranked hypothesis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub label: String,
    /// Heuristic ranking weight in `[0, 1]`, not a probability.
    pub confidence: f64,
}

/// Classification output: ranked candidates plus the evidence they were
/// derived from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HybridClassification {
    /// Top candidate's label, or `"unknown"` for silence.
    pub first_guess: String,
    /// At most `top_k` candidates, confidence-descending (ties broken by
    /// label, ascending, for determinism).
    pub candidates: Vec<Candidate>,
    pub band_energies: Vec<BandEnergy>,
    /// Motion context that was applied, if any.
    pub motion: Option<MotionContext>,
}

/// Band-energy classifier with optional Doppler motion fusion.
#[derive(Debug, Clone)]
pub struct HybridClassifier {
    sample_rate: f64,
    fft_size: usize,
    table: BandTable,
    top_k: usize,
}

impl HybridClassifier {
    pub fn new(sample_rate: f64) -> Self {
        Self {
            sample_rate,
            fft_size: 4096,
            table: BandTable::default_aerial(),
            top_k: DEFAULT_TOP_K,
        }
    }

    pub fn fft_size(mut self, fft_size: usize) -> Self {
        self.fft_size = fft_size;
        self
    }

    /// Replace the band table; candidate labels come from its
    /// `candidate_sources` lists.
    pub fn table(mut self, table: BandTable) -> Self {
        self.table = table;
        self
    }

    /// Number of ranked candidates to keep (default 3).
    pub fn top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }

    /// Classify a mono window, optionally fusing motion context.
    ///
    /// Scoring: each label accumulates the normalized energies of every
    /// band listing it, scores are max-normalized to `[0, 1]`, the top-k
    /// are kept, and only then is the motion boost/penalty applied (and
    /// the survivors re-ranked). Boosting after truncation keeps the
    /// candidate set a pure function of the spectrum; motion reorders
    /// hypotheses, it never introduces ones the spectrum didn't suggest.
    pub fn classify(
        &self,
        window: &[f64],
        motion: Option<MotionContext>,
    ) -> DspResult<HybridClassification> {
        let band_energies = BandEnergyAnalyzer::new(self.sample_rate)
            .fft_size(self.fft_size)
            .table(self.table.clone())
            .analyze(window)?;

        // BTreeMap keeps label iteration order stable across runs.
        let mut scores: BTreeMap<&str, f64> = BTreeMap::new();
        for band in &band_energies {
            for label in &band.candidate_sources {
                *scores.entry(label.as_str()).or_insert(0.0) += band.energy;
            }
        }

        let max_score = scores.values().copied().fold(0.0, f64::max);
        let mut candidates: Vec<Candidate> = if max_score > 0.0 {
            scores
                .iter()
                .map(|(&label, &score)| Candidate {
                    label: label.to_string(),
                    confidence: score / max_score,
                })
                .collect()
        } else {
            Vec::new()
        };

        Self::rank(&mut candidates);
        candidates.truncate(self.top_k);

        if let Some(ctx) = motion {
            if ctx.is_moving() {
                for candidate in &mut candidates {
                    if MOVING_SOURCES.contains(&candidate.label.as_str()) {
                        candidate.confidence = (candidate.confidence * MOTION_BOOST).min(1.0);
                    } else {
                        candidate.confidence *= MOTION_PENALTY;
                    }
                }
                Self::rank(&mut candidates);
            }
        }

        let first_guess = candidates
            .first()
            .map(|c| c.label.clone())
            .unwrap_or_else(|| "unknown".to_string());

        Ok(HybridClassification {
            first_guess,
            candidates,
            band_energies,
            motion,
        })
    }

    /// Classify a full recording: run the Doppler track analysis, derive
    /// the motion context from its summary, and classify the buffer with
    /// it. Returns both so callers can inspect the motion evidence.
    pub fn classify_with_doppler(
        &self,
        samples: &[f64],
        distance_m: Option<f64>,
    ) -> DspResult<(HybridClassification, DopplerTrackResult)> {
        let doppler = DopplerEstimator::new(self.sample_rate).analyze(
            samples,
            DEFAULT_FRAME_S,
            DEFAULT_HOP_S,
            distance_m,
        );
        let motion = MotionContext::from(&doppler.summary);
        let classification = self.classify(samples, Some(motion))?;
        Ok((classification, doppler))
    }

    fn rank(candidates: &mut [Candidate]) {
        candidates.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.label.cmp(&b.label))
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doppler_estimator::MotionDirection;
    use std::f64::consts::PI;

    fn tone(freq: f64, fs: f64, n: usize) -> Vec<f64> {
        (0..n).map(|i| (2.0 * PI * freq * i as f64 / fs).sin()).collect()
    }

    fn moving() -> MotionContext {
        MotionContext {
            velocity_mps: 10.0,
            direction: MotionDirection::Approaching,
        }
    }

    fn stationary() -> MotionContext {
        MotionContext {
            velocity_mps: 0.0,
            direction: MotionDirection::Stationary,
        }
    }

    #[test]
    fn test_silence_is_unknown() {
        let result = HybridClassifier::new(16000.0).classify(&[0.0; 4096], None).unwrap();
        assert_eq!(result.first_guess, "unknown");
        assert!(result.candidates.is_empty());
    }

    #[test]
    fn test_confidences_bounded_and_sorted() {
        let fs = 16000.0;
        let samples: Vec<f64> = (0..4096)
            .map(|i| {
                let t = i as f64 / fs;
                (2.0 * PI * 200.0 * t).sin() + 0.5 * (2.0 * PI * 600.0 * t).sin()
            })
            .collect();
        for motion in [None, Some(moving()), Some(stationary())] {
            let result = HybridClassifier::new(fs).classify(&samples, motion).unwrap();
            assert!(result.candidates.len() <= 3);
            for c in &result.candidates {
                assert!((0.0..=1.0).contains(&c.confidence), "{}: {}", c.label, c.confidence);
            }
            for pair in result.candidates.windows(2) {
                assert!(pair[0].confidence >= pair[1].confidence);
            }
            assert_eq!(result.first_guess, result.candidates[0].label);
        }
    }

    #[test]
    fn test_top_score_is_one_without_motion() {
        let fs = 16000.0;
        let result = HybridClassifier::new(fs).classify(&tone(200.0, fs, 4096), None).unwrap();
        assert!((result.candidates[0].confidence - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_bass_hum_suggests_motor_sources() {
        // 200 Hz hum: the "bass" band candidates (drone, car_truck,
        // helicopter, marine_vessel) should dominate the ranking.
        let fs = 16000.0;
        let result = HybridClassifier::new(fs).classify(&tone(200.0, fs, 4096), None).unwrap();
        assert!(MOVING_SOURCES.contains(&result.first_guess.as_str()));
    }

    #[test]
    fn test_motion_penalizes_static_labels() {
        let fs = 16000.0;
        // 2 kHz tone: "mid" band lists siren, human_voice, fixed_wing,
        // bird; only fixed_wing is motion-capable.
        let samples = tone(2000.0, fs, 4096);
        let classifier = HybridClassifier::new(fs).top_k(4);
        let base = classifier.classify(&samples, None).unwrap();
        let fused = classifier.classify(&samples, Some(moving())).unwrap();

        let conf = |r: &HybridClassification, label: &str| {
            r.candidates.iter().find(|c| c.label == label).map(|c| c.confidence)
        };
        for label in ["siren", "human_voice", "bird"] {
            let (b, f) = (conf(&base, label), conf(&fused, label));
            if let (Some(b), Some(f)) = (b, f) {
                assert!(f < b, "{label}: {f} !< {b}");
            }
        }
        if let (Some(b), Some(f)) = (conf(&base, "fixed_wing"), conf(&fused, "fixed_wing")) {
            assert!(f >= b);
        }
    }

    #[test]
    fn test_stationary_motion_changes_nothing() {
        let fs = 16000.0;
        let samples = tone(500.0, fs, 4096);
        let classifier = HybridClassifier::new(fs);
        let base = classifier.classify(&samples, None).unwrap();
        let fused = classifier.classify(&samples, Some(stationary())).unwrap();
        assert_eq!(base.candidates, fused.candidates);
    }

    #[test]
    fn test_boost_applies_after_truncation() {
        // Labels outside the spectral top-k must not reappear because of
        // a motion boost.
        let fs = 16000.0;
        let samples = tone(2000.0, fs, 4096);
        let classifier = HybridClassifier::new(fs).top_k(2);
        let base = classifier.classify(&samples, None).unwrap();
        let fused = classifier.classify(&samples, Some(moving())).unwrap();
        let base_labels: Vec<&str> = base.candidates.iter().map(|c| c.label.as_str()).collect();
        for c in &fused.candidates {
            assert!(base_labels.contains(&c.label.as_str()), "{} appeared", c.label);
        }
    }

    #[test]
    fn test_classify_with_doppler_end_to_end() {
        let fs = 16000.0;
        let samples = tone(300.0, fs, 16000);
        let (classification, doppler) = HybridClassifier::new(fs)
            .classify_with_doppler(&samples, Some(50.0))
            .unwrap();
        assert!(classification.motion.is_some());
        assert_eq!(doppler.summary.dominant_direction, MotionDirection::Stationary);
        assert_ne!(classification.first_guess, "unknown");
    }

    #[test]
    fn test_deterministic_repeat_calls() {
        let fs = 16000.0;
        let samples: Vec<f64> = (0..8192)
            .map(|i| {
                let t = i as f64 / fs;
                (2.0 * PI * 150.0 * t).sin() + 0.3 * (2.0 * PI * 4000.0 * t).sin()
            })
            .collect();
        let classifier = HybridClassifier::new(fs);
        let a = classifier.classify(&samples, Some(moving())).unwrap();
        let b = classifier.classify(&samples, Some(moving())).unwrap();
        assert_eq!(a, b);
    }
}
