//! # Acoustic Geolocation and Motion Inference Library
//!
//! This crate provides the Digital Signal Processing (DSP) blocks for
//! locating and characterizing sound sources from microphone recordings:
//! where a sound came from, how its source is moving, and what kind of
//! source it plausibly is.
//!
//! ## Overview
//!
//! Two independent physical measurements drive everything:
//!
//! - **Time delay** between microphones (GCC-PHAT cross-correlation)
//!   gives the direction of arrival.
//! - **Frequency shift** of the dominant tone over time (spectral peak
//!   tracking) gives the Doppler radial velocity.
//!
//! The two must never be conflated — a correlation delay is not a
//! frequency shift. On top of them sit band-energy analysis and a
//! heuristic hybrid classifier that fuses the spectral profile with the
//! motion evidence.
//!
//! ## Signal Flow
//!
//! ```text
//! multi-channel ──► GCC-PHAT delay ──► DOA angle per mic pair
//!
//! mono ──► frame ──► spectral peak ──► frequency track ──► Doppler velocity
//!    │                                                          │
//!    └──► band energies ──► label scores ──► hybrid classification
//! ```
//!
//! ## Example
//!
//! ```rust
//! use echoloc_core::{DopplerEstimator, HybridClassifier, MotionDirection};
//!
//! let fs = 16000.0;
//! let hum: Vec<f64> = (0..16000)
//!     .map(|i| (2.0 * std::f64::consts::PI * 200.0 * i as f64 / fs).sin())
//!     .collect();
//!
//! // A steady 200 Hz hum: no Doppler shift, motor-like spectrum.
//! let doppler = DopplerEstimator::new(fs).analyze_default(&hum, None);
//! assert_eq!(doppler.summary.dominant_direction, MotionDirection::Stationary);
//!
//! let result = HybridClassifier::new(fs).classify(&hum, None).unwrap();
//! assert_ne!(result.first_guess, "unknown");
//! ```
//!
//! ## Determinism
//!
//! Every estimator is a pure function of its inputs and configuration:
//! no global state, no randomness, no logging side effects. Identical
//! inputs reproduce identical outputs bit for bit.

pub mod band_energy;
pub mod doa_estimator;
pub mod doppler_estimator;
pub mod fft_utils;
pub mod frequency_tracker;
pub mod gcc_phat;
pub mod hybrid_classifier;
pub mod spectral_peak;
pub mod types;

// Parallel batch processing (requires `parallel` feature)
#[cfg(feature = "parallel")]
pub mod parallel;

// Re-export main types
pub use band_energy::{BandEnergy, BandEnergyAnalyzer, BandTable, FrequencyBand};
pub use doa_estimator::{DoaEstimator, DoaPairResult};
pub use doppler_estimator::{
    DopplerEstimate, DopplerEstimator, DopplerFrame, DopplerSummary, DopplerTrackResult,
    MotionContext, MotionDirection,
};
pub use frequency_tracker::{FrequencyTrack, FrequencyTracker};
pub use gcc_phat::{GccPhatCorrelator, GccPhatResult};
pub use hybrid_classifier::{Candidate, HybridClassification, HybridClassifier, MOVING_SOURCES};
pub use spectral_peak::{dominant_frequency, SpectralPeakEstimator};
pub use types::{
    AudioBuffer, DspError, DspResult, MicPosition, MicrophoneGeometry, Sample,
    SPEED_OF_SOUND_AIR,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::band_energy::{BandEnergyAnalyzer, BandTable};
    pub use crate::doa_estimator::DoaEstimator;
    pub use crate::doppler_estimator::{DopplerEstimator, MotionContext, MotionDirection};
    pub use crate::frequency_tracker::FrequencyTracker;
    pub use crate::gcc_phat::GccPhatCorrelator;
    pub use crate::hybrid_classifier::HybridClassifier;
    pub use crate::spectral_peak::SpectralPeakEstimator;
    pub use crate::types::{AudioBuffer, DspError, DspResult, MicPosition, MicrophoneGeometry};
}
