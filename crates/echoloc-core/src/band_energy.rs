//! Band-energy analysis
//!
//! Splits the power spectrum of a mono window into named frequency
//! bands and reports each band's share of the total energy. Every band
//! carries a list of candidate source labels; the hybrid classifier
//! scores labels by summing the energies of the bands that list them.
//!
//! Bands may overlap — a 250 Hz drone hum legitimately excites both a
//! "bass" and a "low_mid" band, and the classifier wants that double
//! attribution. Normalization is over the per-band sums, so overlapping
//! tables still sum to 1.
//!
//! ## Example
//!
//! ```rust
//! use echoloc_core::band_energy::BandEnergyAnalyzer;
//!
//! let fs = 16000.0;
//! let tone: Vec<f64> = (0..4096)
//!     .map(|i| (2.0 * std::f64::consts::PI * 150.0 * i as f64 / fs).sin())
//!     .collect();
//!
//! let energies = BandEnergyAnalyzer::new(fs).analyze(&tone).unwrap();
//! let bass = energies.iter().find(|b| b.name == "bass").unwrap();
//! assert!(bass.energy > 0.9);
//! ```

use crate::fft_utils::{bin_frequency, hann_window, power_half_spectrum, FftProcessor};
use crate::types::{DspError, DspResult};
use rustfft::num_complex::Complex64;
use serde::{Deserialize, Serialize};

/// Floor added before the dB conversion so silent bands map to a finite
/// level (-100 dB) instead of negative infinity.
const LEVEL_DB_FLOOR: f64 = 1e-10;

/// A named frequency band `[low_hz, high_hz)` with the source labels
/// plausibly emitting in it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrequencyBand {
    pub name: String,
    pub low_hz: f64,
    pub high_hz: f64,
    pub candidate_sources: Vec<String>,
}

impl FrequencyBand {
    pub fn new(
        name: impl Into<String>,
        low_hz: f64,
        high_hz: f64,
        candidate_sources: &[&str],
    ) -> Self {
        Self {
            name: name.into(),
            low_hz,
            high_hz,
            candidate_sources: candidate_sources.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// An ordered set of frequency bands. Replaceable wholesale: the default
/// aerial/ground table is a starting point, not a fixed vocabulary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandTable {
    pub bands: Vec<FrequencyBand>,
}

impl BandTable {
    pub fn new(bands: Vec<FrequencyBand>) -> Self {
        Self { bands }
    }

    /// Default table for outdoor aerial/ground/biological sources.
    /// Adjacent bands share edges; candidate lists deliberately overlap.
    pub fn default_aerial() -> Self {
        Self::new(vec![
            FrequencyBand::new(
                "sub_bass",
                10.0,
                80.0,
                &["helicopter", "marine_vessel", "earthquake"],
            ),
            FrequencyBand::new(
                "bass",
                80.0,
                300.0,
                &["drone", "car_truck", "helicopter", "marine_vessel"],
            ),
            FrequencyBand::new(
                "low_mid",
                300.0,
                1000.0,
                &["drone", "car_truck", "fixed_wing", "human_voice"],
            ),
            FrequencyBand::new(
                "mid",
                1000.0,
                3500.0,
                &["siren", "human_voice", "fixed_wing", "bird"],
            ),
            FrequencyBand::new(
                "upper_mid",
                3500.0,
                8000.0,
                &["gunshot", "siren", "bird", "insect"],
            ),
            FrequencyBand::new(
                "high",
                8000.0,
                16000.0,
                &["bird", "insect", "marine_mammal"],
            ),
        ])
    }

    /// Reject empty tables and bands with inverted or negative edges.
    pub fn validate(&self) -> DspResult<()> {
        if self.bands.is_empty() {
            return Err(DspError::EmptyBandTable);
        }
        for band in &self.bands {
            if band.low_hz < 0.0 || band.high_hz <= band.low_hz {
                return Err(DspError::InvalidBand {
                    name: band.name.clone(),
                    low_hz: band.low_hz,
                    high_hz: band.high_hz,
                });
            }
        }
        Ok(())
    }
}

impl Default for BandTable {
    fn default() -> Self {
        Self::default_aerial()
    }
}

/// One band's result: normalized energy share plus absolute level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandEnergy {
    pub name: String,
    pub low_hz: f64,
    pub high_hz: f64,
    /// Fraction of the summed band power in this band, in `[0, 1]`.
    /// All zeros for a silent window.
    pub energy: f64,
    /// Absolute band power in dB (`10·log10(power + 1e-10)`).
    pub level_db: f64,
    pub candidate_sources: Vec<String>,
}

/// Power-spectrum band-energy analyzer.
#[derive(Debug, Clone)]
pub struct BandEnergyAnalyzer {
    sample_rate: f64,
    fft_size: usize,
    table: BandTable,
}

impl BandEnergyAnalyzer {
    pub fn new(sample_rate: f64) -> Self {
        Self {
            sample_rate,
            fft_size: 4096,
            table: BandTable::default_aerial(),
        }
    }

    pub fn fft_size(mut self, fft_size: usize) -> Self {
        self.fft_size = fft_size;
        self
    }

    /// Replace the band table (validated lazily in `analyze`).
    pub fn table(mut self, table: BandTable) -> Self {
        self.table = table;
        self
    }

    pub fn bands(&self) -> &BandTable {
        &self.table
    }

    /// Per-band energies of a mono window, in table order.
    ///
    /// The window is Hann-weighted and zero-padded (or truncated) to the
    /// FFT size. Bin membership is half-open `[low_hz, high_hz)`, so
    /// bands sharing an edge never double-count a bin.
    pub fn analyze(&self, window: &[f64]) -> DspResult<Vec<BandEnergy>> {
        self.table.validate()?;

        let n = self.fft_size;
        let hann = hann_window(n);
        let mut buffer = vec![Complex64::new(0.0, 0.0); n];
        for (i, (&s, &w)) in window.iter().zip(hann.iter()).enumerate() {
            buffer[i] = Complex64::new(s * w, 0.0);
        }
        let mut processor = FftProcessor::new(n);
        processor.fft_inplace(&mut buffer);
        let power = power_half_spectrum(&buffer);

        let raw: Vec<f64> = self
            .table
            .bands
            .iter()
            .map(|band| {
                (0..power.len())
                    .filter(|&bin| {
                        let f = bin_frequency(bin, self.sample_rate, n);
                        f >= band.low_hz && f < band.high_hz
                    })
                    .map(|bin| power[bin])
                    .sum()
            })
            .collect();

        let total: f64 = raw.iter().sum();
        let energies = self
            .table
            .bands
            .iter()
            .zip(raw.iter())
            .map(|(band, &p)| BandEnergy {
                name: band.name.clone(),
                low_hz: band.low_hz,
                high_hz: band.high_hz,
                energy: if total > 0.0 { p / total } else { 0.0 },
                level_db: 10.0 * (p + LEVEL_DB_FLOOR).log10(),
                candidate_sources: band.candidate_sources.clone(),
            })
            .collect();

        Ok(energies)
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
    fn test_default_table_is_valid() {
        assert!(BandTable::default_aerial().validate().is_ok());
    }

    #[test]
    fn test_empty_table_rejected() {
        let analyzer = BandEnergyAnalyzer::new(16000.0).table(BandTable::new(vec![]));
        assert_eq!(analyzer.analyze(&[0.0; 64]), Err(DspError::EmptyBandTable));
    }

    #[test]
    fn test_inverted_band_rejected() {
        let table = BandTable::new(vec![FrequencyBand::new("bad", 500.0, 100.0, &["x"])]);
        let err = BandEnergyAnalyzer::new(16000.0)
            .table(table)
            .analyze(&[0.0; 64])
            .unwrap_err();
        assert!(matches!(err, DspError::InvalidBand { .. }));
    }

    #[test]
    fn test_energies_normalize_to_one() {
        let fs = 16000.0;
        let samples: Vec<f64> = (0..4096)
            .map(|i| {
                let t = i as f64 / fs;
                (2.0 * PI * 150.0 * t).sin() + 0.5 * (2.0 * PI * 2000.0 * t).sin()
            })
            .collect();
        let energies = BandEnergyAnalyzer::new(fs).analyze(&samples).unwrap();
        let total: f64 = energies.iter().map(|b| b.energy).sum();
        assert!((total - 1.0).abs() < 1e-6, "total={total}");
        for band in &energies {
            assert!((0.0..=1.0).contains(&band.energy));
        }
    }

    #[test]
    fn test_silence_yields_zero_energies() {
        let energies = BandEnergyAnalyzer::new(16000.0).analyze(&[0.0; 4096]).unwrap();
        assert!(energies.iter().all(|b| b.energy == 0.0));
        // Level floor keeps dB finite.
        assert!(energies.iter().all(|b| (b.level_db - (-100.0)).abs() < 1.0));
    }

    #[test]
    fn test_tone_lands_in_its_band() {
        let fs = 16000.0;
        // 150 Hz sits in "bass" [80, 300).
        let energies = BandEnergyAnalyzer::new(fs).analyze(&tone(150.0, fs, 4096)).unwrap();
        let bass = energies.iter().find(|b| b.name == "bass").unwrap();
        assert!(bass.energy > 0.9, "bass={}", bass.energy);
        // 2 kHz sits in "mid" [1000, 3500).
        let energies = BandEnergyAnalyzer::new(fs).analyze(&tone(2000.0, fs, 4096)).unwrap();
        let mid = energies.iter().find(|b| b.name == "mid").unwrap();
        assert!(mid.energy > 0.9, "mid={}", mid.energy);
    }

    #[test]
    fn test_table_order_preserved() {
        let energies = BandEnergyAnalyzer::new(16000.0).analyze(&[0.0; 256]).unwrap();
        let names: Vec<&str> = energies.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(
            names,
            ["sub_bass", "bass", "low_mid", "mid", "upper_mid", "high"]
        );
    }

    #[test]
    fn test_shared_edge_bins_not_double_counted() {
        // Custom table with a shared 1000 Hz edge and an exact-bin tone
        // at that edge: the energy must land only in the upper band.
        let fs = 16000.0;
        let table = BandTable::new(vec![
            FrequencyBand::new("lower", 0.0, 1000.0, &["a"]),
            FrequencyBand::new("upper", 1000.0, 8000.0, &["b"]),
        ]);
        // 1000 Hz is bin 256 of a 4096-point FFT at 16 kHz.
        let energies = BandEnergyAnalyzer::new(fs)
            .table(table)
            .analyze(&tone(1000.0, fs, 4096))
            .unwrap();
        assert!(energies[1].energy > energies[0].energy);
    }

    #[test]
    fn test_deterministic_repeat_calls() {
        let fs = 16000.0;
        let samples = tone(440.0, fs, 4096);
        let analyzer = BandEnergyAnalyzer::new(fs);
        assert_eq!(
            analyzer.analyze(&samples).unwrap(),
            analyzer.analyze(&samples).unwrap()
        );
    }
}
