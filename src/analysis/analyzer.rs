//! Group energy, rolling average and beat extraction from magnitude spectra.

use super::{BandEnergyHistory, SpectrumFrame};
use crate::error::Result;
use crate::params::{AnalyzerConfig, EnergyScale};

/// Linear magnitudes below this (-100 dB) map to 0 dB-offset energy
pub const DECIBEL_FLOOR_LINEAR: f32 = 1e-5;

/// Convert a linear magnitude to decibels offset by +100 (0 at the floor)
fn linear_to_decibel(magnitude: f32) -> f32 {
    if magnitude < DECIBEL_FLOOR_LINEAR {
        0.0
    } else {
        20.0 * magnitude.log10() + 100.0
    }
}

/// Clamp a per-frame anomaly (NaN, infinity, negative) to silence
fn sanitize(value: f32) -> f32 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

/// Beat detector over G contiguous bin groups
pub struct SpectralAnalyzer {
    config: AnalyzerConfig,
    bin_count: usize,
    bins_per_group: usize,
    histories: Vec<BandEnergyHistory>,
    spectrum: Vec<f32>,
    instant: Vec<f32>,
    volume: f32,
}

impl SpectralAnalyzer {
    /// Create an analyzer for spectra of `bin_count` bins.
    ///
    /// Fails if the group count does not divide the bin count or any other
    /// parameter is out of range; such spectra are never analysed.
    pub fn new(config: AnalyzerConfig, bin_count: usize) -> Result<Self> {
        config.validate(bin_count)?;

        let histories = (0..config.group_count)
            .map(|_| BandEnergyHistory::new(config.history_depth))
            .collect();

        Ok(Self {
            bins_per_group: bin_count / config.group_count,
            instant: vec![0.0; config.group_count],
            spectrum: vec![0.0; bin_count],
            histories,
            bin_count,
            volume: 0.0,
            config,
        })
    }

    /// Analyse the latest spectrum and push one energy sample per group.
    ///
    /// Frames longer than the configured bin count are truncated, shorter
    /// ones are zero-padded. Non-finite or negative values count as zero.
    pub fn ingest(&mut self, frame: &SpectrumFrame) {
        for (i, slot) in self.spectrum.iter_mut().enumerate() {
            *slot = frame.magnitudes.get(i).copied().map_or(0.0, sanitize);
        }
        self.volume = sanitize(frame.volume);

        for group in 0..self.config.group_count {
            let range = self.group_range(group);
            let sum: f32 = match self.config.energy_scale {
                EnergyScale::Linear => self.spectrum[range].iter().sum(),
                EnergyScale::Decibel => self.spectrum[range]
                    .iter()
                    .map(|&m| linear_to_decibel(m))
                    .sum(),
            };

            // Square of the sum, not sum of squares: loud transients dominate
            let energy = sum * sum;
            self.instant[group] = energy;
            self.histories[group].push(energy);
        }
    }

    /// Bin range of a group. The last group absorbs any remainder bins.
    pub fn group_range(&self, group: usize) -> std::ops::Range<usize> {
        let start = group * self.bins_per_group;
        let end = if group + 1 == self.config.group_count {
            self.bin_count
        } else {
            start + self.bins_per_group
        };
        start..end
    }

    /// Normalized excess of each group's latest energy over its average,
    /// clamped to `[0, beat_ceiling]`. Silence yields 0.
    pub fn beats(&self) -> Vec<f32> {
        self.histories
            .iter()
            .map(|history| {
                let Some(latest) = history.latest() else {
                    return 0.0;
                };
                let average = history.average();
                if !(average.is_finite() && average > f32::MIN_POSITIVE) {
                    return 0.0;
                }

                let ratio = latest / average - 1.0;
                if ratio.is_nan() {
                    0.0
                } else {
                    ratio.clamp(0.0, self.config.beat_ceiling)
                }
            })
            .collect()
    }

    /// Loudness of the most recently ingested frame
    pub fn volume(&self) -> f32 {
        self.volume
    }

    /// Most recently ingested (sanitized) magnitude spectrum
    pub fn magnitude_spectrum(&self) -> &[f32] {
        &self.spectrum
    }

    /// Instant energy per group from the last ingest
    pub fn instant_energies(&self) -> &[f32] {
        &self.instant
    }

    /// Rolling average energy per group
    pub fn averages(&self) -> Vec<f32> {
        self.histories.iter().map(|h| h.average()).collect()
    }

    pub fn history(&self, group: usize) -> Option<&BandEnergyHistory> {
        self.histories.get(group)
    }

    pub fn group_count(&self) -> usize {
        self.config.group_count
    }

    pub fn bin_count(&self) -> usize {
        self.bin_count
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }
}
