//! Audio analysis configuration: spectral monitor geometry and beat detection.

use serde::Deserialize;

use crate::error::{PulseError, Result};

/// Analysis window applied to each block of samples before the FFT
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowFunction {
    Hann,
    Blackman,
}

/// Spectral monitor configuration (FFT geometry and smoothing)
#[derive(Debug, Clone)]
pub struct FftConfig {
    /// FFT size in samples (must be power of 2). Produces `fft_size / 2` bins.
    pub fft_size: usize,

    /// Number of real samples analysed per spectrum, zero-padded up to `fft_size`
    pub window_size: usize,

    /// Window function applied to the analysed samples
    pub window: WindowFunction,

    /// Weight of the previous spectrum when smoothing (0 = no smoothing)
    pub smoothing_factor: f32,
}

impl Default for FftConfig {
    fn default() -> Self {
        Self {
            fft_size: 2048,
            window_size: 1024,
            window: WindowFunction::Blackman,
            smoothing_factor: 0.5,
        }
    }
}

impl FftConfig {
    /// Number of magnitude bins produced per spectrum frame
    pub fn bin_count(&self) -> usize {
        self.fft_size / 2
    }

    /// Convert a bin index to its centre frequency (Hz)
    pub fn bin_to_hz(&self, bin: usize, sample_rate_hz: u32) -> f32 {
        bin as f32 * sample_rate_hz as f32 / self.fft_size as f32
    }

    /// Validate configuration (FFT size must be power of 2, etc.)
    pub fn validate(&self) -> Result<()> {
        if !self.fft_size.is_power_of_two() {
            return Err(PulseError::config(format!(
                "FFT size must be power of 2, got {}",
                self.fft_size
            )));
        }
        if self.window_size == 0 || self.window_size > self.fft_size {
            return Err(PulseError::config(format!(
                "window size must be in 1..={}, got {}",
                self.fft_size, self.window_size
            )));
        }
        if !(0.0..1.0).contains(&self.smoothing_factor) {
            return Err(PulseError::config(format!(
                "smoothing factor must be in [0, 1), got {}",
                self.smoothing_factor
            )));
        }
        Ok(())
    }
}

/// How bin magnitudes are weighted before a group's energy is summed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnergyScale {
    /// Sum linear magnitudes directly
    Linear,
    /// Convert each bin to decibels (floor at -100 dB, offset by +100) first
    Decibel,
}

/// Beat detection configuration
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    /// Number of contiguous bin groups (bands), G
    pub group_count: usize,

    /// Energy samples kept per group, H (43 ≈ 1s at a 1024-sample hop)
    pub history_depth: usize,

    /// Upper clamp for the normalized beat ratio
    pub beat_ceiling: f32,

    /// Magnitude weighting used for instant energy
    pub energy_scale: EnergyScale,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            group_count: 4,
            history_depth: 43,
            beat_ceiling: 0.35,
            energy_scale: EnergyScale::Decibel,
        }
    }
}

impl AnalyzerConfig {
    /// Check the configuration against the bin count of incoming spectra
    pub fn validate(&self, bin_count: usize) -> Result<()> {
        if bin_count == 0 {
            return Err(PulseError::config("spectrum has no bins"));
        }
        if self.group_count == 0 {
            return Err(PulseError::config("group count must be > 0"));
        }
        if bin_count % self.group_count != 0 {
            return Err(PulseError::config(format!(
                "group count {} does not divide bin count {}",
                self.group_count, bin_count
            )));
        }
        if self.history_depth == 0 {
            return Err(PulseError::config("history depth must be > 0"));
        }
        if !(self.beat_ceiling.is_finite() && self.beat_ceiling > 0.0) {
            return Err(PulseError::config(format!(
                "beat ceiling must be a positive number, got {}",
                self.beat_ceiling
            )));
        }
        Ok(())
    }
}
