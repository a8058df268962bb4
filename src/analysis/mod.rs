//! Spectral energy and beat analysis.
//!
//! Turns magnitude spectra into per-group instant energies, keeps a rolling
//! history per group and derives clamped beat intensities from it.

mod analyzer;
mod history;

// Re-export public types
pub use analyzer::{SpectralAnalyzer, DECIBEL_FLOOR_LINEAR};
pub use history::BandEnergyHistory;

/// One magnitude spectrum handed from the audio side to the tick thread
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SpectrumFrame {
    /// Linear magnitude per frequency bin
    pub magnitudes: Vec<f32>,

    /// Overall loudness of the window this spectrum was computed from
    pub volume: f32,
}

impl SpectrumFrame {
    /// Frame whose volume is the RMS of the magnitude spectrum itself
    pub fn from_magnitudes(magnitudes: Vec<f32>) -> Self {
        let volume = if magnitudes.is_empty() {
            0.0
        } else {
            let power: f32 = magnitudes.iter().map(|m| m * m).sum();
            (power / magnitudes.len() as f32).sqrt()
        };
        Self { magnitudes, volume }
    }

    /// Frame with a volume measured elsewhere (time-domain RMS)
    pub fn with_volume(magnitudes: Vec<f32>, volume: f32) -> Self {
        Self { magnitudes, volume }
    }

    pub fn bin_count(&self) -> usize {
        self.magnitudes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_volume_from_magnitudes_is_rms() {
        let frame = SpectrumFrame::from_magnitudes(vec![3.0, 4.0]);
        // sqrt((9 + 16) / 2)
        assert!((frame.volume - 12.5f32.sqrt()).abs() < 1e-6);
    }

    #[test]
    fn test_empty_frame_is_silent() {
        let frame = SpectrumFrame::from_magnitudes(Vec::new());
        assert_eq!(frame.volume, 0.0);
        assert_eq!(frame.bin_count(), 0);
    }
}
