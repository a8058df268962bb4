//! Parameter definitions with units and documented defaults.
//!
//! Defaults live in `Default` impls; an optional TOML file and the CLI
//! layer on top, then `Settings::validate` rejects impossible combinations
//! before anything is allocated.

mod audio;
mod file;
mod particles;
mod render;

// Re-export all types
pub use audio::{AnalyzerConfig, EnergyScale, FftConfig, WindowFunction};
pub use file::ConfigFile;
pub use particles::{MotionParams, ParticleConfig};
pub use render::{OrbitControls, RenderConfig};

use crate::error::Result;

/// Every tunable of the application in one place
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub fft: FftConfig,
    pub analyzer: AnalyzerConfig,
    pub particles: ParticleConfig,
    pub motion: MotionParams,
    pub render: RenderConfig,
    pub controls: OrbitControls,
}

impl Settings {
    /// Validate all sections against each other
    pub fn validate(&self) -> Result<()> {
        self.fft.validate()?;
        self.analyzer.validate(self.fft.bin_count())?;
        self.particles.validate(self.analyzer.group_count)?;
        self.motion.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings_validate() {
        assert!(Settings::default().validate().is_ok());
    }

    #[test]
    fn test_group_count_must_divide_bins() {
        let mut settings = Settings::default();
        settings.analyzer.group_count = 3;
        assert!(settings.validate().is_err());
    }
}
