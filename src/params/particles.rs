//! Particle population and motion parameters.

use std::ops::Range;

use crate::error::{PulseError, Result};

/// Particle population parameters (applied on every (re)initialization)
#[derive(Debug, Clone)]
pub struct ParticleConfig {
    /// Total particle count (split evenly across groups in index order)
    pub count: usize,

    /// Seed for the randomized initial layout
    pub seed: u64,

    /// Damping coefficient range, sampled uniformly per particle
    pub damping_range: Range<f32>,

    /// Sprite size range (pixels), sampled uniformly per particle
    pub size_range: Range<f32>,

    /// Radius of the random previous-position offset (initial velocity)
    pub initial_speed: f32,

    /// Fraction of the window extent covered by home positions
    pub spread: f32,

    /// Hue span mapped across groups (0..1 covers the full wheel)
    pub hue_span: f32,
}

impl Default for ParticleConfig {
    fn default() -> Self {
        Self {
            count: 1 << 19,
            seed: 0x5eed,
            damping_range: 0.70..0.95,
            size_range: 2.0..64.0,
            initial_speed: 10.0,
            spread: 0.8,
            hue_span: 0.66,
        }
    }
}

impl ParticleConfig {
    pub fn validate(&self, group_count: usize) -> Result<()> {
        if self.count == 0 {
            return Err(PulseError::config("particle count must be > 0"));
        }
        if group_count == 0 || self.count < group_count {
            return Err(PulseError::config(format!(
                "particle count {} cannot be split into {} groups",
                self.count, group_count
            )));
        }
        if self.count > u32::MAX as usize {
            return Err(PulseError::config("particle count exceeds u32 range"));
        }
        if self.damping_range.is_empty() || self.damping_range.start < 0.0 {
            return Err(PulseError::config(format!(
                "invalid damping range {:?}",
                self.damping_range
            )));
        }
        if self.size_range.is_empty() || self.size_range.start <= 0.0 {
            return Err(PulseError::config(format!(
                "invalid size range {:?}",
                self.size_range
            )));
        }
        Ok(())
    }
}

/// Coefficients of the per-particle motion model
#[derive(Debug, Clone, Copy)]
pub struct MotionParams {
    /// Fraction of the offset from home recovered per tick
    pub spring: f32,

    /// Scales damping into the fraction of momentum removed per tick
    pub friction_scale: f32,

    /// Displacement (world units) per unit of beat × activity
    pub push_scale: f32,

    /// Constant added to every group's beat so quiet groups keep moving
    pub beat_bias: f32,

    /// Fixed simulation time step per tick (seconds, not wall-clock)
    pub tick_delta_s: f32,

    /// Gain applied to the analyzer volume before it maps to activity
    pub volume_gain: f32,

    /// Particles released per tick after each (re)initialization, in index
    /// order; 0 releases the whole population on the first tick
    pub emit_per_tick: u32,
}

impl Default for MotionParams {
    fn default() -> Self {
        Self {
            spring: 0.02,
            friction_scale: 0.25,
            push_scale: 1.5,
            beat_bias: 0.1,
            tick_delta_s: 1.0 / 60.0,
            volume_gain: 4.0,
            emit_per_tick: 8192,
        }
    }
}

impl MotionParams {
    pub fn validate(&self) -> Result<()> {
        if !(self.tick_delta_s.is_finite() && self.tick_delta_s > 0.0) {
            return Err(PulseError::config(format!(
                "tick delta must be positive, got {}",
                self.tick_delta_s
            )));
        }
        if !(0.0..=1.0).contains(&self.spring) {
            return Err(PulseError::config(format!(
                "spring must be in [0, 1], got {}",
                self.spring
            )));
        }
        if self.friction_scale < 0.0 || self.volume_gain < 0.0 {
            return Err(PulseError::config(
                "friction scale and volume gain must be non-negative",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(ParticleConfig::default().validate(4).is_ok());
        assert!(MotionParams::default().validate().is_ok());
    }

    #[test]
    fn test_zero_particles_rejected() {
        let config = ParticleConfig {
            count: 0,
            ..ParticleConfig::default()
        };
        assert!(config.validate(4).is_err());
    }

    #[test]
    fn test_fewer_particles_than_groups_rejected() {
        let config = ParticleConfig {
            count: 3,
            ..ParticleConfig::default()
        };
        assert!(config.validate(4).is_err());
    }
}
