//! Optional TOML configuration file layered over the built-in defaults.
//!
//! Every key is optional; unknown keys are rejected so typos surface at
//! startup instead of being silently ignored.

use std::path::Path;

use serde::Deserialize;

use super::{EnergyScale, Settings, WindowFunction};
use crate::error::{PulseError, Result};

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub launch_fullscreen: Option<bool>,
    pub window_width: Option<u32>,
    pub window_height: Option<u32>,
    pub vertical_fov: Option<f32>,
    pub point_scale: Option<f32>,
    pub sprite: Option<String>,
    pub spectrum_overlay: Option<bool>,

    pub particle_count: Option<usize>,
    pub seed: Option<u64>,
    pub damping: Option<[f32; 2]>,
    pub size: Option<[f32; 2]>,
    pub spread: Option<f32>,

    pub spring: Option<f32>,
    pub friction_scale: Option<f32>,
    pub push_scale: Option<f32>,
    pub beat_bias: Option<f32>,
    pub volume_gain: Option<f32>,
    pub emit_per_tick: Option<u32>,

    pub group_count: Option<usize>,
    pub history_depth: Option<usize>,
    pub beat_ceiling: Option<f32>,
    pub energy_scale: Option<EnergyScale>,

    pub fft_size: Option<usize>,
    pub window_size: Option<usize>,
    pub window: Option<WindowFunction>,
    pub smoothing: Option<f32>,
}

impl ConfigFile {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| PulseError::asset(path.display().to_string(), e))?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Overwrite every setting present in the file
    pub fn apply(&self, settings: &mut Settings) {
        let render = &mut settings.render;
        if let Some(v) = self.launch_fullscreen {
            render.launch_fullscreen = v;
        }
        if let Some(v) = self.window_width {
            render.window_width = v;
        }
        if let Some(v) = self.window_height {
            render.window_height = v;
        }
        if let Some(v) = self.vertical_fov {
            render.fov_degrees = v.clamp(1.0, 179.0);
        }
        if let Some(v) = self.point_scale {
            render.point_scale = v.max(0.0);
        }
        if let Some(v) = &self.sprite {
            render.sprite_path = Some(v.clone());
        }
        if let Some(v) = self.spectrum_overlay {
            render.spectrum_overlay = v;
        }

        let particles = &mut settings.particles;
        if let Some(v) = self.particle_count {
            particles.count = v;
        }
        if let Some(v) = self.seed {
            particles.seed = v;
        }
        if let Some([lo, hi]) = self.damping {
            particles.damping_range = lo..hi;
        }
        if let Some([lo, hi]) = self.size {
            particles.size_range = lo..hi;
        }
        if let Some(v) = self.spread {
            particles.spread = v;
        }

        let motion = &mut settings.motion;
        if let Some(v) = self.spring {
            motion.spring = v;
        }
        if let Some(v) = self.friction_scale {
            motion.friction_scale = v;
        }
        if let Some(v) = self.push_scale {
            motion.push_scale = v;
        }
        if let Some(v) = self.beat_bias {
            motion.beat_bias = v;
        }
        if let Some(v) = self.volume_gain {
            motion.volume_gain = v;
        }
        if let Some(v) = self.emit_per_tick {
            motion.emit_per_tick = v;
        }

        let analyzer = &mut settings.analyzer;
        if let Some(v) = self.group_count {
            analyzer.group_count = v;
        }
        if let Some(v) = self.history_depth {
            analyzer.history_depth = v;
        }
        if let Some(v) = self.beat_ceiling {
            analyzer.beat_ceiling = v;
        }
        if let Some(v) = self.energy_scale {
            analyzer.energy_scale = v;
        }

        let fft = &mut settings.fft;
        if let Some(v) = self.fft_size {
            fft.fft_size = v;
        }
        if let Some(v) = self.window_size {
            fft.window_size = v;
        }
        if let Some(v) = self.window {
            fft.window = v;
        }
        if let Some(v) = self.smoothing {
            fft.smoothing_factor = v;
        }
    }
}
