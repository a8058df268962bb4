//! CPU-only pipeline: runs the reference update, draws nothing.

use super::{ParticlePipeline, ViewUniforms};
use crate::error::{PulseError, Result};
use crate::particles::{update_all, FrameSignals, ParticleStore};
use crate::params::MotionParams;

/// Pipeline used for `--headless` runs and tests
pub struct HeadlessPipeline {
    motion: MotionParams,
    store: Option<ParticleStore>,
    frames_rendered: u64,
    last_view: Option<ViewUniforms>,
    spectrum: Vec<f32>,
    overlay_visible: bool,
}

impl HeadlessPipeline {
    pub fn new(motion: MotionParams) -> Self {
        Self {
            motion,
            store: None,
            frames_rendered: 0,
            last_view: None,
            spectrum: Vec::new(),
            overlay_visible: false,
        }
    }

    pub fn store(&self) -> Option<&ParticleStore> {
        self.store.as_ref()
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    pub fn last_view(&self) -> Option<&ViewUniforms> {
        self.last_view.as_ref()
    }

    /// Spectrum handed over by the most recent tick
    pub fn spectrum(&self) -> &[f32] {
        &self.spectrum
    }

    pub fn overlay_visible(&self) -> bool {
        self.overlay_visible
    }
}

impl ParticlePipeline for HeadlessPipeline {
    fn load(&mut self, store: ParticleStore) -> Result<()> {
        self.store = Some(store);
        Ok(())
    }

    fn update(&mut self, signals: &FrameSignals) -> Result<()> {
        let store = self
            .store
            .as_mut()
            .ok_or(PulseError::InvalidState("update before particles were loaded"))?;
        let (source, destination) = store.split();
        update_all(source, destination, signals, &self.motion);
        Ok(())
    }

    fn swap(&mut self) {
        if let Some(store) = self.store.as_mut() {
            store.swap();
        }
    }

    fn set_spectrum(&mut self, magnitudes: &[f32]) {
        self.spectrum.clear();
        self.spectrum.extend_from_slice(magnitudes);
    }

    fn set_overlay_visible(&mut self, visible: bool) {
        self.overlay_visible = visible;
    }

    fn render(&mut self, view: &ViewUniforms) -> Result<()> {
        self.frames_rendered += 1;
        self.last_view = Some(*view);
        Ok(())
    }

    fn release(&mut self) {
        self.store = None;
        self.spectrum.clear();
    }

    fn particle_count(&self) -> usize {
        self.store.as_ref().map_or(0, |s| s.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::ParticleConfig;
    use crate::particles::SpawnBounds;

    fn loaded(count: usize) -> HeadlessPipeline {
        let config = ParticleConfig {
            count,
            ..ParticleConfig::default()
        };
        let store =
            ParticleStore::initialize(&config, 4, &SpawnBounds::from_viewport(640, 480, 0.8))
                .unwrap();
        let mut pipeline = HeadlessPipeline::new(MotionParams::default());
        pipeline.load(store).unwrap();
        pipeline
    }

    #[test]
    fn test_update_before_load_fails() {
        let mut pipeline = HeadlessPipeline::new(MotionParams::default());
        let signals = FrameSignals::new(&[0.0; 4], 0.0, 0.0, &MotionParams::default());
        assert!(matches!(
            pipeline.update(&signals),
            Err(PulseError::InvalidState(_))
        ));
        assert_eq!(pipeline.particle_count(), 0);
    }

    #[test]
    fn test_update_then_swap_advances_source() {
        let mut pipeline = loaded(512);
        let before = pipeline.store().unwrap().current_source().to_vec();

        let signals = FrameSignals::new(&[0.3; 4], 0.5, 1.0, &MotionParams::default());
        pipeline.update(&signals).unwrap();
        pipeline.swap();

        let after = pipeline.store().unwrap().current_source();
        assert_eq!(after.len(), 512);
        for (new, old) in after.iter().zip(&before) {
            assert_eq!(new.prev_position, old.position);
            assert_eq!(new.group, old.group);
        }
    }

    #[test]
    fn test_render_records_view() {
        let mut pipeline = loaded(64);
        let view = ViewUniforms::default();
        pipeline.render(&view).unwrap();
        pipeline.render(&view).unwrap();
        assert_eq!(pipeline.frames_rendered(), 2);
        assert_eq!(pipeline.last_view(), Some(&view));
    }

    #[test]
    fn test_release_drops_population() {
        let mut pipeline = loaded(64);
        pipeline.set_spectrum(&[0.5; 8]);
        pipeline.release();

        assert_eq!(pipeline.particle_count(), 0);
        assert!(pipeline.store().is_none());
        assert!(pipeline.spectrum().is_empty());
    }
}
