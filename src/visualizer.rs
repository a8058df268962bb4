//! Per-frame orchestration: analysis, particle update, swap, render.

use crate::analysis::{SpectralAnalyzer, SpectrumFrame};
use crate::component::{Component, InputEvent, Key};
use crate::error::{PulseError, Result};
use crate::params::{MotionParams, ParticleConfig, Settings};
use crate::particles::{emitter_cap, FrameSignals, ParticleStore, SimulationClock, SpawnBounds};
use crate::rendering::{ParticlePipeline, ViewUniforms};

/// Ticks between debug summaries (one simulated second at the default rate)
const SUMMARY_INTERVAL: u64 = 60;

/// Lifecycle phase of the visualizer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Uninitialized,
    Ready,
    Ticking,
    ShuttingDown,
}

/// Drives analyzer, particle pipeline and clock in lockstep
pub struct Visualizer<P: ParticlePipeline> {
    phase: Phase,
    analyzer: SpectralAnalyzer,
    pipeline: P,
    particle_config: ParticleConfig,
    motion: MotionParams,
    clock: SimulationClock,
    bounds: Option<SpawnBounds>,
    last_frame: Option<SpectrumFrame>,
    last_signals: Option<FrameSignals>,
    ticks: u64,
    reused_frames: u64,
    /// Ticks since the current population was created
    ticks_since_populate: u64,
    overlay_visible: bool,
    /// Failure from a hook that cannot return one, surfaced by `take_error`
    deferred_error: Option<PulseError>,
}

impl<P: ParticlePipeline> Visualizer<P> {
    /// Validate settings and build the analyzer. Nothing is allocated on
    /// the pipeline until `setup`.
    pub fn new(settings: &Settings, pipeline: P) -> Result<Self> {
        settings.validate()?;
        let analyzer = SpectralAnalyzer::new(settings.analyzer.clone(), settings.fft.bin_count())?;

        Ok(Self {
            phase: Phase::Uninitialized,
            analyzer,
            pipeline,
            particle_config: settings.particles.clone(),
            motion: settings.motion,
            clock: SimulationClock::new(settings.motion.tick_delta_s),
            bounds: None,
            last_frame: None,
            last_signals: None,
            ticks: 0,
            reused_frames: 0,
            ticks_since_populate: 0,
            overlay_visible: settings.render.spectrum_overlay,
            deferred_error: None,
        })
    }

    /// Create the particle population inside `bounds` and hand it to the
    /// pipeline
    pub fn setup(&mut self, bounds: SpawnBounds) -> Result<()> {
        if self.phase != Phase::Uninitialized {
            return Err(PulseError::InvalidState("setup called twice"));
        }
        self.populate(bounds)?;
        self.pipeline.set_overlay_visible(self.overlay_visible);
        self.phase = Phase::Ready;
        Ok(())
    }

    /// Throw the population away and rebuild it for new bounds
    pub fn reconfigure(&mut self, bounds: SpawnBounds) -> Result<()> {
        match self.phase {
            Phase::Ready | Phase::Ticking => {}
            Phase::Uninitialized => {
                return Err(PulseError::InvalidState("reconfigure before setup"))
            }
            Phase::ShuttingDown => {
                return Err(PulseError::InvalidState("reconfigure after shutdown"))
            }
        }
        self.populate(bounds)?;
        self.phase = Phase::Ready;
        Ok(())
    }

    fn populate(&mut self, bounds: SpawnBounds) -> Result<()> {
        let store = ParticleStore::initialize(
            &self.particle_config,
            self.analyzer.group_count(),
            &bounds,
        )?;
        self.pipeline.load(store)?;
        self.bounds = Some(bounds);
        self.ticks_since_populate = 0;
        Ok(())
    }

    /// Run one frame.
    ///
    /// `frame` is the newest spectrum from the audio side, if one arrived
    /// since the last tick. Without one the previous frame is analysed again;
    /// before the first frame ever arrives analysis is skipped.
    pub fn tick(&mut self, frame: Option<SpectrumFrame>, view: &ViewUniforms) -> Result<()> {
        match self.phase {
            Phase::Ready | Phase::Ticking => {}
            Phase::Uninitialized => return Err(PulseError::InvalidState("tick before setup")),
            Phase::ShuttingDown => return Err(PulseError::InvalidState("tick after shutdown")),
        }
        self.phase = Phase::Ticking;

        match frame {
            Some(frame) => self.last_frame = Some(frame),
            None if self.last_frame.is_some() => self.reused_frames += 1,
            None => {}
        }
        if let Some(frame) = self.last_frame.as_ref() {
            self.analyzer.ingest(frame);
        }
        self.pipeline.set_spectrum(self.analyzer.magnitude_spectrum());

        let time = self.clock.tick();
        self.ticks_since_populate += 1;
        let active = emitter_cap(
            self.ticks_since_populate,
            self.motion.emit_per_tick,
            self.pipeline.particle_count(),
        );
        let signals = FrameSignals::new(&self.analyzer.beats(), self.analyzer.volume(), time, &self.motion)
            .with_active_count(active);

        self.pipeline.update(&signals)?;
        self.pipeline.swap();
        self.pipeline.render(&ViewUniforms {
            active_count: active,
            ..*view
        })?;

        self.ticks += 1;
        if self.ticks % SUMMARY_INTERVAL == 0 {
            log::debug!(
                "t={:.1}s beats={:?} volume={:.4} activity={:.2} reused={}",
                time,
                signals.beats,
                self.analyzer.volume(),
                signals.activity,
                self.reused_frames
            );
        }
        self.last_signals = Some(signals);

        Ok(())
    }

    /// Stop accepting ticks and release the particle population. Safe to
    /// call more than once.
    pub fn shutdown(&mut self) {
        if self.phase != Phase::ShuttingDown {
            log::info!("Visualizer shutting down after {} ticks", self.ticks);
            self.pipeline.release();
            self.phase = Phase::ShuttingDown;
        }
    }

    /// Error raised inside `resize`, if any; the caller treats it as fatal
    pub fn take_error(&mut self) -> Option<PulseError> {
        self.deferred_error.take()
    }

    pub fn overlay_visible(&self) -> bool {
        self.overlay_visible
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn analyzer(&self) -> &SpectralAnalyzer {
        &self.analyzer
    }

    pub fn pipeline(&self) -> &P {
        &self.pipeline
    }

    pub fn pipeline_mut(&mut self) -> &mut P {
        &mut self.pipeline
    }

    /// Signals fed to the most recent update
    pub fn last_signals(&self) -> Option<&FrameSignals> {
        self.last_signals.as_ref()
    }

    pub fn time(&self) -> f32 {
        self.clock.time()
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn bounds(&self) -> Option<&SpawnBounds> {
        self.bounds.as_ref()
    }
}

impl<P: ParticlePipeline> Component for Visualizer<P> {
    fn name(&self) -> &'static str {
        "visualizer"
    }

    fn handle_input(&mut self, event: &InputEvent) {
        if let InputEvent::KeyPressed(Key::S) = event {
            self.overlay_visible = !self.overlay_visible;
            self.pipeline.set_overlay_visible(self.overlay_visible);
            log::info!(
                "Spectrum overlay {}",
                if self.overlay_visible { "on" } else { "off" }
            );
        }
    }

    fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        if !matches!(self.phase, Phase::Ready | Phase::Ticking) {
            return;
        }
        self.pipeline.resize(width, height);

        let bounds = SpawnBounds::from_viewport(width, height, self.particle_config.spread);
        if let Err(e) = self.reconfigure(bounds) {
            log::error!("Failed to reconfigure for {}x{}: {}", width, height, e);
            self.deferred_error = Some(e);
        }
    }

    fn shutdown(&mut self) {
        Visualizer::shutdown(self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::EnergyScale;
    use crate::rendering::HeadlessPipeline;

    fn settings() -> Settings {
        let mut settings = Settings::default();
        settings.particles.count = 256;
        settings.analyzer.energy_scale = EnergyScale::Linear;
        settings
    }

    fn ready() -> Visualizer<HeadlessPipeline> {
        let settings = settings();
        let mut visualizer =
            Visualizer::new(&settings, HeadlessPipeline::new(settings.motion)).unwrap();
        visualizer
            .setup(SpawnBounds::from_viewport(640, 480, 0.8))
            .unwrap();
        visualizer
    }

    fn frame(level: f32) -> SpectrumFrame {
        SpectrumFrame::with_volume(vec![level; 1024], 0.1)
    }

    #[test]
    fn test_lifecycle() {
        let settings = settings();
        let mut visualizer =
            Visualizer::new(&settings, HeadlessPipeline::new(settings.motion)).unwrap();
        let view = ViewUniforms::default();

        assert_eq!(visualizer.phase(), Phase::Uninitialized);
        assert!(visualizer.tick(None, &view).is_err());

        visualizer
            .setup(SpawnBounds::from_viewport(640, 480, 0.8))
            .unwrap();
        assert_eq!(visualizer.phase(), Phase::Ready);

        visualizer.tick(Some(frame(1.0)), &view).unwrap();
        assert_eq!(visualizer.phase(), Phase::Ticking);

        visualizer.shutdown();
        assert_eq!(visualizer.phase(), Phase::ShuttingDown);
        assert!(matches!(
            visualizer.tick(Some(frame(1.0)), &view),
            Err(PulseError::InvalidState(_))
        ));
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let mut settings = settings();
        settings.analyzer.group_count = 3;
        assert!(Visualizer::new(&settings, HeadlessPipeline::new(settings.motion)).is_err());
    }

    #[test]
    fn test_setup_twice_rejected() {
        let mut visualizer = ready();
        assert!(visualizer
            .setup(SpawnBounds::from_viewport(640, 480, 0.8))
            .is_err());
    }

    #[test]
    fn test_tick_runs_update_swap_render() {
        let mut visualizer = ready();
        let before = visualizer.pipeline().store().unwrap().current_source().to_vec();

        visualizer.tick(Some(frame(1.0)), &ViewUniforms::default()).unwrap();

        let pipeline = visualizer.pipeline();
        assert_eq!(pipeline.frames_rendered(), 1);
        let after = pipeline.store().unwrap().current_source();
        for (new, old) in after.iter().zip(&before) {
            assert_eq!(new.prev_position, old.position);
        }
    }

    #[test]
    fn test_particle_count_conserved() {
        let mut visualizer = ready();
        let view = ViewUniforms::default();
        for i in 0..50 {
            let level = if i % 10 == 0 { 5.0 } else { 1.0 };
            visualizer.tick(Some(frame(level)), &view).unwrap();
            assert_eq!(visualizer.pipeline().particle_count(), 256);
        }
    }

    #[test]
    fn test_no_frame_yet_skips_analysis() {
        let mut visualizer = ready();
        visualizer.tick(None, &ViewUniforms::default()).unwrap();

        assert!(visualizer.analyzer().history(0).unwrap().is_empty());
        let signals = visualizer.last_signals().unwrap();
        // Only the bias remains
        assert!(signals.beats.iter().all(|&b| (b - 0.1).abs() < 1e-6));
    }

    #[test]
    fn test_missing_frame_reuses_last() {
        let mut visualizer = ready();
        let view = ViewUniforms::default();
        visualizer.tick(Some(frame(2.0)), &view).unwrap();
        visualizer.tick(None, &view).unwrap();
        visualizer.tick(None, &view).unwrap();

        let history = visualizer.analyzer().history(0).unwrap();
        assert_eq!(history.len(), 3);
        assert_eq!(history.latest(), history.oldest());
    }

    #[test]
    fn test_spike_raises_beat() {
        let mut visualizer = ready();
        let view = ViewUniforms::default();
        for _ in 0..42 {
            visualizer.tick(Some(frame(1.0)), &view).unwrap();
        }
        visualizer.tick(Some(frame(10.0)), &view).unwrap();

        let signals = visualizer.last_signals().unwrap();
        for beat in &signals.beats {
            assert!((beat - 0.45).abs() < 1e-5);
        }
    }

    #[test]
    fn test_time_advances_fixed_delta() {
        let mut visualizer = ready();
        for _ in 0..30 {
            visualizer.tick(None, &ViewUniforms::default()).unwrap();
        }
        assert!((visualizer.time() - 0.5).abs() < 1e-4);
        assert_eq!(visualizer.ticks(), 30);
    }

    #[test]
    fn test_resize_reinitializes_population() {
        let mut visualizer = ready();
        let view = ViewUniforms::default();
        for _ in 0..5 {
            visualizer.tick(Some(frame(1.0)), &view).unwrap();
        }

        visualizer.resize(1920, 1080);
        assert_eq!(visualizer.phase(), Phase::Ready);
        assert_eq!(
            visualizer.bounds(),
            Some(&SpawnBounds::from_viewport(1920, 1080, 0.8))
        );

        let store = visualizer.pipeline().store().unwrap();
        assert_eq!(store.len(), 256);
        assert!(store
            .current_source()
            .iter()
            .all(|p| p.position == p.home));
    }

    #[test]
    fn test_shutdown_releases_particles() {
        let mut visualizer = ready();
        visualizer.tick(Some(frame(1.0)), &ViewUniforms::default()).unwrap();
        assert_eq!(visualizer.pipeline().particle_count(), 256);

        visualizer.shutdown();
        assert_eq!(visualizer.pipeline().particle_count(), 0);
        assert!(visualizer.pipeline().store().is_none());

        // A second shutdown is a no-op
        visualizer.shutdown();
        assert_eq!(visualizer.phase(), Phase::ShuttingDown);
    }

    #[test]
    fn test_spectrum_reaches_pipeline() {
        let mut visualizer = ready();
        let magnitudes: Vec<f32> = (0..1024).map(|i| i as f32 * 0.001).collect();
        visualizer
            .tick(
                Some(SpectrumFrame::with_volume(magnitudes.clone(), 0.1)),
                &ViewUniforms::default(),
            )
            .unwrap();

        assert_eq!(visualizer.pipeline().spectrum(), magnitudes.as_slice());
        assert_eq!(
            visualizer.pipeline().spectrum(),
            visualizer.analyzer().magnitude_spectrum()
        );
    }

    #[test]
    fn test_overlay_toggle() {
        let mut visualizer = ready();
        assert!(!visualizer.overlay_visible());
        assert!(!visualizer.pipeline().overlay_visible());

        visualizer.handle_input(&InputEvent::KeyPressed(Key::S));
        assert!(visualizer.overlay_visible());
        assert!(visualizer.pipeline().overlay_visible());

        visualizer.handle_input(&InputEvent::KeyPressed(Key::Space));
        assert!(visualizer.overlay_visible());
    }

    #[test]
    fn test_emission_ramps_in_index_order() {
        let mut settings = settings();
        settings.motion.emit_per_tick = 64;
        let mut visualizer =
            Visualizer::new(&settings, HeadlessPipeline::new(settings.motion)).unwrap();
        visualizer
            .setup(SpawnBounds::from_viewport(640, 480, 0.8))
            .unwrap();
        let view = ViewUniforms::default();

        let before = visualizer.pipeline().store().unwrap().current_source().to_vec();
        visualizer.tick(Some(frame(1.0)), &view).unwrap();

        let pipeline = visualizer.pipeline();
        assert_eq!(pipeline.last_view().unwrap().active_count, 64);
        let after = pipeline.store().unwrap().current_source();
        for (i, (new, old)) in after.iter().zip(&before).enumerate() {
            if i < 64 {
                assert_eq!(new.prev_position, old.position);
            } else {
                assert_eq!(new, old);
            }
        }

        for _ in 0..3 {
            visualizer.tick(Some(frame(1.0)), &view).unwrap();
        }
        assert_eq!(visualizer.pipeline().last_view().unwrap().active_count, 256);

        // A new population starts the ramp over
        visualizer.resize(800, 600);
        visualizer.tick(None, &view).unwrap();
        assert_eq!(visualizer.pipeline().last_view().unwrap().active_count, 64);
    }

    /// Headless pipeline whose second `load` fails
    struct FailingReload {
        inner: HeadlessPipeline,
        loads: usize,
    }

    impl ParticlePipeline for FailingReload {
        fn load(&mut self, store: ParticleStore) -> Result<()> {
            self.loads += 1;
            if self.loads > 1 {
                return Err(PulseError::Gpu("out of device memory".to_string()));
            }
            self.inner.load(store)
        }

        fn update(&mut self, signals: &FrameSignals) -> Result<()> {
            self.inner.update(signals)
        }

        fn swap(&mut self) {
            self.inner.swap()
        }

        fn set_spectrum(&mut self, magnitudes: &[f32]) {
            self.inner.set_spectrum(magnitudes)
        }

        fn set_overlay_visible(&mut self, visible: bool) {
            self.inner.set_overlay_visible(visible)
        }

        fn render(&mut self, view: &ViewUniforms) -> Result<()> {
            self.inner.render(view)
        }

        fn release(&mut self) {
            self.inner.release()
        }

        fn particle_count(&self) -> usize {
            self.inner.particle_count()
        }
    }

    #[test]
    fn test_failed_resize_surfaces_error() {
        let settings = settings();
        let pipeline = FailingReload {
            inner: HeadlessPipeline::new(settings.motion),
            loads: 0,
        };
        let mut visualizer = Visualizer::new(&settings, pipeline).unwrap();
        visualizer
            .setup(SpawnBounds::from_viewport(640, 480, 0.8))
            .unwrap();
        assert!(visualizer.take_error().is_none());

        visualizer.resize(1024, 768);
        assert!(matches!(visualizer.take_error(), Some(PulseError::Gpu(_))));
        assert!(visualizer.take_error().is_none());
    }

    #[test]
    fn test_resize_after_shutdown_ignored() {
        let mut visualizer = ready();
        visualizer.shutdown();
        visualizer.resize(1024, 768);
        assert!(visualizer.take_error().is_none());
        assert_eq!(visualizer.pipeline().particle_count(), 0);
    }

    #[test]
    fn test_zero_size_resize_ignored() {
        let mut visualizer = ready();
        visualizer.tick(None, &ViewUniforms::default()).unwrap();
        visualizer.resize(0, 0);
        assert_eq!(visualizer.phase(), Phase::Ticking);
    }
}
