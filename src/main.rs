//! Pulsefield - a particle field that breathes with the music
//!
//! Half a million sprites drift around their homes; every frequency band
//! kicks its own share of them on the beat, and the overall loudness sets
//! how wild the whole field gets.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use winit::{
    application::ApplicationHandler,
    event::*,
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Fullscreen, Window, WindowId},
};

use pulsefield::audio::{AudioSource, AudioSystem, DecodedAudio, OfflineSpectra};
use pulsefield::camera::OrbitCamera;
use pulsefield::cli::Args;
use pulsefield::component::{self, Component, InputEvent, Key};
use pulsefield::params::Settings;
use pulsefield::particles::SpawnBounds;
use pulsefield::rendering::{
    GpuPipeline, HeadlessPipeline, ParticlePipeline, SpriteImage, ViewUniforms,
};
use pulsefield::visualizer::Visualizer;

/// Pixels of trackpad scroll that count as one wheel line
const PIXELS_PER_LINE: f32 = 40.0;

/// Main application state
struct App {
    settings: Settings,
    source: AudioSource,

    window: Option<Arc<Window>>,
    visualizer: Option<Visualizer<GpuPipeline>>,
    camera: OrbitCamera,
    audio: Option<AudioSystem>,

    /// Fatal error that ended the event loop
    error: Option<anyhow::Error>,
}

impl App {
    fn new(settings: Settings, source: AudioSource) -> Self {
        let camera = OrbitCamera::new(&settings.render, settings.controls.clone());
        Self {
            settings,
            source,
            window: None,
            visualizer: None,
            camera,
            audio: None,
            error: None,
        }
    }

    fn initialize(&mut self, event_loop: &ActiveEventLoop) -> anyhow::Result<()> {
        let render = &self.settings.render;
        let mut window_attributes = Window::default_attributes()
            .with_title("Pulsefield")
            .with_inner_size(winit::dpi::LogicalSize::new(
                render.window_width,
                render.window_height,
            ));
        if render.launch_fullscreen {
            window_attributes = window_attributes.with_fullscreen(Some(Fullscreen::Borderless(None)));
        }

        let window = Arc::new(
            event_loop
                .create_window(window_attributes)
                .context("failed to create window")?,
        );
        let size = window.inner_size();

        // Camera frames the actual surface, not the requested logical size
        let mut framed = render.clone();
        framed.window_width = size.width.max(1);
        framed.window_height = size.height.max(1);
        self.camera = OrbitCamera::new(&framed, self.settings.controls.clone());

        let sprite = SpriteImage::from_path_or_glow(render.sprite_path.as_deref())?;
        let pipeline = pollster::block_on(GpuPipeline::new(
            Arc::clone(&window),
            render,
            self.settings.motion,
            &sprite,
        ))?;

        let mut visualizer = Visualizer::new(&self.settings, pipeline)?;
        visualizer.setup(SpawnBounds::from_viewport(
            size.width,
            size.height,
            self.settings.particles.spread,
        ))?;

        let audio = AudioSystem::start(&self.source, &self.settings.fft)
            .context("failed to start audio")?;

        log::info!("Pulsefield is running");
        log::info!("Space: play/pause  Left/Right: seek  S: spectrum  F: fullscreen  Esc: quit");

        self.window = Some(window);
        self.visualizer = Some(visualizer);
        self.audio = Some(audio);
        Ok(())
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: anyhow::Error) {
        self.error = Some(error);
        event_loop.exit();
    }

    /// Fan an input event out to every component
    fn dispatch(&mut self, event: InputEvent) {
        let mut registry: Vec<&mut dyn Component> = Vec::with_capacity(3);
        if let Some(audio) = self.audio.as_mut() {
            registry.push(audio);
        }
        registry.push(&mut self.camera);
        if let Some(visualizer) = self.visualizer.as_mut() {
            registry.push(visualizer);
        }
        component::dispatch(&mut registry, &event);
    }

    fn toggle_fullscreen(&self) {
        if let Some(window) = &self.window {
            let fullscreen = match window.fullscreen() {
                Some(_) => None,
                None => Some(Fullscreen::Borderless(None)),
            };
            window.set_fullscreen(fullscreen);
        }
    }

    /// Run one tick of the visualizer with the newest audio
    fn render_frame(&mut self) -> pulsefield::Result<()> {
        let (Some(visualizer), Some(audio)) = (self.visualizer.as_mut(), self.audio.as_ref()) else {
            return Ok(());
        };
        if let Some(e) = visualizer.take_error() {
            return Err(e);
        }

        let (width, height) = self.camera.viewport();
        let view = ViewUniforms::new(
            self.camera.view_proj(),
            width,
            height,
            self.settings.render.point_scale,
        );
        visualizer.tick(audio.latest_frame(), &view)
    }
}

fn translate_key(code: KeyCode) -> Key {
    match code {
        KeyCode::Space => Key::Space,
        KeyCode::Escape => Key::Escape,
        KeyCode::KeyF => Key::F,
        KeyCode::KeyS => Key::S,
        KeyCode::ArrowLeft => Key::Left,
        KeyCode::ArrowRight => Key::Right,
        _ => Key::Other,
    }
}

fn translate_button(button: MouseButton) -> component::MouseButton {
    match button {
        MouseButton::Left => component::MouseButton::Left,
        MouseButton::Right => component::MouseButton::Right,
        MouseButton::Middle => component::MouseButton::Middle,
        _ => component::MouseButton::Other,
    }
}

impl ApplicationHandler for App {
    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }

    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        if let Err(e) = self.initialize(event_loop) {
            self.fail(event_loop, e);
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        state: ElementState::Pressed,
                        physical_key: PhysicalKey::Code(code),
                        repeat: false,
                        ..
                    },
                ..
            } => {
                let key = translate_key(code);
                match key {
                    Key::Escape => event_loop.exit(),
                    Key::F => self.toggle_fullscreen(),
                    _ => {}
                }
                self.dispatch(InputEvent::KeyPressed(key));
            }
            WindowEvent::MouseInput { state, button, .. } => {
                let button = translate_button(button);
                self.dispatch(match state {
                    ElementState::Pressed => InputEvent::MousePressed(button),
                    ElementState::Released => InputEvent::MouseReleased(button),
                });
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.dispatch(InputEvent::CursorMoved {
                    x: position.x as f32,
                    y: position.y as f32,
                });
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let lines = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(p) => p.y as f32 / PIXELS_PER_LINE,
                };
                self.dispatch(InputEvent::Scroll { lines });
            }
            WindowEvent::Resized(size) => {
                self.dispatch(InputEvent::Resized {
                    width: size.width,
                    height: size.height,
                });
            }
            WindowEvent::RedrawRequested => {
                if let Err(e) = self.render_frame() {
                    self.fail(event_loop, e.into());
                }
            }
            _ => {}
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        let mut registry: Vec<&mut dyn Component> = Vec::with_capacity(3);
        if let Some(audio) = self.audio.as_mut() {
            registry.push(audio);
        }
        registry.push(&mut self.camera);
        if let Some(visualizer) = self.visualizer.as_mut() {
            registry.push(visualizer);
        }
        component::shutdown_all(&mut registry);
    }
}

/// Simulate `args.frames` ticks on the CPU and log the signals
fn run_headless(args: &Args, settings: &Settings, source: AudioSource) -> anyhow::Result<()> {
    let render = &settings.render;
    let mut visualizer = Visualizer::new(settings, HeadlessPipeline::new(settings.motion))?;
    visualizer.setup(SpawnBounds::from_viewport(
        render.window_width,
        render.window_height,
        settings.particles.spread,
    ))?;

    let camera = OrbitCamera::new(render, settings.controls.clone());
    let view = ViewUniforms::new(
        camera.view_proj(),
        render.window_width,
        render.window_height,
        render.point_scale,
    );
    let ticks_per_second = (1.0 / settings.motion.tick_delta_s).round().max(1.0) as u64;

    let log_progress = |visualizer: &Visualizer<HeadlessPipeline>| {
        if visualizer.ticks() % ticks_per_second == 0 {
            if let Some(signals) = visualizer.last_signals() {
                log::info!(
                    "t={:5.1}s beats={:.3?} volume={:.4} activity={:.2}",
                    visualizer.time(),
                    signals.beats,
                    visualizer.analyzer().volume(),
                    signals.activity
                );
            }
        }
    };

    match &source {
        AudioSource::File(path) => {
            let audio = DecodedAudio::load_wav(path)?;
            let mut spectra =
                OfflineSpectra::new(&audio, settings.fft.clone(), settings.motion.tick_delta_s)?;
            for _ in 0..args.frames {
                visualizer.tick(Some(spectra.next_frame()), &view)?;
                log_progress(&visualizer);
            }
        }
        AudioSource::Device(_) => {
            let mut audio = AudioSystem::start(&source, &settings.fft)?;
            let tick = Duration::from_secs_f32(settings.motion.tick_delta_s);
            for _ in 0..args.frames {
                std::thread::sleep(tick);
                visualizer.tick(audio.latest_frame(), &view)?;
                log_progress(&visualizer);
            }
            audio.shutdown();
        }
    }

    log::info!(
        "Simulated {} particles for {} ticks",
        visualizer.pipeline().particle_count(),
        visualizer.ticks()
    );
    visualizer.shutdown();
    Ok(())
}

fn run(args: Args) -> anyhow::Result<()> {
    let settings = args.settings().context("invalid configuration")?;
    let source = args.audio_source()?;

    if args.headless {
        return run_headless(&args, &settings, source);
    }

    let mut app = App::new(settings, source);
    let event_loop = EventLoop::new().context("failed to create event loop")?;
    event_loop.run_app(&mut app)?;

    match app.error.take() {
        Some(error) => Err(error),
        None => Ok(()),
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run(Args::parse()) {
        log::error!("{:#}", e);
        std::process::exit(1);
    }
}
