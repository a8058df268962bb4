//! Particle pipelines: GPU compute + sprite rendering, and a CPU fallback.
//!
//! Both implement [`ParticlePipeline`], which is all the visualizer sees.

mod gpu;
mod headless;
mod sprite;

pub use gpu::GpuPipeline;
pub use headless::HeadlessPipeline;
pub use sprite::SpriteImage;

use bytemuck::{Pod, Zeroable};
use glam::Mat4;

use crate::error::Result;
use crate::particles::{FrameSignals, ParticleStore};
use crate::params::MotionParams;

/// Compute shader workgroup size; must match `@workgroup_size` in
/// particle_update.wgsl
pub const WORKGROUP_SIZE: u32 = 256;

/// Per-frame camera data for the sprite shader
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct ViewUniforms {
    pub view_proj: [[f32; 4]; 4],
    pub viewport: [f32; 2],
    pub point_scale: f32,
    /// Instances at or past this index are not drawn
    pub active_count: u32,
}

impl ViewUniforms {
    pub fn new(view_proj: Mat4, width: u32, height: u32, point_scale: f32) -> Self {
        Self {
            view_proj: view_proj.to_cols_array_2d(),
            viewport: [width.max(1) as f32, height.max(1) as f32],
            point_scale,
            active_count: u32::MAX,
        }
    }
}

impl Default for ViewUniforms {
    fn default() -> Self {
        Self::new(Mat4::IDENTITY, 1, 1, 1.0)
    }
}

/// Uniform block for the update shader
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct SimParams {
    pub activity: f32,
    pub time: f32,
    pub spring: f32,
    pub friction_scale: f32,
    pub push_scale: f32,
    pub group_count: u32,
    pub particle_count: u32,
    pub active_count: u32,
}

impl SimParams {
    pub fn new(signals: &FrameSignals, motion: &MotionParams, particle_count: usize) -> Self {
        Self {
            activity: signals.activity,
            time: signals.time,
            spring: motion.spring,
            friction_scale: motion.friction_scale,
            push_scale: motion.push_scale,
            group_count: signals.beats.len() as u32,
            particle_count: particle_count as u32,
            active_count: signals.active_count.min(particle_count as u32),
        }
    }
}

/// Uniform block for the spectrum overlay shader
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct OverlayUniforms {
    pub bin_count: f32,
    /// Tallest bar, in NDC units (2.0 spans the whole window)
    pub max_height: f32,
    pub _padding: [f32; 2],
}

impl OverlayUniforms {
    pub fn new(bin_count: usize, max_height: f32) -> Self {
        Self {
            bin_count: bin_count.max(1) as f32,
            max_height,
            _padding: [0.0; 2],
        }
    }
}

/// Number of workgroups needed to cover `particle_count` invocations
pub fn workgroup_count(particle_count: usize) -> u32 {
    (particle_count as u32).div_ceil(WORKGROUP_SIZE)
}

/// Double-buffered particle simulation plus presentation.
///
/// Per tick the visualizer calls `update`, then `swap`, then `render`, so
/// rendering always draws the buffer the update just wrote.
pub trait ParticlePipeline {
    /// Take ownership of a freshly initialized population, replacing any
    /// previous one
    fn load(&mut self, store: ParticleStore) -> Result<()>;

    /// Run one update step from the source buffer into the destination
    fn update(&mut self, signals: &FrameSignals) -> Result<()>;

    /// Exchange source and destination roles
    fn swap(&mut self);

    /// Magnitude spectrum of the frame just analysed, for the overlay
    fn set_spectrum(&mut self, magnitudes: &[f32]);

    /// Show or hide the spectrum overlay
    fn set_overlay_visible(&mut self, visible: bool);

    /// Draw the current source buffer
    fn render(&mut self, view: &ViewUniforms) -> Result<()>;

    /// Viewport changed; surface-backed pipelines reconfigure here
    fn resize(&mut self, _width: u32, _height: u32) {}

    /// Drop the particle population and every buffer holding it
    fn release(&mut self);

    fn particle_count(&self) -> usize;
}
