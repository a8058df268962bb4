//! Per-tick particle motion: momentum, spring toward home, beat push.
//!
//! This is the reference the compute shader mirrors; the headless pipeline
//! runs it directly.

use glam::Vec3;

use super::particle::Particle;
use crate::params::MotionParams;

/// Map a normalized volume to the activity multiplier.
///
/// `volume` is clamped to [0, 1], lerped into [0.1, 10] and squared, so
/// quiet passages barely move the field and loud ones move it a lot.
pub fn activity_from_volume(volume: f32) -> f32 {
    let v = if volume.is_finite() {
        volume.clamp(0.0, 1.0)
    } else {
        0.0
    };
    let level = 0.1 + (10.0 - 0.1) * v;
    level * level
}

/// Everything the update stage needs for one tick
#[derive(Debug, Clone, PartialEq)]
pub struct FrameSignals {
    /// Beat per group, bias already added
    pub beats: Vec<f32>,

    /// Volume-derived motion multiplier
    pub activity: f32,

    /// Accumulated simulation time (seconds)
    pub time: f32,

    /// Particles with an index below this move; the rest hold still
    pub active_count: u32,
}

impl FrameSignals {
    pub fn new(raw_beats: &[f32], volume: f32, time: f32, motion: &MotionParams) -> Self {
        Self {
            beats: raw_beats.iter().map(|b| b + motion.beat_bias).collect(),
            activity: activity_from_volume(volume * motion.volume_gain),
            time,
            active_count: u32::MAX,
        }
    }

    pub fn with_active_count(self, active_count: u32) -> Self {
        Self {
            active_count,
            ..self
        }
    }

    pub fn is_active(&self, index: usize) -> bool {
        (index as u64) < self.active_count as u64
    }

    /// Beat for `group`, 0 for groups without a signal
    pub fn beat(&self, group: u32) -> f32 {
        self.beats.get(group as usize).copied().unwrap_or(0.0)
    }
}

/// Fixed-step clock; advances by the same delta every tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationClock {
    time: f32,
    delta: f32,
}

impl SimulationClock {
    pub fn new(delta: f32) -> Self {
        Self { time: 0.0, delta }
    }

    /// Advance one tick and return the new time
    pub fn tick(&mut self) -> f32 {
        self.time += self.delta;
        self.time
    }

    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn reset(&mut self) {
        self.time = 0.0;
    }
}

/// Pseudo-random push direction, stable for a given home and time.
/// Kept in sync with `push_direction` in particle_update.wgsl.
pub fn push_direction(home: Vec3, time: f32) -> Vec3 {
    let phase = home * 0.013;
    Vec3::new(
        (time * 1.7 + phase.x + phase.y).sin(),
        (time * 1.3 + phase.y + phase.z).cos(),
        (time * 1.1 + phase.z + phase.x).sin(),
    )
}

/// Advance one particle by one tick.
///
/// Only the position pair changes; group, size, color, damping and home are
/// carried through untouched.
pub fn update_particle(particle: &Particle, signals: &FrameSignals, motion: &MotionParams) -> Particle {
    let position = Vec3::from_array(particle.position);
    let previous = Vec3::from_array(particle.prev_position);
    let home = Vec3::from_array(particle.home);

    let retention = (1.0 - particle.damping * motion.friction_scale).clamp(0.0, 1.0);
    let velocity = (position - previous) * retention;
    let spring = (home - position) * motion.spring;

    let strength = signals.beat(particle.group) * signals.activity * motion.push_scale;
    let push = push_direction(home, signals.time) * strength;

    Particle {
        position: (position + velocity + spring + push).to_array(),
        prev_position: position.to_array(),
        ..*particle
    }
}

/// Write `update_particle(source[i])` into `destination[i]` for every
/// active i; inactive particles are copied unchanged
pub fn update_all(
    source: &[Particle],
    destination: &mut [Particle],
    signals: &FrameSignals,
    motion: &MotionParams,
) {
    debug_assert_eq!(source.len(), destination.len());
    for (i, (out, particle)) in destination.iter_mut().zip(source).enumerate() {
        *out = if signals.is_active(i) {
            update_particle(particle, signals, motion)
        } else {
            *particle
        };
    }
}

/// Number of particles released after `ticks` updates of a fresh population
pub fn emitter_cap(ticks: u64, emit_per_tick: u32, count: usize) -> u32 {
    let count = count.min(u32::MAX as usize) as u32;
    if emit_per_tick == 0 {
        return count;
    }
    ticks
        .saturating_mul(emit_per_tick as u64)
        .min(count as u64) as u32
}
