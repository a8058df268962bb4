//! Particle population, double buffering and the motion model.

mod particle;
mod pingpong;
mod store;
mod update;

pub use particle::{hsv_to_rgb, Particle};
pub use pingpong::PingPong;
pub use store::{group_of, ParticleStore, SpawnBounds};
pub use update::{
    activity_from_volume, emitter_cap, push_direction, update_all, update_particle, FrameSignals,
    SimulationClock,
};
