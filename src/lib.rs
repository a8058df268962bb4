//! Pulsefield library - audio-reactive GPU particle field

pub mod analysis;
pub mod audio;
pub mod camera;
pub mod cli;
pub mod component;
pub mod error;
pub mod params;
pub mod particles;
pub mod rendering;
pub mod visualizer;

pub use error::{PulseError, Result};
