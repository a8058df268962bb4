//! Error taxonomy shared by setup, audio and GPU code.
//!
//! Only setup-time failures travel through this type. Per-tick anomalies
//! (NaN magnitudes, a missing audio frame, a lost surface) are recovered
//! where they happen and never reach the caller.

use thiserror::Error;

/// Fatal errors raised while bringing the visualizer up or tearing it down
#[derive(Error, Debug)]
pub enum PulseError {
    /// Invalid parameter combination (group count, particle count, ...)
    #[error("configuration error: {0}")]
    Config(String),

    /// Audio device or stream could not be opened
    #[error("audio error: {0}")]
    Audio(String),

    /// Asset (audio file, sprite texture) missing or unreadable
    #[error("asset error ({path}): {reason}")]
    Asset { path: String, reason: String },

    /// GPU adapter, device, surface or pipeline creation failed
    #[error("GPU error: {0}")]
    Gpu(String),

    /// Operation not allowed in the current lifecycle phase
    #[error("invalid state: {0}")]
    InvalidState(&'static str),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("WAV decode error: {0}")]
    Wav(#[from] hound::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("config file error: {0}")]
    ConfigFile(#[from] toml::de::Error),
}

impl PulseError {
    /// Shorthand for configuration errors built from a format string
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn asset(path: impl Into<String>, reason: impl ToString) -> Self {
        Self::Asset {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

/// Result type used throughout the crate
pub type Result<T> = std::result::Result<T, PulseError>;
