//! Audio collaborator: sources, transport and the spectral monitor.
//!
//! Audio callbacks push mono sample blocks to a monitor thread over a
//! bounded channel; the monitor publishes [`SpectrumFrame`]s that the tick
//! thread drains. Nothing is shared mutably across threads except the
//! atomic playhead.
//!
//! [`SpectrumFrame`]: crate::analysis::SpectrumFrame

mod fft;
mod offline;
mod source;
mod system;
mod transport;

pub use fft::{spawn_fft_thread, window_coefficients, SpectralMonitor};
pub use offline::OfflineSpectra;
pub use source::{AudioSource, DecodedAudio, FilePlayer};
pub use system::AudioSystem;
pub use transport::{Playhead, Transport, SEEK_STEP_S};
