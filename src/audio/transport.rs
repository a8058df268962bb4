//! Play/pause and seek for file playback.
//!
//! The audio callback and the UI thread share a [`Playhead`] made of
//! atomics; the UI-side [`Transport`] keeps the paused position itself.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Seconds moved by one seek key press
pub const SEEK_STEP_S: f64 = 5.0;

/// Marker for "no seek pending"; not a valid f64 bit pattern we ever store
const NO_SEEK: u64 = u64::MAX;

/// Lock-free playback position shared with the audio callback
#[derive(Debug)]
pub struct Playhead {
    playing: AtomicBool,
    /// Fractional frame position as f64 bits
    position: AtomicU64,
    /// Requested position as f64 bits, or NO_SEEK
    pending_seek: AtomicU64,
}

impl Playhead {
    fn new() -> Self {
        Self {
            playing: AtomicBool::new(true),
            position: AtomicU64::new(0f64.to_bits()),
            pending_seek: AtomicU64::new(NO_SEEK),
        }
    }

    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::Acquire)
    }

    /// Frame position last written by the audio callback
    pub fn position(&self) -> f64 {
        f64::from_bits(self.position.load(Ordering::Acquire))
    }

    pub fn store_position(&self, frames: f64) {
        self.position.store(frames.to_bits(), Ordering::Release);
    }

    /// Consume a pending seek, if any
    pub fn take_seek(&self) -> Option<f64> {
        match self.pending_seek.swap(NO_SEEK, Ordering::AcqRel) {
            NO_SEEK => None,
            bits => Some(f64::from_bits(bits)),
        }
    }

    fn request_seek(&self, frames: f64) {
        self.pending_seek.store(frames.to_bits(), Ordering::Release);
        // Readers that poll position before the callback runs see the target
        self.store_position(frames);
    }

    fn set_playing(&self, playing: bool) {
        self.playing.store(playing, Ordering::Release);
    }
}

/// UI-side transport controls for one loaded file
pub struct Transport {
    playhead: Arc<Playhead>,
    total_frames: u64,
    sample_rate: u32,
    paused_at: Option<f64>,
}

impl Transport {
    /// Transport for a file of `total_frames` frames, starting playback at 0
    pub fn new(total_frames: u64, sample_rate: u32) -> Self {
        Self {
            playhead: Arc::new(Playhead::new()),
            total_frames,
            sample_rate,
            paused_at: None,
        }
    }

    /// Shared handle for the audio callback
    pub fn playhead(&self) -> Arc<Playhead> {
        Arc::clone(&self.playhead)
    }

    /// Pause (remembering the position) or resume from the remembered
    /// position. Returns whether playback is now running.
    pub fn toggle(&mut self) -> bool {
        if self.playhead.is_playing() {
            self.paused_at = Some(self.playhead.position());
            self.playhead.set_playing(false);
            false
        } else {
            if let Some(position) = self.paused_at.take() {
                self.playhead.request_seek(position);
            }
            self.playhead.set_playing(true);
            true
        }
    }

    /// Move by `seconds` (negative seeks back), wrapping around the file
    pub fn seek_by(&mut self, seconds: f64) {
        if self.total_frames == 0 {
            return;
        }
        let length = self.total_frames as f64;
        let current = self.paused_at.unwrap_or_else(|| self.playhead.position());
        let target = (current + seconds * self.sample_rate as f64).rem_euclid(length);

        if self.paused_at.is_some() {
            self.paused_at = Some(target);
        }
        self.playhead.request_seek(target);
    }

    pub fn is_playing(&self) -> bool {
        self.playhead.is_playing()
    }

    pub fn position_frames(&self) -> f64 {
        self.paused_at.unwrap_or_else(|| self.playhead.position())
    }

    pub fn position_seconds(&self) -> f64 {
        self.position_frames() / self.sample_rate.max(1) as f64
    }

    pub fn paused_at(&self) -> Option<f64> {
        self.paused_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_playing_at_zero() {
        let transport = Transport::new(1000, 100);
        assert!(transport.is_playing());
        assert_eq!(transport.position_frames(), 0.0);
        assert_eq!(transport.playhead().take_seek(), None);
    }

    #[test]
    fn test_toggle_remembers_position() {
        let mut transport = Transport::new(10_000, 100);
        let playhead = transport.playhead();
        playhead.store_position(1234.5);

        assert!(!transport.toggle());
        assert_eq!(transport.paused_at(), Some(1234.5));

        // Callback keeps writing while paused; the remembered value wins
        playhead.store_position(0.0);
        assert!(transport.toggle());
        assert_eq!(playhead.take_seek(), Some(1234.5));
        assert_eq!(transport.paused_at(), None);
    }

    #[test]
    fn test_seek_wraps() {
        let mut transport = Transport::new(1000, 100);
        let playhead = transport.playhead();

        transport.seek_by(-SEEK_STEP_S);
        assert_eq!(playhead.take_seek(), Some(500.0));

        transport.seek_by(SEEK_STEP_S * 2.0);
        // 500 + 1000 wraps to 500
        assert_eq!(playhead.take_seek(), Some(500.0));
        assert_eq!(playhead.take_seek(), None);
    }

    #[test]
    fn test_seek_while_paused_moves_resume_point() {
        let mut transport = Transport::new(10_000, 100);
        transport.playhead().store_position(2000.0);
        transport.toggle();

        transport.seek_by(SEEK_STEP_S);
        assert_eq!(transport.paused_at(), Some(2500.0));
        assert!((transport.position_seconds() - 25.0).abs() < 1e-9);

        transport.toggle();
        assert_eq!(transport.playhead().take_seek(), Some(2500.0));
    }
}
