//! Deterministic spectra from a decoded file, one per simulation tick.

use super::fft::SpectralMonitor;
use super::source::DecodedAudio;
use crate::analysis::SpectrumFrame;
use crate::error::Result;
use crate::params::FftConfig;

/// Walks a file at a fixed number of samples per tick, looping at the end.
/// Used by headless runs where no audio device is involved.
pub struct OfflineSpectra {
    mono: Vec<f32>,
    monitor: SpectralMonitor,
    cursor: usize,
    samples_per_tick: usize,
    window: Vec<f32>,
}

impl OfflineSpectra {
    pub fn new(audio: &DecodedAudio, fft: FftConfig, tick_delta_s: f32) -> Result<Self> {
        let samples_per_tick = ((audio.sample_rate as f32 * tick_delta_s).round() as usize).max(1);
        let window = vec![0.0; fft.window_size];
        Ok(Self {
            mono: audio.mono_samples(),
            monitor: SpectralMonitor::new(fft)?,
            cursor: 0,
            samples_per_tick,
            window,
        })
    }

    pub fn samples_per_tick(&self) -> usize {
        self.samples_per_tick
    }

    /// Spectrum of the window ending at the current position, then advance
    pub fn next_frame(&mut self) -> SpectrumFrame {
        let length = self.mono.len();
        if length == 0 {
            return self.monitor.process(&[]);
        }

        // Window ending at the cursor, wrapping backwards into the file's tail
        let size = self.window.len();
        for (i, slot) in self.window.iter_mut().enumerate() {
            let offset = (self.cursor + length * size.div_ceil(length) + i - size) % length;
            *slot = self.mono[offset];
        }

        self.cursor = (self.cursor + self.samples_per_tick) % length;
        self.monitor.process(&self.window)
    }
}

impl Iterator for OfflineSpectra {
    type Item = SpectrumFrame;

    fn next(&mut self) -> Option<SpectrumFrame> {
        Some(self.next_frame())
    }
}
