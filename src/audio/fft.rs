//! Spectral monitor: windowed FFT over the most recent samples.

use std::f32::consts::PI;
use std::sync::Arc;
use std::thread;

use crossbeam_channel::{Receiver, Sender, TrySendError};
use rustfft::{num_complex::Complex, Fft, FftPlanner};

use crate::analysis::SpectrumFrame;
use crate::error::Result;
use crate::params::{FftConfig, WindowFunction};

/// Window coefficients of length `size`
pub fn window_coefficients(kind: WindowFunction, size: usize) -> Vec<f32> {
    if size < 2 {
        return vec![1.0; size];
    }
    let denom = (size - 1) as f32;
    (0..size)
        .map(|i| {
            let phase = 2.0 * PI * i as f32 / denom;
            match kind {
                WindowFunction::Hann => 0.5 * (1.0 - phase.cos()),
                WindowFunction::Blackman => 0.42 - 0.5 * phase.cos() + 0.08 * (2.0 * phase).cos(),
            }
        })
        .collect()
}

/// Turns blocks of mono samples into smoothed magnitude spectra
pub struct SpectralMonitor {
    config: FftConfig,
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    buffer: Vec<Complex<f32>>,
    smoothed: Vec<f32>,
}

impl SpectralMonitor {
    pub fn new(config: FftConfig) -> Result<Self> {
        config.validate()?;

        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(config.fft_size);

        Ok(Self {
            window: window_coefficients(config.window, config.window_size),
            buffer: vec![Complex::new(0.0, 0.0); config.fft_size],
            smoothed: vec![0.0; config.bin_count()],
            fft,
            config,
        })
    }

    /// Analyse the last `window_size` samples of `samples` (zero-padded when
    /// fewer are given) and blend the result into the smoothed spectrum.
    ///
    /// The frame volume is the RMS of the raw, unwindowed samples.
    pub fn process(&mut self, samples: &[f32]) -> SpectrumFrame {
        let window_size = self.config.window_size;
        let block = &samples[samples.len().saturating_sub(window_size)..];

        for (i, slot) in self.buffer.iter_mut().enumerate() {
            let sample = if i < block.len() {
                block[i] * self.window[i]
            } else {
                0.0
            };
            *slot = Complex::new(sample, 0.0);
        }

        self.fft.process(&mut self.buffer);

        let scale = 1.0 / self.config.fft_size as f32;
        let keep = self.config.smoothing_factor;
        for (smoothed, bin) in self.smoothed.iter_mut().zip(&self.buffer) {
            let magnitude = bin.norm() * scale;
            *smoothed = *smoothed * keep + magnitude * (1.0 - keep);
        }

        let volume = if block.is_empty() {
            0.0
        } else {
            (block.iter().map(|s| s * s).sum::<f32>() / block.len() as f32).sqrt()
        };

        SpectrumFrame::with_volume(self.smoothed.clone(), volume)
    }

    pub fn config(&self) -> &FftConfig {
        &self.config
    }
}

/// Spawn the monitor thread.
///
/// Consumes sample blocks from `samples` and publishes one frame per half
/// window of new audio. When `frames` is full the oldest queued frame is
/// discarded through `overflow` so the newest always gets in. The thread
/// exits once every sample sender has been dropped.
pub fn spawn_fft_thread(
    config: FftConfig,
    samples: Receiver<Vec<f32>>,
    frames: Sender<SpectrumFrame>,
    overflow: Receiver<SpectrumFrame>,
) -> Result<thread::JoinHandle<()>> {
    let mut monitor = SpectralMonitor::new(config)?;

    let handle = thread::Builder::new()
        .name("spectral-monitor".to_string())
        .spawn(move || {
            let window_size = monitor.config().window_size;
            let hop = (window_size / 2).max(1);
            let mut pending: Vec<f32> = Vec::with_capacity(window_size * 2);

            while let Ok(block) = samples.recv() {
                pending.extend_from_slice(&block);

                while pending.len() >= window_size {
                    let mut frame = monitor.process(&pending[..window_size]);
                    loop {
                        match frames.try_send(frame) {
                            Ok(()) => break,
                            Err(TrySendError::Full(rejected)) => {
                                let _ = overflow.try_recv();
                                frame = rejected;
                            }
                            Err(TrySendError::Disconnected(_)) => return,
                        }
                    }
                    pending.drain(..hop);
                }
            }

            log::debug!("Sample channel closed, spectral monitor exiting");
        })?;

    Ok(handle)
}
