//! Audio system: cpal streams feeding the spectral monitor thread.

use std::path::Path;
use std::sync::Arc;
use std::thread;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::{bounded, Receiver};

use super::fft::spawn_fft_thread;
use super::source::{AudioSource, DecodedAudio, FilePlayer};
use super::transport::{Transport, SEEK_STEP_S};
use crate::analysis::SpectrumFrame;
use crate::component::{Component, InputEvent, Key};
use crate::error::{PulseError, Result};
use crate::params::FftConfig;

/// Sample blocks buffered between the audio callback and the monitor
const SAMPLE_QUEUE_DEPTH: usize = 64;

/// Spectra buffered between the monitor and the tick thread
const FRAME_QUEUE_DEPTH: usize = 4;

/// Output gain for file playback
const PLAYBACK_GAIN: f32 = 0.5;

/// Running audio source plus the monitor analysing it
pub struct AudioSystem {
    /// Spectra from the monitor thread
    frames: Receiver<SpectrumFrame>,

    /// Playback controls (file playback only)
    transport: Option<Transport>,

    /// Audio stream (kept alive until shutdown)
    stream: Option<cpal::Stream>,

    /// Monitor thread; exits once the stream's sample sender is dropped
    monitor: Option<thread::JoinHandle<()>>,
}

impl AudioSystem {
    /// Open `source` and start streaming and analysing it
    pub fn start(source: &AudioSource, fft_config: &FftConfig) -> Result<Self> {
        fft_config.validate()?;
        match source {
            AudioSource::File(path) => Self::start_file(path, fft_config),
            AudioSource::Device(name) => Self::start_capture(name.as_deref(), fft_config),
        }
    }

    fn start_file(path: &Path, fft_config: &FftConfig) -> Result<Self> {
        let audio = Arc::new(DecodedAudio::load_wav(path)?);

        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| PulseError::Audio("no audio output device found".to_string()))?;
        let supported = device
            .default_output_config()
            .map_err(|e| PulseError::Audio(format!("failed to get output config: {}", e)))?;

        let device_rate = supported.sample_rate().0;
        let channels = supported.channels() as usize;
        log::info!(
            "Audio out: {} @ {}Hz, {} ch",
            device.name().unwrap_or_else(|_| "Unknown".to_string()),
            device_rate,
            channels
        );
        if audio.sample_rate != device_rate {
            log::info!(
                "Resampling {}Hz file to {}Hz output",
                audio.sample_rate,
                device_rate
            );
        }

        let transport = Transport::new(audio.frames() as u64, audio.sample_rate);
        let mut player = FilePlayer::new(audio, transport.playhead(), device_rate, PLAYBACK_GAIN);

        let (sample_tx, sample_rx) = bounded::<Vec<f32>>(SAMPLE_QUEUE_DEPTH);
        let (frame_tx, frame_rx) = bounded(FRAME_QUEUE_DEPTH);

        let stream = device
            .build_output_stream(
                &supported.config(),
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let mut tap = Vec::with_capacity(data.len() / channels.max(1));
                    player.fill(data, channels, &mut tap);
                    // Never block the audio thread; a full queue drops the block
                    let _ = sample_tx.try_send(tap);
                },
                |err| log::warn!("Audio stream error: {}", err),
                None,
            )
            .map_err(|e| PulseError::Audio(format!("failed to build output stream: {}", e)))?;

        stream
            .play()
            .map_err(|e| PulseError::Audio(format!("failed to start output stream: {}", e)))?;

        // Analysis runs at the device rate since that is what the tap carries
        let monitor = spawn_fft_thread(fft_config.clone(), sample_rx, frame_tx, frame_rx.clone())?;
        log_geometry(fft_config, device_rate);

        Ok(Self {
            frames: frame_rx,
            transport: Some(transport),
            stream: Some(stream),
            monitor: Some(monitor),
        })
    }

    fn start_capture(name: Option<&str>, fft_config: &FftConfig) -> Result<Self> {
        let host = cpal::default_host();
        let device = match name {
            Some(name) => host
                .input_devices()
                .map_err(|e| PulseError::Audio(format!("failed to list input devices: {}", e)))?
                .find(|d| d.name().map(|n| n == name).unwrap_or(false))
                .ok_or_else(|| PulseError::Audio(format!("input device '{}' not found", name)))?,
            None => host
                .default_input_device()
                .ok_or_else(|| PulseError::Audio("no audio input device found".to_string()))?,
        };

        let supported = device
            .default_input_config()
            .map_err(|e| PulseError::Audio(format!("failed to get input config: {}", e)))?;
        let sample_rate = supported.sample_rate().0;
        let channels = (supported.channels() as usize).max(1);

        log::info!(
            "Audio in: {} @ {}Hz, {} ch",
            device.name().unwrap_or_else(|_| "Unknown".to_string()),
            sample_rate,
            channels
        );

        let (sample_tx, sample_rx) = bounded::<Vec<f32>>(SAMPLE_QUEUE_DEPTH);
        let (frame_tx, frame_rx) = bounded(FRAME_QUEUE_DEPTH);

        let stream = device
            .build_input_stream(
                &supported.config(),
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    let mono: Vec<f32> = data
                        .chunks(channels)
                        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
                        .collect();
                    let _ = sample_tx.try_send(mono);
                },
                |err| log::warn!("Audio stream error: {}", err),
                None,
            )
            .map_err(|e| PulseError::Audio(format!("failed to build input stream: {}", e)))?;

        stream
            .play()
            .map_err(|e| PulseError::Audio(format!("failed to start input stream: {}", e)))?;

        let monitor = spawn_fft_thread(fft_config.clone(), sample_rx, frame_tx, frame_rx.clone())?;
        log_geometry(fft_config, sample_rate);

        Ok(Self {
            frames: frame_rx,
            transport: None,
            stream: Some(stream),
            monitor: Some(monitor),
        })
    }

    /// Newest spectrum published since the last call, discarding older ones
    pub fn latest_frame(&self) -> Option<SpectrumFrame> {
        self.frames.try_iter().last()
    }

    /// Stop the stream and wait for the monitor thread to drain
    fn stop(&mut self) {
        if let Some(stream) = self.stream.take() {
            let _ = stream.pause();
            drop(stream);
        }
        if let Some(monitor) = self.monitor.take() {
            if monitor.join().is_err() {
                log::warn!("Spectral monitor thread panicked");
            }
        }
    }
}

fn log_geometry(fft_config: &FftConfig, sample_rate: u32) {
    log::info!(
        "FFT: {} window / {} size, {} bins, {:.1}Hz per bin",
        fft_config.window_size,
        fft_config.fft_size,
        fft_config.bin_count(),
        fft_config.bin_to_hz(1, sample_rate)
    );
}

impl Component for AudioSystem {
    fn name(&self) -> &'static str {
        "audio"
    }

    fn handle_input(&mut self, event: &InputEvent) {
        let Some(transport) = self.transport.as_mut() else {
            return;
        };
        match event {
            InputEvent::KeyPressed(Key::Space) => {
                let playing = transport.toggle();
                log::info!(
                    "Playback {} at {:.1}s",
                    if playing { "resumed" } else { "paused" },
                    transport.position_seconds()
                );
            }
            InputEvent::KeyPressed(Key::Left) => transport.seek_by(-SEEK_STEP_S),
            InputEvent::KeyPressed(Key::Right) => transport.seek_by(SEEK_STEP_S),
            _ => {}
        }
    }

    fn shutdown(&mut self) {
        self.stop();
    }
}

impl Drop for AudioSystem {
    fn drop(&mut self) {
        self.stop();
    }
}
