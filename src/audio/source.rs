//! Audio sources: decoded WAV files and live input devices.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::transport::Playhead;
use crate::error::{PulseError, Result};

/// Where the analysed audio comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioSource {
    /// Looped playback of a WAV file through the default output device
    File(PathBuf),
    /// Capture from an input device (default device when `None`)
    Device(Option<String>),
}

/// Interleaved PCM samples normalized to [-1, 1]
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudio {
    pub samples: Vec<f32>,
    pub channels: u16,
    pub sample_rate: u32,
}

impl DecodedAudio {
    pub fn new(samples: Vec<f32>, channels: u16, sample_rate: u32) -> Result<Self> {
        if channels == 0 || sample_rate == 0 {
            return Err(PulseError::Audio(format!(
                "invalid stream layout: {} channels @ {}Hz",
                channels, sample_rate
            )));
        }
        Ok(Self {
            samples,
            channels,
            sample_rate,
        })
    }

    /// Decode a WAV file (integer or float PCM)
    pub fn load_wav(path: &Path) -> Result<Self> {
        let reader = hound::WavReader::open(path)
            .map_err(|e| PulseError::asset(path.display().to_string(), e))?;
        let spec = reader.spec();

        let samples: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader
                .into_samples::<f32>()
                .collect::<std::result::Result<_, _>>()?,
            hound::SampleFormat::Int => {
                let scale = 1.0 / (1i64 << (spec.bits_per_sample - 1)) as f32;
                reader
                    .into_samples::<i32>()
                    .map(|s| s.map(|v| v as f32 * scale))
                    .collect::<std::result::Result<_, _>>()?
            }
        };

        if samples.is_empty() {
            return Err(PulseError::asset(
                path.display().to_string(),
                "file contains no samples",
            ));
        }

        let audio = Self::new(samples, spec.channels, spec.sample_rate)?;
        log::info!(
            "Loaded {}: {} ch @ {}Hz, {:.1}s",
            path.display(),
            audio.channels,
            audio.sample_rate,
            audio.duration_s()
        );
        Ok(audio)
    }

    /// Number of sample frames (one sample per channel each)
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    pub fn duration_s(&self) -> f32 {
        self.frames() as f32 / self.sample_rate as f32
    }

    /// Sample of `channel` at `frame`; channels beyond the file's repeat
    /// its last channel
    pub fn sample(&self, frame: usize, channel: usize) -> f32 {
        let channels = self.channels as usize;
        self.samples[frame * channels + channel.min(channels - 1)]
    }

    /// Average of all channels at `frame`
    pub fn mono(&self, frame: usize) -> f32 {
        let channels = self.channels as usize;
        let start = frame * channels;
        self.samples[start..start + channels].iter().sum::<f32>() / channels as f32
    }

    /// Whole file downmixed to mono
    pub fn mono_samples(&self) -> Vec<f32> {
        (0..self.frames()).map(|f| self.mono(f)).collect()
    }
}

/// Renders a looped file into output buffers, following the shared playhead
pub struct FilePlayer {
    audio: Arc<DecodedAudio>,
    playhead: Arc<Playhead>,
    /// File frames advanced per output frame (file rate / device rate)
    step: f64,
    gain: f32,
}

impl FilePlayer {
    pub fn new(audio: Arc<DecodedAudio>, playhead: Arc<Playhead>, device_rate: u32, gain: f32) -> Self {
        let step = audio.sample_rate as f64 / device_rate.max(1) as f64;
        Self {
            audio,
            playhead,
            step,
            gain,
        }
    }

    /// Fill `out` (interleaved, `out_channels` wide) and append the mono mix
    /// of what was played to `tap`. Paused playback writes silence.
    pub fn fill(&mut self, out: &mut [f32], out_channels: usize, tap: &mut Vec<f32>) {
        let out_channels = out_channels.max(1);
        let frames = self.audio.frames();

        if !self.playhead.is_playing() || frames == 0 {
            out.fill(0.0);
            tap.extend(std::iter::repeat(0.0).take(out.len() / out_channels));
            return;
        }

        let mut position = self.playhead.take_seek().unwrap_or_else(|| self.playhead.position());
        let length = frames as f64;

        for frame in out.chunks_mut(out_channels) {
            let index = (position as usize).min(frames - 1);
            for (channel, slot) in frame.iter_mut().enumerate() {
                *slot = self.audio.sample(index, channel) * self.gain;
            }
            tap.push(self.audio.mono(index) * self.gain);

            position += self.step;
            if position >= length {
                position -= length;
            }
        }

        self.playhead.store_position(position);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::transport::Transport;

    fn stereo_ramp(frames: usize, rate: u32) -> DecodedAudio {
        let samples = (0..frames)
            .flat_map(|i| [i as f32 / frames as f32, -(i as f32) / frames as f32])
            .collect();
        DecodedAudio::new(samples, 2, rate).unwrap()
    }

    #[test]
    fn test_mono_downmix() {
        let audio = DecodedAudio::new(vec![0.2, 0.4, -1.0, 1.0], 2, 8000).unwrap();
        assert_eq!(audio.frames(), 2);
        assert!((audio.mono(0) - 0.3).abs() < 1e-6);
        assert_eq!(audio.mono(1), 0.0);
        // Extra output channels repeat the last file channel
        assert_eq!(audio.sample(0, 5), 0.4);
    }

    #[test]
    fn test_invalid_layout_rejected() {
        assert!(DecodedAudio::new(vec![0.0], 0, 44100).is_err());
        assert!(DecodedAudio::new(vec![0.0], 1, 0).is_err());
    }

    #[test]
    fn test_load_int_wav() {
        let path = std::env::temp_dir().join("pulsefield_source_test.wav");
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 22050,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for v in [0i16, 16384, -32768, 32767] {
            writer.write_sample(v).unwrap();
        }
        writer.finalize().unwrap();

        let audio = DecodedAudio::load_wav(&path).unwrap();
        assert_eq!(audio.sample_rate, 22050);
        assert_eq!(audio.frames(), 4);
        assert_eq!(audio.samples[1], 0.5);
        assert_eq!(audio.samples[2], -1.0);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_missing_wav_is_asset_error() {
        let result = DecodedAudio::load_wav(Path::new("/nonexistent/track.wav"));
        assert!(matches!(result, Err(PulseError::Asset { .. })));
    }

    #[test]
    fn test_player_applies_gain_and_advances() {
        let audio = Arc::new(stereo_ramp(100, 48000));
        let transport = Transport::new(100, 48000);
        let mut player = FilePlayer::new(audio, transport.playhead(), 48000, 0.5);

        let mut out = vec![0.0; 20];
        let mut tap = Vec::new();
        player.fill(&mut out, 2, &mut tap);

        assert_eq!(tap.len(), 10);
        assert!((out[2] - 0.005).abs() < 1e-6);
        assert!((out[3] + 0.005).abs() < 1e-6);
        assert!((transport.position_frames() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_player_rate_conversion_step() {
        let audio = Arc::new(stereo_ramp(1000, 22050));
        let transport = Transport::new(1000, 22050);
        let mut player = FilePlayer::new(audio, transport.playhead(), 44100, 1.0);

        let mut out = vec![0.0; 200];
        player.fill(&mut out, 2, &mut Vec::new());
        // Half a file frame per output frame
        assert!((transport.position_frames() - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_player_loops() {
        let audio = Arc::new(stereo_ramp(10, 8000));
        let transport = Transport::new(10, 8000);
        let mut player = FilePlayer::new(audio, transport.playhead(), 8000, 1.0);

        let mut out = vec![0.0; 2 * 25];
        player.fill(&mut out, 2, &mut Vec::new());
        assert!((transport.position_frames() - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_paused_player_is_silent() {
        let audio = Arc::new(stereo_ramp(100, 8000));
        let mut transport = Transport::new(100, 8000);
        let mut player = FilePlayer::new(audio, transport.playhead(), 8000, 1.0);
        player.fill(&mut vec![0.0; 20], 2, &mut Vec::new());

        transport.toggle();
        let mut out = vec![1.0; 20];
        let mut tap = Vec::new();
        player.fill(&mut out, 2, &mut tap);

        assert!(out.iter().all(|&s| s == 0.0));
        assert_eq!(tap, vec![0.0; 10]);
        assert!((transport.position_frames() - 10.0).abs() < 1e-9);
    }
}
