//! Command-line argument parsing.

use std::path::PathBuf;

use clap::Parser;

use crate::audio::AudioSource;
use crate::error::{PulseError, Result};
use crate::params::{ConfigFile, Settings};

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "pulsefield")]
#[command(about = "Audio-reactive GPU particle field", long_about = None)]
pub struct Args {
    /// WAV file to play and visualize (looped)
    #[arg(value_name = "WAV")]
    pub input: Option<PathBuf>,

    /// Capture from an input device instead; omit the name for the default
    #[arg(long, value_name = "NAME", num_args = 0..=1, default_missing_value = "")]
    pub device: Option<String>,

    /// TOML file overriding built-in defaults
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Number of particles
    #[arg(long, value_name = "COUNT")]
    pub particles: Option<usize>,

    /// Number of frequency groups driving the particles
    #[arg(long, value_name = "COUNT")]
    pub groups: Option<usize>,

    /// Seed for the initial particle layout
    #[arg(long)]
    pub seed: Option<u64>,

    /// Sprite image for the particles (a soft glow is generated otherwise)
    #[arg(long, value_name = "PNG")]
    pub sprite: Option<String>,

    /// Start in borderless fullscreen
    #[arg(long)]
    pub fullscreen: bool,

    /// Run the simulation on the CPU without a window
    #[arg(long)]
    pub headless: bool,

    /// Ticks to simulate in headless mode
    #[arg(long, value_name = "COUNT", default_value_t = 600)]
    pub frames: u64,
}

impl Args {
    /// Audio source to open; a file wins over a device
    pub fn audio_source(&self) -> Result<AudioSource> {
        if let Some(path) = &self.input {
            if self.device.is_some() {
                log::warn!("Both a file and a device were given, using the file");
            }
            return Ok(AudioSource::File(path.clone()));
        }
        match self.device.as_deref() {
            Some("") => Ok(AudioSource::Device(None)),
            Some(name) => Ok(AudioSource::Device(Some(name.to_string()))),
            None => Err(PulseError::config(
                "no audio source: pass a WAV file or --device",
            )),
        }
    }

    /// Defaults, then the config file, then command-line overrides
    pub fn settings(&self) -> Result<Settings> {
        let mut settings = Settings::default();

        if let Some(path) = &self.config {
            ConfigFile::load(path)?.apply(&mut settings);
            log::info!("Loaded config {}", path.display());
        }

        if let Some(count) = self.particles {
            settings.particles.count = count;
        }
        if let Some(groups) = self.groups {
            settings.analyzer.group_count = groups;
        }
        if let Some(seed) = self.seed {
            settings.particles.seed = seed;
        }
        if let Some(sprite) = &self.sprite {
            settings.render.sprite_path = Some(sprite.clone());
        }
        if self.fullscreen {
            settings.render.launch_fullscreen = true;
        }

        settings.validate()?;
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("pulsefield").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_file_source() {
        let args = parse(&["track.wav"]);
        assert_eq!(
            args.audio_source().unwrap(),
            AudioSource::File(PathBuf::from("track.wav"))
        );
    }

    #[test]
    fn test_device_source() {
        assert_eq!(
            parse(&["--device"]).audio_source().unwrap(),
            AudioSource::Device(None)
        );
        assert_eq!(
            parse(&["--device", "Loopback"]).audio_source().unwrap(),
            AudioSource::Device(Some("Loopback".to_string()))
        );
    }

    #[test]
    fn test_file_wins_over_device() {
        let args = parse(&["--device", "Mic", "song.wav"]);
        assert!(matches!(args.audio_source().unwrap(), AudioSource::File(_)));
    }

    #[test]
    fn test_missing_source_is_config_error() {
        assert!(matches!(
            parse(&[]).audio_source(),
            Err(PulseError::Config(_))
        ));
    }

    #[test]
    fn test_overrides_applied() {
        let args = parse(&["--particles", "4096", "--groups", "8", "--seed", "7", "--fullscreen"]);
        let settings = args.settings().unwrap();
        assert_eq!(settings.particles.count, 4096);
        assert_eq!(settings.analyzer.group_count, 8);
        assert_eq!(settings.particles.seed, 7);
        assert!(settings.render.launch_fullscreen);
    }

    #[test]
    fn test_invalid_override_rejected() {
        assert!(parse(&["--groups", "3"]).settings().is_err());
        assert!(parse(&["--particles", "0"]).settings().is_err());
    }

    #[test]
    fn test_headless_defaults() {
        let args = parse(&["--headless", "a.wav"]);
        assert!(args.headless);
        assert_eq!(args.frames, 600);
    }
}
