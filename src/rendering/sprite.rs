//! Particle sprite texture: loaded from disk or generated.

use std::path::Path;

use crate::error::{PulseError, Result};

/// Side length of the generated glow sprite (pixels)
const GLOW_SIZE: u32 = 64;

/// RGBA8 sprite image ready for upload
#[derive(Debug, Clone, PartialEq)]
pub struct SpriteImage {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl SpriteImage {
    /// Decode an image file (any format the image crate reads) into RGBA8
    pub fn load(path: &Path) -> Result<Self> {
        let image = image::open(path)
            .map_err(|e| PulseError::asset(path.display().to_string(), e))?
            .to_rgba8();
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(PulseError::asset(
                path.display().to_string(),
                "sprite has zero size",
            ));
        }

        log::info!("Loaded sprite {} ({}x{})", path.display(), width, height);
        Ok(Self {
            width,
            height,
            rgba: image.into_raw(),
        })
    }

    /// White disc with a soft quadratic falloff to transparent edges
    pub fn radial_glow(size: u32) -> Self {
        let size = size.max(2);
        let half = size as f32 / 2.0;
        let mut rgba = Vec::with_capacity((size * size * 4) as usize);

        for y in 0..size {
            for x in 0..size {
                let dx = (x as f32 + 0.5 - half) / half;
                let dy = (y as f32 + 0.5 - half) / half;
                let falloff = (1.0 - (dx * dx + dy * dy).sqrt()).clamp(0.0, 1.0);
                let alpha = (falloff * falloff * 255.0).round() as u8;
                rgba.extend_from_slice(&[255, 255, 255, alpha]);
            }
        }

        Self {
            width: size,
            height: size,
            rgba,
        }
    }

    /// Sprite from `path` if given, the generated glow otherwise
    pub fn from_path_or_glow(path: Option<&str>) -> Result<Self> {
        match path {
            Some(path) => Self::load(Path::new(path)),
            None => Ok(Self::radial_glow(GLOW_SIZE)),
        }
    }

    #[cfg(test)]
    fn alpha_at(&self, x: u32, y: u32) -> u8 {
        self.rgba[((y * self.width + x) * 4 + 3) as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_glow_is_bright_center_transparent_corners() {
        let sprite = SpriteImage::radial_glow(32);
        assert_eq!(sprite.rgba.len(), 32 * 32 * 4);
        assert!(sprite.alpha_at(16, 16) > 200);
        assert_eq!(sprite.alpha_at(0, 0), 0);
        assert_eq!(sprite.alpha_at(31, 31), 0);
    }

    #[test]
    fn test_glow_is_symmetric() {
        let sprite = SpriteImage::radial_glow(16);
        for y in 0..16 {
            for x in 0..16 {
                assert_eq!(sprite.alpha_at(x, y), sprite.alpha_at(15 - x, y));
                assert_eq!(sprite.alpha_at(x, y), sprite.alpha_at(x, 15 - y));
            }
        }
    }

    #[test]
    fn test_missing_file_is_asset_error() {
        let result = SpriteImage::load(Path::new("/nonexistent/sprite.png"));
        assert!(matches!(result, Err(PulseError::Asset { .. })));
    }

    #[test]
    fn test_default_sprite_is_glow() {
        let sprite = SpriteImage::from_path_or_glow(None).unwrap();
        assert_eq!((sprite.width, sprite.height), (GLOW_SIZE, GLOW_SIZE));
    }

    #[test]
    fn test_load_png_round_trip() {
        let path = std::env::temp_dir().join("pulsefield_sprite_test.png");
        let glow = SpriteImage::radial_glow(8);
        image::save_buffer(&path, &glow.rgba, 8, 8, image::ColorType::Rgba8).unwrap();

        let loaded = SpriteImage::load(&path).unwrap();
        assert_eq!(loaded, glow);
        let _ = std::fs::remove_file(&path);
    }
}
