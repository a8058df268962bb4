//! Particle record shared byte-for-byte between CPU and GPU.

use bytemuck::{Pod, Zeroable};

/// Simulation record for one particle.
///
/// Layout matches the WGSL `Particle` struct: every `vec3` is followed by a
/// scalar so the struct packs into four 16-byte rows (64 bytes).
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct Particle {
    pub position: [f32; 3],
    pub damping: f32,
    pub prev_position: [f32; 3],
    pub size: f32,
    pub home: [f32; 3],
    pub group: u32,
    pub color: [f32; 4],
}

/// Convert HSV (all components in 0..1) to linear RGB
pub fn hsv_to_rgb(hue: f32, saturation: f32, value: f32) -> [f32; 3] {
    let h = hue.rem_euclid(1.0) * 6.0;
    let sector = h.floor();
    let f = h - sector;
    let p = value * (1.0 - saturation);
    let q = value * (1.0 - saturation * f);
    let t = value * (1.0 - saturation * (1.0 - f));

    match sector as u32 {
        0 => [value, t, p],
        1 => [q, value, p],
        2 => [p, value, t],
        3 => [p, q, value],
        4 => [t, p, value],
        _ => [value, p, q],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_particle_layout_is_64_bytes() {
        assert_eq!(std::mem::size_of::<Particle>(), 64);
        assert_eq!(std::mem::offset_of!(Particle, prev_position), 16);
        assert_eq!(std::mem::offset_of!(Particle, home), 32);
        assert_eq!(std::mem::offset_of!(Particle, color), 48);
    }

    #[test]
    fn test_hsv_primaries() {
        assert_eq!(hsv_to_rgb(0.0, 1.0, 1.0), [1.0, 0.0, 0.0]);
        let green = hsv_to_rgb(1.0 / 3.0, 1.0, 1.0);
        assert!(green[0].abs() < 1e-5 && (green[1] - 1.0).abs() < 1e-5);
        let blue = hsv_to_rgb(2.0 / 3.0, 1.0, 1.0);
        assert!((blue[2] - 1.0).abs() < 1e-5 && blue[1].abs() < 1e-5);
    }

    #[test]
    fn test_zero_saturation_is_grey() {
        assert_eq!(hsv_to_rgb(0.4, 0.0, 0.5), [0.5, 0.5, 0.5]);
    }
}
