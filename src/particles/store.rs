//! Randomized particle population held in a ping-pong pair of buffers.

use glam::Vec3;
use rand::{rngs::StdRng, Rng, SeedableRng};

use super::particle::{hsv_to_rgb, Particle};
use super::pingpong::PingPong;
use crate::error::Result;
use crate::params::ParticleConfig;

/// Axis-aligned box that home positions are drawn from
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpawnBounds {
    pub center: Vec3,
    pub half_extent: Vec3,
}

impl SpawnBounds {
    /// Box covering `spread` of a viewport, as deep as its shorter side
    pub fn from_viewport(width: u32, height: u32, spread: f32) -> Self {
        let (w, h) = (width.max(1) as f32, height.max(1) as f32);
        Self {
            center: Vec3::ZERO,
            half_extent: Vec3::new(w, h, w.min(h)) * 0.5 * spread,
        }
    }

    pub fn contains(&self, point: Vec3) -> bool {
        let offset = (point - self.center).abs();
        offset.cmple(self.half_extent + Vec3::splat(1e-3)).all()
    }

    fn sample(&self, rng: &mut StdRng) -> Vec3 {
        let unit = Vec3::new(
            rng.random_range(-1.0..=1.0),
            rng.random_range(-1.0..=1.0),
            rng.random_range(-1.0..=1.0),
        );
        self.center + unit * self.half_extent
    }
}

/// Group of particle `index` when `count` particles split into `group_count`
/// contiguous runs. Leftover particles join the last group.
pub fn group_of(index: usize, count: usize, group_count: usize) -> u32 {
    let per_group = (count / group_count).max(1);
    (index / per_group).min(group_count - 1) as u32
}

fn random_unit_vector(rng: &mut StdRng) -> Vec3 {
    let z: f32 = rng.random_range(-1.0..=1.0);
    let theta: f32 = rng.random_range(0.0..std::f32::consts::TAU);
    let r = (1.0 - z * z).max(0.0).sqrt();
    Vec3::new(r * theta.cos(), r * theta.sin(), z)
}

/// Ping-pong pair of particle buffers.
///
/// Source and destination always hold the same number of particles; only
/// positions change between ticks.
pub struct ParticleStore {
    buffers: PingPong<Vec<Particle>>,
    group_count: usize,
}

impl ParticleStore {
    /// Build `config.count` particles with randomized homes, sizes, damping
    /// and colors. The destination buffer starts zeroed.
    pub fn initialize(
        config: &ParticleConfig,
        group_count: usize,
        bounds: &SpawnBounds,
    ) -> Result<Self> {
        config.validate(group_count)?;

        let mut rng = StdRng::seed_from_u64(config.seed);
        let count = config.count;
        let size_span = config.size_range.end - config.size_range.start;

        let particles: Vec<Particle> = (0..count)
            .map(|i| {
                let group = group_of(i, count, group_count);
                let home = bounds.sample(&mut rng);
                let prev = home + random_unit_vector(&mut rng) * config.initial_speed;
                let damping = rng.random_range(config.damping_range.clone());
                let size = rng.random_range(config.size_range.clone());

                // Large sprites fade so overlapping glows don't saturate
                let size_t = (size - config.size_range.start) / size_span;
                let alpha = 1.0 - 0.9 * size_t.clamp(0.0, 1.0);
                let hue = group as f32 / group_count as f32 * config.hue_span;
                let [r, g, b] = hsv_to_rgb(hue, 1.0, 1.0);

                Particle {
                    position: home.to_array(),
                    damping,
                    prev_position: prev.to_array(),
                    size,
                    home: home.to_array(),
                    group,
                    color: [r, g, b, alpha],
                }
            })
            .collect();

        log::info!(
            "Initialized {} particles in {} groups (seed {:#x})",
            count,
            group_count,
            config.seed
        );

        Ok(Self {
            buffers: PingPong::new(particles, vec![Particle::default(); count]),
            group_count,
        })
    }

    pub fn current_source(&self) -> &[Particle] {
        self.buffers.source()
    }

    pub fn current_destination(&self) -> &[Particle] {
        self.buffers.destination()
    }

    /// Source for reading and destination for writing in one borrow
    pub fn split(&mut self) -> (&[Particle], &mut [Particle]) {
        let (src, dst) = self.buffers.split();
        (src.as_slice(), dst.as_mut_slice())
    }

    /// Exchange roles after a completed update
    pub fn swap(&mut self) {
        self.buffers.swap();
    }

    pub fn len(&self) -> usize {
        self.buffers.source().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn group_count(&self) -> usize {
        self.group_count
    }

    /// Number of particles in each group
    pub fn group_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.group_count];
        for particle in self.current_source() {
            if let Some(slot) = sizes.get_mut(particle.group as usize) {
                *slot += 1;
            }
        }
        sizes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config(count: usize) -> ParticleConfig {
        ParticleConfig {
            count,
            ..ParticleConfig::default()
        }
    }

    fn bounds() -> SpawnBounds {
        SpawnBounds::from_viewport(800, 600, 0.8)
    }

    #[test]
    fn test_even_group_assignment() {
        let store = ParticleStore::initialize(&small_config(1024), 4, &bounds()).unwrap();

        assert_eq!(store.len(), 1024);
        assert_eq!(store.group_sizes(), vec![256, 256, 256, 256]);
        for (i, particle) in store.current_source().iter().enumerate() {
            assert_eq!(particle.group, (i / 256) as u32);
        }
    }

    #[test]
    fn test_leftover_particles_join_last_group() {
        let store = ParticleStore::initialize(&small_config(10), 4, &bounds()).unwrap();
        assert_eq!(store.group_sizes(), vec![2, 2, 2, 4]);
    }

    #[test]
    fn test_attributes_within_ranges() {
        let config = small_config(2048);
        let bounds = bounds();
        let store = ParticleStore::initialize(&config, 4, &bounds).unwrap();

        for particle in store.current_source() {
            assert!(config.damping_range.contains(&particle.damping));
            assert!(config.size_range.contains(&particle.size));
            assert!(bounds.contains(Vec3::from_array(particle.home)));
            assert_eq!(particle.position, particle.home);

            let kick = Vec3::from_array(particle.prev_position) - Vec3::from_array(particle.home);
            assert!((kick.length() - config.initial_speed).abs() < 1e-2);

            let alpha = particle.color[3];
            assert!((0.1 - 1e-5..=1.0).contains(&alpha));
        }
    }

    #[test]
    fn test_destination_starts_zeroed() {
        let store = ParticleStore::initialize(&small_config(64), 4, &bounds()).unwrap();
        assert_eq!(store.current_destination().len(), 64);
        assert!(store
            .current_destination()
            .iter()
            .all(|p| *p == Particle::default()));
    }

    #[test]
    fn test_same_seed_same_layout() {
        let a = ParticleStore::initialize(&small_config(128), 4, &bounds()).unwrap();
        let b = ParticleStore::initialize(&small_config(128), 4, &bounds()).unwrap();
        assert_eq!(a.current_source(), b.current_source());

        let other = ParticleConfig {
            seed: 7,
            ..small_config(128)
        };
        let c = ParticleStore::initialize(&other, 4, &bounds()).unwrap();
        assert_ne!(a.current_source(), c.current_source());
    }

    #[test]
    fn test_swap_preserves_count() {
        let mut store = ParticleStore::initialize(&small_config(256), 4, &bounds()).unwrap();
        for _ in 0..5 {
            store.swap();
            assert_eq!(store.current_source().len(), 256);
            assert_eq!(store.current_destination().len(), 256);
        }
    }

    #[test]
    fn test_too_few_particles_rejected() {
        assert!(ParticleStore::initialize(&small_config(2), 4, &bounds()).is_err());
    }
}
