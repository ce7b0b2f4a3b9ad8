use bevy::prelude::*;
use meadow_noise::NoiseContext;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use std::sync::Arc;

use super::surface::Surface;
use crate::config::PlacementConfig;

/// A point on the host surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplePoint {
    pub position: Vec3,
    pub normal: Vec3,
    pub face_index: usize,
}

/// Placement of one blade instance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacementTransform {
    pub position: Vec3,
    pub orientation: Quat,
    pub scale: f32,
    pub index: usize,
}

impl PlacementTransform {
    /// Maps a point in blade space into world space.
    #[inline]
    pub fn apply(&self, local: Vec3) -> Vec3 {
        self.position + self.orientation * (local * self.scale)
    }
}

/// Area-weighted scattering of points and derivation of their transforms.
pub struct SurfaceSampler {
    noise: Arc<NoiseContext>,
    placement: PlacementConfig,
}

impl SurfaceSampler {
    pub fn new(noise: Arc<NoiseContext>, placement: PlacementConfig) -> Self {
        Self { noise, placement }
    }

    pub fn noise(&self) -> &NoiseContext { &self.noise }
    pub fn placement(&self) -> &PlacementConfig { &self.placement }

    /// Scatters `count` points over the surface, choosing faces in proportion
    /// to their area. Identical inputs give a bit-identical sequence.
    /// Zero area or zero count yields no points.
    pub fn sample(&self, surface: &impl Surface, count: usize, seed: u64) -> Vec<SamplePoint> {
        let faces = surface.triangle_count();
        if count == 0 || faces == 0 {
            return Vec::new();
        }

        let mut cumulative = Vec::with_capacity(faces);
        let mut total = 0.0f64;
        for f in 0..faces {
            let area = surface.area(f) as f64;
            if area.is_finite() {
                total += area;
            }
            cumulative.push(total);
        }
        if total <= 0.0 {
            return Vec::new();
        }

        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut points = Vec::with_capacity(count);
        for _ in 0..count {
            let target = rng.gen::<f64>() * total;
            let face = cumulative.partition_point(|&c| c <= target).min(faces - 1);

            let mut u = rng.gen::<f32>();
            let mut v = rng.gen::<f32>();
            if u + v > 1.0 {
                u = 1.0 - u;
                v = 1.0 - v;
            }
            let [a, b, c] = surface.triangle(face);
            let position = a + (b - a) * u + (c - a) * v;
            let normal = surface.normal_at(face, Vec3::new(1.0 - u - v, u, v));
            points.push(SamplePoint { position, normal, face_index: face });
        }
        points
    }

    /// Transform for the `index`-th point. A pure function of its arguments:
    /// rotation jitter comes from a generator seeded by `(seed, index)`.
    pub fn build_transform(&self, point: &SamplePoint, index: usize, seed: u64) -> PlacementTransform {
        let p = &self.placement;

        let mut n = self.noise.cached(point.position.to_array(), p.noise_scale);
        if !n.is_finite() {
            warn!("Non-finite placement noise at {:?}, using band midpoint", point.position);
            n = 0.0;
        }
        let (lo, hi) = p.scale_band;
        let scale = map_linear(n.clamp(-1.0, 1.0), -1.0, 1.0, lo, hi) * p.base_scale;

        let normal = match point.normal.try_normalize() {
            Some(n) => n,
            None => {
                warn!("Degenerate normal on face {}, aligning to +Y", point.face_index);
                Vec3::Y
            }
        };
        let align = Quat::from_rotation_arc(Vec3::Y, normal);

        let mut rng = ChaCha8Rng::seed_from_u64(instance_seed(seed, index));
        let mut jitter = || (rng.gen::<f32>() - 0.5) * 2.0 * p.jitter;
        let (jy, jz, jx) = (jitter(), jitter(), jitter());
        let orientation = (align * Quat::from_euler(EulerRot::XYZ, jx, jy, jz)).normalize();

        PlacementTransform {
            position: point.position + normal * p.normal_offset,
            orientation,
            scale,
            index,
        }
    }

    pub fn transforms(&self, points: &[SamplePoint], seed: u64) -> Vec<PlacementTransform> {
        points
            .par_iter()
            .enumerate()
            .map(|(i, point)| self.build_transform(point, i, seed))
            .collect()
    }

    pub fn sample_transforms(&self, surface: &impl Surface, count: usize, seed: u64) -> Vec<PlacementTransform> {
        let points = self.sample(surface, count, seed);
        self.transforms(&points, seed)
    }
}

#[inline]
pub fn map_linear(x: f32, a1: f32, a2: f32, b1: f32, b2: f32) -> f32 {
    b1 + (x - a1) * (b2 - b1) / (a2 - a1)
}

/// splitmix64 over seed and index.
fn instance_seed(seed: u64, index: usize) -> u64 {
    let mut z = seed ^ (index as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}
