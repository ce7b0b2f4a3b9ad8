use crate::api::*;
use fastnoise_lite::{FastNoiseLite, NoiseType};
use noise::{NoiseFn, Perlin};

/// Step used for the finite differences of the curl potential.
const CURL_EPSILON: f32 = 1e-3;

/// Seeded perlin/simplex/curl field.
///
/// Perlin comes from the `noise` crate, simplex and the three curl potential
/// channels from FastNoiseLite's OpenSimplex2 at unit frequency so inputs
/// are used in world units.
pub struct SeededField {
    perlin: Perlin,
    simplex: FastNoiseLite,
    potential: [FastNoiseLite; 3],
}

impl SeededField {
    pub fn new(seed: Seed) -> Self {
        let base = fold_seed(seed.0);
        Self {
            perlin: Perlin::new(base as u32),
            simplex: simplex_with_seed(base),
            potential: [
                simplex_with_seed(base.wrapping_add(1)),
                simplex_with_seed(base.wrapping_add(2)),
                simplex_with_seed(base.wrapping_add(3)),
            ],
        }
    }

    fn potential(&self, channel: usize, x: f32, y: f32, z: f32) -> f32 {
        self.potential[channel].get_noise_3d(x, y, z)
    }
}

impl NoiseField for SeededField {
    fn perlin3(&self, p: [f32; 3]) -> f32 {
        if !p.iter().all(|c| c.is_finite()) { return f32::NAN; }
        self.perlin.get([p[0] as f64, p[1] as f64, p[2] as f64]) as f32
    }

    fn simplex3(&self, p: [f32; 3]) -> f32 {
        if !p.iter().all(|c| c.is_finite()) { return f32::NAN; }
        self.simplex.get_noise_3d(p[0], p[1], p[2])
    }

    fn curl3(&self, p: [f32; 3]) -> [f32; 3] {
        if !p.iter().all(|c| c.is_finite()) { return [f32::NAN; 3]; }
        let [x, y, z] = p;
        let e = CURL_EPSILON;
        let d = |channel: usize, dx: f32, dy: f32, dz: f32| {
            (self.potential(channel, x + dx, y + dy, z + dz) - self.potential(channel, x - dx, y - dy, z - dz)) / (2.0 * e)
        };
        // curl(psi) = (dPz/dy - dPy/dz, dPx/dz - dPz/dx, dPy/dx - dPx/dy)
        [
            d(2, 0.0, e, 0.0) - d(1, 0.0, 0.0, e),
            d(0, 0.0, 0.0, e) - d(2, e, 0.0, 0.0),
            d(1, e, 0.0, 0.0) - d(0, 0.0, e, 0.0),
        ]
    }
}

fn simplex_with_seed(seed: i32) -> FastNoiseLite {
    let mut f = FastNoiseLite::with_seed(seed);
    f.set_noise_type(Some(NoiseType::OpenSimplex2));
    f.set_frequency(Some(1.0));
    f
}

fn fold_seed(seed: u64) -> i32 {
    (seed ^ (seed >> 32)) as u32 as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_values() {
        let a = SeededField::new(Seed(7));
        let b = SeededField::new(Seed(7));
        for i in 0..32 {
            let p = [i as f32 * 0.37, 1.5 - i as f32 * 0.11, i as f32 * 0.05];
            assert_eq!(a.perlin3(p).to_bits(), b.perlin3(p).to_bits());
            assert_eq!(a.simplex3(p).to_bits(), b.simplex3(p).to_bits());
        }
    }

    #[test]
    fn scalar_channels_stay_near_unit_range() {
        let f = SeededField::new(Seed(1));
        for i in 0..500 {
            let t = i as f32 * 0.173;
            let p = [t.sin() * 4.0, t * 0.3, t.cos() * 4.0];
            assert!(f.perlin3(p).abs() <= 1.05);
            assert!(f.simplex3(p).abs() <= 1.05);
        }
    }

    #[test]
    fn nan_input_propagates() {
        let f = SeededField::new(Seed(1));
        assert!(f.simplex3([f32::NAN, 0.0, 0.0]).is_nan());
        assert!(f.curl3([0.0, f32::INFINITY, 0.0])[0].is_nan());
    }

    #[test]
    fn curl_is_finite_for_regular_points() {
        let f = SeededField::new(Seed(3));
        let c = f.curl3([0.25, 0.5, 0.75]);
        assert!(c.iter().all(|v| v.is_finite()));
    }
}
