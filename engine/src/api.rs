use serde::{Deserialize, Serialize}; use thiserror::Error;

#[derive(Debug, Error)] pub enum NoiseError { #[error("cache capacity must be at least 1, got {0}")] CacheCapacity(usize) }
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)] pub struct Seed(pub u64);
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)] #[serde(rename_all = "lowercase")] pub enum NoiseKind { Perlin, Simplex }

/// Black-box noise functions.
///
/// Scalar channels return values in roughly [-1, 1]; implementations may
/// overshoot slightly and callers are expected to clamp. NaN inputs yield NaN.
pub trait NoiseField: Send + Sync {
    fn perlin3(&self, p: [f32; 3]) -> f32;
    fn simplex3(&self, p: [f32; 3]) -> f32;
    /// Curl of a vector potential; divergence-free.
    fn curl3(&self, p: [f32; 3]) -> [f32; 3];

    fn sample(&self, kind: NoiseKind, p: [f32; 3]) -> f32 {
        match kind {
            NoiseKind::Perlin => self.perlin3(p),
            NoiseKind::Simplex => self.simplex3(p),
        }
    }
}
