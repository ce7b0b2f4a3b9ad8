use bevy::prelude::*;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::sampler::{PlacementTransform, SurfaceSampler};
use super::surface::Surface;
use crate::config::MAX_INSTANCES;
use crate::error::{MeadowError, Result};

/// The placement transforms of every blade, replaced only as a whole.
///
/// Readers either copy one transform out under the read lock or take an
/// `Arc` snapshot of the full array; a rebuild swaps in a fully built array,
/// so no reader ever sees a mix of two layouts.
pub struct InstanceSet {
    current: RwLock<Arc<[PlacementTransform]>>,
    generation: AtomicU64,
}

impl Default for InstanceSet {
    fn default() -> Self {
        Self::new()
    }
}

impl InstanceSet {
    pub fn new() -> Self {
        Self { current: RwLock::new(Arc::from(Vec::new())), generation: AtomicU64::new(0) }
    }

    pub fn rebuild(&self, transforms: Vec<PlacementTransform>) {
        let next: Arc<[PlacementTransform]> = Arc::from(transforms);
        let previous = std::mem::replace(&mut *self.current.write(), next);
        self.generation.fetch_add(1, Ordering::Release);
        // old array is released here, or by the last snapshot holder
        drop(previous);
    }

    /// Validates, samples and builds a new layout, then swaps it in.
    /// On error the live layout is left untouched.
    pub fn reconfigure(&self, sampler: &SurfaceSampler, surface: &impl Surface, count: usize, seed: u64) -> Result<usize> {
        if count > MAX_INSTANCES {
            return Err(MeadowError::Configuration(format!("instance count {count} exceeds {MAX_INSTANCES}")));
        }
        if count > 0 && surface.total_area() <= 0.0 {
            return Err(MeadowError::DegenerateSurface { requested: count });
        }
        let transforms = sampler.sample_transforms(surface, count, seed);
        let built = transforms.len();
        self.rebuild(transforms);
        info!("Rebuilt instance set: {} instances (seed {})", built, seed);
        Ok(built)
    }

    pub fn transform_at(&self, index: usize) -> Option<PlacementTransform> {
        self.current.read().get(index).copied()
    }

    pub fn count(&self) -> usize {
        self.current.read().len()
    }

    pub fn snapshot(&self) -> Arc<[PlacementTransform]> {
        self.current.read().clone()
    }

    /// Incremented on every rebuild.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PlacementConfig;
    use crate::field::surface::TriangleMesh;
    use meadow_noise::{NoiseContext, Seed};

    fn transforms(n: usize, tag: f32) -> Vec<PlacementTransform> {
        (0..n)
            .map(|i| PlacementTransform { position: Vec3::splat(tag), orientation: Quat::IDENTITY, scale: tag, index: i })
            .collect()
    }

    #[test]
    fn rebuild_replaces_everything() {
        let set = InstanceSet::new();
        set.rebuild(transforms(100, 1.0));
        assert_eq!(set.count(), 100);
        set.rebuild(transforms(50, 2.0));
        assert_eq!(set.count(), 50);
        assert_eq!(set.transform_at(10).unwrap().scale, 2.0);
        assert!(set.transform_at(60).is_none());
        assert_eq!(set.generation(), 2);
    }

    #[test]
    fn snapshot_outlives_rebuild() {
        let set = InstanceSet::new();
        set.rebuild(transforms(10, 1.0));
        let snap = set.snapshot();
        set.rebuild(transforms(5, 2.0));
        assert_eq!(snap.len(), 10);
        assert_eq!(snap[3].scale, 1.0);
    }

    #[test]
    fn degenerate_surface_keeps_old_layout() {
        let ctx = Arc::new(NoiseContext::new(Seed(1), 64).unwrap());
        let sampler = SurfaceSampler::new(ctx, PlacementConfig::default());
        let set = InstanceSet::new();
        set.rebuild(transforms(7, 1.0));

        let flat = TriangleMesh::new(vec![Vec3::ZERO, Vec3::X, Vec3::X * 2.0], None, vec![[0, 1, 2]]).unwrap();
        let err = set.reconfigure(&sampler, &flat, 10, 1).unwrap_err();
        assert!(matches!(err, MeadowError::DegenerateSurface { requested: 10 }));
        assert_eq!(set.count(), 7);

        assert!(set.reconfigure(&sampler, &flat, MAX_INSTANCES + 1, 1).is_err());
        assert_eq!(set.count(), 7);
    }

    #[test]
    fn zero_count_on_degenerate_surface_is_fine() {
        let ctx = Arc::new(NoiseContext::new(Seed(1), 64).unwrap());
        let sampler = SurfaceSampler::new(ctx, PlacementConfig::default());
        let set = InstanceSet::new();
        let flat = TriangleMesh::default();
        assert_eq!(set.reconfigure(&sampler, &flat, 0, 1).unwrap(), 0);
        assert_eq!(set.count(), 0);
    }
}
