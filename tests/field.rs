use bevy::prelude::*;
use meadow::config::PlacementConfig;
use meadow::field::{InstanceSet, PlacementTransform, SurfaceSampler, TriangleMesh};
use meadow_noise::{NoiseContext, Seed};
use std::sync::Arc;

fn sampler(seed: u64) -> SurfaceSampler {
    let noise = Arc::new(NoiseContext::new(Seed(seed), 1000).unwrap());
    SurfaceSampler::new(noise, PlacementConfig::default())
}

#[test]
fn unit_sphere_end_to_end() {
    let sphere = TriangleMesh::uv_sphere(1.0, 64, 32);
    let s = sampler(1);
    let points = s.sample(&sphere, 1000, 1);
    assert_eq!(points.len(), 1000);

    for p in &points {
        assert!((p.position.length() - 1.0).abs() < 0.01, "radius {}", p.position.length());
        assert!(p.normal.dot(p.position.normalize()) > 0.99);
    }

    let transforms = s.transforms(&points, 1);
    assert_eq!(transforms.len(), 1000);
    for (i, t) in transforms.iter().enumerate() {
        assert_eq!(t.index, i);
        assert!((0.03..=0.1).contains(&t.scale), "scale {}", t.scale);
        assert!((t.position.length() - 1.01).abs() < 0.02);
        assert!((t.orientation.length() - 1.0).abs() < 1e-4);
    }
}

#[test]
fn layout_is_reproducible_across_contexts() {
    let sphere = TriangleMesh::uv_sphere(1.0, 32, 16);
    let a = sampler(1).sample_transforms(&sphere, 300, 5);
    let b = sampler(1).sample_transforms(&sphere, 300, 5);
    assert_eq!(a.len(), b.len());
    for (x, y) in a.iter().zip(&b) {
        assert_eq!(x.position.to_array().map(f32::to_bits), y.position.to_array().map(f32::to_bits));
        assert_eq!(x.scale.to_bits(), y.scale.to_bits());
        assert_eq!(x.orientation.to_array().map(f32::to_bits), y.orientation.to_array().map(f32::to_bits));
    }
}

#[test]
fn readers_never_see_a_torn_transform() {
    fn layout(n: usize, tag: f32) -> Vec<PlacementTransform> {
        (0..n)
            .map(|i| PlacementTransform {
                position: Vec3::splat(tag),
                orientation: Quat::from_rotation_y(tag),
                scale: tag,
                index: i,
            })
            .collect()
    }

    let set = Arc::new(InstanceSet::new());
    set.rebuild(layout(100, 1.0));

    std::thread::scope(|scope| {
        for _ in 0..10 {
            let set = set.clone();
            scope.spawn(move || {
                for round in 0..2000 {
                    let i = round % 100;
                    match set.transform_at(i) {
                        Some(t) => {
                            assert_eq!(t.index, i);
                            assert!(t.scale == 1.0 || t.scale == 2.0);
                            assert_eq!(t.position, Vec3::splat(t.scale));
                            assert_eq!(t.orientation, Quat::from_rotation_y(t.scale));
                        }
                        None => assert!(i >= 50),
                    }
                    let count = set.count();
                    assert!(count == 100 || count == 50);
                }
            });
        }
        set.rebuild(layout(50, 2.0));
    });

    assert_eq!(set.count(), 50);
    assert!(set.transform_at(49).is_some());
    assert!(set.transform_at(50).is_none());
}
