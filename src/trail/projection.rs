use bevy::prelude::*;
use std::f32::consts::PI;

/// Maps a point on the host surface to trail texture coordinates in [0, 1]².
///
/// `u` is periodic: texels at `u = 0` and `u = 1` are neighbours.
pub trait SurfaceProjection: Send + Sync {
    /// `None` when the point has no defined coordinate.
    fn project(&self, point: Vec3) -> Option<Vec2>;
}

/// Lambert cylindrical equal-area projection of a sphere.
///
/// Equal areas on the sphere cover equal areas of the texture, so a stamp of
/// fixed texture radius covers a similar surface patch at every latitude.
#[derive(Debug, Clone, Copy)]
pub struct EqualAreaSphere {
    pub center: Vec3,
}

impl EqualAreaSphere {
    pub fn new(center: Vec3) -> Self {
        Self { center }
    }
}

impl SurfaceProjection for EqualAreaSphere {
    fn project(&self, point: Vec3) -> Option<Vec2> {
        let n = (point - self.center).try_normalize()?;
        Some(Vec2::new(
            ((-n.z).atan2(n.x) / PI + 1.0) / 2.0,
            n.y * 0.5 + 0.5,
        ))
    }
}

/// Longitude/latitude projection. Squeezes the polar caps into wide texture
/// rows, so a fixed-radius stamp covers less surface there.
#[derive(Debug, Clone, Copy)]
pub struct Equirectangular {
    pub center: Vec3,
}

impl SurfaceProjection for Equirectangular {
    fn project(&self, point: Vec3) -> Option<Vec2> {
        let n = (point - self.center).try_normalize()?;
        Some(Vec2::new((-n.z).atan2(n.x) / (2.0 * PI) + 0.5, n.y.clamp(-1.0, 1.0).asin() / PI + 0.5))
    }
}

/// Distance in texture space, wrapping around the `u` seam.
#[inline]
pub fn uv_distance(a: Vec2, b: Vec2) -> f32 {
    let du = (a.x - b.x).abs().rem_euclid(1.0);
    let du = du.min(1.0 - du);
    let dv = a.y - b.y;
    (du * du + dv * dv).sqrt()
}
