use bevy::prelude::*;
use std::f32::consts::PI;

/// Geometry of a single blade in blade space: base at `y = 0`, tip at `y = height`.
#[derive(Debug, Clone, Default)]
pub struct BladeGeometry {
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub uvs: Vec<[f32; 2]>,
    pub indices: Vec<u32>,
}

impl BladeGeometry {
    /// Cone swept through half a turn, narrowing to a point at the tip.
    pub fn half_cone(radius: f32, height: f32, radial_segments: u32, height_segments: u32) -> Self {
        let radial = radial_segments.max(1);
        let rows = height_segments.max(1);
        let slope = radius / height;
        let mut blade = Self::default();

        for i in 0..=rows {
            let v = i as f32 / rows as f32;
            let r = radius * (1.0 - v);
            for j in 0..=radial {
                let u = j as f32 / radial as f32;
                let theta = u * PI;
                let (s, c) = theta.sin_cos();
                blade.positions.push(Vec3::new(r * s, v * height, r * c));
                blade.normals.push(Vec3::new(s, slope, c).normalize());
                blade.uvs.push([u, v]);
            }
        }

        let row = radial + 1;
        for i in 0..rows {
            for j in 0..radial {
                let a = i * row + j;
                let b = a + 1;
                let c = a + row;
                let d = c + 1;
                blade.indices.extend_from_slice(&[a, b, d]);
                // the top row meets at the tip, so its second triangle would be empty
                if i + 1 != rows {
                    blade.indices.extend_from_slice(&[a, d, c]);
                }
            }
        }
        blade
    }

    /// The field's blade: radius 0.035, unit height, 2 radial and 10 height segments.
    pub fn grass() -> Self {
        Self::half_cone(0.035, 1.0, 2, 10)
    }

    pub fn vertex_count(&self) -> usize { self.positions.len() }
}
