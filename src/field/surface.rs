use bevy::prelude::*;
use bevy::render::mesh::VertexAttributeValues;
use std::f32::consts::PI;

use crate::error::{MeadowError, Result};

/// Host surface the field is scattered over.
pub trait Surface {
    fn triangle_count(&self) -> usize;

    fn triangle(&self, face: usize) -> [Vec3; 3];

    fn area(&self, face: usize) -> f32 {
        let [a, b, c] = self.triangle(face);
        0.5 * (b - a).cross(c - a).length()
    }

    /// Unit normal at a point given by barycentric weights on `face`.
    fn normal_at(&self, face: usize, barycentric: Vec3) -> Vec3;

    fn total_area(&self) -> f64 {
        (0..self.triangle_count()).map(|f| self.area(f) as f64).sum()
    }
}

/// Indexed triangle mesh with optional smooth vertex normals.
#[derive(Debug, Clone, Default)]
pub struct TriangleMesh {
    pub positions: Vec<Vec3>,
    pub normals: Option<Vec<Vec3>>,
    pub indices: Vec<[u32; 3]>,
}

impl TriangleMesh {
    pub fn new(positions: Vec<Vec3>, normals: Option<Vec<Vec3>>, indices: Vec<[u32; 3]>) -> Result<Self> {
        if let Some(n) = &normals {
            if n.len() != positions.len() {
                return Err(MeadowError::Configuration(format!(
                    "{} normals for {} positions", n.len(), positions.len()
                )));
            }
        }
        if let Some(bad) = indices.iter().flatten().find(|&&i| i as usize >= positions.len()) {
            return Err(MeadowError::Configuration(format!("index {bad} out of range")));
        }
        Ok(Self { positions, normals, indices })
    }

    /// Latitude/longitude sphere centred on the origin.
    pub fn uv_sphere(radius: f32, sectors: u32, stacks: u32) -> Self {
        let sectors = sectors.max(3);
        let stacks = stacks.max(2);
        let mut positions = Vec::with_capacity(((sectors + 1) * (stacks + 1)) as usize);
        let mut normals = Vec::with_capacity(positions.capacity());

        for i in 0..=stacks {
            let phi = PI * i as f32 / stacks as f32;
            for j in 0..=sectors {
                let theta = 2.0 * PI * j as f32 / sectors as f32;
                let n = Vec3::new(phi.sin() * theta.cos(), phi.cos(), phi.sin() * theta.sin());
                positions.push(n * radius);
                normals.push(n);
            }
        }

        let row = sectors + 1;
        let mut indices = Vec::new();
        for i in 0..stacks {
            for j in 0..sectors {
                let a = i * row + j;
                let b = a + row;
                // skip the collapsed triangle at each pole
                if i != 0 {
                    indices.push([a, b, a + 1]);
                }
                if i != stacks - 1 {
                    indices.push([a + 1, b, b + 1]);
                }
            }
        }

        Self { positions, normals: Some(normals), indices }
    }

    /// Reads positions, normals and indices from a triangle-list bevy mesh.
    pub fn from_mesh(mesh: &Mesh) -> Result<Self> {
        let positions = match mesh.attribute(Mesh::ATTRIBUTE_POSITION) {
            Some(VertexAttributeValues::Float32x3(p)) => p.iter().map(|&v| Vec3::from(v)).collect::<Vec<_>>(),
            _ => return Err(MeadowError::Configuration("mesh has no Float32x3 positions".into())),
        };
        let normals = match mesh.attribute(Mesh::ATTRIBUTE_NORMAL) {
            Some(VertexAttributeValues::Float32x3(n)) => Some(n.iter().map(|&v| Vec3::from(v)).collect()),
            _ => None,
        };
        let flat: Vec<u32> = match mesh.indices() {
            Some(indices) => indices.iter().map(|i| i as u32).collect(),
            None => (0..positions.len() as u32).collect(),
        };
        let indices = flat.chunks_exact(3).map(|t| [t[0], t[1], t[2]]).collect();
        Self::new(positions, normals, indices)
    }

    fn face_normal(&self, face: usize) -> Vec3 {
        let [a, b, c] = self.triangle(face);
        (b - a).cross(c - a).normalize_or_zero()
    }
}

impl Surface for TriangleMesh {
    fn triangle_count(&self) -> usize { self.indices.len() }

    fn triangle(&self, face: usize) -> [Vec3; 3] {
        let [a, b, c] = self.indices[face];
        [self.positions[a as usize], self.positions[b as usize], self.positions[c as usize]]
    }

    fn normal_at(&self, face: usize, barycentric: Vec3) -> Vec3 {
        let Some(normals) = &self.normals else {
            return self.face_normal(face);
        };
        let [a, b, c] = self.indices[face];
        let n = normals[a as usize] * barycentric.x
            + normals[b as usize] * barycentric.y
            + normals[c as usize] * barycentric.z;
        let n = n.normalize_or_zero();
        if n == Vec3::ZERO { self.face_normal(face) } else { n }
    }
}
