use bevy::prelude::*;
use bevy::render::mesh::{Indices, PrimitiveTopology, VertexAttributeValues};

use crate::field::{BladeGeometry, PlacementTransform, Surface, TriangleMesh};
use crate::wind::FieldFrame;

/// The merged mesh holding every blade of the field.
#[derive(Component)]
pub struct FieldMesh {
    /// Instance set generation the index buffer was built for.
    pub generation: u64,
}

#[derive(Component)]
pub struct HostSurface;

#[derive(Default)]
pub struct FieldMeshBuilder {
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub uvs: Vec<[f32; 2]>,
    pub indices: Vec<u32>,
}

impl FieldMeshBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// One copy of `blade` per instance, in rest pose.
    pub fn for_field(blade: &BladeGeometry, instances: &[PlacementTransform]) -> Self {
        let stride = blade.vertex_count();
        let mut builder = Self {
            positions: Vec::with_capacity(stride * instances.len()),
            normals: Vec::with_capacity(stride * instances.len()),
            uvs: Vec::with_capacity(stride * instances.len()),
            indices: Vec::with_capacity(blade.indices.len() * instances.len()),
        };
        for instance in instances {
            builder.add_blade(blade, instance);
        }
        builder
    }

    pub fn for_surface(surface: &TriangleMesh) -> Self {
        let mut builder = Self::new();
        for face in 0..surface.triangle_count() {
            let base_index = builder.positions.len() as u32;
            let corners = surface.triangle(face);
            let weights = [Vec3::X, Vec3::Y, Vec3::Z];
            for (corner, weight) in corners.into_iter().zip(weights) {
                builder.positions.push(corner);
                builder.normals.push(surface.normal_at(face, weight));
                builder.uvs.push([0.0, 0.0]);
            }
            builder.indices.extend_from_slice(&[base_index, base_index + 1, base_index + 2]);
        }
        builder
    }

    pub fn add_blade(&mut self, blade: &BladeGeometry, instance: &PlacementTransform) {
        let base_index = self.positions.len() as u32;
        for ((&p, &n), &uv) in blade.positions.iter().zip(&blade.normals).zip(&blade.uvs) {
            self.positions.push(instance.apply(p));
            self.normals.push(instance.orientation * n);
            self.uvs.push(uv);
        }
        self.indices.extend(blade.indices.iter().map(|&i| base_index + i));
    }

    pub fn build(self) -> Mesh {
        let mut mesh = Mesh::new(PrimitiveTopology::TriangleList);

        let positions: Vec<[f32; 3]> = self.positions.iter().map(|v| v.to_array()).collect();
        let normals: Vec<[f32; 3]> = self.normals.iter().map(|v| v.to_array()).collect();
        let colors = vec![[1.0f32; 4]; positions.len()];

        mesh.insert_attribute(Mesh::ATTRIBUTE_POSITION, positions);
        mesh.insert_attribute(Mesh::ATTRIBUTE_NORMAL, normals);
        mesh.insert_attribute(Mesh::ATTRIBUTE_UV_0, self.uvs);
        mesh.insert_attribute(Mesh::ATTRIBUTE_COLOR, colors);
        mesh.set_indices(Some(Indices::U32(self.indices)));

        mesh
    }
}

/// Copies a deformed frame into the field mesh, reusing its buffers when
/// the vertex count is unchanged.
pub fn write_frame(mesh: &mut Mesh, frame: &FieldFrame) {
    let n = frame.vertex_count();

    let same_positions = matches!(
        mesh.attribute(Mesh::ATTRIBUTE_POSITION),
        Some(VertexAttributeValues::Float32x3(p)) if p.len() == n
    );
    if same_positions {
        if let Some(VertexAttributeValues::Float32x3(p)) = mesh.attribute_mut(Mesh::ATTRIBUTE_POSITION) {
            p.copy_from_slice(&frame.positions);
        }
    } else {
        mesh.insert_attribute(Mesh::ATTRIBUTE_POSITION, frame.positions.clone());
    }

    let same_colors = matches!(
        mesh.attribute(Mesh::ATTRIBUTE_COLOR),
        Some(VertexAttributeValues::Float32x4(c)) if c.len() == n
    );
    if same_colors {
        if let Some(VertexAttributeValues::Float32x4(c)) = mesh.attribute_mut(Mesh::ATTRIBUTE_COLOR) {
            c.copy_from_slice(&frame.colors);
        }
    } else {
        mesh.insert_attribute(Mesh::ATTRIBUTE_COLOR, frame.colors.clone());
    }
}
