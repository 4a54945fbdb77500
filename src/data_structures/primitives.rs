//! Procedural meshes: a subdivided ground plane and a UV sphere.
//!
//! The builders only produce CPU geometry ([`MeshData`]). [`MeshData::upload`]
//! turns it into a [`Model`] with a plain white material so it can go through
//! the same pipeline as loaded glTF models.

use std::f32::consts::PI;

use cgmath::{Vector3, Zero};
use wgpu::util::DeviceExt;

use crate::data_structures::{
    model::{Material, Mesh, Model, ModelVertex},
    scene_graph::compute_tangents,
};

/// Axis aligned bounding box in mesh space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: Vector3<f32>,
    pub max: Vector3<f32>,
}

impl Bounds {
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a [f32; 3]>) -> Self {
        let mut min = Vector3::new(f32::MAX, f32::MAX, f32::MAX);
        let mut max = Vector3::new(f32::MIN, f32::MIN, f32::MIN);
        let mut empty = true;
        for p in points {
            empty = false;
            min = Vector3::new(min.x.min(p[0]), min.y.min(p[1]), min.z.min(p[2]));
            max = Vector3::new(max.x.max(p[0]), max.y.max(p[1]), max.z.max(p[2]));
        }
        if empty {
            return Self {
                min: Vector3::zero(),
                max: Vector3::zero(),
            };
        }
        Self { min, max }
    }

    pub fn half_extents(&self) -> Vector3<f32> {
        (self.max - self.min) * 0.5
    }

    pub fn center(&self) -> Vector3<f32> {
        (self.max + self.min) * 0.5
    }
}

#[derive(Debug, Clone)]
pub struct MeshData {
    pub name: String,
    pub vertices: Vec<ModelVertex>,
    pub indices: Vec<u32>,
    pub bounds: Bounds,
}

impl MeshData {
    fn new(name: &str, mut vertices: Vec<ModelVertex>, indices: Vec<u32>) -> Self {
        compute_tangents(&mut vertices, &indices);
        let bounds = Bounds::from_points(vertices.iter().map(|v| &v.position));
        Self {
            name: name.to_string(),
            vertices,
            indices,
            bounds,
        }
    }

    /// Create GPU buffers and a white material for this mesh.
    pub fn upload(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        material_layout: &wgpu::BindGroupLayout,
    ) -> Model {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{} Vertex Buffer", self.name)),
            contents: bytemuck::cast_slice(&self.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{} Index Buffer", self.name)),
            contents: bytemuck::cast_slice(&self.indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        let material = Material::plain(
            device,
            queue,
            &format!("{} material", self.name),
            material_layout,
        );
        Model {
            meshes: vec![Mesh {
                name: self.name.clone(),
                vertex_buffer,
                index_buffer,
                num_elements: self.indices.len() as u32,
                material: 0,
            }],
            materials: vec![material],
        }
    }
}

/// A flat ground in the XZ plane centred on the origin, facing +Y.
///
/// `subdivisions` is the number of cells along each side, so the mesh has
/// `(subdivisions + 1)^2` vertices and `6 * subdivisions^2` indices.
pub fn ground(name: &str, width: f32, height: f32, subdivisions: u32) -> MeshData {
    let n = subdivisions.max(1);
    let stride = n + 1;
    let mut vertices = Vec::with_capacity((stride * stride) as usize);
    for row in 0..=n {
        for col in 0..=n {
            let u = col as f32 / n as f32;
            let v = row as f32 / n as f32;
            vertices.push(ModelVertex {
                position: [(u - 0.5) * width, 0.0, (v - 0.5) * height],
                tex_coords: [u, 1.0 - v],
                normal: [0.0, 1.0, 0.0],
                ..Default::default()
            });
        }
    }

    let mut indices = Vec::with_capacity((6 * n * n) as usize);
    for row in 0..n {
        for col in 0..n {
            let i = row * stride + col;
            indices.extend_from_slice(&[i, i + stride, i + 1]);
            indices.extend_from_slice(&[i + 1, i + stride, i + stride + 1]);
        }
    }
    MeshData::new(name, vertices, indices)
}

/// A UV sphere centred on the origin.
///
/// `segments` controls the number of latitude rings; longitude uses twice as many
/// slices so the quads stay roughly square.
pub fn sphere(name: &str, segments: u32, diameter: f32) -> MeshData {
    let rings = segments.max(1) + 2;
    let slices = rings * 2;
    let radius = diameter * 0.5;

    let mut vertices = Vec::with_capacity(((rings + 1) * (slices + 1)) as usize);
    for ring in 0..=rings {
        let v = ring as f32 / rings as f32;
        let (sin_theta, cos_theta) = (v * PI).sin_cos();
        for slice in 0..=slices {
            let u = slice as f32 / slices as f32;
            let (sin_phi, cos_phi) = (u * 2.0 * PI).sin_cos();
            let normal = [sin_theta * cos_phi, cos_theta, sin_theta * sin_phi];
            vertices.push(ModelVertex {
                position: normal.map(|c| c * radius),
                tex_coords: [u, v],
                normal,
                ..Default::default()
            });
        }
    }

    let stride = slices + 1;
    let mut indices = Vec::with_capacity((rings * slices * 6) as usize);
    for ring in 0..rings {
        for slice in 0..slices {
            let a = ring * stride + slice;
            let b = a + stride;
            // the first and last ring collapse into the poles
            if ring != 0 {
                indices.extend_from_slice(&[a, a + 1, b]);
            }
            if ring != rings - 1 {
                indices.extend_from_slice(&[a + 1, b + 1, b]);
            }
        }
    }
    MeshData::new(name, vertices, indices)
}

#[cfg(test)]
mod tests {
    use cgmath::InnerSpace;

    use super::*;

    fn triangle_normal(mesh: &MeshData, tri: &[u32]) -> Vector3<f32> {
        let p = |i: u32| Vector3::from(mesh.vertices[i as usize].position);
        (p(tri[1]) - p(tri[0])).cross(p(tri[2]) - p(tri[0]))
    }

    #[test]
    fn ground_has_expected_topology_and_extent() {
        let mesh = ground("ground", 3.8, 3.8, 1);
        assert_eq!(mesh.vertices.len(), 4);
        assert_eq!(mesh.indices.len(), 6);
        assert_eq!(mesh.bounds.min, Vector3::new(-1.9, 0.0, -1.9));
        assert_eq!(mesh.bounds.max, Vector3::new(1.9, 0.0, 1.9));

        let mesh = ground("ground", 2.0, 4.0, 3);
        assert_eq!(mesh.vertices.len(), 16);
        assert_eq!(mesh.indices.len(), 54);
    }

    #[test]
    fn ground_triangles_face_up() {
        let mesh = ground("ground", 1.0, 1.0, 2);
        for tri in mesh.indices.chunks(3) {
            assert!(triangle_normal(&mesh, tri).y > 0.0);
        }
    }

    #[test]
    fn sphere_vertices_lie_on_the_radius() {
        let mesh = sphere("sphere", 32, 1.0);
        for v in &mesh.vertices {
            let len = Vector3::from(v.position).magnitude();
            assert!((len - 0.5).abs() < 1e-5);
        }
        assert!((mesh.bounds.half_extents().y - 0.5).abs() < 1e-5);
        assert!(mesh.bounds.center().magnitude() < 1e-5);
    }

    #[test]
    fn sphere_triangles_face_outward() {
        let mesh = sphere("sphere", 8, 2.0);
        for tri in mesh.indices.chunks(3) {
            let centroid = tri
                .iter()
                .map(|&i| Vector3::from(mesh.vertices[i as usize].position))
                .fold(Vector3::zero(), |acc, p| acc + p);
            assert!(triangle_normal(&mesh, tri).dot(centroid) > 0.0);
        }
    }
}
