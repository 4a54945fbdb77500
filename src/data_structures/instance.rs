//! Instance transformation data for GPU rendering.
//!
//! Per-instance data like position, rotation, and scale is stored as
//! GPU buffers and passed to shaders for efficient multi-draw instancing.
//! Scene nodes and physics bodies both exchange their poses as [`Instance`].

use std::ops::Mul;

use cgmath::{ElementWise, One, SquareMatrix};

use crate::data_structures::model;

/// Per-instance transformation: position, rotation (as quaternion), and scale.
///
/// Used for GPU instancing: multiple copies of the same model can be rendered
/// with different transforms in a single draw call. The instance data is packed
/// into a GPU buffer and accessible to vertex shaders.
#[derive(Clone, Debug, PartialEq)]
pub struct Instance {
    pub position: cgmath::Vector3<f32>,
    pub rotation: cgmath::Quaternion<f32>,
    pub scale: cgmath::Vector3<f32>,
}

impl Instance {
    /// Create a new instance with identity transformation (no move, rotate, or scale).
    pub fn new() -> Self {
        Self {
            position: cgmath::Vector3::new(0.0, 0.0, 0.0),
            // `Quaternion::one()` is the identity quaternion (no rotation)
            rotation: cgmath::Quaternion::one(),
            scale: cgmath::Vector3::new(1.0, 1.0, 1.0),
        }
    }

    pub fn at(x: f32, y: f32, z: f32) -> Self {
        cgmath::Vector3::new(x, y, z).into()
    }

    pub fn to_matrix(&self) -> cgmath::Matrix4<f32> {
        cgmath::Matrix4::from_translation(self.position)
            * cgmath::Matrix4::from(self.rotation)
            * cgmath::Matrix4::from_nonuniform_scale(self.scale.x, self.scale.y, self.scale.z)
    }

    pub fn to_raw(&self) -> InstanceRaw {
        let world_matrix = self.to_matrix();
        let handedness = world_matrix.determinant().signum();
        InstanceRaw {
            model: world_matrix.into(),
            normal: cgmath::Matrix3::from(self.rotation).into(),
            handedness,
        }
    }
}

impl<'a, 'b> Mul<&'b Instance> for &'a Instance {
    type Output = Instance;

    /// Compose a parent transform (`self`) with a child's local transform.
    fn mul(self, rhs: &'b Instance) -> Self::Output {
        let offset = self.rotation * self.scale.mul_element_wise(rhs.position);
        Instance {
            position: self.position + offset,
            rotation: self.rotation * rhs.rotation,
            scale: self.scale.mul_element_wise(rhs.scale),
        }
    }
}

impl Mul<Instance> for Instance {
    type Output = Self;

    fn mul(self, rhs: Instance) -> Self::Output {
        &self * &rhs
    }
}

impl From<cgmath::Vector3<f32>> for Instance {
    fn from(position: cgmath::Vector3<f32>) -> Self {
        Instance {
            position,
            ..Default::default()
        }
    }
}

impl Default for Instance {
    fn default() -> Self {
        Self::new()
    }
}

/// World matrix, rotation-only normal matrix and the sign of the world
/// matrix determinant, laid out for the vertex stage.
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct InstanceRaw {
    model: [[f32; 4]; 4],
    normal: [[f32; 3]; 3],
    handedness: f32,
}

impl InstanceRaw {
    // Locations 0..=4 belong to `ModelVertex`. A mat4 spans four slots and
    // a mat3 three.
    const ATTRIBUTES: [wgpu::VertexAttribute; 8] = wgpu::vertex_attr_array![
        5 => Float32x4,
        6 => Float32x4,
        7 => Float32x4,
        8 => Float32x4,
        9 => Float32x3,
        10 => Float32x3,
        11 => Float32x3,
        12 => Float32,
    ];
}

impl model::Vertex for InstanceRaw {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<InstanceRaw>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

#[cfg(test)]
mod tests {
    use cgmath::{Deg, InnerSpace, Rotation3};

    use super::*;

    #[test]
    fn parent_transform_rotates_and_scales_child_offset() {
        let parent = Instance {
            position: cgmath::Vector3::new(1.0, 0.0, 0.0),
            rotation: cgmath::Quaternion::from_angle_y(Deg(90.0)),
            scale: cgmath::Vector3::new(2.0, 2.0, 2.0),
        };
        let child = Instance::at(1.0, 0.0, 0.0);
        let world = &parent * &child;
        let expected = cgmath::Vector3::new(1.0, 0.0, -2.0);
        assert!((world.position - expected).magnitude() < 1e-5);
        assert_eq!(world.scale, cgmath::Vector3::new(2.0, 2.0, 2.0));
    }

    #[test]
    fn mirrored_scale_flips_handedness() {
        let mut instance = Instance::new();
        assert_eq!(instance.to_raw().handedness, 1.0);
        instance.scale.x = -1.0;
        assert_eq!(instance.to_raw().handedness, -1.0);
    }
}
