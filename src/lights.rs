//! Scene lights.
//!
//! The room is lit by one hemispheric light (sky/ground ambient) and one spot
//! light hanging from the ceiling. Both are packed into a single uniform that
//! the basic shader reads from bind group 2.

use cgmath::{InnerSpace, Vector3};
use wgpu::util::DeviceExt;

/// Ambient light that blends between a sky colour and a ground colour
/// depending on how much a surface faces `direction`.
#[derive(Debug, Clone)]
pub struct HemisphericLight {
    pub name: String,
    pub direction: Vector3<f32>,
    pub intensity: f32,
    pub diffuse: [f32; 3],
    pub ground_color: [f32; 3],
}

impl HemisphericLight {
    pub fn new(name: &str, direction: Vector3<f32>) -> Self {
        Self {
            name: name.to_string(),
            direction,
            intensity: 1.0,
            diffuse: [1.0; 3],
            ground_color: [0.0; 3],
        }
    }
}

/// Cone light. `angle` is the full opening angle of the cone in radians and
/// `exponent` controls how fast the light fades toward the cone border.
#[derive(Debug, Clone)]
pub struct SpotLight {
    pub name: String,
    pub position: Vector3<f32>,
    pub direction: Vector3<f32>,
    pub angle: f32,
    pub exponent: f32,
    pub intensity: f32,
    pub color: [f32; 3],
}

impl SpotLight {
    pub fn new(
        name: &str,
        position: Vector3<f32>,
        direction: Vector3<f32>,
        angle: f32,
        exponent: f32,
    ) -> Self {
        Self {
            name: name.to_string(),
            position,
            direction,
            angle,
            exponent,
            intensity: 1.0,
            color: [1.0; 3],
        }
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightUniform {
    pub hemi_direction: [f32; 3],
    pub hemi_intensity: f32,
    pub hemi_diffuse: [f32; 3],
    // Due to uniforms requiring 16 byte (4 float) spacing, we need to use a padding field here
    _padding: u32,
    pub hemi_ground: [f32; 3],
    _padding2: u32,
    pub spot_position: [f32; 3],
    pub spot_intensity: f32,
    pub spot_direction: [f32; 3],
    pub spot_cos_half_angle: f32,
    pub spot_color: [f32; 3],
    pub spot_exponent: f32,
}

impl LightUniform {
    pub fn new(hemi: &HemisphericLight, spot: &SpotLight) -> Self {
        Self {
            hemi_direction: hemi.direction.normalize().into(),
            hemi_intensity: hemi.intensity,
            hemi_diffuse: hemi.diffuse,
            _padding: 0,
            hemi_ground: hemi.ground_color,
            _padding2: 0,
            spot_position: spot.position.into(),
            spot_intensity: spot.intensity,
            spot_direction: spot.direction.normalize().into(),
            spot_cos_half_angle: (spot.angle * 0.5).cos(),
            spot_color: spot.color,
            spot_exponent: spot.exponent,
        }
    }
}

pub struct LightResources {
    pub hemispheric: HemisphericLight,
    pub spot: SpotLight,
    pub uniform: LightUniform,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

impl std::fmt::Debug for LightResources {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LightResources")
            .field("hemispheric", &self.hemispheric)
            .field("spot", &self.spot)
            .finish()
    }
}

impl LightResources {
    pub fn new(device: &wgpu::Device, hemispheric: HemisphericLight, spot: SpotLight) -> Self {
        let uniform = LightUniform::new(&hemispheric, &spot);
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Light Buffer"),
            contents: bytemuck::cast_slice(&[uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let bind_group_layout = mk_bind_group_layout(device);
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
            label: Some("light_bind_group"),
        });
        Self {
            hemispheric,
            spot,
            uniform,
            buffer,
            bind_group,
            bind_group_layout,
        }
    }
}

pub fn mk_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }],
        label: Some("light_bind_group_layout"),
    })
}

#[cfg(test)]
mod tests {
    use std::f32::consts::PI;

    use super::*;

    #[test]
    fn uniform_stores_half_cone_cosine() {
        let hemi = HemisphericLight::new("hemisphericLight", Vector3::new(0.0, 1.0, 0.0));
        let mut spot = SpotLight::new(
            "spotLight",
            Vector3::new(0.0, 3.0, 0.0),
            Vector3::new(0.0, -1.0, 0.0),
            PI / 3.0,
            2.0,
        );
        spot.intensity = 40.0;
        let uniform = LightUniform::new(&hemi, &spot);
        assert!((uniform.spot_cos_half_angle - (PI / 6.0).cos()).abs() < 1e-6);
        assert_eq!(uniform.spot_intensity, 40.0);
        assert_eq!(uniform.spot_exponent, 2.0);
        assert_eq!(uniform.spot_direction, [0.0, -1.0, 0.0]);
    }

    #[test]
    fn directions_are_normalized() {
        let hemi = HemisphericLight::new("h", Vector3::new(0.0, 4.0, 0.0));
        let spot = SpotLight::new(
            "s",
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(3.0, 0.0, 4.0),
            1.0,
            1.0,
        );
        let uniform = LightUniform::new(&hemi, &spot);
        assert_eq!(uniform.hemi_direction, [0.0, 1.0, 0.0]);
        let dir: Vector3<f32> = uniform.spot_direction.into();
        assert!((dir.magnitude() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn uniform_matches_wgsl_layout() {
        // six vec3 + scalar pairs, 16 bytes each
        assert_eq!(std::mem::size_of::<LightUniform>(), 96);
    }
}
