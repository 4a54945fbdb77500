//! Meshes, materials and the vertex format shared by every opaque draw.

use std::ops::Range;

use wgpu::util::DeviceExt;

use crate::data_structures::texture::{SamplingMode, Texture};

pub trait Vertex {
    fn desc() -> wgpu::VertexBufferLayout<'static>;
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ModelVertex {
    pub position: [f32; 3],
    pub tex_coords: [f32; 2],
    pub normal: [f32; 3],
    pub tangent: [f32; 3],
    pub bitangent: [f32; 3],
}

impl Vertex for ModelVertex {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<ModelVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x2,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 5]>() as wgpu::BufferAddress,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 8]>() as wgpu::BufferAddress,
                    shader_location: 3,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 11]>() as wgpu::BufferAddress,
                    shader_location: 4,
                    format: wgpu::VertexFormat::Float32x3,
                },
            ],
        }
    }
}

/// Diffuse and normal texture of a surface plus the base colour factor the
/// diffuse samples are multiplied with, bound as group 0 of the basic pipeline.
#[derive(Clone, Debug)]
pub struct Material {
    pub name: String,
    pub diffuse_texture: Texture,
    pub normal_texture: Texture,
    pub base_color_factor: [f32; 4],
    factor_buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    layout: wgpu::BindGroupLayout,
}

impl Material {
    pub fn new(
        device: &wgpu::Device,
        name: &str,
        diffuse_texture: Texture,
        normal_texture: Texture,
        base_color_factor: [f32; 4],
        layout: &wgpu::BindGroupLayout,
    ) -> Self {
        let factor_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{name} Factor Buffer")),
            contents: bytemuck::cast_slice(&base_color_factor),
            usage: wgpu::BufferUsages::UNIFORM,
        });
        let bind_group = mk_bind_group(
            device,
            name,
            &diffuse_texture,
            &normal_texture,
            &factor_buffer,
            layout,
        );
        Self {
            name: name.to_string(),
            diffuse_texture,
            normal_texture,
            base_color_factor,
            factor_buffer,
            bind_group,
            layout: layout.clone(),
        }
    }

    /// White, untextured and flat. Used by procedural meshes and by glTF
    /// primitives that reference no material.
    pub fn plain(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        name: &str,
        layout: &wgpu::BindGroupLayout,
    ) -> Self {
        Self::new(
            device,
            name,
            Texture::create_solid_color(device, queue, [255; 4], "default diffuse"),
            Texture::create_default_normal_map(device, queue),
            [1.0; 4],
            layout,
        )
    }

    /// Switch both textures to `mode` and rebuild the bind group around the new samplers.
    pub fn set_sampling_mode(&mut self, device: &wgpu::Device, mode: SamplingMode) {
        self.diffuse_texture.set_sampling_mode(device, mode);
        self.normal_texture.set_sampling_mode(device, mode);
        self.bind_group = mk_bind_group(
            device,
            &self.name,
            &self.diffuse_texture,
            &self.normal_texture,
            &self.factor_buffer,
            &self.layout,
        );
    }
}

fn mk_bind_group(
    device: &wgpu::Device,
    name: &str,
    diffuse: &Texture,
    normal: &Texture,
    factor: &wgpu::Buffer,
    layout: &wgpu::BindGroupLayout,
) -> wgpu::BindGroup {
    let fallback;
    let diffuse_sampler = match &diffuse.sampler {
        Some(sampler) => sampler,
        None => {
            fallback = diffuse.sampling_mode.create_sampler(device);
            &fallback
        }
    };
    let normal_fallback;
    let normal_sampler = match &normal.sampler {
        Some(sampler) => sampler,
        None => {
            normal_fallback = normal.sampling_mode.create_sampler(device);
            &normal_fallback
        }
    };
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&diffuse.view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(diffuse_sampler),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: wgpu::BindingResource::TextureView(&normal.view),
            },
            wgpu::BindGroupEntry {
                binding: 3,
                resource: wgpu::BindingResource::Sampler(normal_sampler),
            },
            wgpu::BindGroupEntry {
                binding: 4,
                resource: factor.as_entire_binding(),
            },
        ],
        label: Some(name),
    })
}

#[derive(Clone, Debug)]
pub struct Mesh {
    pub name: String,
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub num_elements: u32,
    pub material: usize,
}

#[derive(Clone, Debug)]
pub struct Model {
    pub meshes: Vec<Mesh>,
    pub materials: Vec<Material>,
}

impl Model {
    pub fn set_sampling_mode(&mut self, device: &wgpu::Device, mode: SamplingMode) {
        self.materials
            .iter_mut()
            .for_each(|material| material.set_sampling_mode(device, mode));
    }
}

pub trait DrawModel {
    fn draw_mesh_instanced(
        &mut self,
        mesh: &Mesh,
        material: &Material,
        instances: Range<u32>,
        camera_bind_group: &wgpu::BindGroup,
        light_bind_group: &wgpu::BindGroup,
    );

    fn draw_model_instanced(
        &mut self,
        model: &Model,
        instances: Range<u32>,
        camera_bind_group: &wgpu::BindGroup,
        light_bind_group: &wgpu::BindGroup,
    );
}

impl DrawModel for wgpu::RenderPass<'_> {
    fn draw_mesh_instanced(
        &mut self,
        mesh: &Mesh,
        material: &Material,
        instances: Range<u32>,
        camera_bind_group: &wgpu::BindGroup,
        light_bind_group: &wgpu::BindGroup,
    ) {
        self.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
        self.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        self.set_bind_group(0, &material.bind_group, &[]);
        self.set_bind_group(1, camera_bind_group, &[]);
        self.set_bind_group(2, light_bind_group, &[]);
        self.draw_indexed(0..mesh.num_elements, 0, instances);
    }

    fn draw_model_instanced(
        &mut self,
        model: &Model,
        instances: Range<u32>,
        camera_bind_group: &wgpu::BindGroup,
        light_bind_group: &wgpu::BindGroup,
    ) {
        for mesh in &model.meshes {
            match model.materials.get(mesh.material) {
                Some(material) => self.draw_mesh_instanced(
                    mesh,
                    material,
                    instances.clone(),
                    camera_bind_group,
                    light_bind_group,
                ),
                None => log::warn!(
                    "mesh {} references missing material {}",
                    mesh.name,
                    mesh.material
                ),
            }
        }
    }
}
