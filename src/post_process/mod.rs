//! Post-processing chain: MSAA HDR scene target, bloom and depth of field.
//!
//! The scene is rendered into an offscreen target that stores colour and the
//! distance of every pixel to the camera. [`PostProcess::run`] then
//!
//! 1. extracts highlights above the bloom threshold into a downscaled target,
//! 2. blurs them horizontally and vertically,
//! 3. blurs the full resolution scene for depth of field,
//! 4. merges sharp scene, blurred scene (weighted by the circle of confusion)
//!    and bloom into the output view.

use wgpu::util::DeviceExt;

use crate::{
    data_structures::texture::Texture,
    post_process::{
        blur::{BlurPass, BlurUniform, mk_blur_pipeline},
        dof::DepthOfFieldSettings,
    },
};

pub mod blur;
pub mod dof;

/// Distance written where no geometry was drawn, in metres.
pub const FAR_DISTANCE: f64 = 1000.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BloomSettings {
    pub enabled: bool,
    /// Luminance above which a pixel contributes to bloom.
    pub threshold: f32,
    /// Strength of the bloom added to the final image.
    pub weight: f32,
    /// Ideal blur kernel at full resolution; scaled by `scale`.
    pub kernel: f32,
    /// Resolution of the bloom targets relative to the screen.
    pub scale: f32,
}

impl Default for BloomSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            threshold: 0.9,
            weight: 0.15,
            kernel: 64.0,
            scale: 0.5,
        }
    }
}

impl BloomSettings {
    pub fn scaled_kernel(&self) -> f32 {
        self.kernel * self.scale
    }

    pub fn target_size(&self, size: [u32; 2]) -> [u32; 2] {
        size.map(|s| ((s as f32 * self.scale).floor() as u32).max(1))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PostProcessSettings {
    /// Render the scene into a floating point target.
    pub hdr: bool,
    /// MSAA sample count of the scene target.
    pub samples: u32,
    pub bloom: BloomSettings,
    pub depth_of_field: DepthOfFieldSettings,
}

impl Default for PostProcessSettings {
    fn default() -> Self {
        Self {
            hdr: true,
            samples: 1,
            bloom: BloomSettings::default(),
            depth_of_field: DepthOfFieldSettings::default(),
        }
    }
}

impl PostProcessSettings {
    /// The room's lens: 4x MSAA, soft bloom and a shallow depth of field focused two metres out.
    pub fn standard() -> Self {
        Self {
            hdr: true,
            samples: 4,
            bloom: BloomSettings {
                enabled: true,
                threshold: 0.2,
                weight: 0.3,
                kernel: 64.0,
                scale: 0.5,
            },
            depth_of_field: DepthOfFieldSettings {
                enabled: true,
                focus_distance: 2000.0,
                focal_length: 40.0,
                f_stop: 1.4,
                lens_size: 50.0,
                blur_kernel: 15.0,
            },
        }
    }

    pub fn color_format(&self) -> wgpu::TextureFormat {
        if self.hdr {
            wgpu::TextureFormat::Rgba16Float
        } else {
            wgpu::TextureFormat::Rgba8Unorm
        }
    }
}

pub const DISTANCE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ExtractUniform {
    pub threshold: f32,
    _padding: [f32; 3],
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MergeUniform {
    pub focus_distance: f32,
    pub coc_scale: f32,
    pub bloom_weight: f32,
    pub bloom_enabled: u32,
    pub dof_enabled: u32,
    _padding: [u32; 3],
}

impl MergeUniform {
    pub fn new(settings: &PostProcessSettings) -> Self {
        Self {
            focus_distance: settings.depth_of_field.focus_distance,
            coc_scale: settings.depth_of_field.coc_scale(),
            bloom_weight: settings.bloom.weight,
            bloom_enabled: settings.bloom.enabled as u32,
            dof_enabled: settings.depth_of_field.enabled as u32,
            _padding: [0; 3],
        }
    }
}

/// A texture that is rendered to and sampled from.
#[derive(Debug)]
pub struct RenderTarget {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub size: [u32; 2],
}

impl RenderTarget {
    pub fn new(
        device: &wgpu::Device,
        size: [u32; 2],
        format: wgpu::TextureFormat,
        sample_count: u32,
        label: &str,
    ) -> Self {
        let size = size.map(|s| s.max(1));
        let usage = if sample_count > 1 {
            wgpu::TextureUsages::RENDER_ATTACHMENT
        } else {
            wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: size[0],
                height: size[1],
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            texture,
            view,
            size,
        }
    }
}

/// Everything the main pass renders into.
#[derive(Debug)]
struct SceneTargets {
    color_msaa: Option<RenderTarget>,
    color: RenderTarget,
    distance_msaa: Option<RenderTarget>,
    distance: RenderTarget,
    depth: Texture,
}

impl SceneTargets {
    fn new(device: &wgpu::Device, size: [u32; 2], settings: &PostProcessSettings) -> Self {
        let format = settings.color_format();
        let samples = settings.samples;
        let multisampled = |format, label| {
            (samples > 1).then(|| RenderTarget::new(device, size, format, samples, label))
        };
        Self {
            color_msaa: multisampled(format, "scene color msaa"),
            color: RenderTarget::new(device, size, format, 1, "scene color"),
            distance_msaa: multisampled(DISTANCE_FORMAT, "scene distance msaa"),
            distance: RenderTarget::new(device, size, DISTANCE_FORMAT, 1, "scene distance"),
            depth: Texture::create_depth_texture(device, size, samples, "scene depth"),
        }
    }

    /// `(render view, resolve target)` of a colour attachment.
    fn attachment<'a>(
        msaa: &'a Option<RenderTarget>,
        resolved: &'a RenderTarget,
    ) -> (&'a wgpu::TextureView, Option<&'a wgpu::TextureView>) {
        match msaa {
            Some(msaa) => (&msaa.view, Some(&resolved.view)),
            None => (&resolved.view, None),
        }
    }
}

pub struct PostProcess {
    settings: PostProcessSettings,
    size: [u32; 2],
    sampler: wgpu::Sampler,
    scene: SceneTargets,
    bloom_a: RenderTarget,
    bloom_b: RenderTarget,
    dof_a: RenderTarget,
    dof_b: RenderTarget,

    source_layout: wgpu::BindGroupLayout,
    extract_pipeline: wgpu::RenderPipeline,
    extract_buffer: wgpu::Buffer,
    extract_bind_group: wgpu::BindGroup,

    blur_layout: wgpu::BindGroupLayout,
    blur_pipeline: wgpu::RenderPipeline,
    bloom_h: BlurPass,
    bloom_v: BlurPass,
    dof_h: BlurPass,
    dof_v: BlurPass,

    merge_layout: wgpu::BindGroupLayout,
    merge_pipeline: wgpu::RenderPipeline,
    merge_buffer: wgpu::Buffer,
    merge_bind_group: wgpu::BindGroup,
}

impl std::fmt::Debug for PostProcess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostProcess")
            .field("settings", &self.settings)
            .field("size", &self.size)
            .finish()
    }
}

impl PostProcess {
    pub fn new(
        device: &wgpu::Device,
        settings: PostProcessSettings,
        output_format: wgpu::TextureFormat,
        size: [u32; 2],
    ) -> Self {
        let size = size.map(|s| s.max(1));
        let format = settings.color_format();
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("post process sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let scene = SceneTargets::new(device, size, &settings);
        let bloom_size = settings.bloom.target_size(size);
        let bloom_a = RenderTarget::new(device, bloom_size, format, 1, "bloom a");
        let bloom_b = RenderTarget::new(device, bloom_size, format, 1, "bloom b");
        let dof_a = RenderTarget::new(device, size, format, 1, "dof a");
        let dof_b = RenderTarget::new(device, size, format, 1, "dof b");

        let source_layout = texture_sampler_uniform_layout(device, "extract-bgl");
        let extract_pipeline = fullscreen_pipeline(
            device,
            include_str!("extract.wgsl"),
            "fs_extract",
            &[&source_layout],
            format,
            "extract-pipeline",
        );
        let extract_uniform = ExtractUniform {
            threshold: settings.bloom.threshold,
            _padding: [0.0; 3],
        };
        let extract_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("extract uniform"),
            contents: bytemuck::cast_slice(&[extract_uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let extract_bind_group = source_bind_group(
            device,
            &source_layout,
            &sampler,
            &scene.color.view,
            &extract_buffer,
        );

        let (blur_layout, blur_pipeline) = mk_blur_pipeline(device, format);
        let bloom_kernel = settings.bloom.scaled_kernel();
        let dof_kernel = settings.depth_of_field.blur_kernel;
        let bloom_h = BlurPass::new(
            device,
            &blur_layout,
            &sampler,
            &bloom_a.view,
            BlurUniform::new(bloom_kernel, [1.0, 0.0], bloom_size),
            "bloom blur h",
        );
        let bloom_v = BlurPass::new(
            device,
            &blur_layout,
            &sampler,
            &bloom_b.view,
            BlurUniform::new(bloom_kernel, [0.0, 1.0], bloom_size),
            "bloom blur v",
        );
        let dof_h = BlurPass::new(
            device,
            &blur_layout,
            &sampler,
            &scene.color.view,
            BlurUniform::new(dof_kernel, [1.0, 0.0], size),
            "dof blur h",
        );
        let dof_v = BlurPass::new(
            device,
            &blur_layout,
            &sampler,
            &dof_a.view,
            BlurUniform::new(dof_kernel, [0.0, 1.0], size),
            "dof blur v",
        );

        let merge_layout = merge_layout(device);
        let merge_pipeline = fullscreen_pipeline(
            device,
            include_str!("merge.wgsl"),
            "fs_merge",
            &[&merge_layout],
            output_format,
            "merge-pipeline",
        );
        let merge_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("merge uniform"),
            contents: bytemuck::cast_slice(&[MergeUniform::new(&settings)]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let merge_bind_group = mk_merge_bind_group(
            device,
            &merge_layout,
            &sampler,
            &merge_buffer,
            &scene,
            &dof_b,
            &bloom_a,
        );

        let post = Self {
            settings,
            size,
            sampler,
            scene,
            bloom_a,
            bloom_b,
            dof_a,
            dof_b,
            source_layout,
            extract_pipeline,
            extract_buffer,
            extract_bind_group,
            blur_layout,
            blur_pipeline,
            bloom_h,
            bloom_v,
            dof_h,
            dof_v,
            merge_layout,
            merge_pipeline,
            merge_buffer,
            merge_bind_group,
        };
        log::info!(
            "post processing: {}x{}, {} samples, hdr {}, bloom kernel {}, dof kernel {}",
            size[0],
            size[1],
            settings.samples,
            settings.hdr,
            post.bloom_h.uniform.tap_count,
            post.dof_h.uniform.tap_count,
        );
        post
    }

    pub fn settings(&self) -> &PostProcessSettings {
        &self.settings
    }

    pub fn sample_count(&self) -> u32 {
        self.settings.samples
    }

    pub fn color_format(&self) -> wgpu::TextureFormat {
        self.settings.color_format()
    }

    pub fn size(&self) -> [u32; 2] {
        self.size
    }

    /// Colour targets of the main pass: HDR colour and camera distance.
    pub fn scene_targets(&self) -> [Option<wgpu::ColorTargetState>; 2] {
        [
            Some(wgpu::ColorTargetState {
                format: self.color_format(),
                blend: Some(wgpu::BlendState::REPLACE),
                write_mask: wgpu::ColorWrites::ALL,
            }),
            Some(wgpu::ColorTargetState {
                format: DISTANCE_FORMAT,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            }),
        ]
    }

    /// Start the main pass. Colour is cleared to `clear`, distance to [`FAR_DISTANCE`].
    pub fn begin_scene_pass<'e>(
        &self,
        encoder: &'e mut wgpu::CommandEncoder,
        clear: wgpu::Color,
    ) -> wgpu::RenderPass<'e> {
        let (color_view, color_resolve) =
            SceneTargets::attachment(&self.scene.color_msaa, &self.scene.color);
        let (distance_view, distance_resolve) =
            SceneTargets::attachment(&self.scene.distance_msaa, &self.scene.distance);
        let store = if color_resolve.is_some() {
            wgpu::StoreOp::Discard
        } else {
            wgpu::StoreOp::Store
        };
        encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Scene Render Pass"),
            color_attachments: &[
                Some(wgpu::RenderPassColorAttachment {
                    view: color_view,
                    depth_slice: None,
                    resolve_target: color_resolve,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(clear),
                        store,
                    },
                }),
                Some(wgpu::RenderPassColorAttachment {
                    view: distance_view,
                    depth_slice: None,
                    resolve_target: distance_resolve,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: FAR_DISTANCE,
                            g: 0.0,
                            b: 0.0,
                            a: 1.0,
                        }),
                        store,
                    },
                }),
            ],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.scene.depth.view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            occlusion_query_set: None,
            timestamp_writes: None,
        })
    }

    /// Recreate every size dependent target.
    pub fn resize(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, size: [u32; 2]) {
        let size = size.map(|s| s.max(1));
        if size == self.size {
            return;
        }
        self.size = size;
        let format = self.color_format();
        let bloom_size = self.settings.bloom.target_size(size);
        self.scene = SceneTargets::new(device, size, &self.settings);
        self.bloom_a = RenderTarget::new(device, bloom_size, format, 1, "bloom a");
        self.bloom_b = RenderTarget::new(device, bloom_size, format, 1, "bloom b");
        self.dof_a = RenderTarget::new(device, size, format, 1, "dof a");
        self.dof_b = RenderTarget::new(device, size, format, 1, "dof b");

        self.extract_bind_group = source_bind_group(
            device,
            &self.source_layout,
            &self.sampler,
            &self.scene.color.view,
            &self.extract_buffer,
        );
        let layout = &self.blur_layout;
        let sampler = &self.sampler;
        self.bloom_h
            .rebind(device, queue, layout, sampler, &self.bloom_a.view, bloom_size);
        self.bloom_v
            .rebind(device, queue, layout, sampler, &self.bloom_b.view, bloom_size);
        self.dof_h
            .rebind(device, queue, layout, sampler, &self.scene.color.view, size);
        self.dof_v
            .rebind(device, queue, layout, sampler, &self.dof_a.view, size);
        self.merge_bind_group = mk_merge_bind_group(
            device,
            &self.merge_layout,
            &self.sampler,
            &self.merge_buffer,
            &self.scene,
            &self.dof_b,
            &self.bloom_a,
        );
    }

    /// Run the post-processing passes and write the final image to `output`.
    pub fn run(&self, encoder: &mut wgpu::CommandEncoder, output: &wgpu::TextureView) {
        if self.settings.bloom.enabled {
            fullscreen_pass(
                encoder,
                &self.bloom_a.view,
                &self.extract_pipeline,
                &self.extract_bind_group,
                "bloom extract",
            );
            fullscreen_pass(
                encoder,
                &self.bloom_b.view,
                &self.blur_pipeline,
                &self.bloom_h.bind_group,
                "bloom blur h",
            );
            fullscreen_pass(
                encoder,
                &self.bloom_a.view,
                &self.blur_pipeline,
                &self.bloom_v.bind_group,
                "bloom blur v",
            );
        }
        if self.settings.depth_of_field.enabled {
            fullscreen_pass(
                encoder,
                &self.dof_a.view,
                &self.blur_pipeline,
                &self.dof_h.bind_group,
                "dof blur h",
            );
            fullscreen_pass(
                encoder,
                &self.dof_b.view,
                &self.blur_pipeline,
                &self.dof_v.bind_group,
                "dof blur v",
            );
        }
        fullscreen_pass(
            encoder,
            output,
            &self.merge_pipeline,
            &self.merge_bind_group,
            "merge",
        );
    }
}

fn mk_merge_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    sampler: &wgpu::Sampler,
    buffer: &wgpu::Buffer,
    scene: &SceneTargets,
    dof: &RenderTarget,
    bloom: &RenderTarget,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("merge bind group"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&scene.color.view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::TextureView(&dof.view),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: wgpu::BindingResource::TextureView(&bloom.view),
            },
            wgpu::BindGroupEntry {
                binding: 3,
                resource: wgpu::BindingResource::TextureView(&scene.distance.view),
            },
            wgpu::BindGroupEntry {
                binding: 4,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
            wgpu::BindGroupEntry {
                binding: 5,
                resource: buffer.as_entire_binding(),
            },
        ],
    })
}

fn fullscreen_pass(
    encoder: &mut wgpu::CommandEncoder,
    target: &wgpu::TextureView,
    pipeline: &wgpu::RenderPipeline,
    bind_group: &wgpu::BindGroup,
    label: &str,
) {
    let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some(label),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view: target,
            depth_slice: None,
            resolve_target: None,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                store: wgpu::StoreOp::Store,
            },
        })],
        depth_stencil_attachment: None,
        occlusion_query_set: None,
        timestamp_writes: None,
    });
    pass.set_pipeline(pipeline);
    pass.set_bind_group(0, bind_group, &[]);
    pass.draw(0..3, 0..1);
}

fn texture_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            multisampled: false,
            view_dimension: wgpu::TextureViewDimension::D2,
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
        },
        count: None,
    }
}

fn sampler_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
        count: None,
    }
}

fn uniform_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

/// Source texture, sampler and a uniform: the layout shared by extract and blur.
pub(crate) fn texture_sampler_uniform_layout(
    device: &wgpu::Device,
    label: &str,
) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some(label),
        entries: &[texture_entry(0), sampler_entry(1), uniform_entry(2)],
    })
}

fn merge_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("merge-bgl"),
        entries: &[
            texture_entry(0),
            texture_entry(1),
            texture_entry(2),
            texture_entry(3),
            sampler_entry(4),
            uniform_entry(5),
        ],
    })
}

fn source_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    sampler: &wgpu::Sampler,
    source: &wgpu::TextureView,
    buffer: &wgpu::Buffer,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("extract bind group"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(source),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: buffer.as_entire_binding(),
            },
        ],
    })
}

/// Build a pipeline that draws one fullscreen triangle with `fragment_src`.
///
/// The fragment source is appended to the shared fullscreen vertex shader.
pub(crate) fn fullscreen_pipeline(
    device: &wgpu::Device,
    fragment_src: &str,
    entry_point: &str,
    bind_group_layouts: &[&wgpu::BindGroupLayout],
    format: wgpu::TextureFormat,
    label: &str,
) -> wgpu::RenderPipeline {
    let src = [include_str!("fullscreen.wgsl"), fragment_src].join("\n\n");
    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Wgsl(std::borrow::Cow::Owned(src)),
    });
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(label),
        bind_group_layouts,
        push_constant_ranges: &[],
    });
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(&layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some("vs_fullscreen"),
            buffers: &[],
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: Some(entry_point),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState::default(),
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_settings_describe_the_room_lens() {
        let settings = PostProcessSettings::standard();
        assert!(settings.hdr);
        assert_eq!(settings.samples, 4);
        assert_eq!(settings.color_format(), wgpu::TextureFormat::Rgba16Float);
        assert!(settings.bloom.enabled);
        assert_eq!(settings.bloom.threshold, 0.2);
        assert_eq!(settings.bloom.weight, 0.3);
        assert_eq!(settings.bloom.scaled_kernel(), 32.0);
        assert!(settings.depth_of_field.enabled);
        assert_eq!(settings.depth_of_field.focus_distance, 2000.0);
        assert_eq!(settings.depth_of_field.focal_length, 40.0);
        assert_eq!(settings.depth_of_field.f_stop, 1.4);
    }

    #[test]
    fn bloom_targets_are_scaled_but_never_empty() {
        let bloom = PostProcessSettings::standard().bloom;
        assert_eq!(bloom.target_size([1280, 721]), [640, 360]);
        assert_eq!(bloom.target_size([1, 1]), [1, 1]);
    }

    #[test]
    fn merge_uniform_packs_the_flags() {
        let mut settings = PostProcessSettings::standard();
        settings.bloom.enabled = false;
        let uniform = MergeUniform::new(&settings);
        assert_eq!(uniform.bloom_enabled, 0);
        assert_eq!(uniform.dof_enabled, 1);
        assert_eq!(uniform.bloom_weight, 0.3);
        assert_eq!(std::mem::size_of::<MergeUniform>(), 32);
        assert_eq!(std::mem::size_of::<ExtractUniform>(), 16);
    }
}
