//! GPU and window context.
//!
//! [`Context`] owns the surface, device and queue together with everything
//! every frame needs: camera, lights, the lit pipeline and the
//! post-processing chain. [`InitContext`] is the slice of it handed to async
//! scene constructors.

use std::sync::Arc;

use anyhow::Context as _;
use cgmath::{Rad, Vector3};
use wgpu::util::DeviceExt;
use winit::{dpi::PhysicalPosition, window::Window};

use crate::{
    camera::{Camera, CameraController, CameraResources, CameraUniform, Projection},
    config::SceneConfig,
    data_structures::texture::Texture,
    lights::{HemisphericLight, LightResources, SpotLight},
    pipelines::basic::mk_basic_pipeline,
    post_process::{DISTANCE_FORMAT, PostProcess, PostProcessSettings},
    resources::texture::diffuse_normal_layout,
};

/// Camera, light and body placements are authored in a left-handed frame
/// (x right, y up, z into the screen). Use [`to_room_space`] before placing
/// anything next to the glTF room.
pub const CAMERA_POSITION: [f32; 3] = [-4.0, 5.0, 10.0];
/// Vertical field of view in radians.
pub const FIELD_OF_VIEW: f32 = 0.8;
pub const Z_NEAR: f32 = 0.1;
pub const Z_FAR: f32 = 1000.0;

/// Map a left-handed scene coordinate into the right-handed space of the glTF
/// room. A left-handed glTF import mirrors x, so the same room point has its x
/// negated here. Works for positions and directions alike.
pub fn to_room_space(v: Vector3<f32>) -> Vector3<f32> {
    Vector3::new(-v.x, v.y, v.z)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MouseButtonState {
    Left,
    Right,
    #[default]
    None,
}

#[derive(Debug, Default)]
pub struct MouseState {
    pub coords: PhysicalPosition<f64>,
    pub pressed: MouseButtonState,
}

impl MouseState {
    /// Any held button turns the camera while the mouse moves.
    pub fn is_dragging(&self) -> bool {
        self.pressed != MouseButtonState::None
    }
}

#[derive(Debug)]
pub struct Context {
    pub(crate) window: Arc<Window>,
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pub scene: SceneConfig,
    pub camera: CameraResources,
    pub projection: Projection,
    pub light: LightResources,
    pub material_layout: wgpu::BindGroupLayout,
    pub basic_pipeline: wgpu::RenderPipeline,
    pub post_process: PostProcess,
    pub clear_colour: wgpu::Color,
    pub mouse: MouseState,
}

impl Context {
    pub async fn new(window: Arc<Window>, scene: SceneConfig) -> anyhow::Result<Self> {
        let size = surface_size(&window, &scene);

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            #[cfg(not(target_arch = "wasm32"))]
            backends: wgpu::Backends::PRIMARY,
            #[cfg(target_arch = "wasm32")]
            backends: wgpu::Backends::GL,
            ..Default::default()
        });
        let surface = instance
            .create_surface(window.clone())
            .context("could not create a surface for the window")?;
        let (adapter, device, queue) = request_device(&instance, Some(&surface)).await?;

        let surface_caps = surface.get_capabilities(&adapter);
        // The shaders write linear colour and rely on an sRGB surface to encode it.
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .context("the surface supports no texture format")?;
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size[0],
            height: size[1],
            present_mode: surface_caps
                .present_modes
                .first()
                .copied()
                .unwrap_or(wgpu::PresentMode::Fifo),
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let mut settings = PostProcessSettings::standard();
        if !scene.engine.antialias {
            settings.samples = 1;
        }
        settings.samples = supported_samples(&adapter, &settings);

        let camera = mk_camera(&device);
        let projection = Projection::new(size[0], size[1], Rad(FIELD_OF_VIEW), Z_NEAR, Z_FAR);
        let light = mk_lights(&device);
        let material_layout = diffuse_normal_layout(&device);
        let post_process = PostProcess::new(&device, settings, surface_format, size);
        let basic_pipeline = mk_basic_pipeline(
            &device,
            &material_layout,
            &camera.bind_group_layout,
            &light.bind_group_layout,
            &post_process.scene_targets(),
            post_process.sample_count(),
        );
        log::info!(
            "surface {}x{} {:?}, {} MSAA samples",
            size[0],
            size[1],
            surface_format,
            post_process.sample_count()
        );

        let mut ctx = Self {
            window,
            surface,
            device,
            queue,
            config,
            clear_colour: scene.clear_colour,
            scene,
            camera,
            projection,
            light,
            material_layout,
            basic_pipeline,
            post_process,
            mouse: MouseState::default(),
        };
        ctx.camera.write(&ctx.queue, &ctx.projection);
        Ok(ctx)
    }

    /// Reconfigure the surface and every size dependent resource.
    ///
    /// Zero sized windows (minimized) are ignored.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);
        self.projection.resize(width, height);
        self.post_process
            .resize(&self.device, &self.queue, [width, height]);
    }

    /// Re-apply the current size, used after the surface was lost.
    pub fn reconfigure(&mut self) {
        let size = surface_size(&self.window, &self.scene);
        self.resize(size[0], size[1]);
    }
}

/// Size of the drawing buffer. Without device ratio adaptation one pixel per
/// logical pixel is rendered and the compositor scales the result.
fn surface_size(window: &Window, scene: &SceneConfig) -> [u32; 2] {
    let physical = window.inner_size();
    let size = if scene.engine.adapt_to_device_ratio {
        [physical.width, physical.height]
    } else {
        let logical = physical.to_logical::<u32>(window.scale_factor());
        [logical.width, logical.height]
    };
    size.map(|s| s.max(1))
}

/// Pick an adapter compatible with `surface` (if any) and open a device on it.
pub async fn request_device(
    instance: &wgpu::Instance,
    surface: Option<&wgpu::Surface<'_>>,
) -> anyhow::Result<(wgpu::Adapter, wgpu::Device, wgpu::Queue)> {
    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::default(),
            compatible_surface: surface,
            force_fallback_adapter: false,
        })
        .await
        .context("no suitable graphics adapter")?;
    log::info!("using adapter {:?}", adapter.get_info().name);
    let (device, queue) = adapter
        .request_device(&wgpu::DeviceDescriptor {
            label: None,
            required_features: wgpu::Features::empty(),
            // WebGL doesn't support all of wgpu's features.
            required_limits: if cfg!(target_arch = "wasm32") {
                wgpu::Limits::downlevel_webgl2_defaults()
            } else {
                wgpu::Limits::default()
            },
            memory_hints: Default::default(),
            trace: wgpu::Trace::Off,
            ..Default::default()
        })
        .await
        .context("could not open the graphics device")?;
    Ok((adapter, device, queue))
}

/// Highest sample count up to the requested one that every scene target supports.
pub fn supported_samples(adapter: &wgpu::Adapter, settings: &PostProcessSettings) -> u32 {
    let samples = highest_sample_count(
        settings.samples,
        &[settings.color_format(), DISTANCE_FORMAT],
        |format| adapter.get_texture_format_features(format).flags,
    );
    if samples != settings.samples {
        log::warn!(
            "{} MSAA samples requested, using {samples}",
            settings.samples
        );
    }
    samples
}

/// Multisampled colour targets are resolved every frame, so besides the
/// sample count they need `MULTISAMPLE_RESOLVE`. The depth target only has to
/// support the count.
pub fn highest_sample_count(
    requested: u32,
    resolved_formats: &[wgpu::TextureFormat],
    flags: impl Fn(wgpu::TextureFormat) -> wgpu::TextureFormatFeatureFlags,
) -> u32 {
    let resolvable = |format: wgpu::TextureFormat, count: u32| {
        let flags = flags(format);
        flags.sample_count_supported(count)
            && flags.contains(wgpu::TextureFormatFeatureFlags::MULTISAMPLE_RESOLVE)
    };
    [16, 8, 4, 2]
        .into_iter()
        .filter(|&count| count <= requested)
        .find(|&count| {
            resolved_formats
                .iter()
                .all(|&format| resolvable(format, count))
                && flags(Texture::DEPTH_FORMAT).sample_count_supported(count)
        })
        .unwrap_or(1)
}

/// Free camera at [`CAMERA_POSITION`] (in room space) looking at the origin.
pub fn mk_camera(device: &wgpu::Device) -> CameraResources {
    let position: [f32; 3] = to_room_space(CAMERA_POSITION.into()).into();
    let mut camera = Camera::new(position, Rad(0.0), Rad(0.0));
    camera.set_target((0.0, 0.0, 0.0));
    let controller = CameraController::new(4.0, 0.4);
    let uniform = CameraUniform::new();

    let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("Camera Buffer"),
        contents: bytemuck::cast_slice(&[uniform]),
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
    });
    let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
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
        label: Some("camera_bind_group_layout"),
    });
    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout: &bind_group_layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: buffer.as_entire_binding(),
        }],
        label: Some("camera_bind_group"),
    });

    CameraResources {
        camera,
        controller,
        uniform,
        buffer,
        bind_group,
        bind_group_layout,
    }
}

/// Hemispheric sky light plus the spot light hanging above the room.
pub fn mk_lights(device: &wgpu::Device) -> LightResources {
    let mut hemispheric =
        HemisphericLight::new("hemisphericLight", to_room_space(Vector3::new(0.0, 1.0, 0.0)));
    hemispheric.intensity = 0.4;
    let mut spot = SpotLight::new(
        "spotLight",
        to_room_space(Vector3::new(0.0, 3.0, 0.0)),
        to_room_space(Vector3::new(0.0, -1.0, 0.0)),
        std::f32::consts::PI / 3.0,
        2.0,
    );
    spot.intensity = 40.0;
    LightResources::new(device, hemispheric, spot)
}

/// What an async scene constructor may use while the event loop keeps running.
///
/// Device and queue are reference counted, so this is a cheap clone.
#[derive(Debug, Clone)]
pub struct InitContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub surface_format: wgpu::TextureFormat,
    pub material_layout: wgpu::BindGroupLayout,
    pub camera_layout: wgpu::BindGroupLayout,
    pub scene: SceneConfig,
}

impl From<&Context> for InitContext {
    fn from(ctx: &Context) -> Self {
        Self {
            device: ctx.device.clone(),
            queue: ctx.queue.clone(),
            surface_format: ctx.config.format,
            material_layout: ctx.material_layout.clone(),
            camera_layout: ctx.camera.bind_group_layout.clone(),
            scene: ctx.scene.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use cgmath::{InnerSpace, Vector4};

    use super::*;

    fn flags_for(
        color: wgpu::TextureFormatFeatureFlags,
        depth: wgpu::TextureFormatFeatureFlags,
    ) -> impl Fn(wgpu::TextureFormat) -> wgpu::TextureFormatFeatureFlags {
        move |format| {
            if format == Texture::DEPTH_FORMAT {
                depth
            } else {
                color
            }
        }
    }

    #[test]
    fn msaa_needs_resolve_support_on_colour_targets() {
        use wgpu::TextureFormatFeatureFlags as F;
        let formats = [wgpu::TextureFormat::Rgba16Float, DISTANCE_FORMAT];

        let full = flags_for(F::MULTISAMPLE_X4 | F::MULTISAMPLE_RESOLVE, F::MULTISAMPLE_X4);
        assert_eq!(highest_sample_count(4, &formats, full), 4);

        let no_resolve = flags_for(F::MULTISAMPLE_X4, F::MULTISAMPLE_X4);
        assert_eq!(highest_sample_count(4, &formats, no_resolve), 1);

        let small_depth = flags_for(
            F::MULTISAMPLE_X2 | F::MULTISAMPLE_X4 | F::MULTISAMPLE_RESOLVE,
            F::MULTISAMPLE_X2,
        );
        assert_eq!(highest_sample_count(4, &formats, small_depth), 2);

        let full = flags_for(F::MULTISAMPLE_X4 | F::MULTISAMPLE_RESOLVE, F::MULTISAMPLE_X4);
        assert_eq!(highest_sample_count(1, &formats, full), 1);
    }

    #[test]
    fn room_points_land_where_a_left_handed_viewer_sees_them() {
        let position: [f32; 3] = to_room_space(CAMERA_POSITION.into()).into();
        let mut camera = Camera::new(position, Rad(0.0), Rad(0.0));
        camera.set_target((0.0, 0.0, 0.0));
        let view = camera.calc_matrix();

        // Seen from (-4, 5, 10) in a left-handed frame, the glTF +x axis
        // (imported as -x) and the glTF -z axis both lie right of centre.
        let right = Vector3::new(10.0, 0.0, -4.0).normalize();
        let room_x = view * Vector4::new(1.0, 0.0, 0.0, 1.0);
        assert!((room_x.x - right.x).abs() < 1e-4, "{room_x:?}");
        assert!(room_x.z < 0.0, "{room_x:?}");
        let room_back = view * Vector4::new(0.0, 0.0, -1.0, 1.0);
        assert!((room_back.x + right.z).abs() < 1e-4, "{room_back:?}");

        assert_eq!(position, [4.0, 5.0, 10.0]);
    }

    #[test]
    fn dragging_needs_a_button() {
        let mut mouse = MouseState::default();
        assert!(!mouse.is_dragging());
        mouse.pressed = MouseButtonState::Left;
        assert!(mouse.is_dragging());
        mouse.pressed = MouseButtonState::Right;
        assert!(mouse.is_dragging());
    }
}
