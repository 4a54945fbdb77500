//! Development overlay.
//!
//! The debug layer draws world axes, the spot light cone and the physics
//! collider wireframes as coloured lines on top of the post-processed frame.
//! It is only loaded in development mode and toggled with `i`.

use rapier3d::{
    math::{Point, Real},
    pipeline::{DebugColor, DebugRenderBackend, DebugRenderObject},
};
use wgpu::util::DeviceExt;
use winit::{event::ElementState, keyboard::Key};

use cgmath::{InnerSpace, Vector3};

use crate::{
    context::InitContext,
    lights::SpotLight,
    pipelines::debug::{LineVertex, mk_debug_pipeline},
};

const AXIS_LENGTH: f32 = 1.0;
const CONE_SEGMENTS: usize = 24;
const INITIAL_CAPACITY: usize = 1024;

/// Visibility flag of the overlay, flipped by the toggle key.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DebugToggle {
    visible: bool,
}

impl DebugToggle {
    /// Flip visibility when `i` or `I` is pressed. Returns true if the key was consumed.
    pub fn handle_key(&mut self, key: &Key, state: ElementState) -> bool {
        if state != ElementState::Pressed {
            return false;
        }
        match key {
            Key::Character(c) if c.as_str().eq_ignore_ascii_case("i") => {
                self.visible = !self.visible;
                true
            }
            _ => false,
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }
}

pub struct DebugLayer {
    toggle: DebugToggle,
    pipeline: wgpu::RenderPipeline,
    vertex_buffer: wgpu::Buffer,
    capacity: usize,
}

impl std::fmt::Debug for DebugLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DebugLayer")
            .field("toggle", &self.toggle)
            .field("capacity", &self.capacity)
            .finish()
    }
}

impl DebugLayer {
    /// Build the line pipeline. The layer starts hidden.
    pub async fn load(ctx: &InitContext) -> anyhow::Result<Self> {
        let pipeline = mk_debug_pipeline(&ctx.device, &ctx.camera_layout, ctx.surface_format);
        let vertex_buffer = mk_vertex_buffer(&ctx.device, INITIAL_CAPACITY);
        log::info!("debug layer loaded, press 'i' to toggle");
        Ok(Self {
            toggle: DebugToggle::default(),
            pipeline,
            vertex_buffer,
            capacity: INITIAL_CAPACITY,
        })
    }

    pub fn show(&mut self) {
        self.toggle.visible = true;
    }

    pub fn hide(&mut self) {
        self.toggle.visible = false;
    }

    pub fn is_visible(&self) -> bool {
        self.toggle.is_visible()
    }

    pub fn handle_key(&mut self, key: &Key, state: ElementState) -> bool {
        let consumed = self.toggle.handle_key(key, state);
        if consumed {
            log::debug!("debug layer visible: {}", self.is_visible());
        }
        consumed
    }

    /// Draw `lines` over `view`, keeping what is already there.
    pub fn draw(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        view: &wgpu::TextureView,
        camera_bind_group: &wgpu::BindGroup,
        lines: &[LineVertex],
    ) {
        if !self.is_visible() || lines.is_empty() {
            return;
        }
        if lines.len() > self.capacity {
            self.capacity = lines.len().next_power_of_two();
            self.vertex_buffer = mk_vertex_buffer(device, self.capacity);
        }
        queue.write_buffer(&self.vertex_buffer, 0, bytemuck::cast_slice(lines));

        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Debug Overlay Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                depth_slice: None,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            occlusion_query_set: None,
            timestamp_writes: None,
        });
        render_pass.set_pipeline(&self.pipeline);
        render_pass.set_bind_group(0, camera_bind_group, &[]);
        render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        render_pass.draw(0..lines.len() as u32, 0..1);
    }
}

fn mk_vertex_buffer(device: &wgpu::Device, capacity: usize) -> wgpu::Buffer {
    let zeroes = vec![
        LineVertex {
            position: [0.0; 3],
            color: [0.0; 4],
        };
        capacity
    ];
    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("Debug Line Buffer"),
        contents: bytemuck::cast_slice(&zeroes),
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
    })
}

/// Gathers line segments, from the physics debug pipeline or from helpers below.
#[derive(Debug, Default)]
pub struct LineCollector {
    pub vertices: Vec<LineVertex>,
}

impl LineCollector {
    pub fn line(&mut self, a: [f32; 3], b: [f32; 3], color: [f32; 4]) {
        self.vertices.push(LineVertex { position: a, color });
        self.vertices.push(LineVertex { position: b, color });
    }

    pub fn clear(&mut self) {
        self.vertices.clear();
    }

    /// X, Y and Z axes at the origin in red, green and blue.
    pub fn axes(&mut self) {
        let o = [0.0; 3];
        self.line(o, [AXIS_LENGTH, 0.0, 0.0], [1.0, 0.0, 0.0, 1.0]);
        self.line(o, [0.0, AXIS_LENGTH, 0.0], [0.0, 1.0, 0.0, 1.0]);
        self.line(o, [0.0, 0.0, AXIS_LENGTH], [0.0, 0.0, 1.0, 1.0]);
    }

    /// Outline of the lit cone of `spot`, cut off `length` units along its axis.
    pub fn spot_cone(&mut self, spot: &SpotLight, length: f32) {
        let color = [1.0, 0.9, 0.3, 1.0];
        let apex = spot.position;
        let axis = spot.direction.normalize();
        let radius = length * (spot.angle * 0.5).tan();
        let helper = if axis.y.abs() < 0.99 {
            Vector3::unit_y()
        } else {
            Vector3::unit_x()
        };
        let u = axis.cross(helper).normalize();
        let v = axis.cross(u);
        let center = apex + axis * length;

        let rim: Vec<Vector3<f32>> = (0..CONE_SEGMENTS)
            .map(|i| {
                let t = i as f32 / CONE_SEGMENTS as f32 * std::f32::consts::TAU;
                center + (u * t.cos() + v * t.sin()) * radius
            })
            .collect();
        for (i, point) in rim.iter().enumerate() {
            let next = rim[(i + 1) % rim.len()];
            self.line((*point).into(), next.into(), color);
            if i % (CONE_SEGMENTS / 4) == 0 {
                self.line(apex.into(), (*point).into(), color);
            }
        }
    }
}

impl DebugRenderBackend for LineCollector {
    fn draw_line(
        &mut self,
        _object: DebugRenderObject,
        a: Point<Real>,
        b: Point<Real>,
        color: DebugColor,
    ) {
        self.line([a.x, a.y, a.z], [b.x, b.y, b.z], hsla_to_rgba(color));
    }
}

/// Convert the physics engine's `[hue (degrees), saturation, lightness, alpha]` colours.
pub fn hsla_to_rgba([h, s, l, a]: [f32; 4]) -> [f32; 4] {
    let c = (1.0 - (2.0 * l - 1.0).abs()) * s;
    let h = h.rem_euclid(360.0) / 60.0;
    let x = c * (1.0 - (h % 2.0 - 1.0).abs());
    let (r, g, b) = match h as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let m = l - c / 2.0;
    [r + m, g + m, b + m, a]
}

#[cfg(test)]
mod tests {
    use winit::keyboard::NamedKey;

    use super::*;

    fn char_key(c: &str) -> Key {
        Key::Character(c.into())
    }

    #[test]
    fn i_toggles_back_and_forth() {
        let mut toggle = DebugToggle::default();
        assert!(!toggle.is_visible());
        assert!(toggle.handle_key(&char_key("i"), ElementState::Pressed));
        assert!(toggle.is_visible());
        assert!(toggle.handle_key(&char_key("I"), ElementState::Pressed));
        assert!(!toggle.is_visible());
    }

    #[test]
    fn other_keys_and_releases_are_ignored() {
        let mut toggle = DebugToggle::default();
        assert!(!toggle.handle_key(&char_key("o"), ElementState::Pressed));
        assert!(!toggle.handle_key(&Key::Named(NamedKey::Space), ElementState::Pressed));
        assert!(!toggle.handle_key(&char_key("i"), ElementState::Released));
        assert!(!toggle.is_visible());
    }

    #[test]
    fn hsla_primaries() {
        assert_eq!(hsla_to_rgba([0.0, 1.0, 0.5, 1.0]), [1.0, 0.0, 0.0, 1.0]);
        assert_eq!(hsla_to_rgba([120.0, 1.0, 0.5, 0.5]), [0.0, 1.0, 0.0, 0.5]);
        assert_eq!(hsla_to_rgba([240.0, 1.0, 0.5, 1.0]), [0.0, 0.0, 1.0, 1.0]);
        assert_eq!(hsla_to_rgba([42.0, 0.0, 0.25, 1.0]), [0.25, 0.25, 0.25, 1.0]);
    }

    #[test]
    fn axes_are_three_segments() {
        let mut lines = LineCollector::default();
        lines.axes();
        assert_eq!(lines.vertices.len(), 6);
        assert_eq!(lines.vertices[1].position, [AXIS_LENGTH, 0.0, 0.0]);
        lines.clear();
        assert!(lines.vertices.is_empty());
    }

    #[test]
    fn cone_rim_lies_on_the_cone() {
        let spot = SpotLight::new(
            "spotLight",
            Vector3::new(0.0, 3.0, 0.0),
            Vector3::new(0.0, -1.0, 0.0),
            std::f32::consts::PI / 3.0,
            2.0,
        );
        let mut lines = LineCollector::default();
        lines.spot_cone(&spot, 3.0);
        let expected_radius = 3.0 * (std::f32::consts::PI / 6.0).tan();
        assert_eq!(lines.vertices.len(), 2 * (CONE_SEGMENTS + 4));
        for vertex in &lines.vertices {
            let [x, y, z] = vertex.position;
            if y > 2.9 {
                assert_eq!(vertex.position, [0.0, 3.0, 0.0]);
            } else {
                assert!(y.abs() < 1e-5);
                assert!(((x * x + z * z).sqrt() - expected_radius).abs() < 1e-4);
            }
        }
    }
}
