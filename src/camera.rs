//! Free-flying camera.
//!
//! The camera is stored as a position plus yaw/pitch angles. [`CameraController`]
//! turns keyboard and mouse input into movement, [`Projection`] owns the
//! perspective parameters and [`CameraUniform`] is the GPU representation.

use std::f32::consts::FRAC_PI_2;

use cgmath::{InnerSpace, Matrix4, Point3, Rad, Vector3, perspective};
use instant::Duration;
use winit::{
    event::{ElementState, KeyEvent, WindowEvent},
    keyboard::{KeyCode, PhysicalKey},
};

// wgpu's clip space has z in [0, 1] while cgmath builds OpenGL-style [-1, 1].
#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

const SAFE_FRAC_PI_2: f32 = FRAC_PI_2 - 0.0001;

#[derive(Debug, Clone)]
pub struct Camera {
    pub position: Point3<f32>,
    pub yaw: Rad<f32>,
    pub pitch: Rad<f32>,
}

impl Camera {
    pub fn new<V: Into<Point3<f32>>, Y: Into<Rad<f32>>, P: Into<Rad<f32>>>(
        position: V,
        yaw: Y,
        pitch: P,
    ) -> Self {
        Self {
            position: position.into(),
            yaw: yaw.into(),
            pitch: pitch.into(),
        }
    }

    /// Rotate the camera so that it looks at `target`.
    ///
    /// Does nothing when `target` coincides with the camera position.
    pub fn set_target<T: Into<Point3<f32>>>(&mut self, target: T) {
        let dir = target.into() - self.position;
        if dir.magnitude2() <= f32::EPSILON {
            return;
        }
        let horizontal = (dir.x * dir.x + dir.z * dir.z).sqrt();
        self.yaw = Rad(dir.z.atan2(dir.x));
        self.pitch = Rad(dir.y.atan2(horizontal).clamp(-SAFE_FRAC_PI_2, SAFE_FRAC_PI_2));
    }

    /// Unit vector the camera is looking along.
    pub fn forward(&self) -> Vector3<f32> {
        let (sin_pitch, cos_pitch) = self.pitch.0.sin_cos();
        let (sin_yaw, cos_yaw) = self.yaw.0.sin_cos();
        Vector3::new(cos_pitch * cos_yaw, sin_pitch, cos_pitch * sin_yaw).normalize()
    }

    pub fn calc_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_to_rh(self.position, self.forward(), Vector3::unit_y())
    }
}

#[derive(Debug, Clone)]
pub struct Projection {
    aspect: f32,
    fovy: Rad<f32>,
    znear: f32,
    zfar: f32,
}

impl Projection {
    pub fn new<F: Into<Rad<f32>>>(width: u32, height: u32, fovy: F, znear: f32, zfar: f32) -> Self {
        Self {
            aspect: width.max(1) as f32 / height.max(1) as f32,
            fovy: fovy.into(),
            znear,
            zfar,
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.aspect = width.max(1) as f32 / height.max(1) as f32;
    }

    pub fn calc_matrix(&self) -> Matrix4<f32> {
        OPENGL_TO_WGPU_MATRIX * perspective(self.fovy, self.aspect, self.znear, self.zfar)
    }
}

/// Keyboard and mouse driven movement.
///
/// Arrow keys or WASD move in the view plane, Space/Shift move up and down and
/// dragging the mouse turns the camera.
#[derive(Debug)]
pub struct CameraController {
    amount_left: f32,
    amount_right: f32,
    amount_forward: f32,
    amount_backward: f32,
    amount_up: f32,
    amount_down: f32,
    rotate_horizontal: f32,
    rotate_vertical: f32,
    speed: f32,
    sensitivity: f32,
}

impl CameraController {
    pub fn new(speed: f32, sensitivity: f32) -> Self {
        Self {
            amount_left: 0.0,
            amount_right: 0.0,
            amount_forward: 0.0,
            amount_backward: 0.0,
            amount_up: 0.0,
            amount_down: 0.0,
            rotate_horizontal: 0.0,
            rotate_vertical: 0.0,
            speed,
            sensitivity,
        }
    }

    /// Returns true if the key moved the camera.
    pub fn handle_key(&mut self, key: KeyCode, state: ElementState) -> bool {
        let amount = if state == ElementState::Pressed { 1.0 } else { 0.0 };
        match key {
            KeyCode::KeyW | KeyCode::ArrowUp => {
                self.amount_forward = amount;
                true
            }
            KeyCode::KeyS | KeyCode::ArrowDown => {
                self.amount_backward = amount;
                true
            }
            KeyCode::KeyA | KeyCode::ArrowLeft => {
                self.amount_left = amount;
                true
            }
            KeyCode::KeyD | KeyCode::ArrowRight => {
                self.amount_right = amount;
                true
            }
            KeyCode::Space => {
                self.amount_up = amount;
                true
            }
            KeyCode::ShiftLeft | KeyCode::ShiftRight => {
                self.amount_down = amount;
                true
            }
            _ => false,
        }
    }

    pub fn handle_window_events(&mut self, event: &WindowEvent) -> bool {
        match event {
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(key),
                        state,
                        ..
                    },
                ..
            } => self.handle_key(*key, *state),
            WindowEvent::Focused(false) => {
                // Key releases are lost while unfocused.
                self.stop();
                false
            }
            _ => false,
        }
    }

    pub fn handle_mouse(&mut self, mouse_dx: f64, mouse_dy: f64) {
        self.rotate_horizontal += mouse_dx as f32;
        self.rotate_vertical += mouse_dy as f32;
    }

    fn stop(&mut self) {
        self.amount_left = 0.0;
        self.amount_right = 0.0;
        self.amount_forward = 0.0;
        self.amount_backward = 0.0;
        self.amount_up = 0.0;
        self.amount_down = 0.0;
    }

    pub fn update(&mut self, camera: &mut Camera, dt: Duration) {
        let dt = dt.as_secs_f32();

        let (yaw_sin, yaw_cos) = camera.yaw.0.sin_cos();
        let forward = Vector3::new(yaw_cos, 0.0, yaw_sin).normalize();
        let right = Vector3::new(-yaw_sin, 0.0, yaw_cos).normalize();
        camera.position += forward * (self.amount_forward - self.amount_backward) * self.speed * dt;
        camera.position += right * (self.amount_right - self.amount_left) * self.speed * dt;
        camera.position.y += (self.amount_up - self.amount_down) * self.speed * dt;

        camera.yaw += Rad(self.rotate_horizontal) * self.sensitivity * dt;
        camera.pitch += Rad(-self.rotate_vertical) * self.sensitivity * dt;

        // Mouse deltas arrive as events, not as held state.
        self.rotate_horizontal = 0.0;
        self.rotate_vertical = 0.0;

        camera.pitch = Rad(camera.pitch.0.clamp(-SAFE_FRAC_PI_2, SAFE_FRAC_PI_2));
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    view_position: [f32; 4],
    view_proj: [[f32; 4]; 4],
}

impl CameraUniform {
    pub fn new() -> Self {
        use cgmath::SquareMatrix;
        Self {
            view_position: [0.0; 4],
            view_proj: Matrix4::identity().into(),
        }
    }

    pub fn update_view_proj(&mut self, camera: &Camera, projection: &Projection) {
        self.view_position = camera.position.to_homogeneous().into();
        self.view_proj = (projection.calc_matrix() * camera.calc_matrix()).into();
    }
}

impl Default for CameraUniform {
    fn default() -> Self {
        Self::new()
    }
}

/// Camera state together with the GPU objects that expose it to shaders.
#[derive(Debug)]
pub struct CameraResources {
    pub camera: Camera,
    pub controller: CameraController,
    pub uniform: CameraUniform,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

impl CameraResources {
    pub fn write(&mut self, queue: &wgpu::Queue, projection: &Projection) {
        self.uniform.update_view_proj(&self.camera, projection);
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&[self.uniform]));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: Vector3<f32>, b: Vector3<f32>) {
        assert!((a - b).magnitude() < 1e-4, "{a:?} != {b:?}");
    }

    #[test]
    fn set_target_points_forward_at_the_target() {
        let mut camera = Camera::new((-4.0, 5.0, 10.0), Rad(0.0), Rad(0.0));
        camera.set_target((0.0, 0.0, 0.0));
        let expected = (Point3::new(0.0, 0.0, 0.0) - camera.position).normalize();
        assert_close(camera.forward(), expected);
    }

    #[test]
    fn set_target_on_own_position_keeps_orientation() {
        let mut camera = Camera::new((1.0, 2.0, 3.0), Rad(0.5), Rad(0.25));
        camera.set_target((1.0, 2.0, 3.0));
        assert_eq!(camera.yaw, Rad(0.5));
        assert_eq!(camera.pitch, Rad(0.25));
    }

    #[test]
    fn controller_moves_along_the_view_direction() {
        let mut camera = Camera::new((0.0, 0.0, 0.0), Rad(0.0), Rad(0.0));
        let mut controller = CameraController::new(2.0, 0.4);
        assert!(controller.handle_key(KeyCode::ArrowUp, ElementState::Pressed));
        controller.update(&mut camera, Duration::from_secs(1));
        assert!((camera.position.x - 2.0).abs() < 1e-5);

        controller.handle_key(KeyCode::ArrowUp, ElementState::Released);
        controller.update(&mut camera, Duration::from_secs(1));
        assert!((camera.position.x - 2.0).abs() < 1e-5);
    }

    #[test]
    fn pitch_is_clamped() {
        let mut camera = Camera::new((0.0, 0.0, 0.0), Rad(0.0), Rad(0.0));
        let mut controller = CameraController::new(1.0, 1.0);
        controller.handle_mouse(0.0, -10_000.0);
        controller.update(&mut camera, Duration::from_secs(1));
        assert!(camera.pitch.0 < FRAC_PI_2);
    }

    #[test]
    fn mouse_deltas_within_a_frame_add_up() {
        let mut camera = Camera::new((0.0, 0.0, 0.0), Rad(0.0), Rad(0.0));
        let mut controller = CameraController::new(1.0, 1.0);
        controller.handle_mouse(0.25, 0.0);
        controller.handle_mouse(0.5, 0.0);
        controller.update(&mut camera, Duration::from_secs(1));
        assert!((camera.yaw.0 - 0.75).abs() < 1e-6, "{:?}", camera.yaw);

        // consumed by the update
        controller.update(&mut camera, Duration::from_secs(1));
        assert!((camera.yaw.0 - 0.75).abs() < 1e-6, "{:?}", camera.yaw);
    }

    #[test]
    fn unrelated_keys_are_ignored() {
        let mut controller = CameraController::new(1.0, 1.0);
        assert!(!controller.handle_key(KeyCode::KeyI, ElementState::Pressed));
    }
}
