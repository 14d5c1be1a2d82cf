//! Aster world space coordinate system (right-handed, z up)
//!
//! ```text
//!                z
//!                ^    y
//!                |   /
//!                |  /
//!                | /
//!                ----------> x
//! ```
//!

use glam::{EulerRot, Mat4, Quat, Vec3};
use log::warn;
use winit::event::{DeviceEvent, ElementState, MouseButton, WindowEvent};
use winit::window::{CursorGrabMode, Window};

pub const NEAR_PLANE: f32 = 0.1;
pub const FAR_PLANE: f32 = 1000.0;
pub const WORLD_SPACE_UP: Vec3 = Vec3::new(0., 0., 1.);
pub const WORLD_SPACE_FORWARD: Vec3 = Vec3::new(0., 1., 0.);
pub const WORLD_SPACE_RIGHT: Vec3 = Vec3::new(1., 0., 0.);

/// A perspective camera.
///
/// The projection targets Vulkan clip space: depth runs zero to one and the
/// Y flip is baked into the matrix, so renderers can use plain viewports.
/// Note the flip mirrors screen-space triangle winding.
#[derive(Debug)]
pub struct Camera {
    position: Vec3,
    rotation: Quat,
    pitch: f32,
    yaw: f32,

    fov_y: f32,
    aspect_ratio: f32,
    z_near: f32,
    z_far: f32,

    forward: Vec3,
    right: Vec3,
    up: Vec3,
    view: Mat4,
    proj: Mat4,
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(std::f32::consts::FRAC_PI_4, 16.0 / 9.0, NEAR_PLANE, FAR_PLANE)
    }
}

impl Camera {
    /// Create a camera at the world origin. `fov_y` is in radians.
    pub fn new(fov_y: f32, aspect_ratio: f32, z_near: f32, z_far: f32) -> Self {
        let mut cam = Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            pitch: 0.,
            yaw: 0.,

            fov_y,
            aspect_ratio,
            z_near: z_near.max(0.0001),
            z_far,

            forward: WORLD_SPACE_FORWARD,
            right: WORLD_SPACE_RIGHT,
            up: WORLD_SPACE_UP,
            view: Mat4::IDENTITY,
            proj: Mat4::IDENTITY,
        };
        cam.rebuild_projection();
        cam.update_view();
        cam
    }

    /// Return the location of camera.
    #[inline]
    pub fn location(&self) -> Vec3 {
        self.position
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
        self.update_view();
    }

    /// Follow the window when its proportions change.
    pub fn set_aspect_ratio(&mut self, aspect_ratio: f32) {
        self.aspect_ratio = aspect_ratio;
        self.rebuild_projection();
    }

    /// Return the view matrix of this camera.
    #[inline]
    pub fn view(&self) -> Mat4 {
        self.view
    }

    /// Return the projection matrix of this camera.
    #[inline]
    pub fn projection(&self) -> Mat4 {
        self.proj
    }

    /// Return the view-projection matrix of this camera.
    #[inline]
    pub fn view_projection(&self) -> Mat4 {
        self.proj * self.view
    }

    /// Return the forward vector of this camera.
    #[inline]
    pub fn forward(&self) -> Vec3 {
        self.forward
    }

    /// Return the right vector of this camera.
    #[inline]
    pub fn right(&self) -> Vec3 {
        self.right
    }

    /// Return the up vector of this camera.
    #[inline]
    pub fn up(&self) -> Vec3 {
        self.up
    }

    /// Apply one tick of motion: yaw and pitch deltas in radians, and a
    /// translation along the camera's own axes (right, forward, up).
    pub fn apply(&mut self, delta_yaw: f32, delta_pitch: f32, delta_position: Vec3, max_pitch: f32) {
        self.yaw += delta_yaw;
        self.pitch = (self.pitch + delta_pitch).clamp(-max_pitch, max_pitch);
        // eliminate roll and avoid gimbal lock
        self.rotation = Quat::from_euler(EulerRot::ZXY, self.yaw, self.pitch, 0.);

        self.update_local_basis();
        self.position += self.right * delta_position.x
            + self.forward * delta_position.y
            + self.up * delta_position.z;
        self.update_view();
    }

    fn rebuild_projection(&mut self) {
        let mut proj =
            Mat4::perspective_rh(self.fov_y, self.aspect_ratio, self.z_near, self.z_far);
        // Vulkan clip space points Y down
        proj.y_axis.y *= -1.0;
        self.proj = proj;
    }

    fn update_view(&mut self) {
        self.view = Mat4::look_to_rh(self.position, self.forward, WORLD_SPACE_UP);
    }

    fn update_local_basis(&mut self) {
        self.forward = self.rotation * WORLD_SPACE_FORWARD;
        self.right = self.rotation * WORLD_SPACE_RIGHT;
        self.up = self.rotation * WORLD_SPACE_UP;
    }
}

/// Controller to modify specific camera data.
pub struct CameraController {
    max_pitch_angle: f32,
    accum_local_pitch: f32,
    accum_local_yaw: f32,

    move_speed: f32,
    mouse_sensitivity: f32,
    /// The higher the value, the higher the lagging. Zero results in abrupt changes.
    rotation_smoothing_factor: f32,

    accum_dx: f32,
    accum_dy: f32,
    is_grabbed: bool,
}

impl Default for CameraController {
    fn default() -> Self {
        Self {
            max_pitch_angle: 89.99_f32.to_radians(),
            accum_local_pitch: 0.,
            accum_local_yaw: 0.,

            move_speed: 10.,
            mouse_sensitivity: 0.4,
            rotation_smoothing_factor: 0.5,

            accum_dx: 0.0,
            accum_dy: 0.0,
            is_grabbed: false,
        }
    }
}

impl CameraController {
    pub fn new(mouse_sensitivity: f32) -> Self {
        Self {
            mouse_sensitivity,
            ..Default::default()
        }
    }

    /// The higher the value, the smoother the rotation.
    pub fn set_rotation_smoothing_factor(&mut self, rotation_smoothing_factor: f32) {
        self.rotation_smoothing_factor = rotation_smoothing_factor;
    }

    /// Determine how fast camera location changes.
    pub fn set_move_speed(&mut self, move_speed: f32) {
        self.move_speed = move_speed;
    }

    /// Determine how fast camera rotation changes.
    pub fn set_mouse_sensitivity(&mut self, mouse_sensitivity: f32) {
        self.mouse_sensitivity = mouse_sensitivity;
    }

    /// Receive and process window events. Left mouse grabs the cursor for
    /// mouse look; losing focus releases it.
    #[profiling::function]
    pub fn on_window_event(&mut self, event: &WindowEvent, window: &Window) {
        match event {
            WindowEvent::MouseInput { button, state, .. } => {
                if *button == MouseButton::Left {
                    match state {
                        ElementState::Pressed => self.grab_cursor(window),
                        ElementState::Released => self.release_cursor(window),
                    }
                }
            }
            WindowEvent::Focused(false) => {
                self.release_cursor(window);
            }
            _ => {}
        }
    }

    /// Receive and process device events.
    #[profiling::function]
    pub fn on_device_event(&mut self, event: &DeviceEvent) {
        if let DeviceEvent::MouseMotion { delta } = event {
            if self.is_grabbed {
                self.accum_dx += delta.0 as f32;
                self.accum_dy += delta.1 as f32;
            }
        }
    }

    /// Drive the camera with the accumulated mouse motion and the given
    /// movement axis speeds, each in [-1, 1].
    #[profiling::function]
    pub fn update(
        &mut self,
        delta_time: f32,
        forward_axis_speed: f32,
        right_axis_speed: f32,
        up_axis_speed: f32,
        camera: &mut Camera,
    ) {
        let d_local_yaw = -self.accum_dx * self.mouse_sensitivity * delta_time;
        let d_local_pitch = -self.accum_dy * self.mouse_sensitivity * delta_time;

        let blend_factor = 1.0 - self.rotation_smoothing_factor.powf(delta_time * 60.0);

        self.accum_local_yaw += d_local_yaw;
        self.accum_local_pitch += d_local_pitch;

        let delta_yaw = self.accum_local_yaw * blend_factor;
        let delta_pitch = self.accum_local_pitch * blend_factor;

        self.accum_local_yaw -= delta_yaw;
        self.accum_local_pitch -= delta_pitch;

        let axis_dir = Vec3::new(right_axis_speed, forward_axis_speed, up_axis_speed);
        let delta_pos = axis_dir * self.move_speed * delta_time;

        camera.apply(delta_yaw, delta_pitch, delta_pos, self.max_pitch_angle);

        self.accum_dx = 0.0;
        self.accum_dy = 0.0;
    }

    pub fn is_grabbed(&self) -> bool {
        self.is_grabbed
    }

    fn grab_cursor(&mut self, window: &Window) {
        self.is_grabbed = true;
        window.set_cursor_visible(false);

        if window.set_cursor_grab(CursorGrabMode::Locked).is_err()
            && window.set_cursor_grab(CursorGrabMode::Confined).is_err()
        {
            warn!("Failed to grab cursor.")
        }
    }

    fn release_cursor(&mut self, window: &Window) {
        self.is_grabbed = false;
        window.set_cursor_visible(true);

        if window.set_cursor_grab(CursorGrabMode::None).is_err() {
            warn!("Failed to release cursor.")
        }
    }
}

#[cfg(test)]
#[path = "camera_tests.rs"]
mod tests;
