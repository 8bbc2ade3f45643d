use glam::{Mat4, Vec3};
use orrery_common::Transform;
use orrery_input::{Action, InputState};
use serde::{Deserialize, Serialize};
use std::f32::consts::FRAC_PI_2;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Projection {
    Perspective,
    /// Parallel projection showing `view_height` world units vertically.
    Orthographic { view_height: f32 },
}

/// Initial placement and lens of a camera.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraSettings {
    pub position: Vec3,
    /// Pitch, yaw, roll in radians.
    pub rotation: Vec3,
    /// Vertical field of view in radians.
    pub fov: f32,
    pub near: f32,
    pub far: f32,
    pub move_speed: f32,
    pub look_sensitivity: f32,
    pub projection: Projection,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 10.0, -55.0),
            rotation: Vec3::ZERO,
            fov: std::f32::consts::FRAC_PI_3,
            near: 0.01,
            far: 150.0,
            move_speed: 5.0,
            look_sensitivity: 5.0,
            projection: Projection::Perspective,
        }
    }
}

/// Left-handed fly camera driven by an injected [`InputState`].
#[derive(Debug, Clone)]
pub struct Camera {
    transform: Transform,
    view: Mat4,
    projection: Mat4,
    aspect_ratio: f32,
    fov: f32,
    near: f32,
    far: f32,
    mode: Projection,
    move_speed: f32,
    look_sensitivity: f32,
}

impl Camera {
    pub fn new(settings: &CameraSettings, aspect_ratio: f32) -> Self {
        let mut transform = Transform::new(settings.position);
        transform.set_rotation(settings.rotation);
        let mut camera = Self {
            transform,
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
            aspect_ratio,
            fov: settings.fov,
            near: settings.near,
            far: settings.far,
            mode: settings.projection,
            move_speed: settings.move_speed,
            look_sensitivity: settings.look_sensitivity,
        };
        camera.update_view_matrix();
        camera.update_projection_matrix(aspect_ratio);
        camera
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    /// Mutable access to the placement. Call [`Camera::update_view_matrix`]
    /// (or [`Camera::update`]) before the next render.
    pub fn transform_mut(&mut self) -> &mut Transform {
        &mut self.transform
    }

    pub fn view(&self) -> Mat4 {
        self.view
    }

    pub fn projection(&self) -> Mat4 {
        self.projection
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.aspect_ratio
    }

    pub fn projection_mode(&self) -> Projection {
        self.mode
    }

    pub fn position(&self) -> Vec3 {
        self.transform.position()
    }

    pub fn update_projection_matrix(&mut self, aspect_ratio: f32) {
        self.aspect_ratio = aspect_ratio;
        self.projection = match self.mode {
            Projection::Perspective => {
                Mat4::perspective_lh(self.fov, aspect_ratio, self.near, self.far)
            }
            Projection::Orthographic { view_height } => {
                let half_h = view_height * 0.5;
                let half_w = half_h * aspect_ratio;
                Mat4::orthographic_lh(-half_w, half_w, -half_h, half_h, self.near, self.far)
            }
        };
    }

    pub fn update_view_matrix(&mut self) {
        self.view = Mat4::look_to_lh(self.transform.position(), self.transform.forward(), Vec3::Y);
    }

    /// Apply one frame of movement and look input, then refresh the view.
    pub fn update(&mut self, input: &InputState, dt: f32) {
        let dist = self.move_speed * dt;

        if input.action_down(Action::MoveForward) {
            self.transform.move_relative(Vec3::new(0.0, 0.0, dist));
        }
        if input.action_down(Action::MoveBackward) {
            self.transform.move_relative(Vec3::new(0.0, 0.0, -dist));
        }
        if input.action_down(Action::MoveLeft) {
            self.transform.move_relative(Vec3::new(-dist, 0.0, 0.0));
        }
        if input.action_down(Action::MoveRight) {
            self.transform.move_relative(Vec3::new(dist, 0.0, 0.0));
        }
        if input.action_down(Action::MoveDown) {
            self.transform.move_absolute(Vec3::new(0.0, -dist, 0.0));
        }
        if input.action_down(Action::MoveUp) {
            self.transform.move_absolute(Vec3::new(0.0, dist, 0.0));
        }

        if input.action_down(Action::Look) {
            let delta = input.mouse_delta() * self.look_sensitivity * dt;
            self.transform.rotate(Vec3::new(delta.y, delta.x, 0.0));

            let mut rotation = self.transform.pitch_yaw_roll();
            rotation.x = rotation.x.clamp(-FRAC_PI_2, FRAC_PI_2);
            self.transform.set_rotation(rotation);
        }

        self.update_view_matrix();
    }
}
