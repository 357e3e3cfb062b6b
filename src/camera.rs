//! Perspective camera.

use glam::{Mat4, Vec3};

use crate::config::CameraConfig;

/// Camera with a cached projection matrix.
///
/// Changing `fov`, `aspect`, `near` or `far` has no effect until
/// [`PerspectiveCamera::update_projection_matrix`] is called.
#[derive(Debug, Clone, PartialEq)]
pub struct PerspectiveCamera {
    /// Vertical field of view in degrees.
    pub fov: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    projection: Mat4,
}

impl PerspectiveCamera {
    pub fn new(fov: f32, aspect: f32, near: f32, far: f32) -> Self {
        let mut camera = Self {
            fov,
            aspect,
            near,
            far,
            position: Vec3::ZERO,
            target: Vec3::ZERO,
            up: Vec3::Y,
            projection: Mat4::IDENTITY,
        };
        camera.update_projection_matrix();
        camera
    }

    pub fn from_config(config: &CameraConfig, aspect: f32) -> Self {
        let mut camera = Self::new(config.fov, aspect, config.near, config.far);
        camera.position = config.position;
        camera
    }

    pub fn update_projection_matrix(&mut self) {
        self.projection = Mat4::perspective_rh(
            self.fov.to_radians(),
            self.aspect.max(f32::EPSILON),
            self.near,
            self.far,
        );
    }

    pub fn look_at(&mut self, target: Vec3) {
        self.target = target;
    }

    pub fn projection_matrix(&self) -> Mat4 {
        self.projection
    }

    pub fn view_matrix(&self) -> Mat4 {
        let forward = self.target - self.position;
        if forward.length_squared() <= f32::EPSILON {
            // Degenerate: keep looking down -Z.
            return Mat4::look_to_rh(self.position, Vec3::NEG_Z, self.up);
        }
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection * self.view_matrix()
    }

    /// Camera-to-world transform; columns are the camera's right, up and back axes.
    pub fn world_matrix(&self) -> Mat4 {
        self.view_matrix().inverse()
    }
}
