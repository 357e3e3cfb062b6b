//! Orbit-style camera controls: drag to rotate around a target, drag with
//! the secondary button to pan, wheel to dolly. With damping enabled the
//! accumulated deltas bleed into the camera over several `update` calls.

use std::f32::consts::{PI, TAU};

use glam::{Vec2, Vec3};

use crate::camera::PerspectiveCamera;
use crate::config::ControlsConfig;
use crate::viewport::Viewport;

const POLAR_EPSILON: f32 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    Secondary,
    Middle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DragState {
    Idle,
    Rotate,
    Pan,
}

/// Radius, polar angle from +Y, azimuth around +Y from +Z.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
struct Spherical {
    radius: f32,
    phi: f32,
    theta: f32,
}

impl Spherical {
    fn from_offset(offset: Vec3) -> Self {
        let radius = offset.length();
        if radius == 0.0 {
            return Self::default();
        }
        Self {
            radius,
            theta: offset.x.atan2(offset.z),
            phi: (offset.y / radius).clamp(-1.0, 1.0).acos(),
        }
    }

    fn to_offset(self) -> Vec3 {
        let sin_phi = self.phi.sin();
        Vec3::new(
            self.radius * sin_phi * self.theta.sin(),
            self.radius * self.phi.cos(),
            self.radius * sin_phi * self.theta.cos(),
        )
    }
}

#[derive(Debug, Clone)]
pub struct OrbitControls {
    pub target: Vec3,
    pub enable_damping: bool,
    pub damping_factor: f32,
    pub enable_zoom: bool,
    pub enable_rotate: bool,
    pub enable_pan: bool,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub pan_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    pub min_polar_angle: f32,
    pub max_polar_angle: f32,
    state: DragState,
    last_pointer: Vec2,
    spherical_delta: Spherical,
    pan_offset: Vec3,
    scale: f32,
}

impl OrbitControls {
    pub fn new(config: &ControlsConfig) -> Self {
        Self {
            target: Vec3::ZERO,
            enable_damping: config.enable_damping,
            damping_factor: config.damping_factor,
            enable_zoom: config.enable_zoom,
            enable_rotate: config.enable_rotate,
            enable_pan: config.enable_pan,
            rotate_speed: config.rotate_speed,
            zoom_speed: config.zoom_speed,
            pan_speed: config.pan_speed,
            min_distance: config.min_distance,
            max_distance: config.max_distance,
            min_polar_angle: 0.0,
            max_polar_angle: PI,
            state: DragState::Idle,
            last_pointer: Vec2::ZERO,
            spherical_delta: Spherical::default(),
            pan_offset: Vec3::ZERO,
            scale: 1.0,
        }
    }

    pub fn is_dragging(&self) -> bool {
        self.state != DragState::Idle
    }

    pub fn pointer_down(&mut self, button: PointerButton, position: Vec2) {
        self.state = match button {
            PointerButton::Primary if self.enable_rotate => DragState::Rotate,
            PointerButton::Secondary | PointerButton::Middle if self.enable_pan => DragState::Pan,
            _ => DragState::Idle,
        };
        self.last_pointer = position;
    }

    pub fn pointer_up(&mut self) {
        self.state = DragState::Idle;
    }

    pub fn pointer_move(&mut self, position: Vec2, viewport: Viewport, camera: &PerspectiveCamera) {
        let delta = position - self.last_pointer;
        self.last_pointer = position;
        let height = viewport.height.max(1) as f32;
        match self.state {
            DragState::Idle => {}
            DragState::Rotate => {
                let delta = delta * self.rotate_speed;
                self.rotate_left(TAU * delta.x / height);
                self.rotate_up(TAU * delta.y / height);
            }
            DragState::Pan => self.pan(delta * self.pan_speed, height, camera),
        }
    }

    /// Wheel input; negative `delta_y` (scrolling up) moves closer.
    pub fn wheel(&mut self, delta_y: f32) {
        if !self.enable_zoom || delta_y == 0.0 {
            return;
        }
        let zoom_scale = 0.95_f32.powf(self.zoom_speed);
        if delta_y < 0.0 {
            self.scale *= zoom_scale;
        } else {
            self.scale /= zoom_scale;
        }
    }

    pub fn rotate_left(&mut self, angle: f32) {
        self.spherical_delta.theta -= angle;
    }

    pub fn rotate_up(&mut self, angle: f32) {
        self.spherical_delta.phi -= angle;
    }

    fn pan(&mut self, delta: Vec2, height: f32, camera: &PerspectiveCamera) {
        let distance = (camera.position - self.target).length();
        let target_distance = distance * (camera.fov.to_radians() * 0.5).tan();
        let world = camera.world_matrix();
        let right = world.x_axis.truncate();
        let up = world.y_axis.truncate();
        self.pan_offset += right * (-2.0 * delta.x * target_distance / height);
        self.pan_offset += up * (2.0 * delta.y * target_distance / height);
    }

    /// Applies pending input to the camera. Returns whether the camera moved.
    pub fn update(&mut self, camera: &mut PerspectiveCamera) -> bool {
        let previous_position = camera.position;
        let previous_target = self.target;

        let mut spherical = Spherical::from_offset(camera.position - self.target);
        let factor = if self.enable_damping {
            self.damping_factor
        } else {
            1.0
        };
        spherical.theta += self.spherical_delta.theta * factor;
        spherical.phi += self.spherical_delta.phi * factor;
        spherical.phi = spherical
            .phi
            .clamp(self.min_polar_angle, self.max_polar_angle)
            .clamp(POLAR_EPSILON, PI - POLAR_EPSILON);
        spherical.radius =
            (spherical.radius * self.scale).clamp(self.min_distance, self.max_distance);

        self.target += self.pan_offset * factor;
        camera.position = self.target + spherical.to_offset();
        camera.look_at(self.target);

        if self.enable_damping {
            let keep = 1.0 - self.damping_factor;
            self.spherical_delta.theta *= keep;
            self.spherical_delta.phi *= keep;
            self.pan_offset *= keep;
        } else {
            self.spherical_delta = Spherical::default();
            self.pan_offset = Vec3::ZERO;
        }
        self.scale = 1.0;

        (camera.position - previous_position).length_squared() > 1e-12
            || (self.target - previous_target).length_squared() > 1e-12
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera() -> PerspectiveCamera {
        let mut camera = PerspectiveCamera::new(75.0, 1.0, 0.1, 1000.0);
        camera.position = Vec3::new(0.0, 0.0, 5.0);
        camera
    }

    #[test]
    fn idle_update_keeps_camera_in_place() {
        let mut controls = OrbitControls::new(&ControlsConfig::default());
        let mut camera = camera();
        assert!(!controls.update(&mut camera));
        assert!((camera.position - Vec3::new(0.0, 0.0, 5.0)).length() < 1e-5);
    }

    #[test]
    fn damped_rotation_converges_and_keeps_distance() {
        let mut controls = OrbitControls::new(&ControlsConfig::default());
        let mut camera = camera();
        let viewport = Viewport::new(800, 800);
        controls.pointer_down(PointerButton::Primary, Vec2::new(400.0, 400.0));
        controls.pointer_move(Vec2::new(500.0, 400.0), viewport, &camera);
        controls.pointer_up();

        controls.update(&mut camera);
        let first = camera.position;
        for _ in 0..200 {
            controls.update(&mut camera);
        }
        let settled = camera.position;
        for _ in 0..10 {
            assert!(!controls.update(&mut camera));
        }
        assert!((first.length() - 5.0).abs() < 1e-4);
        assert!((settled.length() - 5.0).abs() < 1e-4);
        // total rotation is the full delta: 2*pi*100/800 to the left
        let expected = -TAU * 100.0 / 800.0;
        let theta = settled.x.atan2(settled.z);
        assert!((theta - expected).abs() < 1e-3, "theta {theta}");
    }

    #[test]
    fn wheel_dollies_towards_and_away_from_target() {
        let mut config = ControlsConfig::default();
        config.enable_damping = false;
        let mut controls = OrbitControls::new(&config);
        let mut camera = camera();
        controls.wheel(-100.0);
        controls.update(&mut camera);
        assert!((camera.position.length() - 4.75).abs() < 1e-4);
        controls.wheel(100.0);
        controls.update(&mut camera);
        assert!((camera.position.length() - 5.0).abs() < 1e-4);
    }

    #[test]
    fn zoom_can_be_disabled() {
        let mut config = ControlsConfig::default();
        config.enable_zoom = false;
        let mut controls = OrbitControls::new(&config);
        let mut camera = camera();
        controls.wheel(-100.0);
        assert!(!controls.update(&mut camera));
    }

    #[test]
    fn pan_moves_target_and_camera_together() {
        let mut config = ControlsConfig::default();
        config.enable_damping = false;
        let mut controls = OrbitControls::new(&config);
        let mut camera = camera();
        let viewport = Viewport::new(800, 800);
        controls.pointer_down(PointerButton::Secondary, Vec2::new(400.0, 400.0));
        controls.pointer_move(Vec2::new(300.0, 400.0), viewport, &camera);
        controls.update(&mut camera);
        assert!(controls.target.x > 0.0);
        assert!((camera.position.x - controls.target.x).abs() < 1e-4);
        assert!((camera.position.z - 5.0).abs() < 1e-4);
    }
}
