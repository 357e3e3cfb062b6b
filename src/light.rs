use glam::{Mat4, Vec2, Vec3};

use crate::config::{AmbientConfig, SpotlightConfig};

/// Uniform fill light.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AmbientLight {
    /// Linear RGB.
    pub color: Vec3,
    pub intensity: f32,
}

impl AmbientLight {
    pub fn from_config(config: &AmbientConfig) -> Self {
        Self {
            color: config.color.to_linear(),
            intensity: config.intensity,
        }
    }
}

/// Cone light aimed at `target`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpotLight {
    pub position: Vec3,
    pub target: Vec3,
    /// Linear RGB.
    pub color: Vec3,
    pub intensity: f32,
    /// Cone half-angle in radians.
    pub angle: f32,
    /// Fraction of the cone that fades out, 0 for a hard edge.
    pub penumbra: f32,
    pub decay: f32,
    /// Range cut-off; 0 disables the cut-off.
    pub distance: f32,
    pub cast_shadow: bool,
    pub shadow_map_size: u32,
}

impl SpotLight {
    pub fn from_config(config: &SpotlightConfig) -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, config.depth),
            target: Vec3::ZERO,
            color: config.color.to_linear(),
            intensity: config.intensity,
            angle: config.angle,
            penumbra: config.penumbra,
            decay: config.decay,
            distance: config.distance,
            cast_shadow: config.cast_shadow,
            shadow_map_size: config.shadow_map_size.max(1),
        }
    }

    pub fn direction(&self) -> Vec3 {
        (self.target - self.position).normalize_or(Vec3::NEG_Z)
    }

    /// Cosines of the outer cone and of the fully lit inner cone.
    pub fn cone_cosines(&self) -> (f32, f32) {
        let outer = self.angle.cos();
        let inner = (self.angle * (1.0 - self.penumbra)).cos();
        (outer, inner)
    }

    /// View-projection of the shadow camera: a square frustum covering the cone.
    pub fn shadow_view_projection(&self) -> Mat4 {
        let far = if self.distance > 0.0 { self.distance } else { 500.0 };
        let direction = self.direction();
        let up = if direction.cross(Vec3::Y).length_squared() < 1e-6 {
            Vec3::Z
        } else {
            Vec3::Y
        };
        let view = Mat4::look_to_rh(self.position, direction, up);
        let projection = Mat4::perspective_rh(self.angle * 2.0, 1.0, 0.5, far);
        projection * view
    }
}

/// Maps normalized pointer coordinates onto the spotlight position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerTracking {
    pub scale: f32,
    pub depth: f32,
}

impl PointerTracking {
    pub fn from_config(config: &SpotlightConfig) -> Self {
        Self {
            scale: config.pointer_scale,
            depth: config.depth,
        }
    }

    pub fn spotlight_position(&self, ndc: Vec2) -> Vec3 {
        Vec3::new(ndc.x * self.scale, ndc.y * self.scale, self.depth)
    }
}
