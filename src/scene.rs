use std::sync::Arc;

use glam::{Mat4, Quat, Vec3};

use crate::background::GradientBackground;
use crate::config::HexColor;
use crate::geometry::MeshData;
use crate::light::{AmbientLight, SpotLight};

/// Physically based surface description (metallic-roughness model).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StandardMaterial {
    /// Linear RGB.
    pub color: Vec3,
    pub metalness: f32,
    pub roughness: f32,
}

impl Default for StandardMaterial {
    fn default() -> Self {
        Self {
            color: Vec3::ONE,
            metalness: 0.0,
            roughness: 1.0,
        }
    }
}

impl StandardMaterial {
    pub fn new(color: HexColor, metalness: f32, roughness: f32) -> Self {
        Self {
            color: color.to_linear(),
            metalness: metalness.clamp(0.0, 1.0),
            roughness: roughness.clamp(0.0, 1.0),
        }
    }
}

/// A mesh drawn with one material, placed relative to its object.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshPart {
    pub mesh: Arc<MeshData>,
    pub material: StandardMaterial,
    pub local: Mat4,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SceneObject {
    pub name: String,
    pub transform: Transform,
    pub parts: Vec<MeshPart>,
    pub cast_shadow: bool,
    pub receive_shadow: bool,
}

impl SceneObject {
    pub fn new(name: impl Into<String>, parts: Vec<MeshPart>) -> Self {
        Self {
            name: name.into(),
            parts,
            ..Self::default()
        }
    }

    pub fn triangle_count(&self) -> usize {
        self.parts.iter().map(|part| part.mesh.triangle_count()).sum()
    }
}

/// Everything the renderer draws in one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    pub background: GradientBackground,
    pub ambient: AmbientLight,
    pub spotlight: SpotLight,
    objects: Vec<SceneObject>,
}

impl Scene {
    pub fn new(background: GradientBackground, ambient: AmbientLight, spotlight: SpotLight) -> Self {
        Self {
            background,
            ambient,
            spotlight,
            objects: Vec::new(),
        }
    }

    /// Adds an object, replacing any object with the same name.
    pub fn add(&mut self, object: SceneObject) {
        match self.objects.iter_mut().find(|o| o.name == object.name) {
            Some(existing) => *existing = object,
            None => self.objects.push(object),
        }
    }

    pub fn objects(&self) -> &[SceneObject] {
        &self.objects
    }

    pub fn get(&self, name: &str) -> Option<&SceneObject> {
        self.objects.iter().find(|object| object.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Applies a mutation to the named object.
    pub fn update<F, R>(&mut self, name: &str, updater: F) -> Option<R>
    where
        F: FnOnce(&mut SceneObject) -> R,
    {
        let object = self.objects.iter_mut().find(|object| object.name == name)?;
        Some(updater(object))
    }

    pub fn set_position(&mut self, name: &str, position: Vec3) -> bool {
        self.update(name, |obj| obj.transform.position = position)
            .is_some()
    }

    pub fn triangle_count(&self) -> usize {
        self.objects.iter().map(SceneObject::triangle_count).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AmbientConfig, BackgroundConfig, SpotlightConfig};

    fn empty_scene() -> Scene {
        Scene::new(
            GradientBackground::from_config(&BackgroundConfig::default()),
            AmbientLight::from_config(&AmbientConfig::default()),
            SpotLight::from_config(&SpotlightConfig::default()),
        )
    }

    fn triangle() -> MeshPart {
        MeshPart {
            mesh: Arc::new(MeshData::new(
                vec![
                    0.0, 0.0, 0.0, 0.0, 0.0, 1.0, //
                    1.0, 0.0, 0.0, 0.0, 0.0, 1.0, //
                    0.0, 1.0, 0.0, 0.0, 0.0, 1.0,
                ],
                vec![0, 1, 2],
            )),
            material: StandardMaterial::default(),
            local: Mat4::IDENTITY,
        }
    }

    #[test]
    fn add_replaces_objects_with_the_same_name() {
        let mut scene = empty_scene();
        scene.add(SceneObject::new("text", vec![triangle()]));
        scene.add(SceneObject::new("text", vec![triangle(), triangle()]));
        assert_eq!(scene.objects().len(), 1);
        assert_eq!(scene.triangle_count(), 2);
    }

    #[test]
    fn set_position_reports_missing_objects() {
        let mut scene = empty_scene();
        assert!(!scene.set_position("character", Vec3::X));
        scene.add(SceneObject::new("character", Vec::new()));
        assert!(scene.set_position("character", Vec3::X));
        assert_eq!(scene.get("character").unwrap().transform.position, Vec3::X);
    }

    #[test]
    fn transform_applies_scale_before_translation() {
        let transform = Transform {
            position: Vec3::new(3.0, 0.0, 0.0),
            scale: Vec3::splat(0.5),
            ..Transform::default()
        };
        let p = transform.matrix().transform_point3(Vec3::new(2.0, 2.0, 0.0));
        assert_eq!(p, Vec3::new(4.0, 1.0, 0.0));
    }

    #[test]
    fn material_factors_are_clamped() {
        let material = StandardMaterial::new(HexColor::WHITE, 1.5, -1.0);
        assert_eq!(material.metalness, 1.0);
        assert_eq!(material.roughness, 0.0);
    }
}
