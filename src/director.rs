//! The scene director owns the effect: it builds the scene, turns finished
//! asset loads into objects and tweens, routes host input and draws frames.

use std::sync::Arc;

use glam::{Mat4, Vec2, Vec3};

use crate::assets::{AssetEvent, AssetInbox, AssetStatus};
use crate::background::GradientBackground;
use crate::camera::PerspectiveCamera;
use crate::config::{Axis, DirectorConfig, TweenConfig};
use crate::controls::{OrbitControls, PointerButton};
use crate::error::{AssetError, DirectorError, RenderError};
use crate::font::Typeface;
use crate::light::{AmbientLight, PointerTracking, SpotLight};
use crate::model::LoadedModel;
use crate::render::RenderSurface;
use crate::scene::{MeshPart, Scene, SceneObject, StandardMaterial, Transform};
use crate::text::{build_text_mesh, TextGeometryOptions};
use crate::tween::{ElementBounds, ScrollState, ScrollTrigger, ScrubbedTween};
use crate::viewport::Viewport;

pub const TEXT_OBJECT: &str = "text";
pub const CHARACTER_OBJECT: &str = "character";

/// A tween bound to one position component of a scene object.
#[derive(Debug, Clone)]
struct ObjectTween {
    object: &'static str,
    axis: Axis,
    tween: ScrubbedTween,
}

pub struct SceneDirector<S: RenderSurface> {
    config: DirectorConfig,
    surface: S,
    viewport: Viewport,
    scene: Scene,
    camera: PerspectiveCamera,
    controls: OrbitControls,
    pointer: PointerTracking,
    inbox: AssetInbox,
    font_status: AssetStatus,
    model_status: AssetStatus,
    text_tween: ScrubbedTween,
    model_tween: ScrubbedTween,
    tweens: Vec<ObjectTween>,
    container: ElementBounds,
    /// The container follows the configured page layout until the host
    /// reports real bounds.
    container_from_page: bool,
    scroll_y: f32,
}

impl<S: RenderSurface> SceneDirector<S> {
    pub fn new(
        config: DirectorConfig,
        mut surface: S,
        viewport: Viewport,
    ) -> Result<Self, DirectorError> {
        config.validate()?;
        if viewport.is_empty() {
            return Err(DirectorError::Host("viewport has zero area".into()));
        }
        if surface.size() != viewport {
            surface.set_size(viewport);
        }

        let scene = Scene::new(
            GradientBackground::from_config(&config.background),
            AmbientLight::from_config(&config.ambient),
            SpotLight::from_config(&config.spotlight),
        );
        let mut camera = PerspectiveCamera::from_config(&config.camera, viewport.aspect());
        camera.look_at(Vec3::ZERO);

        let director = Self {
            controls: OrbitControls::new(&config.controls),
            pointer: PointerTracking::from_config(&config.spotlight),
            text_tween: build_tween(&config.text.tween)?,
            model_tween: build_tween(&config.model.tween)?,
            container: page_container(&config, viewport),
            container_from_page: true,
            scroll_y: 0.0,
            inbox: AssetInbox::new(),
            font_status: AssetStatus::Pending,
            model_status: AssetStatus::Pending,
            tweens: Vec::new(),
            config,
            surface,
            viewport,
            scene,
            camera,
        };
        log::info!(
            "scene ready at {}x{}; waiting for font and model",
            viewport.width,
            viewport.height
        );
        Ok(director)
    }

    pub fn config(&self) -> &DirectorConfig {
        &self.config
    }

    /// Handle that asset loaders post their results into.
    pub fn inbox(&self) -> AssetInbox {
        self.inbox.clone()
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn camera(&self) -> &PerspectiveCamera {
        &self.camera
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn font_status(&self) -> &AssetStatus {
        &self.font_status
    }

    pub fn model_status(&self) -> &AssetStatus {
        &self.model_status
    }

    pub fn scroll_y(&self) -> f32 {
        self.scroll_y
    }

    /// Moves the spotlight under the pointer and feeds orbit drags.
    pub fn on_pointer_move(&mut self, position: Vec2) {
        let ndc = self.viewport.normalize(position);
        self.scene.spotlight.position = self.pointer.spotlight_position(ndc);
        self.controls
            .pointer_move(position, self.viewport, &self.camera);
    }

    pub fn on_pointer_down(&mut self, button: PointerButton, position: Vec2) {
        self.controls.pointer_down(button, position);
    }

    pub fn on_pointer_up(&mut self) {
        self.controls.pointer_up();
    }

    pub fn on_wheel(&mut self, delta_y: f32) {
        self.controls.wheel(delta_y);
    }

    pub fn on_resize(&mut self, viewport: Viewport) {
        if viewport.is_empty() {
            log::debug!("ignoring zero-area resize");
            return;
        }
        self.viewport = viewport;
        self.camera.aspect = viewport.aspect();
        self.camera.update_projection_matrix();
        self.surface.set_size(viewport);
        if self.container_from_page {
            self.container = page_container(&self.config, viewport);
        }
        self.refresh_tweens();
    }

    pub fn on_scroll(&mut self, scroll_y: f32) {
        self.scroll_y = scroll_y;
        self.refresh_tweens();
    }

    /// Document bounds of the element the scroll triggers watch.
    pub fn set_container(&mut self, bounds: ElementBounds) {
        self.container = bounds;
        self.container_from_page = false;
        self.refresh_tweens();
    }

    pub fn container(&self) -> ElementBounds {
        self.container
    }

    pub fn receive_font(&mut self, result: Result<Typeface, AssetError>) {
        let text = &self.config.text;
        let mesh = result.and_then(|font| {
            build_text_mesh(&font, &text.content, &TextGeometryOptions::from_config(text))
        });
        let mesh = match mesh {
            Ok(mesh) => mesh,
            Err(err) => {
                log::warn!("font from {} not usable: {err}", text.font_url);
                self.font_status = AssetStatus::Failed(err.to_string());
                return;
            }
        };

        let mut object = SceneObject::new(
            TEXT_OBJECT,
            vec![MeshPart {
                mesh: Arc::new(mesh),
                material: StandardMaterial::new(text.color, text.metalness, text.roughness),
                local: Mat4::IDENTITY,
            }],
        );
        object.transform.position = text.position;
        object.cast_shadow = text.cast_shadow;
        object.receive_shadow = text.receive_shadow;
        log::info!(
            "text {:?} added ({} triangles)",
            text.content,
            object.triangle_count()
        );

        let tween = ObjectTween {
            object: TEXT_OBJECT,
            axis: text.tween.axis,
            tween: self.text_tween.clone(),
        };
        self.scene.add(object);
        self.register(tween);
        self.font_status = AssetStatus::Loaded;
    }

    pub fn receive_model(&mut self, result: Result<LoadedModel, AssetError>) {
        let config = &self.config.model;
        let model = match result {
            Ok(model) => model,
            Err(err) => {
                log::warn!("model from {} not usable: {err}", config.url);
                self.model_status = AssetStatus::Failed(err.to_string());
                return;
            }
        };

        log::info!(
            "model {:?} added ({} parts, {} triangles)",
            model.name,
            model.parts.len(),
            model.triangle_count()
        );
        let mut object = SceneObject::new(CHARACTER_OBJECT, model.parts);
        object.transform = Transform {
            position: config.position,
            scale: Vec3::splat(config.scale),
            ..Transform::default()
        };
        object.cast_shadow = config.cast_shadow;
        object.receive_shadow = config.receive_shadow;

        let tween = ObjectTween {
            object: CHARACTER_OBJECT,
            axis: config.tween.axis,
            tween: self.model_tween.clone(),
        };
        self.scene.add(object);
        self.register(tween);
        self.model_status = AssetStatus::Loaded;
    }

    /// Drains finished loads, advances tweens and controls, then draws.
    pub fn frame(&mut self, dt: f32) -> Result<(), RenderError> {
        for event in self.inbox.drain() {
            match event {
                AssetEvent::Font(result) => self.receive_font(result),
                AssetEvent::Model(result) => self.receive_model(result),
            }
        }

        for entry in &mut self.tweens {
            entry.tween.tick(dt);
        }
        self.apply_tweens();
        self.controls.update(&mut self.camera);

        self.surface.render(&self.scene, &self.camera)
    }

    /// Adds a tween and shows its current value right away.
    fn register(&mut self, mut entry: ObjectTween) {
        entry.tween.scroll_to(self.container, self.scroll_state());
        self.tweens.retain(|existing| existing.object != entry.object);
        self.tweens.push(entry);
        self.apply_tweens();
    }

    fn scroll_state(&self) -> ScrollState {
        ScrollState {
            scroll_y: self.scroll_y,
            viewport_height: self.viewport.height as f32,
        }
    }

    fn refresh_tweens(&mut self) {
        let scroll = self.scroll_state();
        for entry in &mut self.tweens {
            entry.tween.scroll_to(self.container, scroll);
        }
        self.apply_tweens();
    }

    fn apply_tweens(&mut self) {
        for entry in &self.tweens {
            let value = entry.tween.value();
            self.scene.update(entry.object, |object| {
                entry.axis.set(&mut object.transform.position, value)
            });
        }
    }
}

fn build_tween(config: &TweenConfig) -> Result<ScrubbedTween, DirectorError> {
    let trigger = ScrollTrigger::new(config.start.parse()?, config.end.parse()?);
    Ok(ScrubbedTween::new(
        config.from,
        config.to,
        config.ease.parse()?,
        trigger,
        config.scrub,
    ))
}

fn page_container(config: &DirectorConfig, viewport: Viewport) -> ElementBounds {
    let height = viewport.height as f32;
    ElementBounds {
        top: config.page.container_offset * height,
        height: config.page.container_height * height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::tests::TEST_FONT;
    use crate::model::tests::TRIANGLE_GLTF;
    use crate::render::HeadlessSurface;

    fn director() -> SceneDirector<HeadlessSurface> {
        let viewport = Viewport::new(800, 600);
        let mut config = DirectorConfig::default();
        config.text.content = "OI".into();
        SceneDirector::new(config, HeadlessSurface::new(viewport), viewport).unwrap()
    }

    fn font() -> Typeface {
        Typeface::from_json(TEST_FONT).unwrap()
    }

    fn model() -> LoadedModel {
        LoadedModel::from_slice(TRIANGLE_GLTF.as_bytes()).unwrap()
    }

    #[test]
    fn resize_updates_camera_and_surface() {
        let mut director = director();
        director.on_resize(Viewport::new(1920, 1080));
        assert!((director.camera().aspect - 1920.0 / 1080.0).abs() < 1e-6);
        assert_eq!(director.surface().size(), Viewport::new(1920, 1080));

        director.on_resize(Viewport::new(0, 1080));
        assert_eq!(director.viewport(), Viewport::new(1920, 1080));
        assert_eq!(director.surface().size(), Viewport::new(1920, 1080));
    }

    #[test]
    fn pointer_drives_the_spotlight() {
        let mut director = director();
        director.on_pointer_move(Vec2::new(400.0, 300.0));
        assert_eq!(director.scene().spotlight.position, Vec3::new(0.0, 0.0, 5.0));
        director.on_pointer_move(Vec2::ZERO);
        assert_eq!(
            director.scene().spotlight.position,
            Vec3::new(-10.0, 10.0, 5.0)
        );
    }

    #[test]
    fn text_descends_as_the_page_scrolls() {
        let mut director = director();
        director.receive_font(Ok(font()));
        assert_eq!(director.font_status(), &AssetStatus::Loaded);
        let y = |d: &SceneDirector<HeadlessSurface>| {
            d.scene().get(TEXT_OBJECT).unwrap().transform.position.y
        };
        assert_eq!(y(&director), 5.0);
        assert_eq!(
            director.scene().get(TEXT_OBJECT).unwrap().transform.position.x,
            -2.5
        );

        // container top at 600, trigger range 0..300
        let mut last = y(&director);
        for step in 0..=40 {
            director.on_scroll(step as f32 * 10.0);
            let current = y(&director);
            assert!(current <= last + 1e-6);
            last = current;
        }
        assert_eq!(last, 0.0);
    }

    #[test]
    fn character_slides_in_as_the_page_scrolls() {
        let mut director = director();
        director.receive_model(Ok(model()));
        let x = |d: &SceneDirector<HeadlessSurface>| {
            d.scene().get(CHARACTER_OBJECT).unwrap().transform.position.x
        };
        assert_eq!(x(&director), 10.0);
        let object = director.scene().get(CHARACTER_OBJECT).unwrap();
        assert_eq!(object.transform.scale, Vec3::splat(0.5));
        assert!(object.cast_shadow);

        let mut last = x(&director);
        for step in 0..=40 {
            director.on_scroll(step as f32 * 10.0);
            let current = x(&director);
            assert!(current <= last + 1e-6);
            last = current;
        }
        assert_eq!(last, 3.0);
    }

    #[test]
    fn late_assets_start_from_the_current_scroll() {
        let mut director = director();
        director.on_scroll(300.0);
        director.receive_font(Ok(font()));
        let text = director.scene().get(TEXT_OBJECT).unwrap();
        assert_eq!(text.transform.position.y, 0.0);
    }

    #[test]
    fn frames_render_while_assets_are_pending() {
        let mut director = director();
        for _ in 0..3 {
            director.frame(1.0 / 60.0).unwrap();
        }
        assert_eq!(director.surface().frames(), 3);
        assert_eq!(director.surface().last_frame().objects, 0);
        assert_eq!(director.font_status(), &AssetStatus::Pending);
    }

    #[test]
    fn failed_assets_add_nothing() {
        let mut director = director();
        let inbox = director.inbox();
        inbox.push(AssetEvent::Model(Err(AssetError::Model("empty".into()))));
        inbox.push(AssetEvent::Font(Err(AssetError::Font("broken".into()))));
        director.frame(0.016).unwrap();

        assert!(director.model_status().is_failed());
        assert!(director.font_status().is_failed());
        assert!(director.scene().objects().is_empty());
        director.on_scroll(1000.0);
        assert!(director.scene().objects().is_empty());
    }

    #[test]
    fn inbox_completions_arrive_on_the_next_frame() {
        let mut director = director();
        let inbox = director.inbox();
        inbox.push(AssetEvent::Model(Ok(model())));
        inbox.push(AssetEvent::Font(Ok(font())));
        assert!(director.scene().objects().is_empty());
        director.frame(0.016).unwrap();
        assert!(director.scene().contains(TEXT_OBJECT));
        assert!(director.scene().contains(CHARACTER_OBJECT));
        assert_eq!(director.surface().last_frame().objects, 2);
    }

    #[test]
    fn host_container_replaces_page_layout() {
        let mut director = director();
        director.receive_font(Ok(font()));
        director.set_container(ElementBounds {
            top: 2000.0,
            height: 500.0,
        });
        director.on_scroll(300.0);
        let y = director.scene().get(TEXT_OBJECT).unwrap().transform.position.y;
        assert_eq!(y, 5.0);
        director.on_resize(Viewport::new(800, 400));
        assert_eq!(director.container().top, 2000.0);
    }
}
