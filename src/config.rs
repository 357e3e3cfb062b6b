//! Tunables of the scene. The defaults reproduce the published effect.
//!
//! Every field can be overridden from a JSON document; missing fields keep
//! their defaults, so `{}` is a valid configuration.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result};
use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::DirectorError;
use crate::tween::{Ease, Scrub, TriggerPosition};

/// Default font: the helvetiker face published with three.js.
pub const DEFAULT_FONT_URL: &str =
    "https://threejs.org/examples/fonts/helvetiker_regular.typeface.json";
/// Placeholder model path; under the default configuration this load fails.
pub const DEFAULT_MODEL_URL: &str = "path/to/your/cartoon_model.glb";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectorConfig {
    pub container_id: String,
    pub background: BackgroundConfig,
    pub camera: CameraConfig,
    pub ambient: AmbientConfig,
    pub spotlight: SpotlightConfig,
    pub text: TextConfig,
    pub model: ModelConfig,
    pub controls: ControlsConfig,
    pub page: PageConfig,
}

impl Default for DirectorConfig {
    fn default() -> Self {
        Self {
            container_id: "three-container".to_string(),
            background: BackgroundConfig::default(),
            camera: CameraConfig::default(),
            ambient: AmbientConfig::default(),
            spotlight: SpotlightConfig::default(),
            text: TextConfig::default(),
            model: ModelConfig::default(),
            controls: ControlsConfig::default(),
            page: PageConfig::default(),
        }
    }
}

impl DirectorConfig {
    /// Parses a configuration document.
    pub fn from_json(json: &str) -> Result<Self, DirectorError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|err| DirectorError::InvalidConfig(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("unable to read {}", path.display()))?;
        Self::from_json(&json).with_context(|| format!("invalid config {}", path.display()))
    }

    /// Rejects values the scene cannot be built from.
    pub fn validate(&self) -> Result<(), DirectorError> {
        let invalid = |msg: String| Err(DirectorError::InvalidConfig(msg));
        if self.container_id.is_empty() {
            return invalid("container_id must not be empty".into());
        }
        if !(self.camera.fov > 0.0 && self.camera.fov < 180.0) {
            return invalid(format!("camera fov {} out of range", self.camera.fov));
        }
        if !(self.camera.near > 0.0 && self.camera.far > self.camera.near) {
            return invalid("camera clip planes must satisfy 0 < near < far".into());
        }
        if !(0.0..=1.0).contains(&self.controls.damping_factor) {
            return invalid("controls.damping_factor must be within [0, 1]".into());
        }
        if self.text.size <= 0.0 || self.text.curve_segments == 0 {
            return invalid("text size and curve_segments must be positive".into());
        }
        for tween in [&self.text.tween, &self.model.tween] {
            tween.start.parse::<TriggerPosition>()?;
            tween.end.parse::<TriggerPosition>()?;
            tween.ease.parse::<Ease>()?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackgroundConfig {
    pub top: HexColor,
    pub bottom: HexColor,
}

impl Default for BackgroundConfig {
    fn default() -> Self {
        Self {
            top: HexColor::new(0x0d, 0x0d, 0x0d),
            bottom: HexColor::new(0x33, 0x33, 0x33),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Vertical field of view in degrees.
    pub fov: f32,
    pub near: f32,
    pub far: f32,
    pub position: Vec3,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov: 75.0,
            near: 0.1,
            far: 1000.0,
            position: Vec3::new(0.0, 0.0, 5.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AmbientConfig {
    pub color: HexColor,
    pub intensity: f32,
}

impl Default for AmbientConfig {
    fn default() -> Self {
        Self {
            color: HexColor::WHITE,
            intensity: 0.2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpotlightConfig {
    pub color: HexColor,
    pub intensity: f32,
    /// Cone half-angle in radians.
    pub angle: f32,
    pub penumbra: f32,
    pub decay: f32,
    pub distance: f32,
    pub cast_shadow: bool,
    pub shadow_map_size: u32,
    /// Fixed z of the spotlight while it follows the pointer.
    pub depth: f32,
    /// World units per unit of normalized pointer coordinate.
    pub pointer_scale: f32,
}

impl Default for SpotlightConfig {
    fn default() -> Self {
        Self {
            color: HexColor::WHITE,
            intensity: 1.5,
            angle: std::f32::consts::FRAC_PI_6,
            penumbra: 0.2,
            decay: 2.0,
            distance: 50.0,
            cast_shadow: true,
            shadow_map_size: 512,
            depth: 5.0,
            pointer_scale: 10.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextConfig {
    pub font_url: String,
    pub content: String,
    pub size: f32,
    pub depth: f32,
    pub curve_segments: u32,
    pub bevel: BevelConfig,
    pub color: HexColor,
    pub metalness: f32,
    pub roughness: f32,
    pub position: Vec3,
    pub cast_shadow: bool,
    pub receive_shadow: bool,
    pub tween: TweenConfig,
}

impl Default for TextConfig {
    fn default() -> Self {
        Self {
            font_url: DEFAULT_FONT_URL.to_string(),
            content: "Pavan".to_string(),
            size: 1.0,
            depth: 0.2,
            curve_segments: 12,
            bevel: BevelConfig::default(),
            color: HexColor::new(0x15, 0x65, 0xc0),
            metalness: 0.8,
            roughness: 0.2,
            position: Vec3::new(-2.5, 0.0, 0.0),
            cast_shadow: true,
            receive_shadow: false,
            tween: TweenConfig {
                axis: Axis::Y,
                from: 5.0,
                to: 0.0,
                ..TweenConfig::default()
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BevelConfig {
    pub enabled: bool,
    pub thickness: f32,
    pub size: f32,
    pub offset: f32,
    pub segments: u32,
}

impl Default for BevelConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            thickness: 0.03,
            size: 0.02,
            offset: 0.0,
            segments: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub url: String,
    pub scale: f32,
    pub position: Vec3,
    pub cast_shadow: bool,
    pub receive_shadow: bool,
    pub tween: TweenConfig,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_MODEL_URL.to_string(),
            scale: 0.5,
            position: Vec3::new(3.0, 0.0, 0.0),
            cast_shadow: true,
            receive_shadow: false,
            tween: TweenConfig {
                axis: Axis::X,
                from: 10.0,
                to: 3.0,
                ..TweenConfig::default()
            },
        }
    }
}

/// Scroll-scrubbed tween of one position component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TweenConfig {
    pub axis: Axis,
    pub from: f32,
    pub to: f32,
    pub start: String,
    pub end: String,
    pub ease: String,
    pub scrub: Scrub,
}

impl Default for TweenConfig {
    fn default() -> Self {
        Self {
            axis: Axis::Y,
            from: 0.0,
            to: 0.0,
            start: "top bottom".to_string(),
            end: "top center".to_string(),
            ease: "power1.out".to_string(),
            scrub: Scrub::Immediate,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub fn get(self, v: Vec3) -> f32 {
        match self {
            Axis::X => v.x,
            Axis::Y => v.y,
            Axis::Z => v.z,
        }
    }

    pub fn set(self, v: &mut Vec3, value: f32) {
        match self {
            Axis::X => v.x = value,
            Axis::Y => v.y = value,
            Axis::Z => v.z = value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlsConfig {
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
}

impl Default for ControlsConfig {
    fn default() -> Self {
        Self {
            enable_damping: true,
            damping_factor: 0.25,
            enable_zoom: true,
            enable_rotate: true,
            enable_pan: true,
            rotate_speed: 1.0,
            zoom_speed: 1.0,
            pan_speed: 1.0,
            min_distance: 0.0,
            max_distance: f32::MAX,
        }
    }
}

/// Layout of the virtual page used when no document is available (desktop).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageConfig {
    /// Document offset of the container, in viewport heights.
    pub container_offset: f32,
    /// Height of the container, in viewport heights.
    pub container_height: f32,
    /// Pixels scrolled per key press.
    pub scroll_step: f32,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            container_offset: 1.0,
            container_height: 1.0,
            scroll_step: 40.0,
        }
    }
}

/// sRGB color written as `#rrggbb` in configuration files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HexColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl HexColor {
    pub const WHITE: Self = Self::new(0xff, 0xff, 0xff);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn to_rgba8(self) -> [u8; 4] {
        [self.r, self.g, self.b, 0xff]
    }

    /// Converts to linear RGB for lighting.
    pub fn to_linear(self) -> Vec3 {
        Vec3::new(
            srgb_to_linear(self.r),
            srgb_to_linear(self.g),
            srgb_to_linear(self.b),
        )
    }
}

fn srgb_to_linear(channel: u8) -> f32 {
    let c = channel as f32 / 255.0;
    if c < 0.04045 {
        c * 0.0773993808
    } else {
        (c * 0.9478672986 + 0.0521327014).powf(2.4)
    }
}

impl FromStr for HexColor {
    type Err = DirectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .strip_prefix('#')
            .or_else(|| s.strip_prefix("0x"))
            .unwrap_or(s);
        if digits.len() != 6 {
            return Err(DirectorError::InvalidConfig(format!(
                "color {s:?} must have six hex digits"
            )));
        }
        let value = u32::from_str_radix(digits, 16)
            .map_err(|err| DirectorError::InvalidConfig(format!("color {s:?}: {err}")))?;
        Ok(Self::new(
            (value >> 16) as u8,
            (value >> 8) as u8,
            value as u8,
        ))
    }
}

impl TryFrom<String> for HexColor {
    type Error = DirectorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<HexColor> for String {
    fn from(color: HexColor) -> Self {
        color.to_string()
    }
}

impl fmt::Display for HexColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config = DirectorConfig::from_json("{}").unwrap();
        assert_eq!(config, DirectorConfig::default());
        assert_eq!(config.container_id, "three-container");
        assert_eq!(config.text.content, "Pavan");
        assert_eq!(config.model.url, DEFAULT_MODEL_URL);
    }

    #[test]
    fn partial_overrides_keep_other_defaults() {
        let json = r##"{ "text": { "content": "Hi", "color": "#ff0000" }, "camera": { "fov": 60 } }"##;
        let config = DirectorConfig::from_json(json).unwrap();
        assert_eq!(config.text.content, "Hi");
        assert_eq!(config.text.color, HexColor::new(0xff, 0, 0));
        assert_eq!(config.text.size, 1.0);
        assert_eq!(config.camera.fov, 60.0);
        assert_eq!(config.camera.far, 1000.0);
    }

    #[test]
    fn rejects_bad_trigger_positions() {
        let json = r#"{ "model": { "tween": { "start": "sideways bottom" } } }"#;
        assert!(matches!(
            DirectorConfig::from_json(json),
            Err(DirectorError::InvalidConfig(_))
        ));
    }

    #[test]
    fn hex_colors_round_trip_through_strings() {
        let color: HexColor = "#1565C0".parse().unwrap();
        assert_eq!(color, HexColor::new(0x15, 0x65, 0xc0));
        assert_eq!(color.to_string(), "#1565c0");
        assert!("#12345".parse::<HexColor>().is_err());
    }

    #[test]
    fn linear_conversion_keeps_extremes() {
        assert_eq!(HexColor::new(0, 0, 0).to_linear(), Vec3::ZERO);
        let white = HexColor::WHITE.to_linear();
        assert!((white - Vec3::ONE).abs().max_element() < 1e-5);
    }
}
