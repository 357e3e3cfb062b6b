//! Fonts in the three.js typeface JSON format.
//!
//! Each glyph carries its advance (`ha`) and an outline string made of
//! `m x y`, `l x y`, `q x y cpx cpy` and `b x y cp1x cp1y cp2x cp2y`
//! commands in font units.

use std::collections::HashMap;

use glam::Vec2;
use serde::Deserialize;

use crate::error::AssetError;
use crate::shape::{shapes_from_contours, Path, PathBuilder, Shape};

const FALLBACK_GLYPH: char = '?';

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Typeface {
    #[serde(default)]
    pub family_name: String,
    pub resolution: f32,
    pub bounding_box: BoundingBox,
    #[serde(default)]
    pub underline_thickness: f32,
    pub glyphs: HashMap<String, Glyph>,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundingBox {
    #[serde(default)]
    pub x_min: f32,
    #[serde(default)]
    pub x_max: f32,
    pub y_min: f32,
    pub y_max: f32,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Glyph {
    /// Horizontal advance in font units.
    pub ha: f32,
    /// Outline commands; absent for blank glyphs such as space.
    #[serde(default)]
    pub o: Option<String>,
}

impl Typeface {
    pub fn from_json(json: &str) -> Result<Self, AssetError> {
        Self::validated(serde_json::from_str(json)?)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, AssetError> {
        Self::validated(serde_json::from_slice(bytes)?)
    }

    fn validated(face: Self) -> Result<Self, AssetError> {
        if !(face.resolution > 0.0) {
            return Err(AssetError::Font(format!(
                "resolution must be positive, got {}",
                face.resolution
            )));
        }
        if face.glyphs.is_empty() {
            return Err(AssetError::Font("font has no glyphs".into()));
        }
        Ok(face)
    }

    pub fn glyph(&self, ch: char) -> Option<&Glyph> {
        let mut buf = [0u8; 4];
        self.glyphs.get(&*ch.encode_utf8(&mut buf))
    }

    /// Distance between baselines for text of the given size.
    pub fn line_height(&self, size: f32) -> f32 {
        let bbox = self.bounding_box;
        (bbox.y_max - bbox.y_min + self.underline_thickness) * size / self.resolution
    }

    /// Lays out `text` and returns the outline paths of every glyph, one
    /// entry per rendered character.
    ///
    /// Characters without a glyph use the `?` glyph; when the font lacks that
    /// too the character is skipped.
    pub fn glyph_paths(&self, text: &str, size: f32) -> Result<Vec<Vec<Path>>, AssetError> {
        let scale = size / self.resolution;
        let line_height = self.line_height(size);
        let mut offset = Vec2::ZERO;
        let mut glyphs = Vec::new();

        for ch in text.chars() {
            if ch == '\n' {
                offset.x = 0.0;
                offset.y -= line_height;
                continue;
            }
            let Some(glyph) = self.glyph(ch).or_else(|| self.glyph(FALLBACK_GLYPH)) else {
                log::warn!(
                    "character {ch:?} does not exist in font family {:?}",
                    self.family_name
                );
                continue;
            };
            let paths = match &glyph.o {
                Some(outline) => parse_outline(outline, scale, offset)
                    .map_err(|err| AssetError::Font(format!("glyph {ch:?}: {err}")))?,
                None => Vec::new(),
            };
            glyphs.push(paths);
            offset.x += glyph.ha * scale;
        }
        Ok(glyphs)
    }

    /// Outlines of `text` as fillable shapes, curves sampled with
    /// `curve_segments` divisions.
    pub fn generate_shapes(
        &self,
        text: &str,
        size: f32,
        curve_segments: u32,
    ) -> Result<Vec<Shape>, AssetError> {
        let mut shapes = Vec::new();
        for paths in self.glyph_paths(text, size)? {
            let contours = paths
                .iter()
                .map(|path| path.points(curve_segments))
                .collect();
            shapes.extend(shapes_from_contours(contours));
        }
        Ok(shapes)
    }
}

fn parse_outline(outline: &str, scale: f32, offset: Vec2) -> Result<Vec<Path>, String> {
    let mut tokens = outline.split_whitespace();
    let mut builder = PathBuilder::new();

    let mut point = |tokens: &mut std::str::SplitWhitespace<'_>| -> Result<Vec2, String> {
        let mut coord = || -> Result<f32, String> {
            let token = tokens.next().ok_or("outline ends inside a command")?;
            token
                .parse::<f32>()
                .map_err(|err| format!("bad coordinate {token:?}: {err}"))
        };
        let x = coord()?;
        let y = coord()?;
        Ok(Vec2::new(x, y) * scale + offset)
    };

    while let Some(command) = tokens.next() {
        match command {
            "m" => builder.move_to(point(&mut tokens)?),
            "l" => builder.line_to(point(&mut tokens)?),
            "q" => {
                let to = point(&mut tokens)?;
                let control = point(&mut tokens)?;
                builder.quadratic_to(control, to);
            }
            "b" => {
                let to = point(&mut tokens)?;
                let control1 = point(&mut tokens)?;
                let control2 = point(&mut tokens)?;
                builder.cubic_to(control1, control2, to);
            }
            "z" => {}
            other => return Err(format!("unknown outline command {other:?}")),
        }
    }
    Ok(builder.finish())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// A 100-unit font with a square "O" (with counter), a bar "I", a space
    /// and a "?".
    pub(crate) const TEST_FONT: &str = r#"{
        "familyName": "Test Sans",
        "resolution": 100,
        "underlineThickness": 10,
        "boundingBox": { "xMin": 0, "xMax": 100, "yMin": -20, "yMax": 90 },
        "glyphs": {
            "O": { "ha": 100, "o": "m 0 0 l 0 80 l 80 80 l 80 0 l 0 0 m 20 20 l 60 20 l 60 60 l 20 60 l 20 20 " },
            "I": { "ha": 40, "o": "m 0 0 l 0 80 l 20 80 l 20 0 l 0 0 " },
            "?": { "ha": 60, "o": "m 0 0 l 0 20 l 20 20 l 20 0 l 0 0 " },
            " ": { "ha": 30 }
        }
    }"#;

    fn font() -> Typeface {
        Typeface::from_json(TEST_FONT).unwrap()
    }

    #[test]
    fn parses_metrics_and_glyphs() {
        let face = font();
        assert_eq!(face.family_name, "Test Sans");
        assert_eq!(face.glyphs.len(), 4);
        assert!(face.glyph(' ').unwrap().o.is_none());
        // (90 - -20 + 10) * 1 / 100
        assert!((face.line_height(1.0) - 1.2).abs() < 1e-6);
    }

    #[test]
    fn counters_become_holes() {
        let shapes = font().generate_shapes("O", 1.0, 12).unwrap();
        assert_eq!(shapes.len(), 1);
        assert_eq!(shapes[0].holes.len(), 1);
    }

    #[test]
    fn glyphs_advance_and_wrap_lines() {
        let face = font();
        let glyphs = face.glyph_paths("I I\nI", 1.0).unwrap();
        assert_eq!(glyphs.len(), 4);
        assert_eq!(glyphs[0][0].start, Vec2::new(0.0, 0.0));
        assert!(glyphs[1].is_empty());
        // 0.4 for "I" plus 0.3 for the space
        assert!((glyphs[2][0].start.x - 0.7).abs() < 1e-6);
        assert!((glyphs[3][0].start - Vec2::new(0.0, -1.2)).length() < 1e-6);
    }

    #[test]
    fn quadratic_endpoint_comes_first() {
        let paths = parse_outline("m 0 0 q 10 0 5 5", 1.0, Vec2::ZERO).unwrap();
        assert_eq!(
            paths[0].segments[0],
            crate::shape::Segment::Quadratic {
                control: Vec2::new(5.0, 5.0),
                to: Vec2::new(10.0, 0.0)
            }
        );
    }

    #[test]
    fn missing_characters_use_the_fallback_glyph() {
        let glyphs = font().glyph_paths("I#", 1.0).unwrap();
        assert_eq!(glyphs.len(), 2);
        // the "?" glyph starts right after the "I"
        assert!((glyphs[1][0].start.x - 0.4).abs() < 1e-6);
    }

    #[test]
    fn characters_are_skipped_without_fallback() {
        let mut face = font();
        face.glyphs.remove("?");
        let glyphs = face.glyph_paths("#I", 1.0).unwrap();
        assert_eq!(glyphs.len(), 1);
        assert_eq!(glyphs[0][0].start.x, 0.0);
    }

    #[test]
    fn rejects_broken_fonts() {
        assert!(matches!(
            Typeface::from_json("{"),
            Err(AssetError::Json(_))
        ));
        let zero = TEST_FONT.replace("\"resolution\": 100", "\"resolution\": 0");
        assert!(matches!(
            Typeface::from_json(&zero),
            Err(AssetError::Font(_))
        ));
        let face = font();
        let err = parse_outline("m 0", 1.0, Vec2::ZERO).unwrap_err();
        assert!(err.contains("ends inside"));
        assert!(face.generate_shapes("O", 1.0, 4).is_ok());
    }
}
