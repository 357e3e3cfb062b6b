//! Extruded text meshes.

use crate::config::TextConfig;
use crate::error::AssetError;
use crate::font::Typeface;
use crate::geometry::{extrude, ExtrudeOptions, MeshData};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextGeometryOptions {
    pub size: f32,
    pub extrude: ExtrudeOptions,
}

impl TextGeometryOptions {
    pub fn from_config(config: &TextConfig) -> Self {
        Self {
            size: config.size,
            extrude: ExtrudeOptions {
                depth: config.depth,
                steps: 1,
                curve_segments: config.curve_segments,
                bevel_enabled: config.bevel.enabled,
                bevel_thickness: config.bevel.thickness,
                bevel_size: config.bevel.size,
                bevel_offset: config.bevel.offset,
                bevel_segments: config.bevel.segments,
            },
        }
    }
}

/// Builds the solid mesh of `text` set in `font`.
///
/// The first glyph's origin sits at the local origin, the baseline on y = 0
/// and the front face at `z = -bevel_thickness`.
pub fn build_text_mesh(
    font: &Typeface,
    text: &str,
    options: &TextGeometryOptions,
) -> Result<MeshData, AssetError> {
    let shapes = font.generate_shapes(text, options.size, options.extrude.curve_segments)?;
    let mesh = extrude(&shapes, &options.extrude);
    log::debug!(
        "text {text:?}: {} shapes, {} triangles",
        shapes.len(),
        mesh.triangle_count()
    );
    Ok(mesh)
}
