//! Render surfaces: the wgpu renderer used by the hosts and a GPU-less
//! surface for headless runs.

mod gpu;
mod headless;
mod shaders;

pub use gpu::GpuRenderer;
pub use headless::HeadlessSurface;

use crate::camera::PerspectiveCamera;
use crate::error::RenderError;
use crate::scene::Scene;
use crate::viewport::Viewport;

/// Something the director can draw a scene into.
pub trait RenderSurface {
    /// Current drawing buffer size in pixels.
    fn size(&self) -> Viewport;

    /// Resizes the drawing buffer. Zero-area sizes are ignored.
    fn set_size(&mut self, size: Viewport);

    /// Draws one frame.
    fn render(&mut self, scene: &Scene, camera: &PerspectiveCamera) -> Result<(), RenderError>;
}

/// What one frame submits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub objects: usize,
    pub draw_calls: usize,
    pub triangles: usize,
    pub shadow_casters: usize,
}

impl FrameStats {
    pub fn of(scene: &Scene) -> Self {
        let mut stats = Self::default();
        for object in scene.objects() {
            stats.objects += 1;
            let drawable = object.parts.iter().filter(|part| !part.mesh.is_empty());
            for part in drawable {
                stats.draw_calls += 1;
                stats.triangles += part.mesh.triangle_count();
            }
            if object.cast_shadow && scene.spotlight.cast_shadow {
                stats.shadow_casters += 1;
            }
        }
        stats
    }
}
