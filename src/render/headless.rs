use super::{FrameStats, RenderSurface};
use crate::camera::PerspectiveCamera;
use crate::error::RenderError;
use crate::scene::Scene;
use crate::viewport::Viewport;

/// Offscreen surface that does not touch the GPU. It keeps the bookkeeping
/// of a real surface so headless runs exercise the same frame path.
#[derive(Debug, Clone)]
pub struct HeadlessSurface {
    size: Viewport,
    frames: u64,
    last_frame: FrameStats,
}

impl HeadlessSurface {
    pub fn new(size: Viewport) -> Self {
        Self {
            size: Viewport::new(size.width.max(1), size.height.max(1)),
            frames: 0,
            last_frame: FrameStats::default(),
        }
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn last_frame(&self) -> FrameStats {
        self.last_frame
    }
}

impl RenderSurface for HeadlessSurface {
    fn size(&self) -> Viewport {
        self.size
    }

    fn set_size(&mut self, size: Viewport) {
        if size.is_empty() {
            return;
        }
        self.size = size;
    }

    fn render(&mut self, scene: &Scene, camera: &PerspectiveCamera) -> Result<(), RenderError> {
        if !camera.view_projection().is_finite() {
            return Err(RenderError::Surface("camera matrix is not finite".into()));
        }
        self.last_frame = FrameStats::of(scene);
        self.frames += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_area_resize_is_ignored() {
        let mut surface = HeadlessSurface::new(Viewport::new(800, 600));
        surface.set_size(Viewport::new(0, 600));
        assert_eq!(surface.size(), Viewport::new(800, 600));
        surface.set_size(Viewport::new(1024, 768));
        assert_eq!(surface.size(), Viewport::new(1024, 768));
    }
}
