use glam::Vec2;

/// Size of the area the scene is presented in, in logical pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn aspect(&self) -> f32 {
        if self.height == 0 {
            1.0
        } else {
            self.width as f32 / self.height as f32
        }
    }

    /// Converts a pointer position (origin top-left, y down) into normalized
    /// device coordinates in `[-1, 1]` with y up.
    pub fn normalize(&self, pointer: Vec2) -> Vec2 {
        let width = self.width.max(1) as f32;
        let height = self.height.max(1) as f32;
        Vec2::new(
            pointer.x / width * 2.0 - 1.0,
            -(pointer.y / height) * 2.0 + 1.0,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn center_maps_to_origin() {
        let viewport = Viewport::new(1280, 720);
        assert_eq!(viewport.normalize(Vec2::new(640.0, 360.0)), Vec2::ZERO);
    }

    #[test]
    fn corners_map_to_unit_square() {
        let viewport = Viewport::new(800, 600);
        assert_eq!(viewport.normalize(Vec2::ZERO), Vec2::new(-1.0, 1.0));
        assert_eq!(
            viewport.normalize(Vec2::new(800.0, 600.0)),
            Vec2::new(1.0, -1.0)
        );
    }

    #[test]
    fn aspect_of_zero_height_is_one() {
        assert_eq!(Viewport::new(100, 0).aspect(), 1.0);
        assert_eq!(Viewport::new(200, 100).aspect(), 2.0);
    }
}
