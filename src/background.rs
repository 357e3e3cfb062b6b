use crate::config::{BackgroundConfig, HexColor};

/// Vertical two-stop gradient, rasterized into a 2x2 image that the renderer
/// stretches over the viewport with linear filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GradientBackground {
    pub top: HexColor,
    pub bottom: HexColor,
}

impl GradientBackground {
    pub const WIDTH: u32 = 2;
    pub const HEIGHT: u32 = 2;

    pub fn from_config(config: &BackgroundConfig) -> Self {
        Self {
            top: config.top,
            bottom: config.bottom,
        }
    }

    /// RGBA8 pixels, row-major, first row at the top of the screen.
    pub fn pixels(&self) -> [u8; 16] {
        let top = self.top.to_rgba8();
        let bottom = self.bottom.to_rgba8();
        let mut pixels = [0u8; 16];
        for (index, pixel) in pixels.chunks_exact_mut(4).enumerate() {
            let row = index as u32 / Self::WIDTH;
            pixel.copy_from_slice(if row == 0 { &top } else { &bottom });
        }
        pixels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_gradient_is_dark_over_light() {
        let pixels = GradientBackground::from_config(&BackgroundConfig::default()).pixels();
        assert_eq!(&pixels[0..8], &[0x0d, 0x0d, 0x0d, 0xff, 0x0d, 0x0d, 0x0d, 0xff]);
        assert_eq!(&pixels[8..16], &[0x33, 0x33, 0x33, 0xff, 0x33, 0x33, 0x33, 0xff]);
    }
}
