use super::Vec2;

/// Viewport size in pixels.
///
/// The batch uses it to map pixel-space destination rects to NDC.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    #[inline]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    #[inline]
    pub fn is_valid(self) -> bool {
        self.width > 0 && self.height > 0
    }

    /// Maps a pixel position (top-left origin, +Y down) to NDC (+Y up).
    #[inline]
    pub fn to_ndc(self, p: Vec2) -> Vec2 {
        let half_w = self.width as f32 / 2.0;
        let half_h = self.height as f32 / 2.0;
        Vec2::new(p.x / half_w - 1.0, 1.0 - p.y / half_h)
    }
}
