//! Viewport dimensions

/// Size of the render surface in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl Viewport {
    /// Create a viewport
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Width / height, 1.0 for a degenerate surface
    pub fn aspect_ratio(&self) -> f32 {
        if self.height == 0 {
            1.0
        } else {
            self.width as f32 / self.height as f32
        }
    }

    /// Convert a top-left based screen row into a bottom-left based
    /// framebuffer row; `None` for rows outside the surface
    pub fn flip_y(&self, y: u32) -> Option<u32> {
        (y < self.height).then(|| self.height - 1 - y)
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(1, 1)
    }
}
