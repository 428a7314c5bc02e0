//! Ground grid

use crate::foundation::math::Vec3;
use crate::render::{DrawContext, Layer, LayerError, PrimitiveMode};
use crate::transforms::FrameId;

const MIN_CELLS: u32 = 1;
const MAX_CELLS: u32 = 1000;
const MIN_SPACING: f32 = 0.01;
const MAX_SPACING: f32 = 10_000.0;

/// Square line grid in the XY plane, centered on its frame origin
#[derive(Debug, Clone)]
pub struct GridLayer {
    cells: u32,
    spacing: f32,
    offset: Vec3,
    color: [f32; 4],
    frame: Option<FrameId>,
    enabled: bool,
    vertices: Vec<Vec3>,
}

impl Default for GridLayer {
    fn default() -> Self {
        Self::new(10, 1.0)
    }
}

impl GridLayer {
    /// Grid of `cells` x `cells` squares of side `spacing`.
    ///
    /// Out of range values are clamped to 1..=1000 cells and 0.01..=10000
    /// spacing.
    pub fn new(cells: u32, spacing: f32) -> Self {
        let mut grid = Self {
            cells: cells.clamp(MIN_CELLS, MAX_CELLS),
            spacing: spacing.clamp(MIN_SPACING, MAX_SPACING),
            offset: Vec3::zeros(),
            color: [1.0, 1.0, 1.0, 1.0],
            frame: None,
            enabled: true,
            vertices: Vec::new(),
        };
        grid.rebuild();
        grid
    }

    /// Anchor the grid to a frame instead of the fixed frame
    pub fn with_frame(mut self, frame: impl Into<FrameId>) -> Self {
        self.frame = Some(frame.into());
        self
    }

    /// Offset of the grid center from its frame origin
    pub fn with_offset(mut self, offset: Vec3) -> Self {
        self.offset = offset;
        self
    }

    /// Line color
    pub fn with_color(mut self, color: [f32; 4]) -> Self {
        self.color = color;
        self
    }

    /// Enable or disable drawing
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Change the number of cells and rebuild the lines
    pub fn set_cells(&mut self, cells: u32) {
        self.cells = cells.clamp(MIN_CELLS, MAX_CELLS);
        self.rebuild();
    }

    /// Change the cell size and rebuild the lines
    pub fn set_spacing(&mut self, spacing: f32) {
        self.spacing = spacing.clamp(MIN_SPACING, MAX_SPACING);
        self.rebuild();
    }

    /// Number of line segments drawn
    pub fn line_count(&self) -> usize {
        self.vertices.len() / 2
    }

    fn rebuild(&mut self) {
        let max = self.spacing * self.cells as f32 / 2.0;
        let min = -max;

        // Lines are emitted in mirrored pairs walking inwards from the edge;
        // with an even cell count the center lines are emitted twice.
        let steps = self.cells / 2 + 1;
        self.vertices.clear();
        for step in 0..steps {
            let pos = min + step as f32 * self.spacing;
            self.vertices.extend_from_slice(&[
                Vec3::new(pos, min, 0.0),
                Vec3::new(pos, max, 0.0),
                Vec3::new(-pos, min, 0.0),
                Vec3::new(-pos, max, 0.0),
                Vec3::new(min, pos, 0.0),
                Vec3::new(max, pos, 0.0),
                Vec3::new(min, -pos, 0.0),
                Vec3::new(max, -pos, 0.0),
            ]);
        }
    }
}

impl Layer for GridLayer {
    fn name(&self) -> &str {
        "Grid"
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn frame(&self) -> Option<FrameId> {
        self.frame.clone()
    }

    fn draw(&mut self, ctx: &mut DrawContext<'_>) -> Result<(), LayerError> {
        let offset = self.offset;
        ctx.scoped(|ctx| {
            ctx.model().translate(offset.x, offset.y, offset.z);
            ctx.draw(PrimitiveMode::Lines, self.vertices.clone(), self.color);
        });
        Ok(())
    }
}
