//! Axis triad
//!
//! Draws the X, Y and Z axes of a frame as red, green and blue arrows. The
//! triad is selectable: once picked it is drawn in the highlight color.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::foundation::math::Vec3;
use crate::render::{
    lock_selection, DrawContext, Layer, LayerContext, LayerError, PrimitiveMode, SelectableLayer,
    SharedSelection,
};
use crate::selection::{PickColor, Selectable, SelectableKey, SELECTED_COLOR};
use crate::transforms::FrameId;

const RED: [f32; 4] = [1.0, 0.0, 0.0, 1.0];
const GREEN: [f32; 4] = [0.0, 1.0, 0.0, 1.0];
const BLUE: [f32; 4] = [0.0, 0.0, 1.0, 1.0];

/// Shaft plus two arrow head segments along `axis`, with the head opening
/// towards `side`
fn arrow(axis: Vec3, side: Vec3, scale: f32) -> Vec<Vec3> {
    let tip = axis * scale;
    let head_base = axis * (0.75 * scale);
    let head_offset = side * (0.25 * scale);
    vec![
        Vec3::zeros(),
        tip,
        tip,
        head_base + head_offset,
        tip,
        head_base - head_offset,
    ]
}

/// Selection state shared with the selection manager
#[derive(Debug)]
struct AxisSelectable {
    frame: Option<FrameId>,
    selected: AtomicBool,
}

impl Selectable for AxisSelectable {
    fn set_selected(&self, selected: bool) {
        self.selected.store(selected, Ordering::Relaxed);
    }

    fn info(&self) -> BTreeMap<String, String> {
        let frame = self
            .frame
            .as_ref()
            .map_or_else(|| "<fixed frame>".to_string(), ToString::to_string);
        BTreeMap::from([
            ("Type".to_string(), "Axis".to_string()),
            ("Frame".to_string(), frame),
        ])
    }
}

/// RGB axis triad
#[derive(Debug)]
pub struct AxisLayer {
    scale: f32,
    enabled: bool,
    state: Arc<AxisSelectable>,
    registration: Option<(SharedSelection, SelectableKey, PickColor)>,
}

impl Default for AxisLayer {
    fn default() -> Self {
        Self::new(None)
    }
}

impl AxisLayer {
    /// Triad at the origin of `frame`, or of the fixed frame
    pub fn new(frame: Option<FrameId>) -> Self {
        Self {
            scale: 1.0,
            enabled: true,
            state: Arc::new(AxisSelectable { frame, selected: AtomicBool::new(false) }),
            registration: None,
        }
    }

    /// Axis length
    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }

    /// Enable or disable drawing
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Whether the triad is the current selection
    pub fn is_selected(&self) -> bool {
        self.state.selected.load(Ordering::Relaxed)
    }

    /// Pick color while registered
    pub fn pick_color(&self) -> Option<PickColor> {
        self.registration.as_ref().map(|(_, _, color)| *color)
    }

    /// Selection key while registered
    pub fn selection_key(&self) -> Option<SelectableKey> {
        self.registration.as_ref().map(|(_, key, _)| *key)
    }

    fn axes(&self) -> [(Vec<Vec3>, [f32; 4]); 3] {
        [
            (arrow(Vec3::x(), Vec3::y(), self.scale), RED),
            (arrow(Vec3::y(), Vec3::x(), self.scale), GREEN),
            (arrow(Vec3::z(), Vec3::y(), self.scale), BLUE),
        ]
    }
}

impl Layer for AxisLayer {
    fn name(&self) -> &str {
        "Axis"
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn frame(&self) -> Option<FrameId> {
        self.state.frame.clone()
    }

    fn draw(&mut self, ctx: &mut DrawContext<'_>) -> Result<(), LayerError> {
        let selected = self.is_selected();
        for (vertices, color) in self.axes() {
            ctx.draw(PrimitiveMode::Lines, vertices, if selected { SELECTED_COLOR } else { color });
        }
        Ok(())
    }

    fn on_start(&mut self, ctx: &LayerContext) -> Result<(), LayerError> {
        if self.registration.is_some() {
            return Ok(());
        }
        let selectable: Arc<dyn Selectable> = self.state.clone();
        let (key, color) = lock_selection(&ctx.selection).register_selectable(selectable)?;
        self.registration = Some((Arc::clone(&ctx.selection), key, color));
        Ok(())
    }

    fn on_shutdown(&mut self) {
        if let Some((selection, key, _)) = self.registration.take() {
            lock_selection(&selection).remove_selectable(key);
        }
    }

    fn as_selectable(&mut self) -> Option<&mut dyn SelectableLayer> {
        Some(self)
    }
}

impl SelectableLayer for AxisLayer {
    fn selection_draw(&mut self, ctx: &mut DrawContext<'_>) -> Result<(), LayerError> {
        let Some(color) = self.pick_color() else {
            return Ok(());
        };
        let vertices: Vec<Vec3> = self.axes().into_iter().flat_map(|(vertices, _)| vertices).collect();
        ctx.draw(PrimitiveMode::Lines, vertices, color.to_rgba_f32());
        Ok(())
    }
}
