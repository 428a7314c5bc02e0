//! # Scene Renderer
//!
//! Draws one frame of the layer stack:
//!
//! 1. Clear color and depth.
//! 2. Let the camera update itself and reset the model matrix.
//! 3. For every enabled layer, in stack order: open a matrix scope, place the
//!    model matrix at the layer's frame (if the frame resolves), draw, close
//!    the scope.
//! 4. Poll the graphics context for errors.
//!
//! When the selection manager requests a pick, step 3 is replaced by the
//! selection pass, which draws only selectable layers in flat pick colors and
//! reads back the pixel under the pick point.
//!
//! ## Failure handling
//!
//! A layer whose frame does not resolve yet is drawn with the model matrix
//! that was current before it. Layer errors and panics are isolated per layer
//! when [`RendererConfig::isolate_layer_failures`] is set; otherwise the first
//! error aborts the frame.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use thiserror::Error;

use crate::camera::{Camera, MatrixStack, Viewport};
use crate::config::RendererConfig;
use crate::selection::PickColor;
use crate::transforms::{FrameId, FrameTransformTree};

use super::context::{ClearMask, GlError, GraphicsContext};
use super::layer::{lock_selection, DrawContext, Layer, LayerError, RenderPass, SharedSelection};
use super::stack::LayerStack;

/// Frame-level render failures
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    /// A layer failed and failure isolation is off
    #[error("Layer '{layer}' failed: {source}")]
    Layer {
        /// Name of the failing layer
        layer: String,
        /// What went wrong
        source: LayerError,
    },
}

/// Result type for rendering operations
pub type RenderResult<T> = Result<T, RenderError>;

/// What happened during one frame
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameStats {
    /// Layers whose draw entry point ran successfully
    pub layers_drawn: usize,
    /// Layers drawn without their frame transform
    pub layers_unresolved: usize,
    /// Layers that returned an error or panicked
    pub layers_failed: usize,
    /// Error reported by the graphics context after the pass
    pub gl_error: Option<GlError>,
    /// Whether this frame was a selection pass
    pub selection_pass: bool,
    /// Whether the selection pass picked a selectable
    pub picked: bool,
}

/// Draws the layer stack once per frame
#[derive(Debug)]
pub struct SceneRenderer {
    config: RendererConfig,
    tree: Arc<FrameTransformTree>,
    layers: LayerStack,
}

impl SceneRenderer {
    /// Create a renderer over a transform tree and a layer stack
    pub fn new(config: RendererConfig, tree: Arc<FrameTransformTree>, layers: LayerStack) -> Self {
        Self { config, tree, layers }
    }

    /// Layer stack drawn by this renderer
    pub fn layers(&self) -> &LayerStack {
        &self.layers
    }

    /// Renderer configuration
    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    /// Surface (re)created by the host
    pub fn on_surface_created(&self, gl: &mut dyn GraphicsContext) {
        gl.on_surface_created();
        gl.set_clear_color(self.config.clear_color);
        log::info!("Render surface created");
    }

    /// Surface resized by the host
    pub fn on_surface_changed(
        &self,
        gl: &mut dyn GraphicsContext,
        camera: &mut dyn Camera,
        viewport: Viewport,
    ) {
        gl.on_surface_changed(viewport);
        camera.set_viewport(viewport);
        camera.model_stack_mut().load_identity();
    }

    /// Draw one frame.
    ///
    /// # Arguments
    /// * `gl` - Graphics context of the current surface
    /// * `camera` - Session camera; updated through [`Camera::apply`]
    /// * `selection` - Selection manager; consulted for pick requests
    ///
    /// The selection manager is never locked while the layer stack is, so
    /// layers may lock it from their lifecycle hooks.
    ///
    /// # Returns
    /// Frame statistics, or the first layer failure when isolation is off
    pub fn render_frame(
        &self,
        gl: &mut dyn GraphicsContext,
        camera: &mut dyn Camera,
        selection: &SharedSelection,
    ) -> RenderResult<FrameStats> {
        let (selection_pass, pick_point) = {
            let selection = lock_selection(selection);
            (selection.is_selection_draw(), selection.selection_point())
        };
        let clear_color = if selection_pass {
            PickColor::BACKGROUND.to_rgba_f32()
        } else {
            self.config.clear_color
        };
        gl.set_clear_color(clear_color);
        gl.clear(ClearMask::COLOR | ClearMask::DEPTH);

        camera.apply(&self.tree);
        camera.model_stack_mut().load_identity();

        let mut stats = FrameStats { selection_pass, ..FrameStats::default() };
        let result = if selection_pass {
            let drawn = self.draw_layers(gl, camera, RenderPass::Selection, &mut stats);
            if drawn.is_ok() {
                let color = Self::read_pick_color(gl, camera.viewport(), pick_point);
                stats.picked = lock_selection(selection).select_item_with_color(color);
            } else {
                lock_selection(selection).cancel_selection_draw();
            }
            drawn
        } else {
            self.draw_layers(gl, camera, RenderPass::Normal, &mut stats)
        };

        stats.gl_error = gl.take_error();
        if let Some(error) = stats.gl_error {
            log::warn!("OpenGL error: {}", error);
        }

        result.map(|()| stats)
    }

    fn draw_layers(
        &self,
        gl: &mut dyn GraphicsContext,
        camera: &mut dyn Camera,
        pass: RenderPass,
        stats: &mut FrameStats,
    ) -> RenderResult<()> {
        let view_projection = camera.projection_matrix() * camera.view_matrix();
        let fixed_frame = camera.fixed_frame().clone();
        let model = camera.model_stack_mut();

        let mut layers = self.layers.lock();
        for entry in &mut layers.entries {
            let layer = entry.layer.as_mut();
            if !layer.is_enabled() {
                continue;
            }
            if pass == RenderPass::Selection && layer.as_selectable().is_none() {
                continue;
            }

            let mut scope = model.scope();
            if let Some(frame) = layer.frame() {
                if !self.place_at_frame(&mut scope, &frame, &fixed_frame) {
                    stats.layers_unresolved += 1;
                }
            }

            let mut ctx = DrawContext::new(&mut *gl, &mut scope, view_projection, pass);
            match self.draw_layer(layer, &mut ctx, pass) {
                Ok(()) => stats.layers_drawn += 1,
                Err(e) if self.config.isolate_layer_failures => {
                    log::warn!("Layer '{}' failed, skipping it this frame: {}", layer.name(), e);
                    stats.layers_failed += 1;
                }
                Err(e) => {
                    log::error!("Layer '{}' failed, aborting frame: {}", layer.name(), e);
                    return Err(RenderError::Layer { layer: layer.name().to_string(), source: e });
                }
            }
        }
        Ok(())
    }

    /// Multiply in the pose of `frame` expressed in `fixed_frame`; returns
    /// whether it was available
    fn place_at_frame(&self, model: &mut MatrixStack, frame: &FrameId, fixed_frame: &FrameId) -> bool {
        match self.tree.new_transform_if_possible(fixed_frame, frame) {
            Some(transform) => {
                model.apply_transform(&transform);
                true
            }
            None => {
                log::debug!("No transform from {} to {}, drawing in place", frame, fixed_frame);
                false
            }
        }
    }

    fn draw_layer(
        &self,
        layer: &mut dyn Layer,
        ctx: &mut DrawContext<'_>,
        pass: RenderPass,
    ) -> Result<(), LayerError> {
        let mut draw = || match pass {
            RenderPass::Normal => layer.draw(ctx),
            RenderPass::Selection => match layer.as_selectable() {
                Some(selectable) => selectable.selection_draw(ctx),
                None => Ok(()),
            },
        };

        if !self.config.isolate_layer_failures {
            return draw();
        }
        panic::catch_unwind(AssertUnwindSafe(draw))
            .unwrap_or_else(|payload| Err(LayerError::Panicked(panic_message(payload.as_ref()))))
    }

    fn read_pick_color(gl: &mut dyn GraphicsContext, viewport: Viewport, (x, y): (i32, i32)) -> PickColor {
        let pixel = match (u32::try_from(x), u32::try_from(y)) {
            (Ok(x), Ok(y)) => viewport.flip_y(y).and_then(|row| gl.read_pixel(x, row)),
            _ => None,
        };
        let color = pixel.map_or(PickColor::BACKGROUND, PickColor::from_rgba_bytes);
        log::debug!("Selection pass read {} at ({}, {})", color, x, y);
        color
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
