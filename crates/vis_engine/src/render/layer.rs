//! # Layers
//!
//! A layer is an independently enabled drawable unit. It may declare a
//! reference frame; the renderer then places the layer's model matrix at that
//! frame relative to the camera's fixed frame before calling
//! [`Layer::draw`].
//!
//! Layers draw through a [`DrawContext`], which pairs the graphics context
//! with the model matrix stack and stamps every draw call with the current
//! model and model-view-projection matrices.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use thiserror::Error;

use crate::camera::{CameraHandle, MatrixStack};
use crate::foundation::math::{Mat4, Vec3};
use crate::input::TouchEvent;
use crate::selection::{SelectionError, SelectionManager};
use crate::transforms::{FrameId, FrameTransformTree};

use super::context::{DrawCall, GraphicsContext, PrimitiveMode};

/// Layer failures
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LayerError {
    /// The layer could not start
    #[error("Layer failed to start: {0}")]
    StartFailed(String),

    /// The layer failed while drawing
    #[error("Layer failed to draw: {0}")]
    DrawFailed(String),

    /// The layer panicked while drawing
    #[error("Layer panicked: {0}")]
    Panicked(String),

    /// Registering or releasing a selectable failed
    #[error("Selection error: {0}")]
    Selection(#[from] SelectionError),
}

/// Selection manager shared between the renderer and selectable layers
pub type SharedSelection = Arc<Mutex<SelectionManager>>;

/// Lock a shared selection manager, recovering from poisoning
pub fn lock_selection(selection: &SharedSelection) -> MutexGuard<'_, SelectionManager> {
    selection.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Session services handed to layers when they start
#[derive(Debug, Clone)]
pub struct LayerContext {
    /// Transform tree of the session
    pub tree: Arc<FrameTransformTree>,
    /// Command handle of the session camera
    pub camera: CameraHandle,
    /// Selection manager of the session
    pub selection: SharedSelection,
}

/// Which pass a layer is drawing in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderPass {
    /// Regular shaded pass
    Normal,
    /// Flat color picking pass
    Selection,
}

/// Drawing interface handed to [`Layer::draw`]
pub struct DrawContext<'a> {
    gl: &'a mut dyn GraphicsContext,
    model: &'a mut MatrixStack,
    view_projection: Mat4,
    pass: RenderPass,
    draw_calls: usize,
}

impl fmt::Debug for DrawContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DrawContext")
            .field("pass", &self.pass)
            .field("depth", &self.model.depth())
            .field("draw_calls", &self.draw_calls)
            .finish()
    }
}

impl<'a> DrawContext<'a> {
    /// Create a draw context
    ///
    /// # Arguments
    /// * `gl` - Target graphics context
    /// * `model` - Model matrix stack, already placed at the layer's frame
    /// * `view_projection` - Projection * view of the current camera
    /// * `pass` - Pass being drawn
    pub fn new(
        gl: &'a mut dyn GraphicsContext,
        model: &'a mut MatrixStack,
        view_projection: Mat4,
        pass: RenderPass,
    ) -> Self {
        Self { gl, model, view_projection, pass, draw_calls: 0 }
    }

    /// Pass being drawn
    pub fn pass(&self) -> RenderPass {
        self.pass
    }

    /// Model matrix stack
    pub fn model(&mut self) -> &mut MatrixStack {
        &mut *self.model
    }

    /// Run `f` with the model matrix pushed. The matrix is restored
    /// afterwards, also when `f` panics.
    pub fn scoped<R>(&mut self, f: impl FnOnce(&mut DrawContext<'_>) -> R) -> R {
        let mut scope = self.model.scope();
        let mut inner = DrawContext::new(&mut *self.gl, &mut scope, self.view_projection, self.pass);
        let result = f(&mut inner);
        self.draw_calls += inner.draw_calls;
        result
    }

    /// Draw calls issued through this context
    pub fn draw_calls(&self) -> usize {
        self.draw_calls
    }

    /// Submit geometry in the current model frame
    pub fn draw(&mut self, mode: PrimitiveMode, vertices: Vec<Vec3>, color: [f32; 4]) {
        let model = *self.model.current();
        self.gl.submit(DrawCall {
            mode,
            vertices,
            color,
            model,
            mvp: self.view_projection * model,
            flat: self.pass == RenderPass::Selection,
        });
        self.draw_calls += 1;
    }
}

/// A drawable unit in the layer stack
pub trait Layer: Send {
    /// Name used in logs
    fn name(&self) -> &str;

    /// Disabled layers are neither drawn nor offered touch events
    fn is_enabled(&self) -> bool {
        true
    }

    /// Frame the layer's geometry is expressed in; `None` draws in the
    /// fixed frame
    fn frame(&self) -> Option<FrameId> {
        None
    }

    /// Draw the layer
    fn draw(&mut self, ctx: &mut DrawContext<'_>) -> Result<(), LayerError>;

    /// Called once before the first frame the layer takes part in
    fn on_start(&mut self, _ctx: &LayerContext) -> Result<(), LayerError> {
        Ok(())
    }

    /// Called when the layer leaves the stack or the session ends.
    /// Must tolerate being called more than once.
    fn on_shutdown(&mut self) {}

    /// Offer a touch event; return `true` to consume it
    fn on_touch_event(&mut self, _event: &TouchEvent) -> bool {
        false
    }

    /// Picking capability, if the layer draws selectables
    fn as_selectable(&mut self) -> Option<&mut dyn SelectableLayer> {
        None
    }
}

/// Layers taking part in the selection pass
pub trait SelectableLayer {
    /// Draw every selectable in its flat pick color
    fn selection_draw(&mut self, ctx: &mut DrawContext<'_>) -> Result<(), LayerError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::Viewport;
    use crate::render::RecordingContext;
    use approx::assert_relative_eq;

    #[test]
    fn test_draw_stamps_matrices() {
        let mut gl = RecordingContext::new(Viewport::new(10, 10));
        let mut stack = MatrixStack::new();
        stack.translate(1.0, 2.0, 3.0);
        let view_projection = Mat4::new_scaling(2.0);

        let mut ctx = DrawContext::new(&mut gl, &mut stack, view_projection, RenderPass::Normal);
        ctx.scoped(|inner| {
            inner.model().translate(1.0, 0.0, 0.0);
            inner.draw(PrimitiveMode::Points, vec![Vec3::zeros()], [0.0; 4]);
        });
        ctx.draw(PrimitiveMode::Points, vec![Vec3::zeros()], [1.0; 4]);
        assert_eq!(ctx.draw_calls(), 2);

        assert_eq!(stack.depth(), 0);
        let nested = gl.calls()[0].world_vertices().next().unwrap();
        assert_relative_eq!(nested.coords, Vec3::new(2.0, 2.0, 3.0));

        let call = &gl.calls()[1];
        assert!(!call.flat);
        let origin = call.world_vertices().next().unwrap();
        assert_relative_eq!(origin.coords, Vec3::new(1.0, 2.0, 3.0));
        assert_relative_eq!(call.mvp, view_projection * call.model);
    }

    #[test]
    fn test_selection_pass_draws_flat() {
        let mut gl = RecordingContext::new(Viewport::new(10, 10));
        let mut stack = MatrixStack::new();
        let mut ctx = DrawContext::new(&mut gl, &mut stack, Mat4::identity(), RenderPass::Selection);
        ctx.draw(PrimitiveMode::Points, vec![Vec3::zeros()], [0.0, 0.0, 1.0, 1.0]);
        assert!(gl.calls()[0].flat);
    }
}
