//! # Rendering
//!
//! Layered scene rendering on top of an immediate-mode graphics context.
//!
//! ## Components
//!
//! - [`GraphicsContext`]: the host-supplied drawing surface
//! - [`Layer`]: a drawable unit, optionally bound to a reference frame
//! - [`LayerStack`]: ordered, shared list of layers with lifecycle handling
//! - [`SceneRenderer`]: draws the stack once per frame, including the
//!   selection pass used for picking

mod context;
mod layer;
mod renderer;
mod stack;

pub use context::{ClearMask, DrawCall, GlError, GraphicsContext, PrimitiveMode, RecordingContext};
pub use layer::{
    lock_selection, DrawContext, Layer, LayerContext, LayerError, RenderPass, SelectableLayer,
    SharedSelection,
};
pub use renderer::{FrameStats, RenderError, RenderResult, SceneRenderer};
pub use stack::{LayerId, LayerStack};
