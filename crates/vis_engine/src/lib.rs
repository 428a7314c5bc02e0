//! # Vis Engine
//!
//! Core of a robot state visualizer: a frame transform tree fed by live pose
//! updates, an orbit camera that can follow a frame, and a layered scene
//! renderer with color-based object picking.
//!
//! ## Features
//!
//! - **Transform Tree**: named frames, last-write-wins edges, relative pose
//!   lookups through the lowest common ancestor
//! - **Orbit Camera**: orbit, fling, pan and zoom gestures, frame tracking
//! - **Layer Stack**: per-layer frame resolution inside scoped model matrices,
//!   failure isolation, reverse-order touch dispatch
//! - **Selection**: unique flat pick colors and a selection render pass
//! - **Headless**: any immediate-mode context implementing
//!   [`render::GraphicsContext`] can be driven; [`render::RecordingContext`]
//!   needs no GPU
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use vis_engine::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ViewerConfig::default();
//!     let mut view = VisualizationView::new(config)?;
//!     view.add_default_layers();
//!     view.start()?;
//!
//!     view.tree().update_transform(
//!         "/world",
//!         "/base_link",
//!         RigidTransform::from_translation(Vec3::new(1.0, 0.0, 0.0)),
//!         0.0,
//!     );
//!
//!     let mut gl = RecordingContext::new(Viewport::new(800, 600));
//!     view.on_surface_created(&mut gl);
//!     view.on_surface_changed(&mut gl, Viewport::new(800, 600));
//!     let stats = view.render_frame(&mut gl)?;
//!     log::info!("Drew {} layers", stats.layers_drawn);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod foundation;
pub mod config;
pub mod transforms;
pub mod camera;
pub mod selection;
pub mod input;
pub mod render;
pub mod layers;

mod view;

pub use view::{VisualizationView, ViewError};

/// Common imports for crate users
pub mod prelude {
    pub use crate::{
        VisualizationView, ViewError,
        foundation::math::{Vec3, Mat4, Quat, RigidTransform},
        config::{Config, ViewerConfig},
        transforms::{FrameId, FrameTransformTree, StampedTransform, TransformFeed, TransformListener},
        camera::{Camera, CameraHandle, OrbitCamera, OrbitControl, PanPolicy, Viewport},
        selection::{PickColor, Selectable, SelectionManager},
        input::TouchEvent,
        render::{
            DrawContext, FrameStats, GraphicsContext, Layer, LayerContext, LayerError,
            PrimitiveMode, RecordingContext, SelectableLayer,
        },
        layers::{AxisLayer, GridLayer, OrbitControlLayer},
    };
}
