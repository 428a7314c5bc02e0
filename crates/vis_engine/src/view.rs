//! # Visualization View
//!
//! One visualization session: the transform tree, the camera and its command
//! queue, the selection manager, the renderer and its layer stack. Nothing in
//! the crate is global; a host creates a view, starts it, calls
//! [`VisualizationView::render_frame`] from its render thread and shuts it
//! down when the surface goes away.
//!
//! ```rust,no_run
//! use vis_engine::prelude::*;
//!
//! let mut view = VisualizationView::new(ViewerConfig::default())?;
//! view.add_default_layers();
//! view.start()?;
//!
//! let mut gl = RecordingContext::new(Viewport::new(640, 480));
//! view.on_surface_created(&mut gl);
//! view.on_surface_changed(&mut gl, Viewport::new(640, 480));
//! let stats = view.render_frame(&mut gl)?;
//! # Ok::<(), ViewError>(())
//! ```

use std::fmt;
use std::sync::{Arc, Mutex};

use thiserror::Error;

use crate::camera::{Camera, CameraCommandQueue, CameraHandle, OrbitCamera, Viewport};
use crate::config::{ConfigError, ViewerConfig};
use crate::input::TouchEvent;
use crate::layers::{AxisLayer, GridLayer, OrbitControlLayer};
use crate::render::{
    lock_selection, FrameStats, GraphicsContext, Layer, LayerContext, LayerError, LayerId,
    LayerStack, RenderError, SceneRenderer, SharedSelection,
};
use crate::selection::SelectionManager;
use crate::transforms::FrameTransformTree;

/// Session errors
#[derive(Error, Debug)]
pub enum ViewError {
    /// The configuration did not validate
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// A layer failed to start
    #[error("Layer start failed: {0}")]
    Layer(#[from] LayerError),

    /// A frame was aborted
    #[error("Render failed: {0}")]
    Render(#[from] RenderError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ViewState {
    Created,
    Running,
    ShutDown,
}

/// A visualization session
pub struct VisualizationView {
    config: ViewerConfig,
    tree: Arc<FrameTransformTree>,
    camera: Box<dyn Camera>,
    commands: CameraCommandQueue,
    selection: SharedSelection,
    renderer: SceneRenderer,
    state: ViewState,
}

impl fmt::Debug for VisualizationView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VisualizationView")
            .field("state", &self.state)
            .field("fixed_frame", self.camera.fixed_frame())
            .field("layers", self.renderer.layers())
            .finish_non_exhaustive()
    }
}

impl VisualizationView {
    /// Create a session with an empty transform tree
    pub fn new(config: ViewerConfig) -> Result<Self, ViewError> {
        Self::with_tree(config, Arc::new(FrameTransformTree::new()))
    }

    /// Create a session over an existing transform tree, e.g. one already
    /// fed by a [`crate::transforms::TransformListener`]
    pub fn with_tree(config: ViewerConfig, tree: Arc<FrameTransformTree>) -> Result<Self, ViewError> {
        config.validate()?;
        log::info!("Initializing visualization view...");

        let camera = Box::new(OrbitCamera::new(config.camera.clone()));
        let selection = Arc::new(Mutex::new(SelectionManager::new(&config.selection)));
        let renderer = SceneRenderer::new(config.renderer.clone(), Arc::clone(&tree), LayerStack::new());

        Ok(Self {
            config,
            tree,
            camera,
            commands: CameraCommandQueue::new(),
            selection,
            renderer,
            state: ViewState::Created,
        })
    }

    /// Session configuration
    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    /// Transform tree of the session
    pub fn tree(&self) -> &Arc<FrameTransformTree> {
        &self.tree
    }

    /// Layer stack; clones can be handed to other threads
    pub fn layers(&self) -> &LayerStack {
        self.renderer.layers()
    }

    /// Session camera
    pub fn camera(&self) -> &dyn Camera {
        self.camera.as_ref()
    }

    /// Handle for posting camera commands from any thread
    pub fn camera_handle(&self) -> CameraHandle {
        self.commands.handle()
    }

    /// Selection manager of the session
    pub fn selection(&self) -> &SharedSelection {
        &self.selection
    }

    /// Whether the session has been started and not shut down
    pub fn is_running(&self) -> bool {
        self.state == ViewState::Running
    }

    /// Services handed to layers when they start
    pub fn layer_context(&self) -> LayerContext {
        LayerContext {
            tree: Arc::clone(&self.tree),
            camera: self.commands.handle(),
            selection: Arc::clone(&self.selection),
        }
    }

    /// Add a layer on top of the stack
    pub fn add_layer(&self, layer: Box<dyn Layer>) -> LayerId {
        self.renderer.layers().add(layer)
    }

    /// Add the grid, a fixed frame axis triad and orbit gesture control
    pub fn add_default_layers(&self) {
        self.add_layer(Box::new(GridLayer::default()));
        self.add_layer(Box::new(AxisLayer::new(None)));
        self.add_layer(Box::new(OrbitControlLayer::new()));
    }

    /// Start every layer.
    ///
    /// The session runs even when a layer fails to start; that layer stays
    /// stopped and the first such failure is returned.
    pub fn start(&mut self) -> Result<(), ViewError> {
        if self.state == ViewState::Running {
            return Ok(());
        }
        self.state = ViewState::Running;
        log::info!("Starting visualization view with {} layers", self.layers().len());
        self.renderer.layers().start(&self.layer_context())?;
        Ok(())
    }

    /// The host created or recreated the drawing surface
    pub fn on_surface_created(&mut self, gl: &mut dyn GraphicsContext) {
        self.renderer.on_surface_created(gl);
    }

    /// The host resized the drawing surface
    pub fn on_surface_changed(&mut self, gl: &mut dyn GraphicsContext, viewport: Viewport) {
        self.renderer.on_surface_changed(gl, self.camera.as_mut(), viewport);
    }

    /// Apply pending camera commands and draw one frame.
    ///
    /// Does nothing unless the session is running.
    pub fn render_frame(&mut self, gl: &mut dyn GraphicsContext) -> Result<FrameStats, ViewError> {
        if self.state != ViewState::Running {
            log::trace!("Skipping frame, view is {:?}", self.state);
            return Ok(FrameStats::default());
        }
        let applied = self.commands.drain_into(self.camera.as_mut());
        if applied > 0 {
            log::trace!("Applied {} camera commands", applied);
        }
        Ok(self.renderer.render_frame(gl, self.camera.as_mut(), &self.selection)?)
    }

    /// Offer a touch event to the layers, top-most first.
    ///
    /// An unconsumed long press requests a selection pass at the press point.
    pub fn on_touch_event(&self, event: &TouchEvent) -> bool {
        if self.state != ViewState::Running {
            return false;
        }
        if self.layers().dispatch_touch(event) {
            return true;
        }
        match *event {
            TouchEvent::LongPress { x, y } => {
                self.request_selection(x, y);
                true
            }
            _ => false,
        }
    }

    /// Run a selection pass at screen point `(x, y)` on the next frame
    pub fn request_selection(&self, x: i32, y: i32) {
        log::debug!("Selection requested at ({}, {})", x, y);
        lock_selection(&self.selection).begin_selection_draw(x, y);
    }

    /// Shut every layer down. Calling it again is a no-op.
    pub fn shutdown(&mut self) {
        if self.state == ViewState::ShutDown {
            return;
        }
        self.renderer.layers().shutdown();
        self.state = ViewState::ShutDown;
        log::info!("Visualization view shut down");
    }
}

impl Drop for VisualizationView {
    fn drop(&mut self) {
        self.shutdown();
    }
}
