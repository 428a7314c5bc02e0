//! Layer stack
//!
//! Ordered list of layers shared between the thread that manages layers and
//! the render thread. Index 0 draws first. The lock is held for a whole
//! structural change and for a whole draw pass, so a layer is never removed
//! or shut down in the middle of a frame.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::input::TouchEvent;

use super::layer::{Layer, LayerContext, LayerError};

/// Identifier of a layer in a [`LayerStack`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayerId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LayerState {
    Idle,
    Running,
    Stopped,
}

pub(crate) struct LayerEntry {
    pub(crate) id: LayerId,
    pub(crate) layer: Box<dyn Layer>,
    state: LayerState,
}

impl LayerEntry {
    fn start(&mut self, ctx: &LayerContext) -> Result<(), LayerError> {
        if self.state == LayerState::Running {
            return Ok(());
        }
        match self.layer.on_start(ctx) {
            Ok(()) => {
                self.state = LayerState::Running;
                log::debug!("Started layer {}", self.layer.name());
                Ok(())
            }
            Err(e) => {
                log::warn!("Layer {} failed to start: {}", self.layer.name(), e);
                Err(e)
            }
        }
    }

    fn shutdown(&mut self) {
        if self.state == LayerState::Running {
            self.layer.on_shutdown();
            log::debug!("Shut down layer {}", self.layer.name());
        }
        self.state = LayerState::Stopped;
    }
}

#[derive(Default)]
pub(crate) struct StackState {
    pub(crate) entries: Vec<LayerEntry>,
    context: Option<LayerContext>,
    next_id: u64,
}

/// Shared, ordered collection of layers
#[derive(Clone, Default)]
pub struct LayerStack {
    state: Arc<Mutex<StackState>>,
}

impl std::fmt::Debug for LayerStack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

impl LayerStack {
    /// Create an empty stack
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, StackState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append a layer on top; it draws after every existing layer.
    ///
    /// When the stack has already been started the layer is started right
    /// away. A start failure is only logged and the layer stays in the stack,
    /// stopped; use [`LayerStack::is_running`] to check.
    pub fn add(&self, layer: Box<dyn Layer>) -> LayerId {
        let mut state = self.lock();
        let id = LayerId(state.next_id);
        state.next_id += 1;

        let mut entry = LayerEntry { id, layer, state: LayerState::Idle };
        if let Some(ctx) = &state.context {
            // Logged by the entry
            let _ = entry.start(ctx);
        }
        state.entries.push(entry);
        id
    }

    /// Remove a layer and shut it down.
    ///
    /// Blocks while a frame is being drawn.
    pub fn remove(&self, id: LayerId) -> Option<Box<dyn Layer>> {
        let mut state = self.lock();
        let index = state.entries.iter().position(|entry| entry.id == id)?;
        let mut entry = state.entries.remove(index);
        entry.shutdown();
        Some(entry.layer)
    }

    /// Start every layer that is not running yet.
    ///
    /// All layers are attempted; the first failure is returned.
    pub fn start(&self, ctx: &LayerContext) -> Result<(), LayerError> {
        let mut state = self.lock();
        state.context = Some(ctx.clone());
        let mut first_error = None;
        for entry in &mut state.entries {
            if let Err(e) = entry.start(ctx) {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Shut down every running layer. Calling it again is a no-op.
    pub fn shutdown(&self) {
        let mut state = self.lock();
        state.context = None;
        for entry in &mut state.entries {
            entry.shutdown();
        }
    }

    /// Offer a touch event to enabled layers, top-most first.
    ///
    /// Returns whether a layer consumed it.
    pub fn dispatch_touch(&self, event: &TouchEvent) -> bool {
        let mut state = self.lock();
        for entry in state.entries.iter_mut().rev() {
            if entry.layer.is_enabled() && entry.layer.on_touch_event(event) {
                log::trace!("Touch event {:?} consumed by {}", event, entry.layer.name());
                return true;
            }
        }
        false
    }

    /// Layer names in draw order
    pub fn names(&self) -> Vec<String> {
        self.lock()
            .entries
            .iter()
            .map(|entry| entry.layer.name().to_string())
            .collect()
    }

    /// Number of layers
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    /// Whether the stack has no layers
    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    /// Whether a layer has started and not shut down; `None` for unknown ids
    pub fn is_running(&self, id: LayerId) -> Option<bool> {
        self.lock()
            .entries
            .iter()
            .find(|entry| entry.id == id)
            .map(|entry| entry.state == LayerState::Running)
    }

    /// Run `f` on a layer while holding the stack lock
    pub fn with_layer<R>(&self, id: LayerId, f: impl FnOnce(&mut dyn Layer) -> R) -> Option<R> {
        let mut state = self.lock();
        state
            .entries
            .iter_mut()
            .find(|entry| entry.id == id)
            .map(|entry| f(entry.layer.as_mut()))
    }
}
