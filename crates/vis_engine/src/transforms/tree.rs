//! Frame transform tree
//!
//! Stores the most recent transform for every child frame and resolves the
//! relative transform between any two frames that share an ancestor.
//!
//! Each child has exactly one parent edge; a new update for the child
//! replaces the old edge (last write wins, even when the new stamp is older).
//! Time stamps are kept for inspection only, lookups never interpolate.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::frame::{FrameId, StampedTransform};
use crate::foundation::math::RigidTransform;

#[derive(Debug, Clone)]
struct Edge {
    parent: FrameId,
    transform: RigidTransform,
    stamp: f64,
}

#[derive(Debug, Default)]
struct TreeState {
    /// child -> edge to its parent
    edges: HashMap<FrameId, Edge>,
    /// every frame mentioned by any update, roots included
    frames: BTreeSet<FrameId>,
}

/// Ancestor walk from a frame up to its root.
///
/// `frames[i]` is the i-th ancestor (index 0 is the frame itself) and
/// `to_ancestor[i]` maps the frame's coordinates into `frames[i]`.
struct AncestorChain {
    frames: Vec<FrameId>,
    to_ancestor: Vec<RigidTransform>,
}

impl TreeState {
    fn insert(&mut self, parent: FrameId, child: FrameId, transform: RigidTransform, stamp: f64) {
        if parent == child {
            log::warn!("Ignoring transform from frame {} to itself", parent);
            return;
        }
        self.frames.insert(parent.clone());
        self.frames.insert(child.clone());
        if let Some(previous) = self.edges.insert(child.clone(), Edge { parent: parent.clone(), transform, stamp }) {
            if previous.parent != parent {
                log::debug!("Frame {} reparented from {} to {}", child, previous.parent, parent);
            }
        }
    }

    fn chain(&self, frame: &FrameId) -> Option<AncestorChain> {
        let mut frames = vec![frame.clone()];
        let mut to_ancestor = vec![RigidTransform::identity()];
        let mut current = frame;

        while let Some(edge) = self.edges.get(current) {
            if frames.contains(&edge.parent) {
                log::warn!("Cycle in transform tree at frame {}", edge.parent);
                return None;
            }
            let accumulated = edge.transform.multiply(&to_ancestor[to_ancestor.len() - 1]);
            frames.push(edge.parent.clone());
            to_ancestor.push(accumulated);
            current = &edge.parent;
        }

        Some(AncestorChain { frames, to_ancestor })
    }

    /// Lowest common ancestor lookup, returning `(index in a, index in b)`
    fn common_ancestor(a: &AncestorChain, b: &AncestorChain) -> Option<(usize, usize)> {
        let positions: HashMap<&FrameId, usize> =
            b.frames.iter().enumerate().map(|(i, f)| (f, i)).collect();
        a.frames
            .iter()
            .enumerate()
            .find_map(|(i, f)| positions.get(f).map(|&j| (i, j)))
    }

    fn resolve(&self, from: &FrameId, to: &FrameId) -> Option<RigidTransform> {
        if !self.frames.contains(from) || !self.frames.contains(to) {
            return None;
        }
        let from_chain = self.chain(from)?;
        let to_chain = self.chain(to)?;
        let (i, j) = Self::common_ancestor(&from_chain, &to_chain)?;
        Some(from_chain.to_ancestor[i].inverse().multiply(&to_chain.to_ancestor[j]))
    }
}

/// Thread-safe tree of coordinate frames.
///
/// Writers (the transform feed) and readers (camera and renderer) share one
/// coarse lock, so a lookup always sees a consistent snapshot across the whole
/// ancestor walk.
#[derive(Debug, Default)]
pub struct FrameTransformTree {
    state: Mutex<TreeState>,
}

impl FrameTransformTree {
    /// Create an empty tree
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, TreeState> {
        // Every mutation is a single map insert, so a poisoned lock still
        // holds a consistent state.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register or overwrite the transform from `parent` to `child`.
    ///
    /// Both frames become known. A transform from a frame to itself is
    /// ignored.
    pub fn update_transform(
        &self,
        parent: impl Into<FrameId>,
        child: impl Into<FrameId>,
        transform: RigidTransform,
        stamp: f64,
    ) {
        self.lock().insert(parent.into(), child.into(), transform, stamp);
    }

    /// Register a single stamped transform
    pub fn update(&self, stamped: StampedTransform) {
        self.lock().insert(stamped.parent, stamped.child, stamped.transform, stamped.stamp);
    }

    /// Register a batch of transforms under one lock acquisition
    pub fn update_transforms<I>(&self, transforms: I) -> usize
    where
        I: IntoIterator<Item = StampedTransform>,
    {
        let mut state = self.lock();
        let mut count = 0;
        for stamped in transforms {
            state.insert(stamped.parent, stamped.child, stamped.transform, stamped.stamp);
            count += 1;
        }
        count
    }

    /// True when both frames are known and share a common ancestor
    pub fn can_transform(&self, from: &FrameId, to: &FrameId) -> bool {
        self.lock().resolve(from, to).is_some()
    }

    /// Relative transform between two frames.
    ///
    /// The result maps coordinates expressed in `to` into `from`: the chain
    /// from `from` up to the lowest common ancestor is inverted and composed
    /// with the chain from the ancestor down to `to`. Returns `None` when the
    /// frames are unknown or not connected yet; callers retry next frame.
    pub fn new_transform_if_possible(&self, from: &FrameId, to: &FrameId) -> Option<RigidTransform> {
        self.lock().resolve(from, to)
    }

    /// Root of the frame's tree and the transform mapping the frame into it
    pub fn transform_to_root(&self, frame: &FrameId) -> Option<(FrameId, RigidTransform)> {
        let state = self.lock();
        if !state.frames.contains(frame) {
            return None;
        }
        let chain = state.chain(frame)?;
        let last = chain.frames.len() - 1;
        Some((chain.frames[last].clone(), chain.to_ancestor[last]))
    }

    /// Snapshot of all known frame names
    pub fn available_frames(&self) -> BTreeSet<FrameId> {
        self.lock().frames.clone()
    }

    /// Current parent of a frame, `None` for roots and unknown frames
    pub fn parent_of(&self, frame: &FrameId) -> Option<FrameId> {
        self.lock().edges.get(frame).map(|edge| edge.parent.clone())
    }

    /// Stamp of the latest update received for a child frame
    pub fn latest_stamp(&self, frame: &FrameId) -> Option<f64> {
        self.lock().edges.get(frame).map(|edge| edge.stamp)
    }

    /// True when the frame has been mentioned by any update
    pub fn contains(&self, frame: &FrameId) -> bool {
        self.lock().frames.contains(frame)
    }

    /// Number of known frames
    pub fn frame_count(&self) -> usize {
        self.lock().frames.len()
    }

    /// Forget every frame
    pub fn clear(&self) {
        let mut state = self.lock();
        state.edges.clear();
        state.frames.clear();
    }
}
