//! Coordinate frame management
//!
//! A tree of named frames fed by an external transform source and queried by
//! the camera and the renderer every frame.

mod frame;
mod tree;
mod feed;

pub use frame::{FrameId, StampedTransform};
pub use tree::FrameTransformTree;
pub use feed::{TransformFeed, TransformListener};
