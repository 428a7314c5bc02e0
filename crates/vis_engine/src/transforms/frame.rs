//! Frame identifiers and stamped transforms

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::foundation::math::RigidTransform;

/// Name of a coordinate frame.
///
/// A leading `/` (global prefix) is stripped, so `"/world"` and `"world"`
/// refer to the same frame.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct FrameId(String);

impl FrameId {
    /// Create a frame id, normalizing the global prefix away
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(name.as_ref().trim().trim_start_matches('/').to_string())
    }

    /// Frame name without the global prefix
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when the name is empty after normalization
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.0)
    }
}

impl From<&str> for FrameId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for FrameId {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

impl From<FrameId> for String {
    fn from(frame: FrameId) -> Self {
        frame.0
    }
}

/// Transform between a parent and a child frame, tagged with a time stamp.
///
/// `transform` maps coordinates expressed in `child` into `parent`.
#[derive(Debug, Clone, PartialEq)]
pub struct StampedTransform {
    /// Parent frame
    pub parent: FrameId,
    /// Child frame
    pub child: FrameId,
    /// Child-to-parent transform
    pub transform: RigidTransform,
    /// Receipt or validity time in seconds
    pub stamp: f64,
}

impl StampedTransform {
    /// Create a stamped transform
    pub fn new(
        parent: impl Into<FrameId>,
        child: impl Into<FrameId>,
        transform: RigidTransform,
        stamp: f64,
    ) -> Self {
        Self {
            parent: parent.into(),
            child: child.into(),
            transform,
            stamp,
        }
    }
}
