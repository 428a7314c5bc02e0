//! Touch input
//!
//! Gesture recognition happens in the host. The core receives already
//! classified gesture primitives and hands them to layers, top-most first.

/// A recognized touch gesture, in screen pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TouchEvent {
    /// Drag; distances are the movement since the previous scroll event
    Scroll {
        /// Horizontal distance
        distance_x: f32,
        /// Vertical distance
        distance_y: f32,
    },
    /// Finger lifted while moving
    Fling {
        /// Horizontal velocity in pixels per second
        velocity_x: f32,
        /// Vertical velocity in pixels per second
        velocity_y: f32,
    },
    /// Two-finger pinch started
    ScaleBegin {
        /// Pinch center, horizontal
        focus_x: f32,
        /// Pinch center, vertical
        focus_y: f32,
    },
    /// Two-finger pinch moved
    Scale {
        /// Pinch center, horizontal
        focus_x: f32,
        /// Pinch center, vertical
        focus_y: f32,
        /// Span ratio since the previous scale event
        scale_factor: f32,
    },
    /// Two-finger pinch ended
    ScaleEnd,
    /// Press and hold, used to pick objects
    LongPress {
        /// Column from the left
        x: i32,
        /// Row from the top
        y: i32,
    },
}
