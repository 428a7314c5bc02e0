//! # Camera System
//!
//! The camera owns the view state of a session: where the user is looking
//! from, which frame is the rendering origin (the fixed frame) and, when set,
//! which frame the look target follows (the target frame). It also owns the
//! model matrix stack that layers compose their transforms on.
//!
//! ## Control modes
//!
//! A camera is either user controlled or locked onto a target frame.
//! Setting a target frame enters [`CameraMode::FrameLocked`]; setting the
//! look target directly (and, depending on [`PanPolicy`], panning) returns to
//! [`CameraMode::UserControlled`].
//!
//! ## Capabilities
//!
//! Control layers need more than the base [`Camera`] interface. Instead of
//! inspecting the concrete camera type they ask for a capability such as
//! [`OrbitControl`] through [`Camera::as_orbit_control`].

mod matrix_stack;
mod viewport;
mod orbit;
mod commands;

pub use matrix_stack::{MatrixStack, MatrixScope, MatrixStackError, MATRIX_STACK_DEPTH};
pub use viewport::Viewport;
pub use orbit::{OrbitCamera, MIN_THETA, MAX_THETA};
pub use commands::{CameraCommand, CameraHandle, CameraCommandQueue};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::foundation::math::{Mat4, Vec3};
use crate::transforms::{FrameId, FrameTransformTree};

/// Camera input validation errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CameraError {
    /// Zoom factors must be finite and strictly positive
    #[error("Invalid zoom factor: {0}")]
    InvalidZoomFactor(f32),

    /// Frame names must not be empty
    #[error("Frame name must not be empty")]
    EmptyFrame,

    /// The command needs a capability this camera does not have
    #[error("Camera does not support {0}")]
    Unsupported(&'static str),
}

/// Which source currently drives the look target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraMode {
    /// The user sets and pans the look target
    UserControlled,
    /// The look target follows a frame from the transform tree
    FrameLocked,
}

/// Effect of a screen-space pan on an active target frame lock.
///
/// Both behaviors exist in deployed viewers; which one is right is a product
/// decision, so it stays configurable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PanPolicy {
    /// Panning releases the lock and returns to user control
    #[default]
    ReleaseTargetFrame,
    /// Panning moves the look target but keeps the lock; the next
    /// [`Camera::apply`] snaps back to the tracked frame
    KeepTargetFrame,
}

/// Base camera interface used by the renderer and by layers
pub trait Camera: Send {
    /// Per-frame update: decay motion, follow the target frame, rebuild the
    /// view matrix
    fn apply(&mut self, tree: &FrameTransformTree);

    /// Current view matrix
    fn view_matrix(&self) -> Mat4;

    /// Projection matrix for the current viewport
    fn projection_matrix(&self) -> Mat4;

    /// Current viewport
    fn viewport(&self) -> Viewport;

    /// Update the viewport after a surface change
    fn set_viewport(&mut self, viewport: Viewport);

    /// Pan by a screen-space distance
    fn move_camera_screen_coordinates(&mut self, dx: f32, dy: f32);

    /// Set the look target and return to user control
    fn set_camera(&mut self, look_target: Vec3);

    /// Camera position in the fixed frame
    fn camera(&self) -> Vec3;

    /// Point the camera looks at, in the fixed frame
    fn look_target(&self) -> Vec3;

    /// Zoom by `factor`; values above 1 zoom in
    fn zoom_camera(&mut self, factor: f32) -> Result<(), CameraError>;

    /// Frame used as the rendering origin
    fn fixed_frame(&self) -> &FrameId;

    /// Change the rendering origin
    fn set_fixed_frame(&mut self, frame: FrameId) -> Result<(), CameraError>;

    /// Restore the configured default fixed frame
    fn reset_fixed_frame(&mut self);

    /// Frame the look target follows, if any
    fn target_frame(&self) -> Option<&FrameId>;

    /// Lock the look target onto a frame
    fn set_target_frame(&mut self, frame: FrameId) -> Result<(), CameraError>;

    /// Release the target frame lock
    fn reset_target_frame(&mut self);

    /// Current control mode
    fn mode(&self) -> CameraMode {
        if self.target_frame().is_some() {
            CameraMode::FrameLocked
        } else {
            CameraMode::UserControlled
        }
    }

    /// Model matrix stack
    fn model_stack(&self) -> &MatrixStack;

    /// Mutable model matrix stack
    fn model_stack_mut(&mut self) -> &mut MatrixStack;

    /// Orbit capability, if this camera supports it
    fn as_orbit_control(&mut self) -> Option<&mut dyn OrbitControl> {
        None
    }
}

/// Orbit gestures: rotation around the look target and fling motion
pub trait OrbitControl: Camera {
    /// Rotate around the look target by degrees of azimuth and polar angle
    fn move_orbit_position(&mut self, dphi_degrees: f32, dtheta_degrees: f32);

    /// Start a fling from a gesture velocity in screen pixels per second
    fn fling_camera(&mut self, vx: f32, vy: f32);

    /// Restore the initial orbit radius
    fn reset_zoom(&mut self);

    /// Move the look target back to the origin of the fixed frame
    fn reset_look_target(&mut self);
}
