//! Camera commands
//!
//! Gesture and UI threads never touch the camera directly. They post
//! [`CameraCommand`]s through a [`CameraHandle`]; the render thread drains
//! them into the camera before each frame.

use std::sync::mpsc::{self, Receiver, Sender};

use crate::foundation::math::Vec3;
use crate::transforms::FrameId;

use super::{Camera, CameraError};

/// A single camera mutation
#[derive(Debug, Clone, PartialEq)]
pub enum CameraCommand {
    /// Orbit by degrees of azimuth and polar angle
    OrbitMove {
        /// Azimuth change
        dphi_degrees: f32,
        /// Polar angle change
        dtheta_degrees: f32,
    },
    /// Start a fling from a gesture velocity
    Fling {
        /// Horizontal velocity in pixels per second
        vx: f32,
        /// Vertical velocity in pixels per second
        vy: f32,
    },
    /// Screen-space pan
    Pan {
        /// Horizontal distance
        dx: f32,
        /// Vertical distance
        dy: f32,
    },
    /// Zoom by a factor
    Zoom(f32),
    /// Set the look target directly
    SetCamera(Vec3),
    /// Lock onto a frame, or release the lock with `None`
    SetTargetFrame(Option<FrameId>),
    /// Change the fixed frame, or restore the default with `None`
    SetFixedFrame(Option<FrameId>),
    /// Restore the initial orbit radius
    ResetZoom,
    /// Move the look target back to the origin
    ResetLookTarget,
}

impl CameraCommand {
    /// Apply this command to a camera
    pub fn apply(self, camera: &mut dyn Camera) -> Result<(), CameraError> {
        match self {
            Self::OrbitMove { dphi_degrees, dtheta_degrees } => {
                orbit(camera, "orbit moves")?.move_orbit_position(dphi_degrees, dtheta_degrees);
            }
            Self::Fling { vx, vy } => orbit(camera, "fling")?.fling_camera(vx, vy),
            Self::Pan { dx, dy } => camera.move_camera_screen_coordinates(dx, dy),
            Self::Zoom(factor) => camera.zoom_camera(factor)?,
            Self::SetCamera(target) => camera.set_camera(target),
            Self::SetTargetFrame(Some(frame)) => camera.set_target_frame(frame)?,
            Self::SetTargetFrame(None) => camera.reset_target_frame(),
            Self::SetFixedFrame(Some(frame)) => camera.set_fixed_frame(frame)?,
            Self::SetFixedFrame(None) => camera.reset_fixed_frame(),
            Self::ResetZoom => orbit(camera, "zoom reset")?.reset_zoom(),
            Self::ResetLookTarget => orbit(camera, "look target reset")?.reset_look_target(),
        }
        Ok(())
    }
}

fn orbit<'a>(
    camera: &'a mut dyn Camera,
    what: &'static str,
) -> Result<&'a mut dyn super::OrbitControl, CameraError> {
    camera.as_orbit_control().ok_or(CameraError::Unsupported(what))
}

/// Cloneable sender for camera commands
#[derive(Debug, Clone)]
pub struct CameraHandle {
    sender: Sender<CameraCommand>,
}

impl CameraHandle {
    /// Post a command. Returns `false` once the queue is gone.
    pub fn post(&self, command: CameraCommand) -> bool {
        self.sender.send(command).is_ok()
    }

    /// Post an orbit move
    pub fn move_orbit_position(&self, dphi_degrees: f32, dtheta_degrees: f32) -> bool {
        self.post(CameraCommand::OrbitMove { dphi_degrees, dtheta_degrees })
    }

    /// Post a fling
    pub fn fling_camera(&self, vx: f32, vy: f32) -> bool {
        self.post(CameraCommand::Fling { vx, vy })
    }

    /// Post a pan
    pub fn move_camera_screen_coordinates(&self, dx: f32, dy: f32) -> bool {
        self.post(CameraCommand::Pan { dx, dy })
    }

    /// Post a zoom
    pub fn zoom_camera(&self, factor: f32) -> bool {
        self.post(CameraCommand::Zoom(factor))
    }

    /// Post a target frame change
    pub fn set_target_frame(&self, frame: Option<FrameId>) -> bool {
        self.post(CameraCommand::SetTargetFrame(frame))
    }

    /// Post a fixed frame change
    pub fn set_fixed_frame(&self, frame: Option<FrameId>) -> bool {
        self.post(CameraCommand::SetFixedFrame(frame))
    }
}

/// Receiving end, owned by the render loop
#[derive(Debug)]
pub struct CameraCommandQueue {
    sender: Sender<CameraCommand>,
    receiver: Receiver<CameraCommand>,
}

impl Default for CameraCommandQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl CameraCommandQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::channel();
        Self { sender, receiver }
    }

    /// A new handle posting into this queue
    pub fn handle(&self) -> CameraHandle {
        CameraHandle { sender: self.sender.clone() }
    }

    /// Apply every pending command in posting order.
    ///
    /// Rejected commands are logged and skipped. Returns the number of
    /// commands applied successfully.
    pub fn drain_into(&self, camera: &mut dyn Camera) -> usize {
        let mut applied = 0;
        for command in self.receiver.try_iter() {
            let description = format!("{:?}", command);
            match command.apply(camera) {
                Ok(()) => applied += 1,
                Err(e) => log::warn!("Dropped camera command {}: {}", description, e),
            }
        }
        applied
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::{OrbitCamera, MatrixStack, Viewport};
    use crate::foundation::math::{Mat4, constants::HALF_PI};
    use crate::transforms::FrameTransformTree;
    use approx::assert_relative_eq;
    use std::thread;

    #[test]
    fn test_commands_apply_in_order() {
        let queue = CameraCommandQueue::new();
        let handle = queue.handle();
        let mut camera = OrbitCamera::default();
        camera.set_orbit_angles(HALF_PI, 0.0);

        assert!(handle.zoom_camera(2.0));
        assert!(handle.zoom_camera(0.0));
        assert!(handle.move_orbit_position(90.0, 0.0));
        assert!(handle.set_target_frame(Some(FrameId::new("base"))));
        assert!(handle.set_target_frame(Some(FrameId::new(""))));

        assert_eq!(queue.drain_into(&mut camera), 3);
        assert_relative_eq!(camera.camera(), Vec3::new(0.0, 2.5, 0.0), epsilon = 1e-4);
        assert_eq!(camera.target_frame(), Some(&FrameId::new("base")));
    }

    #[test]
    fn test_handles_post_from_other_threads() {
        let queue = CameraCommandQueue::new();
        let workers: Vec<_> = (0..4)
            .map(|_| {
                let handle = queue.handle();
                thread::spawn(move || {
                    for _ in 0..10 {
                        handle.move_camera_screen_coordinates(0.01, 0.0);
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        let mut camera = OrbitCamera::default();
        assert_eq!(queue.drain_into(&mut camera), 40);
        assert_eq!(queue.drain_into(&mut camera), 0);
    }

    /// Camera without orbit support
    struct FixedCamera {
        fixed: FrameId,
        model: MatrixStack,
    }

    impl Camera for FixedCamera {
        fn apply(&mut self, _tree: &FrameTransformTree) {}
        fn view_matrix(&self) -> Mat4 {
            Mat4::identity()
        }
        fn projection_matrix(&self) -> Mat4 {
            Mat4::identity()
        }
        fn viewport(&self) -> Viewport {
            Viewport::default()
        }
        fn set_viewport(&mut self, _viewport: Viewport) {}
        fn move_camera_screen_coordinates(&mut self, _dx: f32, _dy: f32) {}
        fn set_camera(&mut self, _look_target: Vec3) {}
        fn camera(&self) -> Vec3 {
            Vec3::zeros()
        }
        fn look_target(&self) -> Vec3 {
            Vec3::zeros()
        }
        fn zoom_camera(&mut self, _factor: f32) -> Result<(), CameraError> {
            Ok(())
        }
        fn fixed_frame(&self) -> &FrameId {
            &self.fixed
        }
        fn set_fixed_frame(&mut self, frame: FrameId) -> Result<(), CameraError> {
            self.fixed = frame;
            Ok(())
        }
        fn reset_fixed_frame(&mut self) {}
        fn target_frame(&self) -> Option<&FrameId> {
            None
        }
        fn set_target_frame(&mut self, _frame: FrameId) -> Result<(), CameraError> {
            Ok(())
        }
        fn reset_target_frame(&mut self) {}
        fn model_stack(&self) -> &MatrixStack {
            &self.model
        }
        fn model_stack_mut(&mut self) -> &mut MatrixStack {
            &mut self.model
        }
    }

    #[test]
    fn test_orbit_commands_need_capability() {
        let mut camera = FixedCamera { fixed: FrameId::new("world"), model: MatrixStack::new() };
        let result = CameraCommand::Fling { vx: 10.0, vy: 0.0 }.apply(&mut camera);
        assert_eq!(result, Err(CameraError::Unsupported("fling")));
        assert!(CameraCommand::Pan { dx: 0.1, dy: 0.1 }.apply(&mut camera).is_ok());
    }
}
