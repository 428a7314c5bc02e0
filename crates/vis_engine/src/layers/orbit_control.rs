//! Orbit camera gesture control
//!
//! Translates touch gestures into camera commands:
//!
//! - scroll orbits the camera by a quarter degree per pixel
//! - fling starts a decaying orbit
//! - pinch zooms by the scale factor and pans by the movement of the pinch
//!   center, unless the camera is locked onto a target frame

use crate::camera::CameraHandle;
use crate::input::TouchEvent;
use crate::render::{DrawContext, Layer, LayerContext, LayerError};
use crate::transforms::FrameId;

/// Degrees of orbit per pixel of scroll
const TOUCH_ORBIT_COEFFICIENT: f32 = 0.25;

/// Pixels of pinch center movement per unit of screen-space pan
const PINCH_PAN_DIVISOR: f32 = 50.0;

/// Invisible layer turning gestures into camera commands
#[derive(Debug)]
pub struct OrbitControlLayer {
    camera: Option<CameraHandle>,
    scrolling_enabled: bool,
    previous_focus: (f32, f32),
}

impl Default for OrbitControlLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl OrbitControlLayer {
    /// Create the layer; it handles nothing until started
    pub fn new() -> Self {
        Self { camera: None, scrolling_enabled: true, previous_focus: (0.0, 0.0) }
    }

    /// Whether pinch gestures also pan
    pub fn scrolling_enabled(&self) -> bool {
        self.scrolling_enabled
    }

    /// Lock the camera onto `frame`, or release the lock with `None`.
    ///
    /// Pinch panning is disabled while locked.
    pub fn set_target_frame(&mut self, frame: Option<FrameId>) {
        self.scrolling_enabled = frame.is_none();
        if let Some(camera) = &self.camera {
            camera.set_target_frame(frame);
        }
    }

    /// Change the fixed frame, or restore the default with `None`
    pub fn set_fixed_frame(&self, frame: Option<FrameId>) {
        if let Some(camera) = &self.camera {
            camera.set_fixed_frame(frame);
        }
    }
}

impl Layer for OrbitControlLayer {
    fn name(&self) -> &str {
        "Orbit control"
    }

    fn draw(&mut self, _ctx: &mut DrawContext<'_>) -> Result<(), LayerError> {
        Ok(())
    }

    fn on_start(&mut self, ctx: &LayerContext) -> Result<(), LayerError> {
        self.camera = Some(ctx.camera.clone());
        Ok(())
    }

    fn on_shutdown(&mut self) {
        self.camera = None;
    }

    fn on_touch_event(&mut self, event: &TouchEvent) -> bool {
        let Some(camera) = &self.camera else {
            return false;
        };

        match *event {
            TouchEvent::Scroll { distance_x, distance_y } => {
                camera.move_orbit_position(
                    distance_x * TOUCH_ORBIT_COEFFICIENT,
                    distance_y * TOUCH_ORBIT_COEFFICIENT,
                );
            }
            TouchEvent::Fling { velocity_x, velocity_y } => {
                camera.fling_camera(velocity_x, velocity_y);
            }
            TouchEvent::ScaleBegin { focus_x, focus_y } => {
                self.previous_focus = (focus_x, focus_y);
            }
            TouchEvent::Scale { focus_x, focus_y, scale_factor } => {
                let (previous_x, previous_y) = self.previous_focus;
                if self.scrolling_enabled {
                    camera.move_camera_screen_coordinates(
                        (previous_x - focus_x) / PINCH_PAN_DIVISOR,
                        (previous_y - focus_y) / PINCH_PAN_DIVISOR,
                    );
                }
                self.previous_focus = (focus_x, focus_y);
                camera.zoom_camera(scale_factor);
            }
            TouchEvent::ScaleEnd => {}
            TouchEvent::LongPress { .. } => return false,
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::{Camera, CameraCommandQueue, OrbitCamera};
    use crate::render::SharedSelection;
    use crate::transforms::FrameTransformTree;
    use approx::assert_relative_eq;
    use std::sync::Arc;

    fn started_layer(queue: &CameraCommandQueue) -> OrbitControlLayer {
        let mut layer = OrbitControlLayer::new();
        let ctx = LayerContext {
            tree: Arc::new(FrameTransformTree::new()),
            camera: queue.handle(),
            selection: SharedSelection::default(),
        };
        layer.on_start(&ctx).unwrap();
        layer
    }

    #[test]
    fn test_ignores_events_before_start() {
        let mut layer = OrbitControlLayer::new();
        assert!(!layer.on_touch_event(&TouchEvent::Scroll { distance_x: 1.0, distance_y: 1.0 }));
    }

    #[test]
    fn test_scroll_orbits_quarter_degree_per_pixel() {
        let queue = CameraCommandQueue::new();
        let mut layer = started_layer(&queue);
        assert!(layer.on_touch_event(&TouchEvent::Scroll { distance_x: 360.0, distance_y: 0.0 }));

        let mut camera = OrbitCamera::default();
        let phi_before = camera.phi();
        assert_eq!(queue.drain_into(&mut camera), 1);
        assert_relative_eq!(camera.phi(), phi_before + 90f32.to_radians(), epsilon = 1e-5);
    }

    #[test]
    fn test_pinch_pans_and_zooms() {
        let queue = CameraCommandQueue::new();
        let mut layer = started_layer(&queue);
        layer.on_touch_event(&TouchEvent::ScaleBegin { focus_x: 100.0, focus_y: 100.0 });
        layer.on_touch_event(&TouchEvent::Scale { focus_x: 90.0, focus_y: 105.0, scale_factor: 2.0 });
        assert!(layer.on_touch_event(&TouchEvent::ScaleEnd));

        let mut camera = OrbitCamera::default();
        assert_eq!(queue.drain_into(&mut camera), 2);
        assert_relative_eq!(camera.orbit_radius(), 2.5);
        assert!(camera.look_target().norm() > 0.0);
    }

    #[test]
    fn test_target_lock_disables_pinch_pan() {
        let queue = CameraCommandQueue::new();
        let mut layer = started_layer(&queue);
        layer.set_target_frame(Some(FrameId::new("base")));
        assert!(!layer.scrolling_enabled());

        layer.on_touch_event(&TouchEvent::ScaleBegin { focus_x: 0.0, focus_y: 0.0 });
        layer.on_touch_event(&TouchEvent::Scale { focus_x: 50.0, focus_y: 50.0, scale_factor: 1.0 });

        let mut camera = OrbitCamera::default();
        assert_eq!(queue.drain_into(&mut camera), 2);
        assert_eq!(camera.target_frame(), Some(&FrameId::new("base")));
        assert_relative_eq!(camera.look_target(), crate::foundation::math::Vec3::zeros());

        layer.set_target_frame(None);
        assert!(layer.scrolling_enabled());
        queue.drain_into(&mut camera);
        assert!(camera.target_frame().is_none());
    }

    #[test]
    fn test_fling_and_long_press() {
        let queue = CameraCommandQueue::new();
        let mut layer = started_layer(&queue);
        assert!(layer.on_touch_event(&TouchEvent::Fling { velocity_x: -500.0, velocity_y: 0.0 }));
        assert!(!layer.on_touch_event(&TouchEvent::LongPress { x: 1, y: 1 }));

        let mut camera = OrbitCamera::default();
        queue.drain_into(&mut camera);
        assert_eq!(camera.fling_velocity(), (1.0, 0.0));

        layer.on_shutdown();
        assert!(!layer.on_touch_event(&TouchEvent::ScaleEnd));
    }
}
