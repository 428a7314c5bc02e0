//! # Orbit Camera
//!
//! Camera parameterized by a look target, an orbit radius and two spherical
//! angles. Position is derived as
//!
//! ```text
//! location = look_target + r * (sin θ cos φ, sin θ sin φ, cos θ)
//! ```
//!
//! with +Z up. θ is kept away from the poles so the view never flips, φ wraps
//! into `[0, 2π)`.

use crate::config::CameraConfig;
use crate::foundation::math::{Mat4, Mat4Ext, Vec3, constants::HALF_PI, utils};
use crate::transforms::{FrameId, FrameTransformTree};

use super::{Camera, CameraError, MatrixStack, OrbitControl, PanPolicy, Viewport};

/// Smallest polar angle (about 0.5 degrees)
pub const MIN_THETA: f32 = 0.008_726_646_26;

/// Largest polar angle (about 179.5 degrees)
pub const MAX_THETA: f32 = 3.132_866_01;

/// Gesture velocities (pixels per second) are divided by this before use
const FLING_VELOCITY_DIVISOR: f32 = 500.0;

/// Pan distance scale per unit of orbit radius
const TRANSLATION_SCALE_PER_RADIUS: f32 = 1.0 / 6.0;

/// Orbit camera with optional frame tracking
#[derive(Debug, Clone)]
pub struct OrbitCamera {
    config: CameraConfig,

    orbit_radius: f32,
    theta: f32,
    phi: f32,
    location: Vec3,
    look_target: Vec3,

    /// Fling angular velocities in degrees per frame
    v_theta: f32,
    v_phi: f32,

    translation_scale: f32,
    view: Mat4,
    viewport: Viewport,

    default_fixed_frame: FrameId,
    fixed_frame: FrameId,
    target_frame: Option<FrameId>,

    model: MatrixStack,
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self::new(CameraConfig::default())
    }
}

impl OrbitCamera {
    /// Create a camera from configuration, looking at the fixed frame origin
    pub fn new(config: CameraConfig) -> Self {
        let default_fixed_frame = FrameId::new(&config.default_fixed_frame);
        let mut camera = Self {
            orbit_radius: config.orbit_radius,
            theta: utils::cap(config.theta, MIN_THETA, MAX_THETA),
            phi: utils::wrap_angle(config.phi),
            location: Vec3::zeros(),
            look_target: Vec3::zeros(),
            v_theta: 0.0,
            v_phi: 0.0,
            translation_scale: config.orbit_radius * TRANSLATION_SCALE_PER_RADIUS,
            view: Mat4::identity(),
            viewport: Viewport::default(),
            fixed_frame: default_fixed_frame.clone(),
            default_fixed_frame,
            target_frame: None,
            model: MatrixStack::new(),
            config,
        };
        camera.update_location();
        camera.rotate_orbit();
        camera
    }

    /// Polar angle in radians
    pub fn theta(&self) -> f32 {
        self.theta
    }

    /// Azimuth in radians
    pub fn phi(&self) -> f32 {
        self.phi
    }

    /// Distance from the look target
    pub fn orbit_radius(&self) -> f32 {
        self.orbit_radius
    }

    /// Fling velocity as `(v_phi, v_theta)`
    pub fn fling_velocity(&self) -> (f32, f32) {
        (self.v_phi, self.v_theta)
    }

    /// Set both orbit angles directly (radians); they are clamped and wrapped
    pub fn set_orbit_angles(&mut self, theta: f32, phi: f32) {
        self.theta = utils::cap(theta, MIN_THETA, MAX_THETA);
        self.phi = utils::wrap_angle(phi);
        self.update_location();
    }

    /// Pan policy in effect
    pub fn pan_policy(&self) -> PanPolicy {
        self.config.pan_policy
    }

    /// Change the pan policy
    pub fn set_pan_policy(&mut self, policy: PanPolicy) {
        self.config.pan_policy = policy;
    }

    fn update_location(&mut self) {
        let (sin_theta, cos_theta) = self.theta.sin_cos();
        let (sin_phi, cos_phi) = self.phi.sin_cos();
        self.location = self.look_target
            + self.orbit_radius * Vec3::new(sin_theta * cos_phi, sin_theta * sin_phi, cos_theta);
    }

    fn rotate_orbit(&mut self) {
        self.view = Mat4::look_at(self.location, self.look_target, Vec3::z());
    }

    fn velocity_update(&mut self) {
        if self.v_theta != 0.0 || self.v_phi != 0.0 {
            self.move_orbit_position(self.v_phi, self.v_theta);
            self.v_theta *= self.config.fling_decay;
            self.v_phi *= self.config.fling_decay;
        }

        if self.v_theta.abs() < self.config.min_fling_velocity {
            self.v_theta = 0.0;
        }
        if self.v_phi.abs() < self.config.min_fling_velocity {
            self.v_phi = 0.0;
        }
    }

    fn track_target_frame(&mut self, tree: &FrameTransformTree) {
        let Some(target) = &self.target_frame else {
            return;
        };
        match tree.new_transform_if_possible(&self.fixed_frame, target) {
            Some(transform) => {
                self.look_target = transform.translation * self.config.target_tracking_scale;
            }
            None => {
                log::trace!(
                    "No transform from {} to {} yet, holding look target",
                    target,
                    self.fixed_frame
                );
            }
        }
    }
}

impl Camera for OrbitCamera {
    fn apply(&mut self, tree: &FrameTransformTree) {
        self.velocity_update();
        self.track_target_frame(tree);
        self.update_location();
        self.rotate_orbit();
        log::trace!("Camera at {:?} looking at {:?}", self.location, self.look_target);
    }

    fn view_matrix(&self) -> Mat4 {
        self.view
    }

    fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective(
            utils::deg_to_rad(self.config.fov_degrees),
            self.viewport.aspect_ratio(),
            self.config.near,
            self.config.far,
        )
    }

    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn set_viewport(&mut self, viewport: Viewport) {
        if viewport != self.viewport {
            log::info!("Viewport changed to {}x{}", viewport.width, viewport.height);
        }
        self.viewport = viewport;
    }

    fn move_camera_screen_coordinates(&mut self, dx: f32, dy: f32) {
        let max = self.config.max_translate_speed;
        let x = utils::cap(dx, -max, max) * self.translation_scale;
        let y = utils::cap(dy, -max, max) * self.translation_scale;

        // Rotate the screen delta by the azimuth so panning follows the view
        let phi = self.phi;
        let delta = Vec3::new(
            (phi - HALF_PI).cos() * x - (phi + HALF_PI).sin() * y,
            (phi - HALF_PI).sin() * x + (phi + HALF_PI).cos() * y,
            0.0,
        );
        self.look_target -= delta;

        if self.config.pan_policy == PanPolicy::ReleaseTargetFrame && self.target_frame.is_some() {
            log::debug!("Pan released target frame lock");
            self.target_frame = None;
        }
        self.update_location();
    }

    fn set_camera(&mut self, look_target: Vec3) {
        self.reset_target_frame();
        self.look_target = look_target;
        self.update_location();
    }

    fn camera(&self) -> Vec3 {
        self.location
    }

    fn look_target(&self) -> Vec3 {
        self.look_target
    }

    fn zoom_camera(&mut self, factor: f32) -> Result<(), CameraError> {
        if !(factor.is_finite() && factor > 0.0) {
            return Err(CameraError::InvalidZoomFactor(factor));
        }
        self.orbit_radius /= factor;
        self.translation_scale = self.orbit_radius * TRANSLATION_SCALE_PER_RADIUS;
        self.update_location();
        Ok(())
    }

    fn fixed_frame(&self) -> &FrameId {
        &self.fixed_frame
    }

    fn set_fixed_frame(&mut self, frame: FrameId) -> Result<(), CameraError> {
        if frame.is_empty() {
            return Err(CameraError::EmptyFrame);
        }
        log::debug!("Fixed frame set to {}", frame);
        self.fixed_frame = frame;
        Ok(())
    }

    fn reset_fixed_frame(&mut self) {
        self.fixed_frame = self.default_fixed_frame.clone();
    }

    fn target_frame(&self) -> Option<&FrameId> {
        self.target_frame.as_ref()
    }

    fn set_target_frame(&mut self, frame: FrameId) -> Result<(), CameraError> {
        if frame.is_empty() {
            return Err(CameraError::EmptyFrame);
        }
        log::debug!("Camera locked onto {}", frame);
        self.target_frame = Some(frame);
        Ok(())
    }

    fn reset_target_frame(&mut self) {
        self.target_frame = None;
    }

    fn model_stack(&self) -> &MatrixStack {
        &self.model
    }

    fn model_stack_mut(&mut self) -> &mut MatrixStack {
        &mut self.model
    }

    fn as_orbit_control(&mut self) -> Option<&mut dyn OrbitControl> {
        Some(self)
    }
}

impl OrbitControl for OrbitCamera {
    fn move_orbit_position(&mut self, dphi_degrees: f32, dtheta_degrees: f32) {
        self.phi = utils::wrap_angle(self.phi + utils::deg_to_rad(dphi_degrees));
        self.theta = utils::cap(self.theta + utils::deg_to_rad(dtheta_degrees), MIN_THETA, MAX_THETA);
        self.update_location();
    }

    fn fling_camera(&mut self, vx: f32, vy: f32) {
        let max = self.config.max_fling_velocity;
        self.v_phi = utils::cap(-vx / FLING_VELOCITY_DIVISOR, -max, max);
        self.v_theta = utils::cap(-vy / FLING_VELOCITY_DIVISOR, -max, max);
    }

    fn reset_zoom(&mut self) {
        self.orbit_radius = self.config.orbit_radius;
        self.translation_scale = self.orbit_radius * TRANSLATION_SCALE_PER_RADIUS;
        self.update_location();
    }

    fn reset_look_target(&mut self) {
        self.look_target = Vec3::zeros();
        self.update_location();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::{Quat, RigidTransform, constants::{PI, TAU}};
    use approx::assert_relative_eq;

    const EPSILON: f32 = 1e-4;

    fn camera_at(theta: f32, phi: f32) -> OrbitCamera {
        let mut camera = OrbitCamera::default();
        camera.set_orbit_angles(theta, phi);
        camera
    }

    #[test]
    fn test_orbit_position_equator() {
        let camera = camera_at(HALF_PI, 0.0);
        assert_relative_eq!(camera.camera(), Vec3::new(5.0, 0.0, 0.0), epsilon = EPSILON);
    }

    #[test]
    fn test_orbit_move_quarter_turn() {
        let mut camera = camera_at(HALF_PI, 0.0);
        camera.move_orbit_position(90.0, 0.0);
        assert_relative_eq!(camera.phi(), HALF_PI, epsilon = EPSILON);
        assert_relative_eq!(camera.camera(), Vec3::new(0.0, 5.0, 0.0), epsilon = EPSILON);
    }

    #[test]
    fn test_theta_clamped() {
        let mut camera = camera_at(HALF_PI, 0.0);
        camera.move_orbit_position(0.0, 10_000.0);
        assert_eq!(camera.theta(), MAX_THETA);
        camera.move_orbit_position(0.0, -10_000.0);
        assert_eq!(camera.theta(), MIN_THETA);

        for delta in [-270.0, -45.0, 0.0, 12.5, 181.0] {
            camera.move_orbit_position(0.0, delta);
            assert!(camera.theta() >= MIN_THETA && camera.theta() <= MAX_THETA);
        }
    }

    #[test]
    fn test_phi_wraps() {
        let mut camera = camera_at(HALF_PI, 0.0);
        camera.move_orbit_position(-90.0, 0.0);
        assert_relative_eq!(camera.phi(), 1.5 * PI, epsilon = EPSILON);
        camera.move_orbit_position(720.0, 0.0);
        assert!(camera.phi() >= 0.0 && camera.phi() < TAU);
    }

    #[test]
    fn test_fling_decays_exponentially_and_snaps_to_zero() {
        let tree = FrameTransformTree::new();
        let mut camera = OrbitCamera::default();
        camera.fling_camera(-1000.0, 0.0);
        let v0 = camera.fling_velocity().0;
        assert_relative_eq!(v0, 2.0, epsilon = EPSILON);

        let mut expected = v0;
        let mut frames = 0;
        while camera.fling_velocity().0 != 0.0 {
            camera.apply(&tree);
            expected *= 0.9;
            frames += 1;
            let (v_phi, _) = camera.fling_velocity();
            if expected >= 0.05 {
                assert_relative_eq!(v_phi, expected, epsilon = EPSILON);
            } else {
                assert_eq!(v_phi, 0.0);
            }
            assert!(frames < 100);
        }
        // 2.0 * 0.9^n < 0.05 first holds at n = 36
        assert_eq!(frames, 36);
    }

    #[test]
    fn test_fling_is_capped() {
        let mut camera = OrbitCamera::default();
        camera.fling_camera(1.0e9, -1.0e9);
        assert_eq!(camera.fling_velocity(), (-25.0, 25.0));
    }

    #[test]
    fn test_pan_follows_azimuth() {
        let mut camera = camera_at(HALF_PI, 0.0);
        camera.move_camera_screen_coordinates(0.1, 0.0);
        let scale = 5.0 / 6.0;
        // phi = 0: screen x maps to world +y, subtracted from the target
        assert_relative_eq!(camera.look_target(), Vec3::new(0.0, 0.1 * scale, 0.0), epsilon = EPSILON);
    }

    #[test]
    fn test_pan_delta_is_capped() {
        let mut camera = camera_at(HALF_PI, 0.0);
        camera.move_camera_screen_coordinates(100.0, 0.0);
        let scale = 5.0 / 6.0;
        assert_relative_eq!(camera.look_target().norm(), 0.18 * scale, epsilon = EPSILON);
    }

    #[test]
    fn test_pan_policy_release() {
        let mut camera = OrbitCamera::default();
        camera.set_target_frame(FrameId::new("base")).unwrap();
        assert_eq!(camera.mode(), crate::camera::CameraMode::FrameLocked);
        camera.move_camera_screen_coordinates(0.1, 0.1);
        assert!(camera.target_frame().is_none());
    }

    #[test]
    fn test_pan_policy_keep() {
        let mut camera = OrbitCamera::default();
        camera.set_pan_policy(PanPolicy::KeepTargetFrame);
        camera.set_target_frame(FrameId::new("base")).unwrap();
        camera.move_camera_screen_coordinates(0.1, 0.1);
        assert_eq!(camera.target_frame(), Some(&FrameId::new("base")));
    }

    #[test]
    fn test_zoom() {
        let mut camera = camera_at(HALF_PI, 0.0);
        camera.zoom_camera(2.0).unwrap();
        assert_relative_eq!(camera.orbit_radius(), 2.5, epsilon = EPSILON);
        assert_relative_eq!(camera.camera(), Vec3::new(2.5, 0.0, 0.0), epsilon = EPSILON);

        assert_eq!(camera.zoom_camera(0.0), Err(CameraError::InvalidZoomFactor(0.0)));
        assert!(camera.zoom_camera(-1.0).is_err());
        assert!(camera.zoom_camera(f32::NAN).is_err());
        assert_relative_eq!(camera.orbit_radius(), 2.5, epsilon = EPSILON);

        camera.reset_zoom();
        assert_relative_eq!(camera.orbit_radius(), 5.0, epsilon = EPSILON);
    }

    #[test]
    fn test_frame_lock_tracks_half_translation() {
        let tree = FrameTransformTree::new();
        tree.update_transform("world", "base", RigidTransform::from_translation(Vec3::new(4.0, 2.0, 0.0)), 0.0);

        let mut camera = OrbitCamera::default();
        camera.set_target_frame(FrameId::new("base")).unwrap();
        camera.apply(&tree);
        assert_relative_eq!(camera.look_target(), Vec3::new(2.0, 1.0, 0.0), epsilon = EPSILON);
    }

    #[test]
    fn test_frame_lock_follows_rotated_parent() {
        // base sits at (1, 0, 0) turned 90 degrees about Z; sensor is 1 m
        // along base's X axis, which points along world Y
        let tree = FrameTransformTree::new();
        tree.update_transform(
            "world",
            "base",
            RigidTransform::new(Vec3::new(1.0, 0.0, 0.0), Quat::from_axis_angle(&Vec3::z_axis(), HALF_PI)),
            0.0,
        );
        tree.update_transform("base", "sensor", RigidTransform::from_translation(Vec3::x()), 0.0);

        let mut camera = OrbitCamera::default();
        camera.set_target_frame(FrameId::new("sensor")).unwrap();
        camera.apply(&tree);
        assert_relative_eq!(camera.look_target(), Vec3::new(0.5, 0.5, 0.0), epsilon = EPSILON);
    }

    #[test]
    fn test_frame_lock_holds_target_when_missing() {
        let tree = FrameTransformTree::new();
        let mut camera = OrbitCamera::default();
        camera.set_camera(Vec3::new(1.0, 1.0, 0.0));
        camera.set_target_frame(FrameId::new("not_yet_published")).unwrap();
        camera.apply(&tree);
        assert_relative_eq!(camera.look_target(), Vec3::new(1.0, 1.0, 0.0), epsilon = EPSILON);
    }

    #[test]
    fn test_set_camera_releases_lock() {
        let mut camera = OrbitCamera::default();
        camera.set_target_frame(FrameId::new("base")).unwrap();
        camera.set_camera(Vec3::new(0.0, 0.0, 1.0));
        assert!(camera.target_frame().is_none());
        assert_relative_eq!(camera.look_target(), Vec3::new(0.0, 0.0, 1.0), epsilon = EPSILON);
    }

    #[test]
    fn test_frame_validation() {
        let mut camera = OrbitCamera::default();
        assert_eq!(camera.set_fixed_frame(FrameId::new("/")), Err(CameraError::EmptyFrame));
        assert_eq!(camera.set_target_frame(FrameId::new("")), Err(CameraError::EmptyFrame));
        assert_eq!(camera.fixed_frame(), &FrameId::new("world"));

        camera.set_fixed_frame(FrameId::new("odom")).unwrap();
        assert_eq!(camera.fixed_frame(), &FrameId::new("odom"));
        camera.reset_fixed_frame();
        assert_eq!(camera.fixed_frame(), &FrameId::new("/world"));
    }

    #[test]
    fn test_view_matrix_maps_target_in_front() {
        let tree = FrameTransformTree::new();
        let mut camera = camera_at(HALF_PI, 0.0);
        camera.apply(&tree);
        let target_in_view = camera.view_matrix().transform_point(&crate::foundation::math::Point3::origin());
        assert_relative_eq!(target_in_view.z, -5.0, epsilon = EPSILON);
    }

    #[test]
    fn test_orbit_capability() {
        let mut camera = OrbitCamera::default();
        let dynamic: &mut dyn Camera = &mut camera;
        assert!(dynamic.as_orbit_control().is_some());
    }
}
