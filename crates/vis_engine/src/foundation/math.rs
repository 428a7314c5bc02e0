//! Math utilities and types
//!
//! Provides the vector, quaternion and matrix aliases used by the transform
//! tree, the camera and the renderer, plus the rigid transform type that the
//! transform tree composes.

pub use nalgebra::{
    Vector2, Vector3, Vector4,
    Matrix3, Matrix4,
    Quaternion,
    Unit, UnitQuaternion,
};

/// 2D vector type
pub type Vec2 = Vector2<f32>;

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4D vector type
pub type Vec4 = Vector4<f32>;

/// 3x3 matrix type
pub type Mat3 = Matrix3<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// 3D point type
pub type Point3 = nalgebra::Point3<f32>;

/// Quaternion type for rotations
pub type Quat = UnitQuaternion<f32>;

/// Rigid transform: a translation followed by a rotation, no scale or shear.
///
/// A transform stored on the edge `parent -> child` maps coordinates expressed
/// in the child frame into the parent frame. Composition follows matrix
/// order: `a.multiply(&b)` applies `b` first, then `a`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RigidTransform {
    /// Translation component
    pub translation: Vec3,

    /// Rotation component
    pub rotation: Quat,
}

impl Default for RigidTransform {
    fn default() -> Self {
        Self::identity()
    }
}

impl RigidTransform {
    /// Create a transform from translation and rotation
    pub fn new(translation: Vec3, rotation: Quat) -> Self {
        Self { translation, rotation }
    }

    /// The identity transform
    pub fn identity() -> Self {
        Self {
            translation: Vec3::zeros(),
            rotation: Quat::identity(),
        }
    }

    /// Create a transform with only translation
    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            rotation: Quat::identity(),
        }
    }

    /// Create a transform with only rotation
    pub fn from_rotation(rotation: Quat) -> Self {
        Self {
            translation: Vec3::zeros(),
            rotation,
        }
    }

    /// Build a transform from raw quaternion components as they arrive in
    /// transform messages.
    ///
    /// An all-zero quaternion is treated as identity; anything else is
    /// normalized.
    pub fn from_components(translation: Vec3, qx: f32, qy: f32, qz: f32, qw: f32) -> Self {
        let raw = Quaternion::new(qw, qx, qy, qz);
        let rotation = if raw.norm_squared() == 0.0 {
            Quat::identity()
        } else {
            Quat::from_quaternion(raw)
        };
        Self { translation, rotation }
    }

    /// Compose two transforms: the result applies `other` first, then `self`.
    pub fn multiply(&self, other: &RigidTransform) -> RigidTransform {
        RigidTransform {
            translation: self.translation + self.rotation * other.translation,
            rotation: self.rotation * other.rotation,
        }
    }

    /// Get the inverse transform
    pub fn inverse(&self) -> RigidTransform {
        let inv_rotation = self.rotation.inverse();
        RigidTransform {
            translation: inv_rotation * (-self.translation),
            rotation: inv_rotation,
        }
    }

    /// Apply this transform to a point
    pub fn transform_point(&self, point: &Point3) -> Point3 {
        Point3::from(self.rotation * point.coords + self.translation)
    }

    /// Apply only the rotation to a direction vector
    pub fn transform_vector(&self, vector: &Vec3) -> Vec3 {
        self.rotation * vector
    }

    /// Convert to a homogeneous matrix (translation * rotation)
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::new_translation(&self.translation) * self.rotation.to_homogeneous()
    }

    /// Rotation angle in radians, in `[0, PI]`
    pub fn rotation_angle(&self) -> f32 {
        self.rotation.angle()
    }

    /// Rotation axis, `None` when the rotation is (numerically) the identity
    pub fn rotation_axis(&self) -> Option<Vec3> {
        self.rotation.axis().map(|axis| axis.into_inner())
    }

    /// Check whether both components are the identity within `epsilon`
    pub fn is_identity(&self, epsilon: f32) -> bool {
        approx::relative_eq!(self.translation, Vec3::zeros(), epsilon = epsilon)
            && self.rotation.angle() <= epsilon
    }
}

/// Math constants
pub mod constants {
    /// Pi constant
    pub const PI: f32 = std::f32::consts::PI;

    /// 2 * Pi
    pub const TAU: f32 = 2.0 * PI;

    /// Pi / 2
    pub const HALF_PI: f32 = PI * 0.5;

    /// Degrees to radians conversion factor
    pub const DEG_TO_RAD: f32 = PI / 180.0;

    /// Radians to degrees conversion factor
    pub const RAD_TO_DEG: f32 = 180.0 / PI;
}

/// Math utility functions
pub mod utils {
    use super::constants;

    /// Convert degrees to radians
    pub fn deg_to_rad(degrees: f32) -> f32 {
        degrees * constants::DEG_TO_RAD
    }

    /// Convert radians to degrees
    pub fn rad_to_deg(radians: f32) -> f32 {
        radians * constants::RAD_TO_DEG
    }

    /// Clamp a value between min and max
    pub fn cap(value: f32, min: f32, max: f32) -> f32 {
        if value > max { max } else if value < min { min } else { value }
    }

    /// Wrap an angle in radians into `[0, 2*PI)`
    pub fn wrap_angle(angle: f32) -> f32 {
        let wrapped = angle.rem_euclid(constants::TAU);
        // rem_euclid can round up to exactly TAU for tiny negative inputs
        if wrapped >= constants::TAU { 0.0 } else { wrapped }
    }
}

/// Extension trait for Mat4 with additional convenience methods
pub trait Mat4Ext {
    /// Create a perspective projection matrix (GL clip space, depth in [-1, 1])
    fn perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4;

    /// Create a look-at view matrix
    fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Mat4;
}

impl Mat4Ext for Mat4 {
    fn perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
        let f = 1.0 / (fov_y * 0.5).tan();

        let mut result = Mat4::zeros();
        result[(0, 0)] = f / aspect;
        result[(1, 1)] = f;
        result[(2, 2)] = (far + near) / (near - far);
        result[(2, 3)] = (2.0 * far * near) / (near - far);
        result[(3, 2)] = -1.0;

        result
    }

    fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Mat4 {
        // Right-handed, camera looks down its local -Z
        let forward = (target - eye).normalize();
        let right = forward.cross(&up).normalize();
        let camera_up = right.cross(&forward);

        let translation = Mat4::new(
            1.0, 0.0, 0.0, -eye.x,
            0.0, 1.0, 0.0, -eye.y,
            0.0, 0.0, 1.0, -eye.z,
            0.0, 0.0, 0.0, 1.0,
        );

        let rotation = Mat4::new(
            right.x, right.y, right.z, 0.0,
            camera_up.x, camera_up.y, camera_up.z, 0.0,
            -forward.x, -forward.y, -forward.z, 0.0,
            0.0, 0.0, 0.0, 1.0,
        );

        rotation * translation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::constants::{PI, TAU, HALF_PI};
    use super::utils::{wrap_angle, cap};
    use approx::assert_relative_eq;

    const EPSILON: f32 = 1e-5;

    #[test]
    fn test_wrap_angle_range() {
        for &angle in &[-100.0, -TAU, -PI, -0.001, 0.0, 0.5, PI, TAU, 7.5, 1000.0] {
            let wrapped = wrap_angle(angle);
            assert!(wrapped >= 0.0 && wrapped < TAU, "{} wrapped to {}", angle, wrapped);
        }
    }

    #[test]
    fn test_wrap_angle_periodic() {
        for k in -3..=3 {
            let shifted = 1.25 + TAU * k as f32;
            assert_relative_eq!(wrap_angle(shifted), wrap_angle(1.25), epsilon = 1e-4);
        }
    }

    #[test]
    fn test_cap() {
        assert_eq!(cap(5.0, -1.0, 1.0), 1.0);
        assert_eq!(cap(-5.0, -1.0, 1.0), -1.0);
        assert_eq!(cap(0.25, -1.0, 1.0), 0.25);
    }

    #[test]
    fn test_multiply_then_inverse_is_identity() {
        let a = RigidTransform::new(
            Vec3::new(1.0, -2.0, 0.5),
            Quat::from_axis_angle(&Vec3::z_axis(), 0.7),
        );
        let b = RigidTransform::new(
            Vec3::new(0.0, 3.0, 1.0),
            Quat::from_axis_angle(&Vec3::x_axis(), -1.1),
        );
        let composed = a.multiply(&b);
        let round_trip = composed.multiply(&composed.inverse());
        assert!(round_trip.is_identity(EPSILON));
    }

    #[test]
    fn test_multiply_applies_right_operand_first() {
        // Rotate 90 degrees about Z, then translate along X
        let translate = RigidTransform::from_translation(Vec3::new(1.0, 0.0, 0.0));
        let rotate = RigidTransform::from_rotation(Quat::from_axis_angle(&Vec3::z_axis(), HALF_PI));
        let composed = translate.multiply(&rotate);

        let p = composed.transform_point(&Point3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(p, Point3::new(1.0, 1.0, 0.0), epsilon = EPSILON);
    }

    #[test]
    fn test_to_matrix_matches_transform_point() {
        let t = RigidTransform::new(
            Vec3::new(0.5, 0.25, -1.0),
            Quat::from_axis_angle(&Vec3::y_axis(), 0.3),
        );
        let p = Point3::new(2.0, -1.0, 4.0);
        assert_relative_eq!(t.to_matrix().transform_point(&p), t.transform_point(&p), epsilon = EPSILON);
    }

    #[test]
    fn test_zero_quaternion_becomes_identity() {
        let t = RigidTransform::from_components(Vec3::zeros(), 0.0, 0.0, 0.0, 0.0);
        assert!(t.is_identity(EPSILON));
    }

    #[test]
    fn test_rotation_axis_none_for_identity() {
        assert!(RigidTransform::identity().rotation_axis().is_none());
        let t = RigidTransform::from_rotation(Quat::from_axis_angle(&Vec3::z_axis(), 1.0));
        assert_relative_eq!(t.rotation_axis().unwrap(), Vec3::z(), epsilon = EPSILON);
    }
}
