//! Vector and quaternion primitives built on nalgebra
//!
//! # Rotation convention
//!
//! Orientation quaternions rotate body-frame vectors into the earth frame.
//! Products compose right to left in the body frame: `q ⊗ p` applies `p`
//! first, so a body-frame angular rate `ω` advances the orientation as
//! `q̇ = ½ · q ⊗ (0, ω)`. Every integration step in this crate uses that order.

use nalgebra::{Quaternion, Unit, UnitQuaternion, Vector3};

/// Mathematical constants
pub const DEG_TO_RAD: f32 = core::f32::consts::PI / 180.0;
pub const RAD_TO_DEG: f32 = 180.0 / core::f32::consts::PI;

/// Norms at or below this value are treated as degenerate
pub const NORM_EPSILON: f32 = 1e-6;

/// Extension trait for Vector3 operations
pub trait Vector3Ext {
    /// Unit vector in the same direction, or `None` when the norm is at or
    /// below [`NORM_EPSILON`]
    fn checked_normalize(&self) -> Option<Vector3<f32>>;

    /// Convert degrees to radians
    fn deg_to_rad(&self) -> Vector3<f32>;

    /// Convert radians to degrees
    fn rad_to_deg(&self) -> Vector3<f32>;
}

impl Vector3Ext for Vector3<f32> {
    fn checked_normalize(&self) -> Option<Vector3<f32>> {
        self.try_normalize(NORM_EPSILON)
    }

    fn deg_to_rad(&self) -> Vector3<f32> {
        *self * DEG_TO_RAD
    }

    fn rad_to_deg(&self) -> Vector3<f32> {
        *self * RAD_TO_DEG
    }
}

/// Rotation of `angle` radians about `axis`, or `None` for a degenerate axis
pub fn quaternion_from_axis_angle(axis: Vector3<f32>, angle: f32) -> Option<UnitQuaternion<f32>> {
    Unit::try_new(axis, NORM_EPSILON).map(|axis| UnitQuaternion::from_axis_angle(&axis, angle))
}

/// Renormalizes a quaternion, or `None` when it has collapsed to (near) zero
pub fn normalize_quaternion(quaternion: Quaternion<f32>) -> Option<UnitQuaternion<f32>> {
    UnitQuaternion::try_new(quaternion, NORM_EPSILON)
}

/// One first-order integration step of a body-frame angular rate
///
/// Returns `q + ½ · q ⊗ (0, ω) · Δt` without renormalizing, so the caller can
/// inspect the raw result before restoring unit length.
pub fn integrate_body_rate(
    quaternion: &UnitQuaternion<f32>,
    angular_rate: &Vector3<f32>,
    delta_time: f32,
) -> Quaternion<f32> {
    let rate = Quaternion::from_parts(0.0, *angular_rate * 0.5);
    let derivative = quaternion.as_ref() * rate;
    quaternion.as_ref() + derivative * delta_time
}

/// Wraps an angle in degrees into `[0, 360)`
pub fn wrap_degrees_360(angle: f32) -> f32 {
    let mut wrapped = angle % 360.0;
    if wrapped < 0.0 {
        wrapped += 360.0;
    }
    // -tiny + 360 rounds up to 360
    if wrapped >= 360.0 {
        wrapped -= 360.0;
    }
    wrapped
}

/// Wraps an angle in degrees into `(-180, 180]`
pub fn wrap_degrees_180(angle: f32) -> f32 {
    let wrapped = wrap_degrees_360(angle);
    if wrapped > 180.0 {
        wrapped - 360.0
    } else {
        wrapped
    }
}
