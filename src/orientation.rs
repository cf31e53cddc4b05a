//! Orientation output conversions
//!
//! [`Orientation`] wraps the filter's unit quaternion and converts it on
//! demand. Conversions are pure and never touch filter state.
//!
//! # Euler convention
//!
//! Aerospace Z-Y-X: the body is yawed about earth Z, then pitched about the
//! new Y, then rolled about the new X. Angles are in radians with roll and
//! yaw in `(-π, π]` and pitch in `[-π/2, π/2]`.
//!
//! # Gimbal lock
//!
//! At pitch ±90° roll and yaw rotate about the same axis and only their
//! difference (pitch +90°) or sum (pitch -90°) is observable. When
//! `|sin(pitch)|` is within `1e-6` of 1 the conversion clamps pitch to
//! exactly ±π/2, forces yaw to 0 and reports the whole remaining rotation as
//! roll. Converting that result back yields the same rotation.

use core::f32::consts::FRAC_PI_2;

use nalgebra::{Matrix3, Rotation3, UnitQuaternion, Vector3};
#[cfg(not(test))]
use num_traits::Float;

use crate::compass;
use crate::math::Vector3Ext;
use crate::types::Convention;

/// `|sin(pitch)|` at or above which the gimbal-lock convention applies
pub const GIMBAL_LOCK_THRESHOLD: f32 = 1.0 - 1e-6;

/// Roll, pitch and yaw in radians
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EulerAngles {
    pub roll: f32,
    pub pitch: f32,
    pub yaw: f32,
}

impl EulerAngles {
    pub fn new(roll: f32, pitch: f32, yaw: f32) -> Self {
        Self { roll, pitch, yaw }
    }

    /// `(roll, pitch, yaw)` in degrees
    pub fn as_degrees(&self) -> Vector3<f32> {
        Vector3::new(self.roll, self.pitch, self.yaw).rad_to_deg()
    }
}

/// Output representation selected by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Representation {
    Quaternion,
    EulerAngles,
    RotationMatrix,
}

/// Orientation in the representation the caller asked for
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OrientationOutput {
    Quaternion(UnitQuaternion<f32>),
    EulerAngles(EulerAngles),
    RotationMatrix(Matrix3<f32>),
}

/// Body-to-earth rotation held as a unit quaternion
///
/// # Example
/// ```
/// use ins_ahrs::{EulerAngles, Orientation};
///
/// let orientation = Orientation::from_euler_angles(EulerAngles::new(0.1, -0.2, 1.0));
/// let euler = orientation.euler_angles();
/// assert!((euler.yaw - 1.0).abs() < 1e-5);
///
/// let matrix = orientation.rotation_matrix();
/// assert!((matrix.determinant() - 1.0).abs() < 1e-5);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Orientation(UnitQuaternion<f32>);

impl Default for Orientation {
    fn default() -> Self {
        Self::identity()
    }
}

impl From<UnitQuaternion<f32>> for Orientation {
    fn from(quaternion: UnitQuaternion<f32>) -> Self {
        Self(quaternion)
    }
}

impl Orientation {
    /// No rotation: body axes coincide with earth axes
    pub fn identity() -> Self {
        Self(UnitQuaternion::identity())
    }

    pub fn from_quaternion(quaternion: UnitQuaternion<f32>) -> Self {
        Self(quaternion)
    }

    pub fn from_euler_angles(euler: EulerAngles) -> Self {
        Self(UnitQuaternion::from_euler_angles(
            euler.roll,
            euler.pitch,
            euler.yaw,
        ))
    }

    /// Roll and pitch from a stationary accelerometer reading; yaw is zero.
    ///
    /// Returns `None` for a (near) zero reading.
    pub fn from_accelerometer(accelerometer: Vector3<f32>, convention: Convention) -> Option<Self> {
        // NED reads -z when level
        let up = accelerometer.checked_normalize()? * convention.up().z;
        let (roll, pitch) = compass::roll_pitch(up).unwrap_or_else(|| {
            // nose straight up or down: roll is unobservable
            (0.0, if up.x > 0.0 { -FRAC_PI_2 } else { FRAC_PI_2 })
        });
        Some(Self(UnitQuaternion::from_euler_angles(roll, pitch, 0.0)))
    }

    /// Full orientation from stationary accelerometer and magnetometer readings.
    ///
    /// Returns `None` when either reading is (near) zero or the field is
    /// parallel to gravity.
    pub fn from_accelerometer_magnetometer(
        accelerometer: Vector3<f32>,
        magnetometer: Vector3<f32>,
        convention: Convention,
    ) -> Option<Self> {
        let up = accelerometer.checked_normalize()?;
        let west = up.cross(&magnetometer).checked_normalize()?;
        let north = west.cross(&up);

        let body = Matrix3::from_columns(&[north, west, up]);
        let earth = Matrix3::from_columns(&[
            convention.north(),
            convention.west(),
            convention.up(),
        ]);
        let rotation = Rotation3::from_matrix_unchecked(earth * body.transpose());
        Some(Self(UnitQuaternion::from_rotation_matrix(&rotation)))
    }

    pub fn quaternion(&self) -> UnitQuaternion<f32> {
        self.0
    }

    /// Components as `[w, x, y, z]`
    pub fn as_array(&self) -> [f32; 4] {
        let q = self.0.quaternion();
        [q.w, q.i, q.j, q.k]
    }

    /// Body-to-earth rotation matrix
    pub fn rotation_matrix(&self) -> Matrix3<f32> {
        self.0.to_rotation_matrix().into_inner()
    }

    /// Whether the pitch is close enough to ±90° for the gimbal-lock convention
    pub fn is_gimbal_locked(&self) -> bool {
        self.sin_pitch().abs() >= GIMBAL_LOCK_THRESHOLD
    }

    /// Z-Y-X Euler angles, see the module docs for the gimbal-lock convention
    pub fn euler_angles(&self) -> EulerAngles {
        let q = self.0.quaternion();
        let (w, x, y, z) = (q.w, q.i, q.j, q.k);
        let sin_pitch = self.sin_pitch();

        if sin_pitch.abs() >= GIMBAL_LOCK_THRESHOLD {
            let r01 = 2.0 * (x * y - w * z);
            let r11 = 1.0 - 2.0 * (x * x + z * z);
            return if sin_pitch > 0.0 {
                EulerAngles::new(r01.atan2(r11), FRAC_PI_2, 0.0)
            } else {
                EulerAngles::new((-r01).atan2(r11), -FRAC_PI_2, 0.0)
            };
        }

        let roll = (2.0 * (y * z + w * x)).atan2(1.0 - 2.0 * (x * x + y * y));
        let pitch = sin_pitch.asin();
        let yaw = (2.0 * (x * y + w * z)).atan2(1.0 - 2.0 * (y * y + z * z));
        EulerAngles::new(roll, pitch, yaw)
    }

    /// Converts into the requested representation
    pub fn as_representation(&self, representation: Representation) -> OrientationOutput {
        match representation {
            Representation::Quaternion => OrientationOutput::Quaternion(self.0),
            Representation::EulerAngles => OrientationOutput::EulerAngles(self.euler_angles()),
            Representation::RotationMatrix => {
                OrientationOutput::RotationMatrix(self.rotation_matrix())
            }
        }
    }

    fn sin_pitch(&self) -> f32 {
        let q = self.0.quaternion();
        (2.0 * (q.w * q.j - q.i * q.k)).clamp(-1.0, 1.0)
    }
}
