//! Tilt-compensated compass
//!
//! Stateless heading computation from a magnetometer reading and either an
//! accelerometer reading or a roll/pitch snapshot.
//!
//! Body axes: x forward, z such that a level stationary accelerometer reads
//! `+z`. Roll and pitch are taken from gravity, the magnetic vector is
//! rotated back into the horizontal plane and the heading is the angle of
//! its horizontal projection.

use nalgebra::Vector3;
#[cfg(not(test))]
use num_traits::Float;

use crate::calibration::CalibrationParams;
use crate::math::{NORM_EPSILON, RAD_TO_DEG, wrap_degrees_180, wrap_degrees_360};

/// Interval headings are reported in
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum HeadingRange {
    /// `[0, 360)`
    #[default]
    ZeroTo360,
    /// `(-180, 180]`
    PlusMinus180,
}

/// Compass settings
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CompassSettings {
    pub range: HeadingRange,
    /// Magnetic declination in degrees, added to the magnetic heading
    pub declination: f32,
}

/// Result of a heading computation, angles in degrees
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeadingResult {
    pub heading: f32,
    pub roll: f32,
    pub pitch: f32,
    /// `false` when the level fallback was used
    pub tilt_compensated: bool,
}

/// Roll and pitch in radians from a stationary accelerometer reading.
///
/// Returns `None` when the reading is (near) zero or the pitch is at ±90°,
/// where roll is undefined.
pub fn roll_pitch(accelerometer: Vector3<f32>) -> Option<(f32, f32)> {
    let norm = accelerometer.norm();
    if norm <= NORM_EPSILON {
        return None;
    }

    let (ax, ay, az) = (accelerometer.x, accelerometer.y, accelerometer.z);
    if (ay * ay + az * az).sqrt() < NORM_EPSILON * norm {
        return None;
    }

    let roll = ay.atan2(az);
    let pitch = (-ax).atan2(ay * roll.sin() + az * roll.cos());
    Some((roll, pitch))
}

/// Heading from raw readings using default [`CompassSettings`].
///
/// The magnetometer and accelerometer calibrations are applied first.
///
/// # Example
/// ```
/// use nalgebra::Vector3;
/// use ins_ahrs::CalibrationParams;
/// use ins_ahrs::compass::heading;
///
/// let result = heading(
///     Vector3::new(0.0, 20.0, -40.0),
///     Vector3::new(0.0, 0.0, 1.0),
///     &CalibrationParams::default(),
/// );
/// assert!((result.heading - 90.0).abs() < 1e-4);
/// assert!(result.tilt_compensated);
/// ```
pub fn heading(
    magnetometer: Vector3<f32>,
    accelerometer: Vector3<f32>,
    calibration: &CalibrationParams,
) -> HeadingResult {
    heading_with_settings(
        magnetometer,
        accelerometer,
        calibration,
        &CompassSettings::default(),
    )
}

/// Heading from raw readings with explicit settings
pub fn heading_with_settings(
    magnetometer: Vector3<f32>,
    accelerometer: Vector3<f32>,
    calibration: &CalibrationParams,
    settings: &CompassSettings,
) -> HeadingResult {
    let magnetometer = calibration.magnetometer.apply_magnetic(magnetometer);
    let accelerometer = calibration.accelerometer.apply(accelerometer);

    match roll_pitch(accelerometer) {
        Some((roll, pitch)) => heading_from_attitude(magnetometer, roll, pitch, settings),
        None => HeadingResult {
            heading: finish(magnetometer.y.atan2(magnetometer.x), settings),
            roll: 0.0,
            pitch: 0.0,
            tilt_compensated: false,
        },
    }
}

/// Heading from a calibrated magnetometer reading and a roll/pitch snapshot
/// in radians, e.g. the fusion filter's Euler angles.
pub fn heading_from_attitude(
    magnetometer: Vector3<f32>,
    roll: f32,
    pitch: f32,
    settings: &CompassSettings,
) -> HeadingResult {
    let (sin_roll, cos_roll) = roll.sin_cos();
    let (sin_pitch, cos_pitch) = pitch.sin_cos();
    let (mx, my, mz) = (magnetometer.x, magnetometer.y, magnetometer.z);

    let horizontal_x = mx * cos_pitch + my * sin_pitch * sin_roll + mz * sin_pitch * cos_roll;
    let horizontal_y = my * cos_roll - mz * sin_roll;

    HeadingResult {
        heading: finish(horizontal_y.atan2(horizontal_x), settings),
        roll: roll * RAD_TO_DEG,
        pitch: pitch * RAD_TO_DEG,
        tilt_compensated: true,
    }
}

/// Converts to degrees, applies declination and wraps
fn finish(heading: f32, settings: &CompassSettings) -> f32 {
    let degrees = heading * RAD_TO_DEG + settings.declination;
    match settings.range {
        HeadingRange::ZeroTo360 => wrap_degrees_360(degrees),
        HeadingRange::PlusMinus180 => wrap_degrees_180(degrees),
    }
}
