//! Sensor calibration model
//!
//! Each sensor triad is corrected as `misalignment * ((raw - bias) ∘ scale)`.
//! With the default identity misalignment this reduces to the per-axis
//! `(raw - bias) * scale`. Parameters are owned by the caller, set once at
//! configuration time and never mutated here.

use nalgebra::{Matrix3, Vector3};

use crate::types::SensorSample;

/// Calibration of one three-axis sensor
///
/// # Example
/// ```
/// use nalgebra::Vector3;
/// use ins_ahrs::calibration::TriadCalibration;
///
/// let accelerometer = TriadCalibration::new(
///     Vector3::new(0.02, -0.01, 0.05),  // bias
///     Vector3::new(1.01, 0.99, 1.0),    // scale
/// );
/// let corrected = accelerometer.apply(Vector3::new(0.02, -0.01, 1.05));
/// assert!((corrected - Vector3::new(0.0, 0.0, 1.0)).norm() < 1e-6);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TriadCalibration {
    /// Additive bias subtracted from the raw reading
    pub bias: Vector3<f32>,
    /// Per-axis scale applied after bias removal
    pub scale: Vector3<f32>,
    /// Cross-axis misalignment (or soft-iron) correction applied last
    pub misalignment: Matrix3<f32>,
}

impl Default for TriadCalibration {
    fn default() -> Self {
        Self {
            bias: Vector3::zeros(),
            scale: Vector3::repeat(1.0),
            misalignment: Matrix3::identity(),
        }
    }
}

impl TriadCalibration {
    /// Per-axis bias and scale with no cross-axis correction
    pub fn new(bias: Vector3<f32>, scale: Vector3<f32>) -> Self {
        Self {
            bias,
            scale,
            misalignment: Matrix3::identity(),
        }
    }

    /// Magnetometer hard-iron offset and soft-iron matrix
    pub fn hard_soft_iron(hard_iron_offset: Vector3<f32>, soft_iron_matrix: Matrix3<f32>) -> Self {
        Self {
            bias: hard_iron_offset,
            scale: Vector3::repeat(1.0),
            misalignment: soft_iron_matrix,
        }
    }

    /// Applies the correction to a raw reading
    pub fn apply(&self, raw: Vector3<f32>) -> Vector3<f32> {
        calibrate_inertial(raw, self.misalignment, self.scale, self.bias)
    }

    /// Applies the correction as a hard/soft-iron model, with the per-axis
    /// scale folded into the soft-iron matrix
    pub fn apply_magnetic(&self, raw: Vector3<f32>) -> Vector3<f32> {
        let soft_iron = self.misalignment * Matrix3::from_diagonal(&self.scale);
        calibrate_magnetic(raw, soft_iron, self.bias)
    }
}

/// Calibration for all three sensor triads
///
/// # Example
/// ```
/// use nalgebra::Vector3;
/// use ins_ahrs::{CalibrationParams, SensorSample};
/// use ins_ahrs::calibration::TriadCalibration;
///
/// let params = CalibrationParams {
///     gyroscope: TriadCalibration::new(Vector3::new(0.01, 0.0, -0.02), Vector3::repeat(1.0)),
///     ..Default::default()
/// };
///
/// let raw = SensorSample::new(
///     Vector3::new(0.01, 0.0, -0.02),
///     Vector3::new(0.0, 0.0, 1.0),
///     Vector3::new(20.0, 0.0, -40.0),
///     0.0,
/// )
/// .unwrap();
/// assert_eq!(params.apply(&raw).gyroscope(), Vector3::zeros());
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CalibrationParams {
    pub gyroscope: TriadCalibration,
    pub accelerometer: TriadCalibration,
    pub magnetometer: TriadCalibration,
}

impl CalibrationParams {
    /// Returns the calibrated copy of a raw sample; the timestamp is kept.
    pub fn apply(&self, sample: &SensorSample) -> SensorSample {
        SensorSample::from_parts(
            self.gyroscope.apply(sample.gyroscope()),
            self.accelerometer.apply(sample.accelerometer()),
            self.magnetometer.apply_magnetic(sample.magnetometer()),
            sample.timestamp(),
        )
    }
}

/// Applies inertial sensor calibration (gyroscope and accelerometer)
///
/// Order: `misalignment * ((uncalibrated - offset) * sensitivity)`
///
/// # Example
/// ```
/// use nalgebra::{Matrix3, Vector3};
/// use ins_ahrs::calibration::calibrate_inertial;
///
/// let raw = Vector3::new(1.0, 2.0, 3.0);
/// let misalignment = Matrix3::identity();
/// let sensitivity = Vector3::new(1.0, 1.0, 1.0);
/// let offset = Vector3::new(0.1, 0.2, 0.3);
///
/// let calibrated = calibrate_inertial(raw, misalignment, sensitivity, offset);
/// assert!((calibrated - Vector3::new(0.9, 1.8, 2.7)).norm() < 1e-6);
/// ```
pub fn calibrate_inertial(
    uncalibrated: Vector3<f32>,
    misalignment: Matrix3<f32>,
    sensitivity: Vector3<f32>,
    offset: Vector3<f32>,
) -> Vector3<f32> {
    misalignment * (uncalibrated - offset).component_mul(&sensitivity)
}

/// Applies magnetometer calibration (hard and soft iron correction)
pub fn calibrate_magnetic(
    uncalibrated: Vector3<f32>,
    soft_iron_matrix: Matrix3<f32>,
    hard_iron_offset: Vector3<f32>,
) -> Vector3<f32> {
    soft_iron_matrix * (uncalibrated - hard_iron_offset)
}
