//! Core types and conventions for the AHRS library

use nalgebra::Vector3;

use crate::error::{AhrsError, AhrsResult, ConfigError, Sensor};

/// Earth axes convention
///
/// Defines the earth frame the orientation quaternion rotates into, and with
/// it the direction a stationary accelerometer reads ("up") and the direction
/// of magnetic north.
///
/// # Conventions
/// - **NWU**: North-West-Up (X=North, Y=West, Z=Up)
/// - **ENU**: East-North-Up (X=East, Y=North, Z=Up)
/// - **NED**: North-East-Down (X=North, Y=East, Z=Down)
///
/// # Example
/// ```
/// use ins_ahrs::{CalibrationParams, Convention, FilterConfig, FusionFilter};
///
/// let config = FilterConfig {
///     convention: Convention::Enu,
///     ..Default::default()
/// };
/// let calibration = CalibrationParams::default();
/// let filter = FusionFilter::configure(config, &calibration).unwrap();
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Convention {
    /// North-West-Up coordinate system
    #[default]
    Nwu,
    /// East-North-Up coordinate system
    Enu,
    /// North-East-Down coordinate system
    Ned,
}

impl Convention {
    /// Direction a stationary accelerometer reads in the earth frame.
    pub fn up(&self) -> Vector3<f32> {
        match self {
            Convention::Nwu | Convention::Enu => Vector3::z(),
            Convention::Ned => -Vector3::z(),
        }
    }

    /// Direction of magnetic north in the earth frame.
    pub fn north(&self) -> Vector3<f32> {
        match self {
            Convention::Nwu | Convention::Ned => Vector3::x(),
            Convention::Enu => Vector3::y(),
        }
    }

    /// Direction of magnetic west in the earth frame (`up × north`).
    pub fn west(&self) -> Vector3<f32> {
        self.up().cross(&self.north())
    }
}

/// Fusion filter configuration
///
/// Fixed parameters of a [`FusionFilter`](crate::FusionFilter), owned by the
/// filter instance and validated once in
/// [`FusionFilter::configure`](crate::FusionFilter::configure).
///
/// # Gain semantics
///
/// The corrective angular rate added to the gyroscope each step is
/// `gain * e + integral`, where `e = measured × estimated` is the sum of the
/// accelerometer and magnetometer error vectors (unitless, `|e| = sin` of the
/// misalignment angle) and `integral` accumulates `integral_gain * e * Δt`.
/// `gain` therefore has units of 1/s and sets the correction time constant
/// (≈ `1 / gain` seconds for small errors); `integral_gain` has units of 1/s²
/// and drives out constant gyroscope bias.
///
/// # Example
/// ```
/// use ins_ahrs::{Convention, FilterConfig};
///
/// let config = FilterConfig {
///     sample_period: 0.002,          // 500 Hz
///     gain: 1.0,
///     integral_gain: 0.05,
///     magnetometer_enabled: false,   // 6-axis operation
///     ..Default::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FilterConfig {
    /// Nominal sample period Δt in seconds
    ///
    /// Used for the first sample only; afterwards Δt comes from successive
    /// timestamps or from `update_with_delta_time`. Must be positive.
    pub sample_period: f32,
    /// Proportional gain (1/s)
    ///
    /// Higher values track the accelerometer/magnetometer faster but pass
    /// more of their noise into the orientation.
    pub gain: f32,
    /// Integral gain (1/s²), 0 disables gyroscope bias estimation
    pub integral_gain: f32,
    /// Whether accelerometer correction is applied
    pub accelerometer_enabled: bool,
    /// Whether magnetometer correction is applied
    ///
    /// Decided once at construction; samples without a magnetometer should be
    /// fused by a filter configured with this flag off.
    pub magnetometer_enabled: bool,
    /// Earth axes convention (NWU, ENU, or NED)
    pub convention: Convention,
    /// Gain used at start-up, ramped down to `gain`
    pub initial_gain: f32,
    /// Duration of the start-up gain ramp in seconds, 0 disables the ramp
    pub initialisation_period: f32,
    /// Gyroscope range in rad/s, 0 disables saturation detection
    ///
    /// When a reading exceeds 98 % of this value the sensor is assumed
    /// saturated and the filter restarts its gain ramp to re-converge.
    pub gyroscope_range: f32,
    /// Acceleration rejection threshold in degrees (0..=90)
    ///
    /// Accelerometer readings whose direction differs from the estimated
    /// gravity by more than this angle are ignored (linear acceleration).
    /// 0 and 90 disable rejection.
    pub acceleration_rejection: f32,
    /// Magnetic rejection threshold in degrees (0..=90), 0 and 90 disable rejection
    pub magnetic_rejection: f32,
    /// Recovery trigger period in samples
    ///
    /// A rejected sensor is trusted again once rejections outnumber
    /// acceptances by this many samples. 0 disables rejection.
    pub recovery_trigger_period: u32,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            sample_period: 0.01,
            gain: 0.5,
            integral_gain: 0.0,
            accelerometer_enabled: true,
            magnetometer_enabled: true,
            convention: Convention::default(),
            initial_gain: 10.0,
            initialisation_period: 3.0,
            gyroscope_range: 0.0,
            acceleration_rejection: 90.0,
            magnetic_rejection: 90.0,
            recovery_trigger_period: 0,
        }
    }
}

impl FilterConfig {
    /// Checks every parameter, returning the first invalid one.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.sample_period.is_finite() && self.sample_period > 0.0) {
            return Err(ConfigError::SamplePeriod(self.sample_period));
        }
        check_gain("gain", self.gain)?;
        check_gain("integral_gain", self.integral_gain)?;
        check_gain("initial_gain", self.initial_gain)?;
        if !(self.initialisation_period.is_finite() && self.initialisation_period >= 0.0) {
            return Err(ConfigError::InitialisationPeriod(self.initialisation_period));
        }
        if !(self.gyroscope_range.is_finite() && self.gyroscope_range >= 0.0) {
            return Err(ConfigError::GyroscopeRange(self.gyroscope_range));
        }
        check_rejection("acceleration_rejection", self.acceleration_rejection)?;
        check_rejection("magnetic_rejection", self.magnetic_rejection)?;
        Ok(())
    }
}

fn check_gain(name: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Gain { name, value })
    }
}

fn check_rejection(name: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && (0.0..=90.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::RejectionAngle { name, value })
    }
}

/// One timestamped set of sensor readings
///
/// A fixed-shape record validated at construction: every component and the
/// timestamp must be finite. Samples are immutable once built.
///
/// # Example
/// ```
/// use nalgebra::Vector3;
/// use ins_ahrs::SensorSample;
///
/// let sample = SensorSample::new(
///     Vector3::new(0.0, 0.0, 0.1),  // rad/s
///     Vector3::new(0.0, 0.0, 1.0),  // g
///     Vector3::new(20.0, 0.0, -40.0), // µT
///     0.01,                         // s
/// )
/// .unwrap();
/// assert_eq!(sample.timestamp(), 0.01);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorSample {
    gyroscope: Vector3<f32>,
    accelerometer: Vector3<f32>,
    magnetometer: Vector3<f32>,
    timestamp: f32,
}

impl SensorSample {
    /// Builds a sample from gyroscope (rad/s), accelerometer (g) and
    /// magnetometer readings taken at `timestamp` seconds.
    pub fn new(
        gyroscope: Vector3<f32>,
        accelerometer: Vector3<f32>,
        magnetometer: Vector3<f32>,
        timestamp: f32,
    ) -> AhrsResult<Self> {
        check_finite(Sensor::Gyroscope, &gyroscope)?;
        check_finite(Sensor::Accelerometer, &accelerometer)?;
        check_finite(Sensor::Magnetometer, &magnetometer)?;
        if !timestamp.is_finite() {
            return Err(AhrsError::NonFiniteTimestamp(timestamp));
        }

        Ok(Self {
            gyroscope,
            accelerometer,
            magnetometer,
            timestamp,
        })
    }

    /// Builds a sample for a 6-axis sensor; the magnetic field is stored as zero.
    pub fn without_magnetometer(
        gyroscope: Vector3<f32>,
        accelerometer: Vector3<f32>,
        timestamp: f32,
    ) -> AhrsResult<Self> {
        Self::new(gyroscope, accelerometer, Vector3::zeros(), timestamp)
    }

    /// Builds a sample from already-validated parts, e.g. after calibration.
    pub(crate) fn from_parts(
        gyroscope: Vector3<f32>,
        accelerometer: Vector3<f32>,
        magnetometer: Vector3<f32>,
        timestamp: f32,
    ) -> Self {
        Self {
            gyroscope,
            accelerometer,
            magnetometer,
            timestamp,
        }
    }

    /// Angular rate in rad/s
    pub fn gyroscope(&self) -> Vector3<f32> {
        self.gyroscope
    }

    /// Acceleration in g
    pub fn accelerometer(&self) -> Vector3<f32> {
        self.accelerometer
    }

    /// Magnetic field, zero for 6-axis samples
    pub fn magnetometer(&self) -> Vector3<f32> {
        self.magnetometer
    }

    /// Sample time in seconds
    pub fn timestamp(&self) -> f32 {
        self.timestamp
    }
}

fn check_finite(sensor: Sensor, reading: &Vector3<f32>) -> AhrsResult<()> {
    if reading.iter().all(|component| component.is_finite()) {
        Ok(())
    } else {
        Err(AhrsError::NonFiniteSample { sensor })
    }
}

/// Degenerate inputs seen in the most recent update
///
/// A degenerate input is a near-zero vector (free fall, sensor fault, field
/// parallel to gravity). It is a warning, not an error: the filter skips the
/// affected correction for that step and keeps integrating the gyroscope.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DegenerateInput {
    /// Accelerometer norm below epsilon
    pub accelerometer: bool,
    /// Magnetometer norm, or its horizontal projection, below epsilon
    pub magnetometer: bool,
}

impl DegenerateInput {
    /// True when any input was degenerate
    pub fn any(&self) -> bool {
        self.accelerometer || self.magnetometer
    }
}

/// Filter diagnostics from the most recent update
///
/// # Example
/// ```
/// use ins_ahrs::{CalibrationParams, FilterConfig, FusionFilter};
///
/// let calibration = CalibrationParams::default();
/// let filter = FusionFilter::configure(FilterConfig::default(), &calibration).unwrap();
/// let diagnostics = filter.diagnostics();
///
/// if diagnostics.accelerometer_ignored {
///     // linear acceleration detected, attitude follows the gyroscope only
/// }
/// assert!(!diagnostics.degenerate.any());
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FilterDiagnostics {
    /// Angle between measured and estimated gravity, in degrees (0..=180)
    pub acceleration_error: f32,
    /// Whether the accelerometer was rejected this step
    pub accelerometer_ignored: bool,
    /// Acceleration recovery trigger counter
    pub acceleration_recovery_trigger: u32,
    /// Angle between measured and estimated magnetic west, in degrees (0..=180)
    pub magnetic_error: f32,
    /// Whether the magnetometer was rejected this step
    pub magnetometer_ignored: bool,
    /// Magnetic recovery trigger counter
    pub magnetic_recovery_trigger: u32,
    /// Degenerate inputs seen this step
    pub degenerate: DegenerateInput,
}

/// Filter status flags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterFlags {
    /// Start-up gain ramp in progress
    pub initialising: bool,
    /// Re-converging after gyroscope saturation
    pub angular_rate_recovery: bool,
    /// Accelerometer rejection is accumulating toward recovery
    pub acceleration_recovery: bool,
    /// Magnetometer rejection is accumulating toward recovery
    pub magnetic_recovery: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convention_reference_frames() {
        assert_eq!(Convention::Nwu.west(), Vector3::y());
        assert_eq!(Convention::Enu.west(), -Vector3::x());
        assert_eq!(Convention::Ned.west(), -Vector3::y());
        assert_eq!(Convention::Ned.up(), -Vector3::z());
    }

    #[test]
    fn test_default_config_is_valid() {
        assert_eq!(FilterConfig::default().validate(), Ok(()));
    }

    #[test]
    fn test_config_rejects_non_positive_period() {
        for period in [0.0, -0.01, f32::NAN, f32::INFINITY] {
            let config = FilterConfig {
                sample_period: period,
                ..Default::default()
            };
            assert!(matches!(config.validate(), Err(ConfigError::SamplePeriod(_))));
        }
    }

    #[test]
    fn test_config_rejects_invalid_gains() {
        let config = FilterConfig {
            integral_gain: -0.1,
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::Gain {
                name: "integral_gain",
                value: -0.1
            })
        );

        let config = FilterConfig {
            gain: f32::NAN,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Gain { name: "gain", .. })
        ));
    }

    #[test]
    fn test_config_rejects_rejection_angle_out_of_range() {
        let config = FilterConfig {
            magnetic_rejection: 270.0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::RejectionAngle {
                name: "magnetic_rejection",
                ..
            })
        ));
    }

    #[test]
    fn test_sample_validation() {
        let ok = Vector3::new(0.0, 0.0, 1.0);
        let bad = Vector3::new(0.0, f32::NAN, 1.0);

        assert!(SensorSample::new(ok, ok, ok, 0.0).is_ok());
        assert_eq!(
            SensorSample::new(ok, bad, ok, 0.0),
            Err(AhrsError::NonFiniteSample {
                sensor: Sensor::Accelerometer
            })
        );
        assert!(matches!(
            SensorSample::new(ok, ok, ok, f32::INFINITY),
            Err(AhrsError::NonFiniteTimestamp(_))
        ));
    }

    #[test]
    fn test_sample_without_magnetometer() {
        let sample =
            SensorSample::without_magnetometer(Vector3::zeros(), Vector3::z(), 1.5).unwrap();
        assert_eq!(sample.magnetometer(), Vector3::zeros());
        assert_eq!(sample.timestamp(), 1.5);
    }
}
