//! Fusion filter: the AHRS orientation estimator
//!
//! A Mahony-style proportional-integral complementary filter. Each step the
//! gyroscope rate is corrected by the misalignment between the measured and
//! the estimated gravity and magnetic-west directions, then integrated into
//! the orientation quaternion.

use log::{debug, error, warn};
use nalgebra::{UnitQuaternion, Vector3};
#[cfg(not(test))]
use num_traits::Float;

use crate::calibration::CalibrationParams;
use crate::error::{AhrsError, AhrsResult};
use crate::math::{
    DEG_TO_RAD, RAD_TO_DEG, Vector3Ext, integrate_body_rate, normalize_quaternion,
};
use crate::orientation::{Orientation, OrientationOutput, Representation};
use crate::types::{
    DegenerateInput, FilterConfig, FilterDiagnostics, FilterFlags, SensorSample,
};

/// Readings above this fraction of the gyroscope range count as saturated
const GYROSCOPE_RANGE_FACTOR: f32 = 0.98;
/// Recovery trigger decrement per accepted sample
const RECOVERY_DECREMENT: u32 = 9;

/// Mutable filter state, restored as a whole when an update faults
#[derive(Debug, Clone, Copy)]
struct FilterState {
    quaternion: UnitQuaternion<f32>,
    integral_feedback: Vector3<f32>,
    /// Last calibrated accelerometer reading, for linear acceleration
    accelerometer: Vector3<f32>,
    initialising: bool,
    ramped_gain: f32,
    angular_rate_recovery: bool,
    acceleration_recovery: Recovery,
    magnetic_recovery: Recovery,
    diagnostics: FilterDiagnostics,
}

/// Rejection hysteresis for one sensor
#[derive(Debug, Clone, Copy)]
struct Recovery {
    trigger: u32,
    timeout: u32,
}

impl Recovery {
    fn new(period: u32) -> Self {
        Self {
            trigger: 0,
            timeout: period,
        }
    }

    /// Returns whether the sensor's feedback should be used this step.
    ///
    /// Rejected samples count the trigger up, accepted ones count it down
    /// faster. Once the trigger exceeds the timeout the sensor is trusted
    /// regardless, until the trigger has drained back to zero.
    fn gate(&mut self, within_threshold: bool, period: u32) -> bool {
        let mut accepted = within_threshold;
        if within_threshold {
            self.trigger = self.trigger.saturating_sub(RECOVERY_DECREMENT);
        } else {
            self.trigger += 1;
        }

        if self.trigger > self.timeout {
            self.timeout = 0;
            accepted = true;
        } else {
            self.timeout = period;
        }
        self.trigger = self.trigger.min(period);
        accepted
    }

    fn recovering(&self) -> bool {
        self.trigger > self.timeout
    }
}

/// Orientation estimator
///
/// Owns its [`FilterConfig`] and orientation state; borrows the caller's
/// [`CalibrationParams`] for its whole lifetime without copying them.
///
/// # Example
/// ```
/// use nalgebra::Vector3;
/// use ins_ahrs::{CalibrationParams, FilterConfig, FusionFilter, SensorSample};
///
/// let calibration = CalibrationParams::default();
/// let mut filter = FusionFilter::configure(FilterConfig::default(), &calibration).unwrap();
///
/// for step in 0..100 {
///     let sample = SensorSample::new(
///         Vector3::new(0.0, 0.0, 0.0),     // rad/s
///         Vector3::new(0.0, 0.0, 1.0),     // g
///         Vector3::new(20.0, 0.0, -40.0),  // µT
///         step as f32 * 0.01,
///     )
///     .unwrap();
///     filter.update(&sample).unwrap();
/// }
///
/// let euler = filter.orientation().euler_angles();
/// assert!(euler.roll.abs() < 1e-4);
/// ```
#[derive(Debug, Clone)]
pub struct FusionFilter<'a> {
    config: FilterConfig,
    calibration: &'a CalibrationParams,
    state: FilterState,
    last_timestamp: Option<f32>,
    /// Gain decrease per second while initialising
    ramp_rate: f32,
    /// Squared sine of the rejection angles
    acceleration_rejection: f32,
    magnetic_rejection: f32,
    gyroscope_range_threshold: f32,
}

impl<'a> FusionFilter<'a> {
    /// Builds a filter from a validated configuration and the caller's calibration.
    ///
    /// The orientation starts at identity.
    pub fn configure(config: FilterConfig, calibration: &'a CalibrationParams) -> AhrsResult<Self> {
        config.validate()?;

        let ramp_rate = if config.initialisation_period > 0.0 && config.initial_gain > config.gain
        {
            (config.initial_gain - config.gain) / config.initialisation_period
        } else {
            0.0
        };

        let filter = Self {
            config,
            calibration,
            state: FilterState::initial(&config, ramp_rate > 0.0),
            last_timestamp: None,
            ramp_rate,
            acceleration_rejection: rejection_threshold(config.acceleration_rejection),
            magnetic_rejection: rejection_threshold(config.magnetic_rejection),
            gyroscope_range_threshold: config.gyroscope_range * GYROSCOPE_RANGE_FACTOR,
        };

        debug!(
            "fusion filter configured: dt={}s gain={} integral_gain={} magnetometer={}",
            config.sample_period, config.gain, config.integral_gain, config.magnetometer_enabled
        );
        Ok(filter)
    }

    /// Resets orientation, integral term, gain ramp and timing.
    pub fn reset(&mut self) {
        self.state = FilterState::initial(&self.config, self.ramp_rate > 0.0);
        self.last_timestamp = None;
    }

    /// Advances the filter by one raw sample.
    ///
    /// Δt is the difference to the previous sample's timestamp, or the
    /// configured sample period for the first sample. A zero or negative Δt
    /// leaves the state untouched and returns the current orientation.
    ///
    /// Degenerate readings never fail the update. The only error is
    /// [`AhrsError::NumericFault`], returned with the previous state kept.
    pub fn update(&mut self, sample: &SensorSample) -> AhrsResult<Orientation> {
        let delta_time = match self.last_timestamp {
            Some(previous) => sample.timestamp() - previous,
            None => self.config.sample_period,
        };
        self.update_with_delta_time(sample, delta_time)
    }

    /// Advances the filter by one raw sample with an explicit Δt in seconds.
    pub fn update_with_delta_time(
        &mut self,
        sample: &SensorSample,
        delta_time: f32,
    ) -> AhrsResult<Orientation> {
        if !(delta_time.is_finite() && delta_time > 0.0) {
            debug!("skipping sample at {}s: delta time {}", sample.timestamp(), delta_time);
            return Ok(self.orientation());
        }

        let calibrated = self.calibration.apply(sample);
        let orientation = self.step(&calibrated, delta_time)?;
        self.last_timestamp = Some(sample.timestamp());
        Ok(orientation)
    }

    /// Seeds the orientation from a stationary sample.
    ///
    /// Uses the magnetometer for heading when it is enabled and usable,
    /// otherwise only roll and pitch are set. Returns `None` and leaves the
    /// state untouched when the accelerometer reading is degenerate.
    pub fn initialise_from_accelerometer(&mut self, sample: &SensorSample) -> Option<Orientation> {
        let calibrated = self.calibration.apply(sample);
        let convention = self.config.convention;

        let orientation = if self.config.magnetometer_enabled {
            Orientation::from_accelerometer_magnetometer(
                calibrated.accelerometer(),
                calibrated.magnetometer(),
                convention,
            )
            .or_else(|| Orientation::from_accelerometer(calibrated.accelerometer(), convention))
        } else {
            Orientation::from_accelerometer(calibrated.accelerometer(), convention)
        }?;

        self.state.quaternion = orientation.quaternion();
        Some(orientation)
    }

    /// Current orientation
    pub fn orientation(&self) -> Orientation {
        Orientation::from_quaternion(self.state.quaternion)
    }

    /// Current orientation in the requested representation
    pub fn orientation_as(&self, representation: Representation) -> OrientationOutput {
        self.orientation().as_representation(representation)
    }

    /// Replaces the orientation estimate, keeping all other state
    pub fn set_orientation(&mut self, orientation: Orientation) {
        self.state.quaternion = orientation.quaternion();
    }

    /// Estimated direction of a stationary accelerometer reading in the body frame
    pub fn gravity(&self) -> Vector3<f32> {
        self.estimated_up()
    }

    /// Last calibrated accelerometer reading minus gravity, in g
    pub fn linear_acceleration(&self) -> Vector3<f32> {
        self.state.accelerometer - self.gravity()
    }

    /// Linear acceleration rotated into the earth frame, in g
    pub fn earth_acceleration(&self) -> Vector3<f32> {
        self.state.quaternion * self.linear_acceleration()
    }

    /// Accumulated integral correction (rad/s), the gyroscope bias estimate negated
    pub fn integral_feedback(&self) -> Vector3<f32> {
        self.state.integral_feedback
    }

    /// Diagnostics from the most recent update
    pub fn diagnostics(&self) -> FilterDiagnostics {
        self.state.diagnostics
    }

    pub fn flags(&self) -> FilterFlags {
        FilterFlags {
            initialising: self.state.initialising,
            angular_rate_recovery: self.state.angular_rate_recovery,
            acceleration_recovery: self.state.acceleration_recovery.recovering(),
            magnetic_recovery: self.state.magnetic_recovery.recovering(),
        }
    }

    /// Proportional gain currently in effect, including the start-up ramp
    pub fn effective_gain(&self) -> f32 {
        self.state.ramped_gain
    }

    pub fn config(&self) -> &FilterConfig {
        &self.config
    }

    pub fn calibration(&self) -> &'a CalibrationParams {
        self.calibration
    }

    /// One fusion step over a calibrated sample
    fn step(&mut self, sample: &SensorSample, delta_time: f32) -> AhrsResult<Orientation> {
        let saved = self.state;
        let gyroscope = sample.gyroscope();
        self.state.accelerometer = sample.accelerometer();

        if self.gyroscope_range_threshold > 0.0 && gyroscope.amax() > self.gyroscope_range_threshold
        {
            if !self.state.angular_rate_recovery {
                warn!("gyroscope saturated at {:?} rad/s, re-initialising", gyroscope);
            }
            self.state.angular_rate_recovery = true;
            self.state.initialising = true;
            self.state.ramped_gain = self.config.initial_gain.max(self.config.gain);
            self.state.integral_feedback = Vector3::zeros();
        }

        if self.state.initialising {
            self.state.ramped_gain -= self.ramp_rate * delta_time;
            if self.ramp_rate == 0.0 || self.state.ramped_gain <= self.config.gain {
                self.state.ramped_gain = self.config.gain;
                self.state.initialising = false;
                self.state.angular_rate_recovery = false;
            }
        }

        let up = self.estimated_up();
        let mut degenerate = DegenerateInput::default();
        let mut diagnostics = FilterDiagnostics::default();

        let mut accelerometer_error = Vector3::zeros();
        diagnostics.accelerometer_ignored = true;
        if self.config.accelerometer_enabled {
            match sample.accelerometer().checked_normalize() {
                Some(measured) => {
                    let error = feedback(&measured, &up);
                    diagnostics.acceleration_error = error_angle(&measured, &up);

                    let within = self.state.initialising
                        || error.norm_squared() <= self.acceleration_rejection;
                    let accepted = self
                        .state
                        .acceleration_recovery
                        .gate(within, self.config.recovery_trigger_period);
                    if accepted {
                        accelerometer_error = error;
                        diagnostics.accelerometer_ignored = false;
                    } else if !saved.diagnostics.accelerometer_ignored {
                        warn!(
                            "accelerometer rejected: {:.1}° from estimated gravity",
                            diagnostics.acceleration_error
                        );
                    }
                }
                None => degenerate.accelerometer = true,
            }
        }

        let mut magnetic_error = Vector3::zeros();
        diagnostics.magnetometer_ignored = true;
        if self.config.magnetometer_enabled {
            // Compare only the horizontal field so dip never tilts the attitude
            let measured_west = sample
                .magnetometer()
                .checked_normalize()
                .and_then(|magnetometer| up.cross(&magnetometer).checked_normalize());

            match measured_west {
                Some(measured) => {
                    let west = self.estimated_west();
                    let error = feedback(&measured, &west);
                    diagnostics.magnetic_error = error_angle(&measured, &west);

                    let within =
                        self.state.initialising || error.norm_squared() <= self.magnetic_rejection;
                    let accepted = self
                        .state
                        .magnetic_recovery
                        .gate(within, self.config.recovery_trigger_period);
                    if accepted {
                        magnetic_error = error;
                        diagnostics.magnetometer_ignored = false;
                    } else if !saved.diagnostics.magnetometer_ignored {
                        warn!(
                            "magnetometer rejected: {:.1}° from estimated west",
                            diagnostics.magnetic_error
                        );
                    }
                }
                None => degenerate.magnetometer = true,
            }
        }

        if degenerate.accelerometer && !saved.diagnostics.degenerate.accelerometer {
            warn!("degenerate accelerometer reading, integrating gyroscope only");
        }
        if degenerate.magnetometer && !saved.diagnostics.degenerate.magnetometer {
            warn!("degenerate magnetometer reading, skipping heading correction");
        }

        let error = accelerometer_error + magnetic_error;
        let correcting = !diagnostics.accelerometer_ignored || !diagnostics.magnetometer_ignored;
        if self.config.integral_gain > 0.0 {
            if correcting && !self.state.initialising {
                self.state.integral_feedback += error * (self.config.integral_gain * delta_time);
            }
        } else {
            self.state.integral_feedback = Vector3::zeros();
        }

        let corrected_rate =
            gyroscope + error * self.state.ramped_gain + self.state.integral_feedback;
        let next = integrate_body_rate(&self.state.quaternion, &corrected_rate, delta_time);

        let finite = next.coords.iter().all(|c| c.is_finite())
            && self.state.integral_feedback.iter().all(|c| c.is_finite());
        let Some(quaternion) = normalize_quaternion(next).filter(|_| finite) else {
            error!(
                "non-finite filter state at {}s, discarding update",
                sample.timestamp()
            );
            self.state = saved;
            return Err(AhrsError::NumericFault);
        };

        diagnostics.acceleration_recovery_trigger = self.state.acceleration_recovery.trigger;
        diagnostics.magnetic_recovery_trigger = self.state.magnetic_recovery.trigger;
        diagnostics.degenerate = degenerate;
        self.state.diagnostics = diagnostics;
        self.state.quaternion = quaternion;

        Ok(self.orientation())
    }

    /// Earth "up" as seen in the body frame: the reference rotated by `q*`
    fn estimated_up(&self) -> Vector3<f32> {
        self.state
            .quaternion
            .inverse_transform_vector(&self.config.convention.up())
    }

    /// Earth magnetic west as seen in the body frame
    fn estimated_west(&self) -> Vector3<f32> {
        self.state
            .quaternion
            .inverse_transform_vector(&self.config.convention.west())
    }
}

impl FilterState {
    fn initial(config: &FilterConfig, ramp: bool) -> Self {
        Self {
            quaternion: UnitQuaternion::identity(),
            integral_feedback: Vector3::zeros(),
            accelerometer: Vector3::zeros(),
            initialising: ramp,
            ramped_gain: if ramp { config.initial_gain } else { config.gain },
            angular_rate_recovery: false,
            acceleration_recovery: Recovery::new(config.recovery_trigger_period),
            magnetic_recovery: Recovery::new(config.recovery_trigger_period),
            diagnostics: FilterDiagnostics::default(),
        }
    }
}

/// Error between a measured and an estimated unit vector.
///
/// The cross product is `sin` of the misalignment; for opposing vectors it
/// is normalized so corrections stay saturated past 90°. Exactly opposite
/// vectors are corrected about an arbitrary axis perpendicular to the
/// estimate.
fn feedback(measured: &Vector3<f32>, estimated: &Vector3<f32>) -> Vector3<f32> {
    let cross = measured.cross(estimated);
    if measured.dot(estimated) < 0.0 {
        cross
            .checked_normalize()
            .unwrap_or_else(|| perpendicular(estimated))
    } else {
        cross
    }
}

/// A unit vector perpendicular to the unit vector `vector`
fn perpendicular(vector: &Vector3<f32>) -> Vector3<f32> {
    let reference = if vector.x.abs() < 0.9 {
        Vector3::x()
    } else {
        Vector3::y()
    };
    vector
        .cross(&reference)
        .checked_normalize()
        .unwrap_or_else(Vector3::z)
}

/// Angle in degrees between a measured and an estimated unit vector
fn error_angle(measured: &Vector3<f32>, estimated: &Vector3<f32>) -> f32 {
    measured
        .cross(estimated)
        .norm()
        .atan2(measured.dot(estimated))
        * RAD_TO_DEG
}

/// Squared sine of a rejection angle; 0 disables rejection
fn rejection_threshold(degrees: f32) -> f32 {
    if degrees == 0.0 {
        f32::MAX
    } else {
        (degrees * DEG_TO_RAD).sin().powi(2)
    }
}
