use ins_ahrs::compass::{heading, heading_from_attitude, heading_with_settings, roll_pitch};
use ins_ahrs::math::{RAD_TO_DEG, wrap_degrees_360};
use ins_ahrs::{
    CalibrationParams, CompassSettings, EulerAngles, FilterConfig, FusionFilter, HeadingRange,
    Orientation, SensorSample,
};
use nalgebra::{UnitQuaternion, Vector3};

const LEVEL: Vector3<f32> = Vector3::new(0.0, 0.0, 1.0);

/// Field of a level body facing `heading` degrees east of north
fn level_field(heading: f32) -> Vector3<f32> {
    let radians = heading.to_radians();
    Vector3::new(20.0 * radians.cos(), 20.0 * radians.sin(), -40.0)
}

fn angle_difference(a: f32, b: f32) -> f32 {
    let difference = (a - b).rem_euclid(360.0);
    difference.min(360.0 - difference)
}

#[test]
fn test_level_heading_is_atan2() {
    let calibration = CalibrationParams::default();
    let fields = [
        Vector3::new(20.0, 5.0, -40.0),
        Vector3::new(-3.0, 17.0, -35.0),
        Vector3::new(-12.0, -12.0, -44.0),
        Vector3::new(8.0, -25.0, 10.0),
    ];

    for field in fields {
        let result = heading(field, LEVEL, &calibration);
        assert!(result.tilt_compensated);
        assert_eq!(result.heading, wrap_degrees_360(field.y.atan2(field.x) * RAD_TO_DEG));
    }
}

#[test]
fn test_rolled_body_recovers_level_heading() {
    let calibration = CalibrationParams::default();

    for expected in [0.0f32, 45.0, 135.0, 200.0, 315.0] {
        let field = level_field(expected);
        let tilt = UnitQuaternion::from_euler_angles(30f32.to_radians(), 0.0, 0.0);
        let accelerometer = tilt.inverse_transform_vector(&LEVEL);
        let magnetometer = tilt.inverse_transform_vector(&field);

        let result = heading(magnetometer, accelerometer, &calibration);
        assert!(
            angle_difference(result.heading, expected) < 1e-2,
            "expected {expected}, got {}",
            result.heading
        );
        assert!((result.roll - 30.0).abs() < 1e-3);
        assert!(result.pitch.abs() < 1e-3);
    }
}

#[test]
fn test_rolled_and_pitched_body_recovers_level_heading() {
    let calibration = CalibrationParams::default();
    let field = level_field(72.0);

    for (roll, pitch) in [(-25.0f32, 40.0f32), (60.0, -15.0), (10.0, 80.0)] {
        let tilt = UnitQuaternion::from_euler_angles(roll.to_radians(), pitch.to_radians(), 0.0);
        let accelerometer = tilt.inverse_transform_vector(&LEVEL);
        let magnetometer = tilt.inverse_transform_vector(&field);

        let result = heading(magnetometer, accelerometer, &calibration);
        assert!(angle_difference(result.heading, 72.0) < 2e-2, "{result:?}");
        assert!((result.roll - roll).abs() < 1e-2);
        assert!((result.pitch - pitch).abs() < 1e-2);
    }
}

#[test]
fn test_untilted_reading_would_be_wrong_when_tilted() {
    let field = level_field(90.0);
    let tilt = UnitQuaternion::from_euler_angles(30f32.to_radians(), 0.0, 0.0);
    let magnetometer = tilt.inverse_transform_vector(&field);

    let naive = wrap_degrees_360(magnetometer.y.atan2(magnetometer.x) * RAD_TO_DEG);
    assert!(angle_difference(naive, 90.0) > 5.0);
}

#[test]
fn test_degenerate_accelerometer_falls_back_to_level() {
    let calibration = CalibrationParams::default();
    let field = Vector3::new(0.0, 20.0, -40.0);

    let free_fall = heading(field, Vector3::zeros(), &calibration);
    assert!(!free_fall.tilt_compensated);
    assert!((free_fall.heading - 90.0).abs() < 1e-4);

    let nose_down = heading(field, Vector3::new(1.0, 0.0, 0.0), &calibration);
    assert!(!nose_down.tilt_compensated);
    assert_eq!(nose_down.roll, 0.0);

    assert!(roll_pitch(Vector3::new(0.0, 1e-9, 0.0)).is_none());
}

#[test]
fn test_heading_range_and_declination() {
    let calibration = CalibrationParams::default();
    let field = level_field(350.0);

    let wrapped = heading_with_settings(
        field,
        LEVEL,
        &calibration,
        &CompassSettings {
            declination: 15.0,
            ..Default::default()
        },
    );
    assert!((wrapped.heading - 5.0).abs() < 1e-3);

    let signed = heading_with_settings(
        field,
        LEVEL,
        &calibration,
        &CompassSettings {
            range: HeadingRange::PlusMinus180,
            declination: 0.0,
        },
    );
    assert!((signed.heading + 10.0).abs() < 1e-3);

    for expected in (0..360).step_by(15) {
        let result = heading(level_field(expected as f32), LEVEL, &calibration);
        assert!((0.0..360.0).contains(&result.heading));
    }
}

/// The filter's roll and pitch feed the compass directly
#[test]
fn test_heading_from_filter_attitude() {
    let calibration = CalibrationParams::default();
    let mut filter = FusionFilter::configure(FilterConfig::default(), &calibration).unwrap();
    let truth = Orientation::from_euler_angles(EulerAngles::new(0.2, -0.3, -1.0));
    let accelerometer = truth.quaternion().inverse_transform_vector(&LEVEL);
    let magnetometer = truth
        .quaternion()
        .inverse_transform_vector(&Vector3::new(20.0, 0.0, -40.0));
    let sample = SensorSample::new(Vector3::zeros(), accelerometer, magnetometer, 0.0).unwrap();

    for _ in 0..2000 {
        filter.update_with_delta_time(&sample, 0.01).unwrap();
    }
    let euler = filter.orientation().euler_angles();

    let result = heading_from_attitude(
        magnetometer,
        euler.roll,
        euler.pitch,
        &CompassSettings::default(),
    );
    // yaw is counter-clockwise about up, heading clockwise from north
    let expected = wrap_degrees_360(-euler.yaw * RAD_TO_DEG);
    assert!(angle_difference(result.heading, expected) < 0.1, "{result:?}");
    assert!(angle_difference(result.heading, 57.2958) < 0.5);
}
