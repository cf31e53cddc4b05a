use ins_ahrs::{CalibrationParams, Convention, FilterConfig, FusionFilter, SensorSample};
use nalgebra::Vector3;
use serde::Deserialize;
use std::error::Error;

#[derive(Debug, Deserialize)]
struct SensorData {
    #[serde(rename = "Time (s)")]
    time: f32,
    #[serde(rename = "Gyroscope X (rad/s)")]
    gyro_x: f32,
    #[serde(rename = "Gyroscope Y (rad/s)")]
    gyro_y: f32,
    #[serde(rename = "Gyroscope Z (rad/s)")]
    gyro_z: f32,
    #[serde(rename = "Accelerometer X (g)")]
    accel_x: f32,
    #[serde(rename = "Accelerometer Y (g)")]
    accel_y: f32,
    #[serde(rename = "Accelerometer Z (g)")]
    accel_z: f32,
    #[serde(rename = "Magnetometer X (uT)")]
    mag_x: f32,
    #[serde(rename = "Magnetometer Y (uT)")]
    mag_y: f32,
    #[serde(rename = "Magnetometer Z (uT)")]
    mag_z: f32,
    #[serde(rename = "Roll (deg)")]
    roll: f32,
    #[serde(rename = "Yaw (deg)")]
    yaw: f32,
}

impl SensorData {
    fn sample(&self) -> SensorSample {
        SensorSample::new(
            Vector3::new(self.gyro_x, self.gyro_y, self.gyro_z),
            Vector3::new(self.accel_x, self.accel_y, self.accel_z),
            Vector3::new(self.mag_x, self.mag_y, self.mag_z),
            self.time,
        )
        .unwrap()
    }
}

const SAMPLE_RATE: f32 = 100.0; // 100 Hz

/// Synthetic recording: 100 Hz, 5° roll, still for 2 s, a 0.5 rad/s turn for
/// 2 s, then still for 2 s, with sensor noise and a small gyroscope z bias.
fn load() -> Result<Vec<SensorData>, Box<dyn Error>> {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/testdata/sensor_data.csv");
    let mut reader = csv::Reader::from_path(path)?;
    let mut records = Vec::new();
    for result in reader.deserialize() {
        records.push(result?);
    }
    Ok(records)
}

#[test]
fn test_replay_tracks_known_attitude() -> Result<(), Box<dyn Error>> {
    let records = load()?;
    assert_eq!(records.len(), 601);

    for integral_gain in [0.0, 0.1] {
        let calibration = CalibrationParams::default();
        let config = FilterConfig {
            sample_period: 1.0 / SAMPLE_RATE,
            integral_gain,
            ..Default::default()
        };
        let mut filter = FusionFilter::configure(config, &calibration)?;

        for record in &records {
            let orientation = filter.update(&record.sample())?;
            let norm = orientation.quaternion().into_inner().norm();
            assert!((norm - 1.0).abs() < 1e-5);

            // after the start-up ramp
            if record.time >= 3.0 {
                let euler = orientation.euler_angles().as_degrees();
                assert!(
                    (euler.x - record.roll).abs() < 1.0,
                    "roll {} vs {} at {}s",
                    euler.x,
                    record.roll,
                    record.time
                );
                assert!(
                    (euler.z - record.yaw).abs() < 2.0,
                    "yaw {} vs {} at {}s",
                    euler.z,
                    record.yaw,
                    record.time
                );
            }
        }
        assert!(!filter.flags().initialising);
    }

    Ok(())
}

#[test]
fn test_timestamps_match_explicit_delta_time() -> Result<(), Box<dyn Error>> {
    let records = load()?;
    let calibration = CalibrationParams::default();
    let mut by_timestamp = FusionFilter::configure(FilterConfig::default(), &calibration)?;
    let mut by_delta = FusionFilter::configure(FilterConfig::default(), &calibration)?;

    for record in &records {
        let sample = record.sample();
        let a = by_timestamp.update(&sample)?.euler_angles().as_degrees();
        let b = by_delta
            .update_with_delta_time(&sample, 1.0 / SAMPLE_RATE)?
            .euler_angles()
            .as_degrees();
        assert!((a - b).amax() < 0.1, "{a:?} vs {b:?} at {}s", record.time);
    }

    Ok(())
}

#[test]
fn test_six_axis_replay() -> Result<(), Box<dyn Error>> {
    let records = load()?;
    let calibration = CalibrationParams::default();
    let config = FilterConfig {
        magnetometer_enabled: false,
        ..Default::default()
    };
    let mut filter = FusionFilter::configure(config, &calibration)?;

    for record in &records {
        let sample = SensorSample::without_magnetometer(
            record.sample().gyroscope(),
            record.sample().accelerometer(),
            record.time,
        )?;
        filter.update(&sample)?;
    }

    let last = records.last().ok_or("empty recording")?;
    let euler = filter.orientation().euler_angles().as_degrees();
    assert!((euler.x - last.roll).abs() < 1.0);
    // heading is unobservable: only gyroscope drift separates it from the truth
    assert!((euler.z - last.yaw).abs() < 5.0);
    assert!(filter.diagnostics().magnetometer_ignored);
    assert!(!filter.diagnostics().degenerate.magnetometer);

    Ok(())
}

#[test]
fn test_replay_with_rejection_enabled() -> Result<(), Box<dyn Error>> {
    let records = load()?;

    for convention in [Convention::Nwu, Convention::Enu, Convention::Ned] {
        let calibration = CalibrationParams::default();
        let config = FilterConfig {
            convention,
            gyroscope_range: 2000f32.to_radians(),
            acceleration_rejection: 10.0,
            magnetic_rejection: 10.0,
            recovery_trigger_period: (5.0 * SAMPLE_RATE) as u32,
            ..Default::default()
        };
        let mut filter = FusionFilter::configure(config, &calibration)?;

        for record in &records {
            filter.update(&record.sample())?;
            let diagnostics = filter.diagnostics();
            assert!((0.0..=180.0).contains(&diagnostics.acceleration_error));
            assert!((0.0..=180.0).contains(&diagnostics.magnetic_error));
        }

        let flags = filter.flags();
        assert!(!flags.initialising, "{convention:?}");
        assert!(!flags.angular_rate_recovery, "{convention:?}");
    }

    Ok(())
}
