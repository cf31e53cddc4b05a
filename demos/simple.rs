use ins_ahrs::{AhrsError, CalibrationParams, FilterConfig, FusionFilter, SensorSample};
use nalgebra::Vector3;

const SAMPLE_PERIOD: f32 = 0.01; // 10 ms sample period

fn main() -> Result<(), AhrsError> {
    let calibration = CalibrationParams::default();
    let config = FilterConfig {
        sample_period: SAMPLE_PERIOD,
        magnetometer_enabled: false,
        ..Default::default()
    };
    let mut filter = FusionFilter::configure(config, &calibration)?;

    for i in 0..10 {
        // this loop should repeat each time new gyroscope data is available
        let gyroscope = Vector3::new(0.0, 0.0, 0.0); // replace this with actual gyroscope data in rad/s
        let accelerometer = Vector3::new(0.0, 0.0, 1.0); // replace this with actual accelerometer data in g
        let sample =
            SensorSample::without_magnetometer(gyroscope, accelerometer, i as f32 * SAMPLE_PERIOD)?;

        let euler = filter.update(&sample)?.euler_angles().as_degrees();

        println!(
            "Roll: {:.2}, Pitch: {:.2}, Yaw: {:.2}",
            euler.x, euler.y, euler.z
        );
    }

    Ok(())
}
