//! Advanced AHRS demonstration
//!
//! Replays the recorded sensor data through a fully configured filter and
//! plots orientation, compass heading and rejection diagnostics.
//!
//! Features demonstrated:
//! - Sensor calibration parameters borrowed by the filter
//! - Full 9-DOF fusion with proportional-integral feedback
//! - Acceleration and magnetic rejection with recovery
//! - Tilt-compensated compass fed by the filter's roll and pitch
//! - Diagnostics and flag monitoring
//!
//! Run with: `cargo run --example advanced`

use ins_ahrs::compass::{self, CompassSettings};
use ins_ahrs::{
    CalibrationParams, Convention, FilterConfig, FusionFilter, SensorSample, TriadCalibration,
};
use nalgebra::Vector3;
use plotters::prelude::*;
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
}

/// One row of filter output
struct Output {
    time: f32,
    euler: Vector3<f32>,
    heading: f32,
    acceleration_error: f32,
    accelerometer_ignored: bool,
    magnetic_error: f32,
    magnetometer_ignored: bool,
    initialising: bool,
}

const SAMPLE_RATE: f32 = 100.0; // 100 Hz

fn main() -> Result<(), Box<dyn Error>> {
    println!("Advanced AHRS Example - Full 9-DOF fusion with diagnostics");

    let mut reader = csv::Reader::from_path("testdata/sensor_data.csv")?;
    let mut sensor_data = Vec::new();
    for result in reader.deserialize() {
        let record: SensorData = result?;
        sensor_data.push(record);
    }

    // Gyroscope bias from a bench calibration; the integral term tracks what remains
    let calibration = CalibrationParams {
        gyroscope: TriadCalibration::new(Vector3::new(0.0, 0.0, 0.004), Vector3::repeat(1.0)),
        ..Default::default()
    };

    let config = FilterConfig {
        sample_period: 1.0 / SAMPLE_RATE,
        convention: Convention::Nwu,
        gain: 0.5,
        integral_gain: 0.05,
        gyroscope_range: 2000f32.to_radians(),
        acceleration_rejection: 10.0,
        magnetic_rejection: 10.0,
        recovery_trigger_period: (5.0 * SAMPLE_RATE) as u32, // 5 seconds
        ..Default::default()
    };
    let mut filter = FusionFilter::configure(config, &calibration)?;

    println!(
        "Filter configured with {:?} convention, gain {:.1}, integral gain {:.2}",
        config.convention, config.gain, config.integral_gain
    );
    println!("Processing {} sensor samples...", sensor_data.len());

    let mut outputs = Vec::with_capacity(sensor_data.len());
    for (i, data) in sensor_data.iter().enumerate() {
        let sample = SensorSample::new(
            Vector3::new(data.gyro_x, data.gyro_y, data.gyro_z),
            Vector3::new(data.accel_x, data.accel_y, data.accel_z),
            Vector3::new(data.mag_x, data.mag_y, data.mag_z),
            data.time,
        )?;

        let orientation = filter.update(&sample)?;
        let euler = orientation.euler_angles();
        let heading = compass::heading_from_attitude(
            calibration.magnetometer.apply_magnetic(sample.magnetometer()),
            euler.roll,
            euler.pitch,
            &CompassSettings::default(),
        );

        let diagnostics = filter.diagnostics();
        let flags = filter.flags();

        if i % 100 == 0 {
            let degrees = euler.as_degrees();
            println!(
                "t={:.2}s orientation=({:.1}°,{:.1}°,{:.1}°) heading={:.1}° initialising={} accel_err={:.1}° mag_err={:.1}°",
                data.time,
                degrees.x,
                degrees.y,
                degrees.z,
                heading.heading,
                flags.initialising,
                diagnostics.acceleration_error,
                diagnostics.magnetic_error
            );
        }

        outputs.push(Output {
            time: data.time,
            euler: euler.as_degrees(),
            heading: heading.heading,
            acceleration_error: diagnostics.acceleration_error,
            accelerometer_ignored: diagnostics.accelerometer_ignored,
            magnetic_error: diagnostics.magnetic_error,
            magnetometer_ignored: diagnostics.magnetometer_ignored,
            initialising: flags.initialising,
        });
    }

    println!("Estimated gyroscope bias: {:?} rad/s", -filter.integral_feedback());

    println!("Generating diagnostic plots...");
    create_plots(&outputs)?;
    println!("✓ Plots saved to advanced_plots.png");
    Ok(())
}

/// Five panels: Euler angles, compass heading, acceleration error, magnetic
/// error and the boolean flags
fn create_plots(outputs: &[Output]) -> Result<(), Box<dyn Error>> {
    let root = BitMapBackend::new("advanced_plots.png", (1000, 1000)).into_drawing_area();
    root.fill(&WHITE)?;

    let height_ratios = [4, 2, 2, 2, 2];
    let total_height: u32 = height_ratios.iter().sum();
    let mut y_offset = 0;
    let mut panels = Vec::new();
    for &ratio in &height_ratios {
        let height = (ratio * 1000) / total_height;
        panels.push(root.margin(10, 10, y_offset, 1000 - y_offset - height));
        y_offset += height;
    }

    let (Some(first), Some(last)) = (outputs.first(), outputs.last()) else {
        return Ok(());
    };
    let time_range = first.time..last.time;

    let mut euler_chart = ChartBuilder::on(&panels[0])
        .caption("Orientation, Heading and Diagnostics", ("sans-serif", 20))
        .margin(5)
        .x_label_area_size(0)
        .y_label_area_size(50)
        .build_cartesian_2d(time_range.clone(), -180f32..180f32)?;
    euler_chart.configure_mesh().y_desc("Degrees").draw()?;

    for (name, axis, color) in [("Roll", 0, RED), ("Pitch", 1, GREEN), ("Yaw", 2, BLUE)] {
        euler_chart
            .draw_series(LineSeries::new(
                outputs.iter().map(|o| (o.time, o.euler[axis])),
                &color,
            ))?
            .label(name)
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 10, y)], color));
    }
    euler_chart.configure_series_labels().draw()?;

    draw_line(
        &panels[1],
        outputs,
        |o| o.heading,
        "Compass heading",
        0f32..360f32,
        time_range.clone(),
    )?;
    draw_line(
        &panels[2],
        outputs,
        |o| o.acceleration_error,
        "Acceleration error",
        0f32..180f32,
        time_range.clone(),
    )?;
    draw_line(
        &panels[3],
        outputs,
        |o| o.magnetic_error,
        "Magnetic error",
        0f32..180f32,
        time_range.clone(),
    )?;

    let mut flag_chart = ChartBuilder::on(&panels[4])
        .margin(5)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(time_range, -0.1f32..1.1f32)?;
    flag_chart
        .configure_mesh()
        .x_desc("Time (s)")
        .y_label_formatter(&|y| (if *y < 0.5 { "False" } else { "True" }).to_string())
        .draw()?;

    let flags: [(&str, fn(&Output) -> bool, RGBColor); 3] = [
        ("Initialising", |o| o.initialising, CYAN),
        ("Accelerometer ignored", |o| o.accelerometer_ignored, MAGENTA),
        ("Magnetometer ignored", |o| o.magnetometer_ignored, BLACK),
    ];
    for (name, flag, color) in flags {
        flag_chart
            .draw_series(LineSeries::new(
                outputs
                    .iter()
                    .map(|o| (o.time, if flag(o) { 1.0 } else { 0.0 })),
                &color,
            ))?
            .label(name)
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 10, y)], color));
    }
    flag_chart.configure_series_labels().draw()?;

    root.present()?;
    Ok(())
}

fn draw_line(
    area: &DrawingArea<BitMapBackend, plotters::coord::Shift>,
    outputs: &[Output],
    value: impl Fn(&Output) -> f32,
    label: &str,
    y_range: std::ops::Range<f32>,
    time_range: std::ops::Range<f32>,
) -> Result<(), Box<dyn Error>> {
    let mut chart = ChartBuilder::on(area)
        .margin(5)
        .x_label_area_size(0)
        .y_label_area_size(50)
        .build_cartesian_2d(time_range, y_range)?;
    chart.configure_mesh().y_desc("Degrees").draw()?;

    chart
        .draw_series(LineSeries::new(
            outputs.iter().map(|o| (o.time, value(o))),
            &RGBColor(128, 128, 0), // olive
        ))?
        .label(label)
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 10, y)], RGBColor(128, 128, 0)));

    chart.configure_series_labels().draw()?;
    Ok(())
}
