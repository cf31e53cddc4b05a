#![cfg_attr(not(test), no_std)]

//! INS AHRS - attitude and heading reference for inertial measurement units
//!
//! Fuses gyroscope, accelerometer and (optionally) magnetometer readings into
//! a body-to-earth orientation quaternion with a Mahony-style
//! proportional-integral complementary filter, and computes tilt-compensated
//! compass headings.
//!
//! # Features
//!
//! - Proportional-integral feedback; the integral term tracks slow gyroscope bias
//! - Start-up gain ramp for fast initial convergence
//! - Accelerometer and magnetometer rejection with timed recovery
//! - Degenerate readings degrade to gyroscope-only integration instead of failing
//! - Quaternion, Euler angle and rotation matrix output with explicit gimbal-lock handling
//! - Earth axes conventions NWU, ENU and NED
//! - `#![no_std]`, allocation free; [`SharedFilter`] for interrupt/thread sharing
//!
//! # Quick Start
//!
//! ```rust
//! use nalgebra::Vector3;
//! use ins_ahrs::{CalibrationParams, FilterConfig, FusionFilter, SensorSample};
//!
//! let calibration = CalibrationParams::default();
//! let mut filter = FusionFilter::configure(FilterConfig::default(), &calibration).unwrap();
//!
//! let sample = SensorSample::new(
//!     Vector3::new(0.01, 0.02, 0.03),   // rad/s
//!     Vector3::new(0.0, 0.0, 1.0),      // g
//!     Vector3::new(20.0, 0.0, -40.0),   // µT
//!     0.0,                              // s
//! )
//! .unwrap();
//!
//! let orientation = filter.update(&sample).unwrap();
//! let euler = orientation.euler_angles();
//! println!("roll {} pitch {} yaw {}", euler.roll, euler.pitch, euler.yaw);
//! ```

pub mod calibration;
pub mod compass;
mod error;
mod filter;
pub mod math;
mod orientation;
mod shared;
mod types;

pub use calibration::{CalibrationParams, TriadCalibration};
pub use compass::{CompassSettings, HeadingRange, HeadingResult};
pub use error::{AhrsError, AhrsResult, ConfigError, Sensor};
pub use filter::FusionFilter;
pub use math::{DEG_TO_RAD, RAD_TO_DEG, Vector3Ext};
pub use orientation::{EulerAngles, Orientation, OrientationOutput, Representation};
pub use shared::SharedFilter;
pub use types::*;
