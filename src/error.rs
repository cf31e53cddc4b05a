//! Error types for the AHRS library

use core::fmt;

/// Result alias used throughout the crate
pub type AhrsResult<T> = Result<T, AhrsError>;

/// Sensor triad a reading belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sensor {
    Gyroscope,
    Accelerometer,
    Magnetometer,
}

impl fmt::Display for Sensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Sensor::Gyroscope => "gyroscope",
            Sensor::Accelerometer => "accelerometer",
            Sensor::Magnetometer => "magnetometer",
        };
        f.write_str(name)
    }
}

/// Invalid filter configuration, reported when the filter is constructed
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("sample period must be positive and finite, got {0}")]
    SamplePeriod(f32),

    #[error("{name} must be non-negative and finite, got {value}")]
    Gain { name: &'static str, value: f32 },

    #[error("initialisation period must be non-negative and finite, got {0}")]
    InitialisationPeriod(f32),

    #[error("gyroscope range must be non-negative and finite, got {0}")]
    GyroscopeRange(f32),

    #[error("{name} must lie within 0..=90 degrees, got {value}")]
    RejectionAngle { name: &'static str, value: f32 },
}

/// Errors surfaced by the AHRS library
///
/// Degenerate inputs are deliberately absent: they degrade the filter to
/// gyroscope-only integration and are reported through
/// [`FilterDiagnostics`](crate::FilterDiagnostics) instead.
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum AhrsError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("{sensor} reading contains a non-finite component")]
    NonFiniteSample { sensor: Sensor },

    #[error("sample timestamp must be finite, got {0}")]
    NonFiniteTimestamp(f32),

    /// The orientation or integral state became NaN/Inf during an update.
    /// The filter keeps its previous state.
    #[error("numeric fault: filter state became non-finite, update discarded")]
    NumericFault,
}
