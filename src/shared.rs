//! Interrupt- and thread-safe wrapper around [`FusionFilter`]
//!
//! Every update and every read runs inside one critical section, so a reader
//! in another context never observes a half-written quaternion.

use core::cell::RefCell;

use critical_section::Mutex;

use crate::error::AhrsResult;
use crate::filter::FusionFilter;
use crate::orientation::Orientation;
use crate::types::{FilterDiagnostics, SensorSample};

/// A [`FusionFilter`] shared between execution contexts
///
/// `new` is `const`, so the filter can live in a `static` when its
/// calibration is `'static`.
///
/// # Example
/// ```
/// use nalgebra::Vector3;
/// use ins_ahrs::{CalibrationParams, FilterConfig, FusionFilter, SensorSample, SharedFilter};
///
/// let calibration = CalibrationParams::default();
/// let filter = FusionFilter::configure(FilterConfig::default(), &calibration).unwrap();
/// let shared = SharedFilter::new(filter);
///
/// let sample = SensorSample::without_magnetometer(
///     Vector3::new(0.0, 0.0, 0.1),
///     Vector3::new(0.0, 0.0, 1.0),
///     0.0,
/// )
/// .unwrap();
/// shared.update(&sample).unwrap();
///
/// let snapshot = shared.orientation();
/// assert!((snapshot.quaternion().norm() - 1.0).abs() < 1e-6);
/// ```
pub struct SharedFilter<'a> {
    inner: Mutex<RefCell<FusionFilter<'a>>>,
}

impl<'a> SharedFilter<'a> {
    pub const fn new(filter: FusionFilter<'a>) -> Self {
        Self {
            inner: Mutex::new(RefCell::new(filter)),
        }
    }

    /// Runs one filter update inside a critical section
    pub fn update(&self, sample: &SensorSample) -> AhrsResult<Orientation> {
        self.with_mut(|filter| filter.update(sample))
    }

    /// Consistent snapshot of the current orientation
    pub fn orientation(&self) -> Orientation {
        self.with(|filter| filter.orientation())
    }

    pub fn diagnostics(&self) -> FilterDiagnostics {
        self.with(|filter| filter.diagnostics())
    }

    /// Access the filter immutably.
    pub fn with<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&FusionFilter<'a>) -> R,
    {
        critical_section::with(|cs| f(&self.inner.borrow_ref(cs)))
    }

    /// Access the filter mutably.
    pub fn with_mut<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut FusionFilter<'a>) -> R,
    {
        critical_section::with(|cs| f(&mut self.inner.borrow_ref_mut(cs)))
    }

    pub fn into_inner(self) -> FusionFilter<'a> {
        self.inner.into_inner().into_inner()
    }
}
