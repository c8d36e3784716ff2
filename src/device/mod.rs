//! Capture device facade
//!
//! The parameter model consumes a physical camera only through the
//! [`CaptureDevice`] trait. Implementations report which properties exist
//! (as ranges or discrete sets), read and write them, and change stream
//! resolutions asynchronously.

pub mod simulated;

pub use simulated::{DeviceProfile, SimulatedDevice};

use crate::errors::CameraError;
use crate::types::{PropertyKey, PropertyRange, RawValue, Resolution, ResolutionKind, SensorLocation};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};

/// Completion of an asynchronous resolution change.
pub type ResolutionFuture = Pin<Box<dyn Future<Output = Result<(), CameraError>> + Send + 'static>>;

pub trait CaptureDevice: Send {
    fn sensor_location(&self) -> SensorLocation;

    /// False once the device has been closed or lost.
    fn is_open(&self) -> bool {
        true
    }

    /// `Ok(None)` when the device does not expose `key` as a range.
    fn supported_range(&self, key: PropertyKey) -> Result<Option<PropertyRange>, CameraError>;

    /// `Ok(None)` when the device does not expose `key` as a discrete set.
    fn supported_values(&self, key: PropertyKey) -> Result<Option<Vec<RawValue>>, CameraError>;

    fn get_property(&self, key: PropertyKey) -> Result<Option<RawValue>, CameraError>;

    fn set_property(&mut self, key: PropertyKey, value: RawValue) -> Result<(), CameraError>;

    fn available_resolutions(&self, kind: ResolutionKind) -> Result<Vec<Resolution>, CameraError>;

    fn current_resolution(&self, kind: ResolutionKind) -> Result<Resolution, CameraError>;

    /// Starts a resolution change. The request is issued before this returns;
    /// the future resolves once the hardware has accepted or rejected it.
    fn set_resolution_async(&mut self, kind: ResolutionKind, size: Resolution) -> ResolutionFuture;

    fn close(&mut self) {}
}

/// Shared, lock-guarded handle to the device owned by one session.
#[derive(Clone)]
pub struct SharedDevice {
    inner: Arc<Mutex<Box<dyn CaptureDevice>>>,
}

impl SharedDevice {
    pub fn new<D: CaptureDevice + 'static>(device: D) -> Self {
        Self::from_boxed(Box::new(device))
    }

    pub fn from_boxed(device: Box<dyn CaptureDevice>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(device)),
        }
    }

    /// Runs `f` with exclusive access to the device.
    pub fn with<R>(&self, f: impl FnOnce(&mut dyn CaptureDevice) -> R) -> Result<R, CameraError> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|_| CameraError::PoisonedLock("capture device".to_string()))?;
        Ok(f(&mut **guard))
    }

    /// Like [`with`](Self::with) but flattens a fallible device call.
    pub fn call<R>(
        &self,
        f: impl FnOnce(&mut dyn CaptureDevice) -> Result<R, CameraError>,
    ) -> Result<R, CameraError> {
        self.with(f)?
    }

    pub fn is_open(&self) -> bool {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_open()
    }

    pub fn ptr_eq(&self, other: &SharedDevice) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl std::fmt::Debug for SharedDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedDevice")
            .field("open", &self.is_open())
            .finish()
    }
}
