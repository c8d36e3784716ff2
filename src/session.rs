//! Camera session
//!
//! Explicitly owned pairing of one open capture device with the settings
//! collection built for it. Opening builds the collection, whose resolution
//! defaults pick the configured sizes; closing releases the device and empties the
//! collection. Switching cameras rebuilds everything from the new device.

use crate::config::ExplorerConfig;
use crate::device::SharedDevice;
use crate::errors::CameraError;
use crate::parameter::{CameraParameter, ParameterSnapshot};
use crate::registry::SettingsRegistry;
use crate::types::SensorLocation;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

pub struct CameraSession {
    device: RwLock<SharedDevice>,
    registry: SettingsRegistry,
    closed: AtomicBool,
}

impl CameraSession {
    /// Opens a session on `device`.
    pub async fn open(device: SharedDevice, config: ExplorerConfig) -> Result<Self, CameraError> {
        config.validate().map_err(CameraError::ConfigError)?;

        let session = Self {
            device: RwLock::new(device.clone()),
            registry: SettingsRegistry::new(config),
            closed: AtomicBool::new(false),
        };
        let count = session.registry.rebuild(&device).await?;

        let sensor = device.with(|d| d.sensor_location())?;
        log::info!("Opened {:?} camera session with {} settings", sensor, count);
        Ok(session)
    }

    pub fn device(&self) -> SharedDevice {
        self.device.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn registry(&self) -> &SettingsRegistry {
        &self.registry
    }

    pub fn sensor_location(&self) -> Result<SensorLocation, CameraError> {
        self.device().with(|d| d.sensor_location())
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn parameters(&self) -> Result<Vec<Arc<dyn CameraParameter>>, CameraError> {
        self.registry.parameters()
    }

    pub fn parameter(&self, name: &str) -> Result<Option<Arc<dyn CameraParameter>>, CameraError> {
        self.registry.get(name)
    }

    /// Re-reads every visible parameter from the device.
    pub fn refresh_all(&self) -> Result<(), CameraError> {
        for parameter in self.registry.parameters()? {
            parameter.refresh();
        }
        Ok(())
    }

    /// Puts every visible parameter back to its default, then re-reads it.
    /// Returns the failures; one parameter failing does not stop the rest.
    pub async fn reset_all(&self) -> Result<Vec<CameraError>, CameraError> {
        let mut failures = Vec::new();
        for parameter in self.registry.parameters()? {
            let result = match parameter.set_default() {
                Ok(outcome) => outcome.settle().await,
                Err(e) => Err(e),
            };
            if let Err(e) = result {
                log::warn!("Reset of {} failed: {}", parameter.name(), e);
                failures.push(e);
            }
            parameter.refresh();
        }
        Ok(failures)
    }

    /// Rebuilds the settings collection from the current device.
    pub async fn rebuild(&self) -> Result<usize, CameraError> {
        if self.is_closed() {
            return Err(CameraError::DeviceUnavailable("session is closed".to_string()));
        }
        let device = self.device();
        self.registry.rebuild(&device).await
    }

    /// Switches to another camera. The old device is closed and the
    /// collection is rebuilt wholesale for the new one.
    pub async fn replace_device(&self, device: SharedDevice) -> Result<usize, CameraError> {
        if !device.with(|d| d.is_open())? {
            return Err(CameraError::DeviceUnavailable("capture device is closed".to_string()));
        }

        let previous = {
            let mut current = self
                .device
                .write()
                .map_err(|_| CameraError::PoisonedLock("session device".to_string()))?;
            std::mem::replace(&mut *current, device.clone())
        };
        if !previous.ptr_eq(&device) {
            if let Err(e) = previous.with(|d| d.close()) {
                log::warn!("Failed to close previous device: {}", e);
            }
        }
        self.closed.store(false, Ordering::SeqCst);

        let count = self.registry.rebuild(&device).await?;
        log::info!("Switched camera; {} settings available", count);
        Ok(count)
    }

    /// Closes the device and empties the collection. Later rebuilds fail
    /// with [`CameraError::DeviceUnavailable`] until a new device is set.
    pub fn close(&self) -> Result<(), CameraError> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.device().with(|d| d.close())?;
        self.registry.clear()?;
        log::info!("Camera session closed");
        Ok(())
    }

    pub fn snapshot(&self) -> Result<Vec<ParameterSnapshot>, CameraError> {
        self.registry.snapshot()
    }
}

impl std::fmt::Debug for CameraSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CameraSession")
            .field("closed", &self.is_closed())
            .field("registry", &self.registry)
            .finish()
    }
}
