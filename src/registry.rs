//! Settings collection
//!
//! Owns the ordered list of parameters the UI shows for the current device.
//! A rebuild constructs every catalog entry, drops the ones the device
//! cannot support or change, applies defaults and publishes the result as
//! a single swap.

use crate::catalog;
use crate::config::ExplorerConfig;
use crate::device::SharedDevice;
use crate::errors::CameraError;
use crate::notify::{Notifier, ParameterChange, RegistryEvent};
use crate::parameter::{CameraParameter, ChangeRelay, ParameterSnapshot};
use std::sync::{Arc, RwLock};
use tokio::sync::mpsc::UnboundedReceiver;

pub struct SettingsRegistry {
    config: ExplorerConfig,
    parameters: RwLock<Vec<Arc<dyn CameraParameter>>>,
    notifier: Notifier<RegistryEvent>,
    changes: ChangeRelay,
}

impl SettingsRegistry {
    pub fn new(config: ExplorerConfig) -> Self {
        Self {
            config,
            parameters: RwLock::new(Vec::new()),
            notifier: Notifier::new(),
            changes: Arc::new(Notifier::new()),
        }
    }

    /// Replaces the collection with the parameters `device` supports and
    /// can change, in catalog order. Returns the number of visible
    /// parameters.
    ///
    /// The previous collection stays visible until the new one is complete.
    /// Parameters are built and defaulted one after another, so their
    /// changes never interleave on [`subscribe_changes`](Self::subscribe_changes).
    /// Per-parameter failures are logged and never abort the rebuild; a
    /// closed or poisoned device does.
    pub async fn rebuild(&self, device: &SharedDevice) -> Result<usize, CameraError> {
        if !device.with(|d| d.is_open())? {
            return Err(CameraError::DeviceUnavailable("capture device is closed".to_string()));
        }

        let mut visible: Vec<Arc<dyn CameraParameter>> = Vec::new();
        for entry in catalog::entries(&self.config) {
            let parameter = entry.build_relayed(device, &self.changes);
            if !parameter.supported() {
                log::info!("Excluding {}: not supported by this device", entry.name);
                continue;
            }
            if !parameter.modifiable() {
                log::info!("Excluding {}: device offers a single value", entry.name);
                continue;
            }

            parameter.refresh();
            match parameter.set_default() {
                Ok(outcome) => {
                    if let Err(e) = outcome.settle().await {
                        log::warn!("Default for {} was not applied: {}", entry.name, e);
                    }
                }
                Err(e) => log::warn!("Default for {} was not applied: {}", entry.name, e),
            }
            parameter.refresh();

            log::debug!("Added {} ({:?})", entry.name, entry.kind);
            visible.push(parameter);
        }

        let count = visible.len();
        {
            let mut parameters = self
                .parameters
                .write()
                .map_err(|_| CameraError::PoisonedLock("settings collection".to_string()))?;
            *parameters = visible;
        }
        self.notifier.emit(RegistryEvent::CollectionChanged { count });
        log::info!("Settings collection rebuilt with {} parameters", count);
        Ok(count)
    }

    /// Empties the collection, e.g. when the device goes away.
    pub fn clear(&self) -> Result<(), CameraError> {
        self.parameters
            .write()
            .map_err(|_| CameraError::PoisonedLock("settings collection".to_string()))?
            .clear();
        self.notifier.emit(RegistryEvent::CollectionChanged { count: 0 });
        Ok(())
    }

    pub fn parameters(&self) -> Result<Vec<Arc<dyn CameraParameter>>, CameraError> {
        self.parameters
            .read()
            .map(|p| p.clone())
            .map_err(|_| CameraError::PoisonedLock("settings collection".to_string()))
    }

    /// Looks a visible parameter up by display name, ignoring case.
    pub fn get(&self, name: &str) -> Result<Option<Arc<dyn CameraParameter>>, CameraError> {
        Ok(self
            .parameters()?
            .into_iter()
            .find(|p| p.name().eq_ignore_ascii_case(name)))
    }

    pub fn len(&self) -> usize {
        self.parameters.read().map(|p| p.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn snapshot(&self) -> Result<Vec<ParameterSnapshot>, CameraError> {
        Ok(self.parameters()?.iter().map(|p| p.snapshot()).collect())
    }

    pub fn subscribe(&self) -> UnboundedReceiver<RegistryEvent> {
        self.notifier.subscribe()
    }

    /// Every change of every parameter this registry builds, in emission order.
    pub fn subscribe_changes(&self) -> UnboundedReceiver<ParameterChange> {
        self.changes.subscribe()
    }

    pub fn config(&self) -> &ExplorerConfig {
        &self.config
    }
}

impl std::fmt::Debug for SettingsRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettingsRegistry")
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::SimulatedDevice;
    use crate::notify::drain;
    use crate::testing;
    use crate::types::{FlashMode, PropertyKey};

    #[tokio::test]
    async fn test_rebuild_publishes_once() {
        let registry = SettingsRegistry::new(ExplorerConfig::default());
        let mut events = registry.subscribe();
        let device = SharedDevice::new(SimulatedDevice::from_profile(&testing::full_profile()));

        let count = registry.rebuild(&device).await.unwrap();
        assert_eq!(count, 12);
        assert_eq!(drain(&mut events), vec![RegistryEvent::CollectionChanged { count: 12 }]);
    }

    #[tokio::test]
    async fn test_unsupported_parameters_are_excluded() {
        let registry = SettingsRegistry::new(ExplorerConfig::default());
        let device = SharedDevice::new(SimulatedDevice::default().with_values(
            PropertyKey::FlashMode,
            vec![FlashMode::Auto, FlashMode::Off],
            Some(FlashMode::Off),
        ));

        assert_eq!(registry.rebuild(&device).await.unwrap(), 1);
        let flash = registry.get("flash MODE").unwrap().unwrap();
        assert_eq!(flash.as_enumerated().unwrap().selected_label().as_deref(), Some("Auto"));
    }

    #[tokio::test]
    async fn test_closed_device_fails_and_keeps_collection() {
        let registry = SettingsRegistry::new(ExplorerConfig::default());
        let simulated = SimulatedDevice::from_profile(&testing::full_profile());
        let device = SharedDevice::new(simulated);
        registry.rebuild(&device).await.unwrap();

        device.with(|d| d.close()).unwrap();
        let err = registry.rebuild(&device).await.unwrap_err();
        assert!(matches!(err, CameraError::DeviceUnavailable(_)));
        assert_eq!(registry.len(), 12);
    }

    #[tokio::test]
    async fn test_change_feed_follows_visible_parameters() {
        let registry = SettingsRegistry::new(ExplorerConfig::default());
        let device = SharedDevice::new(SimulatedDevice::from_profile(&testing::full_profile()));
        registry.rebuild(&device).await.unwrap();
        let mut changes = registry.subscribe_changes();

        let flash = registry.get("Flash mode").unwrap().unwrap();
        let control = flash.as_enumerated().unwrap();
        control.select_index(control.index_of_label("Off")).unwrap();

        let parameters: Vec<_> = drain(&mut changes).into_iter().map(|c| c.parameter).collect();
        assert_eq!(parameters, vec!["Flash mode", "Flash mode"]);
    }

    #[tokio::test]
    async fn test_clear_empties_collection() {
        let registry = SettingsRegistry::new(ExplorerConfig::default());
        let device = SharedDevice::new(SimulatedDevice::from_profile(&testing::full_profile()));
        registry.rebuild(&device).await.unwrap();
        let mut events = registry.subscribe();

        registry.clear().unwrap();
        assert!(registry.is_empty());
        assert_eq!(drain(&mut events), vec![RegistryEvent::CollectionChanged { count: 0 }]);
    }
}
