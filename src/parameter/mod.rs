//! Parameter model
//!
//! A parameter wraps one camera-controllable attribute behind a uniform
//! contract: it knows whether the device supports it, whether it can be
//! changed, how to re-read itself from the device and how to fall back to a
//! sensible default. Two shapes implement the contract:
//!
//! - [`RangeParameter`]: a bounded scalar interval reported by the device.
//! - [`EnumeratedParameter`]: an explicit, ordered list of labelled options.
//!
//! Per-property behaviour (which key, how values are labelled, which value is
//! the default) is injected as data through [`RangeSpec`] and
//! [`EnumeratedSpec`]; see [`crate::catalog`].

pub mod enumerated;
pub mod range;

pub use enumerated::{DefaultRule, Domain, EnumeratedParameter, EnumeratedSpec, ParameterOption, WriteTarget};
pub use range::{RangeDefault, RangeParameter, RangeSpec, RangeValue};

use crate::assert_invariant;
use crate::device::SharedDevice;
use crate::errors::CameraError;
use crate::notify::{Notifier, ParameterChange, ParameterField};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;

/// Lifecycle of a parameter instance. `Supported` and `Unsupported` hold
/// until the next refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum ParameterStatus {
    #[default]
    Uninitialized,
    Refreshing,
    Supported,
    Unsupported,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ParameterKind {
    Range,
    Enumerated,
}

/// Result of a write that did not fail.
#[derive(Debug)]
pub enum WriteOutcome {
    /// The requested value was already current; the device was not touched.
    Unchanged,
    /// The device accepted the value and local state was updated.
    Applied,
    /// The device is still working on the request. The parameter stays
    /// unmodifiable until the write settles.
    Pending(PendingWrite),
}

impl WriteOutcome {
    /// Waits for a pending write, if any, and reports its final result.
    pub async fn settle(self) -> Result<(), CameraError> {
        match self {
            WriteOutcome::Pending(pending) => pending.wait().await,
            WriteOutcome::Unchanged | WriteOutcome::Applied => Ok(()),
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, WriteOutcome::Pending(_))
    }
}

/// Handle to an outstanding asynchronous device write.
#[derive(Debug)]
pub struct PendingWrite {
    handle: JoinHandle<Result<(), CameraError>>,
}

impl PendingWrite {
    pub(crate) fn new(handle: JoinHandle<Result<(), CameraError>>) -> Self {
        Self { handle }
    }

    pub async fn wait(self) -> Result<(), CameraError> {
        self.handle
            .await
            .map_err(|e| CameraError::DeviceError(format!("write task failed: {}", e)))?
    }
}

/// Uniform interface every parameter exposes to its consumer.
pub trait CameraParameter: Send + Sync {
    fn name(&self) -> &str;

    fn status(&self) -> ParameterStatus;

    fn supported(&self) -> bool;

    /// Implies [`supported`](Self::supported).
    fn modifiable(&self) -> bool;

    fn overlay_image(&self) -> Option<String>;

    /// Re-reads domain and current value from the device. Hardware failures
    /// mark the parameter unsupported instead of propagating.
    fn refresh(&self);

    /// Applies the parameter's default-selection rule.
    fn set_default(&self) -> Result<WriteOutcome, CameraError>;

    fn subscribe(&self) -> UnboundedReceiver<ParameterChange>;

    fn kind(&self) -> ParameterKind;

    fn as_range(&self) -> Option<&dyn RangeControl> {
        None
    }

    fn as_enumerated(&self) -> Option<&dyn EnumeratedControl> {
        None
    }

    fn snapshot(&self) -> ParameterSnapshot;
}

/// Range view with the scalar widened to `i64`.
pub trait RangeControl {
    fn minimum(&self) -> i64;
    fn maximum(&self) -> i64;
    fn value(&self) -> i64;
    fn set_value(&self, value: i64) -> Result<WriteOutcome, CameraError>;
}

/// Enumerated view addressing options by position.
pub trait EnumeratedControl {
    fn options(&self) -> Vec<OptionView>;
    fn selected_index(&self) -> Option<usize>;
    /// `None` is accepted and ignored.
    fn select_index(&self, index: Option<usize>) -> Result<WriteOutcome, CameraError>;

    fn option_labels(&self) -> Vec<String> {
        self.options().into_iter().map(|o| o.label).collect()
    }

    fn selected_label(&self) -> Option<String> {
        let index = self.selected_index()?;
        self.options().into_iter().nth(index).map(|o| o.label)
    }

    fn index_of_label(&self, label: &str) -> Option<usize> {
        self.options()
            .iter()
            .position(|o| o.label.eq_ignore_ascii_case(label))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptionView {
    pub label: String,
    pub overlay_image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SnapshotDetail {
    Range { minimum: i64, maximum: i64, value: i64 },
    Enumerated { options: Vec<OptionView>, selected: Option<usize> },
}

/// Serialisable picture of a parameter at one instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParameterSnapshot {
    pub name: String,
    pub supported: bool,
    pub modifiable: bool,
    pub overlay_image: Option<String>,
    #[serde(flatten)]
    pub detail: SnapshotDetail,
}

/// Flags and overlay shared by both parameter shapes. Lives inside each
/// parameter's state lock.
#[derive(Debug, Clone, Default)]
pub(crate) struct CommonState {
    pub status: ParameterStatus,
    pub supported: bool,
    pub modifiable: bool,
    pub overlay_image: Option<String>,
}

/// Shared sink that receives the changes of many parameters in one stream.
pub type ChangeRelay = Arc<Notifier<ParameterChange>>;

/// Identity, device binding and notification channel of one parameter.
pub(crate) struct ParameterCore {
    pub name: &'static str,
    pub overlay_capable: bool,
    pub device: SharedDevice,
    notifier: Notifier<ParameterChange>,
    relay: Option<ChangeRelay>,
}

impl ParameterCore {
    pub fn new(name: &'static str, overlay_capable: bool, device: SharedDevice, relay: Option<ChangeRelay>) -> Self {
        Self {
            name,
            overlay_capable,
            device,
            notifier: Notifier::new(),
            relay,
        }
    }

    pub fn notify(&self, field: ParameterField) {
        let change = ParameterChange {
            parameter: self.name.to_string(),
            field,
        };
        if let Some(relay) = &self.relay {
            relay.emit(change.clone());
        }
        self.notifier.emit(change);
    }

    pub fn subscribe(&self) -> UnboundedReceiver<ParameterChange> {
        self.notifier.subscribe()
    }

    /// Publishes recomputed flags, notifying only fields that changed.
    pub fn set_flags(&self, common: &mut CommonState, supported: bool, modifiable: bool) {
        let modifiable = supported && modifiable;
        assert_invariant!(
            !modifiable || supported,
            "Modifiable parameter must be supported",
            self.name
        );

        common.status = if supported {
            ParameterStatus::Supported
        } else {
            ParameterStatus::Unsupported
        };
        if common.supported != supported {
            common.supported = supported;
            self.notify(ParameterField::Supported);
        }
        if common.modifiable != modifiable {
            common.modifiable = modifiable;
            self.notify(ParameterField::Modifiable);
        }
    }

    /// Overlays are only accepted from overlay-capable parameters.
    pub fn set_overlay(&self, common: &mut CommonState, image: Option<String>) -> Result<(), CameraError> {
        if !self.overlay_capable && image.is_some() {
            return Err(CameraError::InvalidValue(format!(
                "overlays are not enabled for {}",
                self.name
            )));
        }
        common.overlay_image = image;
        Ok(())
    }

    /// Hardware refusals become [`CameraError::WriteRejected`]. A closed
    /// device or a poisoned lock is passed through untouched.
    pub fn write_failed(&self, error: CameraError) -> CameraError {
        log::warn!("Setting {} failed: {}", self.name.to_lowercase(), error);
        match error {
            CameraError::DeviceUnavailable(_) | CameraError::PoisonedLock(_) => error,
            other => CameraError::write_rejected(self.name, other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::SimulatedDevice;
    use crate::notify::drain;

    fn core(overlay: bool) -> ParameterCore {
        ParameterCore::new("Test", overlay, SharedDevice::new(SimulatedDevice::default()), None)
    }

    #[test]
    fn test_non_overlay_parameter_refuses_image() {
        let core = core(false);
        let mut common = CommonState::default();
        assert!(core.set_overlay(&mut common, Some("x.png".into())).is_err());
        assert!(core.set_overlay(&mut common, None).is_ok());
        assert_eq!(common.overlay_image, None);
    }

    #[test]
    fn test_flags_never_modifiable_without_support() {
        let core = core(true);
        let mut common = CommonState::default();
        core.set_flags(&mut common, false, true);
        assert!(!common.modifiable);
        assert_eq!(common.status, ParameterStatus::Unsupported);
    }

    #[test]
    fn test_flags_notify_only_on_change() {
        let core = core(false);
        let mut rx = core.subscribe();
        let mut common = CommonState::default();
        core.set_flags(&mut common, true, true);
        core.set_flags(&mut common, true, true);
        let fields: Vec<_> = drain(&mut rx).into_iter().map(|c| c.field).collect();
        assert_eq!(fields, vec![ParameterField::Supported, ParameterField::Modifiable]);
    }

    #[test]
    fn test_relay_sees_every_change() {
        let relay: ChangeRelay = Arc::new(Notifier::new());
        let mut shared = relay.subscribe();
        let core = ParameterCore::new("Test", false, SharedDevice::new(SimulatedDevice::default()), Some(relay));
        let mut own = core.subscribe();

        core.notify(ParameterField::Value);
        assert_eq!(drain(&mut own).len(), 1);
        assert_eq!(
            drain(&mut shared),
            vec![ParameterChange { parameter: "Test".to_string(), field: ParameterField::Value }]
        );
    }

    #[test]
    fn test_write_failure_mapping() {
        let core = core(false);

        let refused = core.write_failed(CameraError::DeviceError("busy".into()));
        assert!(matches!(refused, CameraError::WriteRejected { .. }));
        assert!(refused.is_recoverable());

        let closed = core.write_failed(CameraError::DeviceUnavailable("device is closed".into()));
        assert!(matches!(closed, CameraError::DeviceUnavailable(_)));
        assert!(!closed.is_recoverable());

        let poisoned = core.write_failed(CameraError::PoisonedLock("device".into()));
        assert!(matches!(poisoned, CameraError::PoisonedLock(_)));
    }
}
