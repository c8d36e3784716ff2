use super::{
    CameraParameter, ChangeRelay, CommonState, EnumeratedControl, OptionView, ParameterCore, ParameterKind,
    ParameterSnapshot, ParameterStatus, PendingWrite, SnapshotDetail, WriteOutcome,
};
use crate::assert_invariant;
use crate::device::{CaptureDevice, SharedDevice};
use crate::errors::CameraError;
use crate::notify::{ParameterChange, ParameterField};
use crate::types::{PropertyKey, PropertyValue, Resolution, ResolutionKind};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc::UnboundedReceiver;

/// Where selections of an enumerated parameter are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteTarget {
    /// Synchronous property write.
    Property(PropertyKey),
    /// Asynchronous resolution change.
    Resolution(ResolutionKind),
}

/// Raw candidates produced by a populate step, in display order, plus the
/// value the device currently reports.
#[derive(Debug, Clone, PartialEq)]
pub struct Domain<T> {
    pub values: Vec<T>,
    pub current: Option<T>,
}

/// Asks the device for the supported candidates of `target`. `Ok(None)` means
/// the device does not expose it.
pub type PopulateFn<T> = fn(&dyn CaptureDevice, WriteTarget) -> Result<Option<Domain<T>>, CameraError>;

/// Default-selection rule for an enumerated parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum DefaultRule<T> {
    First,
    Last,
    /// The option equal to the sentinel, or no change when absent.
    Match(T),
    /// The option equal to the sentinel, else the last option.
    MatchOrLast(T),
    /// The option equal to the sentinel, else the first option.
    MatchOrFirst(T),
    /// No default exists; `set_default` leaves the selection alone.
    Unset,
}

impl<T: PartialEq> DefaultRule<T> {
    fn pick(&self, options: &[ParameterOption<T>]) -> Option<usize> {
        let position = |sentinel: &T| options.iter().position(|o| &o.value == sentinel);
        match self {
            DefaultRule::First => (!options.is_empty()).then_some(0),
            DefaultRule::Last => options.len().checked_sub(1),
            DefaultRule::Match(sentinel) => position(sentinel),
            DefaultRule::MatchOrLast(sentinel) => {
                position(sentinel).or_else(|| options.len().checked_sub(1))
            }
            DefaultRule::MatchOrFirst(sentinel) => {
                position(sentinel).or_else(|| (!options.is_empty()).then_some(0))
            }
            DefaultRule::Unset => None,
        }
    }
}

/// Per-property declaration of an enumerated parameter.
#[derive(Clone)]
pub struct EnumeratedSpec<T> {
    pub name: &'static str,
    pub target: WriteTarget,
    pub populate: PopulateFn<T>,
    pub label: fn(&T) -> String,
    /// Overlay image file name per value. `None` for parameters that do not
    /// draw on the viewfinder.
    pub overlay: Option<fn(&T) -> String>,
    pub default: DefaultRule<T>,
}

impl<T: std::fmt::Debug> std::fmt::Debug for EnumeratedSpec<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnumeratedSpec")
            .field("name", &self.name)
            .field("target", &self.target)
            .field("overlay", &self.overlay.is_some())
            .field("default", &self.default)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParameterOption<T> {
    pub value: T,
    pub label: String,
    pub overlay_image: Option<String>,
}

impl<T> ParameterOption<T> {
    fn view(&self) -> OptionView {
        OptionView {
            label: self.label.clone(),
            overlay_image: self.overlay_image.clone(),
        }
    }
}

#[derive(Debug)]
struct EnumeratedState<T> {
    common: CommonState,
    options: Vec<ParameterOption<T>>,
    selected: Option<usize>,
    /// An asynchronous write is outstanding.
    pending: bool,
}

impl<T> Default for EnumeratedState<T> {
    fn default() -> Self {
        Self {
            common: CommonState::default(),
            options: Vec::new(),
            selected: None,
            pending: false,
        }
    }
}

struct EnumeratedInner<T> {
    core: ParameterCore,
    spec: EnumeratedSpec<T>,
    icon_directory: String,
    state: Mutex<EnumeratedState<T>>,
}

/// Parameter whose domain is a finite, ordered list of labelled options.
///
/// Options are rebuilt from scratch on every refresh; the selection is
/// re-found by value equality, never by identity.
pub struct EnumeratedParameter<T: PropertyValue> {
    inner: Arc<EnumeratedInner<T>>,
}

impl<T: PropertyValue> Clone for EnumeratedParameter<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: PropertyValue> EnumeratedParameter<T> {
    pub fn new(spec: EnumeratedSpec<T>, device: SharedDevice, icon_directory: impl Into<String>) -> Self {
        Self::with_relay(spec, device, icon_directory, None)
    }

    /// Like [`new`](Self::new), additionally forwarding every change to `relay`.
    pub fn with_relay(
        spec: EnumeratedSpec<T>,
        device: SharedDevice,
        icon_directory: impl Into<String>,
        relay: Option<ChangeRelay>,
    ) -> Self {
        let overlay_capable = spec.overlay.is_some();
        let parameter = Self {
            inner: Arc::new(EnumeratedInner {
                core: ParameterCore::new(spec.name, overlay_capable, device, relay),
                spec,
                icon_directory: icon_directory.into(),
                state: Mutex::new(EnumeratedState::default()),
            }),
        };
        parameter.refresh();
        parameter
    }

    pub fn target(&self) -> WriteTarget {
        self.inner.spec.target
    }

    pub fn options(&self) -> Vec<ParameterOption<T>> {
        self.inner.lock().options.clone()
    }

    pub fn selected_option(&self) -> Option<ParameterOption<T>> {
        let st = self.inner.lock();
        st.selected.and_then(|i| st.options.get(i).cloned())
    }

    /// Selects `option`, writing it through to the device. `None` is a no-op.
    pub fn select(&self, option: Option<&ParameterOption<T>>) -> Result<WriteOutcome, CameraError> {
        match option {
            Some(option) => self.select_value(&option.value),
            None => Ok(WriteOutcome::Unchanged),
        }
    }

    pub fn select_value(&self, value: &T) -> Result<WriteOutcome, CameraError> {
        let mut st = self.inner.lock();
        if !st.common.supported {
            return Err(CameraError::NotSupported(self.inner.spec.name.to_string()));
        }
        let index = st
            .options
            .iter()
            .position(|o| &o.value == value)
            .ok_or_else(|| {
                CameraError::InvalidValue(format!("{:?} is not an option of {}", value, self.inner.spec.name))
            })?;
        if st.selected == Some(index) {
            return Ok(WriteOutcome::Unchanged);
        }
        if !st.common.modifiable {
            return Err(CameraError::NotModifiable(self.inner.spec.name.to_string()));
        }
        self.write(&mut st, index)
    }

    fn write(&self, st: &mut EnumeratedState<T>, index: usize) -> Result<WriteOutcome, CameraError> {
        let inner = &self.inner;
        let value = st.options[index].value.clone();

        match inner.spec.target {
            WriteTarget::Property(key) => {
                let raw = value.into_raw();
                inner
                    .core
                    .device
                    .call(|d| d.set_property(key, raw))
                    .map_err(|e| inner.core.write_failed(e))?;
                inner.apply_selection(st, index);
                Ok(WriteOutcome::Applied)
            }
            WriteTarget::Resolution(kind) => {
                let runtime = tokio::runtime::Handle::try_current().map_err(|_| {
                    CameraError::RuntimeUnavailable(format!("{} changes complete asynchronously", inner.spec.name))
                })?;
                let size = Resolution::from_raw(&value.clone().into_raw()).ok_or_else(|| {
                    CameraError::InvalidValue(format!("{} options must be resolutions", inner.spec.name))
                })?;
                let request = inner.core.device.with(|d| d.set_resolution_async(kind, size))?;

                st.pending = true;
                inner.recompute_modifiable(st);
                log::debug!("{} change to {} requested", inner.spec.name, size);

                let task_inner = Arc::clone(inner);
                let handle = runtime.spawn(async move {
                    let outcome = request.await;
                    task_inner.finish_async_write(&value, outcome)
                });
                Ok(WriteOutcome::Pending(PendingWrite::new(handle)))
            }
        }
    }
}

impl<T: PropertyValue> EnumeratedInner<T> {
    fn lock(&self) -> MutexGuard<'_, EnumeratedState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn make_option(&self, value: T) -> ParameterOption<T> {
        let label = (self.spec.label)(&value);
        let overlay_image = self
            .spec
            .overlay
            .map(|overlay| format!("{}/{}", self.icon_directory.trim_end_matches('/'), overlay(&value)));
        ParameterOption {
            value,
            label,
            overlay_image,
        }
    }

    /// Selection first, overlay after. Both are always announced.
    fn apply_selection(&self, st: &mut EnumeratedState<T>, index: usize) {
        st.selected = Some(index);
        let image = st.options[index].overlay_image.clone();
        if let Err(e) = self.core.set_overlay(&mut st.common, image) {
            log::warn!("{}", e);
        }
        self.core.notify(ParameterField::SelectedOption);
        self.core.notify(ParameterField::OverlayImage);
    }

    fn recompute_modifiable(&self, st: &mut EnumeratedState<T>) {
        let supported = st.common.supported;
        let modifiable = st.options.len() > 1 && !st.pending;
        self.core.set_flags(&mut st.common, supported, modifiable);
    }

    fn finish_async_write(&self, value: &T, outcome: Result<(), CameraError>) -> Result<(), CameraError> {
        let mut st = self.lock();
        st.pending = false;
        let result = match outcome {
            Ok(()) => {
                // Options may have been rebuilt while the request was in flight.
                if let Some(index) = st.options.iter().position(|o| &o.value == value) {
                    if st.selected != Some(index) {
                        self.apply_selection(&mut st, index);
                    }
                }
                Ok(())
            }
            Err(e) => Err(self.core.write_failed(e)),
        };
        self.recompute_modifiable(&mut st);
        result
    }
}

impl<T: PropertyValue> CameraParameter for EnumeratedParameter<T> {
    fn name(&self) -> &str {
        self.inner.spec.name
    }

    fn status(&self) -> ParameterStatus {
        self.inner.lock().common.status
    }

    fn supported(&self) -> bool {
        self.inner.lock().common.supported
    }

    fn modifiable(&self) -> bool {
        self.inner.lock().common.modifiable
    }

    fn overlay_image(&self) -> Option<String> {
        self.inner.lock().common.overlay_image.clone()
    }

    fn refresh(&self) {
        let inner = &self.inner;
        inner.lock().common.status = ParameterStatus::Refreshing;

        let target = inner.spec.target;
        let populate = inner.spec.populate;
        let domain = inner.core.device.call(|d| populate(d, target));

        let mut guard = inner.lock();
        let st = &mut *guard;
        match domain {
            Ok(Some(domain)) => {
                st.options = domain
                    .values
                    .into_iter()
                    .map(|value| inner.make_option(value))
                    .collect();
                st.selected = domain
                    .current
                    .and_then(|current| st.options.iter().position(|o| o.value == current));
                let image = st.selected.and_then(|i| st.options[i].overlay_image.clone());
                if let Err(e) = inner.core.set_overlay(&mut st.common, image) {
                    log::warn!("{}", e);
                }

                let supported = !st.options.is_empty();
                let modifiable = st.options.len() > 1 && !st.pending;
                inner.core.set_flags(&mut st.common, supported, modifiable);
                if supported {
                    inner.core.notify(ParameterField::Options);
                    inner.core.notify(ParameterField::SelectedOption);
                    inner.core.notify(ParameterField::OverlayImage);
                }
            }
            Ok(None) => {
                log::debug!("{} not exposed by device", inner.spec.name);
                inner.core.set_flags(&mut st.common, false, false);
            }
            Err(e) => {
                log::debug!("Getting {} failed: {}", inner.spec.name.to_lowercase(), e);
                inner.core.set_flags(&mut st.common, false, false);
            }
        }

        assert_invariant!(
            st.selected.map_or(true, |i| i < st.options.len()),
            "Selected option must be a member of the options",
            inner.spec.name
        );
    }

    fn set_default(&self) -> Result<WriteOutcome, CameraError> {
        let mut st = self.inner.lock();
        if !st.common.supported {
            return Err(CameraError::NotSupported(self.inner.spec.name.to_string()));
        }
        if st.pending {
            return Err(CameraError::NotModifiable(format!(
                "{} has a write in progress",
                self.inner.spec.name
            )));
        }
        match self.inner.spec.default.pick(&st.options) {
            Some(index) if st.selected == Some(index) => Ok(WriteOutcome::Unchanged),
            Some(index) => self.write(&mut st, index),
            None => {
                log::debug!("{} has no default option on this device", self.inner.spec.name);
                Ok(WriteOutcome::Unchanged)
            }
        }
    }

    fn subscribe(&self) -> UnboundedReceiver<ParameterChange> {
        self.inner.core.subscribe()
    }

    fn kind(&self) -> ParameterKind {
        ParameterKind::Enumerated
    }

    fn as_enumerated(&self) -> Option<&dyn EnumeratedControl> {
        Some(self)
    }

    fn snapshot(&self) -> ParameterSnapshot {
        let st = self.inner.lock();
        ParameterSnapshot {
            name: self.inner.spec.name.to_string(),
            supported: st.common.supported,
            modifiable: st.common.modifiable,
            overlay_image: st.common.overlay_image.clone(),
            detail: SnapshotDetail::Enumerated {
                options: st.options.iter().map(ParameterOption::view).collect(),
                selected: st.selected,
            },
        }
    }
}

impl<T: PropertyValue> EnumeratedControl for EnumeratedParameter<T> {
    fn options(&self) -> Vec<OptionView> {
        self.inner.lock().options.iter().map(ParameterOption::view).collect()
    }

    fn selected_index(&self) -> Option<usize> {
        self.inner.lock().selected
    }

    fn select_index(&self, index: Option<usize>) -> Result<WriteOutcome, CameraError> {
        let Some(index) = index else {
            return Ok(WriteOutcome::Unchanged);
        };
        let value = self
            .inner
            .lock()
            .options
            .get(index)
            .map(|o| o.value.clone())
            .ok_or_else(|| CameraError::InvalidValue(format!("no option at index {}", index)))?;
        self.select_value(&value)
    }
}
