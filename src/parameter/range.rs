use super::{
    CameraParameter, ChangeRelay, CommonState, ParameterCore, ParameterKind, ParameterSnapshot, ParameterStatus,
    RangeControl, SnapshotDetail, WriteOutcome,
};
use crate::assert_invariant;
use crate::device::SharedDevice;
use crate::errors::CameraError;
use crate::notify::{ParameterChange, ParameterField};
use crate::types::{PropertyKey, PropertyValue};
use std::fmt::Debug;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc::UnboundedReceiver;

/// Totally ordered scalar a range property can hold.
pub trait RangeValue: PropertyValue + Copy + PartialOrd + Default + Debug {
    fn to_i64(self) -> i64;
    fn from_i64(value: i64) -> Option<Self>;
}

impl RangeValue for i32 {
    fn to_i64(self) -> i64 {
        i64::from(self)
    }

    fn from_i64(value: i64) -> Option<Self> {
        i32::try_from(value).ok()
    }
}

impl RangeValue for u32 {
    fn to_i64(self) -> i64 {
        i64::from(self)
    }

    fn from_i64(value: i64) -> Option<Self> {
        u32::try_from(value).ok()
    }
}

/// Default-selection rule for a range parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeDefault {
    Minimum,
    /// Middle of the range, truncated toward zero.
    Midpoint,
    /// Zero when the range contains it, otherwise the midpoint.
    ZeroOrMidpoint,
}

impl RangeDefault {
    pub fn pick<T: RangeValue>(self, minimum: T, maximum: T) -> T {
        let (lo, hi) = (minimum.to_i64(), maximum.to_i64());
        let midpoint = T::from_i64((lo + hi) / 2).unwrap_or(minimum);
        match self {
            RangeDefault::Minimum => minimum,
            RangeDefault::Midpoint => midpoint,
            RangeDefault::ZeroOrMidpoint if lo <= 0 && 0 <= hi => T::from_i64(0).unwrap_or(midpoint),
            RangeDefault::ZeroOrMidpoint => midpoint,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RangeSpec {
    pub name: &'static str,
    pub key: PropertyKey,
    pub default: RangeDefault,
}

#[derive(Debug, Default)]
struct RangeState<T> {
    common: CommonState,
    minimum: T,
    maximum: T,
    value: T,
    /// False until the device reports an in-range value or one is written.
    /// A clamped value stays false so the next write reaches the device.
    has_value: bool,
}

/// Parameter whose domain is an inclusive `[minimum, maximum]` interval.
pub struct RangeParameter<T: RangeValue> {
    core: ParameterCore,
    spec: RangeSpec,
    state: Mutex<RangeState<T>>,
}

impl<T: RangeValue> RangeParameter<T> {
    /// Binds to `device` and reads the current range. When the device has no
    /// usable current value the default rule runs once.
    pub fn new(spec: RangeSpec, device: SharedDevice) -> Self {
        Self::with_relay(spec, device, None)
    }

    /// Like [`new`](Self::new), additionally forwarding every change to `relay`.
    pub fn with_relay(spec: RangeSpec, device: SharedDevice, relay: Option<ChangeRelay>) -> Self {
        let parameter = Self {
            core: ParameterCore::new(spec.name, false, device, relay),
            spec,
            state: Mutex::new(RangeState::default()),
        };
        parameter.refresh();

        let needs_default = {
            let st = parameter.lock();
            st.common.supported && !st.has_value
        };
        if needs_default {
            if let Err(e) = parameter.set_default() {
                log::debug!("No initial value for {}: {}", spec.name.to_lowercase(), e);
            }
        }
        parameter
    }

    pub fn key(&self) -> PropertyKey {
        self.spec.key
    }

    pub fn minimum(&self) -> T {
        self.lock().minimum
    }

    pub fn maximum(&self) -> T {
        self.lock().maximum
    }

    pub fn value(&self) -> T {
        self.lock().value
    }

    /// Writes `value` through to the device. On failure nothing changes.
    pub fn set_value(&self, value: T) -> Result<WriteOutcome, CameraError> {
        let mut st = self.lock();
        if !st.common.supported {
            return Err(CameraError::NotSupported(self.spec.name.to_string()));
        }
        if !st.common.modifiable {
            return Err(CameraError::NotModifiable(self.spec.name.to_string()));
        }
        if value < st.minimum || value > st.maximum {
            return Err(CameraError::InvalidValue(format!(
                "{:?} is outside [{:?}, {:?}] for {}",
                value, st.minimum, st.maximum, self.spec.name
            )));
        }
        self.write(&mut st, value)
    }

    fn write(&self, st: &mut RangeState<T>, value: T) -> Result<WriteOutcome, CameraError> {
        if st.has_value && st.value == value {
            return Ok(WriteOutcome::Unchanged);
        }
        let key = self.spec.key;
        self.core
            .device
            .call(|d| d.set_property(key, value.into_raw()))
            .map_err(|e| self.core.write_failed(e))?;

        st.value = value;
        st.has_value = true;
        log::debug!("{} set to {:?}", self.spec.name, value);
        self.core.notify(ParameterField::Value);
        Ok(WriteOutcome::Applied)
    }

    fn lock(&self) -> MutexGuard<'_, RangeState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn query(&self) -> Result<Option<(T, T, Option<T>)>, CameraError> {
        let key = self.spec.key;
        let mismatch = || CameraError::DeviceError(format!("unexpected value type for {}", key.as_str()));
        self.core.device.call(|d| {
            let Some(range) = d.supported_range(key)? else {
                return Ok(None);
            };
            let minimum = T::from_raw(&range.min).ok_or_else(mismatch)?;
            let maximum = T::from_raw(&range.max).ok_or_else(mismatch)?;
            if minimum > maximum {
                return Err(CameraError::DeviceError(format!(
                    "inverted range reported for {}",
                    key.as_str()
                )));
            }
            let current = match d.get_property(key)? {
                Some(raw) => Some(T::from_raw(&raw).ok_or_else(mismatch)?),
                None => None,
            };
            Ok(Some((minimum, maximum, current)))
        })
    }
}

impl<T: RangeValue> CameraParameter for RangeParameter<T> {
    fn name(&self) -> &str {
        self.spec.name
    }

    fn status(&self) -> ParameterStatus {
        self.lock().common.status
    }

    fn supported(&self) -> bool {
        self.lock().common.supported
    }

    fn modifiable(&self) -> bool {
        self.lock().common.modifiable
    }

    fn overlay_image(&self) -> Option<String> {
        None
    }

    fn refresh(&self) {
        self.lock().common.status = ParameterStatus::Refreshing;
        let queried = self.query();

        let mut st = self.lock();
        match queried {
            Ok(Some((minimum, maximum, current))) => {
                if st.minimum != minimum {
                    st.minimum = minimum;
                    self.core.notify(ParameterField::Minimum);
                }
                if st.maximum != maximum {
                    st.maximum = maximum;
                    self.core.notify(ParameterField::Maximum);
                }
                match current {
                    Some(v) if v < minimum || v > maximum => {
                        log::warn!("{} reported {:?} outside its own range", self.spec.name, v);
                        st.value = if v < minimum { minimum } else { maximum };
                        st.has_value = false;
                    }
                    Some(v) => {
                        st.value = v;
                        st.has_value = true;
                    }
                    None => {
                        st.value = minimum;
                        st.has_value = false;
                    }
                }
                self.core.set_flags(&mut st.common, true, minimum != maximum);
                self.core.notify(ParameterField::Value);
            }
            Ok(None) => {
                log::debug!("{} not exposed by device", self.spec.name);
                self.core.set_flags(&mut st.common, false, false);
            }
            Err(e) => {
                log::debug!("Getting {} failed: {}", self.spec.name.to_lowercase(), e);
                self.core.set_flags(&mut st.common, false, false);
            }
        }

        assert_invariant!(
            !st.common.supported || (st.minimum <= st.value && st.value <= st.maximum),
            "Range value must lie within bounds",
            self.spec.name
        );
    }

    fn set_default(&self) -> Result<WriteOutcome, CameraError> {
        let mut st = self.lock();
        if !st.common.supported {
            return Err(CameraError::NotSupported(self.spec.name.to_string()));
        }
        let target = self.spec.default.pick(st.minimum, st.maximum);
        self.write(&mut st, target)
    }

    fn subscribe(&self) -> UnboundedReceiver<ParameterChange> {
        self.core.subscribe()
    }

    fn kind(&self) -> ParameterKind {
        ParameterKind::Range
    }

    fn as_range(&self) -> Option<&dyn RangeControl> {
        Some(self)
    }

    fn snapshot(&self) -> ParameterSnapshot {
        let st = self.lock();
        ParameterSnapshot {
            name: self.spec.name.to_string(),
            supported: st.common.supported,
            modifiable: st.common.modifiable,
            overlay_image: None,
            detail: SnapshotDetail::Range {
                minimum: st.minimum.to_i64(),
                maximum: st.maximum.to_i64(),
                value: st.value.to_i64(),
            },
        }
    }
}

impl<T: RangeValue> RangeControl for RangeParameter<T> {
    fn minimum(&self) -> i64 {
        RangeParameter::minimum(self).to_i64()
    }

    fn maximum(&self) -> i64 {
        RangeParameter::maximum(self).to_i64()
    }

    fn value(&self) -> i64 {
        RangeParameter::value(self).to_i64()
    }

    fn set_value(&self, value: i64) -> Result<WriteOutcome, CameraError> {
        let typed = T::from_i64(value).ok_or_else(|| {
            CameraError::InvalidValue(format!("{} does not fit {}", value, self.spec.name))
        })?;
        RangeParameter::set_value(self, typed)
    }
}
