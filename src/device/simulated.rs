//! In-memory capture device
//!
//! Behaves like a phone camera that exposes a configurable subset of
//! properties. Writes can be scripted to fail, queries can be scripted to
//! throw, and resolution changes can be held open until a test releases
//! them, which makes every fallback path of the parameter model reachable
//! without hardware.

use super::{CaptureDevice, ResolutionFuture};
use crate::errors::CameraError;
use crate::types::{
    AutoFocusRange, FlashMode, FocusIlluminationMode, PropertyKey, PropertyRange, PropertyValue,
    RawValue, Resolution, ResolutionKind, SceneMode, SensorLocation, WhiteBalancePreset,
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::oneshot;

/// How the simulated device answers resolution changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResolutionMode {
    /// Applied before the returned future is polled.
    #[default]
    Immediate,
    /// Always fails.
    Reject,
    /// Held open until [`SimulatorRemote::complete_resolution_write`] is called.
    Deferred,
}

#[derive(Default)]
struct SimState {
    sensor: SensorLocation,
    open: bool,
    ranges: HashMap<PropertyKey, PropertyRange>,
    discrete: HashMap<PropertyKey, Vec<RawValue>>,
    values: HashMap<PropertyKey, RawValue>,
    rejected_writes: HashSet<PropertyKey>,
    failing_queries: HashSet<PropertyKey>,
    resolutions: HashMap<ResolutionKind, Vec<Resolution>>,
    current_resolution: HashMap<ResolutionKind, Resolution>,
    resolution_mode: ResolutionMode,
    pending: VecDeque<oneshot::Sender<Result<(), CameraError>>>,
    property_writes: Vec<(PropertyKey, RawValue)>,
    resolution_writes: Vec<(ResolutionKind, Resolution)>,
}

fn lock(state: &Mutex<SimState>) -> MutexGuard<'_, SimState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct SimulatedDevice {
    state: Arc<Mutex<SimState>>,
}

impl Default for SimulatedDevice {
    fn default() -> Self {
        Self::new(SensorLocation::Back)
    }
}

impl SimulatedDevice {
    pub fn new(sensor: SensorLocation) -> Self {
        Self {
            state: Arc::new(Mutex::new(SimState {
                sensor,
                open: true,
                ..SimState::default()
            })),
        }
    }

    pub fn from_profile(profile: &DeviceProfile) -> Self {
        let mut device = Self::new(profile.sensor);
        if let Some(r) = &profile.iso {
            device = device.with_range(PropertyKey::Iso, r.min, r.max, r.current);
        }
        if let Some(r) = &profile.exposure_time {
            device = device.with_range(PropertyKey::ExposureTime, r.min, r.max, r.current);
        }
        if let Some(r) = &profile.exposure_compensation {
            device = device.with_range(PropertyKey::ExposureCompensation, r.min, r.max, r.current);
        }
        if let Some(r) = &profile.flash_power {
            device = device.with_range(PropertyKey::FlashPower, r.min, r.max, r.current);
        }
        if let Some(r) = &profile.manual_white_balance {
            device = device.with_range(PropertyKey::ManualWhiteBalance, r.min, r.max, r.current);
        }
        if let Some(d) = &profile.flash_mode {
            device = device.with_values(PropertyKey::FlashMode, d.values.clone(), d.current);
        }
        if let Some(d) = &profile.focus_illumination_mode {
            device = device.with_values(PropertyKey::FocusIlluminationMode, d.values.clone(), d.current);
        }
        if let Some(d) = &profile.scene_mode {
            device = device.with_values(PropertyKey::SceneMode, d.values.clone(), d.current);
        }
        if let Some(d) = &profile.white_balance_preset {
            device = device.with_values(PropertyKey::WhiteBalancePreset, d.values.clone(), d.current);
        }
        if let Some(d) = &profile.auto_focus_range {
            device = device.with_values(PropertyKey::AutoFocusRange, d.values.clone(), d.current);
        }
        if !profile.preview_resolutions.is_empty() {
            device = device.with_resolutions(
                ResolutionKind::Preview,
                profile.preview_resolutions.iter().copied().map(Resolution::from).collect(),
                profile.preview_resolution.map(Resolution::from),
            );
        }
        if !profile.capture_resolutions.is_empty() {
            device = device.with_resolutions(
                ResolutionKind::Capture,
                profile.capture_resolutions.iter().copied().map(Resolution::from).collect(),
                profile.capture_resolution.map(Resolution::from),
            );
        }
        device
    }

    pub fn with_range<T: PropertyValue>(self, key: PropertyKey, min: T, max: T, current: Option<T>) -> Self {
        {
            let mut s = lock(&self.state);
            s.ranges.insert(key, PropertyRange::new(min.into_raw(), max.into_raw()));
            match current {
                Some(v) => s.values.insert(key, v.into_raw()),
                None => s.values.remove(&key),
            };
        }
        self
    }

    pub fn with_values<T: PropertyValue>(self, key: PropertyKey, values: Vec<T>, current: Option<T>) -> Self {
        {
            let mut s = lock(&self.state);
            s.discrete.insert(key, values.into_iter().map(PropertyValue::into_raw).collect());
            match current {
                Some(v) => s.values.insert(key, v.into_raw()),
                None => s.values.remove(&key),
            };
        }
        self
    }

    pub fn with_resolutions(self, kind: ResolutionKind, sizes: Vec<Resolution>, current: Option<Resolution>) -> Self {
        {
            let mut s = lock(&self.state);
            let current = current.or_else(|| sizes.first().copied());
            s.resolutions.insert(kind, sizes);
            match current {
                Some(c) => s.current_resolution.insert(kind, c),
                None => s.current_resolution.remove(&kind),
            };
        }
        self
    }

    /// Every write to `key` fails as if the hardware refused it.
    pub fn rejecting_writes(self, key: PropertyKey) -> Self {
        lock(&self.state).rejected_writes.insert(key);
        self
    }

    /// Range and value queries for `key` fail with a device error.
    pub fn failing_queries(self, key: PropertyKey) -> Self {
        lock(&self.state).failing_queries.insert(key);
        self
    }

    pub fn with_resolution_mode(self, mode: ResolutionMode) -> Self {
        lock(&self.state).resolution_mode = mode;
        self
    }

    /// Observation/control handle that stays valid after the device has been
    /// moved into a session.
    pub fn remote(&self) -> SimulatorRemote {
        SimulatorRemote {
            state: Arc::clone(&self.state),
        }
    }

    fn check_query(s: &SimState, key: PropertyKey) -> Result<(), CameraError> {
        if s.failing_queries.contains(&key) {
            return Err(CameraError::DeviceError(format!("query for {} failed", key.as_str())));
        }
        Ok(())
    }
}

impl CaptureDevice for SimulatedDevice {
    fn sensor_location(&self) -> SensorLocation {
        lock(&self.state).sensor
    }

    fn is_open(&self) -> bool {
        lock(&self.state).open
    }

    fn supported_range(&self, key: PropertyKey) -> Result<Option<PropertyRange>, CameraError> {
        let s = lock(&self.state);
        Self::check_query(&s, key)?;
        Ok(s.ranges.get(&key).copied())
    }

    fn supported_values(&self, key: PropertyKey) -> Result<Option<Vec<RawValue>>, CameraError> {
        let s = lock(&self.state);
        Self::check_query(&s, key)?;
        Ok(s.discrete.get(&key).cloned())
    }

    fn get_property(&self, key: PropertyKey) -> Result<Option<RawValue>, CameraError> {
        let s = lock(&self.state);
        Self::check_query(&s, key)?;
        Ok(s.values.get(&key).copied())
    }

    fn set_property(&mut self, key: PropertyKey, value: RawValue) -> Result<(), CameraError> {
        let mut s = lock(&self.state);
        if !s.open {
            return Err(CameraError::DeviceUnavailable("device is closed".to_string()));
        }
        if s.rejected_writes.contains(&key) {
            return Err(CameraError::DeviceError(format!("{} write refused", key.as_str())));
        }
        let accepted = match (s.ranges.get(&key), s.discrete.get(&key)) {
            (Some(range), _) => raw_within(&value, range),
            (None, Some(values)) => values.contains(&value),
            (None, None) => false,
        };
        if !accepted {
            return Err(CameraError::InvalidValue(format!(
                "{:?} is outside the supported domain of {}",
                value,
                key.as_str()
            )));
        }
        s.values.insert(key, value);
        s.property_writes.push((key, value));
        Ok(())
    }

    fn available_resolutions(&self, kind: ResolutionKind) -> Result<Vec<Resolution>, CameraError> {
        Ok(lock(&self.state).resolutions.get(&kind).cloned().unwrap_or_default())
    }

    fn current_resolution(&self, kind: ResolutionKind) -> Result<Resolution, CameraError> {
        lock(&self.state)
            .current_resolution
            .get(&kind)
            .copied()
            .ok_or_else(|| CameraError::NotSupported(format!("{:?} resolution", kind)))
    }

    fn set_resolution_async(&mut self, kind: ResolutionKind, size: Resolution) -> ResolutionFuture {
        let mut s = lock(&self.state);
        s.resolution_writes.push((kind, size));

        let listed = s.resolutions.get(&kind).is_some_and(|sizes| sizes.contains(&size));
        if !listed {
            return Box::pin(async move {
                Err(CameraError::InvalidValue(format!("{} is not an available {:?} resolution", size, kind)))
            });
        }

        match s.resolution_mode {
            ResolutionMode::Immediate => {
                s.current_resolution.insert(kind, size);
                Box::pin(async { Ok(()) })
            }
            ResolutionMode::Reject => Box::pin(async move {
                Err(CameraError::DeviceError(format!("{:?} resolution change refused", kind)))
            }),
            ResolutionMode::Deferred => {
                let (tx, rx) = oneshot::channel();
                s.pending.push_back(tx);
                let state = Arc::clone(&self.state);
                Box::pin(async move {
                    let outcome = rx.await.map_err(|_| {
                        CameraError::DeviceError("resolution request abandoned".to_string())
                    })?;
                    outcome?;
                    lock(&state).current_resolution.insert(kind, size);
                    Ok(())
                })
            }
        }
    }

    fn close(&mut self) {
        let mut s = lock(&self.state);
        s.open = false;
        s.pending.clear();
    }
}

fn raw_within(value: &RawValue, range: &PropertyRange) -> bool {
    match (value, &range.min, &range.max) {
        (RawValue::I32(v), RawValue::I32(lo), RawValue::I32(hi)) => lo <= v && v <= hi,
        (RawValue::U32(v), RawValue::U32(lo), RawValue::U32(hi)) => lo <= v && v <= hi,
        _ => false,
    }
}

/// Handle for inspecting and steering a [`SimulatedDevice`] from outside.
#[derive(Clone)]
pub struct SimulatorRemote {
    state: Arc<Mutex<SimState>>,
}

impl SimulatorRemote {
    pub fn property_writes(&self) -> Vec<(PropertyKey, RawValue)> {
        lock(&self.state).property_writes.clone()
    }

    pub fn resolution_writes(&self) -> Vec<(ResolutionKind, Resolution)> {
        lock(&self.state).resolution_writes.clone()
    }

    pub fn value(&self, key: PropertyKey) -> Option<RawValue> {
        lock(&self.state).values.get(&key).copied()
    }

    pub fn current_resolution(&self, kind: ResolutionKind) -> Option<Resolution> {
        lock(&self.state).current_resolution.get(&kind).copied()
    }

    /// Changes a value behind the model's back, as the hardware might.
    pub fn set_value(&self, key: PropertyKey, value: RawValue) {
        lock(&self.state).values.insert(key, value);
    }

    pub fn set_rejecting_writes(&self, key: PropertyKey, rejecting: bool) {
        let mut s = lock(&self.state);
        if rejecting {
            s.rejected_writes.insert(key);
        } else {
            s.rejected_writes.remove(&key);
        }
    }

    pub fn set_failing_queries(&self, key: PropertyKey, failing: bool) {
        let mut s = lock(&self.state);
        if failing {
            s.failing_queries.insert(key);
        } else {
            s.failing_queries.remove(&key);
        }
    }

    pub fn set_resolution_mode(&self, mode: ResolutionMode) {
        lock(&self.state).resolution_mode = mode;
    }

    pub fn pending_resolution_writes(&self) -> usize {
        lock(&self.state).pending.len()
    }

    /// Resolves the oldest deferred resolution change. Returns false when
    /// nothing was pending.
    pub fn complete_resolution_write(&self, outcome: Result<(), CameraError>) -> bool {
        let sender = lock(&self.state).pending.pop_front();
        match sender {
            Some(tx) => tx.send(outcome).is_ok(),
            None => false,
        }
    }

    pub fn is_open(&self) -> bool {
        lock(&self.state).open
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeProfile<T> {
    pub min: T,
    pub max: T,
    pub current: Option<T>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscreteProfile<T> {
    pub values: Vec<T>,
    pub current: Option<T>,
}

/// Declarative description of a simulated camera, loadable from TOML.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceProfile {
    pub name: String,
    pub sensor: SensorLocation,
    pub iso: Option<RangeProfile<u32>>,
    /// Microseconds.
    pub exposure_time: Option<RangeProfile<u32>>,
    pub exposure_compensation: Option<RangeProfile<i32>>,
    pub flash_power: Option<RangeProfile<u32>>,
    /// Kelvin.
    pub manual_white_balance: Option<RangeProfile<u32>>,
    pub flash_mode: Option<DiscreteProfile<FlashMode>>,
    pub focus_illumination_mode: Option<DiscreteProfile<FocusIlluminationMode>>,
    pub scene_mode: Option<DiscreteProfile<SceneMode>>,
    pub white_balance_preset: Option<DiscreteProfile<WhiteBalancePreset>>,
    pub auto_focus_range: Option<DiscreteProfile<AutoFocusRange>>,
    pub preview_resolutions: Vec<[u32; 2]>,
    pub preview_resolution: Option<[u32; 2]>,
    pub capture_resolutions: Vec<[u32; 2]>,
    pub capture_resolution: Option<[u32; 2]>,
}

impl DeviceProfile {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, CameraError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| {
            CameraError::ConfigError(format!("Failed to read device profile {:?}: {}", path, e))
        })?;
        let profile: DeviceProfile = toml::from_str(&contents).map_err(|e| {
            CameraError::ConfigError(format!("Failed to parse device profile {:?}: {}", path, e))
        })?;
        log::info!("Loaded device profile '{}' from {:?}", profile.name, path);
        Ok(profile)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), CameraError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                CameraError::ConfigError(format!("Failed to create profile directory: {}", e))
            })?;
        }
        let toml_string = toml::to_string_pretty(self)
            .map_err(|e| CameraError::ConfigError(format!("Failed to serialize profile: {}", e)))?;
        fs::write(path, toml_string)
            .map_err(|e| CameraError::ConfigError(format!("Failed to write profile: {}", e)))?;
        Ok(())
    }
}
