//! Concrete parameter catalog
//!
//! One declaration per physical property: which key it binds, how raw
//! values become labelled options, which overlay image each option shows and
//! how the default is chosen. Declaration order here is the display order of
//! the settings collection.

use crate::config::{ExplorerConfig, ExposureTimeDefault, WhiteBalanceDefault};
use crate::device::{CaptureDevice, SharedDevice};
use crate::errors::CameraError;
use crate::parameter::{
    CameraParameter, ChangeRelay, DefaultRule, Domain, EnumeratedParameter, EnumeratedSpec, ParameterKind,
    RangeDefault, RangeParameter, RangeSpec, WriteTarget,
};
use crate::types::{
    AutoFocusRange, FlashMode, FocusIlluminationMode, PropertyKey, PropertyValue, Resolution,
    ResolutionKind, SceneMode, WhiteBalancePreset,
};
use std::sync::Arc;

/// Standard ISO steps, lowest first.
pub const ISO_LADDER: [u32; 6] = [100, 200, 400, 800, 1600, 3200];

/// Shutter speed denominators, fastest first. Each rung is `1/n` seconds.
pub const SHUTTER_LADDER: [u32; 15] = [16000, 8000, 4000, 2000, 1000, 500, 250, 125, 60, 30, 15, 8, 4, 2, 1];

const MICROS_PER_SECOND: u32 = 1_000_000;

/// Exposure time of the 1/30 s rung, in microseconds.
pub const THIRTIETH_OF_A_SECOND_US: u32 = MICROS_PER_SECOND / 30;

/// Length of a `1/denominator` s exposure in microseconds. `None` for zero.
pub fn shutter_micros(denominator: u32) -> Option<u32> {
    MICROS_PER_SECOND.checked_div(denominator)
}

/// Inverse of [`shutter_micros`] for values on the ladder.
pub fn shutter_denominator(micros: u32) -> Option<u32> {
    SHUTTER_LADDER
        .iter()
        .copied()
        .find(|&d| shutter_micros(d) == Some(micros))
}

fn property_key(target: WriteTarget) -> Result<PropertyKey, CameraError> {
    match target {
        WriteTarget::Property(key) => Ok(key),
        WriteTarget::Resolution(kind) => Err(CameraError::InvalidValue(format!(
            "{:?} resolution is not a property",
            kind
        ))),
    }
}

fn downcast<T: PropertyValue>(key: PropertyKey, raw: &crate::types::RawValue) -> Result<T, CameraError> {
    T::from_raw(raw).ok_or_else(|| {
        CameraError::DeviceError(format!("unexpected value {:?} for {}", raw, key.as_str()))
    })
}

/// Options straight from the device's discrete value set, in device order.
pub fn populate_discrete<T: PropertyValue>(
    device: &dyn CaptureDevice,
    target: WriteTarget,
) -> Result<Option<Domain<T>>, CameraError> {
    let key = property_key(target)?;
    let Some(raw_values) = device.supported_values(key)? else {
        return Ok(None);
    };
    let values = raw_values
        .iter()
        .map(|raw| downcast::<T>(key, raw))
        .collect::<Result<Vec<_>, _>>()?;
    let current = device
        .get_property(key)?
        .map(|raw| downcast::<T>(key, &raw))
        .transpose()?;
    Ok(Some(Domain { values, current }))
}

/// Ladder rungs (converted by `to_value`) that fall inside the device range,
/// in ladder order.
fn populate_ladder(
    device: &dyn CaptureDevice,
    target: WriteTarget,
    rungs: &[u32],
    to_value: fn(u32) -> Option<u32>,
) -> Result<Option<Domain<u32>>, CameraError> {
    let key = property_key(target)?;
    let Some(range) = device.supported_range(key)? else {
        return Ok(None);
    };
    let minimum: u32 = downcast(key, &range.min)?;
    let maximum: u32 = downcast(key, &range.max)?;
    let values = rungs
        .iter()
        .filter_map(|&rung| to_value(rung))
        .filter(|v| (minimum..=maximum).contains(v))
        .collect();
    let current = device
        .get_property(key)?
        .map(|raw| downcast::<u32>(key, &raw))
        .transpose()?;
    Ok(Some(Domain { values, current }))
}

pub fn populate_iso(device: &dyn CaptureDevice, target: WriteTarget) -> Result<Option<Domain<u32>>, CameraError> {
    populate_ladder(device, target, &ISO_LADDER, Some)
}

pub fn populate_exposure_time(
    device: &dyn CaptureDevice,
    target: WriteTarget,
) -> Result<Option<Domain<u32>>, CameraError> {
    populate_ladder(device, target, &SHUTTER_LADDER, shutter_micros)
}

pub fn populate_resolutions(
    device: &dyn CaptureDevice,
    target: WriteTarget,
) -> Result<Option<Domain<Resolution>>, CameraError> {
    let WriteTarget::Resolution(kind) = target else {
        return Err(CameraError::InvalidValue("resolution parameters need a resolution target".into()));
    };
    let values = device.available_resolutions(kind)?;
    let current = device.current_resolution(kind).ok();
    Ok(Some(Domain { values, current }))
}

fn iso_label(iso: &u32) -> String {
    format!("ISO {}", iso)
}

fn iso_overlay(iso: &u32) -> String {
    format!("overlay.iso.{}.png", iso)
}

fn exposure_time_label(micros: &u32) -> String {
    match shutter_denominator(*micros) {
        Some(1) => "1 s".to_string(),
        Some(d) => format!("1/{} s", d),
        None => format!("{} µs", micros),
    }
}

fn exposure_time_overlay(micros: &u32) -> String {
    match shutter_denominator(*micros) {
        Some(d) => format!("overlay.exposuretime.{}.png", d),
        None => "overlay.exposuretime.auto.png".to_string(),
    }
}

fn flash_mode_overlay(mode: &FlashMode) -> String {
    format!("overlay.flashmode.{}.png", mode.overlay_token())
}

fn scene_mode_overlay(mode: &SceneMode) -> String {
    format!("overlay.scenemode.{}.png", mode.overlay_token())
}

fn white_balance_preset_overlay(preset: &WhiteBalancePreset) -> String {
    format!("overlay.whitebalancepreset.{}.png", preset.overlay_token())
}

pub fn iso_spec() -> EnumeratedSpec<u32> {
    EnumeratedSpec {
        name: "ISO",
        target: WriteTarget::Property(PropertyKey::Iso),
        populate: populate_iso,
        label: iso_label,
        overlay: Some(iso_overlay),
        default: DefaultRule::First,
    }
}

pub fn exposure_time_spec(policy: ExposureTimeDefault) -> EnumeratedSpec<u32> {
    let default = match policy {
        // The ladder runs fastest to slowest, so "last" is the slowest speed.
        ExposureTimeDefault::ThirtiethOrSlowest => DefaultRule::MatchOrLast(THIRTIETH_OF_A_SECOND_US),
        ExposureTimeDefault::Slowest => DefaultRule::Last,
        ExposureTimeDefault::Fastest => DefaultRule::First,
    };
    EnumeratedSpec {
        name: "Exposure time",
        target: WriteTarget::Property(PropertyKey::ExposureTime),
        populate: populate_exposure_time,
        label: exposure_time_label,
        overlay: Some(exposure_time_overlay),
        default,
    }
}

pub fn exposure_compensation_spec() -> RangeSpec {
    RangeSpec {
        name: "Exposure compensation",
        key: PropertyKey::ExposureCompensation,
        default: RangeDefault::ZeroOrMidpoint,
    }
}

pub fn flash_mode_spec() -> EnumeratedSpec<FlashMode> {
    EnumeratedSpec {
        name: "Flash mode",
        target: WriteTarget::Property(PropertyKey::FlashMode),
        populate: populate_discrete::<FlashMode>,
        label: |mode| mode.label().to_string(),
        overlay: Some(flash_mode_overlay),
        default: DefaultRule::Match(FlashMode::Auto),
    }
}

pub fn flash_power_spec() -> RangeSpec {
    RangeSpec {
        name: "Flash power",
        key: PropertyKey::FlashPower,
        default: RangeDefault::Minimum,
    }
}

pub fn focus_illumination_mode_spec() -> EnumeratedSpec<FocusIlluminationMode> {
    EnumeratedSpec {
        name: "Focus illumination mode",
        target: WriteTarget::Property(PropertyKey::FocusIlluminationMode),
        populate: populate_discrete::<FocusIlluminationMode>,
        label: |mode| mode.label().to_string(),
        overlay: None,
        default: DefaultRule::Match(FocusIlluminationMode::Auto),
    }
}

pub fn scene_mode_spec() -> EnumeratedSpec<SceneMode> {
    EnumeratedSpec {
        name: "Scene mode",
        target: WriteTarget::Property(PropertyKey::SceneMode),
        populate: populate_discrete::<SceneMode>,
        label: |mode| mode.label().to_string(),
        overlay: Some(scene_mode_overlay),
        default: DefaultRule::MatchOrLast(SceneMode::Auto),
    }
}

pub fn white_balance_preset_spec(policy: WhiteBalanceDefault) -> EnumeratedSpec<WhiteBalancePreset> {
    let default = match policy {
        WhiteBalanceDefault::First => DefaultRule::First,
        WhiteBalanceDefault::Last => DefaultRule::Last,
        WhiteBalanceDefault::None => DefaultRule::Unset,
    };
    EnumeratedSpec {
        name: "White balance preset",
        target: WriteTarget::Property(PropertyKey::WhiteBalancePreset),
        populate: populate_discrete::<WhiteBalancePreset>,
        label: |preset| preset.label().to_string(),
        overlay: Some(white_balance_preset_overlay),
        default,
    }
}

pub fn manual_white_balance_spec() -> RangeSpec {
    RangeSpec {
        name: "Manual white balance",
        key: PropertyKey::ManualWhiteBalance,
        default: RangeDefault::Minimum,
    }
}

pub fn auto_focus_range_spec() -> EnumeratedSpec<AutoFocusRange> {
    EnumeratedSpec {
        name: "Autofocus range",
        target: WriteTarget::Property(PropertyKey::AutoFocusRange),
        populate: populate_discrete::<AutoFocusRange>,
        label: |range| range.label().to_string(),
        overlay: None,
        default: DefaultRule::Match(AutoFocusRange::Normal),
    }
}

/// Defaults to `preferred` when the device lists it, otherwise to the first
/// size the device offers.
pub fn resolution_spec(kind: ResolutionKind, preferred: Resolution) -> EnumeratedSpec<Resolution> {
    EnumeratedSpec {
        name: match kind {
            ResolutionKind::Preview => "Preview resolution",
            ResolutionKind::Capture => "Capture resolution",
        },
        target: WriteTarget::Resolution(kind),
        populate: populate_resolutions,
        label: |size| size.to_string(),
        overlay: None,
        default: DefaultRule::MatchOrFirst(preferred),
    }
}

type Builder = Box<dyn Fn(&SharedDevice, Option<ChangeRelay>) -> Arc<dyn CameraParameter> + Send + Sync>;

/// One buildable row of the catalog.
pub struct CatalogEntry {
    pub name: &'static str,
    pub kind: ParameterKind,
    builder: Builder,
}

impl CatalogEntry {
    fn range<T: crate::parameter::RangeValue>(spec: RangeSpec) -> Self {
        Self {
            name: spec.name,
            kind: ParameterKind::Range,
            builder: Box::new(
                move |device: &SharedDevice, relay: Option<ChangeRelay>| -> Arc<dyn CameraParameter> {
                    Arc::new(RangeParameter::<T>::with_relay(spec, device.clone(), relay))
                },
            ),
        }
    }

    fn enumerated<T: PropertyValue>(spec: EnumeratedSpec<T>, icon_directory: &str) -> Self {
        let icon_directory = icon_directory.to_string();
        Self {
            name: spec.name,
            kind: ParameterKind::Enumerated,
            builder: Box::new(
                move |device: &SharedDevice, relay: Option<ChangeRelay>| -> Arc<dyn CameraParameter> {
                    Arc::new(EnumeratedParameter::with_relay(
                        spec.clone(),
                        device.clone(),
                        icon_directory.clone(),
                        relay,
                    ))
                },
            ),
        }
    }

    /// Constructs the parameter bound to `device`; construction performs the
    /// first refresh.
    pub fn build(&self, device: &SharedDevice) -> Arc<dyn CameraParameter> {
        (self.builder)(device, None)
    }

    /// Like [`build`](Self::build), with every change also sent to `relay`.
    pub fn build_relayed(&self, device: &SharedDevice, relay: &ChangeRelay) -> Arc<dyn CameraParameter> {
        (self.builder)(device, Some(Arc::clone(relay)))
    }
}

impl std::fmt::Debug for CatalogEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogEntry")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

/// The full catalog in display order.
pub fn entries(config: &ExplorerConfig) -> Vec<CatalogEntry> {
    let icons = config.overlay.icon_directory.as_str();
    vec![
        CatalogEntry::enumerated(iso_spec(), icons),
        CatalogEntry::enumerated(exposure_time_spec(config.defaults.exposure_time), icons),
        CatalogEntry::range::<i32>(exposure_compensation_spec()),
        CatalogEntry::enumerated(flash_mode_spec(), icons),
        CatalogEntry::range::<u32>(flash_power_spec()),
        CatalogEntry::enumerated(focus_illumination_mode_spec(), icons),
        CatalogEntry::enumerated(scene_mode_spec(), icons),
        CatalogEntry::enumerated(white_balance_preset_spec(config.defaults.white_balance_preset), icons),
        CatalogEntry::range::<u32>(manual_white_balance_spec()),
        CatalogEntry::enumerated(auto_focus_range_spec(), icons),
        CatalogEntry::enumerated(resolution_spec(ResolutionKind::Preview, config.session.preview()), icons),
        CatalogEntry::enumerated(resolution_spec(ResolutionKind::Capture, config.session.capture()), icons),
    ]
}
