//! Value types shared between the capture device facade and the parameter model.
//!
//! The facade speaks [`RawValue`], a closed union of everything a camera
//! property can hold. Parameters never keep raw values around: each one
//! converts through [`PropertyValue`] into its own typed domain as soon as the
//! value crosses the device boundary.

use crate::errors::CameraError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Stable identifier of a camera-controllable property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PropertyKey {
    Iso,
    ExposureTime,
    ExposureCompensation,
    FlashMode,
    FlashPower,
    FocusIlluminationMode,
    SceneMode,
    WhiteBalancePreset,
    ManualWhiteBalance,
    AutoFocusRange,
}

impl PropertyKey {
    pub const ALL: [PropertyKey; 10] = [
        PropertyKey::Iso,
        PropertyKey::ExposureTime,
        PropertyKey::ExposureCompensation,
        PropertyKey::FlashMode,
        PropertyKey::FlashPower,
        PropertyKey::FocusIlluminationMode,
        PropertyKey::SceneMode,
        PropertyKey::WhiteBalancePreset,
        PropertyKey::ManualWhiteBalance,
        PropertyKey::AutoFocusRange,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyKey::Iso => "Iso",
            PropertyKey::ExposureTime => "ExposureTime",
            PropertyKey::ExposureCompensation => "ExposureCompensation",
            PropertyKey::FlashMode => "FlashMode",
            PropertyKey::FlashPower => "FlashPower",
            PropertyKey::FocusIlluminationMode => "FocusIlluminationMode",
            PropertyKey::SceneMode => "SceneMode",
            PropertyKey::WhiteBalancePreset => "WhiteBalancePreset",
            PropertyKey::ManualWhiteBalance => "ManualWhiteBalance",
            PropertyKey::AutoFocusRange => "AutoFocusRange",
        }
    }
}

impl FromStr for PropertyKey {
    type Err = CameraError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PropertyKey::ALL
            .into_iter()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| CameraError::InvalidValue(format!("unknown property '{}'", s)))
    }
}

/// Which physical sensor a device session is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SensorLocation {
    #[default]
    Back,
    Front,
}

/// The two resolution-bearing streams of a capture device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResolutionKind {
    Preview,
    Capture,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn pixel_count(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} x {}", self.width, self.height)
    }
}

impl From<[u32; 2]> for Resolution {
    fn from(size: [u32; 2]) -> Self {
        Resolution::new(size[0], size[1])
    }
}

/// Declares a closed hardware enumeration with its user-facing labels and
/// lowercase overlay token.
macro_rules! hardware_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $label:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn label(&self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }

            /// Token used in overlay image file names.
            pub fn overlay_token(&self) -> String {
                format!("{:?}", self).to_lowercase()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.label())
            }
        }

        impl FromStr for $name {
            type Err = CameraError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                $name::ALL
                    .iter()
                    .copied()
                    .find(|v| v.label().eq_ignore_ascii_case(s) || format!("{:?}", v) == s)
                    .ok_or_else(|| {
                        CameraError::InvalidValue(format!("unknown {} '{}'", stringify!($name), s))
                    })
            }
        }
    };
}

hardware_enum!(FlashMode {
    Auto => "Auto",
    Off => "Off",
    On => "On",
    RedEyeReduction => "Red-eye reduction",
});

hardware_enum!(FocusIlluminationMode {
    Auto => "Auto",
    Off => "Off",
    On => "On",
});

hardware_enum!(SceneMode {
    Auto => "Auto",
    Portrait => "Portrait",
    Sport => "Sport",
    Snow => "Snow",
    Night => "Night",
    Beach => "Beach",
    Sunset => "Sunset",
    Candlelight => "Candlelight",
    Landscape => "Landscape",
    NightPortrait => "NightPortrait",
    Backlit => "Backlit",
});

hardware_enum!(WhiteBalancePreset {
    Candlelight => "Candlelight",
    Cloudy => "Cloudy",
    Daylight => "Daylight",
    Flash => "Flash",
    Fluorescent => "Fluorescent",
    Tungsten => "Tungsten",
});

hardware_enum!(AutoFocusRange {
    Full => "Full",
    Hyperfocal => "Hyperfocal",
    Infinity => "Infinity",
    Macro => "Macro",
    Normal => "Normal",
});

/// Untyped value as reported by, or written to, the capture device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RawValue {
    I32(i32),
    U32(u32),
    FlashMode(FlashMode),
    FocusIlluminationMode(FocusIlluminationMode),
    SceneMode(SceneMode),
    WhiteBalancePreset(WhiteBalancePreset),
    AutoFocusRange(AutoFocusRange),
    Size(Resolution),
}

/// Inclusive bounds reported by the device for a range property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyRange {
    pub min: RawValue,
    pub max: RawValue,
}

impl PropertyRange {
    pub fn new(min: RawValue, max: RawValue) -> Self {
        Self { min, max }
    }
}

/// Typed accessor for values crossing the device boundary.
pub trait PropertyValue: Clone + PartialEq + fmt::Debug + Send + Sync + 'static {
    fn from_raw(raw: &RawValue) -> Option<Self>;
    fn into_raw(self) -> RawValue;
}

macro_rules! property_value {
    ($ty:ty, $variant:ident) => {
        impl PropertyValue for $ty {
            fn from_raw(raw: &RawValue) -> Option<Self> {
                match raw {
                    RawValue::$variant(v) => Some(*v),
                    _ => None,
                }
            }

            fn into_raw(self) -> RawValue {
                RawValue::$variant(self)
            }
        }
    };
}

property_value!(i32, I32);
property_value!(u32, U32);
property_value!(FlashMode, FlashMode);
property_value!(FocusIlluminationMode, FocusIlluminationMode);
property_value!(SceneMode, SceneMode);
property_value!(WhiteBalancePreset, WhiteBalancePreset);
property_value!(AutoFocusRange, AutoFocusRange);
property_value!(Resolution, Size);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_value_downcast_matches_variant_only() {
        assert_eq!(u32::from_raw(&RawValue::U32(400)), Some(400));
        assert_eq!(u32::from_raw(&RawValue::I32(400)), None);
        assert_eq!(
            FlashMode::from_raw(&RawValue::FlashMode(FlashMode::On)),
            Some(FlashMode::On)
        );
        assert_eq!(SceneMode::from_raw(&RawValue::FlashMode(FlashMode::On)), None);
    }

    #[test]
    fn test_labels_and_overlay_tokens() {
        assert_eq!(FlashMode::RedEyeReduction.label(), "Red-eye reduction");
        assert_eq!(FlashMode::RedEyeReduction.overlay_token(), "redeyereduction");
        assert_eq!(SceneMode::NightPortrait.to_string(), "NightPortrait");
        assert_eq!(SceneMode::ALL.len(), 11);
        assert_eq!(WhiteBalancePreset::ALL.len(), 6);
    }

    #[test]
    fn test_enum_from_str_accepts_label_or_variant() {
        assert_eq!("red-eye reduction".parse::<FlashMode>(), Ok(FlashMode::RedEyeReduction));
        assert_eq!("RedEyeReduction".parse::<FlashMode>(), Ok(FlashMode::RedEyeReduction));
        assert_eq!("Hyperfocal".parse::<AutoFocusRange>(), Ok(AutoFocusRange::Hyperfocal));
        assert_eq!("ManualWhiteBalance".parse::<PropertyKey>(), Ok(PropertyKey::ManualWhiteBalance));
    }

    #[test]
    fn test_unknown_names_are_invalid_values() {
        let err = "Sepia".parse::<WhiteBalancePreset>().unwrap_err();
        assert_eq!(err, CameraError::InvalidValue("unknown WhiteBalancePreset 'Sepia'".to_string()));
        assert!(err.is_recoverable());

        let err = "Zoom".parse::<PropertyKey>().unwrap_err();
        assert_eq!(err, CameraError::InvalidValue("unknown property 'Zoom'".to_string()));
    }

    #[test]
    fn test_resolution_display() {
        assert_eq!(Resolution::new(640, 480).to_string(), "640 x 480");
        assert_eq!(Resolution::from([1280, 720]).pixel_count(), 921_600);
    }
}
