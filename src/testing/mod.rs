//! Canned device profiles
//!
//! Hardware descriptions modelled on the phone cameras the explorer was
//! built against. Used by the test suites and by the CLI when it is given a
//! profile name instead of a file.

use crate::device::simulated::{DeviceProfile, DiscreteProfile, RangeProfile};
use crate::types::{
    AutoFocusRange, FlashMode, FocusIlluminationMode, SceneMode, SensorLocation, WhiteBalancePreset,
};

/// Rear camera exposing all twelve catalog properties with real ranges.
pub fn full_profile() -> DeviceProfile {
    DeviceProfile {
        name: "full".to_string(),
        sensor: SensorLocation::Back,
        iso: Some(RangeProfile {
            min: 100,
            max: 3200,
            current: Some(200),
        }),
        // 1/8000 s to 1 s, currently 1/60 s.
        exposure_time: Some(RangeProfile {
            min: 125,
            max: 1_000_000,
            current: Some(16_666),
        }),
        exposure_compensation: Some(RangeProfile {
            min: -2,
            max: 2,
            current: Some(1),
        }),
        flash_power: Some(RangeProfile {
            min: 1,
            max: 10,
            current: Some(5),
        }),
        manual_white_balance: Some(RangeProfile {
            min: 2500,
            max: 8000,
            current: Some(5500),
        }),
        flash_mode: Some(DiscreteProfile {
            values: FlashMode::ALL.to_vec(),
            current: Some(FlashMode::Off),
        }),
        focus_illumination_mode: Some(DiscreteProfile {
            values: FocusIlluminationMode::ALL.to_vec(),
            current: Some(FocusIlluminationMode::Off),
        }),
        scene_mode: Some(DiscreteProfile {
            values: SceneMode::ALL.to_vec(),
            current: Some(SceneMode::Night),
        }),
        white_balance_preset: Some(DiscreteProfile {
            values: WhiteBalancePreset::ALL.to_vec(),
            current: Some(WhiteBalancePreset::Cloudy),
        }),
        auto_focus_range: Some(DiscreteProfile {
            values: AutoFocusRange::ALL.to_vec(),
            current: Some(AutoFocusRange::Macro),
        }),
        preview_resolutions: vec![[640, 480], [800, 448], [1280, 720]],
        preview_resolution: Some([1280, 720]),
        capture_resolutions: vec![[3264, 2448], [1920, 1080], [640, 480]],
        capture_resolution: Some([1920, 1080]),
    }
}

/// Like [`full_profile`] but flash power, exposure compensation and manual
/// white balance each report a single value, leaving nine settings the user
/// can change.
pub fn fixed_ranges_profile() -> DeviceProfile {
    DeviceProfile {
        name: "fixed-ranges".to_string(),
        exposure_compensation: Some(RangeProfile {
            min: 0,
            max: 0,
            current: Some(0),
        }),
        flash_power: Some(RangeProfile {
            min: 4,
            max: 4,
            current: Some(4),
        }),
        manual_white_balance: Some(RangeProfile {
            min: 5500,
            max: 5500,
            current: None,
        }),
        ..full_profile()
    }
}

/// Front camera with a handful of controls and no flash.
pub fn front_profile() -> DeviceProfile {
    DeviceProfile {
        name: "front".to_string(),
        sensor: SensorLocation::Front,
        iso: Some(RangeProfile {
            min: 50,
            max: 150,
            current: None,
        }),
        exposure_compensation: Some(RangeProfile {
            min: -2,
            max: 2,
            current: Some(-1),
        }),
        scene_mode: Some(DiscreteProfile {
            values: vec![SceneMode::Portrait, SceneMode::Sport],
            current: Some(SceneMode::Portrait),
        }),
        preview_resolutions: vec![[640, 480], [320, 240]],
        preview_resolution: Some([320, 240]),
        capture_resolutions: vec![[1280, 960], [640, 480]],
        capture_resolution: Some([640, 480]),
        ..DeviceProfile::default()
    }
}

pub fn profiles() -> Vec<DeviceProfile> {
    vec![full_profile(), fixed_ranges_profile(), front_profile()]
}

/// Finds a canned profile by name.
pub fn profile(name: &str) -> Option<DeviceProfile> {
    profiles().into_iter().find(|p| p.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_names_unique() {
        let mut names: Vec<_> = profiles().into_iter().map(|p| p.name).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), 3);
        assert!(profile("front").is_some());
        assert!(profile("missing").is_none());
    }

    #[test]
    fn test_fixed_ranges_keeps_other_properties() {
        let fixed = fixed_ranges_profile();
        assert_eq!(fixed.sensor, SensorLocation::Back);
        assert_eq!(fixed.iso, full_profile().iso);
        assert_eq!(fixed.flash_power.map(|r| (r.min, r.max)), Some((4, 4)));
    }
}
