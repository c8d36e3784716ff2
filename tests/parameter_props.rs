//! Property-Based Tests for the parameter model
//!
//! These tests verify invariants of range and enumerated parameters over
//! arbitrary device domains using proptest for input generation and
//! shrinking.

use camera_explorer::catalog::{self, ISO_LADDER};
use camera_explorer::parameter::{EnumeratedParameter, RangeParameter};
use camera_explorer::types::SceneMode;
use camera_explorer::{CameraError, CameraParameter, PropertyKey, SharedDevice, SimulatedDevice};
use proptest::prelude::*;

fn compensation(lo: i32, hi: i32, current: Option<i32>) -> RangeParameter<i32> {
    let device = SharedDevice::new(SimulatedDevice::default().with_range(
        PropertyKey::ExposureCompensation,
        lo,
        hi,
        current,
    ));
    RangeParameter::new(catalog::exposure_compensation_spec(), device)
}

fn scene(values: Vec<SceneMode>, current: Option<SceneMode>) -> EnumeratedParameter<SceneMode> {
    let device = SharedDevice::new(SimulatedDevice::default().with_values(PropertyKey::SceneMode, values, current));
    EnumeratedParameter::new(catalog::scene_mode_spec(), device, "Assets/Icons")
}

fn ordered_range() -> impl Strategy<Value = (i32, i32)> {
    (-1000i32..1000, 0i32..500).prop_map(|(lo, span)| (lo, lo + span))
}

proptest! {
    // ═══════════════════════════════════════════════════════════════════════
    // RANGE PARAMETERS
    // ═══════════════════════════════════════════════════════════════════════

    /// INVARIANT: after refresh a supported range parameter holds a value
    /// inside its bounds, even if the device reported one outside them
    #[test]
    fn range_value_within_bounds(
        (lo, hi) in ordered_range(),
        current in proptest::option::of(-2000i32..2000),
    ) {
        let parameter = compensation(lo, hi, current);
        parameter.refresh();

        prop_assert!(parameter.supported());
        prop_assert!(parameter.minimum() <= parameter.value());
        prop_assert!(parameter.value() <= parameter.maximum());
        prop_assert_eq!(parameter.modifiable(), lo != hi);
    }

    /// INVARIANT: in-range writes land exactly, out-of-range writes change nothing
    #[test]
    fn range_writes_respect_bounds(
        (lo, hi) in ordered_range(),
        target in -2000i32..2000,
    ) {
        prop_assume!(lo != hi);
        let parameter = compensation(lo, hi, Some(lo));

        let result = parameter.set_value(target);
        if (lo..=hi).contains(&target) {
            prop_assert!(result.is_ok());
            prop_assert_eq!(parameter.value(), target);
        } else {
            prop_assert!(matches!(result, Err(CameraError::InvalidValue(_))));
            prop_assert_eq!(parameter.value(), lo);
        }
    }

    /// INVARIANT: refreshing twice without device changes is observably a no-op
    #[test]
    fn range_refresh_idempotent(
        (lo, hi) in ordered_range(),
        current in proptest::option::of(-1000i32..1500),
    ) {
        let parameter = compensation(lo, hi, current);
        parameter.refresh();
        let first = parameter.snapshot();
        parameter.refresh();
        prop_assert_eq!(first, parameter.snapshot());
    }

    // ═══════════════════════════════════════════════════════════════════════
    // ENUMERATED PARAMETERS
    // ═══════════════════════════════════════════════════════════════════════

    /// INVARIANT: the selection is empty or one of the options, and
    /// modifiable implies supported
    #[test]
    fn enumerated_selection_is_member(
        values in proptest::sample::subsequence(SceneMode::ALL.to_vec(), 0..=SceneMode::ALL.len()),
        current in proptest::option::of(proptest::sample::select(SceneMode::ALL.to_vec())),
    ) {
        let parameter = scene(values.clone(), current);
        parameter.refresh();

        prop_assert!(!parameter.modifiable() || parameter.supported());
        prop_assert_eq!(parameter.supported(), !values.is_empty());
        prop_assert_eq!(parameter.modifiable(), values.len() > 1);
        match parameter.selected_option() {
            Some(option) => {
                prop_assert!(parameter.options().contains(&option));
                prop_assert_eq!(Some(option.value), current);
            }
            None => prop_assert!(current.map_or(true, |c| !values.contains(&c))),
        }
    }

    /// INVARIANT: selecting options[i] reads back as options[i]
    #[test]
    fn enumerated_select_round_trip(
        values in proptest::sample::subsequence(SceneMode::ALL.to_vec(), 2..=SceneMode::ALL.len()),
        index in any::<proptest::sample::Index>(),
    ) {
        let parameter = scene(values.clone(), None);
        let options = parameter.options();
        let chosen = options[index.index(options.len())].clone();

        prop_assert!(parameter.select(Some(&chosen)).is_ok());
        prop_assert_eq!(parameter.selected_option(), Some(chosen));
    }

    /// INVARIANT: refreshing twice without device changes is observably a no-op
    #[test]
    fn enumerated_refresh_idempotent(
        values in proptest::sample::subsequence(SceneMode::ALL.to_vec(), 0..=SceneMode::ALL.len()),
        current in proptest::option::of(proptest::sample::select(SceneMode::ALL.to_vec())),
    ) {
        let parameter = scene(values, current);
        parameter.refresh();
        let first = parameter.snapshot();
        parameter.refresh();
        prop_assert_eq!(first, parameter.snapshot());
    }

    /// INVARIANT: ISO options are exactly the ladder rungs inside the device range
    #[test]
    fn iso_options_are_ladder_intersection(
        lo in 1u32..4000,
        span in 0u32..4000,
    ) {
        let hi = lo + span;
        let device = SharedDevice::new(SimulatedDevice::default().with_range(PropertyKey::Iso, lo, hi, None));
        let iso = EnumeratedParameter::new(catalog::iso_spec(), device, "Assets/Icons");

        let expected: Vec<u32> = ISO_LADDER.iter().copied().filter(|v| (lo..=hi).contains(v)).collect();
        let actual: Vec<u32> = iso.options().into_iter().map(|o| o.value).collect();
        prop_assert_eq!(&actual, &expected);
        prop_assert_eq!(iso.supported(), !expected.is_empty());
    }
}
