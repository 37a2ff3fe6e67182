use proptest::prelude::*;
use rstest::rstest;
use stainer_core::{SprayConfiguration, SprayThresholds, select_spray};

#[rstest]
#[case(0, SprayConfiguration::TopOnly)]
#[case(1, SprayConfiguration::TopOnly)]
#[case(2, SprayConfiguration::Both)]
#[case(15, SprayConfiguration::Both)]
#[case(16, SprayConfiguration::BottomOnly)]
fn default_thresholds(#[case] count: u32, #[case] expected: SprayConfiguration) {
    assert_eq!(select_spray(count, &SprayThresholds::default()), expected);
}

#[test]
fn valve_levels() {
    assert_eq!(SprayConfiguration::TopOnly.valves(), (true, false));
    assert_eq!(SprayConfiguration::BottomOnly.valves(), (false, true));
    assert_eq!(SprayConfiguration::Both.valves(), (true, true));
    assert_eq!(SprayConfiguration::Off.valves(), (false, false));
}

proptest! {
    #[test]
    fn thresholds_partition_stroke_counts(min in 0u32..50, extra in 0u32..50, count in 0u32..200) {
        let t = SprayThresholds { min, max: min + extra };
        let s = select_spray(count, &t);
        if count < t.min {
            prop_assert_eq!(s, SprayConfiguration::TopOnly);
        } else if count <= t.max {
            prop_assert_eq!(s, SprayConfiguration::Both);
        } else {
            prop_assert_eq!(s, SprayConfiguration::BottomOnly);
        }
        prop_assert_ne!(s, SprayConfiguration::Off);
    }
}
