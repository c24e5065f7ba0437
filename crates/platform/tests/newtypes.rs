//! Type system enforcement tests for the audio domain newtypes.

#![allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::arithmetic_side_effects)]

use platform::audio_types::{Equalizer, FolderId, Volume};
use proptest::prelude::*;

// ── Volume ───────────────────────────────────────────────────────────────────

#[test]
fn volume_new_clamps_over_30() {
    assert_eq!(Volume::new(31).get(), 30);
    assert_eq!(Volume::new(255).get(), 30);
}

#[test]
fn volume_try_new_rejects_over_30() {
    assert!(Volume::try_new(31).is_err());
    assert!(Volume::try_new(30).is_ok());
    assert!(Volume::try_new(0).is_ok());
}

#[test]
fn volume_steps_saturate_at_bounds() {
    assert_eq!(Volume::MAX.step_up(), Volume::MAX);
    assert_eq!(Volume::MIN.step_down(), Volume::MIN);
    assert_eq!(Volume::new(10).step_up().get(), 11);
    assert_eq!(Volume::new(10).step_down().get(), 9);
}

#[test]
fn volume_is_one_byte() {
    assert_eq!(core::mem::size_of::<Volume>(), 1);
}

// ── FolderId ─────────────────────────────────────────────────────────────────

#[test]
fn folder_id_rejects_zero_and_above_99() {
    assert!(FolderId::try_new(0).is_err());
    assert!(FolderId::try_new(100).is_err());
    assert_eq!(FolderId::try_new(1), Ok(FolderId::FIRST));
    assert_eq!(FolderId::try_new(99), Ok(FolderId::LAST));
}

#[test]
fn folder_id_wraps_at_both_ends() {
    assert_eq!(FolderId::LAST.wrapping_next(), FolderId::FIRST);
    assert_eq!(FolderId::FIRST.wrapping_prev(), FolderId::LAST);
}

#[test]
fn folder_id_offset_by_ten() {
    let f = FolderId::try_new(95).map(|f| f.offset(10)).map(FolderId::get);
    assert_eq!(f, Ok(6));
}

proptest! {
    #[test]
    fn folder_id_offset_stays_in_range(start in 1u8..=99, delta in -500i16..500) {
        let folder = FolderId::try_new(start).map_err(|_| TestCaseError::fail("valid start"))?;
        let moved = folder.offset(delta).get();
        prop_assert!((1..=99).contains(&moved));
    }

    #[test]
    fn volume_new_never_exceeds_max(raw in any::<u8>()) {
        prop_assert!(Volume::new(raw) <= Volume::MAX);
    }
}

// ── Equalizer ────────────────────────────────────────────────────────────────

#[test]
fn equalizer_wire_bytes_match_positions() {
    for (i, eq) in Equalizer::ALL.iter().enumerate() {
        assert_eq!(usize::from(eq.to_wire()), i);
        assert_eq!(Equalizer::from_wire(eq.to_wire()), Some(*eq));
    }
    assert_eq!(Equalizer::from_wire(6), None);
}

#[test]
fn equalizer_cycles_wrap() {
    assert_eq!(Equalizer::Bass.cycle_next(), Equalizer::Normal);
    assert_eq!(Equalizer::Normal.cycle_prev(), Equalizer::Bass);
    assert_eq!(Equalizer::Pop.cycle_next(), Equalizer::Rock);
}
