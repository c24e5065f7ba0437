//! Turn raw reader polls into taps.
//!
//! A card lying on the antenna answers every poll. The control loop wants
//! one event per arrival, so a UID only taps again after it has been away
//! for [`TapFilter::release_polls`] consecutive polls. Marginal coupling
//! makes a resting card miss the odd poll; the hold-off absorbs that.

use platform::CardUid;

/// Polls without an answer before a resting card counts as removed.
pub const DEFAULT_RELEASE_POLLS: u8 = 3;

/// Arrival detector over successive anticollision results.
#[derive(Debug, Clone)]
pub struct TapFilter {
    present: Option<CardUid>,
    misses: u8,
    release_polls: u8,
}

impl TapFilter {
    /// New filter; a card must be absent for `release_polls` polls to re-tap.
    pub fn new(release_polls: u8) -> Self {
        Self {
            present: None,
            misses: 0,
            release_polls: release_polls.max(1),
        }
    }

    /// Polls of absence needed before a card may tap again.
    pub fn release_polls(&self) -> u8 {
        self.release_polls
    }

    /// Card currently considered on the reader.
    pub fn present(&self) -> Option<CardUid> {
        self.present
    }

    /// Feed one poll result; returns the UID when it is a new arrival.
    pub fn observe(&mut self, seen: Option<CardUid>) -> Option<CardUid> {
        match (seen, self.present) {
            (Some(uid), Some(current)) if uid == current => {
                self.misses = 0;
                None
            }
            (Some(uid), _) => {
                self.present = Some(uid);
                self.misses = 0;
                Some(uid)
            }
            (None, Some(_)) => {
                self.misses = self.misses.saturating_add(1);
                if self.misses >= self.release_polls {
                    self.present = None;
                    self.misses = 0;
                }
                None
            }
            (None, None) => None,
        }
    }
}

impl Default for TapFilter {
    fn default() -> Self {
        Self::new(DEFAULT_RELEASE_POLLS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn a() -> CardUid {
        CardUid::from_slice(&[1, 2, 3, 4])
    }

    fn b() -> CardUid {
        CardUid::from_slice(&[9, 8, 7, 6, 5, 4, 3])
    }

    #[test]
    fn resting_card_taps_once() {
        let mut filter = TapFilter::default();
        assert_eq!(filter.observe(Some(a())), Some(a()));
        for _ in 0..20 {
            assert_eq!(filter.observe(Some(a())), None);
        }
    }

    #[test]
    fn short_dropout_does_not_retap() {
        let mut filter = TapFilter::new(3);
        filter.observe(Some(a()));
        filter.observe(None);
        filter.observe(None);
        assert_eq!(filter.observe(Some(a())), None);
    }

    #[test]
    fn removal_then_return_retaps() {
        let mut filter = TapFilter::new(3);
        filter.observe(Some(a()));
        for _ in 0..3 {
            filter.observe(None);
        }
        assert_eq!(filter.present(), None);
        assert_eq!(filter.observe(Some(a())), Some(a()));
    }

    #[test]
    fn different_card_taps_immediately() {
        let mut filter = TapFilter::default();
        filter.observe(Some(a()));
        assert_eq!(filter.observe(Some(b())), Some(b()));
        assert_eq!(filter.present(), Some(b()));
    }

    proptest! {
        #[test]
        fn at_most_one_tap_per_uninterrupted_stay(stay in 1usize..50) {
            let mut filter = TapFilter::default();
            let taps = (0..stay).filter_map(|_| filter.observe(Some(a()))).count();
            prop_assert_eq!(taps, 1);
        }
    }
}
