//! Party-mode shuffle.
//!
//! Each cycle plays every track of the folder exactly once in a random
//! order. When the cycle is used up a new order is drawn; its first track
//! is never the one that just ended the previous cycle.

use heapless::Vec;

/// Largest folder the module can address with a folder/track command.
pub const MAX_SHUFFLE: usize = 255;

/// Small xorshift generator; quality is irrelevant, determinism per seed is
/// what tests rely on.
#[derive(Debug, Clone, Copy)]
struct XorShift32(u32);

impl XorShift32 {
    fn new(seed: u32) -> Self {
        // Zero is a fixed point of xorshift.
        Self(if seed == 0 { 0x9E37_79B9 } else { seed })
    }

    fn next_u32(&mut self) -> u32 {
        let mut x = self.0;
        x ^= x.wrapping_shl(13);
        x ^= x.wrapping_shr(17);
        x ^= x.wrapping_shl(5);
        self.0 = x;
        x
    }

    /// Uniform-ish value in `0..bound`; 0 when `bound` is 0.
    fn below(&mut self, bound: usize) -> usize {
        let bound = u32::try_from(bound).unwrap_or(u32::MAX);
        let value = self.next_u32().checked_rem(bound).unwrap_or(0);
        usize::try_from(value).unwrap_or(0)
    }
}

/// Random play order over tracks `1..=count`.
#[derive(Debug, Clone)]
pub struct ShuffleQueue {
    order: Vec<u8, MAX_SHUFFLE>,
    cursor: usize,
    rng: XorShift32,
}

impl ShuffleQueue {
    /// Empty queue seeded with `seed`.
    #[must_use]
    pub fn new(seed: u32) -> Self {
        Self {
            order: Vec::new(),
            cursor: 0,
            rng: XorShift32::new(seed),
        }
    }

    /// Start a fresh cycle over `count` tracks and return its first track.
    ///
    /// Folders larger than [`MAX_SHUFFLE`] are truncated.
    pub fn start(&mut self, count: u16, seed: u32) -> Option<u16> {
        self.rng = XorShift32::new(seed);
        let count = u8::try_from(count).unwrap_or(u8::MAX);
        self.order.clear();
        for track in 1..=count {
            self.order.push(track).ok();
        }
        self.reshuffle(None);
        self.advance()
    }

    /// Next track of the cycle, reshuffling when the cycle is used up.
    pub fn advance(&mut self) -> Option<u16> {
        if self.order.is_empty() {
            return None;
        }
        if self.cursor >= self.order.len() {
            let last = self.order.last().copied();
            self.reshuffle(last);
        }
        let track = self.order.get(self.cursor).copied()?;
        self.cursor = self.cursor.saturating_add(1);
        Some(u16::from(track))
    }

    /// Tracks left before the next reshuffle.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.order.len().saturating_sub(self.cursor)
    }

    /// Forget the folder.
    pub fn clear(&mut self) {
        self.order.clear();
        self.cursor = 0;
    }

    /// Fisher-Yates over the whole order.
    fn reshuffle(&mut self, avoid_first: Option<u8>) {
        let len = self.order.len();
        for i in (1..len).rev() {
            let j = self.rng.below(i.saturating_add(1));
            self.order.swap(i, j);
        }
        if len > 1 && self.order.first().copied() == avoid_first {
            self.order.swap(0, 1);
        }
        self.cursor = 0;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::arithmetic_side_effects)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::BTreeSet;

    #[test]
    fn empty_folder_yields_nothing() {
        let mut queue = ShuffleQueue::new(1);
        assert_eq!(queue.start(0, 1), None);
        assert_eq!(queue.advance(), None);
    }

    #[test]
    fn single_track_folder_repeats_that_track() {
        let mut queue = ShuffleQueue::new(1);
        assert_eq!(queue.start(1, 7), Some(1));
        assert_eq!(queue.advance(), Some(1));
    }

    #[test]
    fn one_cycle_covers_every_track_once() {
        let mut queue = ShuffleQueue::new(0);
        let mut seen = BTreeSet::new();
        seen.insert(queue.start(10, 42).unwrap());
        for _ in 1..10 {
            assert!(seen.insert(queue.advance().unwrap()));
        }
        assert_eq!(seen.len(), 10);
        assert_eq!(queue.remaining(), 0);
    }

    #[test]
    fn reshuffle_does_not_repeat_the_boundary_track() {
        for seed in 0..200 {
            let mut queue = ShuffleQueue::new(0);
            let mut last = queue.start(2, seed).unwrap();
            for _ in 0..20 {
                let next = queue.advance().unwrap();
                assert_ne!(next, last, "seed {seed}");
                last = next;
            }
        }
    }

    proptest! {
        #[test]
        fn every_cycle_is_a_permutation_without_boundary_repeat(
            seed in any::<u32>(),
            count in 1u16..=255,
            cycles in 1usize..4,
        ) {
            let mut queue = ShuffleQueue::new(seed);
            let mut played = vec![queue.start(count, seed).unwrap()];
            for _ in 1..usize::from(count) * cycles {
                played.push(queue.advance().unwrap());
            }

            let expected: std::vec::Vec<u16> = (1..=count).collect();
            for cycle in played.chunks(usize::from(count)) {
                let mut sorted = cycle.to_vec();
                sorted.sort_unstable();
                prop_assert_eq!(&sorted, &expected);
            }
            if count > 1 {
                for pair in played.windows(2) {
                    prop_assert_ne!(pair[0], pair[1]);
                }
            }
        }
    }
}
