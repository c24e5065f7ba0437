//! Config menu entries and the value pickers behind them.

use keycard::PlaybackMode;

/// Top-level config menu, in browse order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MenuItem {
    /// Write a new command card.
    PairCard,
    /// Clear a command card.
    ResetCard,
    /// Change the volume ceiling.
    VolumeCeiling,
    /// Change the equalizer preset.
    Equalizer,
    /// Toggle the card lock.
    Lock,
    /// Bind a card's UID to a folder without writing it.
    Shortcut,
}

impl MenuItem {
    /// Every entry in browse order.
    pub const ALL: [MenuItem; 6] = [
        MenuItem::PairCard,
        MenuItem::ResetCard,
        MenuItem::VolumeCeiling,
        MenuItem::Equalizer,
        MenuItem::Lock,
        MenuItem::Shortcut,
    ];

    /// Position in [`MenuItem::ALL`].
    #[must_use]
    pub fn position(self) -> u8 {
        let index = Self::ALL.iter().position(|m| *m == self).unwrap_or(0);
        u8::try_from(index).unwrap_or(0)
    }

    /// Next entry, wrapping.
    #[must_use]
    pub fn next(self) -> Self {
        cycle(&Self::ALL, self, 1)
    }

    /// Previous entry, wrapping.
    #[must_use]
    pub fn prev(self) -> Self {
        cycle(&Self::ALL, self, Self::ALL.len().saturating_sub(1))
    }

    /// Whether the entry changes which cards do what.
    #[must_use]
    pub const fn is_card_assignment(self) -> bool {
        matches!(
            self,
            MenuItem::PairCard | MenuItem::ResetCard | MenuItem::Shortcut
        )
    }
}

/// Modes offered when pairing, in browse order.
pub const PAIRABLE_MODES: [PlaybackMode; 5] = [
    PlaybackMode::Album,
    PlaybackMode::Party,
    PlaybackMode::SingleTrack,
    PlaybackMode::AudiobookResumable,
    PlaybackMode::StoryBranching,
];

/// Step through [`PAIRABLE_MODES`], wrapping.
#[must_use]
pub fn cycle_mode(mode: PlaybackMode, forward: bool) -> PlaybackMode {
    let step = if forward {
        1
    } else {
        PAIRABLE_MODES.len().saturating_sub(1)
    };
    cycle(&PAIRABLE_MODES, mode, step)
}

fn cycle<T: Copy + PartialEq>(items: &[T], current: T, step: usize) -> T {
    let index = items.iter().position(|i| *i == current).unwrap_or(0);
    let next = index
        .saturating_add(step)
        .checked_rem(items.len())
        .unwrap_or(0);
    items.get(next).copied().unwrap_or(current)
}
