//! Persisted administrator settings.

use keycard::PlaybackMode;
use platform::{CardUid, Equalizer, FolderId, Volume};

/// Number of shortcut bindings.
pub const SHORTCUT_SLOTS: usize = 4;

/// A card bound directly to a folder, without writing anything to it.
///
/// Lets foreign or read-only tags start playback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Shortcut {
    /// Card that triggers the shortcut.
    pub uid: CardUid,
    /// Folder to play.
    pub folder: FolderId,
    /// How to play it.
    pub mode: PlaybackMode,
    /// Mode-dependent value, as on a command card.
    pub special: u16,
}

/// Settings changed from the config menu and kept across power cycles.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AdminSettings {
    /// Volume floor.
    pub min_volume: Volume,
    /// Volume ceiling.
    pub max_volume: Volume,
    /// Volume at power-on.
    pub initial_volume: Volume,
    /// Equalizer preset.
    pub equalizer: Equalizer,
    /// Card pairing and reset are refused while set.
    pub locked: bool,
    /// Minutes stopped before standby; 0 disables standby.
    pub standby_minutes: u8,
    /// Shortcut bindings; `None` marks a free slot.
    pub shortcuts: [Option<Shortcut>; SHORTCUT_SLOTS],
}

impl Default for AdminSettings {
    fn default() -> Self {
        Self {
            min_volume: Volume::new(5),
            max_volume: Volume::new(25),
            initial_volume: Volume::new(15),
            equalizer: Equalizer::Normal,
            locked: false,
            standby_minutes: 10,
            shortcuts: [None; SHORTCUT_SLOTS],
        }
    }
}

impl AdminSettings {
    /// Shortcut bound to `uid`, if any.
    #[must_use]
    pub fn shortcut_for(&self, uid: &CardUid) -> Option<&Shortcut> {
        self.shortcuts.iter().flatten().find(|s| s.uid == *uid)
    }

    /// Bind a shortcut.
    ///
    /// A card already bound is re-bound in place; otherwise the first free
    /// slot is used. Returns the slot, or `None` when every slot is taken.
    pub fn bind_shortcut(&mut self, shortcut: Shortcut) -> Option<usize> {
        let slot = self
            .shortcuts
            .iter()
            .position(|s| s.is_some_and(|s| s.uid == shortcut.uid))
            .or_else(|| self.shortcuts.iter().position(Option::is_none))?;
        *self.shortcuts.get_mut(slot)? = Some(shortcut);
        Some(slot)
    }

    /// Remove the binding for `uid`. Returns whether one existed.
    pub fn unbind_shortcut(&mut self, uid: &CardUid) -> bool {
        let mut removed = false;
        for slot in &mut self.shortcuts {
            if slot.is_some_and(|s| s.uid == *uid) {
                *slot = None;
                removed = true;
            }
        }
        removed
    }

    /// Restore the volume invariant `min <= initial <= max`.
    ///
    /// The ceiling wins over the floor when they cross.
    pub fn normalize(&mut self) {
        if self.min_volume > self.max_volume {
            self.min_volume = self.max_volume;
        }
        self.initial_volume = self.initial_volume.clamp(self.min_volume, self.max_volume);
    }
}
