//! Spoken prompts.
//!
//! Prompts live on the module's storage as numbered files: `mp3/NNNN` when
//! nothing is playing, and the same number under `advert/` to talk over
//! running music. Numbers 1..=255 speak the number itself.

use keycard::PlaybackMode;
use platform::Equalizer;

const MODE_BASE: u16 = 310;
const MENU_BASE: u16 = 320;
const EQUALIZER_BASE: u16 = 330;

/// A prompt the player can speak.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Cue {
    /// Speak a number (folder, track, volume).
    Number(u16),
    /// Name of a playback mode.
    ModeName(PlaybackMode),
    /// Name of a config menu entry, by menu position.
    MenuItem(u8),
    /// Name of an equalizer preset.
    EqualizerName(Equalizer),
    /// Tapped card is not a command card.
    UnknownCard,
    /// Volume is already at its bound.
    VolumeLimit,
    /// The audio module stopped answering.
    ModuleFault,
    /// Settings could not be saved.
    StorageFault,
    /// Card paired.
    CardWritten,
    /// Card write failed or did not verify.
    CardWriteFailed,
    /// Card cleared.
    CardReset,
    /// Config mode entered.
    ConfigEntered,
    /// Config mode left because nothing happened.
    ConfigTimeout,
    /// Config mode left on request.
    ConfigCancelled,
    /// Refused because card changes are locked.
    Locked,
    /// Setting saved.
    Saved,
    /// Going to standby.
    Standby,
    /// Shortcut card bound.
    ShortcutBound,
    /// Admin card accepted; waiting for the combo.
    AdminArmed,
    /// Folder holds no tracks.
    EmptyFolder,
}

impl Cue {
    /// Prompt file number.
    #[must_use]
    pub fn track(self) -> u16 {
        match self {
            Cue::Number(n) => n,
            Cue::ModeName(mode) => MODE_BASE.saturating_add(u16::from(mode.to_wire())),
            Cue::MenuItem(i) => MENU_BASE.saturating_add(u16::from(i)),
            Cue::EqualizerName(eq) => EQUALIZER_BASE.saturating_add(u16::from(eq.to_wire())),
            Cue::UnknownCard => 400,
            Cue::VolumeLimit => 401,
            Cue::ModuleFault => 402,
            Cue::StorageFault => 403,
            Cue::CardWritten => 404,
            Cue::CardWriteFailed => 405,
            Cue::CardReset => 406,
            Cue::ConfigEntered => 407,
            Cue::ConfigTimeout => 408,
            Cue::ConfigCancelled => 409,
            Cue::Locked => 410,
            Cue::Saved => 411,
            Cue::Standby => 412,
            Cue::ShortcutBound => 413,
            Cue::AdminArmed => 414,
            Cue::EmptyFolder => 415,
        }
    }
}
