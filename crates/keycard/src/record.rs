//! Card command record and its enumerated fields.

use platform::FolderId;

// ---------------------------------------------------------------------------
// PlaybackMode
// ---------------------------------------------------------------------------

/// How a card's folder is played back.
///
/// Wire values are stable: they are stored on cards in the field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum PlaybackMode {
    /// Interactive story: the listener picks the next track at branch points.
    StoryBranching = 1,
    /// Tracks in order; stops after the last one.
    Album = 2,
    /// Shuffled; every track once per cycle, then reshuffled.
    Party = 3,
    /// One fixed track from the folder.
    SingleTrack = 4,
    /// Tracks in order; position is remembered across power cycles.
    AudiobookResumable = 5,
    /// Not music: carries an [`AdminAction`].
    AdminCard = 6,
}

impl PlaybackMode {
    /// Every mode in wire order.
    pub const ALL: [PlaybackMode; 6] = [
        PlaybackMode::StoryBranching,
        PlaybackMode::Album,
        PlaybackMode::Party,
        PlaybackMode::SingleTrack,
        PlaybackMode::AudiobookResumable,
        PlaybackMode::AdminCard,
    ];

    /// Decode from the wire byte.
    #[must_use]
    pub fn from_wire(value: u8) -> Option<Self> {
        Self::ALL.iter().copied().find(|m| m.to_wire() == value)
    }

    /// Wire byte for this mode.
    #[must_use]
    pub const fn to_wire(self) -> u8 {
        self as u8
    }

    /// Whether a card in this mode starts playback.
    #[must_use]
    pub const fn is_playable(self) -> bool {
        !matches!(self, PlaybackMode::AdminCard)
    }
}

// ---------------------------------------------------------------------------
// AdminAction
// ---------------------------------------------------------------------------

/// What an admin card opens once the admin combo is pressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum AdminAction {
    /// The settings menu.
    OpenMenu = 0,
    /// Straight into pairing a new card.
    PairCard = 1,
    /// Straight into resetting a card.
    ResetCard = 2,
}

impl AdminAction {
    /// Decode from the card's special field.
    #[must_use]
    pub fn from_special(value: u16) -> Option<Self> {
        match value {
            0 => Some(AdminAction::OpenMenu),
            1 => Some(AdminAction::PairCard),
            2 => Some(AdminAction::ResetCard),
            _ => None,
        }
    }

    /// Value stored in the card's special field.
    #[must_use]
    pub const fn to_special(self) -> u16 {
        self as u16
    }
}

// ---------------------------------------------------------------------------
// CardRecord
// ---------------------------------------------------------------------------

/// Decoded contents of a command card.
///
/// The magic cookie is not stored: a record only exists once the cookie has
/// been checked, and [`encode`](crate::encode) always writes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CardRecord {
    /// Layout version the card was written with.
    pub version: u8,
    /// Folder number; 0 on admin cards.
    pub folder: u8,
    /// Playback mode.
    pub mode: PlaybackMode,
    /// Mode-dependent value: track for SingleTrack, start position for
    /// AudiobookResumable, action for AdminCard, unused otherwise.
    pub special: u16,
}

impl CardRecord {
    /// A playable card for `folder`, written at the current layout version.
    #[must_use]
    pub fn new(folder: FolderId, mode: PlaybackMode, special: u16) -> Self {
        Self {
            version: crate::VERSION,
            folder: folder.get(),
            mode,
            special,
        }
    }

    /// An admin card carrying `action`.
    #[must_use]
    pub fn admin(action: AdminAction) -> Self {
        Self {
            version: crate::VERSION,
            folder: 0,
            mode: PlaybackMode::AdminCard,
            special: action.to_special(),
        }
    }

    /// The folder, for playable cards.
    #[must_use]
    pub fn folder_id(&self) -> Option<FolderId> {
        FolderId::try_new(self.folder).ok()
    }

    /// The admin action, for admin cards.
    #[must_use]
    pub fn admin_action(&self) -> Option<AdminAction> {
        match self.mode {
            PlaybackMode::AdminCard => AdminAction::from_special(self.special),
            _ => None,
        }
    }
}
