//! Binary layout of the settings block.
//!
//! All multi-byte integers are little-endian.
//!
//! ```text
//! [0..4]    magic            b"TSET"
//! [4]       version          u8 = 1
//! [5]       min_volume       0..=30
//! [6]       max_volume       0..=30
//! [7]       initial_volume   0..=30
//! [8]       equalizer        0..=5
//! [9]       flags            bit 0 = locked
//! [10]      standby_minutes
//! [11]      sequence         bumped on every save, wraps
//! [12..76]  shortcuts        4 × 16 B, see below
//! [76..80]  crc32            u32 le over [0..76]
//!
//! shortcut slot:
//! [0]       used             0 / 1
//! [1]       uid_len          0..=10
//! [2..12]   uid              zero-padded
//! [12]      folder           1..=99
//! [13]      mode             playable PlaybackMode wire value
//! [14..16]  special          u16 le
//! ```

use crc32fast::Hasher;
use keycard::PlaybackMode;
use platform::card::UID_MAX_LEN;
use platform::{CardUid, Equalizer, FolderId, Volume};
use thiserror_no_std::Error;

use crate::admin::{AdminSettings, Shortcut, SHORTCUT_SLOTS};

/// Encoded size of the settings block.
pub const SETTINGS_LEN: usize = 80;

/// Block magic.
pub const MAGIC: &[u8; 4] = b"TSET";

/// Layout version written by [`encode`].
pub const LAYOUT_VERSION: u8 = 1;

const SLOTS_AT: usize = 12;
const SLOT_LEN: usize = 16;
const CRC_AT: usize = SLOTS_AT + SHORTCUT_SLOTS * SLOT_LEN;

const FLAG_LOCKED: u8 = 0x01;

/// Why a stored settings block was not accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LayoutError {
    /// Nothing was ever written (or foreign data).
    #[error("settings magic missing")]
    BadMagic,
    /// Written by a newer firmware.
    #[error("unsupported settings version {0}")]
    UnsupportedVersion(u8),
    /// Torn or decayed write.
    #[error("settings checksum mismatch")]
    Checksum,
    /// Checksum fine but a field is out of range.
    #[error("settings field out of range")]
    InvalidField,
}

fn crc(bytes: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(bytes);
    hasher.finalize()
}

/// Encode settings into a block carrying `sequence`.
///
/// # Safety (lint allow)
/// All indices are derived from constants that keep them inside
/// `[0, SETTINGS_LEN)`.
#[must_use]
#[allow(clippy::indexing_slicing, clippy::arithmetic_side_effects)]
pub fn encode(settings: &AdminSettings, sequence: u8) -> [u8; SETTINGS_LEN] {
    let mut buf = [0u8; SETTINGS_LEN];
    buf[0..4].copy_from_slice(MAGIC);
    buf[4] = LAYOUT_VERSION;
    buf[5] = settings.min_volume.get();
    buf[6] = settings.max_volume.get();
    buf[7] = settings.initial_volume.get();
    buf[8] = settings.equalizer.to_wire();
    buf[9] = if settings.locked { FLAG_LOCKED } else { 0 };
    buf[10] = settings.standby_minutes;
    buf[11] = sequence;

    for (i, slot) in settings.shortcuts.iter().enumerate() {
        let Some(shortcut) = slot else { continue };
        let at = SLOTS_AT + i * SLOT_LEN;
        let uid = shortcut.uid.as_bytes();
        buf[at] = 1;
        buf[at + 1] = u8::try_from(uid.len()).unwrap_or(0);
        buf[at + 2..at + 2 + uid.len()].copy_from_slice(uid);
        buf[at + 12] = shortcut.folder.get();
        buf[at + 13] = shortcut.mode.to_wire();
        buf[at + 14..at + 16].copy_from_slice(&shortcut.special.to_le_bytes());
    }

    let sum = crc(&buf[..CRC_AT]);
    buf[CRC_AT..CRC_AT + 4].copy_from_slice(&sum.to_le_bytes());
    buf
}

/// Decode a stored block into the settings and its sequence number.
///
/// # Safety (lint allow)
/// All indices are derived from constants that keep them inside
/// `[0, SETTINGS_LEN)`.
#[allow(clippy::indexing_slicing, clippy::arithmetic_side_effects)]
pub fn decode(buf: &[u8; SETTINGS_LEN]) -> Result<(AdminSettings, u8), LayoutError> {
    if &buf[0..4] != MAGIC {
        return Err(LayoutError::BadMagic);
    }
    if buf[4] != LAYOUT_VERSION {
        return Err(LayoutError::UnsupportedVersion(buf[4]));
    }
    let stored = u32::from_le_bytes([buf[CRC_AT], buf[CRC_AT + 1], buf[CRC_AT + 2], buf[CRC_AT + 3]]);
    if stored != crc(&buf[..CRC_AT]) {
        return Err(LayoutError::Checksum);
    }

    let volume = |b: u8| Volume::try_new(b).map_err(|_| LayoutError::InvalidField);
    let mut settings = AdminSettings {
        min_volume: volume(buf[5])?,
        max_volume: volume(buf[6])?,
        initial_volume: volume(buf[7])?,
        equalizer: Equalizer::from_wire(buf[8]).ok_or(LayoutError::InvalidField)?,
        locked: buf[9] & FLAG_LOCKED != 0,
        standby_minutes: buf[10],
        shortcuts: [None; SHORTCUT_SLOTS],
    };

    for (i, slot) in settings.shortcuts.iter_mut().enumerate() {
        let at = SLOTS_AT + i * SLOT_LEN;
        if buf[at] == 0 {
            continue;
        }
        let uid_len = usize::from(buf[at + 1]);
        if uid_len == 0 || uid_len > UID_MAX_LEN {
            return Err(LayoutError::InvalidField);
        }
        let mode = PlaybackMode::from_wire(buf[at + 13])
            .filter(|m| m.is_playable())
            .ok_or(LayoutError::InvalidField)?;
        *slot = Some(Shortcut {
            uid: CardUid::from_slice(&buf[at + 2..at + 2 + uid_len]),
            folder: FolderId::try_new(buf[at + 12]).map_err(|_| LayoutError::InvalidField)?,
            mode,
            special: u16::from_le_bytes([buf[at + 14], buf[at + 15]]),
        });
    }
    Ok((settings, buf[11]))
}
