//! Fixed-layout card block codec.

use thiserror_no_std::Error;

use crate::record::{AdminAction, CardRecord, PlaybackMode};

/// Encoded record size: exactly one card data block.
pub const RECORD_LEN: usize = platform::CARD_BLOCK_LEN;

/// Magic marker identifying blocks written by Tonbox.
pub const COOKIE: u32 = 0x1337_B347;

/// Layout version written by [`encode`].
pub const VERSION: u8 = 2;

/// Oldest layout version [`decode`] accepts.
pub const MIN_VERSION: u8 = 1;

/// Highest valid SingleTrack track number (the module's per-folder limit).
pub const MAX_TRACK: u16 = 255;

/// Why a block is not a valid command card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InvalidCard {
    /// Byte length differs from [`RECORD_LEN`].
    #[error("expected 16 bytes, got {0}")]
    WrongLength(usize),
    /// Cookie mismatch: blank, reset, or foreign tag.
    #[error("cookie mismatch")]
    BadCookie,
    /// Version outside `MIN_VERSION..=VERSION`.
    #[error("unsupported version {0}")]
    UnsupportedVersion(u8),
    /// Mode byte is not a known [`PlaybackMode`].
    #[error("unknown playback mode {0}")]
    UnknownMode(u8),
    /// Folder outside 1..=99 (or non-zero on an admin card).
    #[error("folder {0} out of range")]
    FolderOutOfRange(u8),
    /// Special field invalid for the mode.
    #[error("special value {0} invalid for mode")]
    SpecialOutOfRange(u16),
    /// Reserved tail bytes are not zero.
    #[error("reserved bytes set")]
    ReservedBytesSet,
}

/// Encode a record into one card block.
///
/// Layout (16 bytes, multi-byte fields big-endian):
/// ```text
/// [0..4]   cookie   0x1337B347
/// [4]      version
/// [5]      folder
/// [6]      mode
/// [7..9]   special
/// [9..16]  reserved, zero
/// ```
///
/// # Safety (lint allow)
/// All range indices are compile-time constants within `[0, RECORD_LEN)`.
#[must_use]
#[allow(clippy::indexing_slicing)]
pub fn encode(record: &CardRecord) -> [u8; RECORD_LEN] {
    let mut buf = [0u8; RECORD_LEN];
    buf[0..4].copy_from_slice(&COOKIE.to_be_bytes());
    buf[4] = record.version;
    buf[5] = record.folder;
    buf[6] = record.mode.to_wire();
    buf[7..9].copy_from_slice(&record.special.to_be_bytes());
    buf
}

/// The cleared block written when a card is reset.
#[must_use]
pub const fn blank() -> [u8; RECORD_LEN] {
    [0u8; RECORD_LEN]
}

/// Decode a card block.
///
/// Never panics: anything that is not a well-formed record is reported as
/// [`InvalidCard`].
///
/// # Safety (lint allow)
/// Indexing happens only after the length check pins `raw` to `RECORD_LEN`.
#[allow(clippy::indexing_slicing)]
pub fn decode(raw: &[u8]) -> Result<CardRecord, InvalidCard> {
    if raw.len() != RECORD_LEN {
        return Err(InvalidCard::WrongLength(raw.len()));
    }
    let cookie = u32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]]);
    if cookie != COOKIE {
        return Err(InvalidCard::BadCookie);
    }
    let version = raw[4];
    if !(MIN_VERSION..=VERSION).contains(&version) {
        return Err(InvalidCard::UnsupportedVersion(version));
    }
    let mode = PlaybackMode::from_wire(raw[6]).ok_or(InvalidCard::UnknownMode(raw[6]))?;
    let folder = raw[5];
    let folder_ok = match mode {
        PlaybackMode::AdminCard => folder == 0,
        _ => (1..=99).contains(&folder),
    };
    if !folder_ok {
        return Err(InvalidCard::FolderOutOfRange(folder));
    }
    let special = u16::from_be_bytes([raw[7], raw[8]]);
    let special_ok = match mode {
        PlaybackMode::SingleTrack => (1..=MAX_TRACK).contains(&special),
        PlaybackMode::AdminCard => AdminAction::from_special(special).is_some(),
        _ => true,
    };
    if !special_ok {
        return Err(InvalidCard::SpecialOutOfRange(special));
    }
    if raw[9..].iter().any(|b| *b != 0) {
        return Err(InvalidCard::ReservedBytesSet);
    }
    Ok(CardRecord {
        version,
        folder,
        mode,
        special,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use platform::FolderId;

    fn album_3() -> CardRecord {
        CardRecord::new(FolderId::try_new(3).unwrap(), PlaybackMode::Album, 0)
    }

    #[test]
    fn encode_layout_is_big_endian() {
        let rec = CardRecord::new(FolderId::try_new(7).unwrap(), PlaybackMode::SingleTrack, 0x0102);
        let raw = encode(&rec);
        assert_eq!(&raw[0..4], &[0x13, 0x37, 0xB3, 0x47]);
        assert_eq!(raw[4], VERSION);
        assert_eq!(raw[5], 7);
        assert_eq!(raw[6], 4);
        assert_eq!(&raw[7..9], &[0x01, 0x02]);
        assert!(raw[9..].iter().all(|b| *b == 0));
    }

    #[test]
    fn decode_accepts_encoded_record() {
        assert_eq!(decode(&encode(&album_3())), Ok(album_3()));
    }

    #[test]
    fn wrong_length_is_rejected() {
        assert_eq!(decode(&[]), Err(InvalidCard::WrongLength(0)));
        let mut long = [0u8; 18];
        long[..16].copy_from_slice(&encode(&album_3()));
        assert_eq!(decode(&long), Err(InvalidCard::WrongLength(18)));
    }

    #[test]
    fn blank_block_is_bad_cookie() {
        assert_eq!(decode(&blank()), Err(InvalidCard::BadCookie));
    }

    #[test]
    fn version_outside_supported_range_is_rejected() {
        let mut raw = encode(&album_3());
        raw[4] = 0;
        assert_eq!(decode(&raw), Err(InvalidCard::UnsupportedVersion(0)));
        raw[4] = VERSION + 1;
        assert_eq!(decode(&raw), Err(InvalidCard::UnsupportedVersion(VERSION + 1)));
        raw[4] = MIN_VERSION;
        assert!(decode(&raw).is_ok());
    }

    #[test]
    fn unknown_mode_is_rejected() {
        let mut raw = encode(&album_3());
        raw[6] = 0;
        assert_eq!(decode(&raw), Err(InvalidCard::UnknownMode(0)));
        raw[6] = 7;
        assert_eq!(decode(&raw), Err(InvalidCard::UnknownMode(7)));
    }

    #[test]
    fn folder_range_depends_on_mode() {
        let mut raw = encode(&album_3());
        raw[5] = 0;
        assert_eq!(decode(&raw), Err(InvalidCard::FolderOutOfRange(0)));
        raw[5] = 100;
        assert_eq!(decode(&raw), Err(InvalidCard::FolderOutOfRange(100)));

        let mut admin = encode(&CardRecord::admin(AdminAction::PairCard));
        assert!(decode(&admin).is_ok());
        admin[5] = 1;
        assert_eq!(decode(&admin), Err(InvalidCard::FolderOutOfRange(1)));
    }

    #[test]
    fn special_is_validated_per_mode() {
        let mut single =
            encode(&CardRecord::new(FolderId::FIRST, PlaybackMode::SingleTrack, 1));
        single[7..9].copy_from_slice(&0u16.to_be_bytes());
        assert_eq!(decode(&single), Err(InvalidCard::SpecialOutOfRange(0)));
        single[7..9].copy_from_slice(&256u16.to_be_bytes());
        assert_eq!(decode(&single), Err(InvalidCard::SpecialOutOfRange(256)));

        let mut admin = encode(&CardRecord::admin(AdminAction::OpenMenu));
        admin[7..9].copy_from_slice(&9u16.to_be_bytes());
        assert_eq!(decode(&admin), Err(InvalidCard::SpecialOutOfRange(9)));
    }

    #[test]
    fn reserved_tail_must_be_zero() {
        let mut raw = encode(&album_3());
        raw[15] = 1;
        assert_eq!(decode(&raw), Err(InvalidCard::ReservedBytesSet));
    }
}
