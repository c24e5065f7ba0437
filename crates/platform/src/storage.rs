//! Non-volatile memory map.
//!
//! Persistent state lives in a small byte-addressable store (EEPROM) reached
//! through [`embedded_storage::Storage`]. This module only fixes *where*
//! things live; the `settings` crate owns the record formats.
//!
//! ```text
//! 0x000 ┌──────────────────────────────┐
//!       │ settings copy A (128 B)      │ magic, version, sequence, fields, CRC-32
//! 0x080 ├──────────────────────────────┤
//!       │ settings copy B (128 B)      │
//! 0x100 ├──────────────────────────────┤
//!       │ audiobook progress table     │ 4 B per folder, folder 1 first
//!       │ (99 × 4 B = 396 B)           │
//! 0x28C └──────────────────────────────┘
//! ```
//!
//! Settings writes alternate between the two copies, so an interrupted
//! write never touches the last good one.

pub use embedded_storage::{ReadStorage, Storage};

use crate::audio_types::FolderId;

/// Offsets of the two settings copies.
pub const SETTINGS_SLOTS: [u32; 2] = [0x000, 0x080];

/// Bytes reserved for each settings copy.
pub const SETTINGS_CAPACITY: usize = 128;

/// Offset of the audiobook progress table.
pub const PROGRESS_OFFSET: u32 = 0x100;

/// Bytes per progress slot: track (u16 BE) + elapsed seconds (u16 BE).
pub const PROGRESS_SLOT_LEN: usize = 4;

/// Smallest store that holds the full memory map.
pub const NVS_MIN_CAPACITY: usize =
    PROGRESS_OFFSET as usize + PROGRESS_SLOT_LEN * FolderId::LAST.get() as usize;

/// Offset of the progress slot for `folder`.
#[must_use]
pub fn progress_slot(folder: FolderId) -> u32 {
    // folder is 1..=99, so the product stays far below u32::MAX.
    let index = u32::from(folder.get().saturating_sub(1));
    PROGRESS_OFFSET.saturating_add(index.saturating_mul(PROGRESS_SLOT_LEN as u32))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn settings_copies_do_not_overlap() {
        let [a, b] = SETTINGS_SLOTS.map(|o| o as usize);
        assert!(a + SETTINGS_CAPACITY <= b);
        assert!(b + SETTINGS_CAPACITY <= PROGRESS_OFFSET as usize);
    }

    #[test]
    fn progress_slots_are_contiguous() {
        let first = progress_slot(FolderId::FIRST);
        let second = progress_slot(FolderId::try_new(2).unwrap());
        assert_eq!(first, PROGRESS_OFFSET);
        assert_eq!(second - first, PROGRESS_SLOT_LEN as u32);
    }

    #[test]
    fn last_slot_fits_in_min_capacity() {
        let last = progress_slot(FolderId::LAST) as usize + PROGRESS_SLOT_LEN;
        assert_eq!(last, NVS_MIN_CAPACITY);
    }
}
