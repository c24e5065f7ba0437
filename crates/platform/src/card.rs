//! RFID card seam.
//!
//! The transceiver driver is responsible for anticollision, authentication
//! and presence tracking. The control core only ever sees one [`CardTap`]
//! per physical arrival of a card and may write a data block back to the
//! card that is still lying on the reader.

use heapless::Vec;

/// Size of one card data block (one MIFARE Classic block).
pub const CARD_BLOCK_LEN: usize = 16;

/// Maximum number of payload bytes a reader may hand over per tap.
///
/// Some drivers append the two CRC_A bytes to a block read; the codec
/// rejects anything that is not exactly [`CARD_BLOCK_LEN`] long.
pub const CARD_READ_MAX: usize = 18;

/// Longest UID defined by ISO 14443-3 (triple size).
pub const UID_MAX_LEN: usize = 10;

/// Raw bytes read from a card, as delivered by the driver.
///
/// Empty when the block could not be read (foreign tag, failed
/// authentication); the codec then reports a length mismatch.
pub type CardBytes = Vec<u8, CARD_READ_MAX>;

/// Card unique identifier (4, 7 or 10 bytes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CardUid {
    len: u8,
    bytes: [u8; UID_MAX_LEN],
}

impl CardUid {
    /// Build a UID from raw bytes; anything past 10 bytes is dropped.
    #[must_use]
    pub fn from_slice(raw: &[u8]) -> Self {
        let mut bytes = [0u8; UID_MAX_LEN];
        let len = raw.len().min(UID_MAX_LEN);
        if let (Some(dst), Some(src)) = (bytes.get_mut(..len), raw.get(..len)) {
            dst.copy_from_slice(src);
        }
        Self {
            len: u8::try_from(len).unwrap_or(0),
            bytes,
        }
    }

    /// The UID bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        self.bytes.get(..usize::from(self.len)).unwrap_or(&[])
    }

    /// Whether this is the empty UID (used for unused storage slots).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// One arrival of a card at the reader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardTap {
    /// UID reported by anticollision.
    pub uid: CardUid,
    /// Contents of the command block.
    pub block: CardBytes,
}

/// RFID transceiver as seen by the control loop.
///
/// Implementations must report each arrival once: a card left lying on the
/// reader does not produce a second tap until it has been removed.
pub trait CardReader {
    /// Driver error type.
    type Error;

    /// Return the next pending tap, if a card has just arrived.
    fn poll_card(&mut self) -> Option<CardTap>;

    /// Write the command block of the card identified by `uid`.
    ///
    /// Completes (or fails) before returning; the loop accepts no other card
    /// while a write is in flight.
    fn write_block(
        &mut self,
        uid: &CardUid,
        block: &[u8; CARD_BLOCK_LEN],
    ) -> Result<(), Self::Error>;

    /// Read the command block back from the card identified by `uid`.
    fn read_block(&mut self, uid: &CardUid) -> Result<[u8; CARD_BLOCK_LEN], Self::Error>;
}
