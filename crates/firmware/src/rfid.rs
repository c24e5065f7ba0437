//! MFRC522 transceiver behind [`CardReader`].
//!
//! MIFARE Classic 1K cards carry the command record in block 4 (sector 1),
//! opened with the transport key. Every poll wakes whatever is in the field
//! with WUPA so that a resting, halted card keeps answering; [`TapFilter`]
//! decides whether that answer is a new arrival. The card is halted again
//! after each transaction.

use mfrc522::comm::Interface;
use mfrc522::{Initialized, Mfrc522, Uid};
use platform::{CardBytes, CardReader, CardTap, CardUid, CARD_BLOCK_LEN};
use thiserror_no_std::Error;

use crate::tap::TapFilter;

/// Block holding the command record.
pub const RECORD_BLOCK: u8 = 4;

/// Factory key A of blank MIFARE Classic cards.
const KEY_A: [u8; 6] = [0xFF; 6];

/// Anticollision runs on every this many calls to `poll_card`.
const POLL_DIVIDER: u8 = 10;

/// Card transaction failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RfidError {
    /// No card answered.
    #[error("no card in the field")]
    NoCard,
    /// A different card answered.
    #[error("another card is on the reader")]
    WrongCard,
    /// Sector authentication failed.
    #[error("card authentication failed")]
    Auth,
    /// Block transfer failed.
    #[error("card transfer failed")]
    Transfer,
}

/// MFRC522 reader with arrival filtering.
pub struct Mfrc522Reader<C: Interface> {
    chip: Mfrc522<C, Initialized>,
    filter: TapFilter,
    divider: u8,
}

impl<C: Interface> Mfrc522Reader<C> {
    /// Wrap an initialised transceiver.
    pub fn new(chip: Mfrc522<C, Initialized>) -> Self {
        Self {
            chip,
            filter: TapFilter::default(),
            divider: 0,
        }
    }

    fn wake(&mut self) -> Option<Uid> {
        let atqa = self.chip.wupa().ok()?;
        self.chip.select(&atqa).ok()
    }

    fn release(&mut self) {
        let _ = self.chip.stop_crypto1();
        let _ = self.chip.hlta();
    }

    fn wake_expected(&mut self, uid: &CardUid) -> Result<Uid, RfidError> {
        let found = self.wake().ok_or(RfidError::NoCard)?;
        if found.as_bytes() != uid.as_bytes() {
            self.release();
            return Err(RfidError::WrongCard);
        }
        Ok(found)
    }

    fn read_record(&mut self, uid: &Uid) -> Result<[u8; CARD_BLOCK_LEN], RfidError> {
        self.chip
            .mf_authenticate(uid, RECORD_BLOCK, &KEY_A)
            .map_err(|_| RfidError::Auth)?;
        self.chip
            .mf_read(RECORD_BLOCK)
            .map_err(|_| RfidError::Transfer)
    }
}

impl<C: Interface> CardReader for Mfrc522Reader<C> {
    type Error = RfidError;

    fn poll_card(&mut self) -> Option<CardTap> {
        self.divider = self.divider.saturating_add(1);
        if self.divider < POLL_DIVIDER {
            return None;
        }
        self.divider = 0;

        let Some(found) = self.wake() else {
            self.filter.observe(None);
            return None;
        };
        let uid = CardUid::from_slice(found.as_bytes());
        if self.filter.observe(Some(uid)).is_none() {
            self.release();
            return None;
        }

        let mut block = CardBytes::new();
        match self.read_record(&found) {
            Ok(raw) => {
                let _ = block.extend_from_slice(&raw);
            }
            Err(e) => debug!("card block unreadable: {}", e),
        }
        self.release();
        Some(CardTap { uid, block })
    }

    fn write_block(
        &mut self,
        uid: &CardUid,
        block: &[u8; CARD_BLOCK_LEN],
    ) -> Result<(), Self::Error> {
        let found = self.wake_expected(uid)?;
        let result = self
            .chip
            .mf_authenticate(&found, RECORD_BLOCK, &KEY_A)
            .map_err(|_| RfidError::Auth)
            .and_then(|()| {
                self.chip
                    .mf_write(RECORD_BLOCK, *block)
                    .map_err(|_| RfidError::Transfer)
            });
        self.release();
        result
    }

    fn read_block(&mut self, uid: &CardUid) -> Result<[u8; CARD_BLOCK_LEN], Self::Error> {
        let found = self.wake_expected(uid)?;
        let result = self.read_record(&found);
        self.release();
        result
    }
}
