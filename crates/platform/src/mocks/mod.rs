//! Mock implementations for testing
//!
//! Host-side stand-ins for the three board seams. Each mock is a cheap
//! clonable handle onto shared state, so a test can hand one clone to the
//! code under test and keep another to script input and inspect output.

#![cfg(any(test, feature = "std"))]

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::vec::Vec;

use embedded_io::{ErrorKind, ErrorType, Read, ReadReady, Write};
use embedded_storage::{ReadStorage, Storage};

use crate::card::{CardBytes, CardReader, CardTap, CardUid, CARD_BLOCK_LEN};
use crate::storage::NVS_MIN_CAPACITY;

// ---------------------------------------------------------------------------
// MockSerial — audio module UART
// ---------------------------------------------------------------------------

/// I/O error raised by [`MockSerial`] when write failure is injected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockIoError;

impl embedded_io::Error for MockIoError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

#[derive(Default)]
struct SerialInner {
    rx: VecDeque<u8>,
    tx: Vec<u8>,
    fail_writes: bool,
}

/// Mock audio-module serial port.
///
/// Bytes pushed with [`push_rx`](Self::push_rx) are what the module "sent";
/// everything the code under test writes is captured in [`tx`](Self::tx).
#[derive(Clone, Default)]
pub struct MockSerial {
    inner: Rc<RefCell<SerialInner>>,
}

impl MockSerial {
    /// Create an idle serial port.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue bytes as if the module had sent them.
    pub fn push_rx(&self, bytes: &[u8]) {
        self.inner.borrow_mut().rx.extend(bytes.iter().copied());
    }

    /// Copy of every byte written so far.
    pub fn tx(&self) -> Vec<u8> {
        self.inner.borrow().tx.clone()
    }

    /// Drain and return every byte written so far.
    pub fn take_tx(&self) -> Vec<u8> {
        core::mem::take(&mut self.inner.borrow_mut().tx)
    }

    /// Make subsequent writes fail.
    pub fn set_write_failure(&self, fail: bool) {
        self.inner.borrow_mut().fail_writes = fail;
    }
}

impl ErrorType for MockSerial {
    type Error = MockIoError;
}

impl Read for MockSerial {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let mut inner = self.inner.borrow_mut();
        let mut n = 0usize;
        for slot in buf.iter_mut() {
            match inner.rx.pop_front() {
                Some(b) => {
                    *slot = b;
                    n = n.saturating_add(1);
                }
                None => break,
            }
        }
        Ok(n)
    }
}

impl ReadReady for MockSerial {
    fn read_ready(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.inner.borrow().rx.is_empty())
    }
}

impl Write for MockSerial {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        let mut inner = self.inner.borrow_mut();
        if inner.fail_writes {
            return Err(MockIoError);
        }
        inner.tx.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MockEeprom — byte-addressable persistent store
// ---------------------------------------------------------------------------

/// Errors raised by [`MockEeprom`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockStorageError {
    /// Access past the end of the store.
    OutOfBounds,
    /// Injected write failure.
    WriteFailed,
}

struct EepromInner {
    mem: Vec<u8>,
    fail_writes: bool,
    drop_writes: bool,
    writes: usize,
}

/// Mock EEPROM, erased to `0xFF` like a fresh part.
#[derive(Clone)]
pub struct MockEeprom {
    inner: Rc<RefCell<EepromInner>>,
}

impl MockEeprom {
    /// Create an erased store large enough for the full memory map.
    pub fn new() -> Self {
        Self::with_capacity(NVS_MIN_CAPACITY)
    }

    /// Create an erased store of `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Rc::new(RefCell::new(EepromInner {
                mem: std::vec![0xFF; capacity],
                fail_writes: false,
                drop_writes: false,
                writes: 0,
            })),
        }
    }

    /// Make subsequent writes return an error.
    pub fn set_write_failure(&self, fail: bool) {
        self.inner.borrow_mut().fail_writes = fail;
    }

    /// Make subsequent writes report success without changing memory.
    pub fn set_silent_write_loss(&self, drop: bool) {
        self.inner.borrow_mut().drop_writes = drop;
    }

    /// Number of successful write calls.
    pub fn write_count(&self) -> usize {
        self.inner.borrow().writes
    }

    /// Copy of `len` bytes at `offset` (empty if out of range).
    pub fn snapshot(&self, offset: usize, len: usize) -> Vec<u8> {
        let inner = self.inner.borrow();
        offset
            .checked_add(len)
            .and_then(|end| inner.mem.get(offset..end))
            .map(<[u8]>::to_vec)
            .unwrap_or_default()
    }

    /// Overwrite memory directly, bypassing fault injection.
    pub fn poke(&self, offset: usize, bytes: &[u8]) {
        let mut inner = self.inner.borrow_mut();
        if let Some(dst) = offset
            .checked_add(bytes.len())
            .and_then(|end| inner.mem.get_mut(offset..end))
        {
            dst.copy_from_slice(bytes);
        }
    }
}

impl Default for MockEeprom {
    fn default() -> Self {
        Self::new()
    }
}

impl ReadStorage for MockEeprom {
    type Error = MockStorageError;

    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
        let inner = self.inner.borrow();
        let start = offset as usize;
        let src = start
            .checked_add(bytes.len())
            .and_then(|end| inner.mem.get(start..end))
            .ok_or(MockStorageError::OutOfBounds)?;
        bytes.copy_from_slice(src);
        Ok(())
    }

    fn capacity(&self) -> usize {
        self.inner.borrow().mem.len()
    }
}

impl Storage for MockEeprom {
    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
        let mut inner = self.inner.borrow_mut();
        if inner.fail_writes {
            return Err(MockStorageError::WriteFailed);
        }
        if inner.drop_writes {
            inner.writes = inner.writes.saturating_add(1);
            return Ok(());
        }
        let start = offset as usize;
        let dst = start
            .checked_add(bytes.len())
            .and_then(|end| inner.mem.get_mut(start..end))
            .ok_or(MockStorageError::OutOfBounds)?;
        dst.copy_from_slice(bytes);
        inner.writes = inner.writes.saturating_add(1);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MockCardReader — RFID transceiver
// ---------------------------------------------------------------------------

/// Errors raised by [`MockCardReader`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockCardError {
    /// The addressed card is not on the reader.
    NotPresent,
    /// Injected write failure.
    WriteFailed,
    /// The card's block cannot be read (foreign tag).
    Unreadable,
}

#[derive(Default)]
struct ReaderInner {
    cards: Vec<(CardUid, CardBytes)>,
    taps: VecDeque<CardUid>,
    present: Option<CardUid>,
    fail_writes: bool,
    drop_writes: bool,
}

impl ReaderInner {
    fn content(&self, uid: &CardUid) -> Option<&CardBytes> {
        self.cards.iter().find(|(u, _)| u == uid).map(|(_, b)| b)
    }
}

/// Mock RFID reader with a small deck of cards.
#[derive(Clone, Default)]
pub struct MockCardReader {
    inner: Rc<RefCell<ReaderInner>>,
}

impl MockCardReader {
    /// Create a reader with no cards.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) a card in the deck with the given block contents.
    ///
    /// Contents longer than [`crate::card::CARD_READ_MAX`] are truncated.
    pub fn add_card(&self, uid: CardUid, block: &[u8]) {
        let mut bytes = CardBytes::new();
        for b in block.iter().take(bytes.capacity()) {
            bytes.push(*b).ok();
        }
        let mut inner = self.inner.borrow_mut();
        inner.cards.retain(|(u, _)| *u != uid);
        inner.cards.push((uid, bytes));
    }

    /// Queue a tap of `uid`; the card stays present until [`remove`](Self::remove).
    pub fn tap(&self, uid: CardUid) {
        self.inner.borrow_mut().taps.push_back(uid);
    }

    /// Take the present card off the reader.
    pub fn remove(&self) {
        self.inner.borrow_mut().present = None;
    }

    /// Current contents of `uid`'s block.
    pub fn block_of(&self, uid: &CardUid) -> Option<CardBytes> {
        self.inner.borrow().content(uid).cloned()
    }

    /// Make subsequent writes fail.
    pub fn set_write_failure(&self, fail: bool) {
        self.inner.borrow_mut().fail_writes = fail;
    }

    /// Make subsequent writes report success without changing the card.
    pub fn set_silent_write_loss(&self, drop: bool) {
        self.inner.borrow_mut().drop_writes = drop;
    }
}

impl CardReader for MockCardReader {
    type Error = MockCardError;

    fn poll_card(&mut self) -> Option<CardTap> {
        let mut inner = self.inner.borrow_mut();
        let uid = inner.taps.pop_front()?;
        inner.present = Some(uid);
        let block = inner.content(&uid).cloned().unwrap_or_default();
        Some(CardTap { uid, block })
    }

    fn write_block(
        &mut self,
        uid: &CardUid,
        block: &[u8; CARD_BLOCK_LEN],
    ) -> Result<(), Self::Error> {
        let mut inner = self.inner.borrow_mut();
        if inner.present != Some(*uid) {
            return Err(MockCardError::NotPresent);
        }
        if inner.fail_writes {
            return Err(MockCardError::WriteFailed);
        }
        if inner.drop_writes {
            return Ok(());
        }
        let mut bytes = CardBytes::new();
        bytes.extend_from_slice(block).ok();
        inner.cards.retain(|(u, _)| u != uid);
        inner.cards.push((*uid, bytes));
        Ok(())
    }

    fn read_block(&mut self, uid: &CardUid) -> Result<[u8; CARD_BLOCK_LEN], Self::Error> {
        let inner = self.inner.borrow();
        if inner.present != Some(*uid) {
            return Err(MockCardError::NotPresent);
        }
        let content = inner.content(uid).ok_or(MockCardError::Unreadable)?;
        <[u8; CARD_BLOCK_LEN]>::try_from(content.as_slice()).map_err(|_| MockCardError::Unreadable)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn serial_round_trips_rx_and_captures_tx() {
        let mut serial = MockSerial::new();
        let handle = serial.clone();
        handle.push_rx(&[1, 2, 3]);
        assert!(serial.read_ready().unwrap());
        let mut buf = [0u8; 8];
        assert_eq!(serial.read(&mut buf).unwrap(), 3);
        assert!(!serial.read_ready().unwrap());
        serial.write_all(&[9, 8]).unwrap();
        assert_eq!(handle.take_tx(), std::vec![9, 8]);
        assert!(handle.tx().is_empty());
    }

    #[test]
    fn eeprom_starts_erased_and_bounds_checks() {
        let mut nvs = MockEeprom::with_capacity(8);
        let mut buf = [0u8; 4];
        nvs.read(4, &mut buf).unwrap();
        assert_eq!(buf, [0xFF; 4]);
        assert_eq!(nvs.read(6, &mut buf), Err(MockStorageError::OutOfBounds));
        assert_eq!(nvs.write(7, &[0, 0]), Err(MockStorageError::OutOfBounds));
    }

    #[test]
    fn eeprom_injected_failure_leaves_memory_untouched() {
        let mut nvs = MockEeprom::with_capacity(4);
        nvs.set_write_failure(true);
        assert_eq!(nvs.write(0, &[1]), Err(MockStorageError::WriteFailed));
        assert_eq!(nvs.snapshot(0, 1), std::vec![0xFF]);
        assert_eq!(nvs.write_count(), 0);
    }

    #[test]
    fn reader_writes_only_to_present_card() {
        let mut reader = MockCardReader::new();
        let a = CardUid::from_slice(&[1, 2, 3, 4]);
        let b = CardUid::from_slice(&[5, 6, 7, 8]);
        reader.add_card(a, &[0u8; CARD_BLOCK_LEN]);
        reader.add_card(b, &[0u8; CARD_BLOCK_LEN]);
        reader.tap(a);
        let tap = reader.poll_card().expect("tap queued");
        assert_eq!(tap.uid, a);
        assert_eq!(reader.write_block(&b, &[7; 16]), Err(MockCardError::NotPresent));
        reader.write_block(&a, &[7; 16]).unwrap();
        assert_eq!(reader.read_block(&a).unwrap(), [7; 16]);
        reader.remove();
        assert_eq!(reader.read_block(&a), Err(MockCardError::NotPresent));
    }

    #[test]
    fn reader_reports_short_blocks_for_foreign_tags() {
        let mut reader = MockCardReader::new();
        let uid = CardUid::from_slice(&[9; 7]);
        reader.add_card(uid, &[]);
        reader.tap(uid);
        let tap = reader.poll_card().unwrap();
        assert!(tap.block.is_empty());
        assert!(reader.poll_card().is_none());
    }
}
