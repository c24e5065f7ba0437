//! AT24Cxx serial EEPROM behind [`embedded_storage::Storage`].
//!
//! Two-byte word addressing (AT24C32 and larger). Writes are split at page
//! boundaries because the device wraps inside a page instead of carrying
//! into the next one. After every page the device goes deaf for its
//! internal write cycle; it is polled with empty writes until it ACKs again.

use embedded_hal::i2c::I2c;
use embedded_storage::{ReadStorage, Storage};
use heapless::Vec;
use thiserror_no_std::Error;

/// Largest page among the supported parts.
const MAX_PAGE: usize = 64;

/// Bytes of word address sent before data.
const ADDR_LEN: usize = 2;

/// Polls allowed for one internal write cycle (datasheet max is 5 ms).
const ACK_POLL_LIMIT: usize = 1_000;

/// Size and page layout of one part.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Geometry {
    /// Total bytes.
    pub capacity: usize,
    /// Page size in bytes.
    pub page: usize,
}

impl Geometry {
    /// AT24C32: 4 KiB, 32-byte pages.
    pub const AT24C32: Geometry = Geometry {
        capacity: 4096,
        page: 32,
    };
    /// AT24C256: 32 KiB, 64-byte pages.
    pub const AT24C256: Geometry = Geometry {
        capacity: 32_768,
        page: 64,
    };
}

/// EEPROM access failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EepromError {
    /// The bus transfer failed.
    #[error("i2c transfer failed")]
    Bus,
    /// The device never finished its write cycle.
    #[error("eeprom write cycle timed out")]
    Busy,
    /// The access reaches past the end of the device.
    #[error("eeprom access out of bounds")]
    OutOfBounds,
}

/// An AT24Cxx on an I²C bus.
pub struct At24c<I> {
    i2c: I,
    address: u8,
    geometry: Geometry,
}

impl<I: I2c> At24c<I> {
    /// Device at 7-bit `address` (0x50 with all address pins low).
    pub fn new(i2c: I, address: u8, geometry: Geometry) -> Self {
        let page = geometry.page.clamp(1, MAX_PAGE);
        Self {
            i2c,
            address,
            geometry: Geometry { page, ..geometry },
        }
    }

    /// Hand the bus back.
    pub fn release(self) -> I {
        self.i2c
    }

    fn check(&self, offset: u32, len: usize) -> Result<usize, EepromError> {
        let start = usize::try_from(offset).map_err(|_| EepromError::OutOfBounds)?;
        let end = start.checked_add(len).ok_or(EepromError::OutOfBounds)?;
        if end > self.geometry.capacity {
            return Err(EepromError::OutOfBounds);
        }
        Ok(start)
    }

    fn word(addr: usize) -> [u8; ADDR_LEN] {
        u16::try_from(addr).unwrap_or(u16::MAX).to_be_bytes()
    }

    fn wait_ready(&mut self) -> Result<(), EepromError> {
        for _ in 0..ACK_POLL_LIMIT {
            if self.i2c.write(self.address, &[]).is_ok() {
                return Ok(());
            }
        }
        warn!("eeprom did not finish its write cycle");
        Err(EepromError::Busy)
    }
}

impl<I: I2c> ReadStorage for At24c<I> {
    type Error = EepromError;

    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
        let start = self.check(offset, bytes.len())?;
        if bytes.is_empty() {
            return Ok(());
        }
        self.i2c
            .write_read(self.address, &Self::word(start), bytes)
            .map_err(|_| EepromError::Bus)
    }

    fn capacity(&self) -> usize {
        self.geometry.capacity
    }
}

impl<I: I2c> Storage for At24c<I> {
    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
        let mut addr = self.check(offset, bytes.len())?;
        let mut rest = bytes;
        while !rest.is_empty() {
            let page_left = self
                .geometry
                .page
                .saturating_sub(addr.checked_rem(self.geometry.page).unwrap_or(0));
            let (chunk, tail) = rest.split_at(page_left.min(rest.len()));

            let mut frame: Vec<u8, { ADDR_LEN + MAX_PAGE }> = Vec::new();
            frame
                .extend_from_slice(&Self::word(addr))
                .map_err(|_| EepromError::OutOfBounds)?;
            frame
                .extend_from_slice(chunk)
                .map_err(|_| EepromError::OutOfBounds)?;
            self.i2c
                .write(self.address, &frame)
                .map_err(|_| EepromError::Bus)?;
            self.wait_ready()?;

            trace!("eeprom wrote {} bytes at {}", chunk.len(), addr);
            addr = addr.saturating_add(chunk.len());
            rest = tail;
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use embedded_hal_mock::eh1::i2c::{Mock as I2cMock, Transaction};
    use embedded_hal::i2c::{ErrorKind, NoAcknowledgeSource};

    const ADDR: u8 = 0x50;

    #[test]
    fn read_sends_word_address_first() {
        let expectations = [Transaction::write_read(
            ADDR,
            vec![0x01, 0x02],
            vec![0xAA, 0xBB, 0xCC],
        )];
        let mut eeprom = At24c::new(I2cMock::new(&expectations), ADDR, Geometry::AT24C32);
        let mut buf = [0u8; 3];
        eeprom.read(0x0102, &mut buf).unwrap();
        assert_eq!(buf, [0xAA, 0xBB, 0xCC]);
        eeprom.release().done();
    }

    #[test]
    fn write_splits_at_page_boundary() {
        // 4 bytes at 30 on a 32-byte page: 2 bytes, then 2 on the next page.
        let expectations = [
            Transaction::write(ADDR, vec![0x00, 30, 1, 2]),
            Transaction::write(ADDR, vec![]),
            Transaction::write(ADDR, vec![0x00, 32, 3, 4]),
            Transaction::write(ADDR, vec![]),
        ];
        let mut eeprom = At24c::new(I2cMock::new(&expectations), ADDR, Geometry::AT24C32);
        eeprom.write(30, &[1, 2, 3, 4]).unwrap();
        eeprom.release().done();
    }

    #[test]
    fn write_waits_out_the_write_cycle() {
        let nak = ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address);
        let expectations = [
            Transaction::write(ADDR, vec![0x00, 0x00, 7]),
            Transaction::write(ADDR, vec![]).with_error(nak),
            Transaction::write(ADDR, vec![]).with_error(nak),
            Transaction::write(ADDR, vec![]),
        ];
        let mut eeprom = At24c::new(I2cMock::new(&expectations), ADDR, Geometry::AT24C32);
        eeprom.write(0, &[7]).unwrap();
        eeprom.release().done();
    }

    #[test]
    fn access_past_the_end_touches_no_bus() {
        let mut eeprom = At24c::new(I2cMock::new(&[]), ADDR, Geometry::AT24C32);
        let mut buf = [0u8; 4];
        assert_eq!(eeprom.read(4094, &mut buf), Err(EepromError::OutOfBounds));
        assert_eq!(eeprom.write(4095, &[0, 0]), Err(EepromError::OutOfBounds));
        eeprom.release().done();
    }

    #[test]
    fn bus_failure_is_reported() {
        let expectations = [Transaction::write(ADDR, vec![0x00, 0x10, 9])
            .with_error(ErrorKind::Bus)];
        let mut eeprom = At24c::new(I2cMock::new(&expectations), ADDR, Geometry::AT24C32);
        assert_eq!(eeprom.write(0x10, &[9]), Err(EepromError::Bus));
        eeprom.release().done();
    }

    #[test]
    fn holds_the_whole_memory_map() {
        assert!(Geometry::AT24C32.capacity >= platform::storage::NVS_MIN_CAPACITY);
    }
}
