//! Settings and audiobook progress on non-volatile storage.
//!
//! Every write is read back and compared before it counts as done. A
//! settings change that cannot be stored leaves the in-memory copy as it
//! was, so memory and storage never disagree.
//!
//! Settings are kept in two copies. Each save goes to the copy that does
//! not hold the live settings and carries the next sequence number; on load
//! the valid copy with the newer sequence wins. A write cut short by power
//! loss therefore falls back to the previous settings instead of defaults.

use embedded_storage::Storage;
use platform::storage::{progress_slot, PROGRESS_SLOT_LEN, SETTINGS_SLOTS};
use platform::FolderId;
use thiserror_no_std::Error;

use crate::admin::AdminSettings;
use crate::layout::{self, SETTINGS_LEN};

/// Largest record the store writes at once.
const MAX_RECORD: usize = SETTINGS_LEN;

/// Why a read or write did not complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StorageFault {
    /// The driver reported a write error.
    #[error("storage write failed")]
    Write,
    /// The driver reported a read error.
    #[error("storage read failed")]
    Read,
    /// The write reported success but reading back differs.
    #[error("storage read-back mismatch")]
    Unverified,
    /// The record does not fit the device.
    #[error("storage address out of range")]
    OutOfRange,
}

/// Where the settings in memory came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Loaded {
    /// A valid stored block.
    Stored,
    /// Nothing usable was stored; defaults are in effect.
    Defaults,
}

/// Saved audiobook position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Progress {
    /// Track to resume at (1-based).
    pub track: u16,
    /// Seconds already played of that track.
    pub elapsed_secs: u16,
}

/// `a` was written after `b`, allowing for wrap-around.
fn is_newer(a: u8, b: u8) -> bool {
    let ahead = a.wrapping_sub(b);
    ahead != 0 && ahead < 0x80
}

/// Owns the storage device and the live [`AdminSettings`].
pub struct SettingsStore<N> {
    nvs: N,
    current: AdminSettings,
    /// Copy holding the live settings; the next save goes to the other one.
    active: usize,
    sequence: u8,
}

impl<N: Storage> SettingsStore<N> {
    /// Open the store and load the settings, falling back to defaults.
    pub fn open(nvs: N) -> Self {
        let mut store = Self {
            nvs,
            current: AdminSettings::default(),
            active: 1,
            sequence: 0,
        };
        store.load();
        store
    }

    /// Live settings.
    pub fn settings(&self) -> &AdminSettings {
        &self.current
    }

    /// The storage device.
    pub fn nvs(&self) -> &N {
        &self.nvs
    }

    /// Re-read both settings copies and keep the newest valid one.
    ///
    /// With no valid copy the defaults are used; that is not an error
    /// because a fresh device looks exactly like that.
    pub fn load(&mut self) -> Loaded {
        let mut newest: Option<(usize, AdminSettings, u8)> = None;
        for (slot, &offset) in SETTINGS_SLOTS.iter().enumerate() {
            let mut raw = [0u8; SETTINGS_LEN];
            if self.read(offset, &mut raw).is_err() {
                warn!("settings copy {} unreadable", slot);
                continue;
            }
            match layout::decode(&raw) {
                Ok((settings, sequence)) => {
                    let newer = newest
                        .as_ref()
                        .map_or(true, |(_, _, seen)| is_newer(sequence, *seen));
                    if newer {
                        newest = Some((slot, settings, sequence));
                    }
                }
                Err(e) => debug!("settings copy {} rejected: {}", slot, e),
            }
        }

        match newest {
            Some((slot, mut settings, sequence)) => {
                settings.normalize();
                self.current = settings;
                self.active = slot;
                self.sequence = sequence;
                debug!("settings loaded from copy {} (sequence {})", slot, sequence);
                Loaded::Stored
            }
            None => {
                warn!("no valid settings stored, using defaults");
                self.current = AdminSettings::default();
                self.active = 1;
                self.sequence = 0;
                Loaded::Defaults
            }
        }
    }

    /// Store `settings` and make them live.
    ///
    /// On failure the live settings are unchanged and the copy they were
    /// loaded from is left untouched.
    pub fn save(&mut self, settings: &AdminSettings) -> Result<(), StorageFault> {
        let mut settings = settings.clone();
        settings.normalize();
        let target = usize::from(self.active == 0);
        let offset = SETTINGS_SLOTS
            .get(target)
            .copied()
            .ok_or(StorageFault::OutOfRange)?;
        let sequence = self.sequence.wrapping_add(1);
        let raw = layout::encode(&settings, sequence);
        self.write_verified(offset, &raw)?;
        self.current = settings;
        self.active = target;
        self.sequence = sequence;
        info!("settings saved to copy {}", target);
        Ok(())
    }

    /// Apply `change` to a copy of the live settings and store the result.
    ///
    /// The change only becomes live once the write has been verified.
    pub fn commit<F>(&mut self, change: F) -> Result<&AdminSettings, StorageFault>
    where
        F: FnOnce(&mut AdminSettings),
    {
        let mut draft = self.current.clone();
        change(&mut draft);
        if draft == self.current {
            return Ok(&self.current);
        }
        if let Err(fault) = self.save(&draft) {
            warn!("settings change rolled back: {}", fault);
            return Err(fault);
        }
        Ok(&self.current)
    }

    /// Saved position for the audiobook in `folder`.
    pub fn load_progress(&mut self, folder: FolderId) -> Result<Option<Progress>, StorageFault> {
        let mut raw = [0u8; PROGRESS_SLOT_LEN];
        self.read(progress_slot(folder), &mut raw)?;
        let [t0, t1, e0, e1] = raw;
        let track = u16::from_be_bytes([t0, t1]);
        // Erased cells read 0xFF.
        if track == 0 || track == u16::MAX {
            return Ok(None);
        }
        Ok(Some(Progress {
            track,
            elapsed_secs: u16::from_be_bytes([e0, e1]),
        }))
    }

    /// Save the position for the audiobook in `folder`.
    ///
    /// Unchanged slots are not rewritten, sparing EEPROM cycles.
    pub fn save_progress(&mut self, folder: FolderId, progress: Progress) -> Result<(), StorageFault> {
        let [t0, t1] = progress.track.to_be_bytes();
        let [e0, e1] = progress.elapsed_secs.to_be_bytes();
        let raw = [t0, t1, e0, e1];
        let mut stored = [0u8; PROGRESS_SLOT_LEN];
        let offset = progress_slot(folder);
        if self.read(offset, &mut stored).is_ok() && stored == raw {
            return Ok(());
        }
        trace!("progress folder {} track {}", folder.get(), progress.track);
        self.write_verified(offset, &raw)
    }

    /// Forget the position for `folder`.
    pub fn clear_progress(&mut self, folder: FolderId) -> Result<(), StorageFault> {
        self.write_verified(progress_slot(folder), &[0xFF; PROGRESS_SLOT_LEN])
    }

    fn check_range(&self, offset: u32, len: usize) -> Result<(), StorageFault> {
        let end = usize::try_from(offset)
            .ok()
            .and_then(|o| o.checked_add(len))
            .ok_or(StorageFault::OutOfRange)?;
        if end > self.nvs.capacity() {
            return Err(StorageFault::OutOfRange);
        }
        Ok(())
    }

    fn read(&mut self, offset: u32, buf: &mut [u8]) -> Result<(), StorageFault> {
        self.check_range(offset, buf.len())?;
        self.nvs.read(offset, buf).map_err(|_| StorageFault::Read)
    }

    fn write_verified(&mut self, offset: u32, bytes: &[u8]) -> Result<(), StorageFault> {
        self.check_range(offset, bytes.len())?;
        self.nvs.write(offset, bytes).map_err(|_| StorageFault::Write)?;
        let mut back = [0u8; MAX_RECORD];
        let back = back.get_mut(..bytes.len()).ok_or(StorageFault::OutOfRange)?;
        self.nvs.read(offset, back).map_err(|_| StorageFault::Read)?;
        if back != bytes {
            error!("storage read-back mismatch at {}", offset);
            return Err(StorageFault::Unverified);
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use platform::mocks::MockEeprom;
    use platform::storage::PROGRESS_OFFSET;

    #[test]
    fn sequence_comparison_survives_wrap() {
        assert!(is_newer(1, 0));
        assert!(is_newer(0, 255));
        assert!(!is_newer(255, 0));
        assert!(!is_newer(9, 9));
    }

    #[test]
    fn progress_round_trips_per_folder() {
        let nvs = MockEeprom::new();
        let mut store = SettingsStore::open(nvs);
        let f3 = FolderId::try_new(3).unwrap();
        let f4 = FolderId::try_new(4).unwrap();
        assert_eq!(store.load_progress(f3), Ok(None));
        let p = Progress {
            track: 7,
            elapsed_secs: 95,
        };
        store.save_progress(f3, p).unwrap();
        assert_eq!(store.load_progress(f3), Ok(Some(p)));
        assert_eq!(store.load_progress(f4), Ok(None));
        store.clear_progress(f3).unwrap();
        assert_eq!(store.load_progress(f3), Ok(None));
    }

    #[test]
    fn identical_progress_is_not_rewritten() {
        let nvs = MockEeprom::new();
        let mut store = SettingsStore::open(nvs.clone());
        let p = Progress {
            track: 2,
            elapsed_secs: 0,
        };
        store.save_progress(FolderId::FIRST, p).unwrap();
        let writes = nvs.write_count();
        store.save_progress(FolderId::FIRST, p).unwrap();
        assert_eq!(nvs.write_count(), writes);
    }

    #[test]
    fn short_device_reports_out_of_range() {
        let nvs = MockEeprom::with_capacity(usize::try_from(PROGRESS_OFFSET).unwrap());
        let mut store = SettingsStore::open(nvs);
        assert_eq!(
            store.load_progress(FolderId::FIRST),
            Err(StorageFault::OutOfRange)
        );
    }
}
