//! Persistent settings for Tonbox.
//!
//! [`AdminSettings`] is the single owned copy of everything the config
//! menu changes. [`SettingsStore`] keeps it in a CRC-protected block on any
//! [`embedded_storage::Storage`] device, together with the audiobook
//! progress table.
//!
//! ```
//! use platform::mocks::MockEeprom;
//! use settings::{Loaded, SettingsStore};
//!
//! let nvs = MockEeprom::new();
//! let mut store = SettingsStore::open(nvs.clone());
//! store.commit(|s| s.locked = true).unwrap();
//!
//! let mut reopened = SettingsStore::open(nvs);
//! assert_eq!(reopened.load(), Loaded::Stored);
//! assert!(reopened.settings().locked);
//! ```

#![cfg_attr(all(not(test), not(feature = "std")), no_std)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![warn(missing_docs)]

#[macro_use]
extern crate platform;

pub mod admin;
pub mod layout;
pub mod store;

pub use admin::{AdminSettings, Shortcut, SHORTCUT_SLOTS};
pub use layout::{LayoutError, SETTINGS_LEN};
pub use store::{Loaded, Progress, SettingsStore, StorageFault};
