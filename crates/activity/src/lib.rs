//! Top-level control state machine for Tonbox.
//!
//! Exactly one activity owns the inputs at a time. [`DefaultActivity`] sits
//! at the bottom of the [`ActivityStack`] and plays cards; the admin combo
//! pushes a [`ConfigActivity`] on top for pairing cards and changing
//! settings. Activities never own hardware: each turn they get a [`Ctx`]
//! borrowing the player, the settings store and the card reader.
//!
//! ```
//! use activity::{ActivityStack, ActivityTiming, Board, Ctx};
//! use embassy_time::Instant;
//! use platform::mocks::{MockCardReader, MockEeprom, MockSerial};
//! use platform::{Button, ButtonEvent, ButtonSet};
//! use playback::{PlayerController, PlayerTiming, SequentialBranches};
//! use settings::SettingsStore;
//!
//! struct Host;
//! impl Board for Host {
//!     type Serial = MockSerial;
//!     type Branches = SequentialBranches;
//!     type Nvs = MockEeprom;
//!     type Reader = MockCardReader;
//! }
//!
//! let mut player = PlayerController::new(MockSerial::new(), SequentialBranches, PlayerTiming::default());
//! let mut store = SettingsStore::open(MockEeprom::new());
//! let mut reader = MockCardReader::new();
//! let mut stack = ActivityStack::new(ActivityTiming::default());
//! let mut ctx = Ctx::<Host> {
//!     now: Instant::from_millis(0),
//!     player: &mut player,
//!     store: &mut store,
//!     reader: &mut reader,
//! };
//! stack.on_button(&mut ctx, ButtonEvent::Combo(ButtonSet::ALL));
//! assert!(stack.in_config());
//! stack.on_button(&mut ctx, ButtonEvent::LongPress(Button::PlayPause));
//! assert!(!stack.in_config());
//! ```

#![cfg_attr(not(test), no_std)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![warn(missing_docs)]

#[macro_use]
extern crate platform;

pub mod board;
pub mod config;
pub mod default;
pub mod menu;
pub mod stack;

pub use board::{ActivityTiming, Board, Ctx, Player};
pub use config::{CardJob, ConfigActivity, Step, Target};
pub use default::{DefaultActivity, ADMIN_COMBO};
pub use menu::{cycle_mode, MenuItem, PAIRABLE_MODES};
pub use stack::{Activity, ActivityStack, StackEvent, Transition, MAX_DEPTH};
