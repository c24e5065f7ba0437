//! Hardware seams and shared domain types for Tonbox
//!
//! Every other crate in the workspace talks to the board through the types
//! re-exported here, so the control core can be exercised on the host
//! without any hardware attached.
//!
//! # Architecture Layers
//!
//! ```text
//! Application Layer (firmware crate: App tick loop, board adapters)
//!         ↓
//! Control Layers (activity, playback, input, keycard, settings)
//!         ↓
//! Platform seams (this crate)
//!         ↓
//! Hardware Layer (Embassy HAL, MFRC522, AT24C EEPROM, audio module UART)
//! ```
//!
//! # Seams
//!
//! - [`CardReader`] - RFID transceiver: one [`CardTap`] per card arrival,
//!   block write + read-back against the present card
//! - Audio module serial - plain [`embedded_io`] `Read + ReadReady + Write`
//! - Persistent storage - plain [`embedded_storage::Storage`], laid out by
//!   the [`storage`] memory map
//! - Buttons - [`ButtonLevels`] sampled once per tick
//!
//! # Features
//!
//! - `std`: host mocks in [`mocks`]
//! - `defmt`: `defmt::Format` derives on all public types

// ── Lint policy ─────────────────────────────────────────────────────────────
#![deny(clippy::unwrap_used)] // no .unwrap() in production code
#![deny(clippy::expect_used)] // no .expect() in production code
#![deny(clippy::panic)] // no panic!() in production code
#![deny(unused_must_use)]
// all Results must be handled
// ────────────────────────────────────────────────────────────────────────────
#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::print_stdout)] // prefer tracing/defmt over println! in lib code
#![allow(clippy::doc_markdown)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

#[cfg(feature = "std")]
extern crate std;

pub mod audio_types;
pub mod card;
pub mod config;
pub mod input;
mod log;
pub mod mocks;
pub mod storage;

pub use audio_types::{Equalizer, FolderId, OutOfRangeError, Volume};
pub use card::{CardBytes, CardReader, CardTap, CardUid, CARD_BLOCK_LEN};
pub use input::{Button, ButtonEvent, ButtonLevels, ButtonSet};
