//! Tonbox firmware
//!
//! Board glue around the runtime control core: the control loop body
//! ([`App`]), drivers for the parts on the board, and the hardware entry
//! point in `main.rs`.
//!
//! # Architecture
//!
//! ```text
//! main.rs (embassy executor, 10 ms ticker)
//!         ↓
//! App::tick (decoder → activity stack → player)
//!         ↓
//! Board seams (embedded-io UART, embedded-storage EEPROM, CardReader)
//!         ↓
//! Drivers (At24c, Mfrc522Reader, PanelPins) on embassy-stm32
//! ```
//!
//! # Features
//!
//! - `hardware` - Build for STM32H7 target (embassy, MFRC522, defmt)
//! - `emulator` - Scripted desktop session against the host mocks (tokio, tracing)
//! - `std` - Enable standard library (host mocks and tests)
//!
//! # Examples
//!
//! ## Hardware Target
//!
//! ```bash
//! cargo build --release --target thumbv7em-none-eabihf --features hardware
//! ```
//!
//! ## Emulator Target
//!
//! ```bash
//! cargo run --example scripted_session --features emulator
//! ```

#![cfg_attr(all(not(test), not(feature = "std")), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(unsafe_op_in_unsafe_fn)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![warn(clippy::print_stdout)] // prefer tracing/defmt over println! in lib code
#![warn(clippy::dbg_macro)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::doc_markdown)]

#[macro_use]
extern crate platform;

pub mod app;
pub mod buttons;
pub mod eeprom;
#[cfg(feature = "hardware")]
pub mod rfid;
pub mod tap;

pub use app::{App, AppConfig, AppSignal, Parts};
pub use buttons::PanelPins;
pub use eeprom::{At24c, EepromError, Geometry};
#[cfg(feature = "hardware")]
pub use rfid::{Mfrc522Reader, RfidError};
pub use tap::TapFilter;
