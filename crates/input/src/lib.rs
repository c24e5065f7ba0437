//! Button decoder for Tonbox.
//!
//! Raw per-tick button levels go in, [`ButtonEvent`]s come out: short,
//! long, double and triple presses, hold-repeat ticks while a long press is
//! held, and combos of several buttons pressed together.
//!
//! The decoder is a pure, allocation-free state machine driven by
//! [`ButtonDecoder::sample`] with an explicit timestamp, so every timing rule
//! is testable on the host without a clock.
//!
//! ```
//! use embassy_time::Instant;
//! use input::{ButtonDecoder, DecoderConfig};
//! use platform::ButtonLevels;
//!
//! let mut decoder = ButtonDecoder::new(DecoderConfig::default());
//! let events = decoder.sample(Instant::from_millis(0), ButtonLevels::RELEASED);
//! assert!(events.is_empty());
//! ```
//!
//! [`ButtonEvent`]: platform::ButtonEvent

#![cfg_attr(not(test), no_std)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![warn(missing_docs)]

#[macro_use]
extern crate platform;

mod debounce;
pub mod decoder;

pub use decoder::{ButtonDecoder, DecoderConfig, Events, MAX_EVENTS_PER_SAMPLE};
