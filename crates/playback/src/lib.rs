//! Audio module control for Tonbox.
//!
//! The audio module decodes and plays files on its own; this crate speaks
//! its serial protocol and decides what to play next.
//!
//! - [`protocol`]: 10-byte command and reply frames, streaming decoder
//! - [`engine`]: [`PlaybackState`], the controller's view of the player
//! - [`controller`]: [`PlayerController`], mode policies, retry and fault
//!   handling
//! - [`shuffle`], [`story`]: party-mode order and story branch points
//! - [`cue`]: spoken prompts
//!
//! ```
//! use embassy_time::Instant;
//! use keycard::PlaybackMode;
//! use platform::{mocks::MockSerial, FolderId};
//! use playback::{PlayerController, PlayerTiming, SequentialBranches, StatusReply};
//!
//! let serial = MockSerial::new();
//! let mut player = PlayerController::new(serial.clone(), SequentialBranches, PlayerTiming::default());
//! player.play_folder(FolderId::FIRST, PlaybackMode::Album, 1, Instant::from_millis(0));
//! serial.push_rx(&StatusReply::TrackCount(12).encode());
//! player.poll(Instant::from_millis(10));
//! assert_eq!(player.state().track(), 1);
//! ```

#![cfg_attr(not(test), no_std)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![warn(missing_docs)]

#[macro_use]
extern crate platform;

pub mod controller;
pub mod cue;
pub mod engine;
pub mod protocol;
pub mod shuffle;
pub mod story;

pub use controller::{
    Notices, PlayerController, PlayerNotice, PlayerTiming, VolumeChange, MAX_NOTICES,
};
pub use cue::Cue;
pub use engine::{FaultState, ModuleStatus, PlaybackState, ProgressMark, Transport};
pub use protocol::{Command, FrameDecoder, StatusReply, FRAME_LEN};
pub use shuffle::ShuffleQueue;
pub use story::{option_for_button, BranchOptions, BranchSource, SequentialBranches};
