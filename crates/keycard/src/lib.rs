//! Card codec for Tonbox command cards.
//!
//! A command card carries one 16-byte block: a magic cookie, a layout
//! version, the folder to play, the [`PlaybackMode`], and a mode-dependent
//! special value. [`decode`] validates every field and reports anything else
//! as [`InvalidCard`]; [`encode`] is its exact inverse on accepted input.
//!
//! ```
//! use keycard::{decode, encode, CardRecord, PlaybackMode};
//! use platform::FolderId;
//!
//! # fn main() -> Result<(), keycard::InvalidCard> {
//! let folder = FolderId::try_new(3).map_err(|_| keycard::InvalidCard::FolderOutOfRange(3))?;
//! let record = CardRecord::new(folder, PlaybackMode::Album, 0);
//! assert_eq!(decode(&encode(&record))?, record);
//! # Ok(())
//! # }
//! ```

#![cfg_attr(all(not(test), not(feature = "std")), no_std)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![warn(missing_docs)]

pub mod codec;
pub mod record;

pub use codec::{
    blank, decode, encode, InvalidCard, COOKIE, MAX_TRACK, MIN_VERSION, RECORD_LEN, VERSION,
};
pub use record::{AdminAction, CardRecord, PlaybackMode};
