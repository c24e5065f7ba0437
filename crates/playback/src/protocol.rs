//! Audio module serial protocol.
//!
//! Every message in either direction is one fixed 10-byte frame:
//!
//! ```text
//! 7E FF 06 CMD FB PH PL CH CL EF
//! │  │  │  │   │  └──┴─ parameter, big-endian
//! │  │  │  │   └─ 1 = module acknowledges with 0x41
//! │  │  │  └─ command / reply code
//! │  │  └─ length (always 6)
//! │  └─ version
//! └─ start                       CH CL = checksum, EF = end
//! ```
//!
//! The checksum is the two's complement of the 16-bit sum of bytes 1..=6.

use heapless::Vec;
use platform::{Equalizer, FolderId, Volume};

/// Size of every frame.
pub const FRAME_LEN: usize = 10;

const START: u8 = 0x7E;
const VERSION: u8 = 0xFF;
const LENGTH: u8 = 0x06;
const END: u8 = 0xEF;

// ─────────────────────────────────────────────────────────────────────────────
// Outbound
// ─────────────────────────────────────────────────────────────────────────────

/// Commands sent to the audio module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    /// Skip to the module's next file.
    Next,
    /// Set output volume.
    SetVolume(Volume),
    /// Select an equalizer preset.
    SetEqualizer(Equalizer),
    /// Resume after pause.
    Resume,
    /// Pause playback.
    Pause,
    /// Play `track` from numbered folder `folder`.
    PlayTrack {
        /// Folder 1..=99.
        folder: FolderId,
        /// Track 1..=255 inside the folder.
        track: u8,
    },
    /// Play a prompt from the `mp3` folder, replacing any music.
    PlayCue(u16),
    /// Play a prompt from the `advert` folder over running music.
    PlayAdvert(u16),
    /// Stop playback.
    Stop,
    /// Ask whether the module is playing.
    QueryStatus,
    /// Ask how many tracks a folder holds.
    QueryTrackCount(FolderId),
}

impl Command {
    /// Command code byte.
    #[must_use]
    pub const fn code(&self) -> u8 {
        match self {
            Command::Next => 0x01,
            Command::SetVolume(_) => 0x06,
            Command::SetEqualizer(_) => 0x07,
            Command::Resume => 0x0D,
            Command::Pause => 0x0E,
            Command::PlayTrack { .. } => 0x0F,
            Command::PlayCue(_) => 0x12,
            Command::PlayAdvert(_) => 0x13,
            Command::Stop => 0x16,
            Command::QueryStatus => 0x42,
            Command::QueryTrackCount(_) => 0x4E,
        }
    }

    /// 16-bit parameter.
    #[must_use]
    pub fn param(&self) -> u16 {
        match self {
            Command::SetVolume(v) => u16::from(v.get()),
            Command::SetEqualizer(eq) => u16::from(eq.to_wire()),
            Command::PlayTrack { folder, track } => {
                u16::from_be_bytes([folder.get(), *track])
            }
            Command::PlayCue(n) | Command::PlayAdvert(n) => *n,
            Command::QueryTrackCount(folder) => u16::from(folder.get()),
            Command::Next
            | Command::Resume
            | Command::Pause
            | Command::Stop
            | Command::QueryStatus => 0,
        }
    }

    /// Whether the module answers this command with an explicit ACK frame.
    #[must_use]
    pub const fn wants_ack(&self) -> bool {
        matches!(self, Command::PlayTrack { .. })
    }

    /// Whether the controller waits (with a deadline) for a reply.
    #[must_use]
    pub const fn expects_reply(&self) -> bool {
        matches!(
            self,
            Command::PlayTrack { .. } | Command::QueryStatus | Command::QueryTrackCount(_)
        )
    }

    /// Encode into a wire frame.
    #[must_use]
    pub fn encode(&self) -> [u8; FRAME_LEN] {
        frame(self.code(), u8::from(self.wants_ack()), self.param())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Inbound
// ─────────────────────────────────────────────────────────────────────────────

/// Replies and unsolicited notifications from the module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StatusReply {
    /// Command accepted (0x41).
    Ack,
    /// A track played to its end (0x3D); parameter is the module's file index.
    TrackFinished(u16),
    /// Status query answer: playing.
    Busy,
    /// Status query answer: stopped or paused.
    Idle,
    /// Module error (0x40) with its error code.
    Error(u8),
    /// Folder track-count query answer (0x4E).
    TrackCount(u16),
}

const REPLY_TRACK_FINISHED: u8 = 0x3D;
const REPLY_ERROR: u8 = 0x40;
const REPLY_ACK: u8 = 0x41;
const REPLY_STATUS: u8 = 0x42;
const REPLY_TRACK_COUNT: u8 = 0x4E;

impl StatusReply {
    /// Parse one complete frame.
    ///
    /// Returns `None` for anything malformed (framing, checksum) or for a
    /// reply code this controller does not use.
    ///
    /// # Safety (lint allow)
    /// All indices are constants below `FRAME_LEN`.
    #[allow(clippy::indexing_slicing)]
    #[must_use]
    pub fn parse(raw: &[u8; FRAME_LEN]) -> Option<Self> {
        if raw[0] != START || raw[1] != VERSION || raw[2] != LENGTH || raw[9] != END {
            return None;
        }
        let sum = u16::from_be_bytes([raw[7], raw[8]]);
        if sum != checksum(raw) {
            return None;
        }
        let param = u16::from_be_bytes([raw[5], raw[6]]);
        match raw[3] {
            REPLY_TRACK_FINISHED => Some(StatusReply::TrackFinished(param)),
            REPLY_ERROR => Some(StatusReply::Error(raw[6])),
            REPLY_ACK => Some(StatusReply::Ack),
            REPLY_STATUS if raw[6] == 1 => Some(StatusReply::Busy),
            REPLY_STATUS => Some(StatusReply::Idle),
            REPLY_TRACK_COUNT => Some(StatusReply::TrackCount(param)),
            _ => None,
        }
    }

    /// Encode as the module would send it. Used by host simulations.
    #[must_use]
    pub fn encode(&self) -> [u8; FRAME_LEN] {
        let (code, param) = match *self {
            StatusReply::Ack => (REPLY_ACK, 0),
            StatusReply::TrackFinished(n) => (REPLY_TRACK_FINISHED, n),
            StatusReply::Busy => (REPLY_STATUS, 0x0201),
            StatusReply::Idle => (REPLY_STATUS, 0x0200),
            StatusReply::Error(code) => (REPLY_ERROR, u16::from(code)),
            StatusReply::TrackCount(n) => (REPLY_TRACK_COUNT, n),
        };
        frame(code, 0, param)
    }
}

/// # Safety (lint allow)
/// Range is a constant inside the frame.
#[allow(clippy::indexing_slicing)]
fn checksum(raw: &[u8; FRAME_LEN]) -> u16 {
    let sum = raw[1..7]
        .iter()
        .fold(0u16, |acc, b| acc.wrapping_add(u16::from(*b)));
    0u16.wrapping_sub(sum)
}

/// # Safety (lint allow)
/// All indices are constants below `FRAME_LEN`.
#[allow(clippy::indexing_slicing)]
fn frame(code: u8, feedback: u8, param: u16) -> [u8; FRAME_LEN] {
    let [hi, lo] = param.to_be_bytes();
    let mut raw = [START, VERSION, LENGTH, code, feedback, hi, lo, 0, 0, END];
    let [ch, cl] = checksum(&raw).to_be_bytes();
    raw[7] = ch;
    raw[8] = cl;
    raw
}

// ─────────────────────────────────────────────────────────────────────────────
// Streaming decoder
// ─────────────────────────────────────────────────────────────────────────────

/// Reassembles frames from a byte stream.
///
/// Bytes before a start marker are skipped. When a collected frame fails
/// to parse, decoding restarts at the next start marker inside it, so one
/// corrupted byte costs at most one frame.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buf: Vec<u8, FRAME_LEN>,
}

impl FrameDecoder {
    /// Empty decoder.
    #[must_use]
    pub const fn new() -> Self {
        Self { buf: Vec::new() }
    }

    /// Feed one byte; yields a reply when it completes a valid frame.
    pub fn push(&mut self, byte: u8) -> Option<StatusReply> {
        if self.buf.is_empty() && byte != START {
            return None;
        }
        if self.buf.push(byte).is_err() {
            self.buf.clear();
            return None;
        }
        let raw: [u8; FRAME_LEN] = self.buf.as_slice().try_into().ok()?;
        self.buf.clear();
        let reply = StatusReply::parse(&raw);
        if reply.is_none() {
            trace!("dropping malformed frame");
            let resync = raw
                .iter()
                .skip(1)
                .position(|b| *b == START)
                .map(|p| p.saturating_add(1));
            if let Some(tail) = resync.and_then(|p| raw.get(p..)) {
                // Shorter than a frame, so it cannot overflow the buffer.
                self.buf.extend_from_slice(tail).ok();
            }
        }
        reply
    }

    /// Drop any partial frame.
    pub fn clear(&mut self) {
        self.buf.clear();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn feed(decoder: &mut FrameDecoder, bytes: &[u8]) -> std::vec::Vec<StatusReply> {
        bytes.iter().filter_map(|b| decoder.push(*b)).collect()
    }

    #[test]
    fn play_track_frame_matches_module_format() {
        let cmd = Command::PlayTrack {
            folder: FolderId::try_new(3).unwrap(),
            track: 7,
        };
        // 0 - (FF + 06 + 0F + 01 + 03 + 07) = 0 - 0x11F = 0xFEE1
        assert_eq!(
            cmd.encode(),
            [0x7E, 0xFF, 0x06, 0x0F, 0x01, 0x03, 0x07, 0xFE, 0xE1, 0xEF]
        );
    }

    #[test]
    fn fire_and_forget_commands_do_not_request_ack() {
        assert_eq!(Command::Pause.encode()[4], 0);
        assert_eq!(Command::SetVolume(Volume::new(20)).encode()[6], 20);
        assert!(!Command::Pause.expects_reply());
        assert!(Command::QueryStatus.expects_reply());
        assert!(!Command::QueryStatus.wants_ack());
    }

    #[test]
    fn replies_parse_from_their_own_encoding() {
        for reply in [
            StatusReply::Ack,
            StatusReply::TrackFinished(12),
            StatusReply::Busy,
            StatusReply::Idle,
            StatusReply::Error(3),
            StatusReply::TrackCount(42),
        ] {
            assert_eq!(StatusReply::parse(&reply.encode()), Some(reply));
        }
    }

    #[test]
    fn bad_checksum_is_rejected() {
        let mut raw = StatusReply::Ack.encode();
        raw[8] ^= 0x01;
        assert_eq!(StatusReply::parse(&raw), None);
    }

    #[test]
    fn unknown_reply_code_is_ignored() {
        // 0x3F: module initialised; not used by the controller.
        let raw = frame(0x3F, 0, 2);
        assert_eq!(StatusReply::parse(&raw), None);
    }

    #[test]
    fn decoder_skips_noise_before_start_byte() {
        let mut decoder = FrameDecoder::new();
        let mut bytes = std::vec![0x00, 0x13, 0xEF];
        bytes.extend_from_slice(&StatusReply::TrackCount(5).encode());
        assert_eq!(feed(&mut decoder, &bytes), std::vec![StatusReply::TrackCount(5)]);
    }

    #[test]
    fn decoder_resyncs_after_truncated_frame() {
        let mut decoder = FrameDecoder::new();
        let good = StatusReply::TrackFinished(4).encode();
        // A frame cut off after four bytes, immediately followed by a good one.
        let mut bytes = good[..4].to_vec();
        bytes.extend_from_slice(&good);
        assert_eq!(
            feed(&mut decoder, &bytes),
            std::vec![StatusReply::TrackFinished(4)]
        );
    }

    #[test]
    fn decoder_handles_back_to_back_frames() {
        let mut decoder = FrameDecoder::new();
        let mut bytes = StatusReply::Ack.encode().to_vec();
        bytes.extend_from_slice(&StatusReply::Busy.encode());
        assert_eq!(
            feed(&mut decoder, &bytes),
            std::vec![StatusReply::Ack, StatusReply::Busy]
        );
    }
}
