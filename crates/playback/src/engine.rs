//! Playback state.
//!
//! [`PlaybackState`] is a plain value owned by the controller. It has no
//! I/O: the controller mutates it in response to activity calls and module
//! replies, and anyone else only ever sees a shared reference, so a test can
//! snapshot it and compare later.

use embassy_time::{Duration, Instant};
use keycard::PlaybackMode;
use platform::FolderId;

/// Transport state as the controller believes it to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Transport {
    /// Nothing playing.
    Stopped,
    /// A track is playing.
    Playing,
    /// Paused; resuming continues the same track.
    Paused,
    /// A story reached a branch point and waits for a button choice.
    AwaitingChoice,
}

/// Last busy/idle answer from the module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ModuleStatus {
    /// Not queried yet.
    Unknown,
    /// Playing.
    Busy,
    /// Stopped or paused.
    Idle,
}

/// Module health.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FaultState {
    /// Replies arrive.
    Healthy,
    /// One reply missed; the command has been re-sent.
    Retrying,
    /// A command failed twice. Cleared by the next reply.
    Faulted,
}

/// Audiobook position worth persisting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ProgressMark {
    /// Book folder.
    pub folder: FolderId,
    /// Track to resume at.
    pub track: u16,
    /// Seconds already played of that track.
    pub elapsed_secs: u16,
}

/// Everything the controller knows about the current playback.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PlaybackState {
    pub(crate) folder: Option<FolderId>,
    pub(crate) track: u16,
    pub(crate) track_count: u16,
    pub(crate) mode: Option<PlaybackMode>,
    pub(crate) transport: Transport,
    pub(crate) module: ModuleStatus,
    pub(crate) resume: Option<ProgressMark>,
    pub(crate) fault: FaultState,
}

impl PlaybackState {
    /// Power-on state: no folder, stopped, module not yet heard from.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            folder: None,
            track: 0,
            track_count: 0,
            mode: None,
            transport: Transport::Stopped,
            module: ModuleStatus::Unknown,
            resume: None,
            fault: FaultState::Healthy,
        }
    }

    /// Folder of the last card played.
    pub fn folder(&self) -> Option<FolderId> {
        self.folder
    }

    /// Current track, 1-based; 0 before the first track starts.
    pub fn track(&self) -> u16 {
        self.track
    }

    /// Tracks in the folder; 0 until the module has answered.
    pub fn track_count(&self) -> u16 {
        self.track_count
    }

    /// Mode of the last card played.
    pub fn mode(&self) -> Option<PlaybackMode> {
        self.mode
    }

    /// Transport state.
    pub fn transport(&self) -> Transport {
        self.transport
    }

    /// Last busy/idle answer.
    pub fn module_status(&self) -> ModuleStatus {
        self.module
    }

    /// Saved audiobook position, when playing a book.
    pub fn resume_point(&self) -> Option<ProgressMark> {
        self.resume
    }

    /// Module health.
    pub fn fault(&self) -> FaultState {
        self.fault
    }

    /// Playing, or paused mid-track.
    pub fn is_active(&self) -> bool {
        matches!(self.transport, Transport::Playing | Transport::Paused)
    }

    /// Re-seed for a new card.
    pub(crate) fn seed(&mut self, folder: FolderId, mode: PlaybackMode) {
        self.folder = Some(folder);
        self.mode = Some(mode);
        self.track = 0;
        self.track_count = 0;
        self.resume = None;
        self.transport = Transport::Stopped;
    }
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self::new()
    }
}

/// Play time of the current track, excluding pauses.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct TrackClock {
    played: Duration,
    running_since: Option<Instant>,
}

impl TrackClock {
    pub(crate) fn start(&mut self, now: Instant, already: Duration) {
        self.played = already;
        self.running_since = Some(now);
    }

    pub(crate) fn pause(&mut self, now: Instant) {
        if let Some(since) = self.running_since.take() {
            self.played = self
                .played
                .checked_add(now.saturating_duration_since(since))
                .unwrap_or(Duration::MAX);
        }
    }

    pub(crate) fn resume(&mut self, now: Instant) {
        if self.running_since.is_none() {
            self.running_since = Some(now);
        }
    }

    pub(crate) fn elapsed(&self, now: Instant) -> Duration {
        let running = self
            .running_since
            .map_or(Duration::from_ticks(0), |since| now.saturating_duration_since(since));
        self.played.checked_add(running).unwrap_or(Duration::MAX)
    }

    pub(crate) fn elapsed_secs(&self, now: Instant) -> u16 {
        u16::try_from(self.elapsed(now).as_secs()).unwrap_or(u16::MAX)
    }
}
