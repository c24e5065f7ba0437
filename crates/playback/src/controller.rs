//! Player controller.
//!
//! Owns the audio module's serial port and the [`PlaybackState`]. Calls
//! from the activities write at most one command frame and return
//! immediately; replies are drained by [`PlayerController::poll`] once per
//! tick and turned into [`PlayerNotice`]s for the activity on top.
//!
//! At most one command waits for a reply at any time. If its deadline
//! passes (or the module answers with an error) the command is sent once
//! more; a second failure stops playback and reports
//! [`PlayerNotice::ModuleFault`] once. The next reply of any command clears
//! the fault again.

use embassy_time::{Duration, Instant};
use embedded_io::{Read, ReadReady, Write};
use heapless::Vec;
use keycard::PlaybackMode;
use platform::{Equalizer, FolderId, Volume};

use crate::cue::Cue;
use crate::engine::{
    FaultState, ModuleStatus, PlaybackState, ProgressMark, TrackClock, Transport,
};
use crate::protocol::{Command, FrameDecoder, StatusReply};
use crate::shuffle::ShuffleQueue;
use crate::story::{BranchOptions, BranchSource};

/// Reply and checkpoint timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PlayerTiming {
    /// How long to wait for a reply before re-sending.
    pub reply_timeout: Duration,
    /// Interval between audiobook progress checkpoints while playing.
    pub checkpoint_interval: Duration,
}

impl Default for PlayerTiming {
    fn default() -> Self {
        Self {
            reply_timeout: Duration::from_millis(1000),
            checkpoint_interval: Duration::from_secs(30),
        }
    }
}

/// Relative or absolute volume change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum VolumeChange {
    /// One step up.
    Up,
    /// One step down.
    Down,
    /// Jump to a level.
    Set(Volume),
}

/// Things the activity on top needs to react to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PlayerNotice {
    /// The module confirmed a track start.
    TrackStarted {
        /// Folder playing.
        folder: FolderId,
        /// Track playing.
        track: u16,
    },
    /// Playback ran out: single track done, album or story over.
    Finished,
    /// Audiobook position to persist.
    Progress(ProgressMark),
    /// The module failed to answer twice. Reported once per fault.
    ModuleFault,
    /// The module answered again after a fault.
    Recovered,
    /// The folder has no playable track.
    EmptyFolder(FolderId),
    /// A story waits for a choice among this many options.
    BranchPoint(u8),
    /// A volume change hit the configured bound.
    VolumeAtLimit(Volume),
}

/// Capacity of one notice batch.
pub const MAX_NOTICES: usize = 8;

/// Notices produced by one call.
pub type Notices = Vec<PlayerNotice, MAX_NOTICES>;

#[derive(Debug, Clone, Copy)]
struct Pending {
    command: Command,
    deadline: Instant,
    retried: bool,
}

/// Bytes read from the serial port per read call.
const RX_CHUNK: usize = 32;
/// Read calls per poll; bounds the time spent on a babbling module.
const RX_READS_PER_POLL: usize = 4;

fn later(t: Instant, d: Duration) -> Instant {
    t.checked_add(d).unwrap_or(Instant::MAX)
}

/// Fold the tick counter into a shuffle seed.
#[allow(clippy::cast_possible_truncation)]
fn seed_from(now: Instant) -> u32 {
    let ticks = now.as_ticks();
    (ticks ^ ticks.wrapping_shr(32)) as u32
}

fn merge(into: &mut Notices, from: Notices) {
    for notice in from {
        if into.push(notice).is_err() {
            warn!("notice batch full, dropping");
        }
    }
}

/// Drives the audio module and implements the playback-mode policies.
pub struct PlayerController<U, B> {
    serial: U,
    branches: B,
    timing: PlayerTiming,
    state: PlaybackState,
    volume: Volume,
    min_volume: Volume,
    max_volume: Volume,
    equalizer: Equalizer,
    pending: Option<Pending>,
    decoder: FrameDecoder,
    shuffle: ShuffleQueue,
    options: BranchOptions,
    clock: TrackClock,
    next_checkpoint: Option<Instant>,
    start_track: u16,
    /// A prompt replaced paused music on the module, so resuming must
    /// restart the track instead of sending Resume.
    music_displaced: bool,
    outbox: Notices,
}

impl<U, B> PlayerController<U, B>
where
    U: Read + ReadReady + Write,
    B: BranchSource,
{
    /// Controller over `serial`, with no folder loaded.
    pub fn new(serial: U, branches: B, timing: PlayerTiming) -> Self {
        Self {
            serial,
            branches,
            timing,
            state: PlaybackState::new(),
            volume: Volume::new(15),
            min_volume: Volume::MIN,
            max_volume: Volume::MAX,
            equalizer: Equalizer::Normal,
            pending: None,
            decoder: FrameDecoder::new(),
            shuffle: ShuffleQueue::new(1),
            options: BranchOptions::new(),
            clock: TrackClock::default(),
            next_checkpoint: None,
            start_track: 1,
            music_displaced: false,
            outbox: Notices::new(),
        }
    }

    /// Current playback state.
    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    /// Current output volume.
    pub fn volume(&self) -> Volume {
        self.volume
    }

    /// Configured `(min, max)` volume bounds.
    pub fn volume_limits(&self) -> (Volume, Volume) {
        (self.min_volume, self.max_volume)
    }

    /// Current equalizer preset.
    pub fn equalizer(&self) -> Equalizer {
        self.equalizer
    }

    /// Tracks offered at the current branch point; empty unless a story is
    /// waiting for a choice.
    pub fn branch_options(&self) -> &[u16] {
        if self.state.transport == Transport::AwaitingChoice {
            &self.options
        } else {
            &[]
        }
    }

    /// Whether a command is waiting for its reply.
    pub fn is_busy(&self) -> bool {
        self.pending.is_some()
    }

    // ── Activity calls ──────────────────────────────────────────────────────

    /// Start `folder` in `mode` at track `start`.
    ///
    /// Asks the module for the folder's track count first; the track starts
    /// once the count arrives. Party mode ignores `start`.
    pub fn play_folder(&mut self, folder: FolderId, mode: PlaybackMode, start: u16, now: Instant) {
        if !mode.is_playable() {
            debug!("not a playable mode");
            return;
        }
        info!("play folder {} from track {}", folder.get(), start);
        self.state.seed(folder, mode);
        self.start_track = start;
        self.options.clear();
        self.shuffle.clear();
        self.clock = TrackClock::default();
        self.next_checkpoint = None;
        self.music_displaced = false;
        if mode == PlaybackMode::AudiobookResumable {
            self.state.resume = Some(ProgressMark {
                folder,
                track: start.max(1),
                elapsed_secs: 0,
            });
        }
        self.request(Command::QueryTrackCount(folder), now);
    }

    /// Next track according to the mode.
    pub fn next(&mut self, now: Instant) {
        self.next_by(1, now);
    }

    /// Skip `steps` tracks forward.
    pub fn next_by(&mut self, steps: u16, now: Instant) {
        let Some(mode) = self.loaded_mode() else {
            return;
        };
        match mode {
            PlaybackMode::Album | PlaybackMode::AudiobookResumable => self.step_forward(steps, now),
            PlaybackMode::Party => {
                let mut track = None;
                for _ in 0..steps.max(1) {
                    track = self.shuffle.advance();
                }
                if let Some(track) = track {
                    self.play_track(track, now);
                }
            }
            PlaybackMode::StoryBranching => {
                if self.state.transport != Transport::AwaitingChoice {
                    self.write(Command::Stop);
                    self.branch_point(now);
                }
            }
            PlaybackMode::SingleTrack | PlaybackMode::AdminCard => {
                debug!("next ignored for single track");
            }
        }
    }

    /// Previous track according to the mode.
    pub fn previous(&mut self, now: Instant) {
        self.previous_by(1, now);
    }

    /// Skip `steps` tracks back, never before track 1. Single-track and
    /// party playback restart the current track instead.
    pub fn previous_by(&mut self, steps: u16, now: Instant) {
        let Some(mode) = self.loaded_mode() else {
            return;
        };
        let target = match mode {
            PlaybackMode::SingleTrack | PlaybackMode::Party | PlaybackMode::AdminCard => {
                self.state.track
            }
            _ => self.state.track.saturating_sub(steps).max(1),
        };
        self.play_track(target, now);
    }

    /// Play the folder again from its first track (a new cycle in party
    /// mode).
    pub fn restart(&mut self, now: Instant) {
        let Some(mode) = self.loaded_mode() else {
            return;
        };
        let first = match mode {
            PlaybackMode::Party => self.shuffle.start(self.state.track_count, seed_from(now)),
            PlaybackMode::SingleTrack => Some(self.state.track),
            _ => Some(1),
        };
        if let Some(track) = first {
            self.play_track(track, now);
        }
    }

    /// Pause, resume, or replay after a stop.
    pub fn toggle_pause(&mut self, now: Instant) {
        match self.state.transport {
            Transport::Playing => {
                self.write(Command::Pause);
                self.state.transport = Transport::Paused;
                self.clock.pause(now);
                self.next_checkpoint = None;
                self.checkpoint(now);
            }
            Transport::Paused if self.music_displaced => {
                self.play_track(self.state.track, now);
            }
            Transport::Paused => {
                self.write(Command::Resume);
                self.state.transport = Transport::Playing;
                self.clock.resume(now);
                if self.is_audiobook() {
                    self.next_checkpoint = Some(later(now, self.timing.checkpoint_interval));
                }
            }
            Transport::Stopped => {
                if self.state.folder.is_some() && self.state.track > 0 {
                    self.play_track(self.state.track, now);
                }
            }
            Transport::AwaitingChoice => debug!("waiting for a branch choice"),
        }
    }

    /// Stop playback. An audiobook position is checkpointed first.
    pub fn stop(&mut self, now: Instant) {
        if self.state.folder.is_none() {
            return;
        }
        if self.state.transport == Transport::Playing {
            self.checkpoint(now);
        }
        self.write(Command::Stop);
        self.pending = None;
        self.halt(now);
    }

    /// Pick branch option `index` at a story branch point.
    ///
    /// Returns `false` when no choice is pending or the option does not
    /// exist.
    pub fn choose_branch(&mut self, index: usize, now: Instant) -> bool {
        if self.state.transport != Transport::AwaitingChoice {
            return false;
        }
        let Some(track) = self.options.get(index).copied() else {
            return false;
        };
        debug!("branch {} -> track {}", index, track);
        self.play_track(track, now);
        true
    }

    /// Change the volume within the configured bounds.
    ///
    /// Returns [`PlayerNotice::VolumeAtLimit`] when the change ran into a
    /// bound.
    pub fn set_volume(&mut self, change: VolumeChange) -> Option<PlayerNotice> {
        let (target, at_limit) = match change {
            VolumeChange::Up => (self.volume.step_up(), self.volume >= self.max_volume),
            VolumeChange::Down => (self.volume.step_down(), self.volume <= self.min_volume),
            VolumeChange::Set(v) => (v, v < self.min_volume || v > self.max_volume),
        };
        let clamped = target.clamp(self.min_volume, self.max_volume);
        if clamped != self.volume {
            self.volume = clamped;
            self.write(Command::SetVolume(clamped));
        }
        at_limit.then_some(PlayerNotice::VolumeAtLimit(clamped))
    }

    /// Send `volume`, clamped to the bounds, whether or not it differs
    /// from what the controller last sent.
    ///
    /// The module powers up at a volume of its own choosing, so the first
    /// volume after boot has to be written unconditionally.
    pub fn apply_volume(&mut self, volume: Volume) {
        let clamped = volume.clamp(self.min_volume, self.max_volume);
        self.volume = clamped;
        self.write(Command::SetVolume(clamped));
    }

    /// Set the volume bounds, pulling the current volume inside them.
    pub fn set_volume_limits(&mut self, min: Volume, max: Volume) {
        let (min, max) = if min <= max { (min, max) } else { (max, min) };
        self.min_volume = min;
        self.max_volume = max;
        let clamped = self.volume.clamp(min, max);
        if clamped != self.volume {
            self.volume = clamped;
            self.write(Command::SetVolume(clamped));
        }
    }

    /// Select an equalizer preset.
    pub fn set_equalizer(&mut self, equalizer: Equalizer) {
        self.equalizer = equalizer;
        self.write(Command::SetEqualizer(equalizer));
    }

    /// Speak a prompt. Over running music as an advert, otherwise from the
    /// prompt folder. Playback state is not touched.
    pub fn play_cue(&mut self, cue: Cue) {
        let track = cue.track();
        trace!("cue {}", track);
        match self.state.transport {
            Transport::Playing => self.write(Command::PlayAdvert(track)),
            Transport::Paused => {
                self.music_displaced = true;
                self.write(Command::PlayCue(track));
            }
            Transport::Stopped | Transport::AwaitingChoice => self.write(Command::PlayCue(track)),
        }
    }

    /// Ask the module whether it is playing.
    pub fn query_status(&mut self, now: Instant) {
        self.request(Command::QueryStatus, now);
    }

    // ── Replies ─────────────────────────────────────────────────────────────

    /// Drain the serial port, handle every complete reply, and enforce the
    /// reply deadline and audiobook checkpoints.
    pub fn poll(&mut self, now: Instant) -> Notices {
        let mut notices = Notices::new();
        let mut buf = [0u8; RX_CHUNK];
        for _ in 0..RX_READS_PER_POLL {
            match self.serial.read_ready() {
                Ok(true) => {}
                Ok(false) => break,
                Err(_) => {
                    warn!("serial read_ready failed");
                    break;
                }
            }
            let n = match self.serial.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(_) => {
                    warn!("serial read failed");
                    self.decoder.clear();
                    break;
                }
            };
            for byte in buf.iter().take(n) {
                if let Some(reply) = self.decoder.push(*byte) {
                    let batch = self.on_status(reply, now);
                    merge(&mut notices, batch);
                }
            }
        }

        if let Some(pending) = self.pending {
            if now >= pending.deadline {
                warn!("module did not answer {:?}", pending.command);
                self.fail_pending(now);
            }
        }

        if let Some(due) = self.next_checkpoint {
            if now >= due && self.state.transport == Transport::Playing {
                self.checkpoint(now);
                self.next_checkpoint = Some(later(due, self.timing.checkpoint_interval));
            }
        }

        let rest = core::mem::take(&mut self.outbox);
        merge(&mut notices, rest);
        notices
    }

    /// Handle one reply from the module.
    ///
    /// The returned batch also carries notices raised by earlier calls that
    /// have not been collected yet.
    pub fn on_status(&mut self, reply: StatusReply, now: Instant) -> Notices {
        trace!("module reply {:?}", reply);
        match reply {
            StatusReply::Ack => {
                if let Some(Pending {
                    command: Command::PlayTrack { .. },
                    ..
                }) = self.pending
                {
                    self.pending = None;
                    self.mark_healthy();
                    self.track_started(now);
                }
            }
            StatusReply::TrackCount(count) => self.on_track_count(count, now),
            StatusReply::Busy | StatusReply::Idle => {
                self.state.module = if reply == StatusReply::Busy {
                    ModuleStatus::Busy
                } else {
                    ModuleStatus::Idle
                };
                if let Some(Pending {
                    command: Command::QueryStatus,
                    ..
                }) = self.pending
                {
                    self.pending = None;
                    self.mark_healthy();
                }
            }
            StatusReply::Error(code) => {
                warn!("module error {}", code);
                if self.pending.is_some() {
                    self.fail_pending(now);
                }
            }
            StatusReply::TrackFinished(_) => self.on_track_finished(now),
        }
        core::mem::take(&mut self.outbox)
    }

    // ── Internals ───────────────────────────────────────────────────────────

    fn loaded_mode(&self) -> Option<PlaybackMode> {
        self.state.folder?;
        if self.state.track_count == 0 {
            return None;
        }
        self.state.mode
    }

    fn is_audiobook(&self) -> bool {
        self.state.mode == Some(PlaybackMode::AudiobookResumable)
    }

    fn on_track_count(&mut self, count: u16, now: Instant) {
        let Some(Pending {
            command: Command::QueryTrackCount(folder),
            ..
        }) = self.pending
        else {
            debug!("unsolicited track count");
            return;
        };
        self.pending = None;
        self.mark_healthy();
        if self.state.folder != Some(folder) {
            return;
        }
        self.state.track_count = count;
        let start = self.start_track;
        let in_range = (1..=count).contains(&start);
        let first = match self.state.mode {
            Some(PlaybackMode::Party) => self.shuffle.start(count, seed_from(now)),
            Some(PlaybackMode::SingleTrack) => in_range.then_some(start),
            Some(_) if count > 0 => Some(if in_range { start } else { 1 }),
            _ => None,
        };
        match first {
            Some(track) => self.play_track(track, now),
            None => {
                warn!("folder {} has no track {}", folder.get(), start);
                self.state.transport = Transport::Stopped;
                self.push(PlayerNotice::EmptyFolder(folder));
            }
        }
    }

    fn on_track_finished(&mut self, now: Instant) {
        if self.pending.is_some() || self.state.transport != Transport::Playing {
            debug!("ignoring track-finished");
            return;
        }
        self.state.module = ModuleStatus::Idle;
        match self.state.mode {
            Some(PlaybackMode::Album | PlaybackMode::AudiobookResumable) => {
                self.step_forward(1, now);
            }
            Some(PlaybackMode::Party) => match self.shuffle.advance() {
                Some(track) => self.play_track(track, now),
                None => self.finish(now),
            },
            Some(PlaybackMode::StoryBranching) => self.branch_point(now),
            _ => self.finish(now),
        }
    }

    fn step_forward(&mut self, steps: u16, now: Instant) {
        let target = self.state.track.saturating_add(steps);
        if target <= self.state.track_count {
            self.play_track(target, now);
        } else {
            if self.is_audiobook() {
                // Book done: the next scan starts over.
                self.record_progress(1, 0);
            }
            self.finish(now);
        }
    }

    fn branch_point(&mut self, now: Instant) {
        let Some(folder) = self.state.folder else {
            return;
        };
        let options = self
            .branches
            .options(folder, self.state.track, self.state.track_count);
        if options.is_empty() {
            self.finish(now);
            return;
        }
        let count = u8::try_from(options.len()).unwrap_or(u8::MAX);
        self.options = options;
        self.halt(now);
        self.state.transport = Transport::AwaitingChoice;
        self.push(PlayerNotice::BranchPoint(count));
    }

    fn play_track(&mut self, track: u16, now: Instant) {
        let Some(folder) = self.state.folder else {
            return;
        };
        let Ok(wire) = u8::try_from(track) else {
            warn!("track {} beyond module range", track);
            return;
        };
        if wire == 0 {
            return;
        }
        self.state.track = track;
        self.state.transport = Transport::Playing;
        self.options.clear();
        self.music_displaced = false;
        self.clock.start(now, Duration::from_ticks(0));
        self.next_checkpoint = None;
        self.request(Command::PlayTrack { folder, track: wire }, now);
    }

    fn track_started(&mut self, now: Instant) {
        let Some(folder) = self.state.folder else {
            return;
        };
        self.state.module = ModuleStatus::Busy;
        self.push(PlayerNotice::TrackStarted {
            folder,
            track: self.state.track,
        });
        if self.is_audiobook() {
            self.record_progress(self.state.track, 0);
            self.next_checkpoint = Some(later(now, self.timing.checkpoint_interval));
        }
    }

    fn finish(&mut self, now: Instant) {
        self.write(Command::Stop);
        self.halt(now);
        self.push(PlayerNotice::Finished);
    }

    fn halt(&mut self, now: Instant) {
        self.state.transport = Transport::Stopped;
        self.clock.pause(now);
        self.next_checkpoint = None;
    }

    fn checkpoint(&mut self, now: Instant) {
        if self.is_audiobook() && self.state.track > 0 {
            let elapsed = self.clock.elapsed_secs(now);
            self.record_progress(self.state.track, elapsed);
        }
    }

    fn record_progress(&mut self, track: u16, elapsed_secs: u16) {
        let Some(folder) = self.state.folder else {
            return;
        };
        let mark = ProgressMark {
            folder,
            track,
            elapsed_secs,
        };
        self.state.resume = Some(mark);
        self.push(PlayerNotice::Progress(mark));
    }

    fn fail_pending(&mut self, now: Instant) {
        let Some(pending) = self.pending.take() else {
            return;
        };
        if !pending.retried {
            if self.state.fault == FaultState::Healthy {
                self.state.fault = FaultState::Retrying;
            }
            debug!("retrying {:?}", pending.command);
            self.write(pending.command);
            self.pending = Some(Pending {
                command: pending.command,
                deadline: later(now, self.timing.reply_timeout),
                retried: true,
            });
            return;
        }
        self.halt(now);
        if self.state.fault != FaultState::Faulted {
            error!("audio module fault");
            self.state.fault = FaultState::Faulted;
            self.push(PlayerNotice::ModuleFault);
        }
    }

    fn mark_healthy(&mut self) {
        if self.state.fault == FaultState::Faulted {
            info!("audio module recovered");
            self.push(PlayerNotice::Recovered);
        }
        self.state.fault = FaultState::Healthy;
    }

    fn request(&mut self, command: Command, now: Instant) {
        self.write(command);
        self.pending = Some(Pending {
            command,
            deadline: later(now, self.timing.reply_timeout),
            retried: false,
        });
    }

    fn write(&mut self, command: Command) {
        trace!("module command {:?}", command);
        if self.serial.write_all(&command.encode()).is_err() {
            warn!("serial write failed");
        }
    }

    fn push(&mut self, notice: PlayerNotice) {
        if self.outbox.push(notice).is_err() {
            warn!("notice queue full, dropping");
        }
    }
}
