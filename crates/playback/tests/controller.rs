//! Player controller driven through a mock serial port, with the test
//! playing the part of the audio module.

#![allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::arithmetic_side_effects)]

use embassy_time::Instant;
use keycard::PlaybackMode;
use platform::mocks::MockSerial;
use platform::{FolderId, Volume};
use playback::{
    BranchOptions, BranchSource, Command, Cue, FaultState, PlayerController, PlayerNotice,
    PlayerTiming, ProgressMark, SequentialBranches, StatusReply, Transport, VolumeChange,
    FRAME_LEN,
};

struct Rig<B: BranchSource> {
    serial: MockSerial,
    player: PlayerController<MockSerial, B>,
    now: u64,
}

fn rig() -> Rig<SequentialBranches> {
    rig_with(SequentialBranches)
}

fn rig_with<B: BranchSource>(branches: B) -> Rig<B> {
    let serial = MockSerial::new();
    let player = PlayerController::new(serial.clone(), branches, PlayerTiming::default());
    Rig {
        serial,
        player,
        now: 0,
    }
}

fn folder(n: u8) -> FolderId {
    FolderId::try_new(n).unwrap()
}

fn play(folder_no: u8, track: u8) -> [u8; FRAME_LEN] {
    Command::PlayTrack {
        folder: folder(folder_no),
        track,
    }
    .encode()
}

impl<B: BranchSource> Rig<B> {
    fn at(&self) -> Instant {
        Instant::from_millis(self.now)
    }

    /// Advance the clock and poll once.
    fn poll_after(&mut self, ms: u64) -> Vec<PlayerNotice> {
        self.now += ms;
        self.player.poll(self.at()).into_iter().collect()
    }

    /// Module sends `reply`; the controller sees it on the next tick.
    fn reply(&mut self, reply: StatusReply) -> Vec<PlayerNotice> {
        self.serial.push_rx(&reply.encode());
        self.poll_after(10)
    }

    /// Every frame written since the last call.
    fn frames(&self) -> Vec<[u8; FRAME_LEN]> {
        self.serial
            .take_tx()
            .chunks(FRAME_LEN)
            .map(|c| c.try_into().unwrap())
            .collect()
    }

    /// Start `folder` and answer the track-count query.
    fn start(&mut self, folder_no: u8, mode: PlaybackMode, start: u16, count: u16) -> Vec<PlayerNotice> {
        self.player.play_folder(folder(folder_no), mode, start, self.at());
        self.reply(StatusReply::TrackCount(count))
    }

    /// Acknowledge the pending play command and let the track end.
    fn ack_and_finish(&mut self) -> Vec<PlayerNotice> {
        let mut notices = self.reply(StatusReply::Ack);
        notices.extend(self.reply(StatusReply::TrackFinished(0)));
        notices
    }
}

// ---- Album -----------------------------------------------------------------

#[test]
fn album_advances_through_every_track_and_stops_without_wrapping() {
    let mut rig = rig();
    rig.start(3, PlaybackMode::Album, 1, 4);
    assert_eq!(rig.frames().last(), Some(&play(3, 1)));

    for expected in 2..=4u8 {
        rig.ack_and_finish();
        assert_eq!(rig.player.state().track(), u16::from(expected));
        assert_eq!(rig.frames().last(), Some(&play(3, expected)));
    }

    let notices = rig.ack_and_finish();
    assert!(notices.contains(&PlayerNotice::Finished));
    assert_eq!(rig.player.state().transport(), Transport::Stopped);
    assert_eq!(rig.player.state().track(), 4);
    let frames = rig.frames();
    assert!(!frames.iter().any(|f| f[3] == 0x0F), "no wrap to track 1");
    assert_eq!(frames.last(), Some(&Command::Stop.encode()));
}

#[test]
fn ack_reports_track_start() {
    let mut rig = rig();
    rig.start(3, PlaybackMode::Album, 2, 4);
    let notices = rig.reply(StatusReply::Ack);
    assert_eq!(
        notices,
        vec![PlayerNotice::TrackStarted {
            folder: folder(3),
            track: 2
        }]
    );
}

#[test]
fn duplicate_track_finished_is_ignored() {
    let mut rig = rig();
    rig.start(1, PlaybackMode::Album, 1, 5);
    rig.reply(StatusReply::Ack);
    let mut bytes = StatusReply::TrackFinished(1).encode().to_vec();
    bytes.extend_from_slice(&StatusReply::TrackFinished(1).encode());
    rig.serial.push_rx(&bytes);
    rig.poll_after(10);
    assert_eq!(rig.player.state().track(), 2);
}

#[test]
fn previous_never_goes_below_first_track() {
    let mut rig = rig();
    rig.start(1, PlaybackMode::Album, 2, 5);
    rig.reply(StatusReply::Ack);
    rig.player.previous_by(3, rig.at());
    assert_eq!(rig.player.state().track(), 1);
}

#[test]
fn next_by_skips_several_tracks() {
    let mut rig = rig();
    rig.start(1, PlaybackMode::Album, 1, 9);
    rig.reply(StatusReply::Ack);
    rig.player.next_by(3, rig.at());
    assert_eq!(rig.player.state().track(), 4);
}

// ---- Single track ----------------------------------------------------------

#[test]
fn single_track_plays_its_track_then_stops() {
    let mut rig = rig();
    rig.start(2, PlaybackMode::SingleTrack, 4, 10);
    assert_eq!(rig.frames().last(), Some(&play(2, 4)));
    let notices = rig.ack_and_finish();
    assert!(notices.contains(&PlayerNotice::Finished));
    assert_eq!(rig.player.state().transport(), Transport::Stopped);
}

#[test]
fn single_track_beyond_folder_is_reported() {
    let mut rig = rig();
    let notices = rig.start(2, PlaybackMode::SingleTrack, 11, 10);
    assert_eq!(notices, vec![PlayerNotice::EmptyFolder(folder(2))]);
}

#[test]
fn empty_folder_is_reported() {
    let mut rig = rig();
    let notices = rig.start(7, PlaybackMode::Album, 1, 0);
    assert_eq!(notices, vec![PlayerNotice::EmptyFolder(folder(7))]);
    assert_eq!(rig.player.state().transport(), Transport::Stopped);
}

// ---- Party -----------------------------------------------------------------

#[test]
fn party_plays_every_track_once_per_cycle() {
    const TRACKS: usize = 6;
    let mut rig = rig();
    rig.start(4, PlaybackMode::Party, 1, TRACKS as u16);
    let mut played = vec![rig.player.state().track()];
    for _ in 0..(TRACKS * 5 - 1) {
        rig.ack_and_finish();
        played.push(rig.player.state().track());
    }
    for cycle in played.chunks(TRACKS) {
        let mut sorted = cycle.to_vec();
        sorted.sort_unstable();
        assert_eq!(sorted, (1..=TRACKS as u16).collect::<Vec<_>>(), "cycle {cycle:?}");
    }
    for pair in played.windows(2) {
        assert_ne!(pair[0], pair[1]);
    }
}

// ---- Audiobook -------------------------------------------------------------

#[test]
fn audiobook_checkpoints_position() {
    let mut rig = rig();
    rig.start(5, PlaybackMode::AudiobookResumable, 3, 10);
    let notices = rig.reply(StatusReply::Ack);
    let mark = |track, elapsed_secs| {
        PlayerNotice::Progress(ProgressMark {
            folder: folder(5),
            track,
            elapsed_secs,
        })
    };
    assert!(notices.contains(&mark(3, 0)));

    // Track clock started when play was sent, 10 ms before the ack.
    let notices = rig.poll_after(30_000);
    assert_eq!(notices, vec![mark(3, 30)]);

    rig.now += 15_000;
    rig.player.toggle_pause(rig.at());
    let notices = rig.poll_after(0);
    assert_eq!(notices, vec![mark(3, 45)]);
    assert_eq!(rig.player.state().resume_point().map(|m| m.elapsed_secs), Some(45));

    // No checkpoints while paused.
    assert!(rig.poll_after(60_000).is_empty());
}

#[test]
fn finished_audiobook_resets_progress_to_first_track() {
    let mut rig = rig();
    rig.start(5, PlaybackMode::AudiobookResumable, 2, 2);
    let notices = rig.ack_and_finish();
    assert!(notices.contains(&PlayerNotice::Progress(ProgressMark {
        folder: folder(5),
        track: 1,
        elapsed_secs: 0,
    })));
    assert!(notices.contains(&PlayerNotice::Finished));
}

#[test]
fn audiobook_start_beyond_folder_restarts_book() {
    let mut rig = rig();
    rig.start(5, PlaybackMode::AudiobookResumable, 40, 12);
    assert_eq!(rig.player.state().track(), 1);
}

// ---- Story -----------------------------------------------------------------

struct Fork;

impl BranchSource for Fork {
    fn options(&self, _folder: FolderId, track: u16, _count: u16) -> BranchOptions {
        let mut options = BranchOptions::new();
        if track == 1 {
            options.extend_from_slice(&[5, 7]).unwrap();
        }
        options
    }
}

#[test]
fn story_waits_for_a_choice_at_branch_points() {
    let mut rig = rig_with(Fork);
    rig.start(8, PlaybackMode::StoryBranching, 1, 9);
    let notices = rig.ack_and_finish();
    assert!(notices.contains(&PlayerNotice::BranchPoint(2)));
    assert_eq!(rig.player.state().transport(), Transport::AwaitingChoice);
    assert_eq!(rig.player.branch_options(), &[5, 7]);

    assert!(!rig.player.choose_branch(2, rig.at()));
    assert!(rig.player.choose_branch(1, rig.at()));
    assert_eq!(rig.player.state().track(), 7);
    assert_eq!(rig.frames().last(), Some(&play(8, 7)));

    // Track 7 offers nothing: the story ends.
    let notices = rig.ack_and_finish();
    assert!(notices.contains(&PlayerNotice::Finished));
}

#[test]
fn sequential_story_offers_next_track() {
    let mut rig = rig();
    rig.start(8, PlaybackMode::StoryBranching, 1, 3);
    rig.ack_and_finish();
    assert_eq!(rig.player.branch_options(), &[2]);
}

// ---- Module faults ---------------------------------------------------------

#[test]
fn silent_module_gets_one_retry_then_one_fault() {
    let mut rig = rig();
    rig.player.play_folder(folder(3), PlaybackMode::Album, 1, rig.at());
    let query = Command::QueryTrackCount(folder(3)).encode();

    assert!(rig.poll_after(500).is_empty());
    assert!(rig.poll_after(500).is_empty());
    assert_eq!(rig.player.state().fault(), FaultState::Retrying);

    assert_eq!(rig.poll_after(1000), vec![PlayerNotice::ModuleFault]);
    assert_eq!(rig.player.state().fault(), FaultState::Faulted);
    assert_eq!(rig.player.state().transport(), Transport::Stopped);

    for _ in 0..5 {
        assert!(rig.poll_after(1000).is_empty());
    }
    let frames = rig.frames();
    assert_eq!(frames.iter().filter(|f| **f == query).count(), 2);
}

#[test]
fn next_reply_after_fault_recovers() {
    let mut rig = rig();
    rig.player.play_folder(folder(3), PlaybackMode::Album, 1, rig.at());
    rig.poll_after(1000);
    rig.poll_after(1000);
    assert_eq!(rig.player.state().fault(), FaultState::Faulted);

    let notices = rig.start(3, PlaybackMode::Album, 1, 4);
    assert_eq!(notices, vec![PlayerNotice::Recovered]);
    assert_eq!(rig.player.state().fault(), FaultState::Healthy);
    assert_eq!(rig.player.state().transport(), Transport::Playing);
}

#[test]
fn error_reply_counts_as_failed_attempt() {
    let mut rig = rig();
    rig.start(3, PlaybackMode::Album, 1, 4);
    rig.frames();
    rig.reply(StatusReply::Error(6));
    assert_eq!(rig.frames(), vec![play(3, 1)]);
    let notices = rig.reply(StatusReply::Error(6));
    assert_eq!(notices, vec![PlayerNotice::ModuleFault]);
}

#[test]
fn garbage_on_the_line_is_skipped() {
    let mut rig = rig();
    rig.player.play_folder(folder(3), PlaybackMode::Album, 1, rig.at());
    let mut bytes = vec![0x7E, 0x00, 0x55, 0xEF];
    bytes.extend_from_slice(&StatusReply::TrackCount(4).encode());
    rig.serial.push_rx(&bytes);
    rig.poll_after(10);
    assert_eq!(rig.player.state().track_count(), 4);
}

// ---- Volume, cues ----------------------------------------------------------

#[test]
fn volume_is_held_inside_limits() {
    let mut rig = rig();
    rig.player.set_volume_limits(Volume::new(5), Volume::new(20));
    assert_eq!(
        rig.player.set_volume(VolumeChange::Set(Volume::new(25))),
        Some(PlayerNotice::VolumeAtLimit(Volume::new(20)))
    );
    assert_eq!(rig.player.volume(), Volume::new(20));
    assert_eq!(
        rig.player.set_volume(VolumeChange::Up),
        Some(PlayerNotice::VolumeAtLimit(Volume::new(20)))
    );
    assert_eq!(rig.player.set_volume(VolumeChange::Down), None);
    assert_eq!(rig.player.volume(), Volume::new(19));
    assert_eq!(
        rig.frames().last(),
        Some(&Command::SetVolume(Volume::new(19)).encode())
    );
}

#[test]
fn applied_volume_is_written_even_when_unchanged() {
    let mut rig = rig();
    rig.player.set_volume_limits(Volume::new(5), Volume::new(25));
    let current = rig.player.volume();
    rig.frames();

    rig.player.apply_volume(current);
    assert_eq!(rig.frames(), vec![Command::SetVolume(current).encode()]);

    rig.player.apply_volume(Volume::new(30));
    assert_eq!(rig.frames(), vec![Command::SetVolume(Volume::new(25)).encode()]);
    assert_eq!(rig.player.volume(), Volume::new(25));
}

#[test]
fn cues_leave_playback_state_alone() {
    let mut rig = rig();
    rig.start(3, PlaybackMode::Album, 1, 4);
    rig.reply(StatusReply::Ack);
    rig.frames();
    let before = rig.player.state().clone();

    rig.player.play_cue(Cue::VolumeLimit);
    assert_eq!(rig.frames(), vec![Command::PlayAdvert(401).encode()]);
    assert_eq!(rig.player.state(), &before);

    rig.player.stop(rig.at());
    rig.frames();
    rig.player.play_cue(Cue::Saved);
    assert_eq!(rig.frames(), vec![Command::PlayCue(411).encode()]);
}

#[test]
fn resuming_after_a_prompt_replays_the_track() {
    let mut rig = rig();
    rig.start(3, PlaybackMode::Album, 2, 4);
    rig.reply(StatusReply::Ack);
    rig.player.toggle_pause(rig.at());
    rig.player.play_cue(Cue::Locked);
    rig.frames();
    rig.player.toggle_pause(rig.at());
    assert_eq!(rig.frames(), vec![play(3, 2)]);
}

#[test]
fn plain_pause_resumes_in_place() {
    let mut rig = rig();
    rig.start(3, PlaybackMode::Album, 2, 4);
    rig.reply(StatusReply::Ack);
    rig.player.toggle_pause(rig.at());
    assert_eq!(rig.player.state().transport(), Transport::Paused);
    rig.player.toggle_pause(rig.at());
    assert_eq!(
        rig.frames()[2..].to_vec(),
        vec![Command::Pause.encode(), Command::Resume.encode()]
    );
    assert_eq!(rig.player.state().transport(), Transport::Playing);
}
