//! The whole control loop on host mocks, driven by raw button levels the
//! way the 10 ms ticker drives it on the board.

#![allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::arithmetic_side_effects)]

use activity::{Board, Step};
use embassy_time::Instant;
use firmware::{App, AppConfig, AppSignal, Parts};
use keycard::{CardRecord, PlaybackMode};
use platform::mocks::{MockCardReader, MockEeprom, MockSerial};
use platform::{Button, ButtonLevels, ButtonSet, CardUid, Equalizer, FolderId, Volume};
use playback::{Command, SequentialBranches, StatusReply, Transport, FRAME_LEN};
use settings::SettingsStore;

struct Host;

impl Board for Host {
    type Serial = MockSerial;
    type Branches = SequentialBranches;
    type Nvs = MockEeprom;
    type Reader = MockCardReader;
}

struct Bench {
    serial: MockSerial,
    cards: MockCardReader,
    app: App<Host>,
    now: u64,
}

fn bench_with(nvs: MockEeprom) -> Bench {
    let serial = MockSerial::new();
    let cards = MockCardReader::new();
    let parts = Parts::<Host> {
        serial: serial.clone(),
        branches: SequentialBranches,
        nvs,
        reader: cards.clone(),
    };
    let app = App::boot(parts, AppConfig::default(), Instant::from_millis(0));
    Bench {
        serial,
        cards,
        app,
        now: 0,
    }
}

fn bench() -> Bench {
    let b = bench_with(MockEeprom::new());
    b.serial.push_rx(&StatusReply::Idle.encode());
    b
}

fn levels(buttons: &[Button]) -> ButtonLevels {
    ButtonLevels::from_set(ButtonSet::of(buttons))
}

impl Bench {
    /// Run ticks for `ms` with `held` down, then return the last signal.
    fn hold(&mut self, held: &[Button], ms: u64) -> AppSignal {
        let mut signal = AppSignal::Running;
        let end = self.now + ms;
        while self.now < end {
            self.now += 10;
            signal = self.app.tick(Instant::from_millis(self.now), levels(held));
        }
        signal
    }

    fn idle(&mut self, ms: u64) -> AppSignal {
        self.hold(&[], ms)
    }

    fn tick_at(&mut self, ms: u64) -> AppSignal {
        self.now = ms;
        self.app.tick(Instant::from_millis(ms), ButtonLevels::RELEASED)
    }

    fn frames(&self) -> Vec<[u8; FRAME_LEN]> {
        self.serial
            .take_tx()
            .chunks(FRAME_LEN)
            .map(|c| c.try_into().unwrap())
            .collect()
    }

    fn step(&self) -> Option<Step> {
        match self.app.stack().current() {
            Some(activity::Activity::Config(config)) => Some(config.step()),
            _ => None,
        }
    }
}

#[test]
fn boot_configures_the_module_from_stored_settings() {
    let nvs = MockEeprom::new();
    SettingsStore::open(nvs.clone())
        .commit(|s| {
            s.initial_volume = Volume::new(20);
            s.equalizer = Equalizer::Jazz;
        })
        .unwrap();

    let b = bench_with(nvs);
    let frames = b.frames();
    assert!(frames.contains(&Command::SetVolume(Volume::new(20)).encode()));
    assert!(frames.contains(&Command::SetEqualizer(Equalizer::Jazz).encode()));
    assert_eq!(frames.last(), Some(&Command::QueryStatus.encode()));
    assert_eq!(b.app.player().volume(), Volume::new(20));
    assert_eq!(b.app.store().settings().equalizer, Equalizer::Jazz);
}

#[test]
fn boot_on_blank_storage_still_sends_the_initial_volume() {
    let b = bench_with(MockEeprom::new());
    let initial = settings::AdminSettings::default().initial_volume;
    let volume_frames = b
        .frames()
        .into_iter()
        .filter(|f| f[3] == Command::SetVolume(initial).encode()[3])
        .collect::<Vec<_>>();
    assert_eq!(volume_frames, vec![Command::SetVolume(initial).encode()]);
}

#[test]
fn holding_all_three_opens_config_and_long_play_pause_leaves() {
    let mut b = bench();
    b.idle(50);

    b.hold(&Button::ALL, 300);
    assert!(b.app.stack().in_config());
    b.idle(100);

    b.hold(&[Button::PlayPause], 1_200);
    assert!(!b.app.stack().in_config());
}

#[test]
fn buttons_held_through_a_switch_stay_silent() {
    let mut b = bench();
    b.idle(50);

    // Still holding the combo well past the long-press threshold: no
    // member may turn into a long press or a volume repeat afterwards.
    b.hold(&Button::ALL, 2_000);
    assert!(b.app.stack().in_config());
    assert!(matches!(b.step(), Some(Step::Menu(_))));
    let volume = b.app.player().volume();
    b.idle(100);
    assert!(b.app.stack().in_config());
    assert_eq!(b.app.player().volume(), volume);
}

#[test]
fn tapped_card_starts_its_folder() {
    let mut b = bench();
    let uid = CardUid::from_slice(&[0xA1, 0xB2, 0xC3, 0xD4]);
    let folder = FolderId::try_new(7).unwrap();
    b.cards
        .add_card(uid, &keycard::encode(&CardRecord::new(folder, PlaybackMode::Album, 0)));
    b.idle(20);
    b.frames();

    b.cards.tap(uid);
    b.idle(10);
    assert_eq!(b.frames(), vec![Command::QueryTrackCount(folder).encode()]);

    b.serial.push_rx(&StatusReply::TrackCount(5).encode());
    b.idle(10);
    b.serial.push_rx(&StatusReply::Ack.encode());
    b.idle(10);
    assert_eq!(b.app.player().state().transport(), Transport::Playing);
    assert_eq!(b.app.player().state().folder(), Some(folder));
}

#[test]
fn standby_is_signalled_after_the_idle_period() {
    let mut b = bench();
    assert_eq!(b.tick_at(10), AppSignal::Running);
    assert_eq!(b.tick_at(300_000), AppSignal::Running);
    assert_eq!(b.tick_at(600_020), AppSignal::Standby);
    assert_eq!(b.tick_at(600_030), AppSignal::Running);
}

#[test]
fn short_press_never_reaches_playback_while_configuring() {
    let mut b = bench();
    b.idle(50);
    b.hold(&Button::ALL, 300);
    b.idle(100);
    b.frames();

    b.hold(&[Button::Next], 60);
    b.idle(400);
    assert_eq!(b.step(), Some(Step::Menu(activity::MenuItem::ResetCard)));
    assert_eq!(b.app.player().state().transport(), Transport::Stopped);
}
