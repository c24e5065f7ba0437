//! Scripted Session
//!
//! Runs the control loop on the host mocks with a simulated audio module,
//! then plays a short script: a card is paired, tapped, skipped through and
//! finally the box is left alone until it goes to standby.
//! Run with: RUST_LOG=debug cargo run --example scripted_session --features emulator

#![allow(clippy::indexing_slicing)]

use activity::Board;
use embassy_time::Instant;
use firmware::{App, AppConfig, AppSignal, Parts};
use keycard::{CardRecord, PlaybackMode};
use platform::mocks::{MockCardReader, MockEeprom, MockSerial};
use platform::{Button, ButtonLevels, ButtonSet, CardUid, FolderId};
use playback::{SequentialBranches, StatusReply, FRAME_LEN};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

struct Emulated;

impl Board for Emulated {
    type Serial = MockSerial;
    type Branches = SequentialBranches;
    type Nvs = MockEeprom;
    type Reader = MockCardReader;
}

/// Audio module stand-in: answers queries and plays every track for a
/// fixed time.
struct ModuleSim {
    serial: MockSerial,
    tracks_per_folder: u16,
    track_ms: u64,
    playing: Option<(u16, u64)>,
}

impl ModuleSim {
    fn step(&mut self, now: u64) {
        let tx = self.serial.take_tx();
        for frame in tx.chunks_exact(FRAME_LEN) {
            let (code, hi, lo) = (frame[3], frame[5], frame[6]);
            let reply = match code {
                0x4E => Some(StatusReply::TrackCount(self.tracks_per_folder)),
                0x42 if self.playing.is_some() => Some(StatusReply::Busy),
                0x42 => Some(StatusReply::Idle),
                0x0F => {
                    tracing::info!(folder = hi, track = lo, "module: playing");
                    self.playing = Some((u16::from(lo), now));
                    Some(StatusReply::Ack)
                }
                0x16 | 0x0E => {
                    self.playing = None;
                    None
                }
                _ => None,
            };
            if let Some(reply) = reply {
                self.serial.push_rx(&reply.encode());
            }
        }
        if let Some((track, started)) = self.playing {
            if now.saturating_sub(started) >= self.track_ms {
                self.playing = None;
                self.serial.push_rx(&StatusReply::TrackFinished(track).encode());
            }
        }
    }
}

struct Session {
    app: App<Emulated>,
    module: ModuleSim,
    cards: MockCardReader,
    now: u64,
}

impl Session {
    async fn run(&mut self, held: &[Button], ms: u64) -> AppSignal {
        let levels = ButtonLevels::from_set(ButtonSet::of(held));
        let end = self.now.saturating_add(ms);
        let mut signal = AppSignal::Running;
        while self.now < end {
            tokio::task::yield_now().await;
            self.now = self.now.saturating_add(10);
            self.module.step(self.now);
            if self.app.tick(Instant::from_millis(self.now), levels) == AppSignal::Standby {
                signal = AppSignal::Standby;
            }
        }
        signal
    }

    async fn press(&mut self, button: Button) {
        self.run(&[button], 80).await;
        self.run(&[], 400).await;
    }

    async fn tap(&mut self, uid: CardUid) {
        self.cards.remove();
        self.cards.tap(uid);
        self.run(&[], 50).await;
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .init();

    let serial = MockSerial::new();
    let cards = MockCardReader::new();
    let parts = Parts::<Emulated> {
        serial: serial.clone(),
        branches: SequentialBranches,
        nvs: MockEeprom::new(),
        reader: cards.clone(),
    };
    let mut session = Session {
        app: App::boot(parts, AppConfig::default(), Instant::from_millis(0)),
        module: ModuleSim {
            serial,
            tracks_per_folder: 4,
            track_ms: 3_000,
            playing: None,
        },
        cards,
        now: 0,
    };
    session.run(&[], 100).await;

    tracing::info!("script: pair a blank card with folder 2, album mode");
    let card = CardUid::from_slice(&[0x04, 0x7A, 0x11, 0xC2]);
    session.cards.add_card(card, &keycard::blank());
    session.run(&Button::ALL, 300).await;
    session.run(&[], 200).await;
    session.press(Button::PlayPause).await; // Pair card
    session.press(Button::Next).await; // folder 2
    session.press(Button::PlayPause).await;
    session.press(Button::PlayPause).await; // Album
    session.tap(card).await;

    let folder = FolderId::try_new(2).map_err(|_| "folder out of range")?;
    let expected = CardRecord::new(folder, PlaybackMode::Album, 0);
    let written = session.cards.block_of(&card).map(|b| keycard::decode(&b));
    tracing::info!(ok = matches!(written, Some(Ok(r)) if r == expected), "card written");

    tracing::info!("script: tap the card and skip ahead");
    session.tap(card).await;
    session.run(&[], 4_000).await;
    session.press(Button::Next).await;
    session.run(&[], 7_000).await;
    tracing::info!(state = ?session.app.player().state(), "after the album");

    tracing::info!("script: leave the box alone");
    let mut minutes = 0u32;
    while session.run(&[], 60_000).await == AppSignal::Running {
        minutes = minutes.saturating_add(1);
        if minutes > 15 {
            tracing::warn!("no standby after {} minutes", minutes);
            break;
        }
    }
    tracing::info!(minutes, "session finished");
    Ok(())
}
