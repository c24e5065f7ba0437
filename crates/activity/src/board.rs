//! The seam between activities and the board.

use embassy_time::{Duration, Instant};
use embedded_io::{Read, ReadReady, Write};
use embedded_storage::Storage;
use platform::CardReader;
use playback::{BranchSource, Cue, PlayerController, PlayerNotice};
use settings::{Progress, SettingsStore, StorageFault};

/// Concrete collaborators of one board (or of a host test).
pub trait Board {
    /// Audio module serial port.
    type Serial: Read + ReadReady + Write;
    /// Story branch structure.
    type Branches: BranchSource;
    /// Non-volatile storage.
    type Nvs: Storage;
    /// RFID reader.
    type Reader: CardReader;
}

/// Player type of a board.
pub type Player<B> = PlayerController<<B as Board>::Serial, <B as Board>::Branches>;

/// Everything an activity may touch during its turn.
pub struct Ctx<'a, B: Board> {
    /// Time of the current tick.
    pub now: Instant,
    /// The audio player.
    pub player: &'a mut Player<B>,
    /// Settings and progress storage.
    pub store: &'a mut SettingsStore<B::Nvs>,
    /// The RFID reader, for writing cards in config mode.
    pub reader: &'a mut B::Reader,
}

/// Activity timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ActivityTiming {
    /// Config mode closes after this long without input.
    pub config_timeout: Duration,
    /// How long a scanned admin card stays armed.
    pub admin_arm_window: Duration,
}

impl Default for ActivityTiming {
    fn default() -> Self {
        Self {
            config_timeout: Duration::from_secs(60),
            admin_arm_window: Duration::from_secs(10),
        }
    }
}

pub(crate) fn later(t: Instant, d: Duration) -> Instant {
    t.checked_add(d).unwrap_or(Instant::MAX)
}

/// Cue the outcome of a settings write.
pub(crate) fn cue_saved<B: Board, T>(ctx: &mut Ctx<'_, B>, result: &Result<T, StorageFault>, ok: Cue) {
    match result {
        Ok(_) => ctx.player.play_cue(ok),
        Err(_) => ctx.player.play_cue(Cue::StorageFault),
    }
}

/// Player notices every activity handles the same way.
pub(crate) fn handle_common_notice<B: Board>(ctx: &mut Ctx<'_, B>, notice: PlayerNotice) {
    match notice {
        PlayerNotice::Progress(mark) => {
            let progress = Progress {
                track: mark.track,
                elapsed_secs: mark.elapsed_secs,
            };
            if let Err(e) = ctx.store.save_progress(mark.folder, progress) {
                warn!("progress not saved: {}", e);
            }
        }
        PlayerNotice::ModuleFault => ctx.player.play_cue(Cue::ModuleFault),
        PlayerNotice::EmptyFolder(folder) => {
            info!("folder {} is empty", folder.get());
            ctx.player.play_cue(Cue::EmptyFolder);
        }
        PlayerNotice::TrackStarted { folder, track } => {
            debug!("playing {}/{}", folder.get(), track);
        }
        PlayerNotice::Finished
        | PlayerNotice::Recovered
        | PlayerNotice::BranchPoint(_)
        | PlayerNotice::VolumeAtLimit(_) => {}
    }
}
