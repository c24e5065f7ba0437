//! Normal operation: cards start playback, buttons drive the transport.

use embassy_time::{Duration, Instant};
use keycard::{AdminAction, PlaybackMode};
use platform::{Button, ButtonEvent, ButtonSet, CardTap, FolderId};
use playback::{option_for_button, Cue, PlayerNotice, Transport, VolumeChange};

use crate::board::{handle_common_notice, later, ActivityTiming, Board, Ctx};
use crate::config::ConfigActivity;
use crate::stack::{Activity, Transition};

/// Buttons that open config mode together.
pub const ADMIN_COMBO: ButtonSet = ButtonSet::ALL;

/// The root activity.
#[derive(Debug)]
pub struct DefaultActivity {
    timing: ActivityTiming,
    armed: Option<(AdminAction, Instant)>,
    idle_since: Option<Instant>,
    standby_sent: bool,
    limit_cued: bool,
}

impl DefaultActivity {
    /// Fresh activity with nothing armed.
    pub fn new(timing: ActivityTiming) -> Self {
        Self {
            timing,
            armed: None,
            idle_since: None,
            standby_sent: false,
            limit_cued: false,
        }
    }

    /// Admin action waiting for the combo, if still inside its window.
    pub fn armed(&self, now: Instant) -> Option<AdminAction> {
        self.armed
            .filter(|(_, deadline)| now < *deadline)
            .map(|(action, _)| action)
    }

    pub(crate) fn on_button<B: Board>(
        &mut self,
        ctx: &mut Ctx<'_, B>,
        event: ButtonEvent,
    ) -> Transition {
        self.touch(ctx.now);

        if let ButtonEvent::Combo(set) = event {
            if set != ADMIN_COMBO {
                trace!("combo ignored");
                return Transition::Stay;
            }
            let action = self.armed(ctx.now).unwrap_or(AdminAction::OpenMenu);
            self.armed = None;
            ctx.player.play_cue(Cue::ConfigEntered);
            let config = ConfigActivity::enter(ctx, self.timing, action);
            return Transition::Push(Activity::Config(config));
        }

        if ctx.player.state().transport() == Transport::AwaitingChoice {
            if let ButtonEvent::ShortPress(button) = event {
                if !ctx.player.choose_branch(option_for_button(button), ctx.now) {
                    debug!("no branch behind that button");
                }
                return Transition::Stay;
            }
        }

        let now = ctx.now;
        match event {
            ButtonEvent::ShortPress(Button::PlayPause) => ctx.player.toggle_pause(now),
            ButtonEvent::LongPress(Button::PlayPause) => {
                let state = ctx.player.state();
                if state.folder().is_some() && state.track() > 0 {
                    let track = state.track();
                    ctx.player.play_cue(Cue::Number(track));
                }
            }
            ButtonEvent::DoublePress(Button::PlayPause) => ctx.player.stop(now),
            ButtonEvent::TriplePress(Button::PlayPause) => ctx.player.restart(now),
            ButtonEvent::HoldRepeat(Button::PlayPause) => {}

            ButtonEvent::ShortPress(Button::Next) => ctx.player.next(now),
            ButtonEvent::DoublePress(Button::Next) => ctx.player.next_by(2, now),
            ButtonEvent::TriplePress(Button::Next) => ctx.player.next_by(3, now),
            ButtonEvent::ShortPress(Button::Previous) => ctx.player.previous(now),
            ButtonEvent::DoublePress(Button::Previous) => ctx.player.previous_by(2, now),
            ButtonEvent::TriplePress(Button::Previous) => ctx.player.previous_by(3, now),

            ButtonEvent::LongPress(Button::Next) => {
                self.limit_cued = false;
                self.change_volume(ctx, VolumeChange::Up);
            }
            ButtonEvent::HoldRepeat(Button::Next) => self.change_volume(ctx, VolumeChange::Up),
            ButtonEvent::LongPress(Button::Previous) => {
                self.limit_cued = false;
                self.change_volume(ctx, VolumeChange::Down);
            }
            ButtonEvent::HoldRepeat(Button::Previous) => {
                self.change_volume(ctx, VolumeChange::Down);
            }

            ButtonEvent::Combo(_) => {}
        }
        Transition::Stay
    }

    pub(crate) fn on_card<B: Board>(&mut self, ctx: &mut Ctx<'_, B>, tap: &CardTap) -> Transition {
        self.touch(ctx.now);
        match keycard::decode(&tap.block) {
            Ok(record) => {
                if let Some(action) = record.admin_action() {
                    info!("admin card armed: {}", action.to_special());
                    self.armed = Some((action, later(ctx.now, self.timing.admin_arm_window)));
                    ctx.player.play_cue(Cue::AdminArmed);
                } else if let Some(folder) = record.folder_id() {
                    self.start(ctx, folder, record.mode, record.special);
                }
            }
            Err(e) => {
                let shortcut = ctx.store.settings().shortcut_for(&tap.uid).copied();
                if let Some(s) = shortcut {
                    debug!("shortcut card for folder {}", s.folder.get());
                    self.start(ctx, s.folder, s.mode, s.special);
                } else {
                    info!("unknown card: {}", e);
                    ctx.player.play_cue(Cue::UnknownCard);
                }
            }
        }
        Transition::Stay
    }

    pub(crate) fn on_tick<B: Board>(&mut self, ctx: &mut Ctx<'_, B>) -> Transition {
        let now = ctx.now;
        if self.armed.is_some() && self.armed(now).is_none() {
            debug!("admin card disarmed");
            self.armed = None;
        }

        if ctx.player.state().transport() == Transport::Playing {
            self.touch(now);
            return Transition::Stay;
        }
        let since = *self.idle_since.get_or_insert(now);
        let minutes = ctx.store.settings().standby_minutes;
        if minutes == 0 || self.standby_sent {
            return Transition::Stay;
        }
        let window = Duration::from_secs(u64::from(minutes).saturating_mul(60));
        if now < later(since, window) {
            return Transition::Stay;
        }
        info!("idle for {} min, standby", minutes);
        self.standby_sent = true;
        ctx.player.play_cue(Cue::Standby);
        Transition::Standby
    }

    pub(crate) fn on_player<B: Board>(
        &mut self,
        ctx: &mut Ctx<'_, B>,
        notice: PlayerNotice,
    ) -> Transition {
        handle_common_notice(ctx, notice);
        Transition::Stay
    }

    pub(crate) fn on_resume<B: Board>(&mut self, ctx: &mut Ctx<'_, B>) {
        self.armed = None;
        self.limit_cued = false;
        self.touch(ctx.now);
    }

    fn touch(&mut self, now: Instant) {
        self.idle_since = Some(now);
        self.standby_sent = false;
    }

    fn change_volume<B: Board>(&mut self, ctx: &mut Ctx<'_, B>, change: VolumeChange) {
        if let Some(PlayerNotice::VolumeAtLimit(v)) = ctx.player.set_volume(change) {
            if !self.limit_cued {
                debug!("volume at limit {}", v.get());
                self.limit_cued = true;
                ctx.player.play_cue(Cue::VolumeLimit);
            }
        }
    }

    fn start<B: Board>(&mut self, ctx: &mut Ctx<'_, B>, folder: FolderId, mode: PlaybackMode, special: u16) {
        let start = match mode {
            PlaybackMode::AudiobookResumable => match ctx.store.load_progress(folder) {
                Ok(Some(progress)) => progress.track,
                Ok(None) => special.max(1),
                Err(e) => {
                    warn!("progress unreadable: {}", e);
                    special.max(1)
                }
            },
            PlaybackMode::SingleTrack => special,
            _ => 1,
        };
        ctx.player.play_folder(folder, mode, start, ctx.now);
    }
}
