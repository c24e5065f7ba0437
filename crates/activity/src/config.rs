//! Config mode.
//!
//! A small wizard driven by the three buttons. Next and Previous browse or
//! adjust, a short PlayPause selects, a long PlayPause cancels. Every
//! finished action is persisted right away and returns to the activity
//! below. Nothing is changed before that point, so cancelling or timing
//! out leaves settings and playback as they were.

use embassy_time::Instant;
use keycard::{AdminAction, CardRecord, PlaybackMode, MAX_TRACK};
use platform::{
    Button, ButtonEvent, CardReader, CardTap, CardUid, Equalizer, FolderId, Volume, CARD_BLOCK_LEN,
};
use playback::{Cue, PlayerNotice};
use settings::Shortcut;

use crate::board::{cue_saved, handle_common_notice, later, ActivityTiming, Board, Ctx};
use crate::menu::{cycle_mode, MenuItem};
use crate::stack::Transition;

/// What the chosen folder and mode end up on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Target {
    /// Written onto a command card.
    Card,
    /// Bound to a card's UID in the settings.
    Shortcut,
}

/// What happens to the next card put on the reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CardJob {
    /// Write this record.
    Write(CardRecord),
    /// Clear the card.
    Reset,
    /// Bind the card's UID.
    Bind {
        /// Folder to play.
        folder: FolderId,
        /// How to play it.
        mode: PlaybackMode,
        /// Mode-dependent value.
        special: u16,
    },
}

/// Where in the wizard the user is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Step {
    /// Browsing the top-level menu.
    Menu(MenuItem),
    /// Picking a folder.
    ChooseFolder {
        /// Pairing or shortcut.
        target: Target,
        /// Folder under the cursor.
        folder: FolderId,
    },
    /// Picking a playback mode.
    ChooseMode {
        /// Pairing or shortcut.
        target: Target,
        /// Folder already chosen.
        folder: FolderId,
        /// Mode under the cursor.
        mode: PlaybackMode,
    },
    /// Picking the track of a single-track card.
    ChooseTrack {
        /// Pairing or shortcut.
        target: Target,
        /// Folder already chosen.
        folder: FolderId,
        /// Track under the cursor.
        track: u16,
    },
    /// Waiting for a card.
    AwaitCard(CardJob),
    /// Adjusting the volume ceiling.
    VolumeCeiling(Volume),
    /// Picking an equalizer preset.
    Equalizer(Equalizer),
}

/// The config activity.
#[derive(Debug)]
pub struct ConfigActivity {
    timing: ActivityTiming,
    step: Step,
    deadline: Instant,
}

/// Move `value` by `delta` inside `1..=max`, wrapping.
fn wrap_step(value: u16, delta: i32, max: u16) -> u16 {
    let span = i32::from(max);
    let wrapped = i32::from(value)
        .saturating_sub(1)
        .saturating_add(delta)
        .checked_rem_euclid(span)
        .unwrap_or(0);
    u16::try_from(wrapped.saturating_add(1)).unwrap_or(1)
}

/// Step size of a browse gesture, or `None` for gestures that do not browse.
fn browse_delta(event: ButtonEvent) -> Option<i32> {
    match event {
        ButtonEvent::ShortPress(Button::Next) => Some(1),
        ButtonEvent::ShortPress(Button::Previous) => Some(-1),
        ButtonEvent::LongPress(Button::Next) | ButtonEvent::HoldRepeat(Button::Next) => Some(10),
        ButtonEvent::LongPress(Button::Previous) | ButtonEvent::HoldRepeat(Button::Previous) => {
            Some(-10)
        }
        _ => None,
    }
}

impl ConfigActivity {
    /// Open config mode at the flow `action` asks for.
    ///
    /// Card flows are refused while cards are locked; the menu opens
    /// instead so the lock can be lifted.
    pub fn enter<B: Board>(ctx: &mut Ctx<'_, B>, timing: ActivityTiming, action: AdminAction) -> Self {
        let locked = ctx.store.settings().locked;
        let step = match action {
            AdminAction::PairCard if !locked => Step::ChooseFolder {
                target: Target::Card,
                folder: FolderId::FIRST,
            },
            AdminAction::ResetCard if !locked => Step::AwaitCard(CardJob::Reset),
            AdminAction::PairCard | AdminAction::ResetCard => {
                ctx.player.play_cue(Cue::Locked);
                Step::Menu(MenuItem::Lock)
            }
            AdminAction::OpenMenu => Step::Menu(MenuItem::PairCard),
        };
        Self {
            timing,
            step,
            deadline: later(ctx.now, timing.config_timeout),
        }
    }

    /// Current wizard step.
    pub fn step(&self) -> Step {
        self.step
    }

    pub(crate) fn on_button<B: Board>(
        &mut self,
        ctx: &mut Ctx<'_, B>,
        event: ButtonEvent,
    ) -> Transition {
        self.deadline = later(ctx.now, self.timing.config_timeout);

        if event == ButtonEvent::LongPress(Button::PlayPause) {
            info!("config cancelled");
            ctx.player.play_cue(Cue::ConfigCancelled);
            return Transition::Pop;
        }
        let select = event == ButtonEvent::ShortPress(Button::PlayPause);
        let delta = browse_delta(event);

        match self.step {
            Step::Menu(item) => {
                if select {
                    return self.select(ctx, item);
                }
                let moved = match event {
                    ButtonEvent::ShortPress(Button::Next) => item.next(),
                    ButtonEvent::ShortPress(Button::Previous) => item.prev(),
                    _ => return Transition::Stay,
                };
                self.go(ctx, Step::Menu(moved));
            }
            Step::ChooseFolder { target, folder } => {
                if select {
                    self.go(
                        ctx,
                        Step::ChooseMode {
                            target,
                            folder,
                            mode: PlaybackMode::Album,
                        },
                    );
                } else if let Some(d) = delta {
                    let folder = folder.offset(i16::try_from(d).unwrap_or(0));
                    self.go(ctx, Step::ChooseFolder { target, folder });
                }
            }
            Step::ChooseMode {
                target,
                folder,
                mode,
            } => {
                if select {
                    if mode == PlaybackMode::SingleTrack {
                        self.go(
                            ctx,
                            Step::ChooseTrack {
                                target,
                                folder,
                                track: 1,
                            },
                        );
                    } else {
                        self.await_card(target, folder, mode, 0);
                    }
                } else if let Some(d) = delta {
                    let mode = cycle_mode(mode, d > 0);
                    self.go(
                        ctx,
                        Step::ChooseMode {
                            target,
                            folder,
                            mode,
                        },
                    );
                }
            }
            Step::ChooseTrack {
                target,
                folder,
                track,
            } => {
                if select {
                    self.await_card(target, folder, PlaybackMode::SingleTrack, track);
                } else if let Some(d) = delta {
                    let track = wrap_step(track, d, MAX_TRACK);
                    self.go(
                        ctx,
                        Step::ChooseTrack {
                            target,
                            folder,
                            track,
                        },
                    );
                }
            }
            Step::AwaitCard(_) => trace!("waiting for a card"),
            Step::VolumeCeiling(volume) => {
                if select {
                    let result = ctx.store.commit(|s| s.max_volume = volume).map(|_| ());
                    cue_saved(ctx, &result, Cue::Saved);
                    let limits = ctx.store.settings();
                    let (min, max) = (limits.min_volume, limits.max_volume);
                    ctx.player.set_volume_limits(min, max);
                    return Transition::Pop;
                }
                let floor = ctx.store.settings().min_volume;
                let adjusted = match event {
                    ButtonEvent::ShortPress(Button::Next) | ButtonEvent::HoldRepeat(Button::Next) => {
                        volume.step_up()
                    }
                    ButtonEvent::ShortPress(Button::Previous)
                    | ButtonEvent::HoldRepeat(Button::Previous) => volume.step_down().max(floor),
                    _ => return Transition::Stay,
                };
                self.go(ctx, Step::VolumeCeiling(adjusted));
            }
            Step::Equalizer(eq) => {
                if select {
                    let result = ctx.store.commit(|s| s.equalizer = eq).map(|_| ());
                    cue_saved(ctx, &result, Cue::Saved);
                    let live = ctx.store.settings().equalizer;
                    if live != ctx.player.equalizer() {
                        ctx.player.set_equalizer(live);
                    }
                    return Transition::Pop;
                }
                let adjusted = match event {
                    ButtonEvent::ShortPress(Button::Next) => eq.cycle_next(),
                    ButtonEvent::ShortPress(Button::Previous) => eq.cycle_prev(),
                    _ => return Transition::Stay,
                };
                self.go(ctx, Step::Equalizer(adjusted));
            }
        }
        Transition::Stay
    }

    pub(crate) fn on_card<B: Board>(&mut self, ctx: &mut Ctx<'_, B>, tap: &CardTap) -> Transition {
        self.deadline = later(ctx.now, self.timing.config_timeout);
        let Step::AwaitCard(job) = self.step else {
            debug!("card ignored in config");
            return Transition::Stay;
        };
        match job {
            CardJob::Write(record) => {
                if write_verified(ctx.reader, &tap.uid, &keycard::encode(&record)) {
                    info!("card paired to folder {}", record.folder);
                    ctx.player.play_cue(Cue::CardWritten);
                    Transition::Pop
                } else {
                    warn!("card write failed");
                    ctx.player.play_cue(Cue::CardWriteFailed);
                    Transition::Stay
                }
            }
            CardJob::Reset => {
                if !write_verified(ctx.reader, &tap.uid, &keycard::blank()) {
                    warn!("card reset failed");
                    ctx.player.play_cue(Cue::CardWriteFailed);
                    return Transition::Stay;
                }
                let uid = tap.uid;
                match ctx.store.commit(|s| {
                    s.unbind_shortcut(&uid);
                }) {
                    Ok(_) => ctx.player.play_cue(Cue::CardReset),
                    Err(_) => ctx.player.play_cue(Cue::StorageFault),
                }
                Transition::Pop
            }
            CardJob::Bind {
                folder,
                mode,
                special,
            } => {
                let shortcut = Shortcut {
                    uid: tap.uid,
                    folder,
                    mode,
                    special,
                };
                let mut slot = None;
                let result = ctx.store.commit(|s| slot = s.bind_shortcut(shortcut));
                match (result, slot) {
                    (Err(_), _) => ctx.player.play_cue(Cue::StorageFault),
                    (Ok(_), None) => {
                        warn!("no free shortcut slot");
                        ctx.player.play_cue(Cue::CardWriteFailed);
                    }
                    (Ok(_), Some(slot)) => {
                        info!("shortcut slot {} bound to folder {}", slot, folder.get());
                        ctx.player.play_cue(Cue::ShortcutBound);
                    }
                }
                Transition::Pop
            }
        }
    }

    pub(crate) fn on_tick<B: Board>(&mut self, ctx: &mut Ctx<'_, B>) -> Transition {
        if ctx.now < self.deadline {
            return Transition::Stay;
        }
        info!("config timed out");
        ctx.player.play_cue(Cue::ConfigTimeout);
        Transition::Pop
    }

    pub(crate) fn on_player<B: Board>(
        &mut self,
        ctx: &mut Ctx<'_, B>,
        notice: PlayerNotice,
    ) -> Transition {
        handle_common_notice(ctx, notice);
        Transition::Stay
    }

    fn select<B: Board>(&mut self, ctx: &mut Ctx<'_, B>, item: MenuItem) -> Transition {
        let settings = ctx.store.settings();
        if item.is_card_assignment() && settings.locked {
            ctx.player.play_cue(Cue::Locked);
            return Transition::Stay;
        }
        let next = match item {
            MenuItem::PairCard => Step::ChooseFolder {
                target: Target::Card,
                folder: FolderId::FIRST,
            },
            MenuItem::Shortcut => Step::ChooseFolder {
                target: Target::Shortcut,
                folder: FolderId::FIRST,
            },
            MenuItem::ResetCard => Step::AwaitCard(CardJob::Reset),
            MenuItem::VolumeCeiling => Step::VolumeCeiling(settings.max_volume),
            MenuItem::Equalizer => Step::Equalizer(settings.equalizer),
            MenuItem::Lock => {
                let result = ctx.store.commit(|s| s.locked = !s.locked).map(|_| ());
                cue_saved(ctx, &result, Cue::Saved);
                return Transition::Pop;
            }
        };
        self.go(ctx, next);
        Transition::Stay
    }

    fn await_card(&mut self, target: Target, folder: FolderId, mode: PlaybackMode, special: u16) {
        let job = match target {
            Target::Card => CardJob::Write(CardRecord::new(folder, mode, special)),
            Target::Shortcut => CardJob::Bind {
                folder,
                mode,
                special,
            },
        };
        debug!("waiting for a card");
        self.step = Step::AwaitCard(job);
    }

    /// Move to `step` and announce it.
    fn go<B: Board>(&mut self, ctx: &mut Ctx<'_, B>, step: Step) {
        let cue = match step {
            Step::Menu(item) => Some(Cue::MenuItem(item.position())),
            Step::ChooseFolder { folder, .. } => Some(Cue::Number(u16::from(folder.get()))),
            Step::ChooseMode { mode, .. } => Some(Cue::ModeName(mode)),
            Step::ChooseTrack { track, .. } => Some(Cue::Number(track)),
            Step::VolumeCeiling(v) => Some(Cue::Number(u16::from(v.get()))),
            Step::Equalizer(eq) => Some(Cue::EqualizerName(eq)),
            Step::AwaitCard(_) => None,
        };
        self.step = step;
        if let Some(cue) = cue {
            ctx.player.play_cue(cue);
        }
    }
}

/// Write `block` to the card and read it back.
fn write_verified<R: CardReader>(reader: &mut R, uid: &CardUid, block: &[u8; CARD_BLOCK_LEN]) -> bool {
    if reader.write_block(uid, block).is_err() {
        return false;
    }
    matches!(reader.read_block(uid), Ok(back) if back == *block)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn track_cursor_wraps_inside_range() {
        assert_eq!(wrap_step(1, -1, 255), 255);
        assert_eq!(wrap_step(255, 1, 255), 1);
        assert_eq!(wrap_step(250, 10, 255), 5);
        assert_eq!(wrap_step(3, -10, 255), 248);
    }

    #[test]
    fn only_next_and_previous_browse() {
        assert_eq!(browse_delta(ButtonEvent::ShortPress(Button::Next)), Some(1));
        assert_eq!(browse_delta(ButtonEvent::HoldRepeat(Button::Previous)), Some(-10));
        assert_eq!(browse_delta(ButtonEvent::ShortPress(Button::PlayPause)), None);
        assert_eq!(browse_delta(ButtonEvent::DoublePress(Button::Next)), None);
    }
}
