//! The control loop body.
//!
//! [`App::tick`] is called once per [`TICK_MS`](platform::config::TICK_MS)
//! with the current time and one raw sample of the buttons. It never
//! blocks: module replies, button gestures and card taps are whatever has
//! arrived since the previous tick.

use activity::{ActivityStack, ActivityTiming, Board, Ctx, Player, StackEvent};
use embassy_time::Instant;
use input::{ButtonDecoder, DecoderConfig};
use platform::{ButtonLevels, CardReader};
use playback::{PlayerController, PlayerTiming};
use settings::SettingsStore;

/// Runtime policy of the whole loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AppConfig {
    /// Button gesture timing.
    pub decoder: DecoderConfig,
    /// Module reply and checkpoint timing.
    pub player: PlayerTiming,
    /// Config timeout and admin-card window.
    pub activity: ActivityTiming,
}

/// What the board should do after a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AppSignal {
    /// Keep ticking.
    Running,
    /// Idle long enough: the board may cut power.
    Standby,
}

/// Board collaborators handed to [`App::boot`].
pub struct Parts<B: Board> {
    /// Audio module UART.
    pub serial: B::Serial,
    /// Story branch structure.
    pub branches: B::Branches,
    /// Settings EEPROM.
    pub nvs: B::Nvs,
    /// RFID reader.
    pub reader: B::Reader,
}

/// Everything the control loop owns.
pub struct App<B: Board> {
    decoder: ButtonDecoder,
    stack: ActivityStack,
    player: Player<B>,
    store: SettingsStore<B::Nvs>,
    reader: B::Reader,
}

impl<B: Board> App<B> {
    /// Load the settings, configure the module from them and ask it for
    /// its status.
    pub fn boot(parts: Parts<B>, config: AppConfig, now: Instant) -> Self {
        let Parts {
            serial,
            branches,
            nvs,
            reader,
        } = parts;
        let store = SettingsStore::open(nvs);
        let mut player = PlayerController::new(serial, branches, config.player);

        let settings = store.settings();
        player.set_volume_limits(settings.min_volume, settings.max_volume);
        player.apply_volume(settings.initial_volume);
        player.set_equalizer(settings.equalizer);
        player.query_status(now);
        info!(
            "boot: volume {} ({}..={}), standby {} min",
            settings.initial_volume.get(),
            settings.min_volume.get(),
            settings.max_volume.get(),
            settings.standby_minutes
        );

        Self {
            decoder: ButtonDecoder::new(config.decoder),
            stack: ActivityStack::new(config.activity),
            player,
            store,
            reader,
        }
    }

    /// Run one control-loop iteration.
    ///
    /// Order: module replies, button gestures, at most one card, then the
    /// top activity's own turn. Once a gesture switches activities the
    /// rest of that tick's gestures are dropped and the decoder starts over.
    pub fn tick(&mut self, now: Instant, levels: ButtonLevels) -> AppSignal {
        let Self {
            decoder,
            stack,
            player,
            store,
            reader,
        } = self;
        let notices = player.poll(now);
        let mut ctx = Ctx::<B> {
            now,
            player,
            store,
            reader,
        };
        let mut signal = AppSignal::Running;
        let mut note = |event: StackEvent, decoder: &mut ButtonDecoder| match event {
            StackEvent::Unchanged => false,
            StackEvent::Switched => {
                decoder.reset();
                true
            }
            StackEvent::Standby => {
                signal = AppSignal::Standby;
                false
            }
        };

        for notice in notices {
            let event = stack.on_player(&mut ctx, notice);
            note(event, decoder);
        }

        for event in decoder.sample(now, levels) {
            debug!("button {:?}", event);
            if note(stack.on_button(&mut ctx, event), decoder) {
                break;
            }
        }

        if let Some(tap) = ctx.reader.poll_card() {
            debug!("card tapped");
            let event = stack.on_card(&mut ctx, &tap);
            note(event, decoder);
        }

        let event = stack.on_tick(&mut ctx);
        note(event, decoder);
        signal
    }

    /// The player.
    pub fn player(&self) -> &Player<B> {
        &self.player
    }

    /// The settings store.
    pub fn store(&self) -> &SettingsStore<B::Nvs> {
        &self.store
    }

    /// The activity stack.
    pub fn stack(&self) -> &ActivityStack {
        &self.stack
    }
}
