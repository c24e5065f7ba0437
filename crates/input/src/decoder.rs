//! Gesture classification on top of the debouncer.
//!
//! Per-button states:
//!
//! ```text
//!            press                 release (< long)
//!   Idle ───────────▶ Pressed ─────────────────────▶ WaitingForNextPress
//!    ▲                  │  held ≥ long                  │      │
//!    │                  ▼                               │      │ press inside window
//!    │          WaitingForRelease ◀── combo / reset     │      └──────▶ Pressed (count+1)
//!    │                  │ release                       │ window expires
//!    └──────────────────┴───────────────────────────────┘ → Short/Double/Triple
//! ```
//!
//! The debouncer in front of it supplies the Debouncing state.
//!
//! A fresh press also opens a combo window. Until that window is resolved
//! the button is a combo candidate and classifies nothing on its own, so a
//! quick simultaneous tap that is released before the window closes still
//! comes out as one combo.

use embassy_time::{Duration, Instant};
use heapless::Vec;
use platform::{Button, ButtonEvent, ButtonLevels, ButtonSet};

use crate::debounce::{Debouncer, Edge};

/// Upper bound of events produced by one sample: one per button plus a combo.
pub const MAX_EVENTS_PER_SAMPLE: usize = Button::COUNT + 1;

/// Events produced by one [`ButtonDecoder::sample`] call.
pub type Events = Vec<ButtonEvent, MAX_EVENTS_PER_SAMPLE>;

/// Decoder timing.
///
/// Every value is measured between raw edge onsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DecoderConfig {
    /// A raw level must hold this long to count.
    pub debounce: Duration,
    /// Holding at least this long is a long press.
    pub long_press: Duration,
    /// A new press starting within this long after a release extends a multi-press.
    pub multi_press_window: Duration,
    /// Interval between hold-repeat events after a long press.
    pub repeat_interval: Duration,
    /// Presses starting within this long of each other form a combo.
    pub combo_tolerance: Duration,
}

impl DecoderConfig {
    /// Default timing: 30 ms debounce, 1 s long press, 300 ms multi-press
    /// window, 300 ms hold repeat, 200 ms combo tolerance.
    pub const DEFAULT: DecoderConfig = DecoderConfig {
        debounce: Duration::from_millis(30),
        long_press: Duration::from_millis(1000),
        multi_press_window: Duration::from_millis(300),
        repeat_interval: Duration::from_millis(300),
        combo_tolerance: Duration::from_millis(200),
    };
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Gesture {
    Idle,
    Pressed { since: Instant, count: u8 },
    WaitingForNextPress { released_at: Instant, count: u8 },
    /// `next_repeat` is `None` when the hold must stay silent (combo member,
    /// or held across a reset).
    WaitingForRelease { next_repeat: Option<Instant> },
}

#[derive(Debug, Clone, Copy)]
struct Channel {
    debouncer: Debouncer,
    gesture: Gesture,
    /// Onset of a first press whose combo membership is still undecided.
    combo_since: Option<Instant>,
}

/// Turns raw per-tick button levels into [`ButtonEvent`]s.
pub struct ButtonDecoder {
    config: DecoderConfig,
    channels: [Channel; Button::COUNT],
    last_sample: Option<Instant>,
}

fn later(t: Instant, d: Duration) -> Instant {
    t.checked_add(d).unwrap_or(Instant::MAX)
}

fn classify(button: Button, count: u8) -> ButtonEvent {
    match count {
        0 | 1 => ButtonEvent::ShortPress(button),
        2 => ButtonEvent::DoublePress(button),
        _ => ButtonEvent::TriplePress(button),
    }
}

impl ButtonDecoder {
    /// Create a decoder with every button idle.
    #[must_use]
    pub fn new(config: DecoderConfig) -> Self {
        Self {
            config,
            channels: [Channel {
                debouncer: Debouncer::new(),
                gesture: Gesture::Idle,
                combo_since: None,
            }; Button::COUNT],
            last_sample: None,
        }
    }

    /// Active timing.
    #[must_use]
    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// Drop every gesture in progress.
    ///
    /// Pending multi-presses and combo candidates are discarded. Buttons that
    /// are physically held stay silent until they are released.
    pub fn reset(&mut self) {
        for ch in &mut self.channels {
            let held =
                ch.debouncer.stable() || ch.debouncer.pending().is_some_and(|p| p.pressed);
            ch.gesture = if held {
                Gesture::WaitingForRelease { next_repeat: None }
            } else {
                Gesture::Idle
            };
            ch.combo_since = None;
        }
        trace!("button decoder reset");
    }

    /// Feed one raw sample of every button taken at `now`.
    ///
    /// A sample older than the previous one is discarded.
    pub fn sample(&mut self, now: Instant, levels: ButtonLevels) -> Events {
        let mut events = Events::new();
        if self.last_sample.is_some_and(|last| now < last) {
            debug!("discarding out-of-order button sample");
            return events;
        }
        self.last_sample = Some(now);

        let config = self.config;
        for button in Button::ALL {
            let Some(ch) = self.channels.get_mut(button.index()) else {
                continue;
            };
            let edge = ch
                .debouncer
                .update(levels.pressed(button), now, config.debounce);
            if let Some(event) = Self::step(&config, ch, button, edge, now) {
                events.push(event).ok();
            }
        }

        if let Some(combo) = self.detect_combo(now) {
            events.push(ButtonEvent::Combo(combo)).ok();
        }

        for event in &events {
            trace!("button event {:?}", event);
        }
        events
    }

    /// Advance one button's gesture machine.
    fn step(
        config: &DecoderConfig,
        ch: &mut Channel,
        button: Button,
        edge: Option<Edge>,
        now: Instant,
    ) -> Option<ButtonEvent> {
        let (next, event) = match (ch.gesture, edge) {
            (Gesture::Idle, Some(Edge { pressed: true, at })) => {
                ch.combo_since = Some(at);
                (Gesture::Pressed { since: at, count: 1 }, None)
            }
            (Gesture::Idle, _) => (Gesture::Idle, None),

            (Gesture::Pressed { since, count }, Some(Edge { pressed: false, at })) => {
                if at.saturating_duration_since(since) >= config.long_press {
                    // Released on the very tick the threshold was reached.
                    (Gesture::Idle, Some(ButtonEvent::LongPress(button)))
                } else if count >= 3 {
                    (Gesture::Idle, Some(ButtonEvent::TriplePress(button)))
                } else {
                    (Gesture::WaitingForNextPress { released_at: at, count }, None)
                }
            }
            (Gesture::Pressed { since, count }, _) => {
                let held_long = now.saturating_duration_since(since) >= config.long_press;
                // A release that began before the threshold is still settling.
                let releasing_early = ch.debouncer.pending().is_some_and(|p| {
                    !p.pressed && p.at.saturating_duration_since(since) < config.long_press
                });
                if held_long && !releasing_early && ch.combo_since.is_none() {
                    let first_repeat = later(later(since, config.long_press), config.repeat_interval);
                    (
                        Gesture::WaitingForRelease {
                            next_repeat: Some(first_repeat),
                        },
                        Some(ButtonEvent::LongPress(button)),
                    )
                } else {
                    (Gesture::Pressed { since, count }, None)
                }
            }

            (Gesture::WaitingForRelease { .. }, Some(Edge { pressed: false, .. })) => {
                (Gesture::Idle, None)
            }
            (Gesture::WaitingForRelease { next_repeat: Some(due) }, _) if now >= due => (
                Gesture::WaitingForRelease {
                    next_repeat: Some(later(due, config.repeat_interval)),
                },
                Some(ButtonEvent::HoldRepeat(button)),
            ),
            (g @ Gesture::WaitingForRelease { .. }, _) => (g, None),

            (Gesture::WaitingForNextPress { released_at, count }, Some(Edge { pressed: true, at })) => {
                if at.saturating_duration_since(released_at) <= config.multi_press_window {
                    // A second press makes this a multi-press, not a combo member.
                    ch.combo_since = None;
                    (
                        Gesture::Pressed {
                            since: at,
                            count: count.saturating_add(1),
                        },
                        None,
                    )
                } else {
                    // The window had already closed; resolve the old gesture
                    // and start a fresh one.
                    ch.combo_since = Some(at);
                    (
                        Gesture::Pressed { since: at, count: 1 },
                        Some(classify(button, count)),
                    )
                }
            }
            (Gesture::WaitingForNextPress { released_at, count }, _) => {
                let expired =
                    now.saturating_duration_since(released_at) > config.multi_press_window;
                let press_settling = ch.debouncer.pending().is_some_and(|p| {
                    p.pressed
                        && p.at.saturating_duration_since(released_at) <= config.multi_press_window
                });
                if expired && !press_settling && ch.combo_since.is_none() {
                    (Gesture::Idle, Some(classify(button, count)))
                } else {
                    (Gesture::WaitingForNextPress { released_at, count }, None)
                }
            }
        };
        ch.gesture = next;
        event
    }

    /// Resolve a combo once the tolerance window after the earliest
    /// undecided press has closed.
    ///
    /// Members are the buttons whose first press started inside the window,
    /// whether they are still held or were already released.
    fn detect_combo(&mut self, now: Instant) -> Option<ButtonSet> {
        let earliest = self.channels.iter().filter_map(|ch| ch.combo_since).min()?;
        let window_end = later(earliest, self.config.combo_tolerance);
        // Leave room for a press that started at the very end of the window
        // to clear debounce.
        if now < later(window_end, self.config.debounce) {
            return None;
        }

        let mut set = ButtonSet::EMPTY;
        for button in Button::ALL {
            let Some(ch) = self.channels.get_mut(button.index()) else {
                continue;
            };
            let Some(since) = ch.combo_since else {
                continue;
            };
            if since > window_end {
                continue;
            }
            ch.combo_since = None;
            if matches!(
                ch.gesture,
                Gesture::Pressed { count: 1, .. } | Gesture::WaitingForNextPress { count: 1, .. }
            ) {
                set.insert(button);
            }
        }
        if set.len() < 2 {
            return None;
        }
        for button in Button::ALL {
            if !set.contains(button) {
                continue;
            }
            if let Some(ch) = self.channels.get_mut(button.index()) {
                ch.gesture = match ch.gesture {
                    Gesture::Pressed { .. } => Gesture::WaitingForRelease { next_repeat: None },
                    _ => Gesture::Idle,
                };
            }
        }
        debug!("combo of {} buttons", set.len());
        Some(set)
    }
}

impl Default for ButtonDecoder {
    fn default() -> Self {
        Self::new(DecoderConfig::DEFAULT)
    }
}
