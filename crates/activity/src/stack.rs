//! Activity stack: a bounded stack of [`Activity`] values.
//!
//! The stack never empties (the default activity sits at the bottom and is
//! never popped) and never grows past [`MAX_DEPTH`]. Only the top activity
//! receives events.

use heapless::Vec;
use platform::{ButtonEvent, CardTap};
use playback::PlayerNotice;

use crate::board::{ActivityTiming, Board, Ctx};
use crate::config::ConfigActivity;
use crate::default::DefaultActivity;

/// Deepest the stack may grow.
pub const MAX_DEPTH: usize = 3;

/// What an activity wants to happen after handling an event.
#[derive(Debug)]
pub enum Transition {
    /// Keep the current activity.
    Stay,
    /// Put a child activity on top.
    Push(Activity),
    /// Return to the activity below.
    Pop,
    /// Ask the board to power down.
    Standby,
}

/// What the stack did with a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StackEvent {
    /// Same activity on top.
    Unchanged,
    /// A different activity is now on top.
    Switched,
    /// The top activity requested standby.
    Standby,
}

/// The closed set of activities.
#[derive(Debug)]
pub enum Activity {
    /// Normal playback.
    Default(DefaultActivity),
    /// Administration.
    Config(ConfigActivity),
}

impl Activity {
    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Activity::Default(_) => "default",
            Activity::Config(_) => "config",
        }
    }

    fn on_button<B: Board>(&mut self, ctx: &mut Ctx<'_, B>, event: ButtonEvent) -> Transition {
        match self {
            Activity::Default(a) => a.on_button(ctx, event),
            Activity::Config(a) => a.on_button(ctx, event),
        }
    }

    fn on_card<B: Board>(&mut self, ctx: &mut Ctx<'_, B>, tap: &CardTap) -> Transition {
        match self {
            Activity::Default(a) => a.on_card(ctx, tap),
            Activity::Config(a) => a.on_card(ctx, tap),
        }
    }

    fn on_tick<B: Board>(&mut self, ctx: &mut Ctx<'_, B>) -> Transition {
        match self {
            Activity::Default(a) => a.on_tick(ctx),
            Activity::Config(a) => a.on_tick(ctx),
        }
    }

    fn on_player<B: Board>(&mut self, ctx: &mut Ctx<'_, B>, notice: PlayerNotice) -> Transition {
        match self {
            Activity::Default(a) => a.on_player(ctx, notice),
            Activity::Config(a) => a.on_player(ctx, notice),
        }
    }

    fn on_resume<B: Board>(&mut self, ctx: &mut Ctx<'_, B>) {
        match self {
            Activity::Default(a) => a.on_resume(ctx),
            Activity::Config(_) => {}
        }
    }
}

/// Bounded stack of activities with [`DefaultActivity`] at the root.
#[derive(Debug)]
pub struct ActivityStack {
    stack: Vec<Activity, MAX_DEPTH>,
}

impl ActivityStack {
    /// Stack holding only the default activity.
    pub fn new(timing: ActivityTiming) -> Self {
        let mut stack = Vec::new();
        // Always fits: the stack starts empty.
        let _ = stack.push(Activity::Default(DefaultActivity::new(timing)));
        Self { stack }
    }

    /// Activity on top.
    pub fn current(&self) -> Option<&Activity> {
        self.stack.last()
    }

    /// Number of activities on the stack.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Whether config mode is on top.
    pub fn in_config(&self) -> bool {
        matches!(self.current(), Some(Activity::Config(_)))
    }

    /// Route a button event to the top activity.
    pub fn on_button<B: Board>(&mut self, ctx: &mut Ctx<'_, B>, event: ButtonEvent) -> StackEvent {
        let transition = match self.stack.last_mut() {
            Some(top) => top.on_button(ctx, event),
            None => Transition::Stay,
        };
        self.apply(ctx, transition)
    }

    /// Route a card tap to the top activity.
    pub fn on_card<B: Board>(&mut self, ctx: &mut Ctx<'_, B>, tap: &CardTap) -> StackEvent {
        let transition = match self.stack.last_mut() {
            Some(top) => top.on_card(ctx, tap),
            None => Transition::Stay,
        };
        self.apply(ctx, transition)
    }

    /// Give the top activity its per-tick turn.
    pub fn on_tick<B: Board>(&mut self, ctx: &mut Ctx<'_, B>) -> StackEvent {
        let transition = match self.stack.last_mut() {
            Some(top) => top.on_tick(ctx),
            None => Transition::Stay,
        };
        self.apply(ctx, transition)
    }

    /// Route a player notice to the top activity.
    pub fn on_player<B: Board>(&mut self, ctx: &mut Ctx<'_, B>, notice: PlayerNotice) -> StackEvent {
        let transition = match self.stack.last_mut() {
            Some(top) => top.on_player(ctx, notice),
            None => Transition::Stay,
        };
        self.apply(ctx, transition)
    }

    fn apply<B: Board>(&mut self, ctx: &mut Ctx<'_, B>, transition: Transition) -> StackEvent {
        match transition {
            Transition::Stay => StackEvent::Unchanged,
            Transition::Push(activity) => {
                let name = activity.name();
                if self.stack.push(activity).is_err() {
                    warn!("activity stack full, not entering {}", name);
                    return StackEvent::Unchanged;
                }
                info!("enter {} activity", name);
                StackEvent::Switched
            }
            Transition::Pop => {
                if self.stack.len() <= 1 {
                    return StackEvent::Unchanged;
                }
                if let Some(left) = self.stack.pop() {
                    info!("leave {} activity", left.name());
                }
                if let Some(top) = self.stack.last_mut() {
                    top.on_resume(ctx);
                }
                StackEvent::Switched
            }
            Transition::Standby => StackEvent::Standby,
        }
    }
}
