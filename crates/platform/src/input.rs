//! Button identities, raw levels, and decoded button events.

/// Physical buttons on the front panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Button {
    /// Play/Pause (centre)
    PlayPause,
    /// Next track / volume up when held
    Next,
    /// Previous track / volume down when held
    Previous,
}

impl Button {
    /// Number of physical buttons.
    pub const COUNT: usize = 3;

    /// All buttons in sampling order.
    pub const ALL: [Button; Self::COUNT] = [Button::PlayPause, Button::Next, Button::Previous];

    /// Stable index of this button (0..[`Button::COUNT`]).
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Button::PlayPause => 0,
            Button::Next => 1,
            Button::Previous => 2,
        }
    }

    const fn mask(self) -> u8 {
        match self {
            Button::PlayPause => 0b001,
            Button::Next => 0b010,
            Button::Previous => 0b100,
        }
    }
}

// ── ButtonSet ────────────────────────────────────────────────────────────────

/// A set of buttons, used to name combos.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(transparent)]
pub struct ButtonSet(u8);

impl ButtonSet {
    /// The empty set.
    pub const EMPTY: ButtonSet = ButtonSet(0);

    /// Every button on the panel.
    pub const ALL: ButtonSet = ButtonSet(0b111);

    /// Build a set from a list of buttons.
    #[must_use]
    pub const fn of(buttons: &[Button]) -> Self {
        let mut bits = 0u8;
        let mut i = 0;
        while i < buttons.len() {
            // const fn: slices cannot be iterated, `i < len` bounds the index.
            #[allow(clippy::indexing_slicing, clippy::arithmetic_side_effects)]
            {
                bits |= buttons[i].mask();
                i += 1;
            }
        }
        ButtonSet(bits)
    }

    /// Add a button to the set.
    pub fn insert(&mut self, button: Button) {
        self.0 |= button.mask();
    }

    /// Whether `button` is in the set.
    #[must_use]
    pub const fn contains(self, button: Button) -> bool {
        self.0 & button.mask() != 0
    }

    /// Number of buttons in the set.
    #[must_use]
    pub const fn len(self) -> u32 {
        self.0.count_ones()
    }

    /// Whether the set is empty.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

// ── ButtonLevels ─────────────────────────────────────────────────────────────

/// One raw sample of every button: `true` means electrically pressed.
///
/// Produced once per control-loop tick by the board's pin sampler and fed
/// to the button decoder. No debouncing has been applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ButtonLevels([bool; Button::COUNT]);

impl ButtonLevels {
    /// No button pressed.
    pub const RELEASED: ButtonLevels = ButtonLevels([false; Button::COUNT]);

    /// Levels with exactly the buttons in `set` pressed.
    #[must_use]
    pub fn from_set(set: ButtonSet) -> Self {
        let mut levels = Self::RELEASED;
        for button in Button::ALL {
            levels.set(button, set.contains(button));
        }
        levels
    }

    /// Raw level of `button`.
    #[must_use]
    pub fn pressed(&self, button: Button) -> bool {
        self.0.get(button.index()).copied().unwrap_or(false)
    }

    /// Overwrite the raw level of `button`.
    pub fn set(&mut self, button: Button, pressed: bool) {
        if let Some(level) = self.0.get_mut(button.index()) {
            *level = pressed;
        }
    }
}

// ── ButtonEvent ──────────────────────────────────────────────────────────────

/// A fully classified button gesture.
///
/// The decoder emits each gesture exactly once; a tick with nothing to
/// report yields no event rather than a "none" variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ButtonEvent {
    /// Pressed and released once, shorter than the long-press threshold.
    ShortPress(Button),
    /// Held for at least the long-press threshold; emitted while still held.
    LongPress(Button),
    /// Two short presses inside the multi-press window.
    DoublePress(Button),
    /// Three short presses inside the multi-press window.
    TriplePress(Button),
    /// Periodic tick while a long press stays held.
    HoldRepeat(Button),
    /// Two or more buttons pressed together.
    Combo(ButtonSet),
}
