//! Audio domain newtypes for compile-time safety.
//!
//! - `Volume`: clamps to the audio module's 0–30 range
//! - `FolderId`: validates the 1–99 folder numbers on the SD card
//! - `Equalizer`: the module's six fixed presets

// ── Error type ───────────────────────────────────────────────────────────────

/// Error returned when a value is out of the valid range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct OutOfRangeError {
    /// The value that was out of range.
    pub value: u32,
    /// The inclusive minimum allowed value.
    pub min: u32,
    /// The inclusive maximum allowed value.
    pub max: u32,
}

// ── Volume ───────────────────────────────────────────────────────────────────

/// Audio module output volume, clamped to 0–30.
///
/// Wraps a `u8` with the invariant `0 <= value <= 30`.
/// Construct with [`Volume::new`] (clamping) or [`Volume::try_new`]
/// (fallible, strict).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(transparent)]
pub struct Volume(u8);

impl Volume {
    /// Silence.
    pub const MIN: Volume = Volume(0);

    /// Loudest setting the module accepts.
    pub const MAX: Volume = Volume(30);

    /// Create a `Volume`, clamping values above 30 to 30.
    #[must_use]
    pub const fn new(value: u8) -> Self {
        if value > Self::MAX.0 {
            Self::MAX
        } else {
            Self(value)
        }
    }

    /// Create a `Volume`, returning an error if `value > 30`.
    ///
    /// # Errors
    ///
    /// Returns [`OutOfRangeError`] if `value > 30`.
    pub fn try_new(value: u8) -> Result<Self, OutOfRangeError> {
        if value > Self::MAX.0 {
            Err(OutOfRangeError {
                value: u32::from(value),
                min: 0,
                max: u32::from(Self::MAX.0),
            })
        } else {
            Ok(Self(value))
        }
    }

    /// Return the inner volume value (0–30).
    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }

    /// One step louder, saturating at [`Volume::MAX`].
    #[must_use]
    pub fn step_up(self) -> Self {
        Self::new(self.0.saturating_add(1))
    }

    /// One step quieter, saturating at [`Volume::MIN`].
    #[must_use]
    pub fn step_down(self) -> Self {
        Self(self.0.saturating_sub(1))
    }
}

// ── FolderId ─────────────────────────────────────────────────────────────────

/// Numbered folder on the audio module's SD card (`01`..`99`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(transparent)]
pub struct FolderId(u8);

impl FolderId {
    /// Lowest folder number.
    pub const FIRST: FolderId = FolderId(1);

    /// Highest folder number the module can address.
    pub const LAST: FolderId = FolderId(99);

    /// Create a `FolderId`, rejecting 0 and anything above 99.
    ///
    /// # Errors
    ///
    /// Returns [`OutOfRangeError`] if `value` is outside 1–99.
    pub fn try_new(value: u8) -> Result<Self, OutOfRangeError> {
        if value < Self::FIRST.0 || value > Self::LAST.0 {
            Err(OutOfRangeError {
                value: u32::from(value),
                min: u32::from(Self::FIRST.0),
                max: u32::from(Self::LAST.0),
            })
        } else {
            Ok(Self(value))
        }
    }

    /// Return the folder number (1–99).
    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }

    /// Next folder, wrapping 99 → 1.
    #[must_use]
    pub fn wrapping_next(self) -> Self {
        self.offset(1)
    }

    /// Previous folder, wrapping 1 → 99.
    #[must_use]
    pub fn wrapping_prev(self) -> Self {
        self.offset(-1)
    }

    /// Move by `delta` folders, wrapping around the 1–99 range.
    #[must_use]
    pub fn offset(self, delta: i16) -> Self {
        let span = i16::from(Self::LAST.0);
        let zero_based = i16::from(self.0).saturating_sub(1).saturating_add(delta);
        let wrapped = zero_based.rem_euclid(span);
        // rem_euclid keeps the value in 0..99, so +1 stays in 1..=99.
        Self(u8::try_from(wrapped.saturating_add(1)).unwrap_or(Self::FIRST.0))
    }
}

// ── Equalizer ────────────────────────────────────────────────────────────────

/// Equalizer presets built into the audio module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Equalizer {
    /// Flat response.
    #[default]
    Normal = 0,
    /// Pop
    Pop = 1,
    /// Rock
    Rock = 2,
    /// Jazz
    Jazz = 3,
    /// Classic
    Classic = 4,
    /// Bass boost
    Bass = 5,
}

impl Equalizer {
    /// All presets in wire order.
    pub const ALL: [Equalizer; 6] = [
        Equalizer::Normal,
        Equalizer::Pop,
        Equalizer::Rock,
        Equalizer::Jazz,
        Equalizer::Classic,
        Equalizer::Bass,
    ];

    /// Decode a preset from its wire byte.
    #[must_use]
    pub fn from_wire(value: u8) -> Option<Self> {
        Self::ALL.get(usize::from(value)).copied()
    }

    /// The wire byte for this preset.
    #[must_use]
    pub const fn to_wire(self) -> u8 {
        self as u8
    }

    /// The preset after this one, wrapping around.
    #[must_use]
    pub fn cycle_next(self) -> Self {
        let next = usize::from(self.to_wire())
            .saturating_add(1)
            .checked_rem(Self::ALL.len())
            .unwrap_or(0);
        Self::ALL.get(next).copied().unwrap_or_default()
    }

    /// The preset before this one, wrapping around.
    #[must_use]
    pub fn cycle_prev(self) -> Self {
        let len = Self::ALL.len();
        let prev = usize::from(self.to_wire())
            .saturating_add(len.saturating_sub(1))
            .checked_rem(len)
            .unwrap_or(0);
        Self::ALL.get(prev).copied().unwrap_or_default()
    }
}
