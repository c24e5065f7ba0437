//! Front-panel button sampling.
//!
//! # Pin assignments
//!
//! | Signal     | MCU pin | Notes                        |
//! |------------|---------|------------------------------|
//! | Play/Pause | PA0     | Active-low, internal pull-up |
//! | Next       | PA1     | Active-low, internal pull-up |
//! | Previous   | PA2     | Active-low, internal pull-up |
//!
//! No debouncing happens here; the decoder in the `input` crate owns all
//! timing. A pin that cannot be read counts as released.

use embedded_hal::digital::InputPin;
use platform::{Button, ButtonLevels};

/// The three panel buttons, wired active-low.
pub struct PanelPins<P> {
    play_pause: P,
    next: P,
    previous: P,
}

impl<P: InputPin> PanelPins<P> {
    /// Group the three button inputs.
    pub fn new(play_pause: P, next: P, previous: P) -> Self {
        Self {
            play_pause,
            next,
            previous,
        }
    }

    /// One raw sample of every button.
    pub fn sample(&mut self) -> ButtonLevels {
        let mut levels = ButtonLevels::RELEASED;
        for button in Button::ALL {
            let pin = match button {
                Button::PlayPause => &mut self.play_pause,
                Button::Next => &mut self.next,
                Button::Previous => &mut self.previous,
            };
            levels.set(button, pin.is_low().unwrap_or(false));
        }
        levels
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use embedded_hal_mock::eh1::digital::{Mock as PinMock, State, Transaction};

    #[test]
    fn low_level_reads_as_pressed() {
        let mut play = PinMock::new(&[Transaction::get(State::High)]);
        let mut next = PinMock::new(&[Transaction::get(State::Low)]);
        let mut prev = PinMock::new(&[Transaction::get(State::High)]);
        let mut pins = PanelPins::new(play.clone(), next.clone(), prev.clone());

        let levels = pins.sample();
        assert!(!levels.pressed(Button::PlayPause));
        assert!(levels.pressed(Button::Next));
        assert!(!levels.pressed(Button::Previous));

        play.done();
        next.done();
        prev.done();
    }
}
