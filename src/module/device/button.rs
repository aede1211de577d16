//! Provide the three station buttons
//!

use std::collections::HashMap;
use std::time::Duration;

use rppal::gpio::{Gpio, InputPin};

use crate::module::error::{Result, StationError};
use crate::module::util::conf;

/// Physical buttons on the station.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Button {
    /// Quit
    Red,
    /// Capture
    Blue,
    /// Combine
    Green,
}

impl Button {
    pub const ALL: [Button; 3] = [Button::Red, Button::Blue, Button::Green];
}

/// Reads the current level of each button.
///
pub trait ButtonPad {
    fn is_pressed(&self, button: Button) -> bool;
}

/// Buttons wired between a GPIO line and ground.
///
pub struct GpioButtons {
    red: InputPin,
    blue: InputPin,
    green: InputPin,
}

/// GpioButtons's methods
///
impl GpioButtons {
    /// GpioButtons's constructor
    ///
    pub fn new(pin: &conf::Pin) -> Result<Self> {
        let gpio = Gpio::new().map_err(|e| StationError::Hardware(format!("gpio: {}", e)))?;
        let input = |n: u8| -> Result<InputPin> {
            Ok(gpio
                .get(n)
                .map_err(|e| StationError::Hardware(format!("gpio {}: {}", n, e)))?
                .into_input_pullup())
        };
        Ok(Self {
            red: input(pin.quit_pin)?,
            blue: input(pin.capture_pin)?,
            green: input(pin.combine_pin)?,
        })
    }
}

/// Implement ButtonPad for GpioButtons. Pull-up lines read low while pressed.
///
impl ButtonPad for GpioButtons {
    fn is_pressed(&self, button: Button) -> bool {
        match button {
            Button::Red => self.red.is_low(),
            Button::Blue => self.blue.is_low(),
            Button::Green => self.green.is_low(),
        }
    }
}

impl Drop for GpioButtons {
    fn drop(&mut self) {
        log::info!("Button lines released");
    }
}

/// Turns sampled levels into presses.
///
/// A press is recognized on the released-to-pressed transition, and only if
/// the previous recognized press of that button is at least `min_interval` old.
#[derive(Debug, Clone)]
pub struct Debouncer {
    min_interval: Duration,
    pressed: HashMap<Button, bool>,
    last_fired: HashMap<Button, Duration>,
}

impl Debouncer {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            pressed: HashMap::new(),
            last_fired: HashMap::new(),
        }
    }

    /// Feeds one sample taken at `now`. Returns true when it counts as a press.
    pub fn update(&mut self, button: Button, pressed: bool, now: Duration) -> bool {
        let was_pressed = self.pressed.insert(button, pressed).unwrap_or(false);
        if !pressed || was_pressed {
            return false;
        }
        match self.last_fired.get(&button) {
            Some(last) if now.saturating_sub(*last) < self.min_interval => false,
            _ => {
                self.last_fired.insert(button, now);
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn press_fires_once_while_held_test() {
        let mut deb = Debouncer::new(ms(200));
        assert!(deb.update(Button::Blue, true, ms(0)));
        assert!(!deb.update(Button::Blue, true, ms(100)));
        assert!(!deb.update(Button::Blue, true, ms(500)));
        assert!(!deb.update(Button::Blue, false, ms(600)));
        assert!(deb.update(Button::Blue, true, ms(700)));
    }

    #[test]
    fn bounce_within_interval_is_dropped_test() {
        let mut deb = Debouncer::new(ms(200));
        assert!(deb.update(Button::Green, true, ms(1000)));
        assert!(!deb.update(Button::Green, false, ms(1050)));
        assert!(!deb.update(Button::Green, true, ms(1100)));
        assert!(!deb.update(Button::Green, false, ms(1150)));
        assert!(deb.update(Button::Green, true, ms(1200)));
    }

    #[test]
    fn buttons_are_independent_test() {
        let mut deb = Debouncer::new(ms(200));
        assert!(deb.update(Button::Red, true, ms(0)));
        assert!(deb.update(Button::Blue, true, ms(10)));
        assert!(!deb.update(Button::Green, false, ms(20)));
    }
}
