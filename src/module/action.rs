//! Input to action mapping.
//!
//! Buttons and touch events are looked up against the current screen. Inputs
//! with no meaning on a screen map to nothing.

use crate::module::device::button::Button;
use crate::module::vision::crop::Point;

/// What the operator currently sees.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    /// No output location chosen.
    Idle,
    /// Live preview, ready to capture.
    Ready,
}

/// Touchscreen gestures over the live preview.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TouchEvent {
    Down(Point),
    Move(Point),
    Up(Point),
    ConfirmCrop,
    ResetCrop,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputSource {
    Button(Button),
    Touch(TouchEvent),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action {
    Quit,
    Configure,
    Capture,
    Combine,
    CropBegin(Point),
    CropUpdate(Point),
    CropFinish(Point),
    CropFinalize,
    CropReset,
}

/// Resolves an input on `screen` to an action.
pub fn lookup(screen: Screen, source: InputSource) -> Option<Action> {
    use Action::*;
    match (screen, source) {
        (_, InputSource::Button(Button::Red)) => Some(Quit),
        (Screen::Idle, InputSource::Button(_)) => Some(Configure),
        (Screen::Ready, InputSource::Button(Button::Blue)) => Some(Capture),
        (Screen::Ready, InputSource::Button(Button::Green)) => Some(Combine),
        (_, InputSource::Touch(touch)) => Some(match touch {
            TouchEvent::Down(p) => CropBegin(p),
            TouchEvent::Move(p) => CropUpdate(p),
            TouchEvent::Up(p) => CropFinish(p),
            TouchEvent::ConfirmCrop => CropFinalize,
            TouchEvent::ResetCrop => CropReset,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn red_always_quits_test() {
        for screen in [Screen::Idle, Screen::Ready] {
            assert_eq!(
                lookup(screen, InputSource::Button(Button::Red)),
                Some(Action::Quit)
            );
        }
    }

    #[test]
    fn ready_screen_test() {
        assert_eq!(
            lookup(Screen::Ready, InputSource::Button(Button::Blue)),
            Some(Action::Capture)
        );
        assert_eq!(
            lookup(Screen::Ready, InputSource::Button(Button::Green)),
            Some(Action::Combine)
        );
        let p = Point::new(3.0, 4.0);
        assert_eq!(
            lookup(Screen::Ready, InputSource::Touch(TouchEvent::Down(p))),
            Some(Action::CropBegin(p))
        );
        assert_eq!(
            lookup(Screen::Ready, InputSource::Touch(TouchEvent::ConfirmCrop)),
            Some(Action::CropFinalize)
        );
    }

    #[test]
    fn idle_screen_test() {
        assert_eq!(
            lookup(Screen::Idle, InputSource::Button(Button::Blue)),
            Some(Action::Configure)
        );
        // The work area can be marked before a location is chosen.
        assert_eq!(
            lookup(Screen::Idle, InputSource::Touch(TouchEvent::ResetCrop)),
            Some(Action::CropReset)
        );
        assert_eq!(
            lookup(Screen::Idle, InputSource::Button(Button::Green)),
            Some(Action::Configure)
        );
    }
}
