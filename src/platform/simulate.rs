//! Input synthesis on top of `rdev::simulate`.

use rdev::EventType;

use crate::error::InjectionError;
use crate::platform::keymap;
use crate::replay::{InputSink, Operation};

/// [`InputSink`] that synthesizes real OS input events
#[derive(Debug, Default, Clone, Copy)]
pub struct RdevSink;

impl RdevSink {
    pub fn new() -> Self {
        Self
    }
}

impl InputSink for RdevSink {
    fn perform(&mut self, operation: &Operation) -> Result<(), InjectionError> {
        let Some(event_type) = event_type_for(operation)? else {
            return Ok(());
        };
        rdev::simulate(&event_type)
            .map_err(|e| InjectionError::new(operation, format!("OS rejected event: {:?}", e)))
    }
}

/// The rdev event for an operation; `None` for operations that synthesize nothing
fn event_type_for(operation: &Operation) -> Result<Option<EventType>, InjectionError> {
    let key = |symbol| {
        keymap::key_for_symbol(symbol).ok_or_else(|| {
            InjectionError::new(operation, format!("no physical key for `{}`", symbol))
        })
    };

    let event_type = match *operation {
        Operation::Sleep(_) => return Ok(None),
        Operation::MoveCursor { x, y } => EventType::MouseMove {
            x: x as f64,
            y: y as f64,
        },
        Operation::KeyDown(symbol) => EventType::KeyPress(key(symbol)?),
        Operation::KeyUp(symbol) => EventType::KeyRelease(key(symbol)?),
        Operation::ButtonDown(button) => EventType::ButtonPress(keymap::rdev_button(button)),
        Operation::ButtonUp(button) => EventType::ButtonRelease(keymap::rdev_button(button)),
        Operation::Scroll { dx, dy } => EventType::Wheel {
            delta_x: dx as i64,
            // log convention is screen-down positive, rdev's is up positive
            delta_y: -(dy as i64),
        },
    };
    Ok(Some(event_type))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eventlog::{PointerButton, Symbol};
    use std::time::Duration;

    #[test]
    fn scroll_up_becomes_positive_wheel_delta() {
        let event = event_type_for(&Operation::Scroll { dx: 0, dy: -1 }).unwrap();
        assert_eq!(
            event,
            Some(EventType::Wheel {
                delta_x: 0,
                delta_y: 1
            })
        );
    }

    #[test]
    fn sleep_synthesizes_nothing() {
        assert_eq!(
            event_type_for(&Operation::Sleep(Duration::from_millis(5))).unwrap(),
            None
        );
    }

    #[test]
    fn unmappable_character_is_injection_error() {
        let op = Operation::KeyDown(Symbol::Char('€'));
        let err = event_type_for(&op).unwrap_err();
        assert_eq!(err.operation, op);
    }

    #[test]
    fn buttons_and_moves_map_directly() {
        assert_eq!(
            event_type_for(&Operation::ButtonUp(PointerButton::Right)).unwrap(),
            Some(EventType::ButtonRelease(rdev::Button::Right))
        );
        assert_eq!(
            event_type_for(&Operation::MoveCursor { x: 3, y: 4 }).unwrap(),
            Some(EventType::MouseMove { x: 3.0, y: 4.0 })
        );
    }
}
