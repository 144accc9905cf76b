use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::AutomatorError;

/// A key the log vocabulary knows by name rather than by character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum NamedKey {
    Escape,
    Enter,
    Tab,
    Space,
    Backspace,
    Delete,
    Insert,
    Home,
    End,
    PageUp,
    PageDown,
    Up,
    Down,
    Left,
    Right,
    Shift,
    ShiftRight,
    Ctrl,
    CtrlRight,
    Alt,
    AltGr,
    Cmd,
    CmdRight,
    CapsLock,
    NumLock,
    ScrollLock,
    PrintScreen,
    Pause,
    Function,
    IntlBackslash,
    /// Function keys `f1`..`f12`
    F(u8),
    /// Keypad digits `kp_0`..`kp_9`
    Keypad(u8),
    KeypadEnter,
    KeypadPlus,
    KeypadMinus,
    KeypadMultiply,
    KeypadDivide,
    KeypadDelete,
    /// OS key code with no name in the vocabulary, written as `<n>`
    Code(u32),
}

const NAMED_TOKENS: &[(NamedKey, &str)] = &[
    (NamedKey::Escape, "esc"),
    (NamedKey::Enter, "enter"),
    (NamedKey::Tab, "tab"),
    (NamedKey::Space, "space"),
    (NamedKey::Backspace, "backspace"),
    (NamedKey::Delete, "delete"),
    (NamedKey::Insert, "insert"),
    (NamedKey::Home, "home"),
    (NamedKey::End, "end"),
    (NamedKey::PageUp, "page_up"),
    (NamedKey::PageDown, "page_down"),
    (NamedKey::Up, "up"),
    (NamedKey::Down, "down"),
    (NamedKey::Left, "left"),
    (NamedKey::Right, "right"),
    (NamedKey::Shift, "shift"),
    (NamedKey::ShiftRight, "shift_r"),
    (NamedKey::Ctrl, "ctrl"),
    (NamedKey::CtrlRight, "ctrl_r"),
    (NamedKey::Alt, "alt"),
    (NamedKey::AltGr, "alt_gr"),
    (NamedKey::Cmd, "cmd"),
    (NamedKey::CmdRight, "cmd_r"),
    (NamedKey::CapsLock, "caps_lock"),
    (NamedKey::NumLock, "num_lock"),
    (NamedKey::ScrollLock, "scroll_lock"),
    (NamedKey::PrintScreen, "print_screen"),
    (NamedKey::Pause, "pause"),
    (NamedKey::Function, "fn"),
    (NamedKey::IntlBackslash, "intl_backslash"),
    (NamedKey::KeypadEnter, "kp_enter"),
    (NamedKey::KeypadPlus, "kp_plus"),
    (NamedKey::KeypadMinus, "kp_minus"),
    (NamedKey::KeypadMultiply, "kp_multiply"),
    (NamedKey::KeypadDivide, "kp_divide"),
    (NamedKey::KeypadDelete, "kp_delete"),
];

impl fmt::Display for NamedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NamedKey::F(n) => write!(f, "f{}", n),
            NamedKey::Keypad(n) => write!(f, "kp_{}", n),
            NamedKey::Code(code) => write!(f, "<{}>", code),
            key => {
                let token = NAMED_TOKENS
                    .iter()
                    .find(|(k, _)| k == key)
                    .map(|(_, t)| *t)
                    .unwrap_or("?");
                f.write_str(token)
            }
        }
    }
}

impl FromStr for NamedKey {
    type Err = AutomatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some((key, _)) = NAMED_TOKENS.iter().find(|(_, t)| *t == s) {
            return Ok(*key);
        }

        let unknown = || AutomatorError::InvalidConfiguration(format!("unknown key name `{}`", s));

        if let Some(code) = s.strip_prefix('<').and_then(|r| r.strip_suffix('>')) {
            return code.parse::<u32>().map(NamedKey::Code).map_err(|_| unknown());
        }
        if let Some(digit) = s.strip_prefix("kp_") {
            return match digit.parse::<u8>() {
                Ok(n) if n <= 9 => Ok(NamedKey::Keypad(n)),
                _ => Err(unknown()),
            };
        }
        if let Some(n) = s.strip_prefix('f') {
            return match n.parse::<u8>() {
                Ok(n) if (1..=12).contains(&n) => Ok(NamedKey::F(n)),
                _ => Err(unknown()),
            };
        }

        Err(unknown())
    }
}

impl TryFrom<String> for NamedKey {
    type Error = AutomatorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<NamedKey> for String {
    fn from(key: NamedKey) -> Self {
        key.to_string()
    }
}

/// What a key event carries: a literal character or a named key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Symbol {
    Char(char),
    Named(NamedKey),
}

impl Symbol {
    /// Parses a key payload. One character is a literal, anything longer is a key name.
    pub fn parse(payload: &str) -> Result<Self, AutomatorError> {
        let mut chars = payload.chars();
        match (chars.next(), chars.next()) {
            (None, _) => Err(AutomatorError::InvalidConfiguration(
                "empty key token".to_string(),
            )),
            (Some(c), None) => Ok(Symbol::from_char(c)),
            _ => payload.parse().map(Symbol::Named),
        }
    }

    /// Symbol for a typed character; whitespace becomes its named key
    pub fn from_char(c: char) -> Self {
        match c {
            ' ' => Symbol::Named(NamedKey::Space),
            '\t' => Symbol::Named(NamedKey::Tab),
            '\n' | '\r' => Symbol::Named(NamedKey::Enter),
            c => Symbol::Char(c),
        }
    }

    pub fn is_named(&self, key: NamedKey) -> bool {
        matches!(self, Symbol::Named(k) if *k == key)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Symbol::Char(c) => match Symbol::from_char(*c) {
                Symbol::Named(key) => write!(f, "{}", key),
                Symbol::Char(c) => write!(f, "{}", c),
            },
            Symbol::Named(key) => write!(f, "{}", key),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointerButton {
    Left,
    Right,
    Middle,
    Other(u8),
}

impl fmt::Display for PointerButton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PointerButton::Left => write!(f, "left"),
            PointerButton::Right => write!(f, "right"),
            PointerButton::Middle => write!(f, "middle"),
            PointerButton::Other(n) => write!(f, "button{}", n),
        }
    }
}

impl FromStr for PointerButton {
    type Err = AutomatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "left" => Ok(PointerButton::Left),
            "right" => Ok(PointerButton::Right),
            "middle" => Ok(PointerButton::Middle),
            other => other
                .strip_prefix("button")
                .and_then(|n| n.parse::<u8>().ok())
                .map(PointerButton::Other)
                .ok_or_else(|| {
                    AutomatorError::InvalidConfiguration(format!("unknown button `{}`", s))
                }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VerticalScroll {
    Up,
    Down,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HorizontalScroll {
    Left,
    Right,
}

/// One captured input action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Event {
    KeyDown(Symbol),
    KeyUp(Symbol),
    ButtonDown {
        button: PointerButton,
        x: i32,
        y: i32,
    },
    ButtonUp {
        button: PointerButton,
        x: i32,
        y: i32,
    },
    ScrollVertical {
        direction: VerticalScroll,
        x: i32,
        y: i32,
    },
    ScrollHorizontal {
        direction: HorizontalScroll,
        x: i32,
        y: i32,
    },
}

impl Event {
    /// Pointer position at the time of the event; `None` for key events.
    pub fn position(&self) -> Option<(i32, i32)> {
        match *self {
            Event::KeyDown(_) | Event::KeyUp(_) => None,
            Event::ButtonDown { x, y, .. }
            | Event::ButtonUp { x, y, .. }
            | Event::ScrollVertical { x, y, .. }
            | Event::ScrollHorizontal { x, y, .. } => Some((x, y)),
        }
    }

    pub fn is_keyboard(&self) -> bool {
        matches!(self, Event::KeyDown(_) | Event::KeyUp(_))
    }
}

/// One line of a raw log.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawEntry {
    pub event: Event,
    /// Seconds since the recording started
    pub since_start: f64,
    /// Seconds since the previous recorded event
    pub since_previous: f64,
}

/// One line of a canonical (replay-ready) log.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CanonicalEntry {
    pub event: Event,
    /// Seconds to wait after the previous entry
    pub since_previous: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_key_tokens_round_trip() {
        let keys = [
            NamedKey::Escape,
            NamedKey::ShiftRight,
            NamedKey::PageDown,
            NamedKey::F(12),
            NamedKey::Keypad(7),
            NamedKey::KeypadEnter,
            NamedKey::Code(65),
        ];
        for key in keys {
            assert_eq!(key.to_string().parse::<NamedKey>().unwrap(), key);
        }
    }

    #[test]
    fn rejects_unknown_key_names() {
        assert!("escape_key".parse::<NamedKey>().is_err());
        assert!("f0".parse::<NamedKey>().is_err());
        assert!("f13".parse::<NamedKey>().is_err());
        assert!("kp_10".parse::<NamedKey>().is_err());
        assert!("<x>".parse::<NamedKey>().is_err());
    }

    #[test]
    fn symbol_length_decides_literal_or_named() {
        assert_eq!(Symbol::parse("a").unwrap(), Symbol::Char('a'));
        assert_eq!(Symbol::parse("é").unwrap(), Symbol::Char('é'));
        assert_eq!(
            Symbol::parse("esc").unwrap(),
            Symbol::Named(NamedKey::Escape)
        );
        assert!(Symbol::parse("").is_err());
    }

    #[test]
    fn named_key_deserializes_from_token() {
        let key: NamedKey = serde_json::from_str("\"f5\"").unwrap();
        assert_eq!(key, NamedKey::F(5));
        assert_eq!(serde_json::to_string(&NamedKey::Escape).unwrap(), "\"esc\"");
        assert!(serde_json::from_str::<NamedKey>("\"nope\"").is_err());
    }

    #[test]
    fn button_tokens() {
        assert_eq!("middle".parse::<PointerButton>().unwrap(), PointerButton::Middle);
        assert_eq!("button8".parse::<PointerButton>().unwrap(), PointerButton::Other(8));
        assert_eq!(PointerButton::Other(4).to_string(), "button4");
        assert!("wheel".parse::<PointerButton>().is_err());
    }
}
