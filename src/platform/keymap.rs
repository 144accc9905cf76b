//! Mapping between rdev keys/buttons and the log vocabulary.
//!
//! Printable keys map to the character of their unshifted US layout, so a
//! press and its release always carry the same symbol.

use rdev::{Button, Key};

use crate::eventlog::{NamedKey, PointerButton, Symbol};

const CHAR_KEYS: &[(char, Key)] = &[
    ('a', Key::KeyA),
    ('b', Key::KeyB),
    ('c', Key::KeyC),
    ('d', Key::KeyD),
    ('e', Key::KeyE),
    ('f', Key::KeyF),
    ('g', Key::KeyG),
    ('h', Key::KeyH),
    ('i', Key::KeyI),
    ('j', Key::KeyJ),
    ('k', Key::KeyK),
    ('l', Key::KeyL),
    ('m', Key::KeyM),
    ('n', Key::KeyN),
    ('o', Key::KeyO),
    ('p', Key::KeyP),
    ('q', Key::KeyQ),
    ('r', Key::KeyR),
    ('s', Key::KeyS),
    ('t', Key::KeyT),
    ('u', Key::KeyU),
    ('v', Key::KeyV),
    ('w', Key::KeyW),
    ('x', Key::KeyX),
    ('y', Key::KeyY),
    ('z', Key::KeyZ),
    ('0', Key::Num0),
    ('1', Key::Num1),
    ('2', Key::Num2),
    ('3', Key::Num3),
    ('4', Key::Num4),
    ('5', Key::Num5),
    ('6', Key::Num6),
    ('7', Key::Num7),
    ('8', Key::Num8),
    ('9', Key::Num9),
    ('-', Key::Minus),
    ('=', Key::Equal),
    ('[', Key::LeftBracket),
    (']', Key::RightBracket),
    (';', Key::SemiColon),
    ('\'', Key::Quote),
    ('\\', Key::BackSlash),
    (',', Key::Comma),
    ('.', Key::Dot),
    ('/', Key::Slash),
    ('`', Key::BackQuote),
];

const NAMED_KEYS: &[(NamedKey, Key)] = &[
    (NamedKey::Escape, Key::Escape),
    (NamedKey::Enter, Key::Return),
    (NamedKey::Tab, Key::Tab),
    (NamedKey::Space, Key::Space),
    (NamedKey::Backspace, Key::Backspace),
    (NamedKey::Delete, Key::Delete),
    (NamedKey::Insert, Key::Insert),
    (NamedKey::Home, Key::Home),
    (NamedKey::End, Key::End),
    (NamedKey::PageUp, Key::PageUp),
    (NamedKey::PageDown, Key::PageDown),
    (NamedKey::Up, Key::UpArrow),
    (NamedKey::Down, Key::DownArrow),
    (NamedKey::Left, Key::LeftArrow),
    (NamedKey::Right, Key::RightArrow),
    (NamedKey::Shift, Key::ShiftLeft),
    (NamedKey::ShiftRight, Key::ShiftRight),
    (NamedKey::Ctrl, Key::ControlLeft),
    (NamedKey::CtrlRight, Key::ControlRight),
    (NamedKey::Alt, Key::Alt),
    (NamedKey::AltGr, Key::AltGr),
    (NamedKey::Cmd, Key::MetaLeft),
    (NamedKey::CmdRight, Key::MetaRight),
    (NamedKey::CapsLock, Key::CapsLock),
    (NamedKey::NumLock, Key::NumLock),
    (NamedKey::ScrollLock, Key::ScrollLock),
    (NamedKey::PrintScreen, Key::PrintScreen),
    (NamedKey::Pause, Key::Pause),
    (NamedKey::Function, Key::Function),
    (NamedKey::IntlBackslash, Key::IntlBackslash),
    (NamedKey::F(1), Key::F1),
    (NamedKey::F(2), Key::F2),
    (NamedKey::F(3), Key::F3),
    (NamedKey::F(4), Key::F4),
    (NamedKey::F(5), Key::F5),
    (NamedKey::F(6), Key::F6),
    (NamedKey::F(7), Key::F7),
    (NamedKey::F(8), Key::F8),
    (NamedKey::F(9), Key::F9),
    (NamedKey::F(10), Key::F10),
    (NamedKey::F(11), Key::F11),
    (NamedKey::F(12), Key::F12),
    (NamedKey::Keypad(0), Key::Kp0),
    (NamedKey::Keypad(1), Key::Kp1),
    (NamedKey::Keypad(2), Key::Kp2),
    (NamedKey::Keypad(3), Key::Kp3),
    (NamedKey::Keypad(4), Key::Kp4),
    (NamedKey::Keypad(5), Key::Kp5),
    (NamedKey::Keypad(6), Key::Kp6),
    (NamedKey::Keypad(7), Key::Kp7),
    (NamedKey::Keypad(8), Key::Kp8),
    (NamedKey::Keypad(9), Key::Kp9),
    (NamedKey::KeypadEnter, Key::KpReturn),
    (NamedKey::KeypadPlus, Key::KpPlus),
    (NamedKey::KeypadMinus, Key::KpMinus),
    (NamedKey::KeypadMultiply, Key::KpMultiply),
    (NamedKey::KeypadDivide, Key::KpDivide),
    (NamedKey::KeypadDelete, Key::KpDelete),
];

pub fn symbol_for_key(key: Key) -> Symbol {
    if let Some((c, _)) = CHAR_KEYS.iter().find(|(_, k)| *k == key) {
        return Symbol::Char(*c);
    }
    if let Some((named, _)) = NAMED_KEYS.iter().find(|(_, k)| *k == key) {
        return Symbol::Named(*named);
    }
    match key {
        Key::Unknown(code) => Symbol::Named(NamedKey::Code(code)),
        // every other rdev key is covered by the tables above
        _ => Symbol::Named(NamedKey::Code(0)),
    }
}

/// Physical key for a symbol; upper-case letters share the lower-case key
pub fn key_for_symbol(symbol: Symbol) -> Option<Key> {
    match symbol {
        Symbol::Char(c) => {
            let c = c.to_ascii_lowercase();
            CHAR_KEYS.iter().find(|(ch, _)| *ch == c).map(|(_, k)| *k)
        }
        Symbol::Named(NamedKey::Code(code)) => Some(Key::Unknown(code)),
        Symbol::Named(named) => NAMED_KEYS
            .iter()
            .find(|(n, _)| *n == named)
            .map(|(_, k)| *k),
    }
}

pub fn pointer_button(button: Button) -> PointerButton {
    match button {
        Button::Left => PointerButton::Left,
        Button::Right => PointerButton::Right,
        Button::Middle => PointerButton::Middle,
        Button::Unknown(n) => PointerButton::Other(n),
    }
}

pub fn rdev_button(button: PointerButton) -> Button {
    match button {
        PointerButton::Left => Button::Left,
        PointerButton::Right => Button::Right,
        PointerButton::Middle => Button::Middle,
        PointerButton::Other(n) => Button::Unknown(n),
    }
}
