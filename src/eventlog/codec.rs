//! Event-line codec
//!
//! One event per line, space separated:
//!
//! ```text
//! raw:       <marker><payload> [<x>,<y>] <since_start> <since_previous>
//! canonical: <marker><payload> [<x>,<y>] <since_previous>
//! ```
//!
//! The position group is present exactly for pointer events.

use crate::error::{AutomatorError, AutomatorResult};
use crate::eventlog::types::{
    CanonicalEntry, Event, HorizontalScroll, PointerButton, RawEntry, Symbol, VerticalScroll,
};

pub const KEY_DOWN: char = '+';
pub const KEY_UP: char = '-';
pub const BUTTON_DOWN: char = '1';
pub const BUTTON_UP: char = '0';
pub const SCROLL_UP: char = '^';
pub const SCROLL_DOWN: char = '_';
pub const SCROLL_LEFT: char = '<';
pub const SCROLL_RIGHT: char = '>';

/// Encode a raw log line (no trailing newline)
pub fn encode_raw(entry: &RawEntry) -> String {
    format!(
        "{} {} {}",
        encode_event(&entry.event),
        entry.since_start,
        entry.since_previous
    )
}

/// Encode a canonical log line (no trailing newline)
pub fn encode_canonical(entry: &CanonicalEntry) -> String {
    format!("{} {}", encode_event(&entry.event), entry.since_previous)
}

pub fn decode_raw(line: &str) -> AutomatorResult<RawEntry> {
    let (event, timings) = decode_fields(line, 2)?;
    Ok(RawEntry {
        event,
        since_start: timings[0],
        since_previous: timings[1],
    })
}

pub fn decode_canonical(line: &str) -> AutomatorResult<CanonicalEntry> {
    let (event, timings) = decode_fields(line, 1)?;
    Ok(CanonicalEntry {
        event,
        since_previous: timings[0],
    })
}

/// Marker, payload and (for pointer events) the position group.
pub fn encode_event(event: &Event) -> String {
    match event {
        Event::KeyDown(symbol) => format!("{}{}", KEY_DOWN, symbol),
        Event::KeyUp(symbol) => format!("{}{}", KEY_UP, symbol),
        Event::ButtonDown { button, x, y } => format!("{}{} {},{}", BUTTON_DOWN, button, x, y),
        Event::ButtonUp { button, x, y } => format!("{}{} {},{}", BUTTON_UP, button, x, y),
        Event::ScrollVertical { direction, x, y } => {
            let marker = match direction {
                VerticalScroll::Up => SCROLL_UP,
                VerticalScroll::Down => SCROLL_DOWN,
            };
            format!("{} {},{}", marker, x, y)
        }
        Event::ScrollHorizontal { direction, x, y } => {
            let marker = match direction {
                HorizontalScroll::Left => SCROLL_LEFT,
                HorizontalScroll::Right => SCROLL_RIGHT,
            };
            format!("{} {},{}", marker, x, y)
        }
    }
}

fn is_pointer_marker(marker: char) -> bool {
    matches!(
        marker,
        BUTTON_DOWN | BUTTON_UP | SCROLL_UP | SCROLL_DOWN | SCROLL_LEFT | SCROLL_RIGHT
    )
}

fn decode_fields(line: &str, timing_fields: usize) -> AutomatorResult<(Event, Vec<f64>)> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    let minimum = 1 + timing_fields;
    if fields.len() < minimum {
        return Err(AutomatorError::malformed(
            line,
            format!("expected at least {} fields, found {}", minimum, fields.len()),
        ));
    }

    let token = fields[0];
    let mut chars = token.chars();
    let marker = chars.next().unwrap_or_default();
    let payload = chars.as_str();

    let is_key = marker == KEY_DOWN || marker == KEY_UP;
    if !is_key && !is_pointer_marker(marker) {
        return Err(AutomatorError::malformed(
            line,
            format!("unknown marker `{}`", marker),
        ));
    }

    let expected = if is_key { minimum } else { minimum + 1 };
    if fields.len() != expected {
        return Err(AutomatorError::malformed(
            line,
            format!("expected {} fields, found {}", expected, fields.len()),
        ));
    }

    let timings = fields[expected - timing_fields..]
        .iter()
        .map(|f| parse_seconds(line, f))
        .collect::<AutomatorResult<Vec<f64>>>()?;

    let event = if is_key {
        let symbol = Symbol::parse(payload).map_err(|e| AutomatorError::malformed(line, e.to_string()))?;
        if marker == KEY_DOWN {
            Event::KeyDown(symbol)
        } else {
            Event::KeyUp(symbol)
        }
    } else {
        let (x, y) = parse_position(line, fields[1])?;
        decode_pointer(line, marker, payload, x, y)?
    };

    Ok((event, timings))
}

fn decode_pointer(line: &str, marker: char, payload: &str, x: i32, y: i32) -> AutomatorResult<Event> {
    if matches!(marker, BUTTON_DOWN | BUTTON_UP) {
        let button: PointerButton = payload
            .parse()
            .map_err(|e: AutomatorError| AutomatorError::malformed(line, e.to_string()))?;
        return Ok(if marker == BUTTON_DOWN {
            Event::ButtonDown { button, x, y }
        } else {
            Event::ButtonUp { button, x, y }
        });
    }

    if !payload.is_empty() {
        return Err(AutomatorError::malformed(line, "scroll marker takes no payload"));
    }

    Ok(match marker {
        SCROLL_UP => Event::ScrollVertical {
            direction: VerticalScroll::Up,
            x,
            y,
        },
        SCROLL_DOWN => Event::ScrollVertical {
            direction: VerticalScroll::Down,
            x,
            y,
        },
        SCROLL_LEFT => Event::ScrollHorizontal {
            direction: HorizontalScroll::Left,
            x,
            y,
        },
        _ => Event::ScrollHorizontal {
            direction: HorizontalScroll::Right,
            x,
            y,
        },
    })
}

fn parse_position(line: &str, field: &str) -> AutomatorResult<(i32, i32)> {
    let (x, y) = field
        .split_once(',')
        .ok_or_else(|| AutomatorError::malformed(line, format!("bad position `{}`", field)))?;
    match (x.parse::<i32>(), y.parse::<i32>()) {
        (Ok(x), Ok(y)) => Ok((x, y)),
        _ => Err(AutomatorError::malformed(
            line,
            format!("bad position `{}`", field),
        )),
    }
}

fn parse_seconds(line: &str, field: &str) -> AutomatorResult<f64> {
    match field.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(AutomatorError::malformed(
            line,
            format!("bad timestamp `{}`", field),
        )),
    }
}
