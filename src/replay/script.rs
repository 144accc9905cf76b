//! Compiled replay scripts
//!
//! A canonical log compiles to a flat list of primitive operations. Each log
//! line becomes a `Sleep`, then a `MoveCursor` for pointer events, then the
//! action itself.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use crate::error::{AutomatorError, AutomatorResult};
use crate::eventlog::{codec, CanonicalEntry, Event, HorizontalScroll, PointerButton, Symbol, VerticalScroll};

/// Digits beyond nanoseconds cannot be represented by a `Duration`
const MAX_PRECISION: u32 = 9;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Operation {
    Sleep(Duration),
    /// Instant teleport, not an animated drag
    MoveCursor { x: i32, y: i32 },
    KeyDown(Symbol),
    KeyUp(Symbol),
    ButtonDown(PointerButton),
    ButtonUp(PointerButton),
    /// Each of `dx`, `dy` is -1, 0 or 1; negative is left/up
    Scroll { dx: i8, dy: i8 },
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Sleep(d) => write!(f, "sleep {:?}", d),
            Operation::MoveCursor { x, y } => write!(f, "move {},{}", x, y),
            Operation::KeyDown(s) => write!(f, "key down {}", s),
            Operation::KeyUp(s) => write!(f, "key up {}", s),
            Operation::ButtonDown(b) => write!(f, "button down {}", b),
            Operation::ButtonUp(b) => write!(f, "button up {}", b),
            Operation::Scroll { dx, dy } => write!(f, "scroll {},{}", dx, dy),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OperationScript {
    operations: Vec<Operation>,
}

impl OperationScript {
    pub fn new(operations: Vec<Operation>) -> Self {
        Self { operations }
    }

    /// Compile canonical entries, rounding every delay to `time_precision` decimal digits
    pub fn from_entries(entries: &[CanonicalEntry], time_precision: u32) -> Self {
        let mut operations = Vec::with_capacity(entries.len() * 3);

        for entry in entries {
            operations.push(Operation::Sleep(round_delay(
                entry.since_previous,
                time_precision,
            )));
            if let Some((x, y)) = entry.event.position() {
                operations.push(Operation::MoveCursor { x, y });
            }
            operations.push(action_for(&entry.event));
        }

        Self { operations }
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Sum of all sleeps, i.e. the duration of one iteration
    pub fn total_delay(&self) -> Duration {
        self.operations
            .iter()
            .filter_map(|op| match op {
                Operation::Sleep(d) => Some(*d),
                _ => None,
            })
            .sum()
    }
}

/// Read and compile a canonical log
///
/// No file handle is held once this returns.
pub fn compile(canonical_log: &Path, time_precision: u32) -> AutomatorResult<OperationScript> {
    let compile_error = |line: usize, source: AutomatorError| AutomatorError::ScriptCompileError {
        path: canonical_log.to_path_buf(),
        line,
        source: Box::new(source),
    };

    let content = std::fs::read_to_string(canonical_log)
        .map_err(|e| compile_error(0, AutomatorError::read_failed(canonical_log, e)))?;

    let mut entries = Vec::new();
    for (index, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let entry = codec::decode_canonical(line).map_err(|e| compile_error(index + 1, e))?;
        entries.push(entry);
    }

    let script = OperationScript::from_entries(&entries, time_precision);
    tracing::debug!(
        "Compiled {} into {} operations ({:?} per iteration)",
        canonical_log.display(),
        script.len(),
        script.total_delay()
    );
    Ok(script)
}

fn round_delay(seconds: f64, precision: u32) -> Duration {
    let factor = 10f64.powi(precision.min(MAX_PRECISION) as i32);
    let rounded = (seconds.max(0.0) * factor).round() / factor;
    Duration::try_from_secs_f64(rounded).unwrap_or(Duration::MAX)
}

fn action_for(event: &Event) -> Operation {
    match *event {
        Event::KeyDown(symbol) => Operation::KeyDown(symbol),
        Event::KeyUp(symbol) => Operation::KeyUp(symbol),
        Event::ButtonDown { button, .. } => Operation::ButtonDown(button),
        Event::ButtonUp { button, .. } => Operation::ButtonUp(button),
        Event::ScrollVertical { direction, .. } => Operation::Scroll {
            dx: 0,
            dy: match direction {
                VerticalScroll::Up => -1,
                VerticalScroll::Down => 1,
            },
        },
        Event::ScrollHorizontal { direction, .. } => Operation::Scroll {
            dx: match direction {
                HorizontalScroll::Left => -1,
                HorizontalScroll::Right => 1,
            },
            dy: 0,
        },
    }
}
