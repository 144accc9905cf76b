//! OS input backend
//!
//! Listening and synthesis both go through `rdev`, which supports X11, macOS
//! and Windows. On macOS the process needs the Accessibility permission; when
//! it is missing, subscribing fails with `ListenerStartFailed`.

pub mod keymap;
pub mod listen;
pub mod simulate;

pub use listen::RdevSource;
pub use simulate::RdevSink;
