//! Input capture
//!
//! A recording session listens to the keyboard and the pointer on two
//! independent threads and appends every event to a raw log through one
//! shared, serialized writer.

pub mod listener;
pub mod session;
pub mod timer;

pub use listener::{Device, EventHandler, InputSource, Listener, ListenerControl};
pub use session::{RecordOptions, RecordingOutput, RecordingSession};
pub use timer::{Stamp, Timer};
