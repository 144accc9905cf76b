//! Replay of canonical logs
//!
//! A log is compiled once into an [`OperationScript`], then played by the
//! [`ReplayEngine`] as many times as requested. A keyboard listener watches for
//! the stop key while the script runs.

pub mod engine;
pub mod script;
pub mod sink;

pub use engine::{CancelHandle, ReplayEngine, RunOptions, RunResult};
pub use script::{compile, Operation, OperationScript};
pub use sink::InputSink;
