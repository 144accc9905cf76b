//! Post-recording transformations
//!
//! Raw logs are turned into canonical logs here before replay.

pub mod compress;

pub use compress::{compress, compress_entries, PostProcessOptions};
