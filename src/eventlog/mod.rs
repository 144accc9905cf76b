//! Event log format and storage
//!
//! A recording is a plain-text file with one event per line. Raw logs carry
//! absolute and relative timestamps; canonical logs carry only the delay since
//! the previous line and are what replay consumes.

pub mod codec;
pub mod store;
pub mod types;

pub use codec::{decode_canonical, decode_raw, encode_canonical, encode_raw};
pub use store::LogStore;
pub use types::{
    CanonicalEntry, Event, HorizontalScroll, NamedKey, PointerButton, RawEntry, Symbol,
    VerticalScroll,
};
