//! Input Automator - record mouse and keyboard activity, replay it on demand.
//!
//! This is the library crate behind the `automator` binary. It provides the
//! event log format, the recording session, the post-processing pass and the
//! replay engine.

pub mod capture;
pub mod config;
pub mod error;
pub mod eventlog;
pub mod platform;
pub mod processing;
pub mod replay;

pub use error::{AutomatorError, AutomatorResult, InjectionError};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing/logging on stderr, filtered by `RUST_LOG`
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "input_automator=info,automator=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::debug!("Input Automator v{}", env!("CARGO_PKG_VERSION"));
}
