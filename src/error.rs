//! Error taxonomy shared by recording, post-processing and replay.

use std::path::PathBuf;
use thiserror::Error;

use crate::replay::Operation;

/// Errors that can occur while recording, compressing or replaying a log
#[derive(Error, Debug)]
pub enum AutomatorError {
    #[error("Malformed line {line:?}: {reason}")]
    MalformedLine { line: String, reason: String },

    #[error("Listener start failed: {0}")]
    ListenerStartFailed(String),

    #[error("Failed to write {}: {source}", path.display())]
    FileWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read {}: {source}", path.display())]
    FileReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot compile {} (line {line}): {source}", path.display())]
    ScriptCompileError {
        path: PathBuf,
        /// 1-based; 0 when the file itself could not be read
        line: usize,
        #[source]
        source: Box<AutomatorError>,
    },

    #[error(transparent)]
    InjectionError(#[from] InjectionError),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

impl AutomatorError {
    pub(crate) fn malformed(line: &str, reason: impl Into<String>) -> Self {
        AutomatorError::MalformedLine {
            line: line.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn write_failed(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        AutomatorError::FileWriteFailed {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn read_failed(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        AutomatorError::FileReadFailed {
            path: path.into(),
            source,
        }
    }
}

/// The OS refused to synthesize an input event
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Injection of `{operation}` failed: {reason}")]
pub struct InjectionError {
    pub operation: Operation,
    pub reason: String,
}

impl InjectionError {
    pub fn new(operation: &Operation, reason: impl Into<String>) -> Self {
        Self {
            operation: operation.clone(),
            reason: reason.into(),
        }
    }
}

/// Result type for automator operations
pub type AutomatorResult<T> = Result<T, AutomatorError>;
