//! Automator configuration
//!
//! Read from an optional JSON file; every field has a default. The recordings
//! directory can also be overridden with the `AUTOMATOR_DIR` environment variable.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::capture::RecordOptions;
use crate::error::{AutomatorError, AutomatorResult};
use crate::eventlog::{store::DEFAULT_EXTENSION, LogStore, NamedKey};
use crate::processing::PostProcessOptions;
use crate::replay::RunOptions;

pub const DIR_ENV_VAR: &str = "AUTOMATOR_DIR";
pub const DEFAULT_RECORDINGS_DIR: &str = "automation_logs";
pub const DEFAULT_TIME_PRECISION: u32 = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AutomatorConfig {
    pub recordings_dir: PathBuf,
    pub extension: String,
    /// Ends a recording and cancels a replay
    pub stop_key: NamedKey,
    /// Decimal digits kept from each replay delay
    pub time_precision: u32,
    pub repeat_count: u32,
    pub compress_held_keys: bool,
    pub keep_raw: bool,
}

impl Default for AutomatorConfig {
    fn default() -> Self {
        Self {
            recordings_dir: PathBuf::from(DEFAULT_RECORDINGS_DIR),
            extension: DEFAULT_EXTENSION.to_string(),
            stop_key: NamedKey::Escape,
            time_precision: DEFAULT_TIME_PRECISION,
            repeat_count: 1,
            compress_held_keys: true,
            keep_raw: false,
        }
    }
}

impl AutomatorConfig {
    /// Load from `path` if given, then apply environment overrides
    pub fn load(path: Option<&Path>) -> AutomatorResult<Self> {
        let mut config = match path {
            Some(path) => {
                let content = std::fs::read_to_string(path)
                    .map_err(|e| AutomatorError::read_failed(path, e))?;
                Self::from_json(&content)?
            }
            None => Self::default(),
        };

        if let Ok(dir) = std::env::var(DIR_ENV_VAR) {
            if !dir.is_empty() {
                config.recordings_dir = PathBuf::from(dir);
            }
        }

        config.validate()?;
        tracing::debug!("Loaded configuration: {:?}", config);
        Ok(config)
    }

    pub fn from_json(content: &str) -> AutomatorResult<Self> {
        serde_json::from_str(content)
            .map_err(|e| AutomatorError::InvalidConfiguration(e.to_string()))
    }

    pub fn validate(&self) -> AutomatorResult<()> {
        if self.repeat_count < 1 {
            return Err(AutomatorError::InvalidConfiguration(
                "repeatCount must be at least 1".to_string(),
            ));
        }
        if self.extension.is_empty() || self.extension.contains('.') {
            return Err(AutomatorError::InvalidConfiguration(format!(
                "invalid log extension `{}`",
                self.extension
            )));
        }
        Ok(())
    }

    pub fn store(&self) -> LogStore {
        LogStore::new(&self.recordings_dir, &self.extension)
    }

    pub fn record_options(&self, name: impl Into<String>) -> RecordOptions {
        RecordOptions {
            stop_key: self.stop_key,
            compress_held_keys: self.compress_held_keys,
            keep_raw: self.keep_raw,
            ..RecordOptions::new(name)
        }
    }

    pub fn post_process_options(&self) -> PostProcessOptions {
        PostProcessOptions {
            compress_held_keys: self.compress_held_keys,
            keep_raw: self.keep_raw,
        }
    }

    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            repeat_count: self.repeat_count,
            stop_key: self.stop_key,
        }
    }
}

/// Parse a stop key given by name. Literal characters are not accepted.
pub fn parse_stop_key(token: &str) -> AutomatorResult<NamedKey> {
    if token.chars().count() == 1 {
        return Err(AutomatorError::InvalidConfiguration(format!(
            "stop key must be a named key, not the character `{}`",
            token
        )));
    }
    token.parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_when_fields_missing() {
        let config = AutomatorConfig::from_json("{}").unwrap();
        assert_eq!(config, AutomatorConfig::default());
        assert_eq!(config.stop_key, NamedKey::Escape);
        assert_eq!(config.recordings_dir, PathBuf::from("automation_logs"));
    }

    #[test]
    fn reads_camel_case_fields() {
        let config = AutomatorConfig::from_json(
            r#"{"recordingsDir": "/tmp/rec", "stopKey": "f9", "timePrecision": 3, "keepRaw": true}"#,
        )
        .unwrap();
        assert_eq!(config.recordings_dir, PathBuf::from("/tmp/rec"));
        assert_eq!(config.stop_key, NamedKey::F(9));
        assert_eq!(config.time_precision, 3);
        assert!(config.keep_raw);
        assert!(config.compress_held_keys);
    }

    #[test]
    fn unknown_stop_key_is_rejected() {
        assert!(matches!(
            AutomatorConfig::from_json(r#"{"stopKey": "hyper"}"#),
            Err(AutomatorError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn zero_repeat_count_fails_validation() {
        let config = AutomatorConfig::from_json(r#"{"repeatCount": 0}"#).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn load_reads_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("automator.json");
        std::fs::write(&path, r#"{"extension": "txt", "repeatCount": 4}"#).unwrap();

        let config = AutomatorConfig::load(Some(&path)).unwrap();
        assert_eq!(config.extension, "txt");
        assert_eq!(config.run_options().repeat_count, 4);
        assert_eq!(config.store().canonical_path("a").extension().unwrap(), "txt");
    }

    #[test]
    fn stop_key_must_be_named() {
        assert_eq!(parse_stop_key("esc").unwrap(), NamedKey::Escape);
        assert!(parse_stop_key("q").is_err());
        assert!(parse_stop_key("nope").is_err());
    }
}
