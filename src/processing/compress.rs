//! Raw log post-processing
//!
//! Turns a raw recording into a canonical, replay-ready log:
//! - OS key-repeat produces a stream of `KeyDown` lines while a key is held;
//!   only the first one is kept.
//! - the absolute timestamp column is dropped and the delay to the previous
//!   line is recomputed from it.

use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{AutomatorError, AutomatorResult};
use crate::eventlog::{codec, CanonicalEntry, Event, LogStore, RawEntry, Symbol};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PostProcessOptions {
    /// Drop repeated `KeyDown` lines of a key that is already held
    pub compress_held_keys: bool,
    /// Keep the raw log next to the canonical one
    pub keep_raw: bool,
}

impl Default for PostProcessOptions {
    fn default() -> Self {
        Self {
            compress_held_keys: true,
            keep_raw: false,
        }
    }
}

/// Compress raw entries into canonical entries
///
/// Each emitted entry's delay is measured from the previous *emitted* entry,
/// so every kept event lands at the same offset from the start as it was
/// recorded, and the delays add up to the last recorded `since_start`.
///
/// # Arguments
/// * `entries` - Raw entries in recorded order
/// * `compress_held_keys` - Whether repeated key-downs of a held key are dropped
pub fn compress_entries(entries: &[RawEntry], compress_held_keys: bool) -> Vec<CanonicalEntry> {
    let mut held: HashSet<Symbol> = HashSet::new();
    let mut previous_time = 0.0;
    let mut result = Vec::with_capacity(entries.len());

    for entry in entries {
        match entry.event {
            Event::KeyDown(symbol) if compress_held_keys => {
                if !held.insert(symbol) {
                    continue;
                }
            }
            Event::KeyUp(symbol) => {
                // may not be held, e.g. pressed before recording started
                held.remove(&symbol);
            }
            _ => {}
        }

        result.push(CanonicalEntry {
            event: entry.event,
            since_previous: entry.since_start - previous_time,
        });
        previous_time = entry.since_start;
    }

    result
}

/// Post-process a raw log file into its canonical counterpart
///
/// The canonical file is the raw path without its `_RAW` suffix. It is written
/// to a temporary file in the same directory and moved into place, so a failed
/// pass never leaves a truncated canonical log behind.
///
/// # Returns
/// Path of the canonical log
pub fn compress(raw_log: &Path, options: PostProcessOptions) -> AutomatorResult<PathBuf> {
    let canonical_log = LogStore::canonical_path_for_raw(raw_log).ok_or_else(|| {
        AutomatorError::InvalidConfiguration(format!(
            "{} is not a raw log",
            raw_log.display()
        ))
    })?;

    let content =
        std::fs::read_to_string(raw_log).map_err(|e| AutomatorError::read_failed(raw_log, e))?;

    let mut entries = Vec::new();
    for (index, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let entry = codec::decode_raw(line).map_err(|e| {
            tracing::error!("{}:{}: {}", raw_log.display(), index + 1, e);
            e
        })?;
        entries.push(entry);
    }

    let canonical = compress_entries(&entries, options.compress_held_keys);

    let dir = canonical_log
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(dir)
        .map_err(|e| AutomatorError::write_failed(dir, e))?;
    {
        let mut writer = std::io::BufWriter::new(tmp.as_file_mut());
        for entry in &canonical {
            writeln!(writer, "{}", codec::encode_canonical(entry))
                .map_err(|e| AutomatorError::write_failed(&canonical_log, e))?;
        }
        writer
            .flush()
            .map_err(|e| AutomatorError::write_failed(&canonical_log, e))?;
    }
    tmp.persist(&canonical_log)
        .map_err(|e| AutomatorError::write_failed(&canonical_log, e.error))?;

    if !options.keep_raw {
        std::fs::remove_file(raw_log).map_err(|e| AutomatorError::write_failed(raw_log, e))?;
    }

    tracing::info!(
        "Post-processed {} -> {} ({} of {} lines kept)",
        raw_log.display(),
        canonical_log.display(),
        canonical.len(),
        entries.len()
    );

    Ok(canonical_log)
}
