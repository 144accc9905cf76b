//! Recording file naming and housekeeping
//!
//! Layout under the recordings directory:
//! - canonical log: `<name>.<ext>`
//! - raw log: `<name>_RAW.<ext>`
//! - duplicates: `<name>_(<n>).<ext>` and `<name>_(<n>)_RAW.<ext>`

use std::path::{Path, PathBuf};

use crate::error::{AutomatorError, AutomatorResult};

pub const DEFAULT_EXTENSION: &str = "log";
pub const RAW_SUFFIX: &str = "_RAW";
const FALLBACK_NAME: &str = "New_log";

#[derive(Debug, Clone)]
pub struct LogStore {
    dir: PathBuf,
    extension: String,
}

impl LogStore {
    pub fn new(dir: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            extension: extension.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the recordings directory if it does not exist yet
    pub fn ensure_dir(&self) -> AutomatorResult<()> {
        std::fs::create_dir_all(&self.dir).map_err(|e| AutomatorError::write_failed(&self.dir, e))
    }

    /// Name with any extension removed, e.g. `demo.log` -> `demo`
    pub fn strip_extension(name: &str) -> &str {
        match Path::new(name).extension() {
            Some(ext) => &name[..name.len() - ext.len() - 1],
            None => name,
        }
    }

    pub fn canonical_path(&self, name: &str) -> PathBuf {
        let stem = Self::strip_extension(name);
        self.dir.join(format!("{}.{}", stem, self.extension))
    }

    pub fn raw_path(&self, name: &str) -> PathBuf {
        let stem = Self::strip_extension(name);
        self.dir
            .join(format!("{}{}.{}", stem, RAW_SUFFIX, self.extension))
    }

    /// Path of a log given by name, with or without extension, raw or canonical
    pub fn log_path(&self, name: &str) -> PathBuf {
        self.canonical_path(name)
    }

    /// Canonical counterpart of a raw log path, or `None` if `raw` is not a raw name
    pub fn canonical_path_for_raw(raw: &Path) -> Option<PathBuf> {
        let stem = raw.file_stem()?.to_str()?;
        let canonical_stem = stem.strip_suffix(RAW_SUFFIX)?;
        if canonical_stem.is_empty() {
            return None;
        }
        let file_name = match raw.extension().and_then(|e| e.to_str()) {
            Some(ext) => format!("{}.{}", canonical_stem, ext),
            None => canonical_stem.to_string(),
        };
        Some(raw.with_file_name(file_name))
    }

    pub fn is_raw_name(name: &str) -> bool {
        Self::strip_extension(name).ends_with(RAW_SUFFIX)
    }

    /// True if the stem carries a `_(<n>)` duplicate counter, before any `_RAW` suffix
    pub fn is_duplicate_numbered(name: &str) -> bool {
        let stem = Self::strip_extension(name);
        let stem = stem.strip_suffix(RAW_SUFFIX).unwrap_or(stem);
        split_duplicate_counter(stem).is_some()
    }

    /// Smallest free name for `base`: `base` itself, else `base_(1)`, `base_(2)`, ...
    ///
    /// A candidate is taken only if neither its canonical nor its raw file exists.
    /// A taken duplicate-numbered base is renumbered from its root, so `demo_(1)`
    /// resolves to `demo_(2)` rather than `demo_(1)_(1)`.
    pub fn resolve_unique_name(&self, base: &str) -> String {
        let mut base = Self::strip_extension(base);
        if self.is_free(base) {
            return base.to_string();
        }
        if Self::is_duplicate_numbered(base) {
            if let Some((root, _)) = split_duplicate_counter(base) {
                base = root;
            }
        }

        let mut n: u32 = 1;
        loop {
            let candidate = format!("{}_({})", base, n);
            if self.is_free(&candidate) {
                return candidate;
            }
            n += 1;
        }
    }

    fn is_free(&self, name: &str) -> bool {
        !self.canonical_path(name).exists() && !self.raw_path(name).exists()
    }

    /// Names (without extension) of the logs in the directory, sorted
    pub fn list_logs(&self, include_raw: bool) -> AutomatorResult<Vec<String>> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(AutomatorError::read_failed(&self.dir, e)),
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| AutomatorError::read_failed(&self.dir, e))?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            if path.extension().and_then(|e| e.to_str()) != Some(self.extension.as_str()) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if !include_raw && stem.ends_with(RAW_SUFFIX) {
                continue;
            }
            names.push(stem.to_string());
        }

        names.sort();
        Ok(names)
    }

    pub fn delete(&self, name: &str, also_delete_raw: bool) -> AutomatorResult<()> {
        let path = self.canonical_path(name);
        std::fs::remove_file(&path).map_err(|e| AutomatorError::write_failed(&path, e))?;
        tracing::info!("Deleted {}", path.display());

        if also_delete_raw && !Self::is_raw_name(name) {
            let raw = self.raw_path(name);
            if raw.exists() {
                std::fs::remove_file(&raw).map_err(|e| AutomatorError::write_failed(&raw, e))?;
                tracing::info!("Deleted {}", raw.display());
            }
        }
        Ok(())
    }

    /// Rename `old` to `new`, returning the new name. Never overwrites an existing log.
    pub fn rename(&self, old: &str, new: &str, also_rename_raw: bool) -> AutomatorResult<String> {
        let mut new_name = Self::strip_extension(new.trim()).to_string();
        if new_name.is_empty() {
            new_name = FALLBACK_NAME.to_string();
        }

        let from = self.canonical_path(old);
        let to = self.canonical_path(&new_name);
        if from == to {
            return Ok(new_name);
        }
        move_file(&from, &to)?;
        tracing::info!("Renamed {} -> {}", from.display(), to.display());

        if also_rename_raw && !Self::is_raw_name(old) {
            let raw_from = self.raw_path(old);
            if raw_from.exists() {
                let raw_to = self.raw_path(&new_name);
                move_file(&raw_from, &raw_to)?;
            }
        }
        Ok(new_name)
    }
}

fn move_file(from: &Path, to: &Path) -> AutomatorResult<()> {
    if to.exists() {
        return Err(AutomatorError::write_failed(
            to,
            std::io::Error::new(std::io::ErrorKind::AlreadyExists, "target log already exists"),
        ));
    }
    std::fs::rename(from, to).map_err(|e| AutomatorError::write_failed(from, e))
}

/// `name_(12)` -> (`name`, 12)
fn split_duplicate_counter(stem: &str) -> Option<(&str, u32)> {
    let inner = stem.strip_suffix(')')?;
    let open = inner.rfind("_(")?;
    let digits = &inner[open + 2..];
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some((&inner[..open], digits.parse().ok()?))
}
