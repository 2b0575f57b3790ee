//! DataDef stores
//!
//! A store keeps every version of every DataDef, keyed by name and
//! `from_date`. Two implementations:
//!
//! - [`MemoryDataDefStore`]: process-local, for tests and dry runs
//! - [`FileDataDefStore`]: one JSON history file per name under a directory
//!
//! Writers serialize per name through [`DataDefStore::compare_and_swap`]:
//! the swap is applied only if the open version is still the one the
//! caller reconciled against. Otherwise it fails with
//! `ConcurrentModification` and the caller re-reads.

use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use super::model::DataDef;
use crate::durable;
use crate::errors::{DefsError, DefsResult};

pub trait DataDefStore: Send + Sync {
    /// Names with at least one stored version, sorted.
    fn names(&self) -> DefsResult<Vec<String>>;

    /// All versions of `name`, ascending by `from_date`.
    fn find_all(&self, name: &str) -> DefsResult<Vec<DataDef>>;

    fn find_open_by_name(&self, name: &str) -> DefsResult<Option<DataDef>>;

    /// Inserts the version, or replaces the stored version with the same
    /// name and `from_date`.
    fn store_or_update(&self, data_def: &DataDef) -> DefsResult<()>;

    /// Applies `writes` if the open version of `name` still matches
    /// `expected_open` (by validity and definition).
    fn compare_and_swap(
        &self,
        name: &str,
        expected_open: Option<&DataDef>,
        writes: &[DataDef],
    ) -> DefsResult<()>;

    /// The version whose validity covers `instant`.
    fn find_active_at(&self, name: &str, instant: DateTime<Utc>) -> DefsResult<Option<DataDef>> {
        Ok(self.find_all(name)?.into_iter().find(|d| d.covers(instant)))
    }
}

fn check_name(name: &str) -> DefsResult<()> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(DefsError::Store(format!("invalid data def name '{}'", name)))
    }
}

fn check_writes(name: &str, writes: &[DataDef]) -> DefsResult<()> {
    match writes.iter().find(|d| d.name() != name) {
        Some(stray) => Err(DefsError::Store(format!(
            "write for '{}' included version of '{}'",
            name,
            stray.name()
        ))),
        None => Ok(()),
    }
}

fn upsert(versions: &mut Vec<DataDef>, data_def: &DataDef) {
    match versions
        .iter_mut()
        .find(|d| d.from_date() == data_def.from_date())
    {
        Some(slot) => *slot = data_def.clone(),
        None => versions.push(data_def.clone()),
    }
    versions.sort_by_key(DataDef::from_date);
}

fn open_of(versions: &[DataDef], high_date: DateTime<Utc>) -> Option<&DataDef> {
    versions.iter().find(|d| d.is_open(high_date))
}

fn still_matches(current: Option<&DataDef>, expected: Option<&DataDef>) -> bool {
    match (current, expected) {
        (None, None) => true,
        (Some(c), Some(e)) => c.same_version(e) && c.same_definition(e),
        _ => false,
    }
}

// ============================================================================
// Memory store
// ============================================================================

#[derive(Debug)]
pub struct MemoryDataDefStore {
    high_date: DateTime<Utc>,
    versions: Mutex<HashMap<String, Vec<DataDef>>>,
}

impl MemoryDataDefStore {
    pub fn new(high_date: DateTime<Utc>) -> Self {
        Self {
            high_date,
            versions: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> DefsResult<MutexGuard<'_, HashMap<String, Vec<DataDef>>>> {
        self.versions
            .lock()
            .map_err(|_| DefsError::Store("data def store lock poisoned".to_string()))
    }
}

impl DataDefStore for MemoryDataDefStore {
    fn names(&self) -> DefsResult<Vec<String>> {
        let mut names: Vec<String> = self.lock()?.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    fn find_all(&self, name: &str) -> DefsResult<Vec<DataDef>> {
        Ok(self.lock()?.get(name).cloned().unwrap_or_default())
    }

    fn find_open_by_name(&self, name: &str) -> DefsResult<Option<DataDef>> {
        let versions = self.lock()?;
        Ok(versions
            .get(name)
            .and_then(|v| open_of(v, self.high_date))
            .cloned())
    }

    fn store_or_update(&self, data_def: &DataDef) -> DefsResult<()> {
        check_name(data_def.name())?;
        let mut versions = self.lock()?;
        upsert(versions.entry(data_def.name().to_string()).or_default(), data_def);
        Ok(())
    }

    fn compare_and_swap(
        &self,
        name: &str,
        expected_open: Option<&DataDef>,
        writes: &[DataDef],
    ) -> DefsResult<()> {
        check_name(name)?;
        check_writes(name, writes)?;

        let mut versions = self.lock()?;
        let current = versions.get(name).and_then(|v| open_of(v, self.high_date));
        if !still_matches(current, expected_open) {
            return Err(DefsError::ConcurrentModification {
                name: name.to_string(),
            });
        }
        let history = versions.entry(name.to_string()).or_default();
        for data_def in writes {
            upsert(history, data_def);
        }
        Ok(())
    }
}

// ============================================================================
// File store
// ============================================================================

const HISTORY_EXTENSION: &str = "json";
const LOCK_EXTENSION: &str = "lock";

/// Exclusive per-name lock, released on drop.
///
/// A lock file left by a crashed writer blocks that name until removed.
struct NameLock {
    path: PathBuf,
}

impl NameLock {
    fn acquire(path: PathBuf, name: &str) -> DefsResult<Self> {
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(mut file) => {
                if let Err(e) = writeln!(file, "{}", std::process::id()) {
                    debug!(name, error = %e, "lock owner not recorded");
                }
                Ok(Self { path })
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                debug!(name, "data def lock busy");
                Err(DefsError::ConcurrentModification {
                    name: name.to_string(),
                })
            }
            Err(e) => Err(e.into()),
        }
    }
}

impl Drop for NameLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), error = %e, "failed to release data def lock");
        }
    }
}

#[derive(Debug, Clone)]
pub struct FileDataDefStore {
    dir: PathBuf,
    high_date: DateTime<Utc>,
}

impl FileDataDefStore {
    /// Opens the store, creating `dir` if needed.
    pub fn open(dir: impl Into<PathBuf>, high_date: DateTime<Utc>) -> DefsResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir, high_date })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn history_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", name, HISTORY_EXTENSION))
    }

    fn lock(&self, name: &str) -> DefsResult<NameLock> {
        NameLock::acquire(self.dir.join(format!("{}.{}", name, LOCK_EXTENSION)), name)
    }

    fn read_versions(&self, name: &str) -> DefsResult<Vec<DataDef>> {
        check_name(name)?;
        let Some(bytes) = durable::read_optional(&self.history_path(name))? else {
            return Ok(Vec::new());
        };
        serde_json::from_slice(&bytes)
            .map_err(|e| DefsError::Store(format!("unreadable history for '{}': {}", name, e)))
    }

    fn write_versions(&self, name: &str, versions: &[DataDef]) -> DefsResult<()> {
        let bytes = serde_json::to_vec_pretty(versions)?;
        durable::write_atomic(&self.history_path(name), &bytes)?;
        debug!(name, versions = versions.len(), "data def history written");
        Ok(())
    }
}

impl DataDefStore for FileDataDefStore {
    fn names(&self) -> DefsResult<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(HISTORY_EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    fn find_all(&self, name: &str) -> DefsResult<Vec<DataDef>> {
        let mut versions = self.read_versions(name)?;
        versions.sort_by_key(DataDef::from_date);
        Ok(versions)
    }

    fn find_open_by_name(&self, name: &str) -> DefsResult<Option<DataDef>> {
        let versions = self.read_versions(name)?;
        Ok(open_of(&versions, self.high_date).cloned())
    }

    fn store_or_update(&self, data_def: &DataDef) -> DefsResult<()> {
        let name = data_def.name();
        check_name(name)?;
        let _lock = self.lock(name)?;
        let mut versions = self.read_versions(name)?;
        upsert(&mut versions, data_def);
        self.write_versions(name, &versions)
    }

    fn compare_and_swap(
        &self,
        name: &str,
        expected_open: Option<&DataDef>,
        writes: &[DataDef],
    ) -> DefsResult<()> {
        check_name(name)?;
        check_writes(name, writes)?;

        let _lock = self.lock(name)?;
        let mut versions = self.read_versions(name)?;
        if !still_matches(open_of(&versions, self.high_date), expected_open) {
            return Err(DefsError::ConcurrentModification {
                name: name.to_string(),
            });
        }
        for data_def in writes {
            upsert(&mut versions, data_def);
        }
        self.write_versions(name, &versions)
    }
}
