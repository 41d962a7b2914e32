//! Persistent key-value store backed by JSON files.
//!
//! The monitor has no continuously running in-memory state of record: every
//! handler reads what it needs from here and writes back explicitly. Each key
//! maps to a `<key>.json` file inside the state directory, so a CLI invocation
//! in a separate process sees the same data as the daemon.
//!
//! Change notification is provided by [`crate::watcher::StorageWatcher`],
//! which observes the same directory.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::trace;

use crate::error::Result;

/// Storage key for the user settings record.
pub const SETTINGS_KEY: &str = "settings";

/// Storage key for the tracked employee list.
pub const EMPLOYEE_LIST_KEY: &str = "employeeList";

/// File-backed key-value store.
///
/// Values are serialized as pretty-printed JSON. Writes go through a
/// temporary file followed by a rename so readers never observe a partially
/// written value.
#[derive(Debug, Clone)]
pub struct Storage {
    dir: PathBuf,
}

impl Storage {
    /// Opens the store rooted at `dir`, creating the directory if needed.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Returns the directory backing this store.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Reads and deserializes the value stored under `key`.
    ///
    /// A missing key resolves to `Ok(None)`; malformed JSON is an error the
    /// caller decides how to degrade.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match fs::read(self.key_path(key)) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Serializes and persists `value` under `key`.
    pub fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let path = self.key_path(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(value)?)?;
        fs::rename(&tmp, &path)?;
        trace!(key, path = %path.display(), "stored value");
        Ok(())
    }

    /// Removes the value stored under `key`.
    ///
    /// Returns `true` if a value existed.
    pub fn remove(&self, key: &str) -> Result<bool> {
        match fs::remove_file(self.key_path(key)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}
