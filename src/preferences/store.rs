//! Key-value preference stores.
//!
//! Values are opaque strings; the typed loaders in the parent module decide
//! what they mean. [`FileStore`] keeps every key in one JSON object on disk,
//! [`MemoryStore`] keeps them in a map.

use crate::error::PreferenceError;
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tracing::{debug, warn};

/// Environment variable to override the state directory.
pub const STATE_DIR_ENV: &str = "ADO_MOBILE_STATE_DIR";

/// File name of the preference store inside the state directory.
pub const PREFERENCES_FILE: &str = "preferences.json";

/// Synchronous string key-value storage.
pub trait PreferenceStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, PreferenceError>;
    fn set(&self, key: &str, value: &str) -> Result<(), PreferenceError>;
    fn remove(&self, key: &str) -> Result<(), PreferenceError>;
}

/// In-memory store for tests and throwaway sessions.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with `entries`.
    pub fn with_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: Mutex::new(
                entries
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        }
    }
}

impl PreferenceStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, PreferenceError> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), PreferenceError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), PreferenceError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.remove(key);
        Ok(())
    }
}

/// JSON-object file store.
///
/// Reads the whole file on every access. An unreadable or corrupt file reads
/// as empty and is replaced on the next write. Writes go to a temp file that
/// is synced and renamed over the original.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Opens `preferences.json` in the default state directory.
    pub fn open_default() -> Result<Self, PreferenceError> {
        Ok(Self::new(state_dir()?.join(PREFERENCES_FILE)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> Result<BTreeMap<String, String>, PreferenceError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(source) => {
                return Err(PreferenceError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        match serde_json::from_str(&content) {
            Ok(map) => Ok(map),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Ignoring corrupt preference file");
                Ok(BTreeMap::new())
            }
        }
    }

    fn write_map(&self, map: &BTreeMap<String, String>) -> Result<(), PreferenceError> {
        let io_err = |path: &Path| {
            let path = path.to_path_buf();
            move |source| PreferenceError::Io { path, source }
        };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(io_err(parent))?;
        }

        let content = serde_json::to_string_pretty(map).map_err(|e| PreferenceError::Encode {
            key: PREFERENCES_FILE.to_string(),
            message: e.to_string(),
        })?;

        let temp_path = self.path.with_extension("json.tmp");
        let mut file = fs::File::create(&temp_path).map_err(io_err(&temp_path))?;
        file.write_all(content.as_bytes())
            .map_err(io_err(&temp_path))?;
        file.sync_all().map_err(io_err(&temp_path))?;

        fs::rename(&temp_path, &self.path).map_err(io_err(&self.path))?;
        debug!(path = %self.path.display(), keys = map.len(), "Saved preferences");
        Ok(())
    }

    fn update(
        &self,
        change: impl FnOnce(&mut BTreeMap<String, String>),
    ) -> Result<(), PreferenceError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut map = self.read_map()?;
        change(&mut map);
        self.write_map(&map)
    }
}

impl PreferenceStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, PreferenceError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(self.read_map()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), PreferenceError> {
        self.update(|map| {
            map.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&self, key: &str) -> Result<(), PreferenceError> {
        self.update(|map| {
            map.remove(key);
        })
    }
}

/// Returns the state directory for persisted preferences.
///
/// Honors `ADO_MOBILE_STATE_DIR`, then the platform state location.
pub fn state_dir() -> Result<PathBuf, PreferenceError> {
    if let Ok(dir) = std::env::var(STATE_DIR_ENV)
        && !dir.is_empty()
    {
        return Ok(PathBuf::from(dir));
    }

    let state_home = if cfg!(target_os = "macos") {
        dirs::data_local_dir().map(|p| p.join("ado-mobile"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir().map(|p| p.join("ado-mobile").join("state"))
    } else {
        dirs::state_dir()
            .map(|p| p.join("ado-mobile"))
            .or_else(|| dirs::home_dir().map(|p| p.join(".local").join("state").join("ado-mobile")))
    };

    state_home.ok_or(PreferenceError::StateDir)
}
