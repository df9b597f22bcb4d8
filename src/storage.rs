//! Namespaced key-value byte store backing all collection state.
//!
//! `CollectionStore` is the only component that touches the store — the
//! rest of the engine goes through it. Two implementations: an in-memory
//! map for tests and a one-file-per-key directory store for the desktop
//! app.

use crate::error::EngineError;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const KEY_FAVORITES: &str = "favorites";
pub const KEY_PLAYLISTS: &str = "playlists";
pub const KEY_SETTINGS: &str = "settings";

pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<Vec<u8>>;
    fn set(&mut self, key: &str, value: &[u8]) -> Result<(), EngineError>;
    fn remove(&mut self, key: &str) -> Result<(), EngineError>;
    /// Remove every key in this store's namespace, leaving anything
    /// outside it untouched.
    fn clear_namespace(&mut self) -> Result<(), EngineError>;
}

// ── In-memory store ─────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: HashMap<String, Vec<u8>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &[u8]) -> Result<(), EngineError> {
        self.entries.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), EngineError> {
        self.entries.remove(key);
        Ok(())
    }

    fn clear_namespace(&mut self) -> Result<(), EngineError> {
        self.entries.clear();
        Ok(())
    }
}

// ── On-disk store ───────────────────────────────────────────────────────────

/// One file per key under a namespace directory, e.g.
/// `~/.local/share/hymnflow/favorites.json`.
#[derive(Debug)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Open (creating if needed) a store rooted at `dir`.
    pub fn open(dir: &Path) -> Result<Self, EngineError> {
        fs::create_dir_all(dir)
            .map_err(|e| EngineError::Persistence(format!("create '{}': {}", dir.display(), e)))?;
        Ok(FileStore {
            dir: dir.to_path_buf(),
        })
    }

    /// Open the default per-user store under the platform data directory.
    pub fn open_default() -> Result<Self, EngineError> {
        let base = dirs::data_dir()
            .ok_or_else(|| EngineError::Persistence("no platform data directory".to_string()))?;
        FileStore::open(&base.join("hymnflow"))
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<Vec<u8>> {
        fs::read(self.key_path(key)).ok()
    }

    fn set(&mut self, key: &str, value: &[u8]) -> Result<(), EngineError> {
        let path = self.key_path(key);
        fs::write(&path, value)
            .map_err(|e| EngineError::Persistence(format!("write '{}': {}", path.display(), e)))
    }

    fn remove(&mut self, key: &str) -> Result<(), EngineError> {
        let path = self.key_path(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(EngineError::Persistence(format!(
                "remove '{}': {}",
                path.display(),
                e
            ))),
        }
    }

    fn clear_namespace(&mut self) -> Result<(), EngineError> {
        let entries = fs::read_dir(&self.dir).map_err(|e| {
            EngineError::Persistence(format!("read '{}': {}", self.dir.display(), e))
        })?;
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json") {
                fs::remove_file(&path).map_err(|e| {
                    EngineError::Persistence(format!("remove '{}': {}", path.display(), e))
                })?;
            }
        }
        Ok(())
    }
}
