// Persistent playback state store
//
// Per-playlist resume data kept as three scalar entries:
//   playlist_<id>_currentIndex, playlist_<id>_currentTime, playlist_<id>_volume
// Every operation is best-effort: write failures are logged and dropped, read
// failures fall back to defaults.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

use crate::db::Database;

pub const DEFAULT_INDEX: usize = 0;
pub const DEFAULT_ELAPSED: u64 = 0;
pub const DEFAULT_VOLUME: u8 = 100;

const INDEX_SUFFIX: &str = "currentIndex";
const ELAPSED_SUFFIX: &str = "currentTime";
const VOLUME_SUFFIX: &str = "volume";

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Database(#[from] rusqlite::Error),
}

/// Durable string key/value storage shared by all playlists on this device.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Key/value storage on top of the `settings` table.
pub struct SqliteStore {
    db: Arc<Mutex<Database>>,
}

impl SqliteStore {
    pub fn new(db: Arc<Mutex<Database>>) -> Self {
        Self { db }
    }

    fn with_db<T>(
        &self,
        f: impl FnOnce(&Database) -> rusqlite::Result<T>,
    ) -> Result<T, StorageError> {
        let db = self
            .db
            .lock()
            .map_err(|e| StorageError::Unavailable(format!("Failed to lock database: {}", e)))?;
        Ok(f(&*db)?)
    }
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.with_db(|db| db.get_setting(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.with_db(|db| db.set_setting(key, value))
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.with_db(|db| db.delete_setting(key))
    }
}

/// In-process store; resume state lives as long as the process.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>, StorageError> {
        self.entries
            .lock()
            .map_err(|e| StorageError::Unavailable(e.to_string()))
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries()?.remove(key);
        Ok(())
    }
}

/// Resume data for one playlist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResumeState {
    pub track_index: usize,
    pub elapsed_seconds: u64,
    pub volume: u8,
}

impl Default for ResumeState {
    fn default() -> Self {
        ResumeState {
            track_index: DEFAULT_INDEX,
            elapsed_seconds: DEFAULT_ELAPSED,
            volume: DEFAULT_VOLUME,
        }
    }
}

pub fn storage_key(playlist_id: &str, suffix: &str) -> String {
    format!("playlist_{}_{}", playlist_id, suffix)
}

#[derive(Clone)]
pub struct PlaybackStateStore {
    store: Arc<dyn KeyValueStore>,
}

impl PlaybackStateStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Write index, whole elapsed seconds and volume. Never fails.
    pub fn save(&self, playlist_id: &str, track_index: usize, elapsed_seconds: f64, volume: u8) {
        let elapsed = if elapsed_seconds.is_finite() && elapsed_seconds > 0.0 {
            elapsed_seconds.floor() as u64
        } else {
            0
        };

        self.write(playlist_id, INDEX_SUFFIX, &track_index.to_string());
        self.write(playlist_id, ELAPSED_SUFFIX, &elapsed.to_string());
        self.write(playlist_id, VOLUME_SUFFIX, &volume.to_string());
    }

    /// Read resume data, substituting defaults for anything missing or malformed.
    pub fn load(&self, playlist_id: &str) -> ResumeState {
        ResumeState {
            track_index: self.read(playlist_id, INDEX_SUFFIX).unwrap_or(DEFAULT_INDEX),
            elapsed_seconds: self.read(playlist_id, ELAPSED_SUFFIX).unwrap_or(DEFAULT_ELAPSED),
            volume: self
                .read::<u8>(playlist_id, VOLUME_SUFFIX)
                .map(|v| v.min(100))
                .unwrap_or(DEFAULT_VOLUME),
        }
    }

    /// Drop the stored elapsed time so a newly selected track starts from zero.
    pub fn clear_elapsed(&self, playlist_id: &str) {
        let key = storage_key(playlist_id, ELAPSED_SUFFIX);
        if let Err(e) = self.store.remove(&key) {
            tracing::debug!("Failed to remove {}: {}", key, e);
        }
    }

    fn write(&self, playlist_id: &str, suffix: &str, value: &str) {
        let key = storage_key(playlist_id, suffix);
        if let Err(e) = self.store.set(&key, value) {
            tracing::debug!("Failed to save {}: {}", key, e);
        }
    }

    fn read<T: std::str::FromStr>(&self, playlist_id: &str, suffix: &str) -> Option<T> {
        let key = storage_key(playlist_id, suffix);
        match self.store.get(&key) {
            Ok(value) => value.and_then(|v| v.trim().parse().ok()),
            Err(e) => {
                tracing::debug!("Failed to load {}: {}", key, e);
                None
            }
        }
    }
}
