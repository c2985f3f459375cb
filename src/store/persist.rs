//! Key-value snapshot storage for the persisted slice of forum state
//!
//! Supports two backends:
//! - Memory: a process-local map (tests, or when no state file is configured)
//! - File: one JSON object on disk, keyed by namespace
//!
//! Only the selected category filter is ever written. Entries are stored as
//! `{"state": {...}, "version": 0}` so older snapshots can be recognised.

use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::Mutex,
};
use tokio::runtime::{Handle, RuntimeFlavor};

/// Snapshot format version
pub const SNAPSHOT_VERSION: u32 = 0;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage format error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unsupported snapshot version {0}")]
    Version(u32),
}

/// The persisted part of the store
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedState {
    #[serde(default)]
    pub selected_categories: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    state: PersistedState,
    #[serde(default)]
    version: u32,
}

/// Durable storage for store snapshots
pub trait SnapshotStorage: Send + Sync {
    /// Load the snapshot stored under `key`, if any
    fn load(&self, key: &str) -> Result<Option<PersistedState>, StorageError>;

    /// Replace the snapshot stored under `key`
    fn save(&self, key: &str, state: &PersistedState) -> Result<(), StorageError>;
}

fn decode(value: serde_json::Value) -> Result<PersistedState, StorageError> {
    let envelope: Envelope = serde_json::from_value(value)?;
    if envelope.version != SNAPSHOT_VERSION {
        return Err(StorageError::Version(envelope.version));
    }
    Ok(envelope.state)
}

fn encode(state: &PersistedState) -> Result<serde_json::Value, StorageError> {
    Ok(serde_json::to_value(Envelope {
        state: state.clone(),
        version: SNAPSHOT_VERSION,
    })?)
}

/// In-memory storage (single process only)
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, serde_json::Value>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SnapshotStorage for MemoryStorage {
    fn load(&self, key: &str) -> Result<Option<PersistedState>, StorageError> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.get(key).cloned().map(decode).transpose()
    }

    fn save(&self, key: &str, state: &PersistedState) -> Result<(), StorageError> {
        let value = encode(state)?;
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(key.to_string(), value);
        Ok(())
    }
}

/// JSON file storage. The file holds an object mapping namespace keys to snapshots
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    // Serializes read-modify-write cycles on the file
    lock: Mutex<()>,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run blocking file I/O without stalling the async worker that called us.
    ///
    /// On a multi-threaded runtime the worker hands its tasks off first. A
    /// current-thread runtime can't do that, so there (and outside any runtime)
    /// the closure just runs.
    fn blocking<T>(f: impl FnOnce() -> T) -> T {
        match Handle::try_current() {
            Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
                tokio::task::block_in_place(f)
            }
            _ => f(),
        }
    }

    fn read_all(&self) -> Result<serde_json::Map<String, serde_json::Value>, StorageError> {
        match std::fs::read(&self.path) {
            Ok(bytes) if bytes.is_empty() => Ok(serde_json::Map::new()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(serde_json::Map::new()),
            Err(e) => Err(e.into()),
        }
    }
}

impl SnapshotStorage for FileStorage {
    fn load(&self, key: &str) -> Result<Option<PersistedState>, StorageError> {
        Self::blocking(|| -> Result<_, StorageError> {
            let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
            let mut entries = self.read_all()?;
            entries.remove(key).map(decode).transpose()
        })
    }

    fn save(&self, key: &str, state: &PersistedState) -> Result<(), StorageError> {
        let value = encode(state)?;
        Self::blocking(|| -> Result<(), StorageError> {
            let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
            let mut entries = self.read_all()?;
            entries.insert(key.to_string(), value);

            if let Some(parent) = self.path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }

            // Write to a sibling temp file then rename so readers never see a torn file
            let tmp = self.path.with_extension("json.tmp");
            std::fs::write(&tmp, serde_json::to_vec_pretty(&entries)?)?;
            std::fs::rename(&tmp, &self.path)?;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("threadboard-{}", uuid::Uuid::now_v7()))
            .join(name)
    }

    fn state(ids: &[&str]) -> PersistedState {
        PersistedState {
            selected_categories: ids.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_memory_round_trip_per_key() {
        let storage = MemoryStorage::new();
        assert_eq!(storage.load("forum-storage").unwrap(), None);

        storage.save("forum-storage", &state(&["a", "b"])).unwrap();
        storage.save("other", &state(&["z"])).unwrap();

        assert_eq!(storage.load("forum-storage").unwrap(), Some(state(&["a", "b"])));
        assert_eq!(storage.load("other").unwrap(), Some(state(&["z"])));
    }

    #[test]
    fn test_file_storage_keeps_other_namespaces() {
        let path = temp_path("state.json");
        let storage = FileStorage::new(&path);
        assert_eq!(storage.load("forum-storage").unwrap(), None);

        storage.save("forum-storage", &state(&["general"])).unwrap();
        storage.save("another-app", &state(&["x"])).unwrap();
        storage.save("forum-storage", &state(&["general", "help"])).unwrap();

        // A fresh handle on the same file sees the data
        let reopened = FileStorage::new(&path);
        assert_eq!(
            reopened.load("forum-storage").unwrap(),
            Some(state(&["general", "help"]))
        );
        assert_eq!(reopened.load("another-app").unwrap(), Some(state(&["x"])));

        let raw: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(
            raw["forum-storage"],
            serde_json::json!({"state": {"selectedCategories": ["general", "help"]}, "version": 0})
        );

        std::fs::remove_dir_all(path.parent().unwrap()).unwrap();
    }

    #[test]
    fn test_file_storage_rejects_garbage_and_unknown_versions() {
        let path = temp_path("state.json");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();

        std::fs::write(&path, b"not json").unwrap();
        let storage = FileStorage::new(&path);
        assert!(matches!(storage.load("forum-storage"), Err(StorageError::Json(_))));

        std::fs::write(
            &path,
            br#"{"forum-storage": {"state": {"selectedCategories": []}, "version": 7}}"#,
        )
        .unwrap();
        assert!(matches!(storage.load("forum-storage"), Err(StorageError::Version(7))));

        std::fs::remove_dir_all(path.parent().unwrap()).unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_file_storage_from_multi_thread_runtime() {
        let path = temp_path("state.json");
        let storage = FileStorage::new(&path);
        storage.save("forum-storage", &state(&["science"])).unwrap();
        assert_eq!(storage.load("forum-storage").unwrap(), Some(state(&["science"])));

        let writer = tokio::spawn(async move {
            storage.save("forum-storage", &state(&["science", "help"])).unwrap();
        });
        writer.await.unwrap();
        assert_eq!(
            FileStorage::new(&path).load("forum-storage").unwrap(),
            Some(state(&["science", "help"]))
        );

        std::fs::remove_dir_all(path.parent().unwrap()).unwrap();
    }

    #[tokio::test]
    async fn test_file_storage_from_current_thread_runtime() {
        let path = temp_path("state.json");
        let storage = FileStorage::new(&path);
        storage.save("forum-storage", &state(&["world-news"])).unwrap();
        assert_eq!(storage.load("forum-storage").unwrap(), Some(state(&["world-news"])));
        std::fs::remove_dir_all(path.parent().unwrap()).unwrap();
    }
}
