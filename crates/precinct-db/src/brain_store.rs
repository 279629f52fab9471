//! Learned-state storage.
//!
//! One JSON blob per learning agent: officers are keyed by id, the
//! singleton controller and detective by fixed well-known keys. Loading is
//! explicit about every failure mode so the caller can choose to fall back
//! to a fresh policy:
//!
//! - `Ok(None)` -- no blob stored under the key
//! - `Err(PolicyLoadError)` -- a blob exists but cannot be used

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use precinct_agents::{LearnedState, PolicyLoadError};
use precinct_types::AgentId;

use crate::error::PersistenceError;
use crate::store::{remove_if_present, write_json};

/// Key a learned-state blob is stored under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BrainKey {
    /// A corrupt officer, by id.
    Officer(AgentId),
    /// The singleton controller.
    Controller,
    /// The singleton detective.
    Detective,
}

impl BrainKey {
    /// File name used by [`FileBrainStore`].
    pub fn file_name(self) -> String {
        match self {
            Self::Officer(id) => format!("cop_{id}.json"),
            Self::Controller => String::from("controller.json"),
            Self::Detective => String::from("detective.json"),
        }
    }
}

impl fmt::Display for BrainKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Officer(id) => write!(f, "officer {id}"),
            Self::Controller => f.write_str("controller"),
            Self::Detective => f.write_str("detective"),
        }
    }
}

/// Storage for learned-state blobs.
pub trait BrainStore: Send {
    /// Store `state` under `key`, replacing any previous blob.
    fn save(&mut self, key: BrainKey, state: &LearnedState) -> Result<(), PersistenceError>;

    /// Load the blob under `key`.
    fn load(&self, key: BrainKey) -> Result<Option<LearnedState>, PolicyLoadError>;

    /// Delete the blob under `key` if present.
    fn remove(&mut self, key: BrainKey) -> Result<(), PersistenceError>;

    /// Delete every blob.
    fn clear(&mut self) -> Result<(), PersistenceError>;
}

// =============================================================================
// In-memory
// =============================================================================

/// Blobs held in memory as encoded JSON, so loads go through the same
/// decode-and-validate path as files.
#[derive(Debug, Clone, Default)]
pub struct MemoryBrainStore {
    blobs: HashMap<BrainKey, String>,
}

impl MemoryBrainStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a raw blob without encoding it.
    pub fn insert_raw(&mut self, key: BrainKey, blob: impl Into<String>) {
        self.blobs.insert(key, blob.into());
    }

    /// Whether a blob is stored under `key`.
    pub fn contains(&self, key: BrainKey) -> bool {
        self.blobs.contains_key(&key)
    }

    /// Number of stored blobs.
    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }
}

impl BrainStore for MemoryBrainStore {
    fn save(&mut self, key: BrainKey, state: &LearnedState) -> Result<(), PersistenceError> {
        self.blobs.insert(key, state.to_json()?);
        Ok(())
    }

    fn load(&self, key: BrainKey) -> Result<Option<LearnedState>, PolicyLoadError> {
        self.blobs
            .get(&key)
            .map(|blob| LearnedState::from_json(blob))
            .transpose()
    }

    fn remove(&mut self, key: BrainKey) -> Result<(), PersistenceError> {
        self.blobs.remove(&key);
        Ok(())
    }

    fn clear(&mut self) -> Result<(), PersistenceError> {
        self.blobs.clear();
        Ok(())
    }
}

// =============================================================================
// Filesystem
// =============================================================================

/// One JSON file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileBrainStore {
    dir: PathBuf,
}

impl FileBrainStore {
    /// Open (creating if needed) a store rooted at `dir`.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError::Io`] if the directory cannot be created.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, PersistenceError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Root directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, key: BrainKey) -> PathBuf {
        self.dir.join(key.file_name())
    }
}

impl BrainStore for FileBrainStore {
    fn save(&mut self, key: BrainKey, state: &LearnedState) -> Result<(), PersistenceError> {
        write_json(&self.path(key), state)?;
        tracing::debug!(%key, "Saved learned state");
        Ok(())
    }

    fn load(&self, key: BrainKey) -> Result<Option<LearnedState>, PolicyLoadError> {
        match fs::read_to_string(self.path(key)) {
            Ok(blob) => LearnedState::from_json(&blob).map(Some),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(PolicyLoadError::Unreadable {
                reason: e.to_string(),
            }),
        }
    }

    fn remove(&mut self, key: BrainKey) -> Result<(), PersistenceError> {
        remove_if_present(&self.path(key))
    }

    fn clear(&mut self) -> Result<(), PersistenceError> {
        let mut removed: u32 = 0;
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            let is_blob = path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(is_blob_name);
            if is_blob {
                remove_if_present(&path)?;
                removed = removed.saturating_add(1);
            }
        }
        tracing::info!(dir = %self.dir.display(), removed, "Cleared learned state");
        Ok(())
    }
}

fn is_blob_name(name: &str) -> bool {
    name == "controller.json"
        || name == "detective.json"
        || (name.starts_with("cop_") && name.ends_with(".json"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use precinct_agents::{DqnLearner, LearningConfig};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    fn learned() -> LearnedState {
        let mut rng = StdRng::seed_from_u64(11);
        let config = LearningConfig {
            hidden_dim: 4,
            ..LearningConfig::default()
        };
        DqnLearner::new(3, 2, config, &mut rng).checkpoint()
    }

    #[test]
    fn missing_blob_is_none() {
        let store = MemoryBrainStore::new();
        assert!(store.load(BrainKey::Controller).unwrap().is_none());
    }

    #[test]
    fn saved_blob_loads_back() {
        let mut store = MemoryBrainStore::new();
        let state = learned();
        store.save(BrainKey::Officer(AgentId(4)), &state).unwrap();
        let loaded = store.load(BrainKey::Officer(AgentId(4))).unwrap().unwrap();
        assert_eq!(loaded, state);
        assert!(store.load(BrainKey::Officer(AgentId(5))).unwrap().is_none());
    }

    #[test]
    fn corrupt_blob_is_an_error_not_a_panic() {
        let mut store = MemoryBrainStore::new();
        store.insert_raw(BrainKey::Detective, "{not json");
        assert!(matches!(
            store.load(BrainKey::Detective),
            Err(PolicyLoadError::Decode { .. })
        ));
    }

    #[test]
    fn file_names_follow_keys() {
        assert_eq!(BrainKey::Officer(AgentId(12)).file_name(), "cop_12.json");
        assert_eq!(BrainKey::Controller.file_name(), "controller.json");
        assert!(is_blob_name("cop_3.json"));
        assert!(!is_blob_name("roster.json"));
    }
}
