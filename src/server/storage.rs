//! Server-side versioned draft storage.
//!
//! One draft per deployment, stored as a single JSON blob
//! `{ state, version, userId }` at `<DATA_DIR>/draft.json`. The storage is
//! the sole arbiter of the version counter: every put reads the current
//! version and writes its successor. Callers serialize puts behind a write
//! lock; the file itself is replaced atomically (temp file + rename) so a
//! crash never leaves a torn record.
//!
//! The `lastSaved` field of the draft is stamped here on every write - it is
//! server-owned metadata, which is why clients treat it as always-remote.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::PathBuf;

use chrono::Utc;

use crate::document::Draft;
use crate::store::DraftRecord;

const DRAFT_FILENAME: &str = "draft.json";

/// Errors that can occur during server storage operations.
#[derive(Debug)]
pub enum ServerStorageError {
    /// I/O error reading or writing the draft file.
    IoError(PathBuf, io::Error),
    /// The draft file exists but does not parse.
    ParseError(PathBuf, serde_json::Error),
}

impl std::fmt::Display for ServerStorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServerStorageError::IoError(path, e) => {
                write!(f, "I/O error for {}: {}", path.display(), e)
            }
            ServerStorageError::ParseError(path, e) => {
                write!(f, "Failed to parse draft {}: {}", path.display(), e)
            }
        }
    }
}

impl std::error::Error for ServerStorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ServerStorageError::IoError(_, e) => Some(e),
            ServerStorageError::ParseError(_, e) => Some(e),
        }
    }
}

/// File-backed storage for the shared draft.
#[derive(Debug, Clone)]
pub struct DraftStorage {
    path: PathBuf,
}

impl DraftStorage {
    /// Creates storage rooted at the given data directory.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            path: data_dir.into().join(DRAFT_FILENAME),
        }
    }

    /// Loads the stored draft record.
    ///
    /// Returns `Ok(None)` if no draft has ever been written.
    pub fn load(&self) -> Result<Option<DraftRecord>, ServerStorageError> {
        match fs::read(&self.path) {
            Ok(bytes) => {
                let record = serde_json::from_slice(&bytes)
                    .map_err(|e| ServerStorageError::ParseError(self.path.clone(), e))?;
                Ok(Some(record))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ServerStorageError::IoError(self.path.clone(), e)),
        }
    }

    /// Persists a new draft state, incrementing the version.
    ///
    /// Stamps `lastSaved` with the current time and records the writing
    /// editor. Last write wins; callers hold a write lock to keep the
    /// read-increment-write cycle exclusive. Returns the new version.
    pub fn put(&self, state: &Draft, user_id: &str) -> Result<u64, ServerStorageError> {
        let version = self.load()?.map(|r| r.version + 1).unwrap_or(1);

        let mut state = state.clone();
        state.set("lastSaved", serde_json::json!(Utc::now().to_rfc3339()));

        let record = DraftRecord {
            state,
            version,
            user_id: user_id.to_string(),
        };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| ServerStorageError::IoError(parent.to_path_buf(), e))?;
        }

        let bytes = serde_json::to_vec(&record)
            .map_err(|e| ServerStorageError::ParseError(self.path.clone(), e))?;

        // Write atomically using temp file + rename
        let temp_path = self.path.with_extension("json.tmp");
        let mut file = File::create(&temp_path)
            .map_err(|e| ServerStorageError::IoError(temp_path.clone(), e))?;
        file.write_all(&bytes)
            .map_err(|e| ServerStorageError::IoError(temp_path.clone(), e))?;
        file.sync_all()
            .map_err(|e| ServerStorageError::IoError(temp_path.clone(), e))?;

        fs::rename(&temp_path, &self.path)
            .map_err(|e| ServerStorageError::IoError(self.path.clone(), e))?;

        Ok(version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn setup() -> (DraftStorage, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let storage = DraftStorage::new(temp_dir.path());
        (storage, temp_dir)
    }

    #[test]
    fn test_load_nonexistent_returns_none() {
        let (storage, _temp) = setup();
        assert!(storage.load().unwrap().is_none());
    }

    #[test]
    fn test_put_and_load_roundtrip() {
        let (storage, _temp) = setup();

        let mut draft = Draft::new();
        draft.set("subject", json!("Issue 1"));

        let version = storage.put(&draft, "editor-1").unwrap();
        assert_eq!(version, 1);

        let record = storage.load().unwrap().unwrap();
        assert_eq!(record.version, 1);
        assert_eq!(record.user_id, "editor-1");
        assert_eq!(record.state.get("subject"), Some(&json!("Issue 1")));
    }

    #[test]
    fn test_version_strictly_increases() {
        let (storage, _temp) = setup();
        let draft = Draft::new();

        let mut last = 0;
        for _ in 0..5 {
            let version = storage.put(&draft, "editor-1").unwrap();
            assert!(version > last);
            last = version;
        }
        assert_eq!(storage.load().unwrap().unwrap().version, 5);
    }

    #[test]
    fn test_put_records_last_editor() {
        let (storage, _temp) = setup();
        let draft = Draft::new();

        storage.put(&draft, "editor-1").unwrap();
        storage.put(&draft, "editor-2").unwrap();

        let record = storage.load().unwrap().unwrap();
        assert_eq!(record.user_id, "editor-2");
    }

    #[test]
    fn test_put_stamps_last_saved() {
        let (storage, _temp) = setup();

        let mut draft = Draft::new();
        draft.set("subject", json!("A"));
        // A client-supplied lastSaved is overwritten by the server's stamp
        draft.set("lastSaved", json!("1999-01-01T00:00:00Z"));

        storage.put(&draft, "editor-1").unwrap();
        let record = storage.load().unwrap().unwrap();
        let stamped = record.state.get("lastSaved").unwrap().as_str().unwrap();
        assert_ne!(stamped, "1999-01-01T00:00:00Z");
        assert!(chrono::DateTime::parse_from_rfc3339(stamped).is_ok());
    }

    #[test]
    fn test_put_creates_data_dir() {
        let temp_dir = TempDir::new().unwrap();
        let nested = temp_dir.path().join("server").join("data");
        let storage = DraftStorage::new(nested.clone());

        storage.put(&Draft::new(), "editor-1").unwrap();
        assert!(nested.join("draft.json").exists());
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let (storage, temp) = setup();
        std::fs::write(temp.path().join("draft.json"), b"not json").unwrap();
        assert!(matches!(
            storage.load(),
            Err(ServerStorageError::ParseError(_, _))
        ));
    }
}
