//! Local fallback cache for the draft.
//!
//! A file-backed shadow of the local draft state, written on every edit
//! regardless of store connectivity. Used at bootstrap when the draft store
//! is unreachable or unconfigured, so a crash or outage never loses the most
//! recent local state. Writes are best-effort; the caller logs failures and
//! carries on.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::PathBuf;

use crate::document::Draft;

const CACHE_FILENAME: &str = "draft.json";

/// Errors from cache operations.
#[derive(Debug)]
pub enum CacheError {
    /// I/O error reading or writing the cache file.
    IoError(PathBuf, io::Error),
    /// The cache file exists but does not parse as a draft.
    ParseError(PathBuf, serde_json::Error),
}

impl std::fmt::Display for CacheError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheError::IoError(path, e) => {
                write!(f, "I/O error for {}: {}", path.display(), e)
            }
            CacheError::ParseError(path, e) => {
                write!(f, "Failed to parse cached draft {}: {}", path.display(), e)
            }
        }
    }
}

impl std::error::Error for CacheError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CacheError::IoError(_, e) => Some(e),
            CacheError::ParseError(_, e) => Some(e),
        }
    }
}

/// File-backed draft cache in the client data directory.
#[derive(Debug, Clone)]
pub struct DraftCache {
    path: PathBuf,
}

impl DraftCache {
    /// Creates a cache rooted at the given data directory.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            path: data_dir.into().join(CACHE_FILENAME),
        }
    }

    /// Returns the cache file path.
    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Loads the cached draft.
    ///
    /// Returns `Ok(None)` if no draft has been cached yet.
    pub fn load(&self) -> Result<Option<Draft>, CacheError> {
        match fs::read(&self.path) {
            Ok(bytes) => {
                let draft = serde_json::from_slice(&bytes)
                    .map_err(|e| CacheError::ParseError(self.path.clone(), e))?;
                Ok(Some(draft))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(CacheError::IoError(self.path.clone(), e)),
        }
    }

    /// Saves the draft to disk.
    ///
    /// Writes to a temp file and renames, so a crash mid-write never leaves a
    /// truncated cache.
    pub fn save(&self, draft: &Draft) -> Result<(), CacheError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| CacheError::IoError(parent.to_path_buf(), e))?;
        }

        let bytes = serde_json::to_vec(draft)
            .map_err(|e| CacheError::ParseError(self.path.clone(), e))?;

        let temp_path = self.path.with_extension("json.tmp");
        let mut file = File::create(&temp_path)
            .map_err(|e| CacheError::IoError(temp_path.clone(), e))?;
        file.write_all(&bytes)
            .map_err(|e| CacheError::IoError(temp_path.clone(), e))?;
        file.sync_all()
            .map_err(|e| CacheError::IoError(temp_path.clone(), e))?;

        fs::rename(&temp_path, &self.path)
            .map_err(|e| CacheError::IoError(self.path.clone(), e))?;

        Ok(())
    }
}
