//! Editor identity for tagging writes.
//!
//! Each client session carries an opaque editor id. The store records it with
//! every write and returns it from metadata reads, which is how the sync
//! manager tells its own saves apart from other editors' - a poll that sees
//! its own id never triggers a merge.
//!
//! The id is generated once per installation, persisted in the data
//! directory, and reused across sessions. It is not validated or
//! authenticated by this subsystem.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

const IDENTITY_FILENAME: &str = "editor_id";

/// Errors from identity resolution.
#[derive(Debug)]
pub enum IdentityError {
    /// I/O error reading or writing the identity file.
    IoError(PathBuf, io::Error),
}

impl std::fmt::Display for IdentityError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IdentityError::IoError(path, e) => {
                write!(f, "I/O error for {}: {}", path.display(), e)
            }
        }
    }
}

impl std::error::Error for IdentityError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            IdentityError::IoError(_, e) => Some(e),
        }
    }
}

/// A persistent, opaque editor identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorIdentity {
    id: String,
}

impl EditorIdentity {
    /// Loads the editor id from the data directory, creating one on first
    /// use.
    pub fn load_or_create(data_dir: &Path) -> Result<Self, IdentityError> {
        let path = data_dir.join(IDENTITY_FILENAME);

        match fs::read_to_string(&path) {
            Ok(contents) => {
                let id = contents.trim().to_string();
                if !id.is_empty() {
                    return Ok(Self { id });
                }
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(IdentityError::IoError(path, e)),
        }

        let id = uuid::Uuid::new_v4().to_string();
        fs::create_dir_all(data_dir)
            .map_err(|e| IdentityError::IoError(data_dir.to_path_buf(), e))?;
        fs::write(&path, &id).map_err(|e| IdentityError::IoError(path, e))?;

        Ok(Self { id })
    }

    /// Returns the opaque id string.
    pub fn id(&self) -> &str {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_creates_id_on_first_use() {
        let temp_dir = TempDir::new().unwrap();
        let identity = EditorIdentity::load_or_create(temp_dir.path()).unwrap();
        assert!(!identity.id().is_empty());
        assert!(temp_dir.path().join("editor_id").exists());
    }

    #[test]
    fn test_stable_across_reloads() {
        let temp_dir = TempDir::new().unwrap();
        let first = EditorIdentity::load_or_create(temp_dir.path()).unwrap();
        let second = EditorIdentity::load_or_create(temp_dir.path()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_distinct_per_data_dir() {
        let dir_a = TempDir::new().unwrap();
        let dir_b = TempDir::new().unwrap();
        let a = EditorIdentity::load_or_create(dir_a.path()).unwrap();
        let b = EditorIdentity::load_or_create(dir_b.path()).unwrap();
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_ignores_surrounding_whitespace() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("editor_id"), "  editor-7\n").unwrap();
        let identity = EditorIdentity::load_or_create(temp_dir.path()).unwrap();
        assert_eq!(identity.id(), "editor-7");
    }

    #[test]
    fn test_empty_file_regenerates() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("editor_id"), "").unwrap();
        let identity = EditorIdentity::load_or_create(temp_dir.path()).unwrap();
        assert!(!identity.id().is_empty());
    }
}
