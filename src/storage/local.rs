//! Local filesystem storage backend
//!
//! Relative paths resolve against a base directory; absolute paths are used
//! as given.

use super::StorageError;
use std::path::{Path, PathBuf};

/// Local filesystem storage backend
#[derive(Debug, Clone)]
pub struct LocalStorage {
    /// Base directory for relative paths (usually current working directory)
    base_dir: PathBuf,
}

impl Default for LocalStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalStorage {
    /// Create a new local storage backend rooted at the current directory
    pub fn new() -> Self {
        Self {
            base_dir: PathBuf::from("."),
        }
    }

    /// Create a local storage backend with a custom base directory
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Resolve a path relative to the base directory
    pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        self.base_dir.join(path)
    }

    /// List regular files in a directory
    ///
    /// Returns full paths in whatever order the filesystem yields them.
    pub fn list(&self, path: impl AsRef<Path>) -> Result<Vec<PathBuf>, StorageError> {
        let full_path = self.resolve(path);
        let files = std::fs::read_dir(&full_path)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_file())
            .collect();
        Ok(files)
    }

    /// Read a file
    pub fn read(&self, path: impl AsRef<Path>) -> Result<Vec<u8>, StorageError> {
        Ok(std::fs::read(self.resolve(path))?)
    }

    /// Read a file as UTF-8
    pub fn read_string(&self, path: impl AsRef<Path>) -> Result<String, StorageError> {
        let bytes = self.read(path)?;
        String::from_utf8(bytes).map_err(|e| StorageError::Io(format!("invalid UTF-8: {}", e)))
    }

    /// Write a file
    ///
    /// Creates or overwrites the file with the given data.
    pub fn write(&self, path: impl AsRef<Path>, data: &[u8]) -> Result<(), StorageError> {
        let full_path = self.resolve(path);

        // Ensure parent directory exists
        if let Some(parent) = full_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(&full_path, data)?;
        Ok(())
    }
}
