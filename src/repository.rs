//! Level Repository
//!
//! Discovers descriptor files under the content root and remembers which one
//! the player picked. Discovery order is lexical by display name (then path)
//! so the same directory always presents the same list.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::storage::{LocalStorage, StorageError};

/// Metadata about a stored level (without loading it)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelInfo {
    /// Display name (filename without extension)
    pub name: String,
    /// Full path to the descriptor file
    pub path: PathBuf,
}

impl LevelInfo {
    fn from_path(path: PathBuf) -> Self {
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "unnamed".to_string());
        Self { name, path }
    }
}

/// The level chosen for the next load
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionHandle {
    pub level: LevelInfo,
}

impl SelectionHandle {
    pub fn name(&self) -> &str {
        &self.level.name
    }

    pub fn path(&self) -> &Path {
        &self.level.path
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RepositoryError {
    #[error("invalid level name '{0}'")]
    InvalidName(String),
}

/// Enumerates descriptor files and tracks the current selection
#[derive(Debug, Clone)]
pub struct LevelRepository {
    content_root: PathBuf,
    extension: String,
    selection: Option<SelectionHandle>,
}

impl LevelRepository {
    pub fn new(content_root: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            content_root: content_root.into(),
            extension: extension.into(),
            selection: None,
        }
    }

    pub fn content_root(&self) -> &Path {
        &self.content_root
    }

    fn has_extension(&self, path: &Path) -> bool {
        path.extension()
            .map(|e| e.to_string_lossy().eq_ignore_ascii_case(&self.extension))
            .unwrap_or(false)
    }

    /// Discover all descriptor files in the content root.
    ///
    /// A missing content root simply has no levels.
    pub fn discover(&self) -> Result<Vec<LevelInfo>, StorageError> {
        let storage = LocalStorage::new();
        let files = match storage.list(&self.content_root) {
            Ok(files) => files,
            Err(e) if e.is_not_found() => {
                log::debug!("Content root {} does not exist", self.content_root.display());
                return Ok(Vec::new());
            }
            Err(e) => return Err(e),
        };

        let mut levels: Vec<LevelInfo> = files
            .into_iter()
            .filter(|p| self.has_extension(p))
            .map(LevelInfo::from_path)
            .collect();

        levels.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.path.cmp(&b.path)));
        Ok(levels)
    }

    /// Make `path` the current selection for the next load
    pub fn select(&mut self, path: impl Into<PathBuf>) -> SelectionHandle {
        let handle = SelectionHandle {
            level: LevelInfo::from_path(path.into()),
        };
        log::debug!("Selected level '{}'", handle.name());
        self.selection = Some(handle.clone());
        handle
    }

    pub fn current(&self) -> Option<&SelectionHandle> {
        self.selection.as_ref()
    }

    /// Path a level named `name` is saved to
    pub fn path_for(&self, name: &str) -> Result<PathBuf, RepositoryError> {
        let bad = name.trim().is_empty()
            || name.contains('/')
            || name.contains('\\')
            || name.contains("..")
            || name.contains('\0');
        if bad {
            return Err(RepositoryError::InvalidName(name.to_string()));
        }
        Ok(self.content_root.join(format!("{}.{}", name, self.extension)))
    }
}
