//! Storage Layer
//!
//! All disk access for level descriptors, score ledgers and settings goes
//! through [`LocalStorage`]. Operations are blocking; the pipeline runs them
//! in direct response to a save, selection, load or completion event.

pub mod local;

pub use local::LocalStorage;

use thiserror::Error;

/// Storage error types
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StorageError {
    /// File or directory not found
    #[error("not found: {0}")]
    NotFound(String),
    /// Permission denied
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    /// Any other I/O failure
    #[error("I/O error: {0}")]
    Io(String),
}

impl StorageError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound(_))
    }
}

impl From<std::io::Error> for StorageError {
    fn from(e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::NotFound => StorageError::NotFound(e.to_string()),
            std::io::ErrorKind::PermissionDenied => StorageError::PermissionDenied(e.to_string()),
            _ => StorageError::Io(e.to_string()),
        }
    }
}
