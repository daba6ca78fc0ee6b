//! Error types for storage operations.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The segment does not exist.
    #[error("segment not found: {}", path.display())]
    NotFound {
        /// The missing path.
        path: PathBuf,
    },

    /// A segment already exists at the path.
    #[error("segment already exists: {}", path.display())]
    AlreadyExists {
        /// The conflicting path.
        path: PathBuf,
    },

    /// A fault injected by a test store.
    #[error("injected {0} fault")]
    Injected(&'static str),
}

impl StorageError {
    /// Maps an I/O error for `path`, keeping the path for the common
    /// not-found and already-exists cases.
    pub fn from_io(err: io::Error, path: impl Into<PathBuf>) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => Self::NotFound { path: path.into() },
            io::ErrorKind::AlreadyExists => Self::AlreadyExists { path: path.into() },
            _ => Self::Io(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_io_keeps_path_for_not_found() {
        let err = StorageError::from_io(io::Error::from(io::ErrorKind::NotFound), "/a/b");
        assert!(matches!(err, StorageError::NotFound { ref path } if path == &PathBuf::from("/a/b")));
        assert_eq!(err.to_string(), "segment not found: /a/b");
    }

    #[test]
    fn from_io_passes_other_errors_through() {
        let err = StorageError::from_io(io::Error::other("disk on fire"), "/a");
        assert!(matches!(err, StorageError::Io(_)));
    }
}
