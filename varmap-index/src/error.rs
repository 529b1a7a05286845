use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::element::ElementKind;

/// Error type for varmap-index operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// IO error occurred during file operations.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Another writer holds the lock file of the index.
    #[error("Index at {0:?} is locked by another writer")]
    Locked(PathBuf),

    #[error("Index at {0:?} must be closed before it can be reset")]
    ResetWhileOpen(PathBuf),

    #[error("Index at {0:?} is not open")]
    NotOpen(PathBuf),

    #[error("Index at {0:?} is already open")]
    AlreadyOpen(PathBuf),

    /// The store on disk was created for another element type.
    #[error("Index stores {found} elements but was opened for {expected} elements")]
    ElementKindMismatch {
        expected: ElementKind,
        found: ElementKind,
    },

    /// A value was rejected by its element codec.
    #[error("Invalid set element: {0}")]
    InvalidElement(String),

    #[error("Corrupted shard {path:?}: {reason}")]
    Corrupted { path: PathBuf, reason: String },

    #[error("Invalid index metadata: {0}")]
    Metadata(String),
}

/// Result type alias for varmap-index operations.
pub type Result<T> = std::result::Result<T, StorageError>;
