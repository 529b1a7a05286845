use std::path::PathBuf;

use thiserror::Error;

use varmap_index::StorageError;

#[derive(Error, Debug)]
pub enum ImportConfigError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Toml(#[from] toml::de::Error),
}

///
/// Failures that end an import run. Problems with single lines or
/// consequence items are counted in the report instead.
///
#[derive(Error, Debug)]
pub enum ImportError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("Invalid source file pattern: {0}")]
    Pattern(#[from] glob::PatternError),
    #[error("Error reading source file entry: {0}")]
    Glob(#[from] glob::GlobError),
    #[error(transparent)]
    Config(#[from] ImportConfigError),
    #[error("Failed to read source file {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: anyhow::Error,
    },
}

pub type ImportResult<T> = std::result::Result<T, ImportError>;
