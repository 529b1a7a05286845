use thiserror::Error;

use varmap_index::StorageError;

#[derive(Error, Debug)]
pub enum QueryError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// A protein repository or mutation registry call failed.
    #[error("Collaborator failed: {0}")]
    Collaborator(#[source] anyhow::Error),
}

pub type QueryResult<T> = std::result::Result<T, QueryError>;
