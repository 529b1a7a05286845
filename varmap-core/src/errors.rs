use thiserror::Error;

/// Failures of the mutation and record codecs.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Text that does not have the expected shape, or a value that cannot be
    /// encoded without ambiguity.
    #[error("Format error: {0}")]
    Format(String),

    /// Values that parse fine but contradict each other.
    #[error("Data inconsistency: {0}")]
    DataInconsistency(String),
}

pub type CodecResult<T> = std::result::Result<T, CodecError>;
