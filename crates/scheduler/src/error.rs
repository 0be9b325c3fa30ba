use crontide_pattern::PatternError;

/// Shared error type for the scheduling core.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Malformed scheduling pattern text.
    #[error("invalid pattern: {0}")]
    Pattern(#[from] PatternError),

    /// Operation not valid for the current scheduler or executor state.
    #[error("illegal state: {0}")]
    IllegalState(String),

    /// The target task does not declare support for the operation.
    #[error("unsupported operation: {0}")]
    Unsupported(String),

    /// Failure escaped from a task body (error return or panic).
    #[error("task failed: {0}")]
    Task(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
