use mongodb::error::Error as DbError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// The kind of a failure, carried as structured data so that callers can
/// map outcomes to transport-level response codes without inspecting
/// message text.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Unauthorized,
    InvalidInput,
    Conflict,
    PreconditionFailed,
    Internal,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Invalid input: {}", .0.join(", "))]
    InvalidInput(Vec<String>),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Precondition failed: {0}")]
    PreconditionFailed(String),
    #[error(transparent)]
    Db(#[from] DbError),
}

impl Error {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn unauthorized(why: impl Into<String>) -> Self {
        Self::Unauthorized(why.into())
    }

    pub fn conflict(why: impl Into<String>) -> Self {
        Self::Conflict(why.into())
    }

    pub fn precondition_failed(why: impl Into<String>) -> Self {
        Self::PreconditionFailed(why.into())
    }

    /// The tagged kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Unauthorized(_) => ErrorKind::Unauthorized,
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::PreconditionFailed(_) => ErrorKind::PreconditionFailed,
            Self::Db(_) => ErrorKind::Internal,
        }
    }

    /// Message safe to surface to end users. Storage failures are reported
    /// generically; their detail stays in the logs.
    pub fn public_message(&self) -> String {
        match self {
            Self::Db(_) => "Internal error".to_string(),
            other => other.to_string(),
        }
    }

    /// The individual violations behind an [`Error::InvalidInput`].
    pub fn violations(&self) -> &[String] {
        match self {
            Self::InvalidInput(errors) => errors,
            _ => &[],
        }
    }
}
