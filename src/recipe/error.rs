use crate::core::DbError;
use thiserror::Error;

/// A caller's request could not be turned into a statement.
///
/// Raised before any connection is taken.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IntentError {
    #[error("invalid intent: {0}")]
    InvalidIntent(String),

    #[error("unknown field '{0}'")]
    InvalidField(String),
}

impl IntentError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidIntent(message.into())
    }
}

#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Intent(#[from] IntentError),

    #[error("store error: {0}")]
    Store(#[from] DbError),

    #[error("unexpected row shape: {0}")]
    Corrupt(String),
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;
