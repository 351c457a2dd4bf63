use keep_types::lifecycle::InvalidTransition;
use thiserror::Error;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("validation failed: {0}")]
    Validation(String),

    /// Absent, or owned by someone else. The two are deliberately
    /// indistinguishable.
    #[error("not found")]
    NotFound,

    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("{0}")]
    Internal(#[from] anyhow::Error),
}
