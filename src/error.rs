//! Error kinds shared by the grade engine, the directory queries and the
//! exchange adapter. Each kind has a stable wire code.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GradeError {
    /// Malformed or out-of-range input.
    #[error("{0}")]
    Validation(String),

    /// A uniqueness constraint rejected the write.
    #[error("{0}")]
    Conflict(String),

    /// The acting account may not perform the operation.
    #[error("{0}")]
    Forbidden(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("login required")]
    Unauthenticated,

    #[error("select a workspace first")]
    NoWorkspace,

    /// The uploaded table could not be decoded at all.
    #[error("unreadable input: {0}")]
    Unreadable(String),

    #[error(transparent)]
    Storage(#[from] rusqlite::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl GradeError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "bad_params",
            Self::Conflict(_) => "conflict",
            Self::Forbidden(_) => "forbidden",
            Self::NotFound(_) => "not_found",
            Self::Unauthenticated => "unauthenticated",
            Self::NoWorkspace => "no_workspace",
            Self::Unreadable(_) => "unreadable_input",
            Self::Storage(_) => "db_query_failed",
            Self::Io(_) => "io_failed",
        }
    }
}

pub type GradeResult<T> = std::result::Result<T, GradeError>;

/// True when a write was rejected by a UNIQUE constraint.
pub fn is_unique_violation(e: &rusqlite::Error) -> bool {
    match e {
        rusqlite::Error::SqliteFailure(inner, _) => {
            inner.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                || inner.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
        }
        _ => false,
    }
}
