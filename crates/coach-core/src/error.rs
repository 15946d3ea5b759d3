//! Error taxonomy shared by every domain operation.

/// Errors surfaced by domain operations.
///
/// `NotFound` doubles as the authorization-denial signal: callers asking for
/// rows they do not own get the same answer as for rows that do not exist.
#[derive(Debug, thiserror::Error)]
pub enum CoachError {
    /// Missing or malformed input. Checked before any write.
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    /// A domain rule refused the request.
    #[error("{0}")]
    Conflict(String),

    /// Transaction or connectivity failure. The message is for logs only.
    #[error("storage error: {0:#}")]
    Storage(#[from] anyhow::Error),
}

impl From<sqlx::Error> for CoachError {
    fn from(err: sqlx::Error) -> Self {
        Self::Storage(anyhow::Error::new(err))
    }
}

impl CoachError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }
}

pub type CoachResult<T> = Result<T, CoachError>;

/// Whether a storage error was caused by a unique-constraint violation.
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        cause
            .downcast_ref::<sqlx::Error>()
            .and_then(|e| e.as_database_error())
            .is_some_and(|db| db.is_unique_violation())
    })
}
