/// Errors from ledger store operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The addressed record does not exist.
    #[error("record not found: {0}")]
    NotFound(String),

    /// A record with the same identity already exists.
    #[error("record already exists: {0}")]
    AlreadyExists(String),

    /// The write was malformed (for example a successor that skips a version).
    #[error("invalid write: {0}")]
    InvalidWrite(String),

    /// The backend could not serve the request.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
