use rv_store::StoreError;
use rv_types::ErrorKind;

/// Errors produced by counter and relationship operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CounterError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("forbidden")]
    Forbidden,

    #[error("{0} already exists")]
    AlreadyExists(&'static str),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl CounterError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Forbidden => ErrorKind::Forbidden,
            Self::AlreadyExists(_) => ErrorKind::AlreadyExists,
            Self::Store(_) => ErrorKind::Internal,
        }
    }
}

pub type CounterResult<T> = Result<T, CounterError>;
