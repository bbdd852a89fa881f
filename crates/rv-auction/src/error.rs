use chrono::{DateTime, Utc};
use rv_store::StoreError;
use rv_types::{Amount, ErrorKind, ListingStatus};

/// Errors produced by auction operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuctionError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("forbidden")]
    Forbidden,

    #[error("auction has not ended yet (ends at {ends_at})")]
    NotReady { ends_at: DateTime<Utc> },

    #[error("auction is already {status}")]
    AlreadyTerminal { status: ListingStatus },

    #[error("bid of {offered} must be higher than current bid {current}")]
    BidTooLow { offered: Amount, current: Amount },

    #[error("auction is not active (status {status})")]
    AuctionNotActive { status: ListingStatus },

    #[error("auction has ended")]
    AuctionEnded,

    #[error("cannot bid on your own listing")]
    SelfBid,

    #[error("listing is contended; gave up after {attempts} attempts")]
    Conflict { attempts: u32 },

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl AuctionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Forbidden => ErrorKind::Forbidden,
            Self::NotReady { .. } => ErrorKind::NotReady,
            Self::AlreadyTerminal { .. } => ErrorKind::AlreadyTerminal,
            Self::BidTooLow { .. } => ErrorKind::BidTooLow,
            Self::AuctionNotActive { .. } => ErrorKind::AuctionNotActive,
            Self::AuctionEnded => ErrorKind::AuctionEnded,
            Self::SelfBid => ErrorKind::SelfBid,
            Self::Conflict { .. } => ErrorKind::Conflict,
            Self::Store(_) => ErrorKind::Internal,
        }
    }
}

pub type AuctionResult<T> = Result<T, AuctionError>;
