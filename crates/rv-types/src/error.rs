use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced by type parsing and construction.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    #[error("unknown counter field: {0}")]
    UnknownCounterField(String),

    #[error("unknown listing status: {0}")]
    UnknownStatus(String),
}

/// Stable, machine-readable error kind.
///
/// Every error surfaced by the engine maps to exactly one kind. The string
/// form is part of the public contract and must not change.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidInput,
    NotFound,
    Forbidden,
    Conflict,
    NotReady,
    AlreadyTerminal,
    BidTooLow,
    AuctionNotActive,
    AuctionEnded,
    SelfBid,
    AlreadyExists,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidInput => "invalid_input",
            Self::NotFound => "not_found",
            Self::Forbidden => "forbidden",
            Self::Conflict => "conflict",
            Self::NotReady => "not_ready",
            Self::AlreadyTerminal => "already_terminal",
            Self::BidTooLow => "bid_too_low",
            Self::AuctionNotActive => "auction_not_active",
            Self::AuctionEnded => "auction_ended",
            Self::SelfBid => "self_bid",
            Self::AlreadyExists => "already_exists",
            Self::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_strings_match_serde() {
        for kind in [
            ErrorKind::InvalidInput,
            ErrorKind::NotReady,
            ErrorKind::AlreadyTerminal,
            ErrorKind::BidTooLow,
            ErrorKind::SelfBid,
        ] {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
        }
    }
}
