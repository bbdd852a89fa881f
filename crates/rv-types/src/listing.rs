use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::amount::Amount;
use crate::error::TypeError;
use crate::ids::{ListingId, PostId, UserId};

/// Lifecycle status of a listing. `Sold` and `Expired` are terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingStatus {
    Active,
    Sold,
    Expired,
}

impl ListingStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Active)
    }

    /// The only legal transitions are `active -> sold` and `active -> expired`.
    pub fn can_transition_to(&self, next: ListingStatus) -> bool {
        matches!(
            (self, next),
            (Self::Active, Self::Sold) | (Self::Active, Self::Expired)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Sold => "sold",
            Self::Expired => "expired",
        }
    }
}

impl fmt::Display for ListingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ListingStatus {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "sold" => Ok(Self::Sold),
            "expired" => Ok(Self::Expired),
            other => Err(TypeError::UnknownStatus(other.to_string())),
        }
    }
}

/// Request to open a new listing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewListing {
    pub post_id: PostId,
    pub owner_id: UserId,
    pub starting_bid: Amount,
    pub auction_end_time: DateTime<Utc>,
}

/// An item under timed auction.
///
/// `version` increases by exactly one on every committed mutation and is the
/// sole concurrency guard for the mutable fields.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    pub id: ListingId,
    pub post_id: PostId,
    pub owner_id: UserId,
    pub starting_bid: Amount,
    pub current_bid: Amount,
    pub highest_bidder: Option<UserId>,
    pub auction_end_time: DateTime<Utc>,
    pub status: ListingStatus,
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Listing {
    /// A fresh `active` listing at version 0 with `current_bid = starting_bid`.
    /// Input validation is the caller's responsibility.
    pub fn open(new: NewListing, now: DateTime<Utc>) -> Self {
        Self {
            id: ListingId::new(),
            post_id: new.post_id,
            owner_id: new.owner_id,
            starting_bid: new.starting_bid,
            current_bid: new.starting_bid,
            highest_bidder: None,
            auction_end_time: new.auction_end_time,
            status: ListingStatus::Active,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == ListingStatus::Active
    }

    /// `true` once `now >= auction_end_time`.
    pub fn has_ended(&self, now: DateTime<Utc>) -> bool {
        now >= self.auction_end_time
    }

    /// The successor state after accepting `amount` from `bidder`.
    pub fn with_bid(&self, bidder: &UserId, amount: Amount, now: DateTime<Utc>) -> Self {
        Self {
            current_bid: amount,
            highest_bidder: Some(bidder.clone()),
            version: self.version + 1,
            updated_at: now,
            ..self.clone()
        }
    }

    /// The successor state after a status transition.
    pub fn with_status(&self, status: ListingStatus, now: DateTime<Utc>) -> Self {
        Self {
            status,
            version: self.version + 1,
            updated_at: now,
            ..self.clone()
        }
    }
}

/// Audit record of an accepted bid.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BidRecord {
    pub listing_id: ListingId,
    pub bidder_id: UserId,
    pub amount: Amount,
    /// Listing version produced by this bid.
    pub version: u64,
    pub placed_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn t0() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn listing() -> Listing {
        Listing::open(
            NewListing {
                post_id: PostId::new("p1").unwrap(),
                owner_id: UserId::new("owner").unwrap(),
                starting_bid: Amount::from(100),
                auction_end_time: t0() + Duration::hours(1),
            },
            t0(),
        )
    }

    #[test]
    fn open_starts_active_at_starting_bid() {
        let l = listing();
        assert!(l.is_active());
        assert_eq!(l.current_bid, l.starting_bid);
        assert_eq!(l.version, 0);
        assert!(l.highest_bidder.is_none());
    }

    #[test]
    fn end_time_is_inclusive() {
        let l = listing();
        assert!(!l.has_ended(l.auction_end_time - Duration::seconds(1)));
        assert!(l.has_ended(l.auction_end_time));
    }

    #[test]
    fn successors_bump_version() {
        let l = listing();
        let bidder = UserId::new("b").unwrap();
        let bid = l.with_bid(&bidder, Amount::from(150), t0());
        assert_eq!(bid.version, 1);
        assert_eq!(bid.highest_bidder, Some(bidder));
        let sold = bid.with_status(ListingStatus::Sold, t0());
        assert_eq!(sold.version, 2);
        assert_eq!(sold.current_bid, Amount::from(150));
    }

    #[test]
    fn terminal_statuses_have_no_exits() {
        for from in [ListingStatus::Sold, ListingStatus::Expired] {
            assert!(from.is_terminal());
            for to in [ListingStatus::Active, ListingStatus::Sold, ListingStatus::Expired] {
                assert!(!from.can_transition_to(to));
            }
        }
        assert!(ListingStatus::Active.can_transition_to(ListingStatus::Sold));
        assert!(!ListingStatus::Active.can_transition_to(ListingStatus::Active));
    }

    #[test]
    fn json_uses_camel_case() {
        let json = serde_json::to_value(listing()).unwrap();
        assert!(json.get("currentBid").is_some());
        assert!(json.get("auctionEndTime").is_some());
        assert_eq!(json["status"], "active");
    }
}
