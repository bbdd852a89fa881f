use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use rv_store::{BidLog, CasOutcome, ListingStore};
use rv_types::{Amount, BidRecord, Clock, Listing, ListingId, UserId};

use crate::config::AuctionConfig;
use crate::error::{AuctionError, AuctionResult};

/// An accepted bid.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BidReceipt {
    pub listing_id: ListingId,
    pub accepted_amount: Amount,
    /// Listing version this bid produced.
    pub version: u64,
    /// Conditional-write attempts it took.
    pub attempts: u32,
}

/// Validates and applies bids with optimistic concurrency.
///
/// A bid is committed only through a compare-and-swap on the version it was
/// validated against. When another bid commits first the write is rejected
/// by the store, and the bid is re-read and re-validated against the new
/// state. A lower bid therefore can never overwrite a higher committed one,
/// regardless of arrival order.
pub struct BidArbiter {
    listings: Arc<dyn ListingStore>,
    bid_log: Arc<dyn BidLog>,
    clock: Arc<dyn Clock>,
    config: AuctionConfig,
}

impl BidArbiter {
    pub fn new(
        listings: Arc<dyn ListingStore>,
        bid_log: Arc<dyn BidLog>,
        clock: Arc<dyn Clock>,
        config: AuctionConfig,
    ) -> Self {
        Self {
            listings,
            bid_log,
            clock,
            config,
        }
    }

    pub async fn place_bid(
        &self,
        listing_id: &ListingId,
        bidder: &UserId,
        amount: Amount,
    ) -> AuctionResult<BidReceipt> {
        let attempts = self.config.bid_max_attempts;
        for attempt in 1..=attempts {
            let listing = self
                .listings
                .get(listing_id)
                .await?
                .ok_or(AuctionError::NotFound("listing"))?;
            let now = self.clock.now();
            validate_bid(&listing, bidder, amount, now)?;

            let next = listing.with_bid(bidder, amount, now);
            match self.listings.compare_and_swap(listing.version, &next).await? {
                CasOutcome::Committed => {
                    tracing::info!(
                        listing = %listing_id,
                        bidder = %bidder,
                        amount = %amount,
                        version = next.version,
                        attempt,
                        "bid accepted"
                    );
                    self.record(&next, bidder, amount, now).await;
                    return Ok(BidReceipt {
                        listing_id: *listing_id,
                        accepted_amount: amount,
                        version: next.version,
                        attempts: attempt,
                    });
                }
                CasOutcome::VersionMismatch => {
                    tracing::debug!(
                        listing = %listing_id,
                        observed_version = listing.version,
                        attempt,
                        "bid lost a race; re-reading"
                    );
                    tokio::task::yield_now().await;
                }
            }
        }

        tracing::warn!(listing = %listing_id, attempts, "bid gave up under contention");
        Err(AuctionError::Conflict { attempts })
    }

    /// Accepted bids for a listing in version order.
    pub async fn history(&self, listing_id: &ListingId) -> AuctionResult<Vec<BidRecord>> {
        Ok(self.bid_log.bids_for(listing_id).await?)
    }

    async fn record(&self, listing: &Listing, bidder: &UserId, amount: Amount, now: DateTime<Utc>) {
        let record = BidRecord {
            listing_id: listing.id,
            bidder_id: bidder.clone(),
            amount,
            version: listing.version,
            placed_at: now,
        };
        if let Err(err) = self.bid_log.append(&record).await {
            // The bid itself is committed; only the audit trail is missing.
            tracing::error!(
                listing = %listing.id,
                version = listing.version,
                error = %err,
                "failed to append bid record"
            );
        }
    }
}

/// Bid preconditions, in the order they are reported.
fn validate_bid(
    listing: &Listing,
    bidder: &UserId,
    amount: Amount,
    now: DateTime<Utc>,
) -> AuctionResult<()> {
    if !listing.is_active() {
        return Err(AuctionError::AuctionNotActive {
            status: listing.status,
        });
    }
    if listing.has_ended(now) {
        return Err(AuctionError::AuctionEnded);
    }
    if bidder == &listing.owner_id {
        return Err(AuctionError::SelfBid);
    }
    if amount <= listing.current_bid {
        return Err(AuctionError::BidTooLow {
            offered: amount,
            current: listing.current_bid,
        });
    }
    Ok(())
}
