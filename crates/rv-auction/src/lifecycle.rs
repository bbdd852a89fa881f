use std::sync::Arc;

use rv_store::{CasOutcome, EntityDirectory, ListingStore};
use rv_types::{Clock, Listing, ListingId, ListingStatus, NewListing, UserId};

use crate::config::AuctionConfig;
use crate::error::{AuctionError, AuctionResult};

/// Result of one expiry sweep pass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Candidates returned by the store.
    pub examined: usize,
    /// Listings moved to `expired` by this pass.
    pub expired: Vec<ListingId>,
    /// Candidates that could not be processed (store errors or contention).
    pub failed: usize,
}

/// Owner of the listing state machine.
///
/// Status transitions go through a version-gated conditional write so they
/// cannot clobber a bid committed in between, and a transition is applied at
/// most once: whoever loses the race observes a terminal status on re-read.
pub struct AuctionLifecycle {
    listings: Arc<dyn ListingStore>,
    directory: Arc<dyn EntityDirectory>,
    clock: Arc<dyn Clock>,
    config: AuctionConfig,
}

impl AuctionLifecycle {
    pub fn new(
        listings: Arc<dyn ListingStore>,
        directory: Arc<dyn EntityDirectory>,
        clock: Arc<dyn Clock>,
        config: AuctionConfig,
    ) -> Self {
        Self {
            listings,
            directory,
            clock,
            config,
        }
    }

    /// Create a listing from a post owned by `new.owner_id`.
    pub async fn create_listing(&self, new: NewListing) -> AuctionResult<Listing> {
        let owner = self
            .directory
            .post_owner(&new.post_id)
            .await?
            .ok_or(AuctionError::NotFound("post"))?;
        if owner != new.owner_id {
            return Err(AuctionError::Forbidden);
        }
        self.open(new).await
    }

    /// Open a listing in `active` status at version 0.
    pub async fn open(&self, new: NewListing) -> AuctionResult<Listing> {
        let now = self.clock.now();
        if new.starting_bid.is_zero() {
            return Err(AuctionError::InvalidInput(
                "starting bid must be greater than zero".into(),
            ));
        }
        if new.auction_end_time <= now {
            return Err(AuctionError::InvalidInput(
                "auction end time must be in the future".into(),
            ));
        }

        let listing = Listing::open(new, now);
        self.listings.insert(&listing).await?;
        tracing::info!(
            listing = %listing.id,
            post = %listing.post_id,
            starting_bid = %listing.starting_bid,
            ends_at = %listing.auction_end_time,
            "listing opened"
        );
        Ok(listing)
    }

    pub async fn get(&self, id: &ListingId) -> AuctionResult<Listing> {
        self.listings
            .get(id)
            .await?
            .ok_or(AuctionError::NotFound("listing"))
    }

    pub async fn list(&self, status: Option<ListingStatus>) -> AuctionResult<Vec<Listing>> {
        Ok(self.listings.list(status).await?)
    }

    /// Transition `active -> sold`.
    ///
    /// Preconditions are checked in order: the listing exists, the requester
    /// owns it, the end time has passed, and it is still active. A repeated
    /// call on a sold listing returns `AlreadyTerminal` and writes nothing.
    pub async fn complete(&self, id: &ListingId, requester: &UserId) -> AuctionResult<Listing> {
        let attempts = self.config.transition_max_attempts;
        for attempt in 1..=attempts {
            let listing = self.get(id).await?;
            let now = self.clock.now();

            if &listing.owner_id != requester {
                return Err(AuctionError::Forbidden);
            }
            if !listing.has_ended(now) {
                return Err(AuctionError::NotReady {
                    ends_at: listing.auction_end_time,
                });
            }
            if !listing.is_active() {
                return Err(AuctionError::AlreadyTerminal {
                    status: listing.status,
                });
            }

            let sold = listing.with_status(ListingStatus::Sold, now);
            match self.listings.compare_and_swap(listing.version, &sold).await? {
                CasOutcome::Committed => {
                    tracing::info!(
                        listing = %id,
                        final_bid = %sold.current_bid,
                        buyer = ?sold.highest_bidder,
                        "auction completed"
                    );
                    return Ok(sold);
                }
                CasOutcome::VersionMismatch => {
                    tracing::debug!(listing = %id, attempt, "completion lost a race; re-reading");
                    tokio::task::yield_now().await;
                }
            }
        }
        Err(AuctionError::Conflict { attempts })
    }

    /// Expire every active listing whose end time is at least
    /// `expiry_grace` in the past. Per-listing failures are logged and
    /// counted, never fatal to the pass. A grace too large to subtract from
    /// the current time fails the pass with `InvalidInput`.
    pub async fn sweep_expired(&self) -> AuctionResult<SweepReport> {
        let now = self.clock.now();
        let cutoff = chrono::Duration::from_std(self.config.expiry_grace())
            .ok()
            .and_then(|grace| now.checked_sub_signed(grace))
            .ok_or_else(|| {
                AuctionError::InvalidInput(format!(
                    "expiry grace of {}s is out of range",
                    self.config.expiry_grace_secs
                ))
            })?;

        let candidates = self.listings.active_ended_by(cutoff).await?;
        let mut report = SweepReport {
            examined: candidates.len(),
            ..Default::default()
        };

        for candidate in candidates {
            match self.expire_one(candidate, cutoff).await {
                Ok(Some(id)) => report.expired.push(id),
                Ok(None) => {}
                Err(err) => {
                    tracing::warn!(error = %err, "expiry sweep skipped a listing");
                    report.failed += 1;
                }
            }
        }

        if !report.expired.is_empty() {
            tracing::info!(expired = report.expired.len(), "expiry sweep finished");
        }
        Ok(report)
    }

    async fn expire_one(
        &self,
        mut listing: Listing,
        cutoff: chrono::DateTime<chrono::Utc>,
    ) -> AuctionResult<Option<ListingId>> {
        let attempts = self.config.transition_max_attempts;
        for attempt in 1..=attempts {
            if !listing.is_active() || listing.auction_end_time > cutoff {
                return Ok(None);
            }
            let expired = listing.with_status(ListingStatus::Expired, self.clock.now());
            match self.listings.compare_and_swap(listing.version, &expired).await? {
                CasOutcome::Committed => {
                    tracing::info!(listing = %listing.id, "listing expired");
                    return Ok(Some(listing.id));
                }
                CasOutcome::VersionMismatch => {
                    tracing::debug!(
                        listing = %listing.id,
                        attempt,
                        "expiry lost a race; re-reading"
                    );
                    listing = self.get(&listing.id).await?;
                }
            }
        }
        Err(AuctionError::Conflict { attempts })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, Utc};
    use rv_store::InMemoryStore;
    use rv_types::{Amount, ManualClock, PostId};

    fn t0() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn user(s: &str) -> UserId {
        UserId::new(s).unwrap()
    }

    struct Fixture {
        store: Arc<InMemoryStore>,
        clock: ManualClock,
        lifecycle: AuctionLifecycle,
    }

    fn fixture() -> Fixture {
        fixture_with(AuctionConfig::default())
    }

    fn fixture_with(config: AuctionConfig) -> Fixture {
        let store = Arc::new(InMemoryStore::new());
        store
            .register_post(PostId::new("p1").unwrap(), user("owner"))
            .unwrap();
        let clock = ManualClock::new(t0());
        let lifecycle = AuctionLifecycle::new(
            store.clone(),
            store.clone(),
            Arc::new(clock.clone()),
            config,
        );
        Fixture {
            store,
            clock,
            lifecycle,
        }
    }

    fn new_listing(owner: &str, end: DateTime<Utc>) -> NewListing {
        NewListing {
            post_id: PostId::new("p1").unwrap(),
            owner_id: user(owner),
            starting_bid: Amount::from(100),
            auction_end_time: end,
        }
    }

    #[tokio::test]
    async fn create_listing_opens_active_at_version_zero() {
        let f = fixture();
        let listing = f
            .lifecycle
            .create_listing(new_listing("owner", t0() + Duration::hours(1)))
            .await
            .unwrap();
        assert_eq!(listing.status, ListingStatus::Active);
        assert_eq!(listing.current_bid, Amount::from(100));
        assert_eq!(listing.version, 0);
        assert_eq!(f.lifecycle.get(&listing.id).await.unwrap(), listing);
    }

    #[tokio::test]
    async fn create_listing_checks_post_and_owner() {
        let f = fixture();
        let err = f
            .lifecycle
            .create_listing(new_listing("mallory", t0() + Duration::hours(1)))
            .await
            .unwrap_err();
        assert_eq!(err, AuctionError::Forbidden);

        let mut missing = new_listing("owner", t0() + Duration::hours(1));
        missing.post_id = PostId::new("ghost").unwrap();
        let err = f.lifecycle.create_listing(missing).await.unwrap_err();
        assert_eq!(err, AuctionError::NotFound("post"));
    }

    #[tokio::test]
    async fn open_rejects_zero_bid_and_past_end() {
        let f = fixture();
        let mut zero = new_listing("owner", t0() + Duration::hours(1));
        zero.starting_bid = Amount::ZERO;
        assert!(matches!(
            f.lifecycle.open(zero).await,
            Err(AuctionError::InvalidInput(_))
        ));

        let now_end = new_listing("owner", t0());
        assert!(matches!(
            f.lifecycle.open(now_end).await,
            Err(AuctionError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn complete_timing_scenario() {
        let f = fixture();
        let end = t0() + Duration::hours(1);
        let listing = f
            .lifecycle
            .create_listing(new_listing("owner", end))
            .await
            .unwrap();

        f.clock.set(end - Duration::seconds(1));
        let err = f.lifecycle.complete(&listing.id, &user("owner")).await.unwrap_err();
        assert_eq!(err, AuctionError::NotReady { ends_at: end });

        f.clock.set(end + Duration::seconds(1));
        let sold = f.lifecycle.complete(&listing.id, &user("owner")).await.unwrap();
        assert_eq!(sold.status, ListingStatus::Sold);
        assert_eq!(sold.version, 1);

        let err = f.lifecycle.complete(&listing.id, &user("owner")).await.unwrap_err();
        assert_eq!(
            err,
            AuctionError::AlreadyTerminal {
                status: ListingStatus::Sold
            }
        );
        let stored = f.lifecycle.get(&listing.id).await.unwrap();
        assert_eq!(stored.version, 1);
    }

    #[tokio::test]
    async fn complete_by_non_owner_is_forbidden_regardless_of_timing() {
        let f = fixture();
        let end = t0() + Duration::hours(1);
        let listing = f
            .lifecycle
            .create_listing(new_listing("owner", end))
            .await
            .unwrap();

        for at in [end - Duration::minutes(5), end + Duration::minutes(5)] {
            f.clock.set(at);
            let err = f.lifecycle.complete(&listing.id, &user("bidder")).await.unwrap_err();
            assert_eq!(err, AuctionError::Forbidden);
        }
    }

    #[tokio::test]
    async fn complete_unknown_listing_is_not_found() {
        let f = fixture();
        let err = f
            .lifecycle
            .complete(&ListingId::new(), &user("owner"))
            .await
            .unwrap_err();
        assert_eq!(err, AuctionError::NotFound("listing"));
    }

    #[tokio::test]
    async fn sweep_waits_for_grace_then_expires_once() {
        let f = fixture();
        let end = t0() + Duration::hours(1);
        let listing = f
            .lifecycle
            .create_listing(new_listing("owner", end))
            .await
            .unwrap();

        f.clock.set(end + Duration::hours(1));
        let report = f.lifecycle.sweep_expired().await.unwrap();
        assert!(report.expired.is_empty());

        f.clock.set(end + Duration::days(2));
        let report = f.lifecycle.sweep_expired().await.unwrap();
        assert_eq!(report.expired, vec![listing.id]);

        let again = f.lifecycle.sweep_expired().await.unwrap();
        assert_eq!(again.examined, 0);

        let err = f.lifecycle.complete(&listing.id, &user("owner")).await.unwrap_err();
        assert_eq!(
            err,
            AuctionError::AlreadyTerminal {
                status: ListingStatus::Expired
            }
        );
    }

    #[tokio::test]
    async fn sweep_leaves_sold_listings_alone() {
        let f = fixture();
        let end = t0() + Duration::hours(1);
        let listing = f
            .lifecycle
            .create_listing(new_listing("owner", end))
            .await
            .unwrap();
        f.clock.set(end);
        f.lifecycle.complete(&listing.id, &user("owner")).await.unwrap();

        f.clock.set(end + Duration::days(3));
        let report = f.lifecycle.sweep_expired().await.unwrap();
        assert_eq!(report.examined, 0);
        let stored = ListingStore::get(&*f.store, &listing.id).await.unwrap().unwrap();
        assert_eq!(stored.status, ListingStatus::Sold);
    }

    #[tokio::test]
    async fn sweep_with_unrepresentable_grace_fails_cleanly() {
        let f = fixture_with(AuctionConfig {
            expiry_grace_secs: 10_000_000_000_000,
            ..Default::default()
        });
        let end = t0() + Duration::hours(1);
        let listing = f
            .lifecycle
            .create_listing(new_listing("owner", end))
            .await
            .unwrap();

        f.clock.set(end + Duration::days(3));
        let err = f.lifecycle.sweep_expired().await.unwrap_err();
        assert!(matches!(err, AuctionError::InvalidInput(_)));
        let stored = ListingStore::get(&*f.store, &listing.id).await.unwrap().unwrap();
        assert_eq!(stored.status, ListingStatus::Active);
    }
}
