use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rv_types::{
    BidRecord, CounterKey, Listing, ListingId, ListingStatus, PostId, Relation, RelationKey,
    UserId,
};

use crate::error::StoreResult;

/// Result of a version-gated conditional write.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CasOutcome {
    /// The stored version matched and the successor was written.
    Committed,
    /// Another writer committed first; nothing was written.
    VersionMismatch,
}

impl CasOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, Self::Committed)
    }
}

/// Listing records with compare-and-swap on `version`.
#[async_trait]
pub trait ListingStore: Send + Sync {
    /// Insert a new listing. Fails with `AlreadyExists` on a duplicate id.
    async fn insert(&self, listing: &Listing) -> StoreResult<()>;

    /// Read a listing by id. Returns `Ok(None)` if it does not exist.
    async fn get(&self, id: &ListingId) -> StoreResult<Option<Listing>>;

    /// All listings, optionally filtered by status, newest first.
    async fn list(&self, status: Option<ListingStatus>) -> StoreResult<Vec<Listing>>;

    /// Replace the stored listing with `next` only if the stored version
    /// still equals `expected_version`.
    ///
    /// `next.version` must be `expected_version + 1` (`InvalidWrite`
    /// otherwise). A missing listing is `NotFound`.
    async fn compare_and_swap(
        &self,
        expected_version: u64,
        next: &Listing,
    ) -> StoreResult<CasOutcome>;

    /// Active listings whose end time is at or before `cutoff`.
    ///
    /// Default implementation filters [`Self::list`]. Backends should
    /// override with an indexed query.
    async fn active_ended_by(&self, cutoff: DateTime<Utc>) -> StoreResult<Vec<Listing>> {
        let active = self.list(Some(ListingStatus::Active)).await?;
        Ok(active
            .into_iter()
            .filter(|l| l.auction_end_time <= cutoff)
            .collect())
    }
}

/// Result of an atomic increment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IncrementOutcome {
    pub previous: u64,
    pub current: u64,
    /// `true` when `previous + delta` was negative and the value was floored at zero.
    pub clamped: bool,
}

impl IncrementOutcome {
    /// The delta that was actually applied. Widened so that any pair of
    /// `u64` values is representable.
    pub fn applied_delta(&self) -> i128 {
        i128::from(self.current) - i128::from(self.previous)
    }
}

/// Aggregate counter fields with an atomic increment primitive.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Atomically add `delta`, flooring the result at zero.
    ///
    /// Absent counters start at zero. Concurrent increments on the same key
    /// must never lose updates.
    async fn increment(&self, key: &CounterKey, delta: i64) -> StoreResult<IncrementOutcome>;

    /// Current value; zero if the counter was never written.
    async fn get(&self, key: &CounterKey) -> StoreResult<u64>;

    /// Every counter key the store currently holds.
    async fn keys(&self) -> StoreResult<Vec<CounterKey>>;
}

/// Relationship rows (likes, follows, comments).
#[async_trait]
pub trait RelationStore: Send + Sync {
    /// Create a row. Returns `false` without writing if the key already exists.
    async fn create(&self, relation: &Relation) -> StoreResult<bool>;

    /// Delete a row, returning it if it existed.
    async fn delete(&self, key: &RelationKey) -> StoreResult<Option<Relation>>;

    async fn get(&self, key: &RelationKey) -> StoreResult<Option<Relation>>;

    /// Number of live rows counted by `key`.
    async fn count(&self, key: &CounterKey) -> StoreResult<u64>;

    /// Every counter key that at least one live row contributes to.
    async fn counted_keys(&self) -> StoreResult<Vec<CounterKey>>;
}

/// Lookup of posts and users owned by external services.
#[async_trait]
pub trait EntityDirectory: Send + Sync {
    /// The owner of a post, or `None` if the post does not exist.
    async fn post_owner(&self, post: &PostId) -> StoreResult<Option<UserId>>;

    async fn user_exists(&self, user: &UserId) -> StoreResult<bool>;
}

/// Append-only audit trail of accepted bids.
#[async_trait]
pub trait BidLog: Send + Sync {
    async fn append(&self, record: &BidRecord) -> StoreResult<()>;

    /// Bids for one listing ordered by the listing version they produced.
    async fn bids_for(&self, listing: &ListingId) -> StoreResult<Vec<BidRecord>>;
}

/// Counters awaiting reconciliation.
#[async_trait]
pub trait ReconcileQueue: Send + Sync {
    async fn enqueue(&self, key: &CounterKey) -> StoreResult<()>;

    /// Remove and return all queued keys, deduplicated.
    async fn drain(&self) -> StoreResult<Vec<CounterKey>>;

    async fn pending(&self) -> StoreResult<usize>;
}
