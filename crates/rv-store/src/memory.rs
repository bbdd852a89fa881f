use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use rv_types::{
    BidRecord, CounterKey, Listing, ListingId, ListingStatus, PostId, Relation, RelationKey,
    UserId,
};

use crate::error::{StoreError, StoreResult};
use crate::traits::{
    BidLog, CasOutcome, CounterStore, EntityDirectory, IncrementOutcome, ListingStore,
    ReconcileQueue, RelationStore,
};

/// In-memory ledger store for tests, local demos, and embedding.
///
/// Each primitive takes one lock for its own duration only, which gives the
/// same per-record atomicity a document store provides and nothing more.
#[derive(Default)]
pub struct InMemoryStore {
    listings: RwLock<HashMap<ListingId, Listing>>,
    counters: RwLock<HashMap<CounterKey, u64>>,
    relations: RwLock<HashMap<RelationKey, Relation>>,
    directory: RwLock<Directory>,
    bids: RwLock<HashMap<ListingId, Vec<BidRecord>>>,
    queue: RwLock<BTreeSet<CounterKey>>,
}

#[derive(Default)]
struct Directory {
    posts: HashMap<PostId, UserId>,
    users: HashSet<UserId>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a user with the directory.
    pub fn register_user(&self, user: UserId) -> StoreResult<()> {
        write(&self.directory)?.users.insert(user);
        Ok(())
    }

    /// Register a post and its owner with the directory. The owner is
    /// registered as a user too.
    pub fn register_post(&self, post: PostId, owner: UserId) -> StoreResult<()> {
        let mut dir = write(&self.directory)?;
        dir.users.insert(owner.clone());
        dir.posts.insert(post, owner);
        Ok(())
    }

    /// Overwrite a counter without going through the increment primitive.
    ///
    /// Only for simulating drift in tests and imports.
    pub fn force_counter(&self, key: &CounterKey, value: u64) -> StoreResult<()> {
        write(&self.counters)?.insert(key.clone(), value);
        Ok(())
    }

    /// Insert a relationship row without touching any counter.
    ///
    /// Only for simulating drift in tests and imports.
    pub fn force_relation(&self, relation: Relation) -> StoreResult<()> {
        write(&self.relations)?.insert(relation.key(), relation);
        Ok(())
    }
}

impl std::fmt::Debug for InMemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let listings = self.listings.read().map(|m| m.len()).unwrap_or(0);
        let relations = self.relations.read().map(|m| m.len()).unwrap_or(0);
        f.debug_struct("InMemoryStore")
            .field("listings", &listings)
            .field("relations", &relations)
            .finish()
    }
}

fn read<T>(lock: &RwLock<T>) -> StoreResult<RwLockReadGuard<'_, T>> {
    lock.read()
        .map_err(|e| StoreError::Unavailable(format!("lock poisoned: {e}")))
}

fn write<T>(lock: &RwLock<T>) -> StoreResult<RwLockWriteGuard<'_, T>> {
    lock.write()
        .map_err(|e| StoreError::Unavailable(format!("lock poisoned: {e}")))
}

#[async_trait]
impl ListingStore for InMemoryStore {
    async fn insert(&self, listing: &Listing) -> StoreResult<()> {
        let mut map = write(&self.listings)?;
        if map.contains_key(&listing.id) {
            return Err(StoreError::AlreadyExists(format!("listing {}", listing.id)));
        }
        map.insert(listing.id, listing.clone());
        Ok(())
    }

    async fn get(&self, id: &ListingId) -> StoreResult<Option<Listing>> {
        Ok(read(&self.listings)?.get(id).cloned())
    }

    async fn list(&self, status: Option<ListingStatus>) -> StoreResult<Vec<Listing>> {
        let map = read(&self.listings)?;
        let mut listings: Vec<Listing> = map
            .values()
            .filter(|l| status.map_or(true, |s| l.status == s))
            .cloned()
            .collect();
        listings.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(listings)
    }

    async fn compare_and_swap(
        &self,
        expected_version: u64,
        next: &Listing,
    ) -> StoreResult<CasOutcome> {
        if next.version != expected_version + 1 {
            return Err(StoreError::InvalidWrite(format!(
                "successor version {} does not follow {expected_version}",
                next.version
            )));
        }

        let mut map = write(&self.listings)?;
        let stored = map
            .get_mut(&next.id)
            .ok_or_else(|| StoreError::NotFound(format!("listing {}", next.id)))?;

        if stored.version != expected_version {
            return Ok(CasOutcome::VersionMismatch);
        }

        *stored = next.clone();
        Ok(CasOutcome::Committed)
    }
}

#[async_trait]
impl CounterStore for InMemoryStore {
    async fn increment(&self, key: &CounterKey, delta: i64) -> StoreResult<IncrementOutcome> {
        let mut map = write(&self.counters)?;
        let slot = map.entry(key.clone()).or_insert(0);
        let previous = *slot;
        let raw = previous as i128 + delta as i128;
        let clamped = raw < 0;
        let current = raw.clamp(0, u64::MAX as i128) as u64;
        *slot = current;
        Ok(IncrementOutcome {
            previous,
            current,
            clamped,
        })
    }

    async fn get(&self, key: &CounterKey) -> StoreResult<u64> {
        Ok(read(&self.counters)?.get(key).copied().unwrap_or(0))
    }

    async fn keys(&self) -> StoreResult<Vec<CounterKey>> {
        let mut keys: Vec<CounterKey> = read(&self.counters)?.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }
}

#[async_trait]
impl RelationStore for InMemoryStore {
    async fn create(&self, relation: &Relation) -> StoreResult<bool> {
        let mut map = write(&self.relations)?;
        let key = relation.key();
        if map.contains_key(&key) {
            return Ok(false);
        }
        map.insert(key, relation.clone());
        Ok(true)
    }

    async fn delete(&self, key: &RelationKey) -> StoreResult<Option<Relation>> {
        Ok(write(&self.relations)?.remove(key))
    }

    async fn get(&self, key: &RelationKey) -> StoreResult<Option<Relation>> {
        Ok(read(&self.relations)?.get(key).cloned())
    }

    async fn count(&self, key: &CounterKey) -> StoreResult<u64> {
        let map = read(&self.relations)?;
        Ok(map.values().filter(|r| r.counts_toward(key)).count() as u64)
    }

    async fn counted_keys(&self) -> StoreResult<Vec<CounterKey>> {
        let map = read(&self.relations)?;
        let keys: BTreeSet<CounterKey> = map
            .values()
            .flat_map(Relation::counter_effects)
            .collect();
        Ok(keys.into_iter().collect())
    }
}

#[async_trait]
impl EntityDirectory for InMemoryStore {
    async fn post_owner(&self, post: &PostId) -> StoreResult<Option<UserId>> {
        Ok(read(&self.directory)?.posts.get(post).cloned())
    }

    async fn user_exists(&self, user: &UserId) -> StoreResult<bool> {
        Ok(read(&self.directory)?.users.contains(user))
    }
}

#[async_trait]
impl BidLog for InMemoryStore {
    async fn append(&self, record: &BidRecord) -> StoreResult<()> {
        write(&self.bids)?
            .entry(record.listing_id)
            .or_default()
            .push(record.clone());
        Ok(())
    }

    async fn bids_for(&self, listing: &ListingId) -> StoreResult<Vec<BidRecord>> {
        let mut bids = read(&self.bids)?.get(listing).cloned().unwrap_or_default();
        bids.sort_by_key(|b| b.version);
        Ok(bids)
    }
}

#[async_trait]
impl ReconcileQueue for InMemoryStore {
    async fn enqueue(&self, key: &CounterKey) -> StoreResult<()> {
        write(&self.queue)?.insert(key.clone());
        Ok(())
    }

    async fn drain(&self) -> StoreResult<Vec<CounterKey>> {
        let mut queue = write(&self.queue)?;
        Ok(std::mem::take(&mut *queue).into_iter().collect())
    }

    async fn pending(&self) -> StoreResult<usize> {
        Ok(read(&self.queue)?.len())
    }
}
