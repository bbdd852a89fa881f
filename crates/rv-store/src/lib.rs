//! Ledger store boundary for the Reavise mutation engine.
//!
//! The store is an external collaborator (a document or relational
//! database). The engine only relies on the primitives declared here:
//!
//! - [`ListingStore`] -- per-record read and a version-gated conditional write
//! - [`CounterStore`] -- atomic increment of a counter field, floored at zero
//! - [`RelationStore`] -- create/delete/count of like, follow, and comment rows
//! - [`EntityDirectory`] -- post and user lookup by identity
//! - [`BidLog`] -- append-only audit trail of accepted bids
//! - [`ReconcileQueue`] -- counters awaiting reconciliation after a partial failure
//!
//! # Design Rules
//!
//! 1. No primitive is a read-modify-write in application code. Conditional
//!    writes and increments are single store operations.
//! 2. Every primitive is independent; there are no multi-record transactions.
//! 3. Coordination lives in the store so that several engine instances can
//!    serve the same data.
//! 4. All backend errors are propagated, never silently ignored.
//!
//! [`InMemoryStore`] implements every trait for tests and embedding.

pub mod error;
pub mod memory;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use memory::InMemoryStore;
pub use traits::{
    BidLog, CasOutcome, CounterStore, EntityDirectory, IncrementOutcome, ListingStore,
    ReconcileQueue, RelationStore,
};
