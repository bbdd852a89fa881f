//! Foundation types for the Reavise concurrent mutation engine.
//!
//! Every other `rv-*` crate depends on `rv-types`. Nothing here performs I/O.
//!
//! # Key Types
//!
//! - [`Listing`] -- an item under timed auction, guarded by a `version`
//! - [`ListingStatus`] -- `active`, `sold`, `expired` (the latter two terminal)
//! - [`Amount`] -- bid amounts in integer minor currency units
//! - [`CounterKey`] / [`CounterField`] -- derived aggregate fields on posts and users
//! - [`Relation`] -- like, follow, and comment rows that back those aggregates
//! - [`Clock`] -- time source used for all time-gating
//! - [`ErrorKind`] -- stable machine-readable error kinds shared by every layer

pub mod amount;
pub mod clock;
pub mod counter;
pub mod error;
pub mod ids;
pub mod listing;
pub mod relation;

pub use amount::Amount;
pub use clock::{Clock, ManualClock, SystemClock};
pub use counter::{CounterField, CounterKey};
pub use error::{ErrorKind, TypeError};
pub use ids::{CommentId, EntityId, ListingId, PostId, UserId};
pub use listing::{BidRecord, Listing, ListingStatus, NewListing};
pub use relation::{Relation, RelationKey};
