//! Derived counters for the Reavise mutation engine.
//!
//! - [`CounterLedger`] applies atomic deltas to aggregate fields
//!   (`likes_count`, `comments_count`, `followers_count`, `following_count`)
//!   through the store's increment primitive, clamping at zero.
//! - [`RelationSaga`] pairs each relationship row write with its counter
//!   deltas: row first, counters only after the row is confirmed. A failed
//!   delta is a [`PartialFailure`], queued for reconciliation rather than
//!   rolled back.
//! - [`ConsistencyAuditor`] recounts relationship rows and converges the
//!   stored aggregates on them.

pub mod auditor;
pub mod error;
pub mod ledger;
pub mod saga;

pub use auditor::{AuditReport, AuditorTask, ConsistencyAuditor, ReconcileOutcome};
pub use error::{CounterError, CounterResult};
pub use ledger::{CounterLedger, CounterOutcome};
pub use saga::{PartialFailure, RelationSaga, SagaOutcome};
