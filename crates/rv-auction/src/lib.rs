//! Auction lifecycle and bid arbitration.
//!
//! - [`AuctionLifecycle`] opens listings and is the only component that moves
//!   a listing's status (`active -> sold` on completion, `active -> expired`
//!   via the expiry sweep).
//! - [`BidArbiter`] accepts bids with optimistic concurrency: every accepted
//!   bid is a version-gated conditional write, and a lost race is re-read and
//!   re-validated rather than overwritten.
//! - [`ExpirySweeper`] runs the sweep periodically.
//!
//! Neither component holds locks or in-process state across calls; all
//! ordering comes from the store's compare-and-swap.

pub mod arbiter;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod sweep;

pub use arbiter::{BidArbiter, BidReceipt};
pub use config::AuctionConfig;
pub use error::{AuctionError, AuctionResult};
pub use lifecycle::{AuctionLifecycle, SweepReport};
pub use sweep::ExpirySweeper;
