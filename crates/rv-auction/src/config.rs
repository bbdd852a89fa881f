use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::AuctionError;

/// Upper bound on `expiry_grace_secs`: one leap year.
pub const MAX_EXPIRY_GRACE_SECS: u64 = 366 * 24 * 60 * 60;

/// Tuning for bid arbitration and lifecycle transitions.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuctionConfig {
    /// Total conditional-write attempts for one bid before `Conflict`.
    pub bid_max_attempts: u32,
    /// Total conditional-write attempts for one status transition.
    pub transition_max_attempts: u32,
    /// How long after `auction_end_time` an uncompleted listing stays
    /// `active` before the sweep expires it, in seconds. Gives the owner a
    /// window to complete the sale.
    pub expiry_grace_secs: u64,
}

impl Default for AuctionConfig {
    fn default() -> Self {
        Self {
            bid_max_attempts: 5,
            transition_max_attempts: 5,
            expiry_grace_secs: 24 * 60 * 60,
        }
    }
}

impl AuctionConfig {
    pub fn expiry_grace(&self) -> Duration {
        Duration::from_secs(self.expiry_grace_secs)
    }

    pub fn validate(&self) -> Result<(), AuctionError> {
        if self.bid_max_attempts == 0 {
            return Err(AuctionError::InvalidInput(
                "bid_max_attempts must be at least 1".into(),
            ));
        }
        if self.transition_max_attempts == 0 {
            return Err(AuctionError::InvalidInput(
                "transition_max_attempts must be at least 1".into(),
            ));
        }
        if self.expiry_grace_secs > MAX_EXPIRY_GRACE_SECS {
            return Err(AuctionError::InvalidInput(format!(
                "expiry_grace_secs must be at most {MAX_EXPIRY_GRACE_SECS}"
            )));
        }
        Ok(())
    }
}
