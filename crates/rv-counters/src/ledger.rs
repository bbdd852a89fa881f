use std::sync::Arc;

use serde::{Deserialize, Serialize};

use rv_store::CounterStore;
use rv_types::CounterKey;

use crate::error::{CounterError, CounterResult};

/// Result of applying a delta to one counter.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CounterOutcome {
    pub key: CounterKey,
    pub previous: u64,
    pub new_value: u64,
    /// The requested delta would have made the counter negative; it was
    /// floored at zero instead.
    pub clamped_to_zero: bool,
}

impl CounterOutcome {
    /// The delta that actually landed, which differs from the requested one
    /// only when clamped.
    pub fn applied_delta(&self) -> i128 {
        i128::from(self.new_value) - i128::from(self.previous)
    }
}

/// Applies atomic deltas to aggregate counters. Never reads-then-writes.
pub struct CounterLedger {
    counters: Arc<dyn CounterStore>,
}

impl CounterLedger {
    pub fn new(counters: Arc<dyn CounterStore>) -> Self {
        Self { counters }
    }

    pub async fn apply_delta(&self, key: &CounterKey, delta: i64) -> CounterResult<CounterOutcome> {
        let outcome = self.counters.increment(key, delta).await?;
        if outcome.clamped {
            tracing::warn!(
                counter = %key,
                previous = outcome.previous,
                delta,
                "counter would go negative; clamped at zero"
            );
        } else {
            tracing::debug!(counter = %key, delta, value = outcome.current, "counter adjusted");
        }
        Ok(CounterOutcome {
            key: key.clone(),
            previous: outcome.previous,
            new_value: outcome.current,
            clamped_to_zero: outcome.clamped,
        })
    }

    /// Undo a previous outcome by applying its negated applied delta.
    pub async fn reverse(&self, outcome: &CounterOutcome) -> CounterResult<CounterOutcome> {
        let delta = i64::try_from(-outcome.applied_delta()).map_err(|_| {
            CounterError::InvalidInput(format!("delta on {} is too large to reverse", outcome.key))
        })?;
        self.apply_delta(&outcome.key, delta).await
    }

    pub async fn get(&self, key: &CounterKey) -> CounterResult<u64> {
        Ok(self.counters.get(key).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rv_store::InMemoryStore;
    use rv_types::{CounterField, EntityId};

    fn key() -> CounterKey {
        CounterKey::new(EntityId::new("p1").unwrap(), CounterField::LikesCount)
    }

    fn ledger() -> CounterLedger {
        CounterLedger::new(Arc::new(InMemoryStore::new()))
    }

    #[tokio::test]
    async fn delta_adds_to_old_value() {
        let ledger = ledger();
        ledger.apply_delta(&key(), 1).await.unwrap();
        let outcome = ledger.apply_delta(&key(), 1).await.unwrap();
        assert_eq!(outcome.previous, 1);
        assert_eq!(outcome.new_value, 2);
        assert!(!outcome.clamped_to_zero);
    }

    #[tokio::test]
    async fn decrement_below_zero_clamps() {
        let ledger = ledger();
        let outcome = ledger.apply_delta(&key(), -1).await.unwrap();
        assert_eq!(outcome.new_value, 0);
        assert!(outcome.clamped_to_zero);
        assert_eq!(outcome.applied_delta(), 0);
    }

    #[tokio::test]
    async fn reverse_undoes_only_what_landed() {
        let ledger = ledger();
        ledger.apply_delta(&key(), 2).await.unwrap();
        let down = ledger.apply_delta(&key(), -5).await.unwrap();
        assert_eq!(down.applied_delta(), -2);

        let undone = ledger.reverse(&down).await.unwrap();
        assert_eq!(undone.new_value, 2);
    }

    #[tokio::test]
    async fn applied_delta_is_exact_near_u64_max() {
        let ledger = ledger();
        ledger.apply_delta(&key(), i64::MAX).await.unwrap();
        let second = ledger.apply_delta(&key(), i64::MAX).await.unwrap();
        assert_eq!(second.new_value, u64::MAX - 1);
        assert_eq!(second.applied_delta(), i128::from(i64::MAX));

        let wide = CounterOutcome {
            key: key(),
            previous: 0,
            new_value: u64::MAX,
            clamped_to_zero: false,
        };
        let err = ledger.reverse(&wide).await.unwrap_err();
        assert!(matches!(err, CounterError::InvalidInput(_)));
        assert_eq!(ledger.get(&key()).await.unwrap(), u64::MAX - 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn interleaved_deltas_never_observe_negative() {
        let ledger = Arc::new(ledger());
        let mut tasks = Vec::new();
        for i in 0..100 {
            let ledger = Arc::clone(&ledger);
            tasks.push(tokio::spawn(async move {
                let delta = if i % 3 == 0 { 1 } else { -1 };
                ledger.apply_delta(&key(), delta).await.unwrap()
            }));
        }
        for task in tasks {
            let outcome = task.await.unwrap();
            assert_eq!(
                i128::from(outcome.new_value),
                i128::from(outcome.previous) + outcome.applied_delta()
            );
        }
    }

    proptest! {
        #[test]
        fn value_tracks_floored_running_sum(deltas in prop::collection::vec(-3i64..=3, 0..60)) {
            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
            rt.block_on(async {
                let ledger = ledger();
                let mut model: i64 = 0;
                for delta in deltas {
                    let outcome = ledger.apply_delta(&key(), delta).await.unwrap();
                    model = (model + delta).max(0);
                    prop_assert_eq!(outcome.new_value as i64, model);
                    prop_assert_eq!(outcome.clamped_to_zero, outcome.previous as i64 + delta < 0);
                }
                Ok(())
            })?;
        }
    }
}
