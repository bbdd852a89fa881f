use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use rv_store::{CounterStore, ReconcileQueue, RelationStore};
use rv_types::CounterKey;

use crate::error::CounterResult;
use crate::ledger::CounterLedger;

/// What a reconciliation did to one counter.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ReconcileOutcome {
    Corrected { from: u64, to: u64 },
    NoChange { value: u64 },
}

impl ReconcileOutcome {
    pub fn value(&self) -> u64 {
        match self {
            Self::Corrected { to, .. } => *to,
            Self::NoChange { value } => *value,
        }
    }

    pub fn is_corrected(&self) -> bool {
        matches!(self, Self::Corrected { .. })
    }
}

/// Summary of a batch of reconciliations.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditReport {
    pub checked: usize,
    pub corrected: Vec<CounterKey>,
    /// Keys that errored and were put back on the queue.
    pub requeued: Vec<CounterKey>,
}

/// Converges stored aggregates on the live relationship row count.
pub struct ConsistencyAuditor {
    relations: Arc<dyn RelationStore>,
    counters: Arc<dyn CounterStore>,
    queue: Arc<dyn ReconcileQueue>,
    ledger: Arc<CounterLedger>,
}

impl ConsistencyAuditor {
    pub fn new(
        relations: Arc<dyn RelationStore>,
        counters: Arc<dyn CounterStore>,
        queue: Arc<dyn ReconcileQueue>,
        ledger: Arc<CounterLedger>,
    ) -> Self {
        Self {
            relations,
            counters,
            queue,
            ledger,
        }
    }

    /// Recount one counter and correct it with a delta.
    ///
    /// A relationship write that commits between the row count and the
    /// counter read leaves the count stale, so the rows are counted again
    /// after the correction and the key is re-queued when they no longer
    /// match the corrected value.
    pub async fn reconcile(&self, key: &CounterKey) -> CounterResult<ReconcileOutcome> {
        let actual = self.relations.count(key).await?;
        let stored = self.ledger.get(key).await?;
        if actual == stored {
            return Ok(ReconcileOutcome::NoChange { value: stored });
        }

        let mut remaining = i128::from(actual) - i128::from(stored);
        let mut value = stored;
        while remaining != 0 {
            let bound = i128::from(i64::MAX);
            // In range after the clamp.
            let step = remaining.clamp(-bound, bound) as i64;
            let outcome = self.ledger.apply_delta(key, step).await?;
            value = outcome.new_value;
            if outcome.applied_delta() == 0 {
                break;
            }
            remaining -= outcome.applied_delta();
        }
        tracing::info!(counter = %key, from = stored, to = value, "counter reconciled");

        let recount = self.relations.count(key).await?;
        if recount != value {
            tracing::warn!(
                counter = %key,
                rows = recount,
                value,
                "rows changed during reconcile; re-queued"
            );
            self.queue.enqueue(key).await?;
        }

        Ok(ReconcileOutcome::Corrected {
            from: stored,
            to: value,
        })
    }

    /// Reconcile every key queued by a partial failure or clamp.
    pub async fn run_pending(&self) -> CounterResult<AuditReport> {
        let keys = self.queue.drain().await?;
        Ok(self.reconcile_all(keys).await)
    }

    /// Reconcile every known counter: those stored and those implied by rows.
    pub async fn audit_all(&self) -> CounterResult<AuditReport> {
        let mut keys: BTreeSet<CounterKey> = self.counters.keys().await?.into_iter().collect();
        keys.extend(self.relations.counted_keys().await?);
        Ok(self.reconcile_all(keys).await)
    }

    async fn reconcile_all(&self, keys: impl IntoIterator<Item = CounterKey>) -> AuditReport {
        let mut report = AuditReport::default();
        for key in keys {
            report.checked += 1;
            match self.reconcile(&key).await {
                Ok(outcome) if outcome.is_corrected() => report.corrected.push(key),
                Ok(_) => {}
                Err(err) => {
                    tracing::warn!(counter = %key, error = %err, "reconcile failed; re-queued");
                    if let Err(err) = self.queue.enqueue(&key).await {
                        tracing::error!(counter = %key, error = %err, "failed to re-queue counter");
                    }
                    report.requeued.push(key);
                }
            }
        }
        report
    }
}

/// Periodic driver: pending keys every tick, a full audit every
/// `full_audit_every` ticks.
pub struct AuditorTask {
    auditor: Arc<ConsistencyAuditor>,
    interval: Duration,
    full_audit_every: u32,
}

impl AuditorTask {
    pub fn new(
        auditor: Arc<ConsistencyAuditor>,
        interval: Duration,
        full_audit_every: u32,
    ) -> Self {
        Self {
            auditor,
            interval,
            full_audit_every: full_audit_every.max(1),
        }
    }

    async fn tick(&self, n: u64) {
        let full = n % u64::from(self.full_audit_every) == 0;
        let result = if full {
            self.auditor.audit_all().await
        } else {
            self.auditor.run_pending().await
        };
        match result {
            Ok(report) if !report.corrected.is_empty() || !report.requeued.is_empty() => {
                tracing::info!(
                    full,
                    checked = report.checked,
                    corrected = report.corrected.len(),
                    requeued = report.requeued.len(),
                    "audit pass finished"
                );
            }
            Ok(_) => {}
            Err(err) => tracing::error!(full, error = %err, "audit pass failed"),
        }
    }

    /// Spawn the periodic loop. It stops when `shutdown` flips to `true` or
    /// its sender is dropped.
    pub fn spawn(self, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            tracing::info!(
                interval = ?self.interval,
                full_audit_every = self.full_audit_every,
                "consistency auditor started"
            );
            let mut n: u64 = 0;
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        n += 1;
                        self.tick(n).await;
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                }
            }
            tracing::info!("consistency auditor stopped");
        })
    }
}
