use std::sync::Arc;

use rv_auction::{AuctionLifecycle, BidArbiter};
use rv_counters::{ConsistencyAuditor, CounterLedger, RelationSaga};
use rv_store::InMemoryStore;
use rv_types::Clock;

use crate::auth::{AuthProvider, TrustedHeaderAuth};
use crate::config::ServerConfig;

/// Handles shared by every request. Holds no mutable state of its own.
#[derive(Clone)]
pub struct AppState {
    pub lifecycle: Arc<AuctionLifecycle>,
    pub arbiter: Arc<BidArbiter>,
    pub ledger: Arc<CounterLedger>,
    pub saga: Arc<RelationSaga>,
    pub auditor: Arc<ConsistencyAuditor>,
    pub auth: Arc<dyn AuthProvider>,
}

impl AppState {
    /// Wire every component to one in-memory store.
    pub fn in_memory(
        store: Arc<InMemoryStore>,
        clock: Arc<dyn Clock>,
        config: &ServerConfig,
    ) -> Self {
        let auction = config.auction_config();
        let lifecycle = Arc::new(AuctionLifecycle::new(
            store.clone(),
            store.clone(),
            clock.clone(),
            auction.clone(),
        ));
        let arbiter = Arc::new(BidArbiter::new(store.clone(), store.clone(), clock, auction));
        let ledger = Arc::new(CounterLedger::new(store.clone()));
        let saga = Arc::new(RelationSaga::new(
            store.clone(),
            store.clone(),
            store.clone(),
            ledger.clone(),
        ));
        let auditor = Arc::new(ConsistencyAuditor::new(
            store.clone(),
            store.clone(),
            store,
            ledger.clone(),
        ));
        Self {
            lifecycle,
            arbiter,
            ledger,
            saga,
            auditor,
            auth: Arc::new(TrustedHeaderAuth),
        }
    }

    pub fn with_auth(mut self, auth: Arc<dyn AuthProvider>) -> Self {
        self.auth = auth;
        self
    }
}
