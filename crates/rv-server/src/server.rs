use std::future::Future;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::watch;

use rv_auction::ExpirySweeper;
use rv_counters::AuditorTask;
use rv_store::InMemoryStore;
use rv_types::{Clock, PostId, SystemClock, UserId};

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::router::build_router;
use crate::state::AppState;

/// Engine server over an in-memory store.
pub struct RvServer {
    config: ServerConfig,
    store: Arc<InMemoryStore>,
    state: AppState,
}

impl RvServer {
    pub fn new(config: ServerConfig) -> ServerResult<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: ServerConfig, clock: Arc<dyn Clock>) -> ServerResult<Self> {
        config.validate()?;
        let store = Arc::new(InMemoryStore::new());
        seed(&store, &config)?;
        let state = AppState::in_memory(store.clone(), clock, &config);
        Ok(Self {
            config,
            store,
            state,
        })
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// The backing store, for registering directory entries.
    pub fn store(&self) -> &Arc<InMemoryStore> {
        &self.store
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Build the router (useful for testing).
    pub fn router(&self) -> axum::Router {
        build_router(self.state.clone())
    }

    /// Bind the configured address and serve until Ctrl-C.
    pub async fn serve(self) -> ServerResult<()> {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        self.serve_with_shutdown(listener, shutdown_signal()).await
    }

    /// Serve on `listener` with the background sweep and auditor running,
    /// until `shutdown` resolves.
    pub async fn serve_with_shutdown<F>(
        self,
        listener: TcpListener,
        shutdown: F,
    ) -> ServerResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let (stop_tx, stop_rx) = watch::channel(false);
        let mut background = Vec::new();
        if self.config.sweep.enabled {
            let sweeper =
                ExpirySweeper::new(self.state.lifecycle.clone(), self.config.sweep.interval);
            background.push(sweeper.spawn(stop_rx.clone()));
        }
        if self.config.auditor.enabled {
            let task = AuditorTask::new(
                self.state.auditor.clone(),
                self.config.auditor.interval,
                self.config.auditor.full_audit_every,
            );
            background.push(task.spawn(stop_rx));
        }

        tracing::info!("rv server listening on {}", listener.local_addr()?);
        let result = axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await;

        // Receivers may already be gone if a task panicked.
        let _ = stop_tx.send(true);
        for handle in background {
            if let Err(err) = handle.await {
                tracing::warn!(error = %err, "background task ended abnormally");
            }
        }
        tracing::info!("rv server stopped");
        result.map_err(ServerError::from)
    }
}

fn seed(store: &InMemoryStore, config: &ServerConfig) -> ServerResult<()> {
    let internal = |e: rv_store::StoreError| ServerError::Internal(e.to_string());
    for user in &config.seed.users {
        let user = UserId::new(user.as_str()).map_err(|e| ServerError::Config(e.to_string()))?;
        store.register_user(user).map_err(internal)?;
    }
    for post in &config.seed.posts {
        let id = PostId::new(post.id.as_str()).map_err(|e| ServerError::Config(e.to_string()))?;
        let owner =
            UserId::new(post.owner.as_str()).map_err(|e| ServerError::Config(e.to_string()))?;
        store.register_post(id, owner).map_err(internal)?;
    }
    if !config.seed.users.is_empty() || !config.seed.posts.is_empty() {
        tracing::info!(
            users = config.seed.users.len(),
            posts = config.seed.posts.len(),
            "seeded entity directory"
        );
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for ctrl-c");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rv_store::{EntityDirectory, ListingStore};
    use crate::config::SeedPost;

    #[test]
    fn server_construction() {
        let server = RvServer::new(ServerConfig::default()).unwrap();
        assert_eq!(server.config().bind_addr, "127.0.0.1:8080".parse().unwrap());
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut config = ServerConfig::default();
        config.engine.bid_max_attempts = 0;
        assert!(matches!(RvServer::new(config), Err(ServerError::Config(_))));
    }

    #[tokio::test]
    async fn seed_registers_directory_entries() {
        let mut config = ServerConfig::default();
        config.seed.users = vec!["bob".into()];
        config.seed.posts = vec![SeedPost {
            id: "p1".into(),
            owner: "alice".into(),
        }];
        let server = RvServer::new(config).unwrap();

        let store = server.store();
        assert!(store.user_exists(&UserId::new("bob").unwrap()).await.unwrap());
        assert!(store.user_exists(&UserId::new("alice").unwrap()).await.unwrap());
        assert_eq!(
            store.post_owner(&PostId::new("p1").unwrap()).await.unwrap(),
            Some(UserId::new("alice").unwrap())
        );
        assert!(store.list(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn serves_until_shutdown() {
        let server = RvServer::new(ServerConfig::default()).unwrap();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let handle = tokio::spawn(server.serve_with_shutdown(listener, async {
            let _ = rx.await;
        }));
        tx.send(()).unwrap();
        handle.await.unwrap().unwrap();
    }
}
