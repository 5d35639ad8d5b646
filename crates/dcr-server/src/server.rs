use std::sync::Arc;

use dcr_engine::EventEngine;
use dcr_ledger::InMemoryHistoryLedger;
use dcr_peer::HttpPeerClient;
use dcr_store::InMemoryEventStore;
use tokio::net::TcpListener;

use crate::auth::AdminTokenAuth;
use crate::config::NodeConfig;
use crate::error::{ServerError, ServerResult};
use crate::router::build_router;
use crate::state::AppState;

/// One event-node process.
pub struct DcrServer {
    config: NodeConfig,
    state: AppState,
}

impl DcrServer {
    /// Wire in-memory storage, the HTTP peer client and the admin token
    /// guard from `config`.
    pub fn new(config: NodeConfig) -> ServerResult<Self> {
        let peers = HttpPeerClient::new(config.peer_timeout())?;
        let engine = EventEngine::new(
            Arc::new(InMemoryEventStore::new()),
            Arc::new(InMemoryHistoryLedger::new()),
            Arc::new(peers),
        )
        .with_public_uri(config.public_uri.clone());
        let auth = AdminTokenAuth::new(config.admin_token.clone());

        Ok(Self {
            state: AppState::new(Arc::new(engine), Arc::new(auth)),
            config,
        })
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn engine(&self) -> &Arc<EventEngine> {
        &self.state.engine
    }

    /// Build the router (useful for testing).
    pub fn router(&self) -> axum::Router {
        build_router(self.state.clone())
    }

    /// Bind the configured address and serve until Ctrl-C.
    pub async fn serve(self) -> ServerResult<()> {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        self.serve_on(listener).await
    }

    /// Serve on an already bound listener.
    pub async fn serve_on(self, listener: TcpListener) -> ServerResult<()> {
        let addr = listener.local_addr()?;
        tracing::info!(
            %addr,
            public_uri = ?self.config.public_uri,
            registry = ?self.config.registry_url,
            "DCR event node listening"
        );
        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
