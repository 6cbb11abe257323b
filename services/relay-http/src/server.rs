use std::future::Future;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::info;

use crate::api::{self, ApiState};
use crate::config::RelayConfig;

pub struct RelayServer {
    config: Arc<RelayConfig>,
    state: Arc<ApiState>,
}

impl RelayServer {
    /// Create a new relay server
    pub fn new(config: RelayConfig) -> Result<Self> {
        let state = Arc::new(ApiState::new(config).context("Failed to build API state")?);

        Ok(Self {
            config: Arc::clone(&state.config),
            state,
        })
    }

    pub fn state(&self) -> Arc<ApiState> {
        Arc::clone(&self.state)
    }

    /// Run until the task is cancelled
    pub async fn run(self) -> Result<()> {
        self.run_until(std::future::pending()).await
    }

    /// Run until `shutdown` resolves, then drain in-flight requests
    pub async fn run_until<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = self.config.listen_addr();
        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("Failed to bind to {}", addr))?;

        info!(
            addr = %addr,
            catalog = %self.config.catalog_api_url,
            local_api = %self.config.local_api_url,
            allow_listed = self.state.access_gate.entries().len(),
            "Relay server listening"
        );

        let router = api::create_router(self.state);
        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await
            .context("Server error")?;

        info!("Relay server stopped accepting connections");
        Ok(())
    }
}
