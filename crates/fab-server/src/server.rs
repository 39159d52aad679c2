use std::sync::Arc;

use fab_sdk::Fab;
use tokio::net::TcpListener;

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::router::build_router;
use crate::state::AppState;

/// fab HTTP server.
pub struct FabServer {
    config: ServerConfig,
    fab: Arc<Fab>,
}

impl FabServer {
    /// Open the stores named by `config` and make sure the schema exists.
    pub fn new(config: ServerConfig) -> ServerResult<Self> {
        let fab = Fab::open(&config.fab_config())?;
        fab.syncdb()?;
        Ok(Self::with_fab(config, Arc::new(fab)))
    }

    /// Serve an already opened [`Fab`].
    pub fn with_fab(config: ServerConfig, fab: Arc<Fab>) -> Self {
        Self { config, fab }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn fab(&self) -> &Arc<Fab> {
        &self.fab
    }

    /// Build the router (useful for testing).
    pub fn router(&self) -> axum::Router {
        build_router(AppState::new(Arc::clone(&self.fab)))
    }

    /// Start serving requests until ctrl-c.
    pub async fn serve(self) -> ServerResult<()> {
        let app = self.router();
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        tracing::info!(
            addr = %self.config.bind_addr,
            bucket = %self.config.bucket,
            "fab server listening"
        );
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))?;
        tracing::info!("fab server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "cannot listen for ctrl-c; running until killed");
        std::future::pending::<()>().await;
    }
}
