use std::sync::Arc;

use tokio::net::TcpListener;
use ts_store::PostStore;

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::router::build_router;

/// Time Streams server over any post store.
pub struct TsServer<S> {
    config: ServerConfig,
    store: Arc<S>,
}

impl<S: PostStore + 'static> TsServer<S> {
    pub fn new(config: ServerConfig, store: S) -> Self {
        Self {
            config,
            store: Arc::new(store),
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Build the router (useful for testing).
    pub fn router(&self) -> axum::Router {
        build_router(self.store.clone(), &self.config)
    }

    /// Bind the configured address and serve until the process stops.
    pub async fn serve(self) -> ServerResult<()> {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        self.serve_on(listener).await
    }

    /// Serve on an already bound listener.
    pub async fn serve_on(self, listener: TcpListener) -> ServerResult<()> {
        let addr = listener.local_addr()?;
        tracing::info!("Time Streams server listening on {}", addr);
        axum::serve(listener, self.router())
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))
    }
}
