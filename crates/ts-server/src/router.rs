use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use tokio::sync::Semaphore;
use tower_http::trace::TraceLayer;
use ts_store::PostStore;

use crate::config::ServerConfig;
use crate::handler::{self, AppState};

/// Build the axum router serving `store`.
pub fn build_router<S>(store: Arc<S>, config: &ServerConfig) -> Router
where
    S: PostStore + 'static,
{
    let state = Arc::new(AppState {
        store,
        opaque_ids: config.opaque_ids,
        permits: Arc::new(Semaphore::new(config.max_concurrent_requests.max(1))),
    });
    Router::new()
        .route("/", get(handler::latest_handler::<S>))
        .route("/:id", get(handler::post_handler::<S>))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
