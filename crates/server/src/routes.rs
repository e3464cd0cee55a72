//! Route configuration.

use crate::handlers;
use crate::state::AppState;
use axum::Router;
use axum::routing::get;
use tower_http::trace::TraceLayer;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::archive_repo))
        // Health check (unauthenticated, for load balancers/k8s probes)
        .route("/v1/health", get(handlers::health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
