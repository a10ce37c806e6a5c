//! API route modules.

pub mod health;
pub mod metrics;

use axum::Router;

use crate::api::server::AppState;

/// Create the router serving the exposition at `metrics_path` and the
/// health endpoints under `/health`.
pub fn create_router(metrics_path: &str, state: AppState) -> Router {
    Router::new()
        .merge(metrics::router(metrics_path))
        .nest("/health", health::router())
        .with_state(state)
}
