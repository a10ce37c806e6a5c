//! Health check routes.

use axum::{Json, Router, extract::State, http::StatusCode, response::IntoResponse, routing::get};
use serde::Serialize;

use crate::api::server::AppState;
use crate::metrics::CycleSummary;

/// Create the health router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(health_check))
        .route("/live", get(liveness_check))
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    uptime_secs: u64,
    last_collection: Option<CycleSummary>,
}

/// Health check endpoint, with the outcome of the last collection cycle.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        uptime_secs: state.start_time.elapsed().as_secs(),
        last_collection: state.collector.as_ref().and_then(|c| c.last_cycle()),
    })
}

/// Liveness check - is the service alive?
async fn liveness_check(State(state): State<AppState>) -> impl IntoResponse {
    let uptime = state.start_time.elapsed().as_secs();
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "status": "alive",
            "uptime_secs": uptime
        })),
    )
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use tower::ServiceExt;

    use crate::api::routes::create_router;
    use crate::api::server::AppState;
    use crate::barman::{BarmanClient, ScriptedInvoker};
    use crate::clock::FixedClock;
    use crate::metrics::{BarmanMetrics, MetricsCollector, PrometheusExporter};

    async fn get_json(app: axum::Router, uri: &str) -> serde_json::Value {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), axum::http::StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_health_reports_last_cycle() {
        let metrics = Arc::new(BarmanMetrics::new());
        let invoker = Arc::new(ScriptedInvoker::new().respond("list-server", &[], "{}"));
        let collector = Arc::new(MetricsCollector::new(
            BarmanClient::new(invoker),
            metrics.clone(),
            Arc::new(FixedClock::at_epoch(1_643_889_600)),
        ));
        let state = AppState::new(Arc::new(PrometheusExporter::new(metrics)))
            .with_collector(collector.clone());

        let body = get_json(create_router("/metrics", state.clone()), "/health").await;
        assert_eq!(body["status"], "healthy");
        assert!(body["last_collection"].is_null());

        collector.collect().await.unwrap();
        let body = get_json(create_router("/metrics", state), "/health").await;
        assert_eq!(body["last_collection"]["servers"], 0);
        assert_eq!(
            body["last_collection"]["started_at"],
            "2022-02-03T12:00:00Z"
        );
    }

    #[tokio::test]
    async fn test_liveness() {
        let state = AppState::new(Arc::new(PrometheusExporter::new(Arc::new(
            BarmanMetrics::new(),
        ))));
        let body = get_json(create_router("/metrics", state), "/health/live").await;
        assert_eq!(body["status"], "alive");
    }
}
