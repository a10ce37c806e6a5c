//! Prometheus scrape endpoint.

use axum::{
    Router,
    extract::State,
    http::{StatusCode, header},
    response::IntoResponse,
    routing::get,
};

use crate::api::server::AppState;
use crate::metrics::CONTENT_TYPE;

/// Create the metrics router mounted at `path`.
pub fn router(path: &str) -> Router<AppState> {
    Router::new().route(path, get(scrape))
}

/// Always answers 200; servers whose commands fail simply have no (or
/// stale) samples.
async fn scrape(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, CONTENT_TYPE)],
        state.exporter.export(),
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
    use crate::metrics::{BarmanMetrics, PrometheusExporter};

    fn app(metrics: Arc<BarmanMetrics>, path: &str) -> axum::Router {
        let state = AppState::new(Arc::new(PrometheusExporter::new(metrics)));
        create_router(path, state)
    }

    async fn get(app: axum::Router, uri: &str) -> (axum::http::StatusCode, String, String) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let content_type = response
            .headers()
            .get(axum::http::header::CONTENT_TYPE)
            .map(|v| v.to_str().unwrap().to_string())
            .unwrap_or_default();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, content_type, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_scrape_empty_is_ok() {
        let (status, content_type, body) =
            get(app(Arc::new(BarmanMetrics::new()), "/metrics"), "/metrics").await;

        assert_eq!(status, axum::http::StatusCode::OK);
        assert!(content_type.starts_with("text/plain; version=0.0.4"));
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn test_scrape_custom_path() {
        let metrics = Arc::new(BarmanMetrics::new());
        metrics.status.set("main", 1.0);

        let (status, _, body) = get(app(metrics.clone(), "/probe"), "/probe").await;
        assert_eq!(status, axum::http::StatusCode::OK);
        assert!(body.contains("barman_status{server=\"main\"} 1"));

        let (status, _, _) = get(app(metrics, "/probe"), "/metrics").await;
        assert_eq!(status, axum::http::StatusCode::NOT_FOUND);
    }
}
