//! HTTP server exposing the metrics endpoint.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::Router;
use axum::extract::Request;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::Span;

use crate::api::routes;
use crate::error::{Error, Result};
use crate::metrics::{MetricsCollector, PrometheusExporter};

/// Default listen address, Go style.
pub const DEFAULT_LISTEN: &str = ":8000";

/// Default path of the metrics endpoint.
pub const DEFAULT_METRICS_PATH: &str = "/metrics";

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiServerConfig {
    /// Socket address to bind.
    pub listen: SocketAddr,
    /// Path serving the Prometheus exposition.
    pub metrics_path: String,
}

impl Default for ApiServerConfig {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([0, 0, 0, 0], 8000)),
            metrics_path: DEFAULT_METRICS_PATH.to_string(),
        }
    }
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Server start time for uptime calculation
    pub start_time: Instant,
    /// Renders the gauges on every scrape
    pub exporter: Arc<PrometheusExporter>,
    /// Collector, for reporting the last completed cycle
    pub collector: Option<Arc<MetricsCollector>>,
}

impl AppState {
    pub fn new(exporter: Arc<PrometheusExporter>) -> Self {
        Self {
            start_time: Instant::now(),
            exporter,
            collector: None,
        }
    }

    /// Set the collector.
    pub fn with_collector(mut self, collector: Arc<MetricsCollector>) -> Self {
        self.collector = Some(collector);
        self
    }
}

/// API server.
pub struct ApiServer {
    config: ApiServerConfig,
    state: AppState,
    cancel_token: CancellationToken,
}

impl ApiServer {
    /// Create with custom state.
    pub fn with_state(config: ApiServerConfig, state: AppState) -> Self {
        Self {
            config,
            state,
            cancel_token: CancellationToken::new(),
        }
    }

    /// Use `token` for graceful shutdown instead of a private one.
    pub fn with_cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel_token = token;
        self
    }

    /// Build the router with all middleware and routes.
    pub fn build_router(&self) -> Router {
        let router = routes::create_router(&self.config.metrics_path, self.state.clone());

        let metrics_path = self.config.metrics_path.clone();
        router.layer(
            TraceLayer::new_for_http()
                .make_span_with(move |req: &Request| {
                    // scrapes are frequent; keep them out of the info log
                    let level = if req.uri().path() == metrics_path
                        || req.uri().path().starts_with("/health")
                    {
                        tracing::Level::DEBUG
                    } else {
                        tracing::Level::INFO
                    };
                    let mut make_span = tower_http::trace::DefaultMakeSpan::new().level(level);
                    use tower_http::trace::MakeSpan;
                    make_span.make_span(req)
                })
                .on_response(
                    |res: &axum::http::Response<_>, latency: Duration, span: &Span| {
                        if span.is_disabled() {
                            return;
                        }
                        let on_response = tower_http::trace::DefaultOnResponse::new()
                            .level(tracing::Level::DEBUG);
                        use tower_http::trace::OnResponse;
                        on_response.on_response(res, latency, span);
                    },
                ),
        )
    }

    /// Bind the listen address.
    pub async fn bind(&self) -> Result<TcpListener> {
        TcpListener::bind(self.config.listen)
            .await
            .map_err(|e| Error::server(format!("Cannot listen on {}: {}", self.config.listen, e)))
    }

    /// Serve on `listener` until the cancel token fires.
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        let router = self.build_router();
        let local = listener.local_addr()?;

        tracing::info!(
            "Serving metrics on http://{}{}",
            local,
            self.config.metrics_path
        );

        let cancel_token = self.cancel_token.clone();

        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                cancel_token.cancelled().await;
                tracing::info!("Stopping web server");
            })
            .await
            .map_err(|e| Error::server(format!("Server error: {}", e)))?;

        Ok(())
    }

    /// Shutdown the server.
    pub fn shutdown(&self) {
        self.cancel_token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::BarmanMetrics;

    #[test]
    fn test_config_defaults() {
        let config = ApiServerConfig::default();
        assert_eq!(config.listen.port(), 8000);
        assert!(config.listen.ip().is_unspecified());
        assert_eq!(config.metrics_path, "/metrics");
    }

    #[tokio::test]
    async fn test_serve_until_cancelled() {
        let metrics = Arc::new(BarmanMetrics::new());
        let state = AppState::new(Arc::new(PrometheusExporter::new(metrics)));
        let config = ApiServerConfig {
            listen: SocketAddr::from(([127, 0, 0, 1], 0)),
            ..Default::default()
        };
        let server = ApiServer::with_state(config, state);

        let listener = server.bind().await.unwrap();
        server.shutdown();
        server.serve(listener).await.unwrap();
    }
}
