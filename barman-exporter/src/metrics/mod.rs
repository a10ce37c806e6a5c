//! Metrics collection and exposition.
//!
//! Provides the gauge sink shared by the collection loop and the HTTP
//! endpoint, the per-server collection pipeline, and the Prometheus text
//! exporter.
//!
//! # Example
//!
//! ```ignore
//! use barman_exporter::metrics::{BarmanMetrics, PrometheusExporter};
//!
//! let metrics = Arc::new(BarmanMetrics::new());
//! metrics.status.set("main", 1.0);
//!
//! let text = PrometheusExporter::new(metrics).export();
//! ```

mod collector;
mod gauge;
mod prometheus;

pub use collector::{CycleSummary, MetricsCollector};
pub use gauge::{BarmanMetrics, GaugeVec, SERVER_LABEL};
pub use prometheus::{CONTENT_TYPE, PrometheusExporter};
