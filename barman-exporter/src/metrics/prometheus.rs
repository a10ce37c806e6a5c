//! Prometheus metrics exporter.
//!
//! Exports the barman gauges in Prometheus text format.

use std::fmt::Write;
use std::sync::Arc;

use super::gauge::{BarmanMetrics, GaugeVec, SERVER_LABEL};

/// Content type of the text exposition format.
pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Prometheus metrics exporter.
pub struct PrometheusExporter {
    metrics: Arc<BarmanMetrics>,
    namespace: String,
}

impl PrometheusExporter {
    /// Create a new Prometheus exporter.
    pub fn new(metrics: Arc<BarmanMetrics>) -> Self {
        Self {
            metrics,
            namespace: "barman".to_string(),
        }
    }

    /// Create a new Prometheus exporter with custom namespace.
    pub fn with_namespace(metrics: Arc<BarmanMetrics>, namespace: impl Into<String>) -> Self {
        Self {
            metrics,
            namespace: namespace.into(),
        }
    }

    /// Export metrics in Prometheus text format.
    ///
    /// Families without any sample are left out entirely.
    pub fn export(&self) -> String {
        let mut output = String::new();
        for gauge in self.metrics.families() {
            self.write_gauge_family(&mut output, gauge);
        }
        output
    }

    fn write_gauge_family(&self, output: &mut String, gauge: &GaugeVec) {
        let samples = gauge.samples();
        if samples.is_empty() {
            return;
        }

        let full_name = format!("{}_{}", self.namespace, gauge.name());
        let _ = writeln!(output, "# HELP {} {}", full_name, escape_help(gauge.help()));
        let _ = writeln!(output, "# TYPE {} gauge", full_name);

        for (server, value) in samples {
            let _ = writeln!(
                output,
                "{}{{{}=\"{}\"}} {}",
                full_name,
                SERVER_LABEL,
                escape_label_value(&server),
                format_value(value)
            );
        }
    }
}

fn escape_help(help: &str) -> String {
    help.replace('\\', "\\\\").replace('\n', "\\n")
}

fn escape_label_value(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

fn format_value(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value == f64::INFINITY {
        "+Inf".to_string()
    } else if value == f64::NEG_INFINITY {
        "-Inf".to_string()
    } else {
        value.to_string()
    }
}
