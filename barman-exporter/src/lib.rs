//! barman-exporter library crate.
//!
//! Polls the barman command line, derives per-server backup health and
//! freshness gauges, and serves them for Prometheus.

pub mod api;
pub mod barman;
pub mod clock;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod scheduler;
pub mod window;

pub use error::{Error, Result};
