//! Logging setup.
//!
//! Log lines carry local-timezone timestamps. The filter comes from
//! `RUST_LOG` and falls back to [`DEFAULT_LOG_FILTER`].

use chrono::Local;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::Writer, time::FormatTime},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

use crate::config::LogFormat;
use crate::error::{Error, Result};

/// Default log filter directive.
pub const DEFAULT_LOG_FILTER: &str = "barman_exporter=info,tower_http=warn";

/// Custom timer that uses the local timezone via chrono.
#[derive(Debug, Clone, Copy)]
struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        let now = Local::now();
        write!(w, "{}", now.format("%Y-%m-%dT%H:%M:%S%.3f%:z"))
    }
}

/// Build the filter from `RUST_LOG`, or the default directive.
pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
}

/// Install the global subscriber.
pub fn init_logging(format: LogFormat) -> Result<()> {
    let layer = match format {
        LogFormat::Text => fmt::layer().with_timer(LocalTimer).with_target(true).boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .with_timer(LocalTimer)
            .with_current_span(false)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter())
        .with(layer)
        .try_init()
        .map_err(|e| Error::config(format!("Failed to initialize logging: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_parses() {
        assert!(EnvFilter::try_new(DEFAULT_LOG_FILTER).is_ok());
    }

    #[test]
    fn test_local_timer_format() {
        let mut out = String::new();
        LocalTimer.format_time(&mut Writer::new(&mut out)).unwrap();
        // 2024-01-01T00:00:00.000+00:00
        assert_eq!(out.len(), 29);
        assert_eq!(&out[10..11], "T");
    }
}
