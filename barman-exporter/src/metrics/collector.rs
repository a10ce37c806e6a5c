//! Metrics collector implementation.
//!
//! Runs the barman subcommands for every server and derives the exported
//! gauges from their answers. Each server, and each step for a server, fails
//! on its own: an error is logged and only the gauges depending on it keep
//! their previous value.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use super::gauge::BarmanMetrics;
use crate::barman::BarmanClient;
use crate::barman::models::BackupDetail;
use crate::clock::Clock;
use crate::diagnostics::all_ok;
use crate::error::{Error, Result};
use crate::window::{age_seconds, parse_epoch, parse_wal_timestamp, select_backups, span_seconds};

/// Outcome of one collection cycle.
#[derive(Debug, Clone, Serialize)]
pub struct CycleSummary {
    /// Servers reported by `barman list-server`.
    pub servers: usize,
    pub started_at: DateTime<Utc>,
    #[serde(rename = "duration_ms", serialize_with = "serialize_millis")]
    pub duration: Duration,
}

fn serialize_millis<S: serde::Serializer>(d: &Duration, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

/// Collects barman metrics into a shared [`BarmanMetrics`] sink.
pub struct MetricsCollector {
    barman: BarmanClient,
    metrics: Arc<BarmanMetrics>,
    clock: Arc<dyn Clock>,
    last_cycle: RwLock<Option<CycleSummary>>,
}

impl MetricsCollector {
    pub fn new(barman: BarmanClient, metrics: Arc<BarmanMetrics>, clock: Arc<dyn Clock>) -> Self {
        Self {
            barman,
            metrics,
            clock,
            last_cycle: RwLock::new(None),
        }
    }

    pub fn metrics(&self) -> &Arc<BarmanMetrics> {
        &self.metrics
    }

    /// Summary of the most recent successful cycle.
    pub fn last_cycle(&self) -> Option<CycleSummary> {
        self.last_cycle.read().clone()
    }

    /// Run one collection cycle over every server barman knows about.
    ///
    /// Only a failing `barman list-server` is reported as an error; every
    /// per-server failure is logged and absorbed.
    pub async fn collect(&self) -> Result<CycleSummary> {
        let started = Instant::now();
        let started_at = self.clock.now();

        let servers = match self.barman.list_server().await {
            Ok(servers) => servers,
            Err(e) => {
                error!(error = %e, "Failed to list barman servers");
                return Err(Error::Pipeline(e));
            }
        };

        let mut names: Vec<String> = servers.into_keys().collect();
        names.sort();

        for server in &names {
            self.collect_server(server).await;
        }

        let summary = CycleSummary {
            servers: names.len(),
            started_at,
            duration: started.elapsed(),
        };
        info!(
            servers = summary.servers,
            duration_ms = summary.duration.as_millis() as u64,
            "Collected barman metrics"
        );
        *self.last_cycle.write() = Some(summary.clone());

        Ok(summary)
    }

    async fn collect_server(&self, server: &str) {
        debug!(server, "Collecting server metrics");

        self.update_status(server).await;

        let now = self.clock.now();
        let wal_timestamp = self.update_wal_age(server, now).await;
        self.update_backups(server, now, wal_timestamp).await;
    }

    async fn update_status(&self, server: &str) {
        let mut checks = match self.barman.check(server).await {
            Ok(checks) => checks,
            Err(e) => {
                warn!(server, error = %e, "Failed to run barman check");
                return;
            }
        };

        let Some(report) = checks.remove(server) else {
            warn!(server, "Server missing from barman check output");
            return;
        };

        let healthy = all_ok(&report);
        debug!(server, checks = report.len(), healthy, "Evaluated barman check");
        self.metrics
            .status
            .set(server, if healthy { 1.0 } else { 0.0 });
    }

    /// Update the WAL age gauge and return the archival timestamp it was
    /// computed from.
    async fn update_wal_age(&self, server: &str, now: DateTime<Utc>) -> Option<i64> {
        let mut status = match self.barman.status(server).await {
            Ok(status) => status,
            Err(e) => {
                warn!(server, error = %e, "Failed to run barman status");
                return None;
            }
        };

        let Some(wal) = status.remove(server).and_then(|info| info.last_archived_wal) else {
            warn!(server, "No last archived WAL in barman status output");
            return None;
        };

        match parse_wal_timestamp(&wal.message) {
            Ok(timestamp) => {
                self.metrics
                    .last_wal_age
                    .set(server, age_seconds(now, timestamp));
                Some(timestamp)
            }
            Err(e) => {
                warn!(server, error = %e, "Failed to parse last archived WAL time");
                None
            }
        }
    }

    async fn update_backups(&self, server: &str, now: DateTime<Utc>, wal_timestamp: Option<i64>) {
        let mut listing = match self.barman.list_backup(server).await {
            Ok(listing) => listing,
            Err(e) => {
                warn!(server, error = %e, "Failed to run barman list-backup");
                return;
            }
        };

        let backups = listing.remove(server).unwrap_or_default();
        let Some(selection) = select_backups(&backups) else {
            debug!(server, listed = backups.len(), "No completed backups");
            return;
        };

        match selection.last.size_bytes {
            Some(size) => self.metrics.last_backup_size.set(server, size as f64),
            None => warn!(server, backup_id = %selection.last.backup_id, "Backup has no size_bytes"),
        }

        let last = self.show_backup(server, &selection.last.backup_id).await;
        let last_begin = last
            .as_ref()
            .and_then(|detail| begin_timestamp(server, detail));
        if let Some(begin) = last_begin {
            self.metrics
                .last_backup_age
                .set(server, age_seconds(now, begin));
        }

        // Fetched even when it is the same backup as `last`.
        let first = self.show_backup(server, &selection.first.backup_id).await;
        let first_begin = first
            .as_ref()
            .and_then(|detail| begin_timestamp(server, detail));

        let (Some(last), Some(last_begin)) = (last, last_begin) else {
            return;
        };

        // Duration of the last backup on its own, not across the catalog.
        match parse_epoch("end_time_timestamp", last.end_time_timestamp()) {
            Ok(end) => self
                .metrics
                .backup_duration
                .set(server, span_seconds(last_begin, end)),
            Err(e) => warn!(server, backup_id = %last.backup_id, error = %e, "Failed to read backup end time"),
        }

        match (wal_timestamp, first_begin) {
            (Some(wal), Some(first_begin)) => self
                .metrics
                .backup_window
                .set(server, span_seconds(first_begin, wal)),
            (None, _) => debug!(server, "Skipping backup window without a WAL archival time"),
            (_, None) => debug!(server, "Skipping backup window without the first backup's begin time"),
        }
    }

    async fn show_backup(&self, server: &str, backup_id: &str) -> Option<BackupDetail> {
        match self.barman.show_backup(server, backup_id).await {
            Ok(mut details) => {
                let detail = details.remove(server);
                if detail.is_none() {
                    warn!(server, backup_id, "Server missing from barman show-backup output");
                }
                detail
            }
            Err(e) => {
                warn!(server, backup_id, error = %e, "Failed to run barman show-backup");
                None
            }
        }
    }
}

fn begin_timestamp(server: &str, detail: &BackupDetail) -> Option<i64> {
    match parse_epoch("begin_time_timestamp", detail.begin_time_timestamp()) {
        Ok(begin) => Some(begin),
        Err(e) => {
            warn!(server, backup_id = %detail.backup_id, error = %e, "Failed to read backup begin time");
            None
        }
    }
}
