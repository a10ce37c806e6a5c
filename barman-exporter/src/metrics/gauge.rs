//! Gauge storage shared between the collector and the HTTP endpoint.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;

/// Label name attached to every barman gauge.
pub const SERVER_LABEL: &str = "server";

/// A family of gauges distinguished by the `server` label.
///
/// A sample only exists once it has been set; it then keeps its last value
/// until set again. Writes and reads lock a single map shard at a time.
#[derive(Debug)]
pub struct GaugeVec {
    name: &'static str,
    help: &'static str,
    // f64 bits per server
    values: DashMap<String, AtomicU64>,
}

impl GaugeVec {
    pub fn new(name: &'static str, help: &'static str) -> Self {
        Self {
            name,
            help,
            values: DashMap::new(),
        }
    }

    /// Name without the exporter namespace.
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn help(&self) -> &'static str {
        self.help
    }

    /// Set the gauge for `server`.
    pub fn set(&self, server: &str, value: f64) {
        if let Some(gauge) = self.values.get(server) {
            gauge.store(value.to_bits(), Ordering::Relaxed);
            return;
        }
        self.values
            .entry(server.to_string())
            .or_insert_with(|| AtomicU64::new(0))
            .store(value.to_bits(), Ordering::Relaxed);
    }

    /// Current value for `server`, if it was ever set.
    pub fn get(&self, server: &str) -> Option<f64> {
        self.values
            .get(server)
            .map(|v| f64::from_bits(v.load(Ordering::Relaxed)))
    }

    /// All samples, sorted by server name.
    pub fn samples(&self) -> Vec<(String, f64)> {
        let mut samples: Vec<(String, f64)> = self
            .values
            .iter()
            .map(|entry| {
                (
                    entry.key().clone(),
                    f64::from_bits(entry.value().load(Ordering::Relaxed)),
                )
            })
            .collect();
        samples.sort_by(|a, b| a.0.cmp(&b.0));
        samples
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// The gauges exported for every barman server.
#[derive(Debug)]
pub struct BarmanMetrics {
    pub status: GaugeVec,
    pub last_wal_age: GaugeVec,
    pub last_backup_age: GaugeVec,
    pub last_backup_size: GaugeVec,
    pub backup_duration: GaugeVec,
    pub backup_window: GaugeVec,
}

impl BarmanMetrics {
    pub fn new() -> Self {
        Self {
            status: GaugeVec::new("status", "1 if server passes all diagnostics"),
            last_wal_age: GaugeVec::new("last_wal_age_seconds", "Time since last received wal"),
            last_backup_age: GaugeVec::new(
                "last_backup_age_seconds",
                "Time since last full backup",
            ),
            last_backup_size: GaugeVec::new("last_backup_size_bytes", "Size of last backup"),
            backup_duration: GaugeVec::new("backup_duration_seconds", "Duration of last backup"),
            backup_window: GaugeVec::new("backup_window_seconds", "Time range for PITR"),
        }
    }

    /// Gauge families in exposition order.
    pub fn families(&self) -> [&GaugeVec; 6] {
        [
            &self.status,
            &self.last_wal_age,
            &self.last_backup_age,
            &self.last_backup_size,
            &self.backup_duration,
            &self.backup_window,
        ]
    }
}

impl Default for BarmanMetrics {
    fn default() -> Self {
        Self::new()
    }
}
