//! JSON shapes emitted by `barman -f json`.
//!
//! Every subcommand answers with an object keyed by server name. Only the
//! fields the exporter consumes are modelled; anything else barman prints is
//! ignored, and fields that may be missing are `Option`s so a sparse answer
//! skips a gauge instead of failing the whole decode.

use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize};

/// Backup status literal for a completed backup.
pub const BACKUP_STATUS_DONE: &str = "DONE";

/// Output of `barman check <server>`.
pub type BarmanCheck = HashMap<String, CheckReport>;

/// Output of `barman list-server`.
pub type BarmanListServer = HashMap<String, ListInfo>;

/// Output of `barman status <server>`.
pub type BarmanStatus = HashMap<String, StatusInfo>;

/// Output of `barman list-backup <server>`, most recent backup first.
pub type BarmanListBackup = HashMap<String, Vec<BackupInfo>>;

/// Output of `barman show-backup <server> <backup-id>`.
pub type BarmanShowBackup = HashMap<String, BackupDetail>;

/// One named diagnostic as printed by `barman check`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HintStatus {
    #[serde(default)]
    pub hint: String,
    pub status: String,
}

/// The diagnostics of one server.
///
/// Kept as an open JSON object: barman adds checks between releases and
/// the report has to be judged without knowing their names up front.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CheckReport(pub serde_json::Map<String, serde_json::Value>);

impl CheckReport {
    /// Number of named checks in the report.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ListInfo {
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DescriptionMessage {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct StatusInfo {
    /// e.g. `"000000010000000000000007, at Thu Feb  3 12:00:00 2022"`.
    #[serde(default)]
    pub last_archived_wal: Option<DescriptionMessage>,
    #[serde(default)]
    pub first_backup: Option<DescriptionMessage>,
    #[serde(default)]
    pub last_backup: Option<DescriptionMessage>,
}

/// One entry of `barman list-backup`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct BackupInfo {
    pub backup_id: String,
    #[serde(default)]
    pub end_time: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub end_time_timestamp: Option<String>,
    #[serde(default)]
    pub retention_status: Option<String>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub size_bytes: Option<i64>,
    #[serde(default)]
    pub wal_size_bytes: Option<i64>,
}

impl BackupInfo {
    pub fn is_done(&self) -> bool {
        self.status == BACKUP_STATUS_DONE
    }
}

/// `barman show-backup` answer for one backup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct BackupDetail {
    #[serde(default)]
    pub backup_id: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub base_backup_information: BaseBackupInformation,
    #[serde(default)]
    pub catalog_information: CatalogInformation,
}

impl BackupDetail {
    pub fn begin_time_timestamp(&self) -> Option<&str> {
        self.base_backup_information.begin_time_timestamp.as_deref()
    }

    pub fn end_time_timestamp(&self) -> Option<&str> {
        self.base_backup_information.end_time_timestamp.as_deref()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct BaseBackupInformation {
    #[serde(default)]
    pub begin_time: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub begin_time_timestamp: Option<String>,
    #[serde(default)]
    pub begin_wal: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub end_time_timestamp: Option<String>,
    #[serde(default)]
    pub end_wal: Option<String>,
    #[serde(default)]
    pub disk_usage_bytes: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CatalogInformation {
    #[serde(default)]
    pub previous_backup: Option<String>,
    #[serde(default)]
    pub next_backup: Option<String>,
    #[serde(default)]
    pub retention_policy: Option<String>,
}

/// Accept a string or a bare JSON number for fields barman prints as
/// text in some releases and as numbers in others.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Text(s)) => Some(s),
        Some(Raw::Number(n)) => Some(n.to_string()),
        None => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_backup_ignores_unknown_fields() {
        let json = r#"{
            "main": [
                {"backup_id": "20220203T120000", "status": "DONE", "size_bytes": 1000,
                 "size": "1000 B", "tablespaces": null, "wal_size_bytes": 16}
            ]
        }"#;

        let parsed: BarmanListBackup = serde_json::from_str(json).unwrap();
        let backups = &parsed["main"];
        assert_eq!(backups.len(), 1);
        assert!(backups[0].is_done());
        assert_eq!(backups[0].size_bytes, Some(1000));
        assert_eq!(backups[0].end_time_timestamp, None);
    }

    #[test]
    fn test_show_backup_nested_timestamps() {
        let json = r#"{
            "main": {
                "backup_id": "20220203T120000",
                "status": "DONE",
                "base_backup_information": {
                    "begin_time_timestamp": "100",
                    "end_time_timestamp": 400,
                    "begin_wal": "000000010000000000000002"
                },
                "catalog_information": {"retention_policy": "VALID"}
            }
        }"#;

        let parsed: BarmanShowBackup = serde_json::from_str(json).unwrap();
        let detail = &parsed["main"];
        assert_eq!(detail.begin_time_timestamp(), Some("100"));
        assert_eq!(detail.end_time_timestamp(), Some("400"));
        assert_eq!(
            detail.catalog_information.retention_policy.as_deref(),
            Some("VALID")
        );
    }

    #[test]
    fn test_show_backup_missing_sections() {
        let parsed: BarmanShowBackup =
            serde_json::from_str(r#"{"main": {"backup_id": "x"}}"#).unwrap();
        assert_eq!(parsed["main"].begin_time_timestamp(), None);
    }

    #[test]
    fn test_status_keeps_last_archived_wal() {
        let json = r#"{
            "main": {
                "active": {"description": "Active", "message": "True"},
                "last_archived_wal": {
                    "description": "Last archived WAL",
                    "message": "000000010000000000000007, at Thu Feb  3 12:00:00 2022"
                }
            }
        }"#;

        let parsed: BarmanStatus = serde_json::from_str(json).unwrap();
        let wal = parsed["main"].last_archived_wal.as_ref().unwrap();
        assert!(wal.message.ends_with("2022"));
    }
}
