//! Backup age, duration and recovery-window arithmetic.
//!
//! All timestamps are whole seconds since the Unix epoch.

use chrono::format::{self, Parsed, StrftimeItems};
use chrono::{DateTime, NaiveDateTime, Utc};
use thiserror::Error;

use crate::barman::models::BackupInfo;

/// Separator between the WAL name and its archival date in
/// `barman status` output.
pub const WAL_DATE_SEPARATOR: &str = ", at ";

/// ctime-style layout of the archival date after the weekday, e.g.
/// `Feb  3 12:00:00 2022`. Barman prints it without a zone; it is read as UTC.
const WAL_DATE_FORMAT: &str = "%b %e %H:%M:%S %Y";

/// Leading weekday name. It must be a weekday but is not checked against
/// the date.
const WAL_WEEKDAY_FORMAT: &str = "%a";

/// A value inside a decoded barman answer that could not be interpreted.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("no archival date in last archived WAL message {0:?}")]
    MissingWalDate(String),

    #[error("invalid archival date {text:?}: {source}")]
    WalDate {
        text: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("missing {0}")]
    MissingField(&'static str),

    #[error("invalid {field} {text:?}: {source}")]
    Timestamp {
        field: &'static str,
        text: String,
        #[source]
        source: std::num::ParseIntError,
    },
}

/// Archival time of the last WAL from a `last_archived_wal` message.
///
/// The message must split into exactly two parts around
/// [`WAL_DATE_SEPARATOR`].
pub fn parse_wal_timestamp(message: &str) -> Result<i64, ParseError> {
    let parts: Vec<&str> = message.split(WAL_DATE_SEPARATOR).collect();
    let [_, date] = parts.as_slice() else {
        return Err(ParseError::MissingWalDate(message.to_string()));
    };

    let date = date.trim_start();
    let wal_date_error = |source: chrono::ParseError| ParseError::WalDate {
        text: date.to_string(),
        source,
    };

    let (weekday, rest) = date.split_once(' ').unwrap_or((date, ""));
    format::parse(
        &mut Parsed::new(),
        weekday,
        StrftimeItems::new(WAL_WEEKDAY_FORMAT),
    )
    .map_err(wal_date_error)?;

    NaiveDateTime::parse_from_str(rest, WAL_DATE_FORMAT)
        .map(|dt| dt.and_utc().timestamp())
        .map_err(wal_date_error)
}

/// Parse a decimal epoch-seconds field such as `begin_time_timestamp`.
pub fn parse_epoch(field: &'static str, text: Option<&str>) -> Result<i64, ParseError> {
    let text = text.ok_or(ParseError::MissingField(field))?;
    text.parse::<i64>().map_err(|source| ParseError::Timestamp {
        field,
        text: text.to_string(),
        source,
    })
}

/// The two ends of the retained catalog of completed backups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackupSelection<'a> {
    /// Most recent completed backup.
    pub last: &'a BackupInfo,
    /// Oldest retained completed backup. Same record as `last` when only one
    /// backup is done.
    pub first: &'a BackupInfo,
}

/// Pick the newest and oldest `DONE` backups from a most-recent-first list.
pub fn select_backups(backups: &[BackupInfo]) -> Option<BackupSelection<'_>> {
    let mut done = backups.iter().filter(|b| b.is_done());
    let last = done.next()?;
    let first = done.last().unwrap_or(last);
    Some(BackupSelection { last, first })
}

/// Seconds elapsed between `timestamp` and `now`.
pub fn age_seconds(now: DateTime<Utc>, timestamp: i64) -> f64 {
    now.timestamp().saturating_sub(timestamp) as f64
}

/// Seconds between two epoch timestamps.
pub fn span_seconds(start: i64, end: i64) -> f64 {
    end.saturating_sub(start) as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;

    fn backup(id: &str, status: &str) -> BackupInfo {
        BackupInfo {
            backup_id: id.to_string(),
            status: status.to_string(),
            ..Default::default()
        }
    }

    #[rstest]
    #[case::single_space("WAL archived, at Thu Feb 3 12:00:00 2022")]
    #[case::ctime_padding("000000010000000000000007, at Thu Feb  3 12:00:00 2022")]
    #[case::mismatched_weekday("x, at Mon Feb 3 12:00:00 2022")]
    fn test_parse_wal_timestamp(#[case] message: &str) {
        let expected = Utc.with_ymd_and_hms(2022, 2, 3, 12, 0, 0).unwrap();
        assert_eq!(parse_wal_timestamp(message).unwrap(), expected.timestamp());
    }

    #[rstest]
    #[case::no_separator("000000010000000000000007")]
    #[case::empty("")]
    #[case::two_separators("a, at b, at Thu Feb 3 12:00:00 2022")]
    fn test_parse_wal_timestamp_requires_single_separator(#[case] message: &str) {
        assert!(matches!(
            parse_wal_timestamp(message),
            Err(ParseError::MissingWalDate(_))
        ));
    }

    #[rstest]
    #[case::iso_date("x, at 2022-02-03 12:00:00")]
    #[case::not_a_weekday("x, at Xyz Feb 3 12:00:00 2022")]
    #[case::missing_weekday("x, at Feb 3 12:00:00 2022")]
    #[case::truncated("x, at Thu Feb 3")]
    fn test_parse_wal_timestamp_bad_date(#[case] message: &str) {
        assert!(matches!(
            parse_wal_timestamp(message),
            Err(ParseError::WalDate { .. })
        ));
    }

    #[test]
    fn test_parse_epoch() {
        assert_eq!(parse_epoch("begin_time_timestamp", Some("100")).unwrap(), 100);
        assert!(matches!(
            parse_epoch("begin_time_timestamp", None),
            Err(ParseError::MissingField("begin_time_timestamp"))
        ));
        assert!(matches!(
            parse_epoch("end_time_timestamp", Some("1643889600.5")),
            Err(ParseError::Timestamp { field: "end_time_timestamp", .. })
        ));
        assert!(parse_epoch("end_time_timestamp", Some("")).is_err());
    }

    #[test]
    fn test_select_backups_skips_unfinished() {
        let backups = vec![
            backup("b4", "STARTED"),
            backup("b3", "DONE"),
            backup("b2", "FAILED"),
            backup("b1", "DONE"),
            backup("b0", "WAITING_FOR_WALS"),
        ];

        let selection = select_backups(&backups).unwrap();
        assert_eq!(selection.last.backup_id, "b3");
        assert_eq!(selection.first.backup_id, "b1");
    }

    #[test]
    fn test_select_backups_single_done() {
        let backups = vec![backup("b2", "FAILED"), backup("b1", "DONE")];

        let selection = select_backups(&backups).unwrap();
        assert!(std::ptr::eq(selection.last, selection.first));
        assert_eq!(selection.last.backup_id, "b1");
    }

    #[test]
    fn test_select_backups_none_done() {
        assert!(select_backups(&[]).is_none());
        assert!(select_backups(&[backup("b1", "FAILED")]).is_none());
    }

    #[test]
    fn test_older_timestamps_are_older() {
        let now = Utc.with_ymd_and_hms(2022, 2, 3, 12, 15, 0).unwrap();
        let t2 = now.timestamp() - 60;
        let t1 = t2 - 3600;

        assert!(age_seconds(now, t1) > age_seconds(now, t2));
        assert_eq!(age_seconds(now, now.timestamp()), 0.0);
    }

    #[test]
    fn test_span_seconds() {
        assert_eq!(span_seconds(100, 400), 300.0);
        assert_eq!(span_seconds(400, 100), -300.0);
    }
}
