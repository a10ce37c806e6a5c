//! Evaluation of `barman check` reports.

use std::collections::BTreeMap;

use crate::barman::models::{CheckReport, HintStatus};

/// Status literal barman prints for a passing check.
pub const CHECK_STATUS_OK: &str = "OK";

/// Whether every check in `report` passed.
///
/// The report is read back as a generic map of `{hint, status}` entries, so
/// checks added by newer barman releases are judged without code changes.
/// A report that does not fit that shape counts as failing. An empty report
/// passes.
pub fn all_ok(report: &CheckReport) -> bool {
    let Ok(value) = serde_json::to_value(report) else {
        return false;
    };

    match serde_json::from_value::<BTreeMap<String, HintStatus>>(value) {
        Ok(checks) => checks.values().all(|c| c.status == CHECK_STATUS_OK),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn report(json: &str) -> CheckReport {
        serde_json::from_str(json).unwrap()
    }

    #[rstest]
    #[case::empty(r#"{}"#, true)]
    #[case::single_ok(r#"{"ssh": {"hint": "", "status": "OK"}}"#, true)]
    #[case::all_ok(
        r#"{"ssh": {"hint": "", "status": "OK"}, "wal_level": {"hint": "", "status": "OK"}}"#,
        true
    )]
    #[case::one_failed(
        r#"{"ssh": {"hint": "", "status": "OK"}, "archive_mode": {"hint": "off", "status": "FAILED"}}"#,
        false
    )]
    #[case::lowercase_ok(r#"{"ssh": {"hint": "", "status": "ok"}}"#, false)]
    #[case::padded_ok(r#"{"ssh": {"hint": "", "status": "OK "}}"#, false)]
    #[case::hint_optional(r#"{"postgresql": {"status": "OK"}}"#, true)]
    #[case::unknown_check_name(r#"{"brand_new_check": {"hint": "x", "status": "OK"}}"#, true)]
    fn test_all_ok(#[case] json: &str, #[case] expected: bool) {
        assert_eq!(all_ok(&report(json)), expected);
    }

    #[rstest]
    #[case::missing_status(r#"{"ssh": {"hint": "reachable"}}"#)]
    #[case::status_not_string(r#"{"ssh": {"hint": "", "status": 1}}"#)]
    #[case::entry_not_object(r#"{"ssh": "OK"}"#)]
    #[case::null_entry(r#"{"ssh": null}"#)]
    fn test_malformed_report_fails_closed(#[case] json: &str) {
        assert!(!all_ok(&report(json)));
    }
}
