//! Message payload shapes published onto the `kernel` exchange (spec.md
//! §4.4, §6): testing requests (sent once a package first lands in
//! -proposed or a PPA) and upload/phase-change announcements.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// A request for the QA/regression/certification lab to test a kernel that
/// has just landed in -proposed or a PPA (spec.md §6, ground:
/// `package.py::send_testing_request`). Field names and the routing `key`
/// follow the wire schema exactly; `arches` is only populated for the
/// `lowlatency` flavour.
#[derive(Debug, Clone, Serialize)]
pub struct TestingRequestMessage {
    pub key: String,
    /// `"sru"` or `"boot"`.
    pub op: String,
    pub who: Vec<String>,
    /// `"proposed"` or `"ppa"`.
    pub pocket: String,
    /// Archive reference, present only when `pocket == "ppa"`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ppa: Option<String>,
    pub date: DateTime<Utc>,
    #[serde(rename = "series-name")]
    pub series_name: String,
    #[serde(rename = "kernel-version")]
    pub kernel_version: String,
    pub package: String,
    pub flavour: String,
    #[serde(rename = "meta-pkg", skip_serializing_if = "Option::is_none")]
    pub meta_pkg: Option<String>,
    #[serde(rename = "sru-cycle")]
    pub sru_cycle: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub arches: Vec<String>,
}

impl TestingRequestMessage {
    /// Build the routing key for a proposed-pocket testing request
    /// (spec.md §6: `"kernel.publish.proposed.<series>"`).
    #[must_use]
    pub fn key_for_proposed(series: &str) -> String {
        format!("kernel.publish.proposed.{series}")
    }

    /// Build the routing key for a PPA testing request (spec.md §6:
    /// `"kernel.published.ppa.<series>"`).
    #[must_use]
    pub fn key_for_ppa(series: &str) -> String {
        format!("kernel.published.ppa.{series}")
    }
}

/// An upload or phase-change announcement posted for humans subscribed to
/// the team's notification channel (ground: `bug.py::send_upload_announcement`).
/// Not part of spec.md §6's literal wire schema (which only fixes the
/// testing-request shape), so this follows the same field-naming
/// conventions as [`TestingRequestMessage`].
#[derive(Debug, Clone, Serialize)]
pub struct AnnouncementMessage {
    pub bug_id: String,
    pub series: String,
    pub source_package: String,
    pub version: String,
    /// `"uploaded"`, `"proposed"`, `"security"`, `"updates"`, `"released"`.
    pub event: String,
    pub cycle: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample(pocket: &str, ppa: Option<&str>) -> TestingRequestMessage {
        TestingRequestMessage {
            key: TestingRequestMessage::key_for_proposed("focal"),
            op: "sru".to_string(),
            who: vec!["kernel".to_string()],
            pocket: pocket.to_string(),
            ppa: ppa.map(str::to_string),
            date: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
            series_name: "focal".to_string(),
            kernel_version: "5.4.0-42.46".to_string(),
            package: "linux".to_string(),
            flavour: "generic".to_string(),
            meta_pkg: Some("linux-meta".to_string()),
            sru_cycle: "2020.08.10-1".to_string(),
            arches: vec![],
        }
    }

    #[test]
    fn testing_request_serializes_to_the_wire_schema() {
        let msg = sample("proposed", None);
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["key"], "kernel.publish.proposed.focal");
        assert_eq!(value["series-name"], "focal");
        assert_eq!(value["kernel-version"], "5.4.0-42.46");
        assert_eq!(value["sru-cycle"], "2020.08.10-1");
        assert!(value.get("ppa").is_none());
        assert!(value.get("arches").is_none());
    }

    #[test]
    fn ppa_pocket_carries_the_archive_reference() {
        let msg = sample("ppa", Some("~canonical-kernel/ubuntu/ppa"));
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["ppa"], "~canonical-kernel/ubuntu/ppa");
    }

    #[test]
    fn lowlatency_flavour_carries_arches() {
        let mut msg = sample("proposed", None);
        msg.flavour = "lowlatency".to_string();
        msg.arches = vec!["amd64".to_string(), "i386".to_string()];
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["arches"][0], "amd64");
    }

    #[test]
    fn announcement_serializes_with_optional_cycle() {
        let msg = AnnouncementMessage {
            bug_id: "1000".to_string(),
            series: "focal".to_string(),
            source_package: "linux".to_string(),
            version: "5.4.0-42.46".to_string(),
            event: "uploaded".to_string(),
            cycle: Some("2020.08.10-1".to_string()),
        };
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["event"], "uploaded");
        assert_eq!(value["cycle"], "2020.08.10-1");
    }
}
