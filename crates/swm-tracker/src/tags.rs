//! Tag parsing: series/cycle/derivation extraction and the block/test-result
//! tag vocabulary (spec.md §3, §4.2).

use once_cell::sync::Lazy;
use regex::Regex;

pub const LIVE_TAG: &str = "kernel-release-tracking-bug-live";
pub const BLOCK_TAG: &str = "kernel-block";
pub const BLOCK_SOURCE_TAG: &str = "kernel-block-source";
pub const BLOCK_PROPOSED_TAG: &str = "kernel-block-proposed";

static CYCLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^kernel-sru-cycle-(?P<cycle>.+)-(?P<spin>\d+)$").expect("valid"));

static MASTER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^kernel-sru-(?P<kind>derivative|backport)-of-(?P<id>\d+)$").expect("valid")
});

static UNBLOCK_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^kernel-unblock-").expect("valid"));
static TRELLO_BLOCKED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^kernel-trello-blocked-").expect("valid"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestResultKind {
    Qa,
    Regression,
    Certification,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestOutcome {
    Passed,
    Failed,
}

/// The `(cycle, spin)` pair parsed out of a `kernel-sru-cycle-<cycle>-<spin>`
/// tag. `cycle` retains any internal dashes (e.g. `2020.08.10`). Ordered by
/// `(cycle, spin)` lexicographically -- cycle dates are already zero-padded,
/// so this sorts the same as `package.py::cycle_key`'s zero-padded string
/// comparison without needing to reproduce the padding.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct CycleInfo {
    pub cycle: String,
    pub spin: u32,
}

impl CycleInfo {
    /// The tag's full cycle identifier, `<cycle>-<spin>`, used for cycle
    /// ordering comparisons.
    #[must_use]
    pub fn identifier(&self) -> String {
        format!("{}-{}", self.cycle, self.spin)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MasterKind {
    Derivative,
    Backport,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MasterPointer {
    pub kind: MasterKind,
    pub id: String,
}

/// Locate the first tag naming a known series codename.
pub fn find_target_series<'a>(
    tags: &'a [String],
    is_known_series: impl Fn(&str) -> bool,
) -> Option<&'a str> {
    tags.iter()
        .map(String::as_str)
        .find(|t| is_known_series(t))
}

pub fn find_cycle(tags: &[String]) -> Option<CycleInfo> {
    tags.iter().find_map(|t| {
        CYCLE_RE.captures(t).map(|c| CycleInfo {
            cycle: c["cycle"].to_string(),
            spin: c["spin"].parse().unwrap_or(1),
        })
    })
}

pub fn find_master_pointer(tags: &[String]) -> Option<MasterPointer> {
    tags.iter().find_map(|t| {
        MASTER_RE.captures(t).map(|c| MasterPointer {
            kind: if &c["kind"] == "derivative" {
                MasterKind::Derivative
            } else {
                MasterKind::Backport
            },
            id: c["id"].to_string(),
        })
    })
}

/// True if any manual-block tag is present (`kernel-block`,
/// `kernel-block-source`, or a `kernel-trello-blocked-*` tag). Does not
/// include `kernel-block-proposed`, which only gates promotion, not
/// `prepare-package`.
#[must_use]
pub fn is_manually_blocked(tags: &[String]) -> bool {
    tags.iter().any(|t| {
        t == BLOCK_TAG || t == BLOCK_SOURCE_TAG || TRELLO_BLOCKED_RE.is_match(t)
    })
}

#[must_use]
pub fn is_proposed_blocked(tags: &[String]) -> bool {
    tags.iter().any(|t| t == BLOCK_PROPOSED_TAG)
}

#[must_use]
pub fn is_unblocked(tags: &[String], suffix: &str) -> bool {
    tags.iter()
        .any(|t| UNBLOCK_RE.is_match(t) && t.ends_with(suffix))
}

/// Parse a test-result tag (`qa-testing-passed`, `regression-testing-failed`,
/// `certification-testing-passed`, ...) into its kind and outcome.
pub fn parse_test_result_tag(tag: &str) -> Option<(TestResultKind, TestOutcome)> {
    let (kind_str, outcome_str) = tag.rsplit_once('-')?;
    let outcome = match outcome_str {
        "passed" => TestOutcome::Passed,
        "failed" => TestOutcome::Failed,
        _ => return None,
    };
    let kind = match kind_str {
        "qa-testing" => TestResultKind::Qa,
        "regression-testing" => TestResultKind::Regression,
        "certification-testing" => TestResultKind::Certification,
        _ => return None,
    };
    Some((kind, outcome))
}

#[must_use]
pub fn test_result_tag(kind: TestResultKind, outcome: TestOutcome) -> &'static str {
    match (kind, outcome) {
        (TestResultKind::Qa, TestOutcome::Passed) => "qa-testing-passed",
        (TestResultKind::Qa, TestOutcome::Failed) => "qa-testing-failed",
        (TestResultKind::Regression, TestOutcome::Passed) => "regression-testing-passed",
        (TestResultKind::Regression, TestOutcome::Failed) => "regression-testing-failed",
        (TestResultKind::Certification, TestOutcome::Passed) => "certification-testing-passed",
        (TestResultKind::Certification, TestOutcome::Failed) => "certification-testing-failed",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_target_series_among_tags() {
        let tags = vec!["focal".to_string(), "kernel-release-tracking-bug-live".to_string()];
        let series = find_target_series(&tags, |t| t == "focal" || t == "jammy");
        assert_eq!(series, Some("focal"));
    }

    #[test]
    fn parses_cycle_and_spin() {
        let tags = vec!["kernel-sru-cycle-2020.08.10-1".to_string()];
        let info = find_cycle(&tags).unwrap();
        assert_eq!(info.cycle, "2020.08.10");
        assert_eq!(info.spin, 1);
        assert_eq!(info.identifier(), "2020.08.10-1");
    }

    #[test]
    fn parses_master_pointer() {
        let tags = vec!["kernel-sru-derivative-of-1000".to_string()];
        let p = find_master_pointer(&tags).unwrap();
        assert_eq!(p.kind, MasterKind::Derivative);
        assert_eq!(p.id, "1000");
    }

    #[test]
    fn detects_manual_block_tags() {
        assert!(is_manually_blocked(&["kernel-block".to_string()]));
        assert!(is_manually_blocked(&["kernel-block-source".to_string()]));
        assert!(is_manually_blocked(&[
            "kernel-trello-blocked-CARD123".to_string()
        ]));
        assert!(!is_manually_blocked(&["kernel-block-proposed".to_string()]));
    }

    #[test]
    fn parses_test_result_tags() {
        assert_eq!(
            parse_test_result_tag("regression-testing-passed"),
            Some((TestResultKind::Regression, TestOutcome::Passed))
        );
        assert_eq!(
            parse_test_result_tag("certification-testing-failed"),
            Some((TestResultKind::Certification, TestOutcome::Failed))
        );
        assert_eq!(parse_test_result_tag("focal"), None);
    }
}
