//! Task reason strings: `{Pending|Ongoing|Holding|Stalled} -- <detail>`
//! (spec.md §4.2).

use swm_clients::TaskStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReasonKind {
    Pending,
    Ongoing,
    Holding,
    Stalled,
}

impl ReasonKind {
    #[must_use]
    fn as_str(self) -> &'static str {
        match self {
            ReasonKind::Pending => "Pending",
            ReasonKind::Ongoing => "Ongoing",
            ReasonKind::Holding => "Holding",
            ReasonKind::Stalled => "Stalled",
        }
    }
}

/// Build a reason string of the form `"<Kind> -- <detail>"`.
#[must_use]
pub fn reason(kind: ReasonKind, detail: impl AsRef<str>) -> String {
    format!("{} -- {}", kind.as_str(), detail.as_ref())
}

/// If a handler left an active task without a reason, fill in the default
/// for its current status (spec.md §4.2).
#[must_use]
pub fn default_reason_for(status: TaskStatus) -> Option<String> {
    match status {
        TaskStatus::Confirmed => Some(reason(ReasonKind::Pending, "Ready")),
        TaskStatus::InProgress | TaskStatus::FixCommitted => {
            Some(reason(ReasonKind::Ongoing, format!("status {status}")))
        }
        TaskStatus::Incomplete => Some(reason(ReasonKind::Stalled, "FAILED")),
        _ => None,
    }
}
