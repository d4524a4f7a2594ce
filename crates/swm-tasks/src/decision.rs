//! The common shape every task handler returns: a status transition plus
//! the reason string to attach, or a stall (spec.md §4.4, §7).

use swm_clients::TaskStatus;
use swm_tracker::ReasonKind;
use swm_utils::error::CrankError;

/// What a handler decided to do with one task on one crank pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDecision {
    /// `None` leaves the task status untouched.
    pub status: Option<TaskStatus>,
    /// The reason string to record, or `None` to clear/leave unset.
    pub reason: Option<String>,
}

impl TaskDecision {
    #[must_use]
    pub fn unchanged() -> Self {
        Self {
            status: None,
            reason: None,
        }
    }

    #[must_use]
    pub fn to(status: TaskStatus, kind: ReasonKind, detail: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            reason: Some(swm_tracker::reason::reason(kind, detail.into())),
        }
    }

    #[must_use]
    pub fn to_status_only(status: TaskStatus) -> Self {
        Self {
            status: Some(status),
            reason: None,
        }
    }

    #[must_use]
    pub fn hold(detail: impl Into<String>) -> Self {
        Self {
            status: None,
            reason: Some(swm_tracker::reason::reason(ReasonKind::Holding, detail.into())),
        }
    }

    #[must_use]
    pub fn stall(detail: impl Into<String>) -> Self {
        Self {
            status: None,
            reason: Some(swm_tracker::reason::reason(ReasonKind::Stalled, detail.into())),
        }
    }
}

impl From<CrankError> for TaskDecision {
    fn from(err: CrankError) -> Self {
        TaskDecision::stall(err.detail())
    }
}

pub type TaskResult = Result<TaskDecision, CrankError>;
