//! `verification-testing`, `regression-testing`, `certification-testing`
//! (spec.md §4.4, ground: `original_source/stable/wfl/wft/
//! verification_testing.py`/`regression_testing.py`).

use swm_clients::TaskStatus;
use swm_tracker::ReasonKind;

use crate::decision::{TaskDecision, TaskResult};

#[derive(Debug, Clone)]
pub struct TestingContext {
    pub ready_for_testing: bool,
}

/// `New -> Confirmed` once the package set is ready for testing. Shared by
/// all three testing tasks.
#[must_use]
pub fn testing_new(ctx: &TestingContext) -> TaskResult {
    if !ctx.ready_for_testing {
        return Ok(TaskDecision::unchanged());
    }
    Ok(TaskDecision::to(
        TaskStatus::Confirmed,
        ReasonKind::Pending,
        "Ready",
    ))
}

/// `verification-testing`'s `Confirmed` handling: a derivative simply
/// copies its master's `verification-testing` status once the master has
/// left `New` (ground: the Python's "no master task -> no change, logged
/// not raised" rule -- a missing master task is not an error here, the
/// engine just leaves this task alone and logs the gap elsewhere).
#[must_use]
pub fn verification_testing_confirmed(master_status: Option<TaskStatus>) -> TaskDecision {
    match master_status {
        Some(TaskStatus::New) | None => TaskDecision::unchanged(),
        Some(status) => TaskDecision::to_status_only(status),
    }
}

#[derive(Debug, Clone)]
pub struct LabTestingContext {
    /// The SWM property `proposed-testing-requested` has been set (i.e. the
    /// test request message was sent).
    pub requested: bool,
    pub result_failed: bool,
    pub result_passed: bool,
}

/// `regression-testing`/`certification-testing`'s `Confirmed`-onward
/// handling: `In Progress` once requested, `Incomplete` on a `*-failed` tag,
/// `Fix Released` on a `*-passed` tag.
#[must_use]
pub fn lab_testing_common(ctx: &LabTestingContext, current_status: TaskStatus) -> TaskDecision {
    if ctx.result_passed {
        return TaskDecision::to_status_only(TaskStatus::FixReleased);
    }
    if ctx.result_failed {
        return TaskDecision::to(TaskStatus::Incomplete, ReasonKind::Stalled, "testing FAILED");
    }
    if ctx.requested {
        return TaskDecision::to(
            TaskStatus::InProgress,
            ReasonKind::Ongoing,
            "testing in progress",
        );
    }
    TaskDecision::to_status_only(current_status)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_ready_leaves_testing_task_in_new() {
        let decision = testing_new(&TestingContext {
            ready_for_testing: false,
        })
        .unwrap();
        assert_eq!(decision, TaskDecision::unchanged());
    }

    #[test]
    fn ready_confirms_testing_task() {
        let decision = testing_new(&TestingContext {
            ready_for_testing: true,
        })
        .unwrap();
        assert_eq!(decision.status, Some(TaskStatus::Confirmed));
    }

    #[test]
    fn derivative_copies_master_status_once_master_leaves_new() {
        let decision = verification_testing_confirmed(Some(TaskStatus::FixReleased));
        assert_eq!(decision.status, Some(TaskStatus::FixReleased));
    }

    #[test]
    fn derivative_does_not_change_while_master_still_new() {
        let decision = verification_testing_confirmed(Some(TaskStatus::New));
        assert_eq!(decision, TaskDecision::unchanged());
    }

    #[test]
    fn missing_master_task_is_a_no_op_not_an_error() {
        let decision = verification_testing_confirmed(None);
        assert_eq!(decision, TaskDecision::unchanged());
    }

    #[test]
    fn failed_tag_marks_incomplete_with_stalled_reason() {
        let decision = lab_testing_common(
            &LabTestingContext {
                requested: true,
                result_failed: true,
                result_passed: false,
            },
            TaskStatus::InProgress,
        );
        assert_eq!(decision.status, Some(TaskStatus::Incomplete));
        assert_eq!(decision.reason.as_deref(), Some("Stalled -- testing FAILED"));
    }

    #[test]
    fn passed_tag_releases_regardless_of_current_status() {
        let decision = lab_testing_common(
            &LabTestingContext {
                requested: true,
                result_failed: false,
                result_passed: true,
            },
            TaskStatus::Incomplete,
        );
        assert_eq!(decision.status, Some(TaskStatus::FixReleased));
    }

    #[test]
    fn requested_but_no_result_yet_is_ongoing() {
        let decision = lab_testing_common(
            &LabTestingContext {
                requested: true,
                result_failed: false,
                result_passed: false,
            },
            TaskStatus::Confirmed,
        );
        assert_eq!(decision.status, Some(TaskStatus::InProgress));
        assert_eq!(
            decision.reason.as_deref(),
            Some("Ongoing -- testing in progress")
        );
    }
}
