//! The `Promoter` shape shared by `promote-to-proposed`, `promote-to-
//! security`, `promote-to-updates`, and `promote-to-release` (spec.md §4.4):
//! a `New -> _ready_for_*` gate, and a `Confirmed -> _verify_promotion`
//! pull-back-and-observe loop.

use swm_clients::TaskStatus;
use swm_tracker::ReasonKind;

use crate::decision::{TaskDecision, TaskResult};

/// Shared inputs to every promoter's gate: whether the destination pocket
/// is already clear of this package set, whether the source package set is
/// ready to move, whether a manual block tag is present, and whether we're
/// inside the publishing window (promoters into Security/Updates/Release
/// only; `promote-to-proposed` has no window).
#[derive(Debug, Clone)]
pub struct PromoteContext {
    pub dest_already_clear: bool,
    pub ready: bool,
    pub blocked: bool,
    pub block_reason: Option<String>,
    pub within_publishing_window: bool,
    pub gated_by_window: bool,
}

/// `New -> _ready_for_*`: hold until the source pocket is ready, then move
/// to `Confirmed` once nothing blocks it.
#[must_use]
pub fn promote_new(ctx: &PromoteContext) -> TaskResult {
    if ctx.dest_already_clear {
        return Ok(TaskDecision::to_status_only(TaskStatus::FixReleased));
    }
    if !ctx.ready {
        return Ok(TaskDecision::unchanged());
    }
    if ctx.blocked {
        return Ok(TaskDecision::stall(
            ctx.block_reason
                .clone()
                .unwrap_or_else(|| "blocked".to_string()),
        ));
    }
    if ctx.gated_by_window && !ctx.within_publishing_window {
        return Ok(TaskDecision::hold("outside publishing window"));
    }
    Ok(TaskDecision::to(
        TaskStatus::Confirmed,
        ReasonKind::Pending,
        "Ready",
    ))
}

/// `Confirmed -> _verify_promotion`: re-check the window and blockers (a
/// promotion confirmed Friday afternoon must still wait if it hasn't
/// uploaded by the weekend freeze), then watch for the destination clearing.
#[must_use]
pub fn promote_verify(ctx: &PromoteContext, current_status: TaskStatus) -> TaskResult {
    if ctx.blocked {
        return Ok(TaskDecision::to(
            TaskStatus::Confirmed,
            ReasonKind::Stalled,
            ctx.block_reason
                .clone()
                .unwrap_or_else(|| "blocked".to_string()),
        ));
    }
    if ctx.gated_by_window && !ctx.within_publishing_window {
        return Ok(TaskDecision::to(
            TaskStatus::Confirmed,
            ReasonKind::Holding,
            "outside publishing window",
        ));
    }
    if ctx.dest_already_clear {
        return Ok(TaskDecision::to_status_only(TaskStatus::FixReleased));
    }
    Ok(TaskDecision::to(
        current_status,
        ReasonKind::Ongoing,
        format!("status {current_status}"),
    ))
}

/// `promote-to-security._ready_for_security`'s extra gates beyond the
/// generic promoter (spec.md §4.4): a proposed-only kernel can never reach
/// Security; derivatives wait on their master's readiness; security-signoff
/// must itself have cleared; testing must have completed.
#[derive(Debug, Clone)]
pub struct SecurityGateContext {
    pub proposed_only_kernel: bool,
    pub security_signoff_invalid: bool,
    pub is_derivative: bool,
    pub master_ready_for_security: bool,
    pub security_signoff_complete: bool,
    pub testing_completed: bool,
    pub proposed_blocked_tag: bool,
}

/// The outcome of checking `promote-to-security`'s extra gates before
/// falling through to the generic promoter logic: `Invalid` means both
/// `promote-to-security` and `security-signoff` should go `Invalid`;
/// `Hold` carries a reason to use instead of the generic gate; `Proceed`
/// means none of the extra gates apply and the generic promoter decides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecurityGateOutcome {
    Invalid,
    Hold(String),
    Proceed,
}

#[must_use]
pub fn security_gate(ctx: &SecurityGateContext) -> SecurityGateOutcome {
    if ctx.proposed_only_kernel {
        return SecurityGateOutcome::Invalid;
    }
    if ctx.security_signoff_invalid {
        return SecurityGateOutcome::Invalid;
    }
    if ctx.is_derivative && !ctx.master_ready_for_security {
        return SecurityGateOutcome::Hold("waiting for master bug".to_string());
    }
    if !ctx.security_signoff_complete {
        return SecurityGateOutcome::Hold("waiting for security signoff".to_string());
    }
    if !ctx.testing_completed {
        return SecurityGateOutcome::Hold("waiting for testing to complete".to_string());
    }
    if ctx.proposed_blocked_tag {
        return SecurityGateOutcome::Hold("kernel-block-proposed tag present".to_string());
    }
    SecurityGateOutcome::Proceed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_ctx() -> PromoteContext {
        PromoteContext {
            dest_already_clear: false,
            ready: false,
            blocked: false,
            block_reason: None,
            within_publishing_window: true,
            gated_by_window: false,
        }
    }

    #[test]
    fn not_ready_leaves_task_untouched() {
        let decision = promote_new(&base_ctx()).unwrap();
        assert_eq!(decision, TaskDecision::unchanged());
    }

    #[test]
    fn ready_and_unblocked_confirms() {
        let mut ctx = base_ctx();
        ctx.ready = true;
        let decision = promote_new(&ctx).unwrap();
        assert_eq!(decision.status, Some(TaskStatus::Confirmed));
    }

    #[test]
    fn window_gate_holds_outside_the_window() {
        let mut ctx = base_ctx();
        ctx.ready = true;
        ctx.gated_by_window = true;
        ctx.within_publishing_window = false;
        let decision = promote_new(&ctx).unwrap();
        assert_eq!(
            decision.reason.as_deref(),
            Some("Holding -- outside publishing window")
        );
        assert_eq!(decision.status, None);
    }

    #[test]
    fn dest_already_clear_short_circuits_to_fix_released() {
        let mut ctx = base_ctx();
        ctx.dest_already_clear = true;
        let decision = promote_new(&ctx).unwrap();
        assert_eq!(decision.status, Some(TaskStatus::FixReleased));
    }

    #[test]
    fn verify_releases_once_destination_clears() {
        let mut ctx = base_ctx();
        ctx.dest_already_clear = true;
        let decision = promote_verify(&ctx, TaskStatus::Confirmed).unwrap();
        assert_eq!(decision.status, Some(TaskStatus::FixReleased));
    }

    #[test]
    fn proposed_only_kernel_invalidates_security_gate() {
        let ctx = SecurityGateContext {
            proposed_only_kernel: true,
            security_signoff_invalid: false,
            is_derivative: false,
            master_ready_for_security: true,
            security_signoff_complete: true,
            testing_completed: true,
            proposed_blocked_tag: false,
        };
        assert_eq!(security_gate(&ctx), SecurityGateOutcome::Invalid);
    }

    #[test]
    fn derivative_waits_for_master_before_security() {
        let ctx = SecurityGateContext {
            proposed_only_kernel: false,
            security_signoff_invalid: false,
            is_derivative: true,
            master_ready_for_security: false,
            security_signoff_complete: true,
            testing_completed: true,
            proposed_blocked_tag: false,
        };
        assert_eq!(
            security_gate(&ctx),
            SecurityGateOutcome::Hold("waiting for master bug".to_string())
        );
    }

    #[test]
    fn all_gates_clear_proceeds_to_generic_promoter() {
        let ctx = SecurityGateContext {
            proposed_only_kernel: false,
            security_signoff_invalid: false,
            is_derivative: false,
            master_ready_for_security: true,
            security_signoff_complete: true,
            testing_completed: true,
            proposed_blocked_tag: false,
        };
        assert_eq!(security_gate(&ctx), SecurityGateOutcome::Proceed);
    }
}
