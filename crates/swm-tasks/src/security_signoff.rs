//! `security-signoff` (spec.md §4.4): a manually-driven task SWM only
//! observes -- security team members move it themselves, but a stable
//! series's `promote-to-security` needs to know when it has gone `Invalid`
//! (the kernel was never destined for Security) versus `Fix Released`
//! (signed off).

use swm_clients::TaskStatus;

/// Whether `promote-to-security` should treat this kernel as ineligible for
/// Security (ground: `package.py::SecurityGateContext::security_signoff_invalid`,
/// factored out since the signoff task's own status is all that's needed).
#[must_use]
pub fn signoff_makes_security_ineligible(signoff_status: TaskStatus) -> bool {
    signoff_status == TaskStatus::Invalid
}

#[must_use]
pub fn signoff_complete(signoff_status: TaskStatus) -> bool {
    signoff_status == TaskStatus::FixReleased
}
