//! `prepare-package[-<type>]` (spec.md §4.4, ground:
//! `original_source/stable/wfl/wft/prepare_package.py`): the gate that takes
//! a tracker from `New` through to `Fix Released` once its package has been
//! uploaded, tagged, and built into the PPA (or, for source-only routes,
//! simply uploaded).

use swm_clients::TaskStatus;
use swm_tracker::ReasonKind;

use crate::decision::{TaskDecision, TaskResult};

/// Everything `prepare-package` needs to know about the tracker and its
/// package to decide a transition; gathered by the engine from the bug, the
/// catalog, and the package-set aggregator before calling this handler.
#[derive(Debug, Clone)]
pub struct PrepareContext {
    pub pkg_type: String,
    pub is_main: bool,
    /// Whether `main`'s own `prepare-package` task has already become
    /// `Invalid` (a secondary package stays silently held until `main`
    /// resolves, ground: the Python's "pkg == 'main' or not
    /// valid_package('main')" guard).
    pub main_is_invalid: bool,
    pub older_tracker_in_ppa: bool,
    pub need_master_in_proposed: bool,
    pub master_ready: bool,
    pub package_type_valid: bool,
    pub trello_blocked: bool,
    pub manually_blocked: bool,
    pub version_known: bool,
    pub tag_published: bool,
    pub has_ppa_route: bool,
    pub uploaded: bool,
    /// Whether a `versions` SWM-properties entry already exists for this
    /// package type (changes reason phrasing from `Pending` to `Stalled`).
    pub versions_recorded: bool,
    pub built_and_in_pocket_ppa: bool,
    /// A duplicate tracker's package already cleared this pocket.
    pub duplicate_replaces: bool,
}

/// `prepare-package._new`: the gate a tracker must clear to leave `New`.
#[must_use]
pub fn prepare_package_new(ctx: &PrepareContext) -> TaskResult {
    if ctx.older_tracker_in_ppa {
        return Ok(TaskDecision::hold("previous cycle tracker in PPA"));
    }
    if ctx.need_master_in_proposed && !ctx.master_ready {
        return Ok(TaskDecision::hold("waiting for master bug"));
    }
    if !ctx.package_type_valid {
        return Ok(TaskDecision::to_status_only(TaskStatus::Invalid));
    }
    if ctx.trello_blocked {
        return Ok(TaskDecision::stall("blocked on SRU board"));
    }
    if !ctx.is_main && ctx.main_is_invalid {
        // Held silently: main has to resolve first, and main's own reason
        // already explains the hold to anyone reading the tracker.
        return Ok(TaskDecision::unchanged());
    }
    if ctx.manually_blocked {
        return Ok(TaskDecision::stall(
            "manual kernel-block/kernel-block-source present",
        ));
    }
    Ok(TaskDecision::to(
        TaskStatus::Confirmed,
        ReasonKind::Pending,
        "Ready",
    ))
}

/// `prepare-package._common`: the state machine from `Confirmed` onward.
/// Re-checks the `New` gates first (a tracker can fall back to `New` if a
/// block appears mid-flight), then drives version/tag/upload/build
/// observation.
#[must_use]
pub fn prepare_package_common(ctx: &PrepareContext, current_status: TaskStatus) -> TaskResult {
    if ctx.older_tracker_in_ppa {
        return Ok(TaskDecision::to(
            TaskStatus::New,
            ReasonKind::Holding,
            "previous cycle tracker in PPA",
        ));
    }
    if ctx.need_master_in_proposed && !ctx.master_ready {
        return Ok(TaskDecision::to(
            TaskStatus::New,
            ReasonKind::Holding,
            "waiting for master bug",
        ));
    }
    if !ctx.package_type_valid {
        return Ok(TaskDecision::to_status_only(TaskStatus::Invalid));
    }
    if ctx.trello_blocked {
        return Ok(TaskDecision::to(
            TaskStatus::New,
            ReasonKind::Stalled,
            "blocked on SRU board",
        ));
    }

    if !ctx.version_known {
        return Ok(TaskDecision::to(
            current_status,
            ReasonKind::Pending,
            "version not specified",
        ));
    }

    let mut status = current_status;
    if matches!(status, TaskStatus::Confirmed | TaskStatus::Triaged) {
        status = TaskStatus::InProgress;
    }

    let tag_and_upload_satisfied = ctx.tag_published && (ctx.uploaded || !ctx.has_ppa_route);
    if !tag_and_upload_satisfied {
        let kind = if ctx.versions_recorded {
            ReasonKind::Stalled
        } else {
            ReasonKind::Pending
        };
        return Ok(TaskDecision::to(
            status,
            kind,
            "tag not published and/or package not uploaded",
        ));
    }
    status = TaskStatus::FixCommitted;

    if !ctx.has_ppa_route || ctx.built_and_in_pocket_ppa || ctx.duplicate_replaces {
        return Ok(TaskDecision::to_status_only(TaskStatus::FixReleased));
    }

    Ok(TaskDecision::to(
        status,
        ReasonKind::Ongoing,
        format!("status {status}"),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_ctx() -> PrepareContext {
        PrepareContext {
            pkg_type: "main".to_string(),
            is_main: true,
            main_is_invalid: false,
            older_tracker_in_ppa: false,
            need_master_in_proposed: false,
            master_ready: true,
            package_type_valid: true,
            trello_blocked: false,
            manually_blocked: false,
            version_known: false,
            tag_published: false,
            has_ppa_route: true,
            uploaded: false,
            versions_recorded: false,
            built_and_in_pocket_ppa: false,
            duplicate_replaces: false,
        }
    }

    #[test]
    fn older_tracker_in_ppa_holds_before_anything_else() {
        let mut ctx = base_ctx();
        ctx.older_tracker_in_ppa = true;
        let decision = prepare_package_new(&ctx).unwrap();
        assert_eq!(decision.status, None);
        assert_eq!(
            decision.reason.as_deref(),
            Some("Holding -- previous cycle tracker in PPA")
        );
    }

    #[test]
    fn invalid_package_type_goes_invalid() {
        let mut ctx = base_ctx();
        ctx.package_type_valid = false;
        let decision = prepare_package_new(&ctx).unwrap();
        assert_eq!(decision.status, Some(TaskStatus::Invalid));
    }

    #[test]
    fn secondary_package_holds_silently_while_main_invalid() {
        let mut ctx = base_ctx();
        ctx.is_main = false;
        ctx.main_is_invalid = true;
        let decision = prepare_package_new(&ctx).unwrap();
        assert_eq!(decision, TaskDecision::unchanged());
    }

    #[test]
    fn manual_block_stalls_with_specific_reason() {
        let mut ctx = base_ctx();
        ctx.manually_blocked = true;
        let decision = prepare_package_new(&ctx).unwrap();
        assert_eq!(
            decision.reason.as_deref(),
            Some("Stalled -- manual kernel-block/kernel-block-source present")
        );
    }

    #[test]
    fn clean_tracker_confirms_with_pending_ready() {
        let decision = prepare_package_new(&base_ctx()).unwrap();
        assert_eq!(decision.status, Some(TaskStatus::Confirmed));
        assert_eq!(decision.reason.as_deref(), Some("Pending -- Ready"));
    }

    #[test]
    fn unknown_version_stays_pending() {
        let ctx = base_ctx();
        let decision = prepare_package_common(&ctx, TaskStatus::Confirmed).unwrap();
        assert_eq!(decision.reason.as_deref(), Some("Pending -- version not specified"));
    }

    #[test]
    fn advances_to_in_progress_once_version_known() {
        let mut ctx = base_ctx();
        ctx.version_known = true;
        let decision = prepare_package_common(&ctx, TaskStatus::Confirmed).unwrap();
        assert_eq!(decision.status, Some(TaskStatus::InProgress));
        assert_eq!(
            decision.reason.as_deref(),
            Some("Pending -- tag not published and/or package not uploaded")
        );
    }

    #[test]
    fn stalled_phrasing_once_versions_already_recorded() {
        let mut ctx = base_ctx();
        ctx.version_known = true;
        ctx.versions_recorded = true;
        let decision = prepare_package_common(&ctx, TaskStatus::InProgress).unwrap();
        assert_eq!(
            decision.reason.as_deref(),
            Some("Stalled -- tag not published and/or package not uploaded")
        );
    }

    #[test]
    fn fix_committed_once_tag_and_upload_land() {
        let mut ctx = base_ctx();
        ctx.version_known = true;
        ctx.tag_published = true;
        ctx.uploaded = true;
        let decision = prepare_package_common(&ctx, TaskStatus::InProgress).unwrap();
        assert_eq!(decision.status, Some(TaskStatus::FixCommitted));
    }

    #[test]
    fn fix_released_once_built_and_in_ppa() {
        let mut ctx = base_ctx();
        ctx.version_known = true;
        ctx.tag_published = true;
        ctx.uploaded = true;
        ctx.built_and_in_pocket_ppa = true;
        let decision = prepare_package_common(&ctx, TaskStatus::FixCommitted).unwrap();
        assert_eq!(decision.status, Some(TaskStatus::FixReleased));
    }

    #[test]
    fn source_only_route_releases_immediately_after_upload() {
        let mut ctx = base_ctx();
        ctx.version_known = true;
        ctx.tag_published = true;
        ctx.has_ppa_route = false;
        let decision = prepare_package_common(&ctx, TaskStatus::InProgress).unwrap();
        assert_eq!(decision.status, Some(TaskStatus::FixReleased));
    }
}
