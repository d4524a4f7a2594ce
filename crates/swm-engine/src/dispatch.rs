//! Task dispatch table (C4/C5, spec.md §4.4, §9: "a table of (task name ->
//! handler fn)"): turn one workflow task's current status into a decision by
//! gathering the small context struct its handler needs and calling it.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};

use swm_catalog::SourceData;
use swm_clients::{BugTask, TaskStatus};
use swm_packageset::{all_built_and_in_pocket_for, ready_for_security, ready_for_testing, Debs, PocketReadiness, PocketState};
use swm_snap::SnapChannelMap;
use swm_tasks::decision::{TaskDecision, TaskResult};
use swm_tasks::{prepare_package, promote, security_signoff, snap_release, testing, within_publishing_window};
use swm_tracker::bug::{Bug, DEVELOPMENT_WORKFLOW_TASK, STABLE_WORKFLOW_TASK};
use swm_tracker::tags::{BLOCK_SOURCE_TAG, BLOCK_TAG};

/// Everything gathered once per crank (not once per task) that a handler
/// might need. Built by `crank.rs` before the fixed-point loop starts; the
/// package-set and snap data stay the same across every iteration of one
/// crank (spec.md §4.3: memoized per crank), only the bug's own task
/// statuses and reasons change as handlers fire.
pub struct DispatchContext<'a> {
    pub bug: &'a Bug,
    pub source: &'a SourceData,
    pub debs: &'a Debs,
    pub snap_map: Option<&'a SnapChannelMap>,
    pub now: DateTime<Utc>,
    /// The master tracker's tasks, when this bug is a derivative or
    /// backport and the master could be loaded.
    pub master_tasks: Option<&'a BTreeMap<String, BugTask>>,
    /// Whether the git tag for this tracker's kernel version has been cut.
    pub tag_published: bool,
    /// Whether an older, not-yet-released tracker for the same target
    /// still has `promote-to-proposed` open (spec.md §4.4's cycle-ordering
    /// gate). The engine only has one bug loaded per crank, so this is
    /// supplied by the caller rather than computed here; `false` when no
    /// sibling lookup was performed.
    pub older_tracker_in_ppa: bool,
    /// Whether a duplicate of this tracker has already cleared the pocket
    /// a `prepare-package` gate is checking.
    pub duplicate_replaces: bool,
}

fn master_status(tasks: Option<&BTreeMap<String, BugTask>>, name: &str) -> Option<TaskStatus> {
    tasks.and_then(|t| t.get(name)).map(|t| t.status)
}

fn master_root_status(tasks: Option<&BTreeMap<String, BugTask>>) -> Option<TaskStatus> {
    master_status(tasks, STABLE_WORKFLOW_TASK).or_else(|| master_status(tasks, DEVELOPMENT_WORKFLOW_TASK))
}

fn trello_blocked(bug: &Bug) -> bool {
    bug.tags.iter().any(|t| t.starts_with("kernel-trello-blocked-"))
}

fn manually_blocked(bug: &Bug) -> bool {
    bug.tags.iter().any(|t| t == BLOCK_TAG || t == BLOCK_SOURCE_TAG)
}

fn build_uploaded(debs: &Debs, pkg_type: &str) -> bool {
    ["build", "build-private"].iter().any(|pocket| {
        debs.package(pocket, pkg_type).is_some_and(|pb| {
            matches!(
                pb.state(),
                PocketState::Building
                    | PocketState::FullyBuiltPending
                    | PocketState::FullyBuilt
                    | PocketState::FailedToBuild
            )
        })
    })
}

fn has_ppa_route(debs: &Debs, pkg_type: &str) -> bool {
    ["build", "build-private"]
        .iter()
        .any(|pocket| debs.package(pocket, pkg_type).is_some())
}

fn built_and_in_pocket_ppa(debs: &Debs) -> bool {
    debs.all_built_and_in_pocket("build") || debs.all_built_and_in_pocket("build-private")
}

fn dispatch_prepare_package(
    task_name: &str,
    ctx: &DispatchContext<'_>,
    current_status: TaskStatus,
) -> TaskResult {
    let pkg_type = task_name
        .strip_prefix("prepare-package-")
        .unwrap_or("main")
        .to_string();
    let is_main = pkg_type == "main";

    let need_master_in_proposed = ctx.source.need_master_in_proposed;
    let master_ready = if !ctx.bug.is_derivative() {
        true
    } else if need_master_in_proposed {
        master_status(ctx.master_tasks, "promote-to-proposed") == Some(TaskStatus::FixReleased)
    } else {
        matches!(
            master_root_status(ctx.master_tasks),
            Some(TaskStatus::FixCommitted) | Some(TaskStatus::FixReleased)
        )
    };

    let main_is_invalid = !is_main
        && ctx
            .bug
            .tasks
            .get("prepare-package")
            .is_some_and(|t| t.status == TaskStatus::Invalid);

    let pctx = prepare_package::PrepareContext {
        pkg_type: pkg_type.clone(),
        is_main,
        main_is_invalid,
        older_tracker_in_ppa: ctx.older_tracker_in_ppa,
        need_master_in_proposed,
        master_ready,
        package_type_valid: ctx.source.has_package_type(&pkg_type),
        trello_blocked: trello_blocked(ctx.bug),
        manually_blocked: manually_blocked(ctx.bug),
        version_known: ctx.bug.kernel_version().is_some(),
        tag_published: ctx.tag_published,
        has_ppa_route: has_ppa_route(ctx.debs, &pkg_type),
        uploaded: build_uploaded(ctx.debs, &pkg_type),
        versions_recorded: ctx.bug.properties.versions().contains_key(&pkg_type),
        built_and_in_pocket_ppa: built_and_in_pocket_ppa(ctx.debs),
        duplicate_replaces: ctx.duplicate_replaces,
    };

    if current_status == TaskStatus::New {
        prepare_package::prepare_package_new(&pctx)
    } else {
        prepare_package::prepare_package_common(&pctx, current_status)
    }
}

fn pocket_for_promotion(task_name: &str) -> &'static str {
    match task_name {
        "promote-to-proposed" => "Proposed",
        "promote-to-updates" => "Updates",
        "promote-to-security" => "Security",
        "promote-to-release" => "Release",
        _ => unreachable!("dispatch only calls this for a promote-to-* task"),
    }
}

fn empty_builds() -> BTreeMap<String, swm_packageset::PackageBuild> {
    BTreeMap::new()
}

fn dispatch_promote(
    task_name: &str,
    ctx: &DispatchContext<'_>,
    current_status: TaskStatus,
) -> TaskResult {
    let dest = pocket_for_promotion(task_name);

    let ready = match task_name {
        "promote-to-proposed" => built_and_in_pocket_ppa(ctx.debs),
        "promote-to-security" => {
            let empty = empty_builds();
            let security = ctx.debs.pocket("Security").unwrap_or(&empty);
            let updates = ctx.debs.pocket("Updates").unwrap_or(&empty);
            ready_for_security(security, updates, ctx.now)
        }
        _ => matches!(
            ctx.debs.all_built_and_in_pocket_for("Proposed", Duration::from_secs(0), ctx.now),
            PocketReadiness::Ready
        ),
    };

    let blocked = ctx.bug.is_proposed_blocked() && dest != "Proposed";
    let block_reason = blocked.then(|| "kernel-block-proposed tag present".to_string());

    let gated_by_window = dest != "Proposed";

    if task_name == "promote-to-security" {
        let signoff_status = ctx
            .bug
            .tasks
            .get("security-signoff")
            .map(|t| t.status)
            .unwrap_or(TaskStatus::New);
        let gctx = promote::SecurityGateContext {
            proposed_only_kernel: !ctx.source.has_package_type("main") || !has_ppa_route(ctx.debs, "main"),
            security_signoff_invalid: security_signoff::signoff_makes_security_ineligible(signoff_status),
            is_derivative: ctx.bug.is_derivative(),
            master_ready_for_security: !ctx.bug.is_derivative()
                || master_status(ctx.master_tasks, "promote-to-security") == Some(TaskStatus::FixReleased),
            security_signoff_complete: security_signoff::signoff_complete(signoff_status),
            testing_completed: ["verification-testing", "regression-testing", "certification-testing"]
                .iter()
                .all(|t| {
                    ctx.bug
                        .tasks
                        .get(*t)
                        .is_none_or(|task| matches!(task.status, TaskStatus::FixReleased | TaskStatus::Invalid))
                }),
            proposed_blocked_tag: ctx.bug.is_proposed_blocked(),
        };
        match promote::security_gate(&gctx) {
            promote::SecurityGateOutcome::Invalid => return Ok(TaskDecision::to_status_only(TaskStatus::Invalid)),
            promote::SecurityGateOutcome::Hold(reason) => {
                return Ok(if current_status == TaskStatus::New {
                    TaskDecision::hold(reason)
                } else {
                    TaskDecision::to(current_status, swm_tracker::ReasonKind::Holding, reason)
                });
            }
            promote::SecurityGateOutcome::Proceed => {}
        }
    }

    let after = swm_packageset::pockets_after(dest, ctx.bug.development);
    let after_refs: Vec<&str> = after.iter().map(String::as_str).collect();
    let pctx = promote::PromoteContext {
        dest_already_clear: ctx
            .debs
            .pocket_clear(dest, &after_refs, ctx.bug.development, ctx.duplicate_replaces),
        ready,
        blocked,
        block_reason,
        within_publishing_window: within_publishing_window(ctx.now),
        gated_by_window,
    };

    if current_status == TaskStatus::New {
        promote::promote_new(&pctx)
    } else {
        promote::promote_verify(&pctx, current_status)
    }
}

fn dispatch_testing(
    task_name: &str,
    ctx: &DispatchContext<'_>,
    current_status: TaskStatus,
) -> TaskResult {
    if current_status == TaskStatus::New {
        let ready_for_testing = matches!(
            ctx.debs.all_built_and_in_pocket_for("Proposed", Duration::from_secs(0), ctx.now),
            PocketReadiness::Ready
        );
        return testing::testing_new(&testing::TestingContext { ready_for_testing });
    }

    if task_name == "verification-testing" && ctx.bug.is_derivative() {
        return Ok(testing::verification_testing_confirmed(master_status(
            ctx.master_tasks,
            "verification-testing",
        )));
    }

    let (passed_tag, failed_tag) = match task_name {
        "regression-testing" => ("regression-testing-passed", "regression-testing-failed"),
        "certification-testing" => ("certification-testing-passed", "certification-testing-failed"),
        _ => ("qa-testing-passed", "qa-testing-failed"),
    };
    let lctx = testing::LabTestingContext {
        requested: ctx.bug.properties.get_string("proposed-testing-requested").is_some(),
        result_failed: ctx.bug.tags.iter().any(|t| t == failed_tag),
        result_passed: ctx.bug.tags.iter().any(|t| t == passed_tag),
    };
    Ok(testing::lab_testing_common(&lctx, current_status))
}

fn dispatch_snap_release(task_name: &str, ctx: &DispatchContext<'_>, current_status: TaskStatus) -> TaskResult {
    let Some(map) = ctx.snap_map else {
        return Ok(TaskDecision::unchanged());
    };
    let risk = task_name.strip_prefix("snap-release-to-").unwrap_or("stable");
    let mut expected_tracks = Vec::new();
    let mut expected_arches = Vec::new();
    for snap in &ctx.source.snaps {
        expected_tracks.extend(snap.tracks.iter().cloned());
        expected_arches.extend(snap.arches.iter().cloned());
    }
    expected_tracks.sort();
    expected_tracks.dedup();
    expected_arches.sort();
    expected_arches.dedup();

    let sctx = snap_release::SnapReleaseContext {
        risk: risk.to_string(),
        expected_tracks,
        expected_arches,
        wanted_version: ctx.bug.kernel_version().unwrap_or_default().to_string(),
    };
    Ok(snap_release::snap_release_decision(&sctx, map, current_status))
}

/// Look up and run the handler for `task_name`, or `None` if no handler is
/// registered (spec.md §4.5: an unrecognised task is left alone with the
/// reason `"unknown workflow task"`, not a `CrankError`).
pub fn dispatch(task_name: &str, ctx: &DispatchContext<'_>, current_status: TaskStatus) -> Option<TaskResult> {
    if task_name == "prepare-package" || task_name.starts_with("prepare-package-") {
        return Some(dispatch_prepare_package(task_name, ctx, current_status));
    }
    if task_name.starts_with("promote-to-") {
        return Some(dispatch_promote(task_name, ctx, current_status));
    }
    if matches!(
        task_name,
        "verification-testing" | "regression-testing" | "certification-testing"
    ) {
        return Some(dispatch_testing(task_name, ctx, current_status));
    }
    if task_name.starts_with("snap-release-to-") {
        return Some(dispatch_snap_release(task_name, ctx, current_status));
    }
    if task_name == "security-signoff" {
        // Manually driven; SWM only observes it from the promote-to-security gate.
        return Some(Ok(TaskDecision::unchanged()));
    }
    None
}
