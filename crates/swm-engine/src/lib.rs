//! The workflow manager (C5, spec.md §4.5): the crank loop that ties
//! enumeration (C1), the `Bug` model (C2), the package-set/snap aggregators
//! (C3/C6), the task dispatch table (C4), and messaging (C7) together, and
//! the `status.yaml` bookkeeping (C1) that wraps a whole scan (ground:
//! `original_source/stable/wfl/manager.py::WorkflowManager`).

pub mod dispatch;
pub mod enumerate;
pub mod packageset;
pub mod status_file;

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{info, instrument, warn};

use swm_catalog::KernelSeries;
use swm_clients::{BugTask, GitTagChecker, SnapStoreClient, TaskStatus, TrackerClient};
use swm_lock::LockFile;
use swm_messaging::{publish, AnnouncementMessage, MessageSink, TestingRequestMessage};
use swm_tracker::bug::{Bug, DEVELOPMENT_WORKFLOW_TASK, STABLE_WORKFLOW_TASK};
use swm_tracker::{git_tag_candidates, ReasonKind};
use swm_utils::error::SwmError;

use dispatch::{dispatch, DispatchContext};
use status_file::StatusFile;

/// Hard cap on fixed-point iterations within one tracker's crank. The
/// original Python has no explicit cap (`while modified:` loops until a
/// pass makes no change); this bounds a handler that oscillates instead of
/// converging, logging instead of spinning forever.
const MAX_CRANK_PASSES: usize = 25;

/// Behavior flags carried by the `swm` CLI surface (spec.md §6).
#[derive(Debug, Clone)]
pub struct CrankOptions {
    pub dryrun: bool,
    pub sauron: bool,
    pub announcements: bool,
    pub assignments: bool,
    pub timestamps: bool,
    pub status_changes: bool,
    pub phase_changes: bool,
}

impl Default for CrankOptions {
    fn default() -> Self {
        Self {
            dryrun: false,
            sauron: false,
            announcements: true,
            assignments: true,
            timestamps: true,
            status_changes: true,
            phase_changes: true,
        }
    }
}

/// The external collaborators one crank needs, bundled so `Manager::new`
/// takes one argument instead of five (ground: `manager.py`'s `s.lp`
/// plus the module-level client split spec.md §6 asks for).
pub struct Clients<'a> {
    pub tracker: &'a dyn TrackerClient,
    pub snap_store: &'a dyn SnapStoreClient,
    pub git_tag: &'a dyn GitTagChecker,
    pub messages: &'a dyn MessageSink,
}

pub struct Manager<'a> {
    clients: Clients<'a>,
    catalog: &'a KernelSeries,
    lock: &'a LockFile,
    options: CrankOptions,
}

/// Outcome of one whole scan (explicit tracker ids, or a full live-tracker
/// enumeration), returned for the CLI to report and choose an exit code
/// from.
#[derive(Debug, Default)]
pub struct ScanReport {
    pub cranked: Vec<String>,
    pub failed: Vec<(String, String)>,
}

impl<'a> Manager<'a> {
    #[must_use]
    pub fn new(clients: Clients<'a>, catalog: &'a KernelSeries, lock: &'a LockFile, options: CrankOptions) -> Self {
        Self {
            clients,
            catalog,
            lock,
            options,
        }
    }

    /// `swm [<tracker-id>...]` (spec.md §6): with explicit ids, crank only
    /// those and leave `status.yaml` untouched beyond updating their own
    /// entries; with none, enumerate every live tracker across both
    /// workflow projects, crank each, then prune `status.yaml` of anything
    /// that fell out of the live set.
    #[instrument(skip(self))]
    pub fn run(&self, ids: Option<&[String]>, now: DateTime<Utc>) -> Result<ScanReport, SwmError> {
        let scanning_all = ids.is_none();
        let live = match ids {
            Some(ids) => ids.to_vec(),
            None => self.enumerate_all()?,
        };
        info!(count = live.len(), scanning_all, "starting scan");

        let mut report = ScanReport::default();
        for id in &live {
            let _span = tracing::info_span!("tracker", id = %id).entered();
            match self.crank_one(id, now) {
                Ok(()) => report.cranked.push(id.clone()),
                Err(e) => {
                    warn!(error = %e, "crank failed, leaving tracker for next scan");
                    report.failed.push((id.clone(), e.to_string()));
                }
            }
        }

        if scanning_all {
            let status_path = swm_utils::paths::status_path();
            let guard = self.lock.lock_status_file().map_err(SwmError::Lock)?;
            let mut status = StatusFile::load(&status_path)?;
            let live_set: BTreeSet<String> = live.into_iter().collect();
            status.clean(&live_set);
            status.write(&status_path)?;
            drop(guard);
        }

        Ok(report)
    }

    fn enumerate_all(&self) -> Result<Vec<String>, SwmError> {
        let mut ids = enumerate::enumerate_live_trackers(self.clients.tracker, STABLE_WORKFLOW_TASK, |_| {
            STABLE_WORKFLOW_TASK
        })
        .map_err(SwmError::Tracker)?;
        ids.extend(
            enumerate::enumerate_live_trackers(self.clients.tracker, DEVELOPMENT_WORKFLOW_TASK, |_| {
                DEVELOPMENT_WORKFLOW_TASK
            })
            .map_err(SwmError::Tracker)?,
        );
        ids.sort();
        ids.dedup();
        Ok(ids)
    }

    /// Crank one tracker to a fixed point and persist the result (ground:
    /// `manager.py::WorkflowManager.crank`/`process_bug_tasks`).
    #[instrument(skip(self, now))]
    fn crank_one(&self, id: &str, now: DateTime<Utc>) -> Result<(), SwmError> {
        let lock_key: u64 = id
            .parse()
            .map_err(|_| SwmError::MalformedState(format!("tracker id {id} is not numeric")))?;
        let _guard = self.lock.lock_tracker(lock_key).map_err(SwmError::Lock)?;

        let data = self.clients.tracker.get_bug(id).map_err(SwmError::Tracker)?;
        if data.duplicate_of.is_some() {
            return Ok(());
        }
        let original_tags = data.tags.clone();
        let original_tasks = data.tasks.clone();

        let series = data
            .tags
            .iter()
            .find(|t| self.catalog.is_known_series(t))
            .cloned()
            .ok_or_else(|| SwmError::MalformedState("no known series tag on tracker".to_string()))?;
        let development = self.catalog.lookup_series(&series)?.development;

        let mut bug = Bug::load(data, development)?;
        bug.reconcile_master_tag();

        let source_name = bug
            .source_name()
            .ok_or_else(|| SwmError::MalformedState("Package not identified from title".to_string()))?
            .to_string();
        let source = self.catalog.lookup_source(&series, &source_name)?;
        let kernel_version = bug
            .kernel_version()
            .ok_or_else(|| SwmError::MalformedState("Package not identified from title".to_string()))?
            .to_string();

        let debs = packageset::gather_debs(self.clients.tracker, source, &series, &kernel_version)?;
        let snap_map = if source.snaps.is_empty() {
            None
        } else {
            Some(packageset::gather_snap_channel_map(self.clients.snap_store, source)?)
        };

        let master_tasks: Option<BTreeMap<String, BugTask>> = if bug.is_derivative() {
            let master_id = bug.master_bug_id().expect("is_derivative implies a master id");
            match self.clients.tracker.get_bug(&master_id) {
                Ok(master_data) => Some(master_data.tasks),
                Err(e) => {
                    warn!(master_id, error = %e, "could not load master tracker, proceeding without it");
                    None
                }
            }
        } else {
            None
        };

        let tag_published = match &source.repo {
            Some(repo) => git_tag_candidates(&source_name, &kernel_version)
                .iter()
                .try_fold(false, |found, tag| {
                    if found {
                        return Ok(true);
                    }
                    self.clients.git_tag.tag_exists(repo, tag)
                })
                .unwrap_or(false),
            None => false,
        };

        let older_tracker_in_ppa = self.older_tracker_in_ppa(id, &series, &source_name, bug.cycle().as_ref());

        bug.reason_reset_all();

        let mut modified = true;
        let mut passes = 0usize;
        let mut pending_status_writes: Vec<(String, TaskStatus)> = Vec::new();
        while modified && passes < MAX_CRANK_PASSES {
            passes += 1;
            let ctx = DispatchContext {
                bug: &bug,
                source,
                debs: &debs,
                snap_map: snap_map.as_ref(),
                now,
                master_tasks: master_tasks.as_ref(),
                tag_published,
                older_tracker_in_ppa,
                duplicate_replaces: false,
            };
            modified = self.process_bug_tasks(&mut bug, &ctx, &mut pending_status_writes);
            if self.options.dryrun {
                break;
            }
        }
        if passes == MAX_CRANK_PASSES && modified {
            warn!(passes, "crank did not converge within the pass cap");
        }

        bug.fill_default_reasons();
        if self.options.phase_changes {
            let phase = compute_phase(&bug);
            let timestamp = if self.options.timestamps {
                now.to_rfc3339()
            } else {
                bug.phase_changed().unwrap_or_else(|| now.to_rfc3339())
            };
            bug.set_phase(phase, &timestamp);
        }
        bug.sync_live_tag();

        if !self.options.dryrun {
            self.save(id, &bug, &original_tags, &original_tasks, &pending_status_writes, &series)?;
        }

        let summary = bug.summary();
        let guard = self.lock.lock_status_file().map_err(SwmError::Lock)?;
        let status_path = swm_utils::paths::status_path();
        let mut status = StatusFile::load(&status_path)?;
        status.set(id.to_string(), summary);
        status.write(&status_path)?;
        drop(guard);

        Ok(())
    }

    /// One pass over every non-root task: dispatch, apply the decision,
    /// and report whether anything actually changed (ground:
    /// `manager.py::process_bug_tasks`).
    fn process_bug_tasks(
        &self,
        bug: &mut Bug,
        ctx: &DispatchContext<'_>,
        pending_status_writes: &mut Vec<(String, TaskStatus)>,
    ) -> bool {
        let root = bug.root_task_name().to_string();
        let names: Vec<String> = bug.tasks.keys().filter(|n| **n != root).cloned().collect();
        let mut modified = false;

        for name in names {
            let current_status = bug.tasks.get(&name).map(|t| t.status).unwrap_or(TaskStatus::New);
            match dispatch(&name, ctx, current_status) {
                None => {
                    bug.properties.set_reason(&name, "unknown workflow task");
                }
                Some(Ok(decision)) => {
                    if let Some(new_status) = decision.status {
                        if new_status != current_status {
                            if let Some(task) = bug.tasks.get_mut(&name) {
                                task.status = new_status;
                            }
                            if self.options.status_changes {
                                pending_status_writes.push((name.clone(), new_status));
                            }
                            modified = true;
                        }
                    }
                    if let Some(reason) = decision.reason {
                        bug.properties.set_reason(&name, reason);
                    }
                }
                Some(Err(crank_err)) => {
                    bug.properties.set_reason(&name, crank_err.to_string());
                }
            }
        }
        modified
    }

    /// Write back whatever actually changed: task statuses, tags (the live
    /// tag and master-tag reconciliation), and the description (properties
    /// block), plus fire messaging side effects for newly-reached
    /// milestones (spec.md §4.2, §4.7).
    fn save(
        &self,
        id: &str,
        bug: &Bug,
        original_tags: &[String],
        original_tasks: &BTreeMap<String, BugTask>,
        pending_status_writes: &[(String, TaskStatus)],
        series: &str,
    ) -> Result<(), SwmError> {
        for (task, status) in pending_status_writes {
            self.clients
                .tracker
                .set_task_status(id, task, status.as_str())
                .map_err(SwmError::Tracker)?;
        }
        if bug.tags != original_tags {
            self.clients.tracker.set_tags(id, &bug.tags).map_err(SwmError::Tracker)?;
        }
        if let Some(description) = bug.description_to_write() {
            self.clients
                .tracker
                .set_description(id, &description)
                .map_err(SwmError::Tracker)?;
        }

        if self.options.announcements {
            self.publish_announcements(id, bug, original_tasks, series);
        }
        Ok(())
    }

    /// Publish a testing request the first time `promote-to-proposed`
    /// reaches `Fix Released` this crank, and an announcement for every
    /// task that newly reached a terminal state (ground:
    /// `package.py::send_testing_request`, `bug.py::send_upload_announcement`).
    fn publish_announcements(&self, id: &str, bug: &Bug, original_tasks: &BTreeMap<String, BugTask>, series: &str) {
        let newly_released = |name: &str| -> bool {
            bug.tasks.get(name).is_some_and(|t| t.status == TaskStatus::FixReleased)
                && original_tasks.get(name).is_none_or(|t| t.status != TaskStatus::FixReleased)
        };

        if newly_released("promote-to-proposed") {
            let message = TestingRequestMessage {
                key: TestingRequestMessage::key_for_proposed(series),
                op: "sru".to_string(),
                who: vec!["kernel".to_string()],
                pocket: "proposed".to_string(),
                ppa: None,
                date: Utc::now(),
                series_name: series.to_string(),
                kernel_version: bug.kernel_version().unwrap_or_default().to_string(),
                package: bug.source_name().unwrap_or_default().to_string(),
                flavour: "generic".to_string(),
                meta_pkg: None,
                sru_cycle: bug.cycle().map(|c| c.identifier()).unwrap_or_default(),
                arches: Vec::new(),
            };
            let routing_key = message.key.clone();
            if let Err(e) = publish(self.clients.messages, &routing_key, &message) {
                warn!(error = %e, "failed to publish testing request");
            }
        }

        for (name, event) in [
            ("promote-to-proposed", "proposed"),
            ("promote-to-updates", "updates"),
            ("promote-to-security", "security"),
            ("promote-to-release", "released"),
        ] {
            if newly_released(name) {
                let announcement = AnnouncementMessage {
                    bug_id: id.to_string(),
                    series: series.to_string(),
                    source_package: bug.source_name().unwrap_or_default().to_string(),
                    version: bug.kernel_version().unwrap_or_default().to_string(),
                    event: event.to_string(),
                    cycle: bug.cycle().map(|c| c.identifier()),
                };
                let key = swm_messaging::routing_key("announcement", series);
                if let Err(e) = publish(self.clients.messages, &key, &announcement) {
                    warn!(error = %e, "failed to publish announcement");
                }
            }
        }
    }

    /// Whether an older, not-yet-`Fix Released` sibling tracker for the
    /// same target series and source package still occupies
    /// `promote-to-proposed` (spec.md §4.4's cycle-ordering gate). Walked
    /// against the cached `status.yaml` entries rather than a fresh tracker
    /// query, exactly as `package.py::older_tracker_in_ppa` walks its own
    /// per-bug cached `target_trackers` list -- a stale entry here just
    /// means the gate is re-evaluated correctly on the next scan.
    fn older_tracker_in_ppa(
        &self,
        my_id: &str,
        series: &str,
        source_name: &str,
        my_cycle: Option<&swm_tracker::tags::CycleInfo>,
    ) -> bool {
        let Some(my_cycle) = my_cycle else {
            return false;
        };
        let status_path = swm_utils::paths::status_path();
        let Ok(status) = StatusFile::load(&status_path) else {
            return false;
        };
        for (other_id, entry) in status.iter() {
            if other_id == my_id {
                continue;
            }
            if entry.series.as_deref() != Some(series) || entry.package != source_name {
                continue;
            }
            let Some((other_cycle, other_spin)) = entry
                .cycle
                .as_deref()
                .and_then(|c| c.rsplit_once('-'))
                .and_then(|(cycle, spin)| spin.parse::<u32>().ok().map(|sp| (cycle.to_string(), sp)))
            else {
                continue;
            };
            let other_cycle = swm_tracker::tags::CycleInfo {
                cycle: other_cycle,
                spin: other_spin,
            };
            if other_cycle >= *my_cycle {
                continue;
            }
            let ptp = entry.promote_to_proposed.as_deref();
            if !matches!(ptp, Some("Invalid") | Some("Fix Released")) {
                return true;
            }
        }
        false
    }
}

/// Derive the coarse phase label from the bug's current task statuses
/// (ground: `bug.py`'s phase transitions, which track `PreparePackage` ->
/// upload -> proposed -> testing -> security/updates -> release as a
/// sequence of "has this stage's terminal task reached Fix Released yet").
#[must_use]
fn compute_phase(bug: &Bug) -> &'static str {
    if bug.is_manually_blocked() {
        return "Holding";
    }

    let status_of = |task: &str| bug.tasks.get(task).map(|t| t.status);
    let prepare_done = bug
        .tasks
        .iter()
        .filter(|(name, _)| name.starts_with("prepare-package"))
        .all(|(_, t)| matches!(t.status, TaskStatus::FixReleased | TaskStatus::Invalid));

    if !prepare_done {
        return "Packaging";
    }
    if status_of("promote-to-proposed") != Some(TaskStatus::FixReleased) {
        return "Uploaded";
    }

    let testing_done = ["verification-testing", "regression-testing", "certification-testing"]
        .iter()
        .all(|t| status_of(t).is_none_or(|s| matches!(s, TaskStatus::FixReleased | TaskStatus::Invalid)));
    if !testing_done {
        return "Testing";
    }

    let release_task = if bug.development {
        "promote-to-release"
    } else {
        "promote-to-updates"
    };
    if status_of(release_task) == Some(TaskStatus::FixReleased) {
        return "Released";
    }
    if status_of("promote-to-security") == Some(TaskStatus::FixReleased) {
        return "Promoted to security";
    }
    "Verification & Testing"
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use swm_catalog::KernelSeries;
    use swm_clients::{BugData, FakeTrackerClient};
    use swm_messaging::InMemoryMessageSink;
    use tempfile::TempDir;

    const CATALOG_YAML: &str = r#"
focal:
  development: false
  supported: true
  esm: false
  sources:
    linux:
      packages:
        main: linux
        meta: linux-meta
      routing:
        build:
          - archive: "~canonical-kernel/ubuntu/ppa"
            pocket: Release
        Proposed:
          - archive: "primary"
            pocket: Proposed
        Updates:
          - archive: "primary"
            pocket: Updates
      component: main
"#;

    fn task(status: TaskStatus) -> BugTask {
        BugTask {
            name: "t".to_string(),
            status,
            importance: "Medium".to_string(),
            assignee: None,
        }
    }

    fn sample_bug_data() -> BugData {
        let mut tasks = BTreeMap::new();
        tasks.insert(STABLE_WORKFLOW_TASK.to_string(), task(TaskStatus::New));
        tasks.insert("prepare-package".to_string(), task(TaskStatus::New));
        tasks.insert("prepare-package-meta".to_string(), task(TaskStatus::New));
        tasks.insert("promote-to-proposed".to_string(), task(TaskStatus::New));
        tasks.insert("promote-to-updates".to_string(), task(TaskStatus::New));
        tasks.insert("verification-testing".to_string(), task(TaskStatus::New));
        tasks.insert("regression-testing".to_string(), task(TaskStatus::New));
        tasks.insert("certification-testing".to_string(), task(TaskStatus::New));
        BugData {
            id: "1000".to_string(),
            title: "linux: 5.4.0-42.46 -proposed tracker".to_string(),
            description: String::new(),
            tags: vec![
                "focal".to_string(),
                "kernel-release-tracking-bug-live".to_string(),
                "kernel-sru-cycle-2026.01.01-1".to_string(),
            ],
            tasks,
            duplicate_of: None,
        }
    }

    fn new_manager_env() -> (FakeTrackerClient, swm_clients::FakeSnapStoreClient, swm_clients::FakeGitTagChecker, InMemoryMessageSink, KernelSeries, TempDir, LockFile)
    {
        let tracker = FakeTrackerClient::new();
        let snaps = swm_clients::FakeSnapStoreClient::default();
        let git_tag = swm_clients::FakeGitTagChecker::default();
        let messages = InMemoryMessageSink::new();
        let catalog = KernelSeries::from_yaml_str(CATALOG_YAML).unwrap();
        let dir = TempDir::new().unwrap();
        swm_utils::paths::set_swm_home_override(Some(
            camino::Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap(),
        ));
        let lock = LockFile::open(&swm_utils::paths::lock_path()).unwrap();
        (tracker, snaps, git_tag, messages, catalog, dir, lock)
    }

    #[test]
    fn first_crank_advances_prepare_package_and_sets_uploaded_phase() {
        let (tracker, snaps, git_tag, messages, catalog, _dir, lock) = new_manager_env();
        tracker.insert_bug(sample_bug_data());
        let clients = Clients {
            tracker: &tracker,
            snap_store: &snaps,
            git_tag: &git_tag,
            messages: &messages,
        };
        let manager = Manager::new(clients, &catalog, &lock, CrankOptions::default());
        let now = Utc::now();
        let report = manager
            .run(Some(&["1000".to_string()]), now)
            .unwrap();
        assert_eq!(report.cranked, vec!["1000".to_string()]);
        assert!(report.failed.is_empty());

        let bug = tracker.get_bug("1000").unwrap();
        assert_eq!(
            bug.tasks.get("prepare-package").unwrap().status,
            TaskStatus::Confirmed
        );
    }

    #[test]
    fn unknown_tracker_id_surfaces_as_a_failure_not_a_panic() {
        let (tracker, snaps, git_tag, messages, catalog, _dir, lock) = new_manager_env();
        let clients = Clients {
            tracker: &tracker,
            snap_store: &snaps,
            git_tag: &git_tag,
            messages: &messages,
        };
        let manager = Manager::new(clients, &catalog, &lock, CrankOptions::default());
        let report = manager
            .run(Some(&["9999".to_string()]), Utc::now())
            .unwrap();
        assert!(report.cranked.is_empty());
        assert_eq!(report.failed.len(), 1);
    }

    #[test]
    fn compute_phase_reports_packaging_before_prepare_package_is_done() {
        let data = sample_bug_data();
        let bug = Bug::load(data, false).unwrap();
        assert_eq!(compute_phase(&bug), "Packaging");
    }

    #[test]
    fn compute_phase_reports_uploaded_once_prepare_package_is_fix_released() {
        let mut data = sample_bug_data();
        data.tasks.get_mut("prepare-package").unwrap().status = TaskStatus::FixReleased;
        data.tasks.get_mut("prepare-package-meta").unwrap().status = TaskStatus::FixReleased;
        let bug = Bug::load(data, false).unwrap();
        assert_eq!(compute_phase(&bug), "Uploaded");
    }

    #[test]
    fn compute_phase_reports_holding_when_manually_blocked() {
        let mut data = sample_bug_data();
        data.tags.push(swm_tracker::tags::BLOCK_TAG.to_string());
        let bug = Bug::load(data, false).unwrap();
        assert_eq!(compute_phase(&bug), "Holding");
    }
}
