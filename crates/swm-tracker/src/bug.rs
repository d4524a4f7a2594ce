//! The `Bug` model (C2): a tracker's parsed, engine-facing view over the raw
//! wire `BugData` (spec.md §3, §4.2).

use std::collections::BTreeMap;

use swm_clients::{BugData, BugTask, TaskStatus};
use swm_utils::error::SwmError;

use crate::properties::{self, SwmProperties};
use crate::reason::{self, ReasonKind};
use crate::tags::{self, CycleInfo, MasterKind, MasterPointer};
use crate::version::{self, TitleInfo};

pub const STABLE_WORKFLOW_TASK: &str = "kernel-sru-workflow";
pub const DEVELOPMENT_WORKFLOW_TASK: &str = "kernel-development-workflow";

/// A snapshot of what goes into `status.yaml` for one tracker (spec.md §6).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusSummary {
    pub cycle: Option<String>,
    pub series: Option<String>,
    pub package: String,
    pub version: Option<String>,
    pub phase: Option<String>,
    pub reason: Option<String>,
    pub master_bug: Option<String>,
    pub versions: BTreeMap<String, String>,
    /// This tracker's own `promote-to-proposed` status, cached here so a
    /// later-cycle sibling tracker can read it out of `status.yaml` instead
    /// of loading this bug afresh (ground: `package.py::older_tracker_in_ppa`,
    /// which walks exactly this kind of cached per-tracker status list).
    pub promote_to_proposed: Option<String>,
}

/// The engine's working view of one tracker. Owns the parsed title, tags,
/// properties, and tasks; tracks which mutable fields have changed since
/// load so `save()` can issue the minimal set of tracker-API writes.
#[derive(Debug, Clone)]
pub struct Bug {
    pub id: String,
    pub title_info: Option<TitleInfo>,
    raw_title: String,
    pub tags: Vec<String>,
    preamble: String,
    pub properties: SwmProperties,
    raw_description: String,
    pub tasks: BTreeMap<String, BugTask>,
    pub duplicate_of: Option<String>,
    pub development: bool,
}

impl Bug {
    /// Build a `Bug` from the wire representation. Fails with
    /// `MalformedState` if the title cannot be parsed (spec.md §4.2:
    /// "Package not identified from title").
    pub fn load(data: BugData, development: bool) -> Result<Self, SwmError> {
        let title_info = version::parse_title(&data.title);
        if title_info.is_none() {
            return Err(SwmError::MalformedState(
                "Package not identified from title".to_string(),
            ));
        }
        let (preamble, properties) = properties::parse_description(&data.description);
        Ok(Self {
            id: data.id,
            title_info,
            raw_title: data.title,
            tags: data.tags,
            preamble,
            properties,
            raw_description: data.description,
            tasks: data.tasks,
            duplicate_of: data.duplicate_of,
            development,
        })
    }

    #[must_use]
    pub fn source_name(&self) -> Option<&str> {
        self.title_info.as_ref().map(|t| t.source.as_str())
    }

    #[must_use]
    pub fn kernel_version(&self) -> Option<&str> {
        self.title_info.as_ref().map(|t| t.version.full.as_str())
    }

    /// The name of the distinguished root workflow task: `kernel-sru-workflow`
    /// for stable series, `kernel-development-workflow` for the development
    /// series (spec.md §3).
    #[must_use]
    pub fn root_task_name(&self) -> &'static str {
        if self.development {
            DEVELOPMENT_WORKFLOW_TASK
        } else {
            STABLE_WORKFLOW_TASK
        }
    }

    #[must_use]
    pub fn root_task(&self) -> Option<&BugTask> {
        self.tasks.get(self.root_task_name())
    }

    #[must_use]
    pub fn root_status(&self) -> TaskStatus {
        self.root_task().map_or(TaskStatus::Unknown, |t| t.status)
    }

    /// True while the root task has not reached a terminal state
    /// (`Fix Released` or `Invalid`); governs whether the live tag should be
    /// present (spec.md §3 invariants).
    #[must_use]
    pub fn root_is_live(&self) -> bool {
        !self.root_status().is_terminal()
    }

    #[must_use]
    pub fn has_live_tag(&self) -> bool {
        self.tags.iter().any(|t| t == tags::LIVE_TAG)
    }

    /// Tag-derived target series, falling back to nothing if no tag matches
    /// a known series codename.
    #[must_use]
    pub fn target_series<'a>(&'a self, is_known_series: impl Fn(&str) -> bool) -> Option<&'a str> {
        tags::find_target_series(&self.tags, is_known_series)
    }

    /// The cycle+spin encoded in the tracker's `kernel-sru-cycle-*` tag.
    #[must_use]
    pub fn cycle(&self) -> Option<CycleInfo> {
        tags::find_cycle(&self.tags)
    }

    /// The master pointer, preferring the `kernel-stable-master-bug`
    /// property (authoritative) over the tag-derived pointer; if they
    /// disagree the tag is stale and should be rewritten on save.
    #[must_use]
    pub fn master_bug_id(&self) -> Option<String> {
        self.properties
            .master_bug()
            .or_else(|| tags::find_master_pointer(&self.tags).map(|p| p.id))
    }

    #[must_use]
    pub fn is_derivative(&self) -> bool {
        self.master_bug_id().is_some()
    }

    /// Reconcile the tag-derived master pointer against the authoritative
    /// property, rewriting the tag set if they disagree (spec.md §4.2).
    pub fn reconcile_master_tag(&mut self) {
        let Some(property_master) = self.properties.master_bug() else {
            return;
        };
        let tag_pointer = tags::find_master_pointer(&self.tags);
        if tag_pointer.as_ref().map(|p| p.id.as_str()) == Some(property_master.as_str()) {
            return;
        }
        self.tags
            .retain(|t| tags::find_master_pointer(std::slice::from_ref(t)).is_none());
        let kind = tag_pointer.map_or(MasterKind::Derivative, |p| p.kind);
        let prefix = match kind {
            MasterKind::Derivative => "kernel-sru-derivative-of",
            MasterKind::Backport => "kernel-sru-backport-of",
        };
        self.tags.push(format!("{prefix}-{property_master}"));
    }

    #[must_use]
    pub fn is_manually_blocked(&self) -> bool {
        tags::is_manually_blocked(&self.tags)
    }

    #[must_use]
    pub fn is_proposed_blocked(&self) -> bool {
        tags::is_proposed_blocked(&self.tags)
    }

    // -- reasons ----------------------------------------------------------

    pub fn reason_reset_all(&mut self) {
        self.properties.reason_reset_all();
    }

    pub fn set_task_reason(&mut self, task: &str, kind: ReasonKind, detail: impl AsRef<str>) {
        self.properties.set_reason(task, reason::reason(kind, detail));
    }

    #[must_use]
    pub fn task_reason(&self, task: &str) -> Option<String> {
        self.properties.reason(task)
    }

    pub fn set_overall_reason(&mut self, kind: ReasonKind, detail: impl AsRef<str>) {
        self.properties
            .set_overall_reason(reason::reason(kind, detail));
    }

    /// Fill the default reason for any active task the crank left without
    /// one (spec.md §4.2).
    pub fn fill_default_reasons(&mut self) {
        let active: Vec<(String, TaskStatus)> = self
            .tasks
            .iter()
            .filter(|(name, _)| *name != self.root_task_name())
            .map(|(name, t)| (name.clone(), t.status))
            .collect();
        for (name, status) in active {
            if self.task_reason(&name).is_none() {
                if let Some(default) = reason::default_reason_for(status) {
                    self.properties.set_reason(&name, default);
                }
            }
        }
    }

    // -- phase --------------------------------------------------------------

    #[must_use]
    pub fn phase(&self) -> Option<String> {
        self.properties.phase(self.development)
    }

    pub fn set_phase(&mut self, phase: &str, now: &str) {
        self.properties.set_phase(self.development, phase, now);
    }

    /// The timestamp currently stamped on the phase property, if any --
    /// used by the `--no-timestamps` CLI flag to freeze the changed-at
    /// timestamp while still letting the phase label itself advance.
    #[must_use]
    pub fn phase_changed(&self) -> Option<String> {
        self.properties.get_string(properties::SwmProperties::phase_changed_key(self.development))
    }

    // -- title rewriting ------------------------------------------------

    /// Rewrite the title once the version becomes known (spec.md §6). Only
    /// meaningful before `title_info` is set (i.e. title currently carries
    /// no parseable version, which `load` would already have rejected —
    /// kept for the respin case where the version segment changes).
    pub fn rewrite_title(&mut self, version: &str) {
        if let Some(source) = self.source_name().map(str::to_string) {
            self.raw_title = version::format_title(&source, version);
            self.title_info = version::parse_title(&self.raw_title);
        }
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.raw_title
    }

    // -- save semantics ---------------------------------------------------

    /// The description as it should be written back, or `None` if nothing
    /// changed (spec.md §4.2: writes are conditional).
    #[must_use]
    pub fn description_to_write(&self) -> Option<String> {
        if properties::description_needs_write(&self.raw_description, &self.preamble, &self.properties)
        {
            Some(properties::serialize_description(
                &self.preamble,
                &self.properties,
            ))
        } else {
            None
        }
    }

    /// Apply the live-tag invariant: present while the root task is live,
    /// removed atomically once it reaches `Fix Released` (spec.md §3). Has
    /// no effect for `Invalid` roots — abandoned trackers just stop being
    /// scanned, they don't get the tag stripped.
    pub fn sync_live_tag(&mut self) {
        let should_have_tag = self.root_status() != TaskStatus::FixReleased;
        let has_tag = self.has_live_tag();
        if should_have_tag && !has_tag {
            self.tags.push(tags::LIVE_TAG.to_string());
        } else if !should_have_tag && has_tag {
            self.tags.retain(|t| t != tags::LIVE_TAG);
        }
    }

    #[must_use]
    pub fn summary(&self) -> StatusSummary {
        StatusSummary {
            cycle: self.cycle().map(|c| c.identifier()),
            series: self.target_series(|_| true).map(str::to_string),
            package: self
                .source_name()
                .map(str::to_string)
                .unwrap_or_else(|| "unknown".to_string()),
            version: self.kernel_version().map(str::to_string),
            phase: self.phase(),
            reason: self.properties.overall_reason(),
            master_bug: self.master_bug_id(),
            versions: self.properties.versions(),
            promote_to_proposed: self
                .tasks
                .get("promote-to-proposed")
                .map(|t| t.status.as_str().to_string()),
        }
    }
}
