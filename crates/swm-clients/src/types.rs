//! Data shapes for the subset of the Launchpad-shaped tracker API that the
//! engine consumes (spec.md §6): bugs, tasks, published sources/binaries,
//! builds, upload-queue entries.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// A tracker's task status. Ordered roughly by how "alive" the task is;
/// comparisons should go through explicit matches, not `Ord`, since the
/// workflow has no single linear order across all of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskStatus {
    New,
    Confirmed,
    Triaged,
    InProgress,
    Incomplete,
    FixCommitted,
    FixReleased,
    WontFix,
    Opinion,
    Invalid,
    Expired,
    Unknown,
}

impl TaskStatus {
    /// One of the statuses that keep a tracker in the "live" scan (C1).
    #[must_use]
    pub fn is_live(self) -> bool {
        matches!(
            self,
            TaskStatus::New
                | TaskStatus::Confirmed
                | TaskStatus::InProgress
                | TaskStatus::Incomplete
                | TaskStatus::FixCommitted
        )
    }

    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::FixReleased | TaskStatus::Invalid)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::New => "New",
            TaskStatus::Confirmed => "Confirmed",
            TaskStatus::Triaged => "Triaged",
            TaskStatus::InProgress => "In Progress",
            TaskStatus::Incomplete => "Incomplete",
            TaskStatus::FixCommitted => "Fix Committed",
            TaskStatus::FixReleased => "Fix Released",
            TaskStatus::WontFix => "Won't Fix",
            TaskStatus::Opinion => "Opinion",
            TaskStatus::Invalid => "Invalid",
            TaskStatus::Expired => "Expired",
            TaskStatus::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "New" => TaskStatus::New,
            "Confirmed" => TaskStatus::Confirmed,
            "Triaged" => TaskStatus::Triaged,
            "In Progress" => TaskStatus::InProgress,
            "Incomplete" => TaskStatus::Incomplete,
            "Fix Committed" => TaskStatus::FixCommitted,
            "Fix Released" => TaskStatus::FixReleased,
            "Won't Fix" => TaskStatus::WontFix,
            "Opinion" => TaskStatus::Opinion,
            "Invalid" => TaskStatus::Invalid,
            "Expired" => TaskStatus::Expired,
            _ => TaskStatus::Unknown,
        })
    }
}

#[derive(Debug, Clone)]
pub struct BugTask {
    pub name: String,
    pub status: TaskStatus,
    pub importance: String,
    pub assignee: Option<String>,
}

/// One bug ("tracker") as seen through the tracker API: title, tags,
/// description, and its per-task state.
#[derive(Debug, Clone)]
pub struct BugData {
    pub id: String,
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    /// Task name (e.g. `"prepare-package-meta"`, the workflow project name,
    /// or the series-nomination task) -> task.
    pub tasks: BTreeMap<String, BugTask>,
    /// Set when the tracker system marks this bug a duplicate of another.
    pub duplicate_of: Option<String>,
}

/// Publication lifecycle for a source package (and, re-used, a binary).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublicationStatus {
    Pending,
    Published,
    Superseded,
    Deleted,
    Obsolete,
}

impl FromStr for PublicationStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "Pending" => PublicationStatus::Pending,
            "Published" => PublicationStatus::Published,
            "Superseded" => PublicationStatus::Superseded,
            "Deleted" => PublicationStatus::Deleted,
            "Obsolete" => PublicationStatus::Obsolete,
            _ => return Err(()),
        })
    }
}

#[derive(Debug, Clone)]
pub struct PublishedSourceQuery {
    pub series: String,
    pub source_name: String,
    pub version: Option<String>,
    pub pocket: Option<String>,
    pub exact_match: bool,
}

#[derive(Debug, Clone)]
pub struct PublishedSource {
    pub source_name: String,
    pub version: String,
    pub status: PublicationStatus,
    pub component: String,
    pub date_published: Option<DateTime<Utc>>,
    pub creator: Option<String>,
    pub signer: Option<String>,
    pub changes_file_url: Option<String>,
    pub self_link: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildState {
    NeedsBuilding,
    CurrentlyBuilding,
    UploadingBuild,
    SuccessfullyBuilt,
    FailedToBuild,
    DependencyWait,
    ChrootProblem,
    Other,
}

impl FromStr for BuildState {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "Needs building" => BuildState::NeedsBuilding,
            "Currently building" => BuildState::CurrentlyBuilding,
            "Uploading build" => BuildState::UploadingBuild,
            "Successfully built" => BuildState::SuccessfullyBuilt,
            "Failed to build" => BuildState::FailedToBuild,
            "Dependency wait" => BuildState::DependencyWait,
            "Chroot problem" => BuildState::ChrootProblem,
            _ => BuildState::Other,
        })
    }
}

#[derive(Debug, Clone)]
pub struct Build {
    pub self_link: String,
    pub arch_tag: String,
    pub buildstate: BuildState,
    pub datebuilt: Option<DateTime<Utc>>,
    pub can_be_retried: bool,
    pub log_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PublishedBinary {
    pub arch_tag: String,
    pub status: PublicationStatus,
    pub date_published: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadQueueStatus {
    New,
    Unapproved,
    Accepted,
    Done,
    Rejected,
}

impl FromStr for UploadQueueStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "New" => UploadQueueStatus::New,
            "Unapproved" => UploadQueueStatus::Unapproved,
            "Accepted" => UploadQueueStatus::Accepted,
            "Done" => UploadQueueStatus::Done,
            "Rejected" => UploadQueueStatus::Rejected,
            _ => return Err(()),
        })
    }
}

#[derive(Debug, Clone)]
pub struct PackageUpload {
    pub status: UploadQueueStatus,
}

/// How multiple tags combine in a search (Launchpad's `tags_combinator`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagsCombinator {
    All,
    Any,
}
