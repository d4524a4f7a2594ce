//! Tracker enumeration (C1, spec.md §4.1): which tracker ids are "live" --
//! worth a crank at all.

use swm_clients::{TaskStatus, TrackerClient};
use swm_tracker::tags::LIVE_TAG;
use swm_utils::error::TrackerError;

/// The two tags every live tracker carries, queried with `ALL` so a search
/// against the workflow project returns exactly the trackers whose root task
/// is still open and which haven't been manually stripped of the live tag.
const ENUMERATE_TAGS: [&str; 1] = [LIVE_TAG];

/// `enumerate()`: ask the tracker for every bug in `project` carrying the
/// live tag, then re-check each one's root task status and duplicate-of
/// field locally, since a tag search can lag a task transition by a crank.
///
/// Duplicated trackers are silently dropped here (spec.md §4.1: "Duplicated
/// trackers... are excluded and removed from the persisted status") --
/// `status_clean` takes care of the removal once the caller finishes a full
/// scan.
pub fn enumerate_live_trackers(
    client: &dyn TrackerClient,
    project: &str,
    root_task_name: impl Fn(&str) -> &'static str,
) -> Result<Vec<String>, TrackerError> {
    let candidates = client.search_bugs_by_tags(project, &ENUMERATE_TAGS.map(str::to_string), true)?;

    let mut live = Vec::with_capacity(candidates.len());
    for id in candidates {
        let data = match client.get_bug(&id) {
            Ok(data) => data,
            Err(TrackerError::NotFound(_)) => continue,
            Err(e) => return Err(e),
        };
        if data.duplicate_of.is_some() {
            continue;
        }
        let root = root_task_name(&id);
        let is_live = data
            .tasks
            .get(root)
            .is_some_and(|t| t.status.is_live());
        if is_live {
            live.push(id);
        }
    }
    Ok(live)
}
