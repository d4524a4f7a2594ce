//! `status.yaml` (C1, spec.md §6): a flat snapshot of every live tracker's
//! summary, rewritten atomically once per scan and pruned of trackers that
//! have left the live set.

use std::collections::{BTreeMap, BTreeSet};

use camino::Utf8Path;
use serde::{Deserialize, Serialize};
use swm_tracker::bug::StatusSummary;
use swm_utils::error::SwmError;

/// Serializable mirror of [`StatusSummary`]; kept separate so the domain
/// type in `swm-tracker` doesn't have to carry a `serde` dependency just for
/// this one file format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cycle: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub series: Option<String>,
    pub package: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub master_bug: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub versions: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub promote_to_proposed: Option<String>,
}

impl From<StatusSummary> for StatusEntry {
    fn from(s: StatusSummary) -> Self {
        Self {
            cycle: s.cycle,
            series: s.series,
            package: s.package,
            version: s.version,
            phase: s.phase,
            reason: s.reason,
            master_bug: s.master_bug,
            versions: s.versions,
            promote_to_proposed: s.promote_to_proposed,
        }
    }
}

/// The whole `status.yaml` document: tracker id -> its summary.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatusFile {
    #[serde(flatten)]
    entries: BTreeMap<String, StatusEntry>,
}

impl StatusFile {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Read `path`, treating a missing file as an empty document (the first
    /// scan in a fresh `SWM_HOME` has nothing to load yet).
    pub fn load(path: &Utf8Path) -> Result<Self, SwmError> {
        match std::fs::read_to_string(path.as_std_path()) {
            Ok(content) => {
                let entries: BTreeMap<String, StatusEntry> = serde_yaml::from_str(&content)
                    .map_err(|e| SwmError::MalformedState(format!("status.yaml: {e}")))?;
                Ok(Self { entries })
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::new()),
            Err(e) => Err(SwmError::Io {
                path: path.as_std_path().to_owned(),
                source: e,
            }),
        }
    }

    pub fn set(&mut self, tracker_id: impl Into<String>, summary: StatusSummary) {
        self.entries.insert(tracker_id.into(), summary.into());
    }

    /// Drop every entry whose tracker id is no longer in the live set
    /// (spec.md §6: a tracker that has left the scan disappears from
    /// `status.yaml`, it isn't kept around stale).
    pub fn clean(&mut self, live_ids: &BTreeSet<String>) {
        self.entries.retain(|id, _| live_ids.contains(id));
    }

    #[must_use]
    pub fn get(&self, tracker_id: &str) -> Option<&StatusEntry> {
        self.entries.get(tracker_id)
    }

    /// Iterate every tracker id and its cached entry, in id order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &StatusEntry)> {
        self.entries.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn write(&self, path: &Utf8Path) -> Result<(), SwmError> {
        let yaml = serde_yaml::to_string(&self.entries)
            .map_err(|e| SwmError::MalformedState(format!("status.yaml serialize: {e}")))?;
        swm_utils::atomic_write::write_file_atomic(path, &yaml).map_err(SwmError::Other)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use tempfile::TempDir;

    fn summary(package: &str) -> StatusSummary {
        StatusSummary {
            cycle: Some("2026.01.01-1".to_string()),
            series: Some("focal".to_string()),
            package: package.to_string(),
            version: Some("5.4.0-42.46".to_string()),
            phase: Some("Packaging".to_string()),
            reason: None,
            master_bug: None,
            versions: BTreeMap::new(),
            promote_to_proposed: None,
        }
    }

    #[test]
    fn missing_file_loads_as_empty() {
        let dir = TempDir::new().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().join("status.yaml")).unwrap();
        let status = StatusFile::load(&path).unwrap();
        assert!(status.is_empty());
    }

    #[test]
    fn round_trips_through_write_and_load() {
        let dir = TempDir::new().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().join("status.yaml")).unwrap();
        let mut status = StatusFile::new();
        status.set("1000", summary("linux"));
        status.write(&path).unwrap();

        let reloaded = StatusFile::load(&path).unwrap();
        assert_eq!(reloaded.get("1000").unwrap().package, "linux");
    }

    #[test]
    fn clean_drops_entries_outside_the_live_set() {
        let mut status = StatusFile::new();
        status.set("1000", summary("linux"));
        status.set("1001", summary("linux-meta"));
        let live: BTreeSet<String> = ["1000".to_string()].into_iter().collect();
        status.clean(&live);
        assert_eq!(status.len(), 1);
        assert!(status.get("1001").is_none());
    }
}
