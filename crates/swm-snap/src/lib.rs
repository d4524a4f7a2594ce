//! Snap channel-map aggregation (spec.md §4.6, ground:
//! `original_source/stable/wfl/snap.py`): for each architecture the snap
//! builds for, group its channel map by `(track, risk)` and check that
//! every expected triple has published the version a tracker is waiting on.

use std::collections::BTreeMap;

use swm_clients::ChannelMapEntry;

/// One `(architecture, track, risk)` triple's published state.
#[derive(Debug, Clone)]
pub struct ChannelEntry {
    pub architecture: String,
    pub track: String,
    pub risk: String,
    pub revision: u64,
    pub version: String,
}

/// A snap's whole channel map, queried once per architecture and flattened
/// here with the architecture attached (the snap store's channel-map API is
/// itself per-snap-name, which typically maps 1:1 to an architecture-scoped
/// build; callers that build one snap per arch call `channel_map` once per
/// arch and feed all the results in here).
#[derive(Debug, Clone, Default)]
pub struct SnapChannelMap {
    entries: Vec<ChannelEntry>,
}

impl SnapChannelMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_architecture(&mut self, architecture: &str, entries: Vec<ChannelMapEntry>) {
        self.entries
            .extend(entries.into_iter().map(|e| ChannelEntry {
                architecture: architecture.to_string(),
                track: e.track,
                risk: e.risk,
                revision: e.revision,
                version: e.version,
            }));
    }

    #[must_use]
    pub fn entries(&self) -> &[ChannelEntry] {
        &self.entries
    }

    /// Group entries by `(track, risk)`, each mapping to the set of
    /// architectures that have published there and which revision/version
    /// each carries.
    #[must_use]
    fn grouped(&self) -> BTreeMap<(String, String), Vec<&ChannelEntry>> {
        let mut groups: BTreeMap<(String, String), Vec<&ChannelEntry>> = BTreeMap::new();
        for entry in &self.entries {
            groups
                .entry((entry.track.clone(), entry.risk.clone()))
                .or_default()
                .push(entry);
        }
        groups
    }

    /// Whether every expected `(track, risk)` combination has every expected
    /// architecture publishing the tracker's `wanted_version`, for the given
    /// `risk` (ground: `snap.py::is_in_tracks`: across every triple at this
    /// risk, every one must carry the *highest* revision seen for that
    /// track/arch pairing, tie-broken by the most recently released).
    #[must_use]
    pub fn is_in_tracks(
        &self,
        expected_tracks: &[String],
        expected_arches: &[String],
        risk: &str,
        wanted_version: &str,
    ) -> bool {
        let groups = self.grouped();
        expected_tracks.iter().all(|track| {
            let key = (track.clone(), risk.to_string());
            let Some(entries) = groups.get(&key) else {
                return false;
            };
            expected_arches.iter().all(|arch| {
                entries
                    .iter()
                    .any(|e| e.architecture == *arch && e.version == wanted_version)
            })
        })
    }

    /// For every `(track, risk)` group, report whether all architectures in
    /// it publish the same revision; returns the divergent groups (track,
    /// risk, and the set of distinct `(architecture, revision)` pairs seen),
    /// so handlers can fold that straight into a `Stalled` reason (ground:
    /// `snap.py::channel_revisions_consistent`, which reports the full
    /// divergence rather than a plain boolean).
    #[must_use]
    pub fn channel_revisions_consistent(&self) -> Vec<ChannelDivergence> {
        let mut out = Vec::new();
        for ((track, risk), entries) in self.grouped() {
            let mut revisions: Vec<(String, u64)> = entries
                .iter()
                .map(|e| (e.architecture.clone(), e.revision))
                .collect();
            revisions.sort();
            let distinct: std::collections::BTreeSet<u64> =
                revisions.iter().map(|(_, r)| *r).collect();
            if distinct.len() > 1 {
                out.push(ChannelDivergence {
                    track,
                    risk,
                    revisions,
                });
            }
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelDivergence {
    pub track: String,
    pub risk: String,
    pub revisions: Vec<(String, u64)>,
}

impl ChannelDivergence {
    #[must_use]
    pub fn describe(&self) -> String {
        let pairs = self
            .revisions
            .iter()
            .map(|(arch, rev)| format!("{arch}={rev}"))
            .collect::<Vec<_>>()
            .join(", ");
        format!("{}/{}: {}", self.track, self.risk, pairs)
    }
}
