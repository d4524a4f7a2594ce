//! Typed tree mirroring `kernel-series.yaml`: series -> sources -> packages,
//! routing, snaps, testable flavours. Deserialized once at daemon start and
//! treated as read-only for the lifetime of a scan.

use serde::Deserialize;
use std::collections::BTreeMap;

/// Top-level document: series codename -> series definition.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct KernelSeriesData {
    #[serde(flatten)]
    pub series: BTreeMap<String, SeriesData>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "kebab-case", default)]
pub struct SeriesData {
    /// True for the current development release (affects phase-property
    /// naming and which tasks apply, e.g. `promote-to-release`).
    pub development: bool,
    /// False once a series has reached end-of-life; inactive trackers in
    /// an unsupported series are still loadable but never created anew.
    pub supported: bool,
    /// True for series under Extended Security Maintenance.
    pub esm: bool,
    pub sources: BTreeMap<String, SourceData>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "kebab-case", default)]
pub struct SourceData {
    /// `type -> source package name`, e.g. `main -> linux`, `meta ->
    /// linux-meta`, `signed -> linux-signed`.
    pub packages: BTreeMap<String, String>,
    pub snaps: Vec<SnapData>,
    pub routing: RoutingTable,
    pub testable_flavours: Vec<TestableFlavour>,
    /// `(series, source)` this source derives from, for derivative/backport
    /// trackers that have no `kernel-stable-master-bug` property yet.
    pub derived_from: Option<DerivedFrom>,
    /// Component the primary (`main`) package publishes into: `main`,
    /// `restricted`, `universe`, `multiverse`.
    pub component: Option<String>,
    /// If true, `prepare-package` additionally requires the master
    /// tracker's `promote-to-proposed` to be `Fix Released` before this
    /// tracker may leave `New` (spec.md §4.4).
    pub need_master_in_proposed: bool,
    /// Git repository URL consulted by the tag-existence probe (§6).
    pub repo: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DerivedFrom {
    pub series: String,
    pub source: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RoutingTable {
    /// Logical pocket name (`build`, `build-private`, `Signing`,
    /// `Proposed`, `as-proposed`, `Updates`, `Security`, `Release`) ->
    /// ordered list of `(archive-reference, upstream-pocket)`.
    #[serde(flatten)]
    pub pockets: BTreeMap<String, Vec<RouteEntry>>,
}

impl RoutingTable {
    /// The ordered route for a logical pocket, or `None` if unrouted.
    #[must_use]
    pub fn lookup_destination(&self, pocket: &str) -> Option<&[RouteEntry]> {
        self.pockets.get(pocket).map(Vec::as_slice)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RouteEntry {
    pub archive: String,
    pub pocket: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TestableFlavour {
    pub flavour: String,
    #[serde(default)]
    pub arches: Vec<String>,
    #[serde(default)]
    pub meta_pkg: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SnapData {
    pub name: String,
    #[serde(default)]
    pub tracks: Vec<String>,
    #[serde(default)]
    pub arches: Vec<String>,
    #[serde(default)]
    pub repo: Option<String>,
}
