//! `Debs`: the package-set aggregator tying together every dependent
//! package type's builds across every pocket for one tracker (spec.md
//! §4.3, ground: `package.py::Package`).

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use swm_catalog::SourceData;

use crate::package_build::PackageBuild;
use crate::pocket::{self, PocketReadiness};
use crate::state::PocketState;

/// One tracker's whole package set: every dependent package type's build
/// record, keyed first by pocket then by package type. Populated once per
/// crank by the engine from `TrackerClient` queries (the aggregator itself
/// makes no network calls -- it is a pure view over already-fetched data,
/// mirroring the trait-plus-fake split used for the external clients).
#[derive(Debug, Clone, Default)]
pub struct Debs {
    /// pocket name -> package type -> build record.
    pockets: BTreeMap<String, BTreeMap<String, PackageBuild>>,
}

impl Debs {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, pocket: impl Into<String>, build: PackageBuild) {
        self.pockets
            .entry(pocket.into())
            .or_default()
            .insert(build.pkg_type().to_string(), build);
    }

    #[must_use]
    pub fn pocket(&self, pocket: &str) -> Option<&BTreeMap<String, PackageBuild>> {
        self.pockets.get(pocket)
    }

    #[must_use]
    pub fn package(&self, pocket: &str, pkg_type: &str) -> Option<&PackageBuild> {
        self.pockets.get(pocket)?.get(pkg_type)
    }

    #[must_use]
    pub fn state_in(&self, pocket: &str) -> PocketState {
        self.pocket(pocket)
            .map(pocket::combined_state)
            .unwrap_or(PocketState::Unknown)
    }

    #[must_use]
    pub fn all_built_and_in_pocket(&self, pocket: &str) -> bool {
        self.pocket(pocket)
            .is_some_and(pocket::all_built_and_in_pocket)
    }

    #[must_use]
    pub fn all_built_and_in_pocket_for(
        &self,
        pocket: &str,
        period: std::time::Duration,
        now: DateTime<Utc>,
    ) -> PocketReadiness {
        match self.pocket(pocket) {
            Some(builds) => pocket::all_built_and_in_pocket_for(builds, period, now),
            None => PocketReadiness::NotYetBuilt,
        }
    }

    /// Check that `pocket` is either empty of this package set or contains
    /// only versions that have already propagated on to one of
    /// `pockets_after` (spec.md §4.3's `pocket_clear(P, pockets_after)`,
    /// invariant #4's monotonicity requirement): for every package type
    /// with a record in `pocket`, it's clear if there's no build/publish
    /// record at all there (a null version), or if some later pocket in
    /// `pockets_after` (Debian-version-compared, via
    /// [`pocket::resolve_symbolic_pocket`] for the `Release/Updates`
    /// symbolic entry) carries the same version or newer, or if the type
    /// isn't even dependent in that later pocket (ground:
    /// `package.py::pocket_clear`). A workflow-valid duplicate tracker that
    /// has already cleared `pocket` overrides an otherwise-dirty result.
    #[must_use]
    pub fn pocket_clear(
        &self,
        pocket: &str,
        pockets_after: &[&str],
        development: bool,
        duplicate_already_clear: bool,
    ) -> bool {
        let resolved_after: Vec<String> = pockets_after
            .iter()
            .map(|p| pocket::resolve_symbolic_pocket(p, development))
            .collect();

        let mut clear = true;
        if let Some(builds) = self.pockets.get(pocket) {
            for (pkg_type, build) in builds {
                // No record at all here: version is null, trivially clear.
                if build.state() == PocketState::Unknown {
                    continue;
                }
                let version_here = build.version();

                let mut found = false;
                for pocket_next in &resolved_after {
                    let Some(next_map) = self.pockets.get(pocket_next) else {
                        // No data tracked for this later pocket at all;
                        // can't confirm propagation through it, try the
                        // next one.
                        continue;
                    };
                    match next_map.get(pkg_type) {
                        // Not dependent in this later pocket at all.
                        None => {
                            found = true;
                            break;
                        }
                        // Tracked but nothing there yet: null version,
                        // can't compare, keep looking.
                        Some(next_build) if next_build.state() == PocketState::Unknown => {}
                        Some(next_build) => {
                            if deb_version::compare_versions(version_here, next_build.version())
                                != std::cmp::Ordering::Greater
                            {
                                found = true;
                                break;
                            }
                        }
                    }
                }
                if !found {
                    clear = false;
                }
            }
        }

        clear || duplicate_already_clear
    }

    /// List of package types present (published or built) in `src` and not
    /// yet built in `dst` or any of `pockets_after_dst` (spec.md §4.3's
    /// `delta_src_dst`, ground: `package.py::delta_src_dst`, dropping the
    /// Python's extra `src == "ppa"` task-status special case, which needs
    /// bug/task context this pure package-set view doesn't carry).
    #[must_use]
    pub fn delta_src_dst(&self, src: &str, dst: &str, pockets_after_dst: &[&str]) -> Vec<String> {
        let Some(dst_types) = self.pockets.get(dst) else {
            return Vec::new();
        };

        let mut missing: Vec<String> = dst_types
            .keys()
            .filter(|pkg_type| {
                let in_src = self
                    .pockets
                    .get(src)
                    .and_then(|m| m.get(pkg_type.as_str()))
                    .is_some_and(|pb| pb.state() != PocketState::Unknown);
                let in_dst_or_later = self.built_in(dst, pkg_type)
                    || pockets_after_dst.iter().any(|p| self.built_in(p, pkg_type));
                in_src && !in_dst_or_later
            })
            .cloned()
            .collect();
        missing.sort();
        missing
    }

    fn built_in(&self, pocket: &str, pkg_type: &str) -> bool {
        self.pockets
            .get(pocket)
            .and_then(|m| m.get(pkg_type))
            .is_some_and(PackageBuild::is_fully_built)
    }

    /// Iterate every package type this set has any record for, across every
    /// pocket, in the order dependent types are normally walked: `main`
    /// first, then the rest alphabetically.
    #[must_use]
    pub fn package_types(&self) -> Vec<String> {
        let mut types: std::collections::BTreeSet<String> = self
            .pockets
            .values()
            .flat_map(BTreeMap::keys)
            .cloned()
            .collect();
        let mut ordered = Vec::with_capacity(types.len());
        if types.remove("main") {
            ordered.push("main".to_string());
        }
        ordered.extend(types);
        ordered
    }
}

/// Every package type a source declares, restricted to those dependent on
/// `main` transitively (used by the engine to know which types to fetch
/// build records for).
#[must_use]
pub fn dependent_package_types(source: &SourceData) -> Vec<&str> {
    source.packages.keys().map(String::as_str).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use swm_clients::{PublicationStatus, PublishedSource};

    fn fully_built(pkg: &str) -> PackageBuild {
        PackageBuild::new(
            pkg,
            "5.4.0-42.46",
            vec![PublishedSource {
                source_name: pkg.into(),
                version: "5.4.0-42.46".into(),
                status: PublicationStatus::Published,
                component: "main".into(),
                date_published: Some(Utc::now()),
                creator: None,
                signer: None,
                changes_file_url: None,
                self_link: "https://example/1".into(),
            }],
            vec![],
            vec![],
        )
    }

    /// Present in the pocket (so "null version" checks don't trivially
    /// pass) but not yet fully built.
    fn pending(pkg: &str) -> PackageBuild {
        PackageBuild::new(
            pkg,
            "5.4.0-42.46",
            vec![PublishedSource {
                source_name: pkg.into(),
                version: "5.4.0-42.46".into(),
                status: PublicationStatus::Pending,
                component: "main".into(),
                date_published: None,
                creator: None,
                signer: None,
                changes_file_url: None,
                self_link: "https://example/1".into(),
            }],
            vec![],
            vec![],
        )
    }

    #[test]
    fn all_built_and_in_pocket_true_once_every_package_lands() {
        let mut debs = Debs::new();
        debs.insert("Proposed", fully_built("main"));
        debs.insert("Proposed", fully_built("meta"));
        assert!(debs.all_built_and_in_pocket("Proposed"));
    }

    #[test]
    fn missing_pocket_is_never_all_built() {
        let debs = Debs::new();
        assert!(!debs.all_built_and_in_pocket("Proposed"));
    }

    #[test]
    fn delta_src_dst_is_empty_when_dst_has_no_packages_at_all() {
        let debs = Debs::new();
        assert!(debs.delta_src_dst("build", "Proposed", &[]).is_empty());
    }

    #[test]
    fn delta_src_dst_ignores_types_not_dependent_in_dst() {
        let mut debs = Debs::new();
        debs.insert("build", fully_built("main"));
        debs.insert("Proposed", fully_built("meta")); // only declares meta as dependent in Proposed
        assert!(debs.delta_src_dst("build", "Proposed", &[]).is_empty());
    }

    #[test]
    fn delta_src_dst_lists_types_stuck_in_src() {
        let mut debs = Debs::new();
        debs.insert("build", fully_built("main"));
        debs.insert("Proposed", pending("main"));
        assert_eq!(debs.delta_src_dst("build", "Proposed", &[]), vec!["main"]);
    }

    #[test]
    fn delta_src_dst_satisfied_once_built_in_a_later_pocket() {
        let mut debs = Debs::new();
        debs.insert("build", fully_built("main"));
        debs.insert("Proposed", pending("main"));
        debs.insert("Updates", fully_built("main"));
        assert!(debs.delta_src_dst("build", "Proposed", &["Updates"]).is_empty());
    }

    #[test]
    fn package_types_lists_main_first() {
        let mut debs = Debs::new();
        debs.insert("Proposed", fully_built("meta"));
        debs.insert("Proposed", fully_built("main"));
        assert_eq!(debs.package_types(), vec!["main", "meta"]);
    }

    #[test]
    fn pocket_clear_when_nothing_has_landed_there() {
        let debs = Debs::new();
        assert!(debs.pocket_clear("Proposed", &["Updates"], false, false));
    }

    #[test]
    fn pocket_clear_when_proposed_version_already_reached_updates() {
        let mut debs = Debs::new();
        debs.insert("Proposed", fully_built("main"));
        debs.insert("Updates", fully_built("main"));
        assert!(debs.pocket_clear("Proposed", &["Updates"], false, false));
    }

    #[test]
    fn pocket_clear_resolves_release_updates_symbol_by_development_flag() {
        let mut debs = Debs::new();
        debs.insert("Proposed", fully_built("main"));
        debs.insert("Release", fully_built("main"));
        assert!(debs.pocket_clear("Proposed", &["Release/Updates"], true, false));
        assert!(!debs.pocket_clear("Proposed", &["Release/Updates"], false, false));
    }

    #[test]
    fn pocket_clear_not_clear_when_nothing_later_has_it_yet() {
        let mut debs = Debs::new();
        debs.insert("Proposed", fully_built("main"));
        assert!(!debs.pocket_clear("Proposed", &["Updates"], false, false));
    }

    #[test]
    fn pocket_clear_duplicate_override_rescues_an_otherwise_dirty_pocket() {
        let mut debs = Debs::new();
        debs.insert("Proposed", fully_built("main"));
        assert!(debs.pocket_clear("Proposed", &["Updates"], false, true));
    }
}
