//! Pocket-level predicates that fold several packages' `PackageBuild`
//! records together: "is everything built and in this pocket", readiness
//! windows for testing/security, and the symbolic `Release`/`Updates`
//! pocket name resolution (spec.md §4.3, ground: `package.py`'s
//! `all_built_and_in_pocket*`/`pocket_clear`/`ready_for_*` family).

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::package_build::PackageBuild;
use crate::state::PocketState;

/// The result of checking whether a whole package set has settled in a
/// pocket for at least `period`: either it's ready now, or it isn't yet and
/// the caller should come back at `refresh_at` (ground:
/// `package.py::all_built_and_in_pocket_for`'s `refresh_at` scheduling).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PocketReadiness {
    Ready,
    NotYetBuilt,
    /// Built, but not for long enough yet; come back at this time.
    WaitingOut { refresh_at: DateTime<Utc> },
}

/// Combine every package's state in a pocket into one severity-ordered
/// overall state.
#[must_use]
pub fn combined_state(builds: &BTreeMap<String, PackageBuild>) -> PocketState {
    PocketState::combine_all(builds.values().map(PackageBuild::state))
}

#[must_use]
pub fn all_built_and_in_pocket(builds: &BTreeMap<String, PackageBuild>) -> bool {
    !builds.is_empty() && builds.values().all(PackageBuild::is_fully_built)
}

/// Whether every package in the set has been sitting fully built in the
/// pocket for at least `period` as of `now`.
#[must_use]
pub fn all_built_and_in_pocket_for(
    builds: &BTreeMap<String, PackageBuild>,
    period: Duration,
    now: DateTime<Utc>,
) -> PocketReadiness {
    if !all_built_and_in_pocket(builds) {
        return PocketReadiness::NotYetBuilt;
    }
    let Some(date_available) = builds.values().filter_map(PackageBuild::date_available).max()
    else {
        return PocketReadiness::NotYetBuilt;
    };
    let period = chrono::Duration::from_std(period).unwrap_or(chrono::Duration::zero());
    let refresh_at = date_available + period;
    if refresh_at <= now {
        PocketReadiness::Ready
    } else {
        PocketReadiness::WaitingOut { refresh_at }
    }
}

/// `ready_for_testing`: a 1h settle delay on the primary archive route, 0h
/// on a PPA route (ground: `package.py::ready_for_testing`).
#[must_use]
pub fn ready_for_testing(
    builds: &BTreeMap<String, PackageBuild>,
    is_primary_archive_route: bool,
    now: DateTime<Utc>,
) -> PocketReadiness {
    let delay = if is_primary_archive_route {
        Duration::from_secs(3600)
    } else {
        Duration::ZERO
    };
    all_built_and_in_pocket_for(builds, delay, now)
}

/// `ready_for_security`: either already clear in Security, or clear in
/// Updates for at least 4 hours (ground: `package.py::ready_for_security`).
#[must_use]
pub fn ready_for_security(
    security_builds: &BTreeMap<String, PackageBuild>,
    updates_builds: &BTreeMap<String, PackageBuild>,
    now: DateTime<Utc>,
) -> bool {
    all_built_and_in_pocket(security_builds)
        || matches!(
            all_built_and_in_pocket_for(updates_builds, Duration::from_secs(4 * 3600), now),
            PocketReadiness::Ready
        )
}

/// Resolve the symbolic `Release/Updates` pocket name used in routing
/// tables: `Release` for the development series, `Updates` otherwise
/// (ground: `package.py::pocket_clear`).
#[must_use]
pub fn resolve_symbolic_pocket(pocket: &str, development: bool) -> String {
    if pocket == "Release/Updates" {
        if development { "Release" } else { "Updates" }.to_string()
    } else {
        pocket.to_string()
    }
}

/// Canonical pipeline order a package set's pockets are scanned in; only
/// the tail differs between a stable series (which settles in `Security`/
/// `Updates`) and a development series (which settles in `Release`) (ground:
/// `package.py`'s `scan_pockets`).
const SCAN_POCKETS_STABLE: &[&str] = &["build", "Signing", "Proposed", "as-proposed", "Security", "Updates"];
const SCAN_POCKETS_DEVELOPMENT: &[&str] = &["build", "Signing", "Proposed", "as-proposed", "Release"];

#[must_use]
pub fn scan_pockets(development: bool) -> &'static [&'static str] {
    if development {
        SCAN_POCKETS_DEVELOPMENT
    } else {
        SCAN_POCKETS_STABLE
    }
}

/// Every pocket from `pocket` onward in the pipeline, `pocket` included
/// (ground: `package.py::__pockets_from`). A `pocket` outside the known
/// sequence (e.g. a PPA-only route) scans just itself.
#[must_use]
pub fn pockets_from(pocket: &str, development: bool) -> Vec<String> {
    let seq = scan_pockets(development);
    match seq.iter().position(|p| *p == pocket) {
        Some(idx) => seq[idx..].iter().map(|s| (*s).to_string()).collect(),
        None => vec![pocket.to_string()],
    }
}

/// Every pocket strictly after `pocket` in the pipeline (ground:
/// `package.py::pocket_after`, generalized to the whole tail rather than
/// just the next pocket -- the `pockets_after` argument `pocket_clear`'s
/// callers pass in).
#[must_use]
pub fn pockets_after(pocket: &str, development: bool) -> Vec<String> {
    let mut after = pockets_from(pocket, development);
    if !after.is_empty() {
        after.remove(0);
    }
    after
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use swm_clients::{PublicationStatus, PublishedSource};

    fn built_package(published_at: DateTime<Utc>) -> PackageBuild {
        PackageBuild::new(
            "main",
            "5.4.0-42.46",
            vec![PublishedSource {
                source_name: "linux".into(),
                version: "5.4.0-42.46".into(),
                status: PublicationStatus::Published,
                component: "main".into(),
                date_published: Some(published_at),
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
    fn symbolic_release_updates_resolves_by_development_flag() {
        assert_eq!(resolve_symbolic_pocket("Release/Updates", true), "Release");
        assert_eq!(
            resolve_symbolic_pocket("Release/Updates", false),
            "Updates"
        );
        assert_eq!(resolve_symbolic_pocket("Proposed", false), "Proposed");
    }

    #[test]
    fn all_built_and_in_pocket_for_waits_out_the_settle_period() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 2, 0, 0).unwrap();
        let published = Utc.with_ymd_and_hms(2026, 1, 1, 1, 0, 0).unwrap();
        let mut builds = BTreeMap::new();
        builds.insert("main".to_string(), built_package(published));

        let readiness = all_built_and_in_pocket_for(&builds, Duration::from_secs(3600 * 2), now);
        assert_eq!(
            readiness,
            PocketReadiness::WaitingOut {
                refresh_at: Utc.with_ymd_and_hms(2026, 1, 1, 3, 0, 0).unwrap()
            }
        );
    }

    #[test]
    fn all_built_and_in_pocket_for_is_ready_once_period_elapses() {
        let published = Utc.with_ymd_and_hms(2026, 1, 1, 1, 0, 0).unwrap();
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 3, 0, 0).unwrap();
        let mut builds = BTreeMap::new();
        builds.insert("main".to_string(), built_package(published));

        assert_eq!(
            all_built_and_in_pocket_for(&builds, Duration::from_secs(3600), now),
            PocketReadiness::Ready
        );
    }

    #[test]
    fn empty_package_set_is_never_all_built() {
        assert!(!all_built_and_in_pocket(&BTreeMap::new()));
    }

    #[test]
    fn pockets_after_proposed_is_the_rest_of_the_stable_pipeline() {
        assert_eq!(
            pockets_after("Proposed", false),
            vec!["as-proposed", "Security", "Updates"]
        );
    }

    #[test]
    fn pockets_after_proposed_ends_in_release_for_development_series() {
        assert_eq!(pockets_after("Proposed", true), vec!["as-proposed", "Release"]);
    }

    #[test]
    fn pockets_after_the_last_pocket_is_empty() {
        assert!(pockets_after("Updates", false).is_empty());
    }

    #[test]
    fn pockets_after_unknown_pocket_is_empty() {
        assert!(pockets_after("ppa", false).is_empty());
    }
}
