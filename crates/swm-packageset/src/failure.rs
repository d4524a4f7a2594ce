//! Feeder-aware failure roll-up: a package that failed to build because its
//! feeder hasn't landed yet isn't a "real" failure, it's a wait. (spec.md
//! §4.3, ground: `package.py::delta_failures_in_pocket`/
//! `__feeder_completed`/`failures_to_text`.)

use std::collections::BTreeMap;

use chrono::Duration as ChronoDuration;

use crate::feeder::feeder_package_for;
use crate::package_build::PackageBuild;
use crate::state::PocketState;

/// How a single package's build failure should be reported after accounting
/// for its feeder chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureResolution {
    /// No failure to report.
    None,
    /// Genuinely failed: no feeder, or the feeder is itself long done and
    /// the package still failed.
    Real(PocketState),
    /// The immediate feeder hasn't fully built yet; this is a wait, not a
    /// failure. Reported as the `*wait` variant of the original state.
    WaitingOnFeeder,
    /// The feeder just finished within the retry window; treat this as
    /// transient and worth an automatic retry rather than a real failure.
    RetryWindow,
}

const RETRY_WINDOW_HOURS: i64 = 2;

/// Resolve every failing package in `builds` against the feeder chain.
/// `all_builds` must contain every package type touched by this pocket's
/// dependency graph (so a package's feeder can be looked up even if the
/// feeder itself isn't failing).
#[must_use]
pub fn delta_failures_in_pocket(
    builds: &BTreeMap<String, PackageBuild>,
    now: chrono::DateTime<chrono::Utc>,
) -> BTreeMap<String, FailureResolution> {
    let mut out = BTreeMap::new();
    for (pkg_type, pb) in builds {
        let state = pb.state();
        if !state.is_failure() {
            continue;
        }
        out.insert(pkg_type.clone(), resolve_one(builds, pkg_type, state, now));
    }
    out
}

fn resolve_one(
    builds: &BTreeMap<String, PackageBuild>,
    pkg_type: &str,
    state: PocketState,
    now: chrono::DateTime<chrono::Utc>,
) -> FailureResolution {
    let Some(feeder) = feeder_package_for(pkg_type) else {
        return FailureResolution::Real(state);
    };
    let Some(feeder_build) = builds.get(feeder) else {
        return FailureResolution::Real(state);
    };

    if !feeder_build.is_fully_built() {
        return FailureResolution::WaitingOnFeeder;
    }

    let feeder_done = feeder_build.date_available();
    let pkg_done = builds.get(pkg_type).and_then(PackageBuild::date_available);
    match (feeder_done, pkg_done) {
        (Some(feeder_done), Some(pkg_done)) => {
            let gap = (pkg_done - feeder_done).abs();
            if gap <= ChronoDuration::hours(RETRY_WINDOW_HOURS) {
                FailureResolution::RetryWindow
            } else {
                FailureResolution::Real(state)
            }
        }
        _ => FailureResolution::Real(state),
    }
}

/// Render a `failures_to_text`-style summary line: `"<pkg>: <abbrev>"` pairs
/// sorted by package type, joined with `", "`. `missing` packages
/// (`PocketState::Unknown`) are dropped from the summary if every package is
/// missing and `ignore_all_missing` is set (ground:
/// `package.py::failures_to_text`).
#[must_use]
pub fn failures_to_text(
    states: &BTreeMap<String, PocketState>,
    ignore_all_missing: bool,
) -> String {
    let all_missing = states.values().all(|s| *s == PocketState::Unknown);
    states
        .iter()
        .filter(|(_, s)| !(ignore_all_missing && all_missing && **s == PocketState::Unknown))
        .map(|(pkg, s)| format!("{pkg}: {}", s.abbrev()))
        .collect::<Vec<_>>()
        .join(", ")
}
