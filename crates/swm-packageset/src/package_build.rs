//! `PackageBuild`: one package type's fetched publication/build records in
//! one pocket, and the state/readiness/retry computations derived from them
//! (spec.md §4.3, ground: `package.py`'s `PackageBuild` class).

use chrono::{DateTime, Utc};

use swm_clients::{Build, BuildState, PublicationStatus, PublishedBinary, PublishedSource};

use crate::state::PocketState;

/// A build eligible for, or already undergoing, a retry (ground:
/// `package.py::attempt_retry`/`attempt_retry_logless`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Nothing to do: no failed build here.
    NoFailure,
    /// A failed build with no log (builder never ran it) is retried
    /// unconditionally, with no manual annotation.
    RetryLogless { build_self_link: String },
    /// A failed build is already back in a pending/active state (someone or
    /// something else retried it); no action needed.
    AlreadyRetried,
    /// A failed build cannot be retried automatically; record
    /// `manual-retry: true` in the tracker's maintenance properties so a
    /// human knows to intervene.
    NeedsManualRetryFlag { build_self_link: String },
}

fn build_to_pocket_state(build: &Build) -> PocketState {
    match build.buildstate {
        BuildState::NeedsBuilding | BuildState::CurrentlyBuilding | BuildState::UploadingBuild => {
            PocketState::Building
        }
        BuildState::SuccessfullyBuilt => PocketState::FullyBuiltPending,
        BuildState::FailedToBuild | BuildState::ChrootProblem => PocketState::FailedToBuild,
        BuildState::DependencyWait => PocketState::DepWait,
        BuildState::Other => PocketState::Unknown,
    }
}

/// One package type's records (matched published sources, binaries, and
/// builds) for a single version in a single pocket. Callers build one of
/// these per `(pkg_type, pocket)` pair per scan; the cost of the underlying
/// tracker queries is the caller's concern (`swm-engine` memoizes them for
/// the lifetime of a crank, mirroring the Python's attribute-cache-on-first-
/// access pattern).
#[derive(Debug, Clone)]
pub struct PackageBuild {
    pkg_type: String,
    version: String,
    published: Vec<PublishedSource>,
    binaries: Vec<PublishedBinary>,
    builds: Vec<Build>,
}

impl PackageBuild {
    #[must_use]
    pub fn new(
        pkg_type: impl Into<String>,
        version: impl Into<String>,
        published: Vec<PublishedSource>,
        binaries: Vec<PublishedBinary>,
        builds: Vec<Build>,
    ) -> Self {
        Self {
            pkg_type: pkg_type.into(),
            version: version.into(),
            published,
            binaries,
            builds,
        }
    }

    #[must_use]
    pub fn pkg_type(&self) -> &str {
        &self.pkg_type
    }

    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    #[must_use]
    pub fn builds(&self) -> &[Build] {
        &self.builds
    }

    /// A source counts as published once at least one publication record
    /// reached `Published` (not merely `Pending`).
    #[must_use]
    fn source_published(&self) -> bool {
        self.published
            .iter()
            .any(|p| p.status == PublicationStatus::Published)
    }

    /// At least one binary has actually landed in the pocket for every
    /// architecture the builds cover -- used to distinguish "built, not yet
    /// published" from "built and published".
    #[must_use]
    fn binaries_published(&self) -> bool {
        !self.binaries.is_empty()
            && self
                .binaries
                .iter()
                .all(|b| b.status == PublicationStatus::Published)
    }

    /// This package's aggregate state in this pocket (ground:
    /// `package.py::PackageBuild.__is_fully_built`/`__find_matches`,
    /// `state.rs`'s severity combine).
    #[must_use]
    pub fn state(&self) -> PocketState {
        if self.builds.is_empty() && self.published.is_empty() {
            return PocketState::Unknown;
        }

        let build_state = PocketState::combine_all(self.builds.iter().map(build_to_pocket_state));

        if build_state == PocketState::FullyBuiltPending {
            return if self.source_published() && self.binaries_published() {
                PocketState::FullyBuilt
            } else {
                PocketState::FullyBuiltPending
            };
        }
        if build_state != PocketState::Unknown {
            return build_state;
        }

        // No build records at all (e.g. a pure-publication pocket like
        // Security that only republishes binaries already built elsewhere):
        // trust the publication record alone.
        if self.source_published() {
            PocketState::FullyBuilt
        } else if !self.published.is_empty() {
            PocketState::Pending
        } else {
            PocketState::Unknown
        }
    }

    #[must_use]
    pub fn is_fully_built(&self) -> bool {
        self.state().is_fully_built()
    }

    /// The moment this package's artifacts became available in the pocket:
    /// the later of its publication date and its most recent build's
    /// completion (ground: `package.py::all_built_and_in_pocket_for`'s
    /// `date_available`).
    #[must_use]
    pub fn date_available(&self) -> Option<DateTime<Utc>> {
        let published = self.published.iter().filter_map(|p| p.date_published).max();
        let built = self.builds.iter().filter_map(|b| b.datebuilt).max();
        match (published, built) {
            (Some(p), Some(b)) => Some(p.max(b)),
            (Some(p), None) => Some(p),
            (None, Some(b)) => Some(b),
            (None, None) => None,
        }
    }

    /// What, if anything, should be done about a failed build here (ground:
    /// `package.py::attempt_retry_logless`/`attempt_retry`).
    #[must_use]
    pub fn retry_decision(&self) -> RetryDecision {
        let Some(failed) = self
            .builds
            .iter()
            .find(|b| b.buildstate == BuildState::FailedToBuild)
        else {
            return RetryDecision::NoFailure;
        };

        if failed.log_url.is_none() {
            return RetryDecision::RetryLogless {
                build_self_link: failed.self_link.clone(),
            };
        }

        let already_active = self.builds.iter().any(|b| {
            b.self_link == failed.self_link
                && matches!(
                    b.buildstate,
                    BuildState::NeedsBuilding
                        | BuildState::CurrentlyBuilding
                        | BuildState::UploadingBuild
                )
        });
        if already_active {
            return RetryDecision::AlreadyRetried;
        }

        if failed.can_be_retried {
            RetryDecision::RetryLogless {
                build_self_link: failed.self_link.clone(),
            }
        } else {
            RetryDecision::NeedsManualRetryFlag {
                build_self_link: failed.self_link.clone(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn source(status: PublicationStatus, date: Option<DateTime<Utc>>) -> PublishedSource {
        PublishedSource {
            source_name: "linux".into(),
            version: "5.4.0-42.46".into(),
            status,
            component: "main".into(),
            date_published: date,
            creator: None,
            signer: None,
            changes_file_url: None,
            self_link: "https://example/source/1".into(),
        }
    }

    fn build(state: BuildState, log_url: Option<&str>, can_retry: bool) -> Build {
        Build {
            self_link: "https://example/build/1".into(),
            arch_tag: "amd64".into(),
            buildstate: state,
            datebuilt: None,
            can_be_retried: can_retry,
            log_url: log_url.map(str::to_string),
        }
    }

    #[test]
    fn empty_records_are_unknown() {
        let pb = PackageBuild::new("main", "5.4.0-42.46", vec![], vec![], vec![]);
        assert_eq!(pb.state(), PocketState::Unknown);
    }

    #[test]
    fn published_source_with_no_build_record_is_fully_built() {
        let pb = PackageBuild::new(
            "main",
            "5.4.0-42.46",
            vec![source(PublicationStatus::Published, Some(Utc::now()))],
            vec![],
            vec![],
        );
        assert!(pb.is_fully_built());
    }

    #[test]
    fn failed_build_dominates_state() {
        let pb = PackageBuild::new(
            "main",
            "5.4.0-42.46",
            vec![],
            vec![],
            vec![build(BuildState::FailedToBuild, Some("http://log"), true)],
        );
        assert_eq!(pb.state(), PocketState::FailedToBuild);
    }

    #[test]
    fn logless_failure_is_retried_unconditionally() {
        let pb = PackageBuild::new(
            "main",
            "5.4.0-42.46",
            vec![],
            vec![],
            vec![build(BuildState::FailedToBuild, None, true)],
        );
        assert_eq!(
            pb.retry_decision(),
            RetryDecision::RetryLogless {
                build_self_link: "https://example/build/1".into()
            }
        );
    }

    #[test]
    fn non_retriable_failure_needs_manual_flag() {
        let pb = PackageBuild::new(
            "main",
            "5.4.0-42.46",
            vec![],
            vec![],
            vec![build(BuildState::FailedToBuild, Some("http://log"), false)],
        );
        assert_eq!(
            pb.retry_decision(),
            RetryDecision::NeedsManualRetryFlag {
                build_self_link: "https://example/build/1".into()
            }
        );
    }

    #[test]
    fn date_available_is_the_later_of_publish_and_build() {
        let published = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let mut b = build(BuildState::SuccessfullyBuilt, None, false);
        b.datebuilt = Some(Utc.with_ymd_and_hms(2026, 1, 2, 0, 0, 0).unwrap());
        let pb = PackageBuild::new(
            "main",
            "5.4.0-42.46",
            vec![source(PublicationStatus::Published, Some(published))],
            vec![],
            vec![b],
        );
        assert_eq!(
            pb.date_available(),
            Some(Utc.with_ymd_and_hms(2026, 1, 2, 0, 0, 0).unwrap())
        );
    }
}
