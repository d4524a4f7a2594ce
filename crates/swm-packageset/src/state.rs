//! Per-pocket build state and its severity-ordered combine (spec.md §4.3).

use std::fmt;

/// Aggregate build state for a package in a pocket, after folding together
/// every build and publication record observed there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PocketState {
    /// Fully built and published; nothing outstanding.
    FullyBuilt,
    /// Published or built but a newer upload is still in flight behind it.
    FullyBuiltPending,
    /// Waiting on an upload, publication, or build to start.
    Pending,
    /// A build is running.
    Building,
    /// A build is blocked on a dependency.
    DepWait,
    /// A build failed.
    FailedToBuild,
    /// No record at all was found for this package in this pocket.
    Unknown,
}

impl PocketState {
    /// Severity rank used to combine states across several packages sharing
    /// a pocket: the worst state wins (spec.md §4.3, `package.py`'s ordering
    /// `FAILEDTOBUILD > DEPWAIT > BUILDING > FULLYBUILT_PENDING > PENDING >
    /// FULLYBUILT > UNKNOWN`).
    #[must_use]
    fn severity(self) -> u8 {
        match self {
            PocketState::FailedToBuild => 6,
            PocketState::DepWait => 5,
            PocketState::Building => 4,
            PocketState::FullyBuiltPending => 3,
            PocketState::Pending => 2,
            PocketState::FullyBuilt => 1,
            PocketState::Unknown => 0,
        }
    }

    /// Fold two states together, keeping the most severe one. Associative
    /// and commutative, so a whole package set can be combined with `fold`
    /// in any order (spec.md §8).
    #[must_use]
    pub fn combine(self, other: PocketState) -> PocketState {
        if other.severity() > self.severity() {
            other
        } else {
            self
        }
    }

    #[must_use]
    pub fn combine_all(states: impl IntoIterator<Item = PocketState>) -> PocketState {
        states
            .into_iter()
            .fold(PocketState::Unknown, PocketState::combine)
    }

    #[must_use]
    pub fn is_fully_built(self) -> bool {
        matches!(self, PocketState::FullyBuilt)
    }

    #[must_use]
    pub fn is_failure(self) -> bool {
        matches!(self, PocketState::FailedToBuild | PocketState::DepWait)
    }

    /// The one-letter-ish abbreviation used in failure-summary text (ground:
    /// `package.py::failures_to_text`'s state abbreviation map).
    #[must_use]
    pub fn abbrev(self) -> &'static str {
        match self {
            PocketState::FailedToBuild => "FTBFS",
            PocketState::DepWait => "depwait",
            PocketState::Building => "building",
            PocketState::FullyBuiltPending => "pending-upload",
            PocketState::Pending => "pending",
            PocketState::FullyBuilt => "built",
            PocketState::Unknown => "missing",
        }
    }
}

impl fmt::Display for PocketState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.abbrev())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_to_build_dominates_every_other_state() {
        for other in [
            PocketState::DepWait,
            PocketState::Building,
            PocketState::FullyBuiltPending,
            PocketState::Pending,
            PocketState::FullyBuilt,
            PocketState::Unknown,
        ] {
            assert_eq!(
                PocketState::FailedToBuild.combine(other),
                PocketState::FailedToBuild
            );
            assert_eq!(
                other.combine(PocketState::FailedToBuild),
                PocketState::FailedToBuild
            );
        }
    }

    #[test]
    fn combine_is_commutative_and_associative_over_samples() {
        let samples = [
            PocketState::FailedToBuild,
            PocketState::DepWait,
            PocketState::Building,
            PocketState::FullyBuiltPending,
            PocketState::Pending,
            PocketState::FullyBuilt,
            PocketState::Unknown,
        ];
        for a in samples {
            for b in samples {
                assert_eq!(a.combine(b), b.combine(a), "commutative: {a:?} {b:?}");
                for c in samples {
                    assert_eq!(
                        a.combine(b).combine(c),
                        a.combine(b.combine(c)),
                        "associative: {a:?} {b:?} {c:?}"
                    );
                }
            }
        }
    }

    #[test]
    fn unknown_is_the_identity() {
        for s in [
            PocketState::FailedToBuild,
            PocketState::DepWait,
            PocketState::Building,
            PocketState::FullyBuiltPending,
            PocketState::Pending,
            PocketState::FullyBuilt,
        ] {
            assert_eq!(s.combine(PocketState::Unknown), s);
            assert_eq!(PocketState::Unknown.combine(s), s);
        }
    }

    #[test]
    fn combine_all_empty_is_unknown() {
        assert_eq!(PocketState::combine_all([]), PocketState::Unknown);
    }
}
