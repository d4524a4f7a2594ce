//! Version matching between a tracker's wanted kernel version and the
//! versions actually published for each package type (spec.md §4.3).

use swm_tracker::version::VersionInfo;

/// `lbm`/`meta`/`ports-meta` publish their own version numbers that only
/// share the `<kernel>.<abi>.`/`<kernel>-<abi>.` prefix with the main
/// package; every other package type (`main`, `signed`, `lrm`, `lrg`,
/// `lrs`) is expected to carry the exact same version string, modulo a
/// `+somethingN` rebuild suffix that doesn't affect identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchForm {
    AbiPrefix,
    Exact,
}

#[must_use]
pub fn match_form(pkg_type: &str) -> MatchForm {
    match pkg_type {
        "lbm" | "meta" | "ports-meta" => MatchForm::AbiPrefix,
        _ => MatchForm::Exact,
    }
}

/// Strip a trailing `+<rebuild-suffix>` for the purpose of exact-match
/// comparisons (e.g. `5.4.0-42.46+really42.45` still identifies `main`'s
/// `5.4.0-42.46`).
#[must_use]
fn strip_rebuild_suffix(version: &str) -> &str {
    version.split('+').next().unwrap_or(version)
}

/// Whether `candidate_version` (as seen published or built somewhere) is an
/// acceptable match for `pkg_type` given the tracker's wanted
/// `target_version` (ground: `package.py::package_version`'s per-type
/// lookup forms).
#[must_use]
pub fn version_matches(pkg_type: &str, target_version: &str, candidate_version: &str) -> bool {
    match match_form(pkg_type) {
        MatchForm::AbiPrefix => {
            let Some(target) = VersionInfo::parse(target_version) else {
                return false;
            };
            target
                .abi_prefixes()
                .iter()
                .any(|prefix| candidate_version.starts_with(prefix.as_str()))
        }
        MatchForm::Exact => {
            strip_rebuild_suffix(candidate_version) == strip_rebuild_suffix(target_version)
        }
    }
}

/// The newest of a set of Debian-style version strings, by the archive's
/// version ordering rather than lexical order.
#[must_use]
pub fn newest_version<'a>(versions: impl IntoIterator<Item = &'a str>) -> Option<&'a str> {
    versions
        .into_iter()
        .max_by(|a, b| deb_version::compare_versions(a, b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meta_matches_by_abi_prefix_not_full_version() {
        assert!(version_matches("meta", "5.4.0-42.46", "5.4.0.42.3"));
        assert!(version_matches("meta", "5.4.0-42.46", "5.4.0-42.3"));
        assert!(!version_matches("meta", "5.4.0-42.46", "5.4.0-43.1"));
    }

    #[test]
    fn ports_meta_uses_same_form_as_meta() {
        assert_eq!(match_form("ports-meta"), match_form("meta"));
    }

    #[test]
    fn main_requires_exact_version_ignoring_rebuild_suffix() {
        assert!(version_matches("main", "5.4.0-42.46", "5.4.0-42.46"));
        assert!(version_matches(
            "main",
            "5.4.0-42.46",
            "5.4.0-42.46+really5.4.0-42.45"
        ));
        assert!(!version_matches("main", "5.4.0-42.46", "5.4.0-42.47"));
    }

    #[test]
    fn signed_and_lrm_use_exact_form() {
        assert_eq!(match_form("signed"), MatchForm::Exact);
        assert_eq!(match_form("lrm"), MatchForm::Exact);
        assert_eq!(match_form("lrg"), MatchForm::Exact);
        assert_eq!(match_form("lrs"), MatchForm::Exact);
    }

    #[test]
    fn newest_version_picks_archive_order_not_lexical() {
        let newest = newest_version(["5.4.0-42.46", "5.4.0-9.10", "5.4.0-100.101"]);
        assert_eq!(newest, Some("5.4.0-100.101"));
    }
}
