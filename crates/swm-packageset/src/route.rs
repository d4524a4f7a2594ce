//! Route-table lookups and the component-correctness check (spec.md §4.3,
//! ground: `package.py::Package.__init__`'s routing construction and
//! `check_component_in_pocket`).

use swm_catalog::types::{RouteEntry, RoutingTable};

/// The archive route index (`build#1`, `build#2`, ...) used to label which
/// entry of a multi-route pocket a package actually landed in (spec.md
/// §4.3, ground: `package.py::Package`'s `build`/`build-private` naming --
/// the first route entry is the primary, non-private archive; a second
/// entry, if present, is the private/security-embargo archive).
#[must_use]
pub fn logical_build_pocket(entry_index: usize, adjunct_package: bool) -> &'static str {
    if entry_index == 0 && !adjunct_package {
        "build"
    } else {
        "build-private"
    }
}

/// The ordered archive route for a logical pocket name, or an empty slice if
/// this source has no route configured there (an unrouted pocket is
/// trivially "clear": there's nothing to build for it).
#[must_use]
pub fn route_for<'a>(routing: &'a RoutingTable, pocket: &str) -> &'a [RouteEntry] {
    routing.lookup_destination(pocket).unwrap_or(&[])
}

/// Whether `pocket` has any configured destination at all.
#[must_use]
pub fn is_routed(routing: &RoutingTable, pocket: &str) -> bool {
    !route_for(routing, pocket).is_empty()
}

/// The result of checking that a package's published component matches
/// expectations: `Some(true)` if it matches, `Some(false)` with the
/// mismatching components if it doesn't, `None` if there's nothing
/// published yet to check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComponentCheck {
    Match,
    Mismatch(Vec<String>),
    NothingPublished,
}

/// Linux-restricted-modules-family packages (`lrm`, `lrg`, `lrs`) publish
/// into `restricted` unless the main kernel itself lives in `multiverse`,
/// in which case they follow it there (ground: `package.py`'s lrm-family
/// component override, read from `kernel-series.yaml`'s per-source
/// `component` field, not hardcoded per package type).
#[must_use]
fn expected_component(pkg_type: &str, main_component: &str) -> &str {
    match pkg_type {
        "lrm" | "lrg" | "lrs" if main_component != "multiverse" => "restricted",
        _ => main_component,
    }
}

/// Check that every published component for `pkg_type` matches the expected
/// component for this source (ground: `package.py::check_component_in_pocket`).
#[must_use]
pub fn check_component_in_pocket(
    pkg_type: &str,
    main_component: &str,
    published_components: &[String],
) -> ComponentCheck {
    if published_components.is_empty() {
        return ComponentCheck::NothingPublished;
    }
    let expected = expected_component(pkg_type, main_component);
    let mismatches: Vec<String> = published_components
        .iter()
        .filter(|c| c.as_str() != expected)
        .cloned()
        .collect();
    if mismatches.is_empty() {
        ComponentCheck::Match
    } else {
        ComponentCheck::Mismatch(mismatches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lrm_family_expects_restricted_by_default() {
        assert_eq!(expected_component("lrm", "main"), "restricted");
        assert_eq!(expected_component("lrg", "universe"), "restricted");
    }

    #[test]
    fn lrm_family_follows_main_into_multiverse() {
        assert_eq!(expected_component("lrm", "multiverse"), "multiverse");
    }

    #[test]
    fn main_package_always_expects_its_own_component() {
        assert_eq!(expected_component("main", "universe"), "universe");
    }

    #[test]
    fn component_check_flags_mismatches() {
        let check = check_component_in_pocket("lrm", "main", &["universe".to_string()]);
        assert_eq!(check, ComponentCheck::Mismatch(vec!["universe".to_string()]));
    }

    #[test]
    fn component_check_matches_when_all_published_components_agree() {
        let check = check_component_in_pocket(
            "main",
            "universe",
            &["universe".to_string(), "universe".to_string()],
        );
        assert_eq!(check, ComponentCheck::Match);
    }

    #[test]
    fn component_check_reports_nothing_published() {
        assert_eq!(
            check_component_in_pocket("main", "universe", &[]),
            ComponentCheck::NothingPublished
        );
    }
}
