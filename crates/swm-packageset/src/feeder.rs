//! The feeder relation between package types: which package's build failure
//! should be blamed on (and wait for) another package's build, and which
//! package a derived one's version/signing is copied from (spec.md §3,
//! ground: `package.py::feeder_package_for`/`ancillary_package_for`/
//! `signing_package_for`, supplemented per `SPEC_FULL.md` §3 for
//! `ports-meta`).

/// `pkg_type`'s feeder: the package whose pocket occupancy `pkg_type`
/// depends on. `signed`, `lrm`, `meta`, and `ports-meta` all feed from
/// `main`; `lrg` feeds from `lrm`; `lrs` feeds from `lrg`. `main` itself,
/// and `lbm`, have no feeder.
#[must_use]
pub fn feeder_package_for(pkg_type: &str) -> Option<&'static str> {
    match pkg_type {
        "signed" | "lrm" | "meta" | "ports-meta" => Some("main"),
        "lrg" => Some("lrm"),
        "lrs" => Some("lrg"),
        _ => None,
    }
}

/// The package whose build artifacts `pkg_type` is an ancillary
/// (non-source-producing) companion of, for the purposes of finding its
/// binaries: `lrg`/`lrs` are published alongside `lrm`.
#[must_use]
pub fn ancillary_package_for(pkg_type: &str) -> Option<&'static str> {
    match pkg_type {
        "lrg" | "lrs" => Some("lrm"),
        _ => None,
    }
}

/// The package whose signing key/state `pkg_type` shares: `lrs` signs
/// alongside `lrm`, `signed` alongside `main`.
#[must_use]
pub fn signing_package_for(pkg_type: &str) -> Option<&'static str> {
    match pkg_type {
        "lrs" => Some("lrm"),
        "signed" => Some("main"),
        _ => None,
    }
}

/// A stable cache/ordering key for a feeder-chain walk: `(pkg_type,
/// pocket)` joined with a separator that can't appear in either component.
#[must_use]
pub fn feeder_key(pkg_type: &str, pocket: &str) -> String {
    format!("{pkg_type}\u{1}{pocket}")
}

/// Walk the feeder chain starting at `pkg_type`, yielding each ancestor in
/// order (`signed -> main`, `lrs -> lrg -> lrm -> main`, ...).
pub fn feeder_chain(pkg_type: &str) -> impl Iterator<Item = &'static str> {
    std::iter::successors(feeder_package_for(pkg_type), |p| feeder_package_for(p))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signed_lrm_meta_and_ports_meta_all_feed_from_main() {
        assert_eq!(feeder_package_for("signed"), Some("main"));
        assert_eq!(feeder_package_for("lrm"), Some("main"));
        assert_eq!(feeder_package_for("meta"), Some("main"));
        assert_eq!(feeder_package_for("ports-meta"), Some("main"));
    }

    #[test]
    fn lrg_feeds_from_lrm_and_lrs_feeds_from_lrg() {
        assert_eq!(feeder_package_for("lrg"), Some("lrm"));
        assert_eq!(feeder_package_for("lrs"), Some("lrg"));
    }

    #[test]
    fn main_and_lbm_have_no_feeder() {
        assert_eq!(feeder_package_for("main"), None);
        assert_eq!(feeder_package_for("lbm"), None);
    }

    #[test]
    fn feeder_chain_from_lrs_walks_all_the_way_to_main() {
        let chain: Vec<_> = feeder_chain("lrs").collect();
        assert_eq!(chain, vec!["lrg", "lrm", "main"]);
    }

    #[test]
    fn feeder_key_distinguishes_pocket() {
        assert_ne!(feeder_key("main", "Proposed"), feeder_key("main", "Updates"));
    }
}
