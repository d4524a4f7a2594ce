//! Package-set aggregator (spec.md §4.3): per-pocket build state, version
//! matching between a tracker's wanted kernel version and each dependent
//! package type's published version, the feeder relation used to decide
//! whose failures block whom, retry policy, and the pocket-level
//! readiness/clearance predicates the task handlers drive off of.

pub mod debs;
pub mod failure;
pub mod feeder;
pub mod package_build;
pub mod pocket;
pub mod route;
pub mod state;
pub mod version_match;

pub use debs::Debs;
pub use failure::{delta_failures_in_pocket, failures_to_text, FailureResolution};
pub use feeder::{ancillary_package_for, feeder_chain, feeder_key, feeder_package_for, signing_package_for};
pub use package_build::{PackageBuild, RetryDecision};
pub use pocket::{
    all_built_and_in_pocket, all_built_and_in_pocket_for, pockets_after, ready_for_security,
    ready_for_testing, PocketReadiness,
};
pub use route::{check_component_in_pocket, is_routed, route_for, ComponentCheck};
pub use state::PocketState;
pub use version_match::{match_form, newest_version, version_matches, MatchForm};
