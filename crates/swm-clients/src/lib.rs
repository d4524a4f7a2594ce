//! Trait-based external clients for the tracker (Launchpad-shaped), the
//! snap store, and the git-tag-existence probe (spec.md §6). Each trait has
//! a `reqwest`-backed production implementation and an in-memory fake used
//! throughout the engine/tasks test suites.

pub mod git_tag;
pub mod snap_client;
pub mod tracker_client;
pub mod types;

pub use git_tag::{FakeGitTagChecker, GitTagChecker, HttpGitTagChecker};
pub use snap_client::{ChannelMapEntry, FakeSnapStoreClient, HttpSnapStoreClient, SnapStoreClient};
pub use tracker_client::{FakeTrackerClient, HttpTrackerClient, TrackerClient};
pub use types::*;
