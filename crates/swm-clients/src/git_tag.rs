//! `GitTagChecker`: the third external interface (spec.md §6). Some
//! `prepare-package` gates require a specific upload tag to exist in the
//! kernel's git tree before the task can proceed; this is checked via the
//! remote `git ls-remote`-shaped listing rather than a local clone.

use std::collections::BTreeSet;
use std::sync::Mutex;

use reqwest::blocking::Client;
use swm_utils::error::TrackerError;

pub trait GitTagChecker: Send + Sync {
    /// True if `tag` exists in the repository at `repo_url`.
    fn tag_exists(&self, repo_url: &str, tag: &str) -> Result<bool, TrackerError>;
}

/// Queries a git-tag listing service (a thin HTTP facade over
/// `git ls-remote --tags`) rather than shelling out, keeping this crate
/// free of a `git` binary dependency.
pub struct HttpGitTagChecker {
    service_base_url: String,
    http: Client,
}

impl HttpGitTagChecker {
    #[must_use]
    pub fn new(service_base_url: impl Into<String>, timeout: std::time::Duration) -> Self {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent("swm/1.0")
            .build()
            .expect("reqwest client builder with static config never fails");
        Self {
            service_base_url: service_base_url.into(),
            http,
        }
    }
}

impl GitTagChecker for HttpGitTagChecker {
    fn tag_exists(&self, repo_url: &str, tag: &str) -> Result<bool, TrackerError> {
        let url = format!(
            "{}/tags?repo={}&tag={}",
            self.service_base_url.trim_end_matches('/'),
            urlencoding::encode(repo_url),
            urlencoding::encode(tag)
        );
        let resp = self
            .http
            .get(&url)
            .send()
            .map_err(|e| TrackerError::Request(e.to_string()))?;
        match resp.status() {
            reqwest::StatusCode::OK => Ok(true),
            reqwest::StatusCode::NOT_FOUND => Ok(false),
            status => Err(TrackerError::Request(format!("GET {url} -> {status}"))),
        }
    }
}

/// In-memory fake backed by a fixed set of `(repo, tag)` pairs.
#[derive(Default)]
pub struct FakeGitTagChecker {
    pub known_tags: Mutex<BTreeSet<(String, String)>>,
}

impl FakeGitTagChecker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_tag(&self, repo_url: &str, tag: &str) {
        self.known_tags
            .lock()
            .unwrap()
            .insert((repo_url.to_string(), tag.to_string()));
    }
}

impl GitTagChecker for FakeGitTagChecker {
    fn tag_exists(&self, repo_url: &str, tag: &str) -> Result<bool, TrackerError> {
        Ok(self
            .known_tags
            .lock()
            .unwrap()
            .contains(&(repo_url.to_string(), tag.to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fake_reports_only_known_tags() {
        let fake = FakeGitTagChecker::new();
        fake.add_tag("https://git.example/linux", "Ubuntu-5.15.0-100.110");
        assert!(
            fake.tag_exists("https://git.example/linux", "Ubuntu-5.15.0-100.110")
                .unwrap()
        );
        assert!(
            !fake
                .tag_exists("https://git.example/linux", "Ubuntu-5.15.0-101.111")
                .unwrap()
        );
    }
}
