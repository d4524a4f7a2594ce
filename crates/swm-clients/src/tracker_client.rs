//! `TrackerClient`: the tracker (Launchpad-shaped) half of the external
//! interface (spec.md §6). A production implementation backed by `reqwest`
//! in blocking mode, and an in-memory fake for tests, mirroring the
//! trait-plus-stub split the teacher uses for its LLM backend.

use std::collections::BTreeMap;
use std::sync::Mutex;

use reqwest::blocking::Client;
use swm_utils::error::TrackerError;
use tracing::{debug, instrument};

use crate::types::{
    Build, BugData, PackageUpload, PublishedBinary, PublishedSource, PublishedSourceQuery,
};

/// Everything the engine needs from the tracker: read and update bugs, query
/// the archive and the builders, and read upload-queue state.
pub trait TrackerClient: Send + Sync {
    fn get_bug(&self, id: &str) -> Result<BugData, TrackerError>;

    fn set_task_status(&self, id: &str, task: &str, status: &str) -> Result<(), TrackerError>;

    fn set_description(&self, id: &str, description: &str) -> Result<(), TrackerError>;

    fn set_tags(&self, id: &str, tags: &[String]) -> Result<(), TrackerError>;

    fn add_comment(&self, id: &str, body: &str) -> Result<(), TrackerError>;

    fn search_bugs_by_tags(
        &self,
        project: &str,
        tags: &[String],
        combinator_all: bool,
    ) -> Result<Vec<String>, TrackerError>;

    fn published_sources(
        &self,
        query: &PublishedSourceQuery,
    ) -> Result<Vec<PublishedSource>, TrackerError>;

    fn published_binaries(
        &self,
        series: &str,
        source_name: &str,
        version: &str,
        pocket: &str,
    ) -> Result<Vec<PublishedBinary>, TrackerError>;

    fn builds_for_source(
        &self,
        series: &str,
        source_name: &str,
        version: &str,
    ) -> Result<Vec<Build>, TrackerError>;

    fn retry_build(&self, build_self_link: &str) -> Result<(), TrackerError>;

    fn upload_queue_entries(
        &self,
        series: &str,
        pocket: &str,
        source_name: &str,
        version: &str,
    ) -> Result<Vec<PackageUpload>, TrackerError>;
}

/// `reqwest`-backed implementation talking to a Launchpad-shaped REST API.
pub struct HttpTrackerClient {
    base_url: String,
    http: Client,
}

impl HttpTrackerClient {
    #[must_use]
    pub fn new(base_url: impl Into<String>, timeout: std::time::Duration) -> Self {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent("swm/1.0")
            .build()
            .expect("reqwest client builder with static config never fails");
        Self {
            base_url: base_url.into(),
            http,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

impl TrackerClient for HttpTrackerClient {
    #[instrument(skip(self), fields(bug = id))]
    fn get_bug(&self, id: &str) -> Result<BugData, TrackerError> {
        let url = self.url(&format!("/bugs/{id}"));
        let resp = self
            .http
            .get(&url)
            .send()
            .map_err(|e| TrackerError::Request(e.to_string()))?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(TrackerError::NotFound(id.to_string()));
        }
        if !resp.status().is_success() {
            return Err(TrackerError::Request(format!(
                "GET {url} -> {}",
                resp.status()
            )));
        }
        resp.json::<WireBug>()
            .map_err(|e| TrackerError::Parse(e.to_string()))
            .map(WireBug::into_domain)
    }

    fn set_task_status(&self, id: &str, task: &str, status: &str) -> Result<(), TrackerError> {
        debug!(bug = id, task, status, "setting task status");
        let url = self.url(&format!("/bugs/{id}/tasks/{task}"));
        let body = serde_json::json!({ "status": status });
        let resp = self
            .http
            .patch(&url)
            .json(&body)
            .send()
            .map_err(|e| TrackerError::Request(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(TrackerError::Request(format!(
                "PATCH {url} -> {}",
                resp.status()
            )));
        }
        Ok(())
    }

    fn set_description(&self, id: &str, description: &str) -> Result<(), TrackerError> {
        let url = self.url(&format!("/bugs/{id}"));
        let body = serde_json::json!({ "description": description });
        let resp = self
            .http
            .patch(&url)
            .json(&body)
            .send()
            .map_err(|e| TrackerError::Request(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(TrackerError::Request(format!(
                "PATCH {url} -> {}",
                resp.status()
            )));
        }
        Ok(())
    }

    fn set_tags(&self, id: &str, tags: &[String]) -> Result<(), TrackerError> {
        let url = self.url(&format!("/bugs/{id}"));
        let body = serde_json::json!({ "tags": tags });
        let resp = self
            .http
            .patch(&url)
            .json(&body)
            .send()
            .map_err(|e| TrackerError::Request(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(TrackerError::Request(format!(
                "PATCH {url} -> {}",
                resp.status()
            )));
        }
        Ok(())
    }

    fn add_comment(&self, id: &str, body: &str) -> Result<(), TrackerError> {
        let url = self.url(&format!("/bugs/{id}/comments"));
        let payload = serde_json::json!({ "content": body });
        let resp = self
            .http
            .post(&url)
            .json(&payload)
            .send()
            .map_err(|e| TrackerError::Request(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(TrackerError::Request(format!(
                "POST {url} -> {}",
                resp.status()
            )));
        }
        Ok(())
    }

    fn search_bugs_by_tags(
        &self,
        project: &str,
        tags: &[String],
        combinator_all: bool,
    ) -> Result<Vec<String>, TrackerError> {
        let tags_param = tags
            .iter()
            .map(|t| urlencoding::encode(t).into_owned())
            .collect::<Vec<_>>()
            .join(",");
        let url = self.url(&format!(
            "/{project}/bugs?tags={tags_param}&tags_combinator={}",
            if combinator_all { "ALL" } else { "ANY" }
        ));
        let resp = self
            .http
            .get(&url)
            .send()
            .map_err(|e| TrackerError::Request(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(TrackerError::Request(format!(
                "GET {url} -> {}",
                resp.status()
            )));
        }
        resp.json::<Vec<String>>()
            .map_err(|e| TrackerError::Parse(e.to_string()))
    }

    fn published_sources(
        &self,
        query: &PublishedSourceQuery,
    ) -> Result<Vec<PublishedSource>, TrackerError> {
        let mut url = self.url(&format!(
            "/archive/{}/sources?source_name={}&exact_match={}",
            query.series,
            urlencoding::encode(&query.source_name),
            query.exact_match
        ));
        if let Some(v) = &query.version {
            url.push_str(&format!("&version={}", urlencoding::encode(v)));
        }
        if let Some(p) = &query.pocket {
            url.push_str(&format!("&pocket={p}"));
        }
        let resp = self
            .http
            .get(&url)
            .send()
            .map_err(|e| TrackerError::Request(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(TrackerError::Request(format!(
                "GET {url} -> {}",
                resp.status()
            )));
        }
        resp.json()
            .map_err(|e| TrackerError::Parse(e.to_string()))
    }

    fn published_binaries(
        &self,
        series: &str,
        source_name: &str,
        version: &str,
        pocket: &str,
    ) -> Result<Vec<PublishedBinary>, TrackerError> {
        let url = self.url(&format!(
            "/archive/{series}/binaries?source_name={}&version={}&pocket={pocket}",
            urlencoding::encode(source_name),
            urlencoding::encode(version)
        ));
        let resp = self
            .http
            .get(&url)
            .send()
            .map_err(|e| TrackerError::Request(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(TrackerError::Request(format!(
                "GET {url} -> {}",
                resp.status()
            )));
        }
        resp.json()
            .map_err(|e| TrackerError::Parse(e.to_string()))
    }

    fn builds_for_source(
        &self,
        series: &str,
        source_name: &str,
        version: &str,
    ) -> Result<Vec<Build>, TrackerError> {
        let url = self.url(&format!(
            "/archive/{series}/builds?source_name={}&version={}",
            urlencoding::encode(source_name),
            urlencoding::encode(version)
        ));
        let resp = self
            .http
            .get(&url)
            .send()
            .map_err(|e| TrackerError::Request(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(TrackerError::Request(format!(
                "GET {url} -> {}",
                resp.status()
            )));
        }
        resp.json()
            .map_err(|e| TrackerError::Parse(e.to_string()))
    }

    fn retry_build(&self, build_self_link: &str) -> Result<(), TrackerError> {
        let resp = self
            .http
            .post(build_self_link)
            .json(&serde_json::json!({ "ws.op": "retry" }))
            .send()
            .map_err(|e| TrackerError::Request(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(TrackerError::Request(format!(
                "POST {build_self_link} -> {}",
                resp.status()
            )));
        }
        Ok(())
    }

    fn upload_queue_entries(
        &self,
        series: &str,
        pocket: &str,
        source_name: &str,
        version: &str,
    ) -> Result<Vec<PackageUpload>, TrackerError> {
        let url = self.url(&format!(
            "/archive/{series}/queue?pocket={pocket}&source_name={}&version={}",
            urlencoding::encode(source_name),
            urlencoding::encode(version)
        ));
        let resp = self
            .http
            .get(&url)
            .send()
            .map_err(|e| TrackerError::Request(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(TrackerError::Request(format!(
                "GET {url} -> {}",
                resp.status()
            )));
        }
        resp.json()
            .map_err(|e| TrackerError::Parse(e.to_string()))
    }
}

/// Wire shape for a bug, decoupled from [`BugData`] so the JSON field names
/// (which follow the tracker's own conventions) don't leak into the domain
/// type's field names.
#[derive(Debug, serde::Deserialize)]
struct WireBug {
    id: String,
    title: String,
    description: String,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    tasks: BTreeMap<String, WireTask>,
    #[serde(default)]
    duplicate_of: Option<String>,
}

#[derive(Debug, serde::Deserialize)]
struct WireTask {
    status: String,
    #[serde(default)]
    importance: String,
    #[serde(default)]
    assignee: Option<String>,
}

impl WireBug {
    fn into_domain(self) -> BugData {
        use std::str::FromStr;
        BugData {
            id: self.id,
            title: self.title,
            description: self.description,
            tags: self.tags,
            tasks: self
                .tasks
                .into_iter()
                .map(|(name, t)| {
                    (
                        name.clone(),
                        crate::types::BugTask {
                            name,
                            status: crate::types::TaskStatus::from_str(&t.status)
                                .unwrap_or(crate::types::TaskStatus::Unknown),
                            importance: t.importance,
                            assignee: t.assignee,
                        },
                    )
                })
                .collect(),
            duplicate_of: self.duplicate_of,
        }
    }
}

/// In-memory fake used by engine/tasks tests: a mutable bug store plus call
/// logs for the mutating operations, so tests can assert on both the
/// resulting state and the exact calls made.
#[derive(Default)]
pub struct FakeTrackerClient {
    pub bugs: Mutex<BTreeMap<String, BugData>>,
    pub sources: Mutex<Vec<PublishedSource>>,
    pub binaries: Mutex<Vec<PublishedBinary>>,
    pub builds: Mutex<Vec<Build>>,
    pub uploads: Mutex<Vec<PackageUpload>>,
    pub retried_builds: Mutex<Vec<String>>,
    pub comments: Mutex<Vec<(String, String)>>,
}

impl FakeTrackerClient {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_bug(&self, bug: BugData) {
        self.bugs.lock().unwrap().insert(bug.id.clone(), bug);
    }
}

impl TrackerClient for FakeTrackerClient {
    fn get_bug(&self, id: &str) -> Result<BugData, TrackerError> {
        self.bugs
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| TrackerError::NotFound(id.to_string()))
    }

    fn set_task_status(&self, id: &str, task: &str, status: &str) -> Result<(), TrackerError> {
        use std::str::FromStr;
        let mut bugs = self.bugs.lock().unwrap();
        let bug = bugs
            .get_mut(id)
            .ok_or_else(|| TrackerError::NotFound(id.to_string()))?;
        let t = bug
            .tasks
            .get_mut(task)
            .ok_or_else(|| TrackerError::NoSuchTask(task.to_string()))?;
        t.status = crate::types::TaskStatus::from_str(status).unwrap_or(t.status);
        Ok(())
    }

    fn set_description(&self, id: &str, description: &str) -> Result<(), TrackerError> {
        let mut bugs = self.bugs.lock().unwrap();
        let bug = bugs
            .get_mut(id)
            .ok_or_else(|| TrackerError::NotFound(id.to_string()))?;
        bug.description = description.to_string();
        Ok(())
    }

    fn set_tags(&self, id: &str, tags: &[String]) -> Result<(), TrackerError> {
        let mut bugs = self.bugs.lock().unwrap();
        let bug = bugs
            .get_mut(id)
            .ok_or_else(|| TrackerError::NotFound(id.to_string()))?;
        bug.tags = tags.to_vec();
        Ok(())
    }

    fn add_comment(&self, id: &str, body: &str) -> Result<(), TrackerError> {
        self.comments
            .lock()
            .unwrap()
            .push((id.to_string(), body.to_string()));
        Ok(())
    }

    fn search_bugs_by_tags(
        &self,
        _project: &str,
        tags: &[String],
        combinator_all: bool,
    ) -> Result<Vec<String>, TrackerError> {
        let bugs = self.bugs.lock().unwrap();
        Ok(bugs
            .values()
            .filter(|b| {
                if combinator_all {
                    tags.iter().all(|t| b.tags.contains(t))
                } else {
                    tags.iter().any(|t| b.tags.contains(t))
                }
            })
            .map(|b| b.id.clone())
            .collect())
    }

    fn published_sources(
        &self,
        query: &PublishedSourceQuery,
    ) -> Result<Vec<PublishedSource>, TrackerError> {
        Ok(self
            .sources
            .lock()
            .unwrap()
            .iter()
            .filter(|s| {
                s.source_name == query.source_name
                    && query.version.as_deref().is_none_or(|v| v == s.version)
            })
            .cloned()
            .collect())
    }

    fn published_binaries(
        &self,
        _series: &str,
        _source_name: &str,
        _version: &str,
        _pocket: &str,
    ) -> Result<Vec<PublishedBinary>, TrackerError> {
        Ok(self.binaries.lock().unwrap().clone())
    }

    fn builds_for_source(
        &self,
        _series: &str,
        _source_name: &str,
        _version: &str,
    ) -> Result<Vec<Build>, TrackerError> {
        Ok(self.builds.lock().unwrap().clone())
    }

    fn retry_build(&self, build_self_link: &str) -> Result<(), TrackerError> {
        self.retried_builds
            .lock()
            .unwrap()
            .push(build_self_link.to_string());
        Ok(())
    }

    fn upload_queue_entries(
        &self,
        _series: &str,
        _pocket: &str,
        _source_name: &str,
        _version: &str,
    ) -> Result<Vec<PackageUpload>, TrackerError> {
        Ok(self.uploads.lock().unwrap().clone())
    }
}
