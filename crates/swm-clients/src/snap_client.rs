//! `SnapStoreClient`: the snap-store half of the external interface
//! (spec.md §6), used by C6 to read channel maps for snaps derived from a
//! kernel source.

use std::collections::BTreeMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use reqwest::blocking::Client;
use swm_utils::error::TrackerError;

/// One channel-map entry: a risk/track/branch pairing with the revision
/// currently released into it.
#[derive(Debug, Clone)]
pub struct ChannelMapEntry {
    pub track: String,
    pub risk: String,
    pub revision: u64,
    pub version: String,
    pub released_at: Option<DateTime<Utc>>,
}

pub trait SnapStoreClient: Send + Sync {
    /// The full channel map for a snap, across all tracks/risks.
    fn channel_map(&self, snap_name: &str) -> Result<Vec<ChannelMapEntry>, TrackerError>;
}

pub struct HttpSnapStoreClient {
    base_url: String,
    http: Client,
}

impl HttpSnapStoreClient {
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
}

#[derive(Debug, serde::Deserialize)]
struct WireChannelMapResponse {
    #[serde(rename = "channel-map")]
    channel_map: Vec<WireChannelMapEntry>,
}

#[derive(Debug, serde::Deserialize)]
struct WireChannelMapEntry {
    channel: WireChannel,
    revision: u64,
    version: String,
    #[serde(rename = "when", default)]
    released_at: Option<DateTime<Utc>>,
}

#[derive(Debug, serde::Deserialize)]
struct WireChannel {
    track: String,
    risk: String,
}

impl SnapStoreClient for HttpSnapStoreClient {
    fn channel_map(&self, snap_name: &str) -> Result<Vec<ChannelMapEntry>, TrackerError> {
        let url = format!(
            "{}/v2/snaps/info/{snap_name}?fields=channel-map",
            self.base_url.trim_end_matches('/')
        );
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
        let wire: WireChannelMapResponse = resp
            .json()
            .map_err(|e| TrackerError::Parse(e.to_string()))?;
        Ok(wire
            .channel_map
            .into_iter()
            .map(|e| ChannelMapEntry {
                track: e.channel.track,
                risk: e.channel.risk,
                revision: e.revision,
                version: e.version,
                released_at: e.released_at,
            })
            .collect())
    }
}

/// In-memory fake keyed by snap name, for C6's aggregator tests.
#[derive(Default)]
pub struct FakeSnapStoreClient {
    pub maps: Mutex<BTreeMap<String, Vec<ChannelMapEntry>>>,
}

impl FakeSnapStoreClient {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_channel_map(&self, snap_name: &str, entries: Vec<ChannelMapEntry>) {
        self.maps
            .lock()
            .unwrap()
            .insert(snap_name.to_string(), entries);
    }
}

impl SnapStoreClient for FakeSnapStoreClient {
    fn channel_map(&self, snap_name: &str) -> Result<Vec<ChannelMapEntry>, TrackerError> {
        Ok(self
            .maps
            .lock()
            .unwrap()
            .get(snap_name)
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fake_returns_empty_for_unknown_snap() {
        let fake = FakeSnapStoreClient::new();
        assert!(fake.channel_map("pc-kernel").unwrap().is_empty());
    }

    #[test]
    fn fake_round_trips_channel_map() {
        let fake = FakeSnapStoreClient::new();
        fake.set_channel_map(
            "pc-kernel",
            vec![ChannelMapEntry {
                track: "22".to_string(),
                risk: "stable".to_string(),
                revision: 100,
                version: "5.15.0-100.110".to_string(),
                released_at: None,
            }],
        );
        let map = fake.channel_map("pc-kernel").unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(map[0].revision, 100);
    }
}
