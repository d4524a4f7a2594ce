//! SWM properties: the YAML block embedder in a tracker's description,
//! below the sentinel line `-- swm properties --` (spec.md §3, §4.2, §8).

use std::collections::BTreeMap;

use serde_yaml::Value;

pub const SENTINEL_LINE: &str = "-- swm properties --";

/// The machine-readable half of a tracker description: a loosely-typed YAML
/// mapping. Most keys are simple strings (`phase`, `target-series`,
/// `kernel-stable-master-bug`); a handful (`versions`, `packages`, `built`,
/// `reason`) are nested string maps; timestamps (`<task>-start`,
/// `<task>-end`) are dynamic keys with no fixed schema, so the whole thing
/// is kept as a generic map rather than a fixed struct.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SwmProperties {
    raw: BTreeMap<String, Value>,
}

impl SwmProperties {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    #[must_use]
    pub fn get_string(&self, key: &str) -> Option<String> {
        match self.raw.get(key) {
            Some(Value::String(s)) => Some(s.clone()),
            _ => None,
        }
    }

    pub fn set_string(&mut self, key: &str, value: impl Into<String>) {
        self.raw
            .insert(key.to_string(), Value::String(value.into()));
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.raw.remove(key)
    }

    #[must_use]
    pub fn get_map(&self, key: &str) -> BTreeMap<String, String> {
        match self.raw.get(key) {
            Some(Value::Mapping(m)) => m
                .iter()
                .filter_map(|(k, v)| match (k.as_str(), v.as_str()) {
                    (Some(k), Some(v)) => Some((k.to_string(), v.to_string())),
                    _ => None,
                })
                .collect(),
            _ => BTreeMap::new(),
        }
    }

    pub fn set_map(&mut self, key: &str, map: &BTreeMap<String, String>) {
        let mapping: serde_yaml::Mapping = map
            .iter()
            .map(|(k, v)| (Value::String(k.clone()), Value::String(v.clone())))
            .collect();
        self.raw.insert(key.to_string(), Value::Mapping(mapping));
    }

    /// Set a single entry inside a nested map property, preserving the
    /// other entries already there.
    pub fn set_map_entry(&mut self, key: &str, entry_key: &str, entry_value: impl Into<String>) {
        let mut map = self.get_map(key);
        map.insert(entry_key.to_string(), entry_value.into());
        self.set_map(key, &map);
    }

    // -- phase -------------------------------------------------------

    #[must_use]
    pub fn phase_key(development: bool) -> &'static str {
        if development {
            "kernel-phase"
        } else {
            "kernel-stable-phase"
        }
    }

    #[must_use]
    pub fn phase_changed_key(development: bool) -> &'static str {
        if development {
            "kernel-phase-changed"
        } else {
            "kernel-stable-phase-changed"
        }
    }

    #[must_use]
    pub fn phase(&self, development: bool) -> Option<String> {
        self.get_string(Self::phase_key(development))
    }

    /// Set the phase, bumping the changed-timestamp property only if the
    /// value actually differs from the current one (spec.md §4.2: "Setting
    /// the phase to the same value as the current one MUST NOT update the
    /// timestamp").
    pub fn set_phase(&mut self, development: bool, phase: &str, now: &str) {
        let key = Self::phase_key(development);
        if self.get_string(key).as_deref() == Some(phase) {
            return;
        }
        self.set_string(key, phase);
        self.set_string(Self::phase_changed_key(development), now);
    }

    // -- reasons -------------------------------------------------------

    #[must_use]
    pub fn reason(&self, task: &str) -> Option<String> {
        self.get_map("reason").get(task).cloned()
    }

    pub fn set_reason(&mut self, task: &str, reason: impl Into<String>) {
        self.set_map_entry("reason", task, reason);
    }

    #[must_use]
    pub fn overall_reason(&self) -> Option<String> {
        self.reason("overall")
    }

    pub fn set_overall_reason(&mut self, reason: impl Into<String>) {
        self.set_reason("overall", reason);
    }

    /// Clear every task reason at the start of a crank (spec.md §4.2,
    /// `reason_reset_all`).
    pub fn reason_reset_all(&mut self) {
        self.raw.remove("reason");
    }

    // -- versions / packages / built ------------------------------------

    #[must_use]
    pub fn version(&self, pkg_type: &str) -> Option<String> {
        self.get_map("versions").get(pkg_type).cloned()
    }

    /// Versions are monotone: only set if no version is currently recorded
    /// for this package type, or the caller has already established the new
    /// one supersedes it.
    pub fn set_version(&mut self, pkg_type: &str, version: impl Into<String>) {
        self.set_map_entry("versions", pkg_type, version);
    }

    #[must_use]
    pub fn versions(&self) -> BTreeMap<String, String> {
        self.get_map("versions")
    }

    #[must_use]
    pub fn package_name(&self, pkg_type: &str) -> Option<String> {
        self.get_map("packages").get(pkg_type).cloned()
    }

    pub fn set_package_name(&mut self, pkg_type: &str, name: impl Into<String>) {
        self.set_map_entry("packages", pkg_type, name);
    }

    #[must_use]
    pub fn built_route(&self, pkg_type: &str) -> Option<String> {
        self.get_map("built").get(pkg_type).cloned()
    }

    /// Record which route index (`"build#N"`, one-based) produced the
    /// artifact for `pkg_type` (spec.md §4.3).
    pub fn set_built_route(&mut self, pkg_type: &str, route_index: usize) {
        self.set_map_entry("built", pkg_type, format!("build#{route_index}"));
    }

    #[must_use]
    pub fn master_bug(&self) -> Option<String> {
        self.get_string("kernel-stable-master-bug")
    }

    pub fn set_master_bug(&mut self, id: impl Into<String>) {
        self.set_string("kernel-stable-master-bug", id);
    }

    #[must_use]
    pub fn target_series(&self) -> Option<String> {
        self.get_string("target-series")
    }

    pub fn set_target_series(&mut self, series: impl Into<String>) {
        self.set_string("target-series", series);
    }

    pub fn set_timestamp(&mut self, task: &str, marker: &str, now: impl Into<String>) {
        self.set_string(&format!("{task}-{marker}"), now);
    }

    #[must_use]
    pub fn timestamp(&self, task: &str, marker: &str) -> Option<String> {
        self.get_string(&format!("{task}-{marker}"))
    }
}

/// Web-UI edits sometimes leave leading non-breaking spaces (U+00A0) on
/// lines; the YAML parser treats these as content, not indentation, so they
/// must be normalized to ordinary spaces before parsing (spec.md §4.2).
fn normalize_nbsp(text: &str) -> String {
    text.replace('\u{00A0}', " ")
}

/// Split a description into its human preamble and parsed SWM properties.
/// If the sentinel line is absent, the whole text is preamble and the
/// properties are empty.
#[must_use]
pub fn parse_description(description: &str) -> (String, SwmProperties) {
    let normalized = normalize_nbsp(description);
    match normalized.split_once(&format!("{SENTINEL_LINE}\n")) {
        Some((preamble, yaml)) => {
            let raw: BTreeMap<String, Value> = serde_yaml::from_str(yaml).unwrap_or_default();
            (
                preamble.trim_end_matches('\n').to_string(),
                SwmProperties { raw },
            )
        }
        None => match normalized.strip_suffix(&format!("\n{SENTINEL_LINE}")) {
            Some(preamble) => (preamble.to_string(), SwmProperties::default()),
            None => (normalized, SwmProperties::default()),
        },
    }
}

/// Recombine a preamble and properties into a full description. Emits the
/// sentinel line followed by a canonical (block-style) YAML dump, with keys
/// in their natural sorted order (`BTreeMap` iteration order).
#[must_use]
pub fn serialize_description(preamble: &str, props: &SwmProperties) -> String {
    if props.raw.is_empty() {
        return preamble.to_string();
    }
    let yaml = serde_yaml::to_string(&props.raw).unwrap_or_default();
    format!("{}\n{SENTINEL_LINE}\n{}", preamble.trim_end_matches('\n'), yaml)
}

/// Write the description only if the newly serialized form differs from
/// what's already on the tracker (spec.md §4.2: "Writes are conditional").
#[must_use]
pub fn description_needs_write(current: &str, preamble: &str, props: &SwmProperties) -> bool {
    serialize_description(preamble, props) != current
}
