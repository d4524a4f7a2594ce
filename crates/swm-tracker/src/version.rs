//! Kernel version parsing: `N.N.N[-.]ABI.UPLOAD[~suffix]` (spec.md §4.2).

use once_cell::sync::Lazy;
use regex::Regex;

static VERSION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<kernel>\d+\.\d+\.\d+)(?P<sep>[-.])(?P<abi>\d+)\.(?P<upload>\d+)(?P<suffix>~\S+)?$")
        .expect("static regex is valid")
});

static TITLE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?P<source>linux[-\S]*): (?P<version>\d+\.\d+\.\d+[-.]\d+\.\d+(?:~\S+)?) -proposed tracker$",
    )
    .expect("static regex is valid")
});

/// A parsed kernel version: `5.15.0-100.110~20.04.1` -> kernel `5.15.0`,
/// abi `100`, upload `110`, suffix `~20.04.1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionInfo {
    pub kernel: String,
    pub abi: String,
    pub upload: String,
    pub suffix: Option<String>,
    /// The full matched version string, suffix included.
    pub full: String,
}

impl VersionInfo {
    pub fn parse(version: &str) -> Option<Self> {
        let caps = VERSION_RE.captures(version)?;
        Some(Self {
            kernel: caps["kernel"].to_string(),
            abi: caps["abi"].to_string(),
            upload: caps["upload"].to_string(),
            suffix: caps.name("suffix").map(|m| m.as_str().to_string()),
            full: version.to_string(),
        })
    }

    /// `"<kernel>-<abi>."` and `"<kernel>.<abi>."` — the two accepted
    /// abi-prefix forms used when matching `meta`/`ports-meta`/`lbm`
    /// publications (spec.md §4.3).
    #[must_use]
    pub fn abi_prefixes(&self) -> [String; 2] {
        [
            format!("{}-{}.", self.kernel, self.abi),
            format!("{}.{}.", self.kernel, self.abi),
        ]
    }
}

/// A tracker bug's title, split into source name and version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TitleInfo {
    pub source: String,
    pub version: VersionInfo,
}

/// Parse a bug title of the form `"<source>: <version> -proposed tracker"`.
/// Returns `None` if the title doesn't match — callers report
/// `"Package not identified from title"` and invalidate the tracker.
pub fn parse_title(title: &str) -> Option<TitleInfo> {
    let caps = TITLE_RE.captures(title)?;
    let version = VersionInfo::parse(&caps["version"])?;
    Some(TitleInfo {
        source: caps["source"].to_string(),
        version,
    })
}

/// Render a title back from source + version, used when the version
/// becomes known and the title must be rewritten (spec.md §6).
#[must_use]
pub fn format_title(source: &str, version: &str) -> String {
    format!("{source}: {version} -proposed tracker")
}

/// The git tag forms to probe, in order, for a package's upload (spec.md
/// §6, ground: `git_tag.py::GitTag.__init__`). `source_name` is the bug
/// title's source package (`linux`, `linux-aws`, `linux-aws-edge`, ...);
/// the first candidate derives its suffix from whatever's left once
/// `linux` is stripped out of the name. The two fallbacks are mutually
/// exclusive, not both tried: `-edge` is stripped only when the primary
/// candidate itself contains it, otherwise a bare `Ubuntu-lts-<version>`
/// is tried only when the primary candidate contains `-lts-`.
#[must_use]
pub fn git_tag_candidates(source_name: &str, version: &str) -> Vec<String> {
    let suffix = source_name.replace("linux", "");
    let version_underscored = version.replace('~', "_");
    let primary = format!("Ubuntu{suffix}-{version_underscored}");

    let mut candidates = vec![primary.clone()];
    if primary.contains("-edge") {
        candidates.push(primary.replace("-edge", ""));
    } else if primary.contains("-lts-") {
        candidates.push(format!("Ubuntu-lts-{version_underscored}"));
    }
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_standard_title() {
        let info = parse_title("linux: 5.4.0-42.46 -proposed tracker").unwrap();
        assert_eq!(info.source, "linux");
        assert_eq!(info.version.kernel, "5.4.0");
        assert_eq!(info.version.abi, "42");
        assert_eq!(info.version.upload, "46");
        assert_eq!(info.version.suffix, None);
    }

    #[test]
    fn parses_source_with_suffix_and_tilde_suffix() {
        let info = parse_title("linux-aws: 5.15.0-100.110~20.04.1 -proposed tracker").unwrap();
        assert_eq!(info.source, "linux-aws");
        assert_eq!(info.version.suffix.as_deref(), Some("~20.04.1"));
        assert_eq!(info.version.full, "5.15.0-100.110~20.04.1");
    }

    #[test]
    fn parses_dot_separator_between_kernel_and_abi() {
        let info = parse_title("linux: 5.15.0.100.110 -proposed tracker").unwrap();
        assert_eq!(info.version.kernel, "5.15.0");
        assert_eq!(info.version.abi, "100");
    }

    #[test]
    fn rejects_unparseable_title() {
        assert!(parse_title("linux: not a version -proposed tracker").is_none());
        assert!(parse_title("some random bug title").is_none());
    }

    #[test]
    fn abi_prefixes_cover_both_separator_forms() {
        let v = VersionInfo::parse("5.15.0-100.110").unwrap();
        let prefixes = v.abi_prefixes();
        assert_eq!(prefixes[0], "5.15.0-100.");
        assert_eq!(prefixes[1], "5.15.0.100.");
    }

    #[test]
    fn tag_candidates_for_plain_linux() {
        let candidates = git_tag_candidates("linux", "5.4.0-42.46");
        assert_eq!(candidates, vec!["Ubuntu-5.4.0-42.46".to_string()]);
    }

    #[test]
    fn tag_candidates_tilde_suffix_becomes_underscore() {
        let candidates = git_tag_candidates("linux-aws", "5.15.0-100.110~20.04.1");
        assert_eq!(candidates[0], "Ubuntu-aws-5.15.0-100.110_20.04.1");
    }

    #[test]
    fn tag_candidates_strip_edge_as_a_fallback() {
        let candidates = git_tag_candidates("linux-aws-edge", "5.15.0-100.110");
        assert_eq!(
            candidates,
            vec![
                "Ubuntu-aws-edge-5.15.0-100.110".to_string(),
                "Ubuntu-aws-5.15.0-100.110".to_string(),
            ]
        );
    }
}
