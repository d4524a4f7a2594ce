//! Read-only accessor over the kernel source catalog (`kernel-series.yaml`):
//! series, sources, package types, archive routing, snaps, testable
//! flavours. Loaded once at daemon startup; every lookup here is pure and
//! never touches the network.

pub mod types;

use camino::Utf8Path;
use swm_utils::error::CatalogError;
pub use types::{
    DerivedFrom, KernelSeriesData, RouteEntry, RoutingTable, SeriesData, SnapData, SourceData,
    TestableFlavour,
};

/// The loaded catalog tree plus typed lookups over it.
#[derive(Debug, Clone, Default)]
pub struct KernelSeries {
    data: KernelSeriesData,
}

impl KernelSeries {
    /// Parse a `kernel-series.yaml` document already read into memory.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, CatalogError> {
        let data: KernelSeriesData =
            serde_yaml::from_str(yaml).map_err(|e| CatalogError::Parse(e.to_string()))?;
        Ok(Self { data })
    }

    /// Load and parse the catalog from a file on disk.
    pub fn load(path: &Utf8Path) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path.as_std_path())
            .map_err(|_| CatalogError::NotFound(path.as_std_path().to_owned()))?;
        Self::from_yaml_str(&content)
    }

    /// Look up a series by codename (e.g. `"focal"`).
    pub fn lookup_series(&self, codename: &str) -> Result<&SeriesData, CatalogError> {
        self.data
            .series
            .get(codename)
            .ok_or_else(|| CatalogError::UnknownSeries(codename.to_string()))
    }

    /// Look up a source package within a series.
    pub fn lookup_source(&self, codename: &str, source: &str) -> Result<&SourceData, CatalogError> {
        let series = self.lookup_series(codename)?;
        series
            .sources
            .get(source)
            .ok_or_else(|| CatalogError::UnknownSource {
                series: codename.to_string(),
                source: source.to_string(),
            })
    }

    /// True if `codename` names a series known to the catalog.
    #[must_use]
    pub fn is_known_series(&self, codename: &str) -> bool {
        self.data.series.contains_key(codename)
    }

    /// All series codenames, for title-parsing's "find the first tag that
    /// names a known series" rule (spec.md §4.2).
    pub fn series_codenames(&self) -> impl Iterator<Item = &str> {
        self.data.series.keys().map(String::as_str)
    }
}

impl SourceData {
    /// True if `pkg_type` is one of this source's declared dependent
    /// package types (`main`, `meta`, `signed`, `lrm`, ...).
    #[must_use]
    pub fn has_package_type(&self, pkg_type: &str) -> bool {
        self.packages.contains_key(pkg_type)
    }

    #[must_use]
    pub fn package_name(&self, pkg_type: &str) -> Option<&str> {
        self.packages.get(pkg_type).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
focal:
  development: false
  supported: true
  esm: false
  sources:
    linux:
      component: main
      repo: "https://git.launchpad.net/~canonical-kernel/ubuntu/+source/linux"
      packages:
        main: linux
        meta: linux-meta
        signed: linux-signed
      routing:
        Proposed:
          - archive: ubuntu
            pocket: proposed
        Updates:
          - archive: ubuntu
            pocket: updates
        Security:
          - archive: ubuntu
            pocket: security
      testable-flavours:
        - flavour: generic
          arches: [amd64, arm64]
groovy:
  development: true
  supported: true
  esm: false
  sources: {}
"#;

    #[test]
    fn parses_series_and_sources() {
        let ks = KernelSeries::from_yaml_str(SAMPLE).unwrap();
        assert!(ks.is_known_series("focal"));
        assert!(!ks.is_known_series("xenial"));

        let focal = ks.lookup_series("focal").unwrap();
        assert!(focal.supported);
        assert!(!focal.development);

        let linux = ks.lookup_source("focal", "linux").unwrap();
        assert_eq!(linux.package_name("main"), Some("linux"));
        assert!(linux.has_package_type("meta"));
        assert!(!linux.has_package_type("lrm"));

        let route = linux.routing.lookup_destination("Proposed").unwrap();
        assert_eq!(route.len(), 1);
        assert_eq!(route[0].archive, "ubuntu");
        assert_eq!(route[0].pocket, "proposed");
    }

    #[test]
    fn unknown_series_is_an_error() {
        let ks = KernelSeries::from_yaml_str(SAMPLE).unwrap();
        assert!(matches!(
            ks.lookup_series("xenial"),
            Err(CatalogError::UnknownSeries(s)) if s == "xenial"
        ));
    }

    #[test]
    fn unknown_source_is_an_error() {
        let ks = KernelSeries::from_yaml_str(SAMPLE).unwrap();
        assert!(matches!(
            ks.lookup_source("focal", "linux-nope"),
            Err(CatalogError::UnknownSource { .. })
        ));
    }

    #[test]
    fn development_series_flag_is_read() {
        let ks = KernelSeries::from_yaml_str(SAMPLE).unwrap();
        assert!(ks.lookup_series("groovy").unwrap().development);
    }
}
