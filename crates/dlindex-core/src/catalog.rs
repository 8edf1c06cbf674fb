//! Artifacts grouped into collections and releases, in index order.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::artifact::Artifact;
use crate::manifest::CollectionConfig;
use crate::version::ReleaseVersion;

/// Everything the index lists.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Catalog {
    pub collections: Vec<CollectionListing>,
}

/// The releases of one collection.
#[derive(Debug, Clone, Serialize)]
pub struct CollectionListing {
    pub name: String,
    pub title: String,
    pub releases: Vec<Release>,
}

/// All artifacts sharing one version directory.
#[derive(Debug, Clone, Serialize)]
pub struct Release {
    pub version: ReleaseVersion,
    pub artifacts: Vec<Artifact>,
}

impl Release {
    /// Newest modification time among the release's artifacts.
    pub fn last_modified(&self) -> Option<i64> {
        self.artifacts.iter().filter_map(|a| a.last_modified).max()
    }
}

impl CollectionListing {
    /// The newest non-prerelease release, skipping channels.
    pub fn latest_release(&self) -> Option<&Release> {
        self.releases
            .iter()
            .find(|r| !r.version.is_channel() && !r.version.is_prerelease())
    }
}

impl Catalog {
    /// Group `artifacts` by collection (in configuration order) and version.
    ///
    /// Releases come out in [`ReleaseVersion`] order; artifacts inside a
    /// release are sorted by platform, arch and filename. Artifacts naming
    /// an unknown collection are dropped.
    pub fn build(collections: &[CollectionConfig], artifacts: Vec<Artifact>) -> Self {
        let mut grouped: BTreeMap<&str, BTreeMap<ReleaseVersion, Vec<Artifact>>> = collections
            .iter()
            .map(|c| (c.name.as_str(), BTreeMap::new()))
            .collect();

        for artifact in artifacts {
            match grouped.get_mut(artifact.collection.as_str()) {
                Some(releases) => releases
                    .entry(artifact.version.clone())
                    .or_default()
                    .push(artifact),
                None => tracing::debug!(
                    "Dropping {}: unknown collection '{}'",
                    artifact.key,
                    artifact.collection
                ),
            }
        }

        let collections = collections
            .iter()
            .map(|c| {
                let releases = grouped
                    .remove(c.name.as_str())
                    .unwrap_or_default()
                    .into_iter()
                    .map(|(version, mut artifacts)| {
                        artifacts.sort_by(|a, b| {
                            a.platform
                                .cmp(&b.platform)
                                .then_with(|| a.arch.cmp(&b.arch))
                                .then_with(|| a.filename.cmp(&b.filename))
                        });
                        Release { version, artifacts }
                    })
                    .collect();
                CollectionListing {
                    name: c.name.clone(),
                    title: c.display_title().to_string(),
                    releases,
                }
            })
            .collect();

        Self { collections }
    }

    pub fn artifacts(&self) -> impl Iterator<Item = &Artifact> {
        self.collections
            .iter()
            .flat_map(|c| c.releases.iter())
            .flat_map(|r| r.artifacts.iter())
    }

    pub fn artifact_count(&self) -> usize {
        self.artifacts().count()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts().next().is_none()
    }

    /// Newest modification time of any artifact; the index's "updated" date.
    pub fn last_modified(&self) -> Option<i64> {
        self.artifacts().filter_map(|a| a.last_modified).max()
    }
}
