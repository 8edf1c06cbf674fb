//! Operation: build the catalog from the objects in the store.

use std::collections::HashSet;

use dlindex_core::artifact::{parse_key, Artifact, CHECKSUM_SUFFIX};
use dlindex_core::catalog::Catalog;
use dlindex_core::manifest::CollectionConfig;
use dlindex_store::ObjectStore;

/// The catalog and the keys that did not make it in.
#[derive(Debug, Clone)]
pub struct Discovery {
    pub catalog: Catalog,
    /// Keys below a collection prefix that were filtered out or do not
    /// follow the artifact layout.
    pub skipped: Vec<String>,
}

/// List every collection prefix and turn matching objects into artifacts.
///
/// `<file>.sha256` objects are attached to `<file>` as checksum sidecars and
/// never listed on their own.
pub async fn discover(
    store: &dyn ObjectStore,
    collections: &[CollectionConfig],
) -> miette::Result<Discovery> {
    let mut artifacts = Vec::new();
    let mut skipped = Vec::new();

    for collection in collections {
        let filter = collection.file_filter()?;
        let objects = store.list(&collection.prefix).await?;
        let keys: HashSet<&str> = objects.iter().map(|o| o.key.as_str()).collect();

        let before = artifacts.len();
        for obj in &objects {
            let Some(path) = parse_key(&collection.prefix, &obj.key) else {
                tracing::debug!("Skipping {}: not <platform>/<arch>/<version>/<file>", obj.key);
                skipped.push(obj.key.clone());
                continue;
            };
            if path.filename.ends_with(CHECKSUM_SUFFIX) {
                continue;
            }
            if !filter.matches(path.filename) {
                tracing::debug!("Skipping {}: filtered by include/exclude", obj.key);
                skipped.push(obj.key.clone());
                continue;
            }

            let mut artifact = Artifact::from_path(&collection.name, &obj.key, &path);
            if !collection.include_prereleases && artifact.version.is_prerelease() {
                tracing::debug!("Skipping {}: pre-release", obj.key);
                skipped.push(obj.key.clone());
                continue;
            }
            artifact.size = obj.size;
            artifact.last_modified = obj.last_modified;
            let sidecar = format!("{}{CHECKSUM_SUFFIX}", obj.key);
            if keys.contains(sidecar.as_str()) {
                artifact.checksum_key = Some(sidecar);
            }
            artifacts.push(artifact);
        }

        tracing::info!(
            "Collection '{}': {} artifact(s) under {}/",
            collection.name,
            artifacts.len() - before,
            collection.prefix
        );
    }

    Ok(Discovery {
        catalog: Catalog::build(collections, artifacts),
        skipped,
    })
}
