//! Object storage behind the download index: listing release artifacts and
//! writing the index documents, against S3 or a local directory.

pub mod local;
pub mod s3;
pub mod traits;

use std::path::Path;

use dlindex_core::credentials::CredentialBinding;
use dlindex_core::manifest::{Backend, IndexManifest};
use dlindex_util::errors::DlIndexError;

pub use local::LocalStore;
pub use s3::S3Store;
pub use traits::{ObjectInfo, ObjectStore, PutOptions};

/// Open the store the manifest describes.
///
/// `local_root` overrides the configured backend with a local directory.
/// Relative local roots resolve against `manifest_dir`.
pub async fn open_store(
    manifest: &IndexManifest,
    manifest_dir: &Path,
    credentials: &CredentialBinding,
    local_root: Option<&Path>,
) -> miette::Result<Box<dyn ObjectStore>> {
    if let Some(root) = local_root {
        return Ok(Box::new(LocalStore::new(manifest_dir.join(root))));
    }
    match manifest.storage.backend {
        Backend::Local => {
            let root = manifest
                .storage
                .root
                .as_ref()
                .ok_or_else(|| DlIndexError::Manifest {
                    message: "[storage] root is required for the local backend".to_string(),
                })?;
            Ok(Box::new(LocalStore::new(manifest_dir.join(root))))
        }
        Backend::S3 => Ok(Box::new(
            S3Store::connect(&manifest.storage, credentials.aws()).await?,
        )),
    }
}
