//! Locating and loading an index project: `Index.toml` plus `.dlindex.env`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use dlindex_core::credentials::{
    CredentialBinding, AWS_ACCESS_KEY_ID, AWS_SECRET_ACCESS_KEY, AWS_SESSION_TOKEN,
};
use dlindex_core::manifest::{IndexManifest, ENV_FILE, MANIFEST_FILE};
use dlindex_core::properties::load_env_file;
use dlindex_util::errors::DlIndexError;
use dlindex_util::fs::find_ancestor_with;

/// A loaded manifest and the directory it lives in.
#[derive(Debug, Clone)]
pub struct Project {
    pub manifest: IndexManifest,
    pub manifest_path: PathBuf,
    /// Directory containing the manifest; relative paths resolve against it.
    pub root: PathBuf,
    /// Entries of `.dlindex.env`.
    pub env: BTreeMap<String, String>,
}

impl Project {
    /// Load `explicit`, or the nearest `Index.toml` at or above `cwd`.
    pub fn locate(explicit: Option<&Path>, cwd: &Path) -> miette::Result<Self> {
        let manifest_path = match explicit {
            Some(p) if p.is_absolute() => p.to_path_buf(),
            Some(p) => cwd.join(p),
            None => find_ancestor_with(cwd, MANIFEST_FILE)
                .map(|dir| dir.join(MANIFEST_FILE))
                .ok_or_else(|| DlIndexError::Manifest {
                    message: format!(
                        "Could not find {MANIFEST_FILE} in this directory or any parent"
                    ),
                })?,
        };
        if !manifest_path.is_file() {
            return Err(DlIndexError::Manifest {
                message: format!("{} does not exist", manifest_path.display()),
            }
            .into());
        }
        let root = manifest_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Self::load(&manifest_path, &root)
    }

    fn load(manifest_path: &Path, root: &Path) -> miette::Result<Self> {
        let env = load_env_file(&root.join(ENV_FILE))?;
        let manifest = IndexManifest::load(manifest_path, &env)?;
        tracing::debug!(
            "Loaded {} ({} collection(s))",
            manifest_path.display(),
            manifest.collections.len()
        );
        Ok(Self {
            manifest,
            manifest_path: manifest_path.to_path_buf(),
            root: root.to_path_buf(),
            env,
        })
    }

    /// Contents of the configured custom template, if any.
    pub fn template(&self) -> miette::Result<Option<String>> {
        let Some(rel) = &self.manifest.site.template else {
            return Ok(None);
        };
        let path = self.root.join(rel);
        std::fs::read_to_string(&path)
            .map(Some)
            .map_err(|e| {
                DlIndexError::Render {
                    message: format!("Failed to read template {}: {e}", path.display()),
                }
                .into()
            })
    }

    /// AWS credentials from `.dlindex.env` or the process environment, for
    /// commands run outside a stage.
    pub fn ambient_credentials(&self) -> CredentialBinding {
        CredentialBinding::from_env(
            &[AWS_ACCESS_KEY_ID, AWS_SECRET_ACCESS_KEY, AWS_SESSION_TOKEN],
            &self.env,
        )
    }
}
