use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use dlindex_util::errors::DlIndexError;

use crate::artifact::FileFilter;
use crate::properties::interpolate;
use crate::stage::StageConfig;

/// File name of the manifest looked up from the working directory upwards.
pub const MANIFEST_FILE: &str = "Index.toml";

/// Secrets file next to the manifest.
pub const ENV_FILE: &str = ".dlindex.env";

/// The parsed representation of an `Index.toml` file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexManifest {
    pub site: SiteConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default, rename = "collection")]
    pub collections: Vec<CollectionConfig>,

    #[serde(default)]
    pub stage: Option<StageConfig>,
}

/// The published page, from `[site]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SiteConfig {
    #[serde(default = "default_title")]
    pub title: String,
    /// Public URL the bucket is served under, e.g. `https://downloads.dcos.io`.
    pub base_url: String,
    #[serde(default = "default_index_key")]
    pub index_key: String,
    /// Where to publish the JSON manifest of the catalog, if anywhere.
    #[serde(default)]
    pub manifest_key: Option<String>,
    /// Custom HTML template, relative to the manifest directory.
    #[serde(default)]
    pub template: Option<PathBuf>,
    #[serde(default = "default_cache_control")]
    pub cache_control: String,
    /// Publish even when no artifact was found.
    #[serde(default)]
    pub allow_empty: bool,
}

fn default_title() -> String {
    "Downloads".to_string()
}

fn default_index_key() -> String {
    "index.html".to_string()
}

fn default_cache_control() -> String {
    "max-age=300".to_string()
}

/// Object storage backend selection from `[storage]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    S3,
    /// A local directory standing in for the bucket.
    Local,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: Backend,
    #[serde(default)]
    pub bucket: String,
    #[serde(default)]
    pub region: Option<String>,
    /// Custom S3 endpoint (MinIO, LocalStack).
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub path_style: bool,
    /// Root directory for the `local` backend, relative to the manifest directory.
    #[serde(default)]
    pub root: Option<PathBuf>,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            bucket: String::new(),
            region: None,
            endpoint: None,
            path_style: false,
            root: None,
            max_attempts: default_max_attempts(),
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}

/// One product line in the bucket, from `[[collection]]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CollectionConfig {
    pub name: String,
    #[serde(default)]
    pub title: Option<String>,
    pub prefix: String,
    #[serde(default)]
    pub include: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
    #[serde(default = "default_true")]
    pub include_prereleases: bool,
}

fn default_true() -> bool {
    true
}

impl CollectionConfig {
    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.name)
    }

    pub fn file_filter(&self) -> miette::Result<FileFilter> {
        FileFilter::new(&self.include, &self.exclude)
    }
}

impl IndexManifest {
    /// Parse and validate manifest text. `${env:VAR}` references are
    /// resolved against `env` before parsing.
    pub fn parse(content: &str, env: &BTreeMap<String, String>) -> miette::Result<Self> {
        let content = interpolate(content, env);
        let mut manifest: IndexManifest =
            toml::from_str(&content).map_err(|e| DlIndexError::Manifest {
                message: format!("Failed to parse {MANIFEST_FILE}: {e}"),
            })?;
        manifest.normalize();
        manifest.validate()?;
        Ok(manifest)
    }

    /// Read, interpolate and validate the manifest at `path`.
    pub fn load(path: &Path, env: &BTreeMap<String, String>) -> miette::Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| DlIndexError::Manifest {
            message: format!("Failed to read {}: {e}", path.display()),
        })?;
        Self::parse(&content, env)
    }

    fn normalize(&mut self) {
        self.site.base_url = self.site.base_url.trim_end_matches('/').to_string();
        self.site.index_key = self.site.index_key.trim_start_matches('/').to_string();
        if let Some(key) = self.site.manifest_key.as_mut() {
            *key = key.trim_start_matches('/').to_string();
        }
        for c in &mut self.collections {
            c.prefix = c.prefix.trim_matches('/').to_string();
        }
    }

    fn validate(&self) -> miette::Result<()> {
        let fail = |message: String| -> miette::Result<()> {
            Err(DlIndexError::Manifest { message }.into())
        };

        if self.site.base_url.is_empty() {
            return fail("[site] base-url must not be empty".to_string());
        }
        if self.site.index_key.is_empty() {
            return fail("[site] index-key must not be empty".to_string());
        }
        if self.site.manifest_key.as_deref() == Some(self.site.index_key.as_str()) {
            return fail("[site] manifest-key and index-key must differ".to_string());
        }
        match self.storage.backend {
            Backend::S3 if self.storage.bucket.is_empty() => {
                return fail("[storage] bucket is required for the s3 backend".to_string());
            }
            Backend::Local if self.storage.root.is_none() => {
                return fail("[storage] root is required for the local backend".to_string());
            }
            _ => {}
        }
        if self.storage.max_attempts == 0 {
            return fail("[storage] max-attempts must be at least 1".to_string());
        }
        if self.collections.is_empty() {
            return fail("At least one [[collection]] is required".to_string());
        }

        let mut names = BTreeSet::new();
        for c in &self.collections {
            if c.name.is_empty() {
                return fail("[[collection]] name must not be empty".to_string());
            }
            if !names.insert(c.name.as_str()) {
                return fail(format!("Duplicate collection '{}'", c.name));
            }
            c.file_filter()?;
        }

        if let Some(stage) = &self.stage {
            stage.steps()?;
        }
        Ok(())
    }

    /// Collection with the given name.
    pub fn collection(&self, name: &str) -> Option<&CollectionConfig> {
        self.collections.iter().find(|c| c.name == name)
    }
}
