//! Release artifacts and their bucket key layout.
//!
//! Artifacts are stored as
//! `<collection prefix>/<platform>/<arch>/<version>/<filename>`, e.g.
//! `cli/releases/binaries/dcos/linux/x86-64/0.8.0/dcos`. A checksum sidecar
//! sits next to its file as `<filename>.sha256`.

use std::fmt;

use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Serialize, Serializer};

use dlindex_util::errors::DlIndexError;

use crate::version::ReleaseVersion;

/// Suffix of checksum sidecar objects.
pub const CHECKSUM_SUFFIX: &str = ".sha256";

/// Operating system an artifact is built for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Platform {
    Linux,
    Darwin,
    Windows,
    Other(String),
}

impl Platform {
    pub fn parse(raw: &str) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "linux" => Platform::Linux,
            "darwin" | "macos" | "osx" => Platform::Darwin,
            "windows" | "win" => Platform::Windows,
            _ => Platform::Other(raw.to_string()),
        }
    }

    /// Directory name used in bucket keys.
    pub fn as_str(&self) -> &str {
        match self {
            Platform::Linux => "linux",
            Platform::Darwin => "darwin",
            Platform::Windows => "windows",
            Platform::Other(s) => s,
        }
    }

    /// Human-readable name shown in the index.
    pub fn label(&self) -> &str {
        match self {
            Platform::Linux => "Linux",
            Platform::Darwin => "macOS",
            Platform::Windows => "Windows",
            Platform::Other(s) => s,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Platform::Linux => 0,
            Platform::Darwin => 1,
            Platform::Windows => 2,
            Platform::Other(_) => 3,
        }
    }
}

impl Ord for Platform {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.rank()
            .cmp(&other.rank())
            .then_with(|| self.as_str().cmp(other.as_str()))
    }
}

impl PartialOrd for Platform {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Platform {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// The components of an artifact key below its collection prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPath<'a> {
    pub platform: &'a str,
    pub arch: &'a str,
    pub version: &'a str,
    pub filename: &'a str,
}

/// Split `key` into platform/arch/version/filename below `prefix`.
///
/// Returns `None` for keys outside the prefix or with any other shape.
pub fn parse_key<'a>(prefix: &str, key: &'a str) -> Option<ArtifactPath<'a>> {
    let rest = if prefix.is_empty() {
        key
    } else {
        key.strip_prefix(prefix)?.strip_prefix('/')?
    };
    let mut parts = rest.split('/');
    let path = ArtifactPath {
        platform: parts.next()?,
        arch: parts.next()?,
        version: parts.next()?,
        filename: parts.next()?,
    };
    if parts.next().is_some()
        || [path.platform, path.arch, path.version, path.filename]
            .iter()
            .any(|p| p.is_empty())
    {
        return None;
    }
    Some(path)
}

/// A downloadable file listed in the index.
#[derive(Debug, Clone, Serialize)]
pub struct Artifact {
    pub collection: String,
    pub platform: Platform,
    pub arch: String,
    pub version: ReleaseVersion,
    pub filename: String,
    pub key: String,
    pub size: u64,
    /// Unix seconds.
    pub last_modified: Option<i64>,
    pub checksum_key: Option<String>,
}

impl Artifact {
    /// Build an artifact from a parsed key.
    pub fn from_path(collection: &str, key: &str, path: &ArtifactPath<'_>) -> Self {
        Self {
            collection: collection.to_string(),
            platform: Platform::parse(path.platform),
            arch: path.arch.to_string(),
            version: ReleaseVersion::parse(path.version),
            filename: path.filename.to_string(),
            key: key.to_string(),
            size: 0,
            last_modified: None,
            checksum_key: None,
        }
    }

    /// Public download URL below `base_url`.
    pub fn url(&self, base_url: &str) -> String {
        join_url(base_url, &self.key)
    }

    /// Public URL of the checksum sidecar, if one was found.
    pub fn checksum_url(&self, base_url: &str) -> Option<String> {
        self.checksum_key.as_deref().map(|k| join_url(base_url, k))
    }
}

/// Join a base URL and an object key with exactly one slash.
pub fn join_url(base_url: &str, key: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        key.trim_start_matches('/')
    )
}

/// Filename filter built from a collection's `include` / `exclude` globs.
///
/// With no include patterns every file is included; exclude always wins.
#[derive(Debug, Clone)]
pub struct FileFilter {
    include: Option<GlobSet>,
    exclude: GlobSet,
}

impl FileFilter {
    pub fn new(include: &[String], exclude: &[String]) -> miette::Result<Self> {
        let include = if include.is_empty() {
            None
        } else {
            Some(build_globset(include)?)
        };
        Ok(Self {
            include,
            exclude: build_globset(exclude)?,
        })
    }

    pub fn matches(&self, filename: &str) -> bool {
        if self.exclude.is_match(filename) {
            return false;
        }
        self.include.as_ref().map_or(true, |g| g.is_match(filename))
    }
}

fn build_globset(patterns: &[String]) -> miette::Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|e| DlIndexError::Manifest {
            message: format!("Invalid glob pattern '{pattern}': {e}"),
        })?;
        builder.add(glob);
    }
    builder.build().map_err(|e| {
        DlIndexError::Manifest {
            message: format!("Failed to compile glob patterns: {e}"),
        }
        .into()
    })
}
