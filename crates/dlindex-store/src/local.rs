//! A local directory used as a bucket. Keys map to relative paths.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;

use dlindex_util::errors::DlIndexError;
use dlindex_util::hash::md5_hex;

use crate::traits::{dir_prefix, ObjectInfo, ObjectStore, PutOptions};

/// Temporary files from in-flight writes start with this and are never listed.
const TMP_PREFIX: &str = ".tmp";

#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Map a key to a path under the root, refusing keys that escape it.
    fn path_for(&self, key: &str) -> miette::Result<PathBuf> {
        let rel = Path::new(key.trim_start_matches('/'));
        let escapes = rel
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if key.trim_start_matches('/').is_empty() || escapes {
            return Err(DlIndexError::Storage {
                message: format!("Invalid object key '{key}'"),
            }
            .into());
        }
        Ok(self.root.join(rel))
    }
}

fn info_for(key: String, meta: &std::fs::Metadata, etag: Option<String>) -> ObjectInfo {
    let last_modified = meta
        .modified()
        .ok()
        .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
        .map(|d| d.as_secs() as i64);
    ObjectInfo {
        key,
        size: meta.len(),
        last_modified,
        etag,
    }
}

fn walk(root: &Path, dir: &Path, out: &mut Vec<ObjectInfo>) -> std::io::Result<()> {
    let entries = match std::fs::read_dir(dir) {
        Ok(e) => e,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e),
    };
    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        let meta = entry.metadata()?;
        if meta.is_dir() {
            walk(root, &path, out)?;
            continue;
        }
        if entry.file_name().to_string_lossy().starts_with(TMP_PREFIX) {
            continue;
        }
        let Ok(rel) = path.strip_prefix(root) else {
            continue;
        };
        let key = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        out.push(info_for(key, &meta, None));
    }
    Ok(())
}

#[async_trait]
impl ObjectStore for LocalStore {
    fn describe(&self) -> String {
        format!("file://{}", self.root.display())
    }

    async fn list(&self, prefix: &str) -> miette::Result<Vec<ObjectInfo>> {
        let root = self.root.clone();
        let dir = root.join(dir_prefix(prefix));
        let mut objects = tokio::task::spawn_blocking(move || {
            let mut out = Vec::new();
            walk(&root, &dir, &mut out).map(|_| out)
        })
        .await
        .map_err(|e| DlIndexError::Storage {
            message: format!("Listing task failed: {e}"),
        })?
        .map_err(|e| DlIndexError::Storage {
            message: format!("Failed to list {}: {e}", self.root.display()),
        })?;
        objects.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(objects)
    }

    async fn head(&self, key: &str) -> miette::Result<Option<ObjectInfo>> {
        let path = self.path_for(key)?;
        match tokio::fs::read(&path).await {
            Ok(data) => {
                let meta = tokio::fs::metadata(&path).await.map_err(DlIndexError::Io)?;
                Ok(Some(info_for(key.to_string(), &meta, Some(md5_hex(&data)))))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(DlIndexError::Storage {
                message: format!("Failed to read {}: {e}", path.display()),
            }
            .into()),
        }
    }

    async fn get(&self, key: &str) -> miette::Result<Option<Vec<u8>>> {
        let path = self.path_for(key)?;
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(DlIndexError::Storage {
                message: format!("Failed to read {}: {e}", path.display()),
            }
            .into()),
        }
    }

    async fn put(&self, key: &str, data: &[u8], options: &PutOptions) -> miette::Result<()> {
        let path = self.path_for(key)?;
        let data = data.to_vec();
        let target = path.clone();
        tokio::task::spawn_blocking(move || dlindex_util::fs::write_atomic(&target, &data))
            .await
            .map_err(|e| DlIndexError::Storage {
                message: format!("Write task failed: {e}"),
            })?
            .map_err(|e| DlIndexError::Storage {
                message: format!("Failed to write {}: {e}", path.display()),
            })?;
        tracing::debug!(
            "Wrote {} ({})",
            path.display(),
            options.content_type.as_deref().unwrap_or("no content type")
        );
        Ok(())
    }
}
