//! The storage interface the publisher works against.

use async_trait::async_trait;

/// Information about an object from list/head operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectInfo {
    /// Object key, `/`-separated.
    pub key: String,
    /// Object size in bytes.
    pub size: u64,
    /// Last modified timestamp (Unix epoch seconds).
    pub last_modified: Option<i64>,
    /// ETag without quotes (the MD5 hex for single-part uploads).
    pub etag: Option<String>,
}

/// Headers written with an object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PutOptions {
    pub content_type: Option<String>,
    pub cache_control: Option<String>,
}

/// Minimal object store operations.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Human-readable location, e.g. `s3://downloads.dcos.io`.
    fn describe(&self) -> String;

    /// Every object below `prefix/` (everything for an empty prefix), sorted by key.
    async fn list(&self, prefix: &str) -> miette::Result<Vec<ObjectInfo>>;

    /// Metadata of `key`, or `None` if it does not exist.
    async fn head(&self, key: &str) -> miette::Result<Option<ObjectInfo>>;

    /// Contents of `key`, or `None` if it does not exist.
    async fn get(&self, key: &str) -> miette::Result<Option<Vec<u8>>>;

    /// Create or replace `key` in a single write.
    async fn put(&self, key: &str, data: &[u8], options: &PutOptions) -> miette::Result<()>;
}

/// The listing prefix for a directory-like `prefix`.
pub(crate) fn dir_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("{trimmed}/")
    }
}
