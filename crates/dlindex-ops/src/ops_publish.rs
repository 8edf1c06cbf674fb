//! Operation: regenerate the index from the bucket and upload it.
//!
//! Uploads are skipped when the stored document already has the same
//! content, so re-running against an unchanged bucket writes nothing.

use std::fmt;

use dlindex_store::{ObjectStore, PutOptions};
use dlindex_util::errors::DlIndexError;
use dlindex_util::hash::{md5_hex, sha256_bytes};
use dlindex_util::progress;

use crate::ops_discover::discover;
use crate::ops_render::render;
use crate::project::Project;

const HTML_CONTENT_TYPE: &str = "text/html; charset=utf-8";
const JSON_CONTENT_TYPE: &str = "application/json";

/// Options for [`publish`].
#[derive(Debug, Clone, Copy, Default)]
pub struct PublishOptions {
    /// Render and compare, never upload.
    pub dry_run: bool,
    /// Upload even when the stored document is identical.
    pub force: bool,
}

/// What happened to one index document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentStatus {
    Unchanged,
    Uploaded,
    WouldUpload,
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DocumentStatus::Unchanged => "unchanged",
            DocumentStatus::Uploaded => "uploaded",
            DocumentStatus::WouldUpload => "would upload",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentOutcome {
    pub key: String,
    pub status: DocumentStatus,
}

/// Result of a publish run.
#[derive(Debug, Clone)]
pub struct PublishReport {
    /// Artifacts listed in the index.
    pub artifacts: usize,
    /// Keys under collection prefixes that were left out.
    pub skipped: usize,
    pub documents: Vec<DocumentOutcome>,
}

impl PublishReport {
    pub fn summary(&self) -> String {
        let changed = self
            .documents
            .iter()
            .filter(|d| d.status != DocumentStatus::Unchanged)
            .count();
        let verb = if self
            .documents
            .iter()
            .any(|d| d.status == DocumentStatus::WouldUpload)
        {
            "would change"
        } else {
            "changed"
        };
        format!(
            "{} artifact(s) indexed, {changed} of {} document(s) {verb}",
            self.artifacts,
            self.documents.len()
        )
    }
}

/// Discover, render and upload the index documents of `project`.
///
/// The JSON manifest goes up before the HTML page so a reader that follows
/// the page to the manifest never sees an older manifest.
pub async fn publish(
    store: &dyn ObjectStore,
    project: &Project,
    opts: PublishOptions,
) -> miette::Result<PublishReport> {
    let site = &project.manifest.site;

    let spinner = progress::spinner(&format!("Listing {}", store.describe()));
    let discovery = discover(store, &project.manifest.collections).await;
    spinner.finish_and_clear();
    let discovery = discovery?;

    if discovery.catalog.is_empty() && !site.allow_empty {
        return Err(DlIndexError::Storage {
            message: format!(
                "No artifacts found in {}; refusing to publish an empty index \
                 (set allow-empty = true in [site] to override)",
                store.describe()
            ),
        }
        .into());
    }

    let template = project.template()?;
    let rendered = render(&discovery.catalog, site, template.as_deref())?;

    let put_options = |content_type: &str| PutOptions {
        content_type: Some(content_type.to_string()),
        cache_control: Some(site.cache_control.clone()),
    };

    let mut uploads: Vec<(&str, &[u8], PutOptions)> = Vec::new();
    if let Some(key) = &site.manifest_key {
        uploads.push((key.as_str(), rendered.json.as_bytes(), put_options(JSON_CONTENT_TYPE)));
    }
    uploads.push((
        site.index_key.as_str(),
        rendered.html.as_bytes(),
        put_options(HTML_CONTENT_TYPE),
    ));

    let mut documents = Vec::with_capacity(uploads.len());
    for (key, data, options) in uploads {
        let changed = opts.force || needs_upload(store, key, data).await?;
        let status = match (changed, opts.dry_run) {
            (false, _) => DocumentStatus::Unchanged,
            (true, true) => DocumentStatus::WouldUpload,
            (true, false) => {
                progress::status("Uploading", key);
                store.put(key, data, &options).await?;
                DocumentStatus::Uploaded
            }
        };
        tracing::info!("{key}: {status}");
        documents.push(DocumentOutcome {
            key: key.to_string(),
            status,
        });
    }

    Ok(PublishReport {
        artifacts: discovery.catalog.artifact_count(),
        skipped: discovery.skipped.len(),
        documents,
    })
}

/// Whether the object at `key` differs from `data`.
///
/// Single-part ETags are the MD5 of the body. Multipart ETags (`<md5>-<n>`)
/// are not, so the stored body is fetched and compared by SHA-256.
async fn needs_upload(store: &dyn ObjectStore, key: &str, data: &[u8]) -> miette::Result<bool> {
    let Some(info) = store.head(key).await? else {
        tracing::debug!("{key} does not exist yet");
        return Ok(true);
    };
    match info.etag.as_deref() {
        Some(etag) if !etag.contains('-') => Ok(!etag.eq_ignore_ascii_case(&md5_hex(data))),
        _ => {
            let stored = store.get(key).await?;
            Ok(stored.map_or(true, |s| sha256_bytes(&s) != sha256_bytes(data)))
        }
    }
}
