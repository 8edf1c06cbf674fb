//! Operation: check the public index against the bucket.
//!
//! The live page is fetched over HTTP and compared to a fresh rendering, and
//! every artifact link on it is probed with a HEAD request.

use std::time::Duration;

use futures_util::stream::{self, StreamExt};
use reqwest::{Client, StatusCode};

use dlindex_core::artifact::join_url;
use dlindex_store::ObjectStore;
use dlindex_util::errors::DlIndexError;
use dlindex_util::hash::sha256_bytes;

use crate::ops_discover::discover;
use crate::ops_render::render;
use crate::project::Project;

const MAX_RETRIES: u32 = 3;
const RETRY_DELAY: Duration = Duration::from_secs(2);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Parallel HEAD requests when none is configured.
pub const DEFAULT_CONCURRENCY: usize = 8;

#[derive(Debug, Clone, Copy)]
pub struct VerifyOptions {
    /// Probe every artifact and checksum link.
    pub check_links: bool,
    pub concurrency: usize,
}

impl Default for VerifyOptions {
    fn default() -> Self {
        Self {
            check_links: true,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokenLink {
    pub url: String,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct VerifyReport {
    pub index_url: String,
    /// Whether the live page equals what `publish` would upload now.
    pub index_matches: bool,
    /// Number of links probed.
    pub checked: usize,
    pub broken: Vec<BrokenLink>,
}

impl VerifyReport {
    pub fn is_ok(&self) -> bool {
        self.index_matches && self.broken.is_empty()
    }
}

/// Build the HTTP client used by `verify`.
pub fn build_client() -> miette::Result<Client> {
    Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .user_agent(concat!("dlindex/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| {
            DlIndexError::Network {
                message: format!("Failed to create HTTP client: {e}"),
            }
            .into()
        })
}

pub async fn verify(
    store: &dyn ObjectStore,
    project: &Project,
    client: &Client,
    opts: VerifyOptions,
) -> miette::Result<VerifyReport> {
    let site = &project.manifest.site;
    let discovery = discover(store, &project.manifest.collections).await?;
    let template = project.template()?;
    let expected = render(&discovery.catalog, site, template.as_deref())?;

    let index_url = join_url(&site.base_url, &site.index_key);
    let live = fetch(client, &index_url).await?;
    let index_matches = match &live {
        Some(body) => sha256_bytes(body) == sha256_bytes(expected.html.as_bytes()),
        None => false,
    };
    if live.is_none() {
        tracing::warn!("{index_url} does not exist");
    } else if !index_matches {
        tracing::warn!("{index_url} differs from the current bucket contents");
    }

    let mut urls = Vec::new();
    if opts.check_links {
        for artifact in discovery.catalog.artifacts() {
            urls.push(artifact.url(&site.base_url));
            if let Some(url) = artifact.checksum_url(&site.base_url) {
                urls.push(url);
            }
        }
    }

    let checked = urls.len();
    let mut broken: Vec<BrokenLink> = stream::iter(urls)
        .map(|url| async move {
            let result = probe(client, &url).await;
            result.err().map(|reason| BrokenLink { url, reason })
        })
        .buffer_unordered(opts.concurrency.max(1))
        .filter_map(|b| async move { b })
        .collect()
        .await;
    broken.sort_by(|a, b| a.url.cmp(&b.url));

    Ok(VerifyReport {
        index_url,
        index_matches,
        checked,
        broken,
    })
}

/// GET `url` with retries on timeouts, connection failures and 5xx.
/// `Ok(None)` for 404.
async fn fetch(client: &Client, url: &str) -> miette::Result<Option<Vec<u8>>> {
    let mut last_err = String::new();

    for attempt in 0..MAX_RETRIES {
        if attempt > 0 {
            tokio::time::sleep(RETRY_DELAY * attempt).await;
        }
        match client.get(url).send().await {
            Ok(resp) => {
                let status = resp.status();
                if status == StatusCode::NOT_FOUND {
                    return Ok(None);
                }
                if status.is_server_error() {
                    last_err = format!("HTTP {status} from {url}");
                    continue;
                }
                if !status.is_success() {
                    return Err(DlIndexError::Network {
                        message: format!("HTTP {status} fetching {url}"),
                    }
                    .into());
                }
                let bytes = resp.bytes().await.map_err(|e| DlIndexError::Network {
                    message: format!("Failed to read response from {url}: {e}"),
                })?;
                return Ok(Some(bytes.to_vec()));
            }
            Err(e) if e.is_timeout() || e.is_connect() => {
                last_err = format!("{e}");
                continue;
            }
            Err(e) => {
                return Err(DlIndexError::Network {
                    message: format!("Request to {url} failed: {e}"),
                }
                .into());
            }
        }
    }

    Err(DlIndexError::Network {
        message: format!("Failed after {MAX_RETRIES} retries for {url}: {last_err}"),
    }
    .into())
}

/// HEAD `url`; the error string describes why the link is broken.
async fn probe(client: &Client, url: &str) -> Result<(), String> {
    let mut last_err = String::new();
    for attempt in 0..MAX_RETRIES {
        if attempt > 0 {
            tokio::time::sleep(RETRY_DELAY * attempt).await;
        }
        match client.head(url).send().await {
            Ok(resp) if resp.status().is_success() => return Ok(()),
            Ok(resp) if resp.status().is_server_error() => {
                last_err = format!("HTTP {}", resp.status());
            }
            Ok(resp) => return Err(format!("HTTP {}", resp.status())),
            Err(e) if e.is_timeout() || e.is_connect() => last_err = e.to_string(),
            Err(e) => return Err(e.to_string()),
        }
    }
    Err(last_err)
}
