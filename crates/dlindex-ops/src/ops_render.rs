//! Operation: render the catalog as the HTML index page and its JSON twin.
//!
//! Output is a pure function of the catalog and the site settings. No
//! wall-clock time goes into it, so rendering the same bucket twice yields
//! byte-identical documents.

use std::collections::BTreeMap;
use std::fmt::Write;

use chrono::DateTime;
use indicatif::HumanBytes;
use serde::Serialize;

use dlindex_core::artifact::Artifact;
use dlindex_core::catalog::{Catalog, CollectionListing, Release};
use dlindex_core::manifest::SiteConfig;
use dlindex_util::errors::DlIndexError;

/// Built-in page layout.
pub const DEFAULT_TEMPLATE: &str = include_str!("../templates/index.html");

/// Placeholder a template must contain.
const COLLECTIONS_PLACEHOLDER: &str = "{{collections}}";

/// The rendered documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedIndex {
    pub html: String,
    pub json: String,
}

/// Variables available for `{{variable}}` interpolation in the template.
struct TemplateContext {
    vars: BTreeMap<&'static str, String>,
}

impl TemplateContext {
    /// Single pass, so substituted values are never scanned for placeholders.
    /// Unknown placeholders are left as they are.
    fn interpolate(&self, template: &str) -> String {
        let mut result = String::with_capacity(template.len());
        let mut rest = template;
        while let Some(start) = rest.find("{{") {
            result.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            match after.find("}}") {
                Some(end) => {
                    let name = &after[..end];
                    match self.vars.get(name) {
                        Some(value) => result.push_str(value),
                        None => {
                            result.push_str("{{");
                            result.push_str(name);
                            result.push_str("}}");
                        }
                    }
                    rest = &after[end + 2..];
                }
                None => {
                    result.push_str(&rest[start..]);
                    rest = "";
                }
            }
        }
        result.push_str(rest);
        result
    }
}

/// Render `catalog` with the built-in layout or a custom `template`.
pub fn render(
    catalog: &Catalog,
    site: &SiteConfig,
    template: Option<&str>,
) -> miette::Result<RenderedIndex> {
    let template = template.unwrap_or(DEFAULT_TEMPLATE);
    if !template.contains(COLLECTIONS_PLACEHOLDER) {
        return Err(DlIndexError::Render {
            message: format!("Template does not contain {COLLECTIONS_PLACEHOLDER}"),
        }
        .into());
    }

    let updated = catalog
        .last_modified()
        .map(format_timestamp)
        .unwrap_or_else(|| "never".to_string());

    let mut sections = String::new();
    for listing in &catalog.collections {
        render_collection(&mut sections, listing, &site.base_url);
    }

    let ctx = TemplateContext {
        vars: BTreeMap::from([
            ("title", escape_html(&site.title)),
            ("base_url", escape_html(&site.base_url)),
            ("updated", updated),
            ("artifact_count", catalog.artifact_count().to_string()),
            ("collections", sections),
        ]),
    };

    Ok(RenderedIndex {
        html: ctx.interpolate(template),
        json: render_json(catalog, site)?,
    })
}

fn render_collection(out: &mut String, listing: &CollectionListing, base_url: &str) {
    let id = anchor(&listing.name);
    let _ = writeln!(out, "  <section id=\"{id}\">");
    let _ = writeln!(out, "    <h2>{}</h2>", escape_html(&listing.title));

    if listing.releases.is_empty() {
        let _ = writeln!(out, "    <p class=\"meta\">No releases published yet.</p>");
        let _ = writeln!(out, "  </section>");
        return;
    }

    if let Some(latest) = listing.latest_release() {
        let version = escape_html(latest.version.as_str());
        let _ = writeln!(
            out,
            "    <p>Latest release: <a href=\"#{id}-{}\">{version}</a></p>",
            anchor(latest.version.as_str())
        );
    }

    let _ = writeln!(out, "    <table>");
    let _ = writeln!(
        out,
        "      <thead><tr><th>Version</th><th>Platform</th><th>File</th><th>Size</th><th>Updated</th><th>Checksum</th></tr></thead>"
    );
    let _ = writeln!(out, "      <tbody>");
    for release in &listing.releases {
        render_release(out, &id, release, base_url);
    }
    let _ = writeln!(out, "      </tbody>");
    let _ = writeln!(out, "    </table>");
    let _ = writeln!(out, "  </section>");
}

fn render_release(out: &mut String, collection_id: &str, release: &Release, base_url: &str) {
    let version = &release.version;
    let tag = if version.is_channel() {
        " <span class=\"tag channel\">channel</span>"
    } else if version.is_prerelease() {
        " <span class=\"tag\">pre-release</span>"
    } else {
        ""
    };

    for (i, artifact) in release.artifacts.iter().enumerate() {
        if i == 0 {
            let _ = write!(
                out,
                "        <tr id=\"{collection_id}-{}\"><td class=\"version\" rowspan=\"{}\">{}{tag}</td>",
                anchor(version.as_str()),
                release.artifacts.len(),
                escape_html(version.as_str())
            );
        } else {
            let _ = write!(out, "        <tr>");
        }
        render_artifact_cells(out, artifact, base_url);
        let _ = writeln!(out, "</tr>");
    }
}

fn render_artifact_cells(out: &mut String, artifact: &Artifact, base_url: &str) {
    let checksum = match artifact.checksum_url(base_url) {
        Some(url) => format!("<a href=\"{}\">sha256</a>", escape_html(&url)),
        None => String::new(),
    };
    let _ = write!(
        out,
        "<td>{} {}</td><td><a href=\"{}\">{}</a></td><td>{}</td><td>{}</td><td>{checksum}</td>",
        escape_html(artifact.platform.label()),
        escape_html(&artifact.arch),
        escape_html(&artifact.url(base_url)),
        escape_html(&artifact.filename),
        HumanBytes(artifact.size),
        artifact.last_modified.map(format_date).unwrap_or_default(),
    );
}

#[derive(Serialize)]
struct IndexDocument<'a> {
    title: &'a str,
    base_url: &'a str,
    updated: Option<String>,
    collections: Vec<CollectionDocument<'a>>,
}

#[derive(Serialize)]
struct CollectionDocument<'a> {
    name: &'a str,
    title: &'a str,
    latest: Option<&'a str>,
    releases: Vec<ReleaseDocument<'a>>,
}

#[derive(Serialize)]
struct ReleaseDocument<'a> {
    version: &'a str,
    channel: bool,
    prerelease: bool,
    artifacts: Vec<ArtifactDocument<'a>>,
}

#[derive(Serialize)]
struct ArtifactDocument<'a> {
    platform: &'a str,
    arch: &'a str,
    filename: &'a str,
    url: String,
    size: u64,
    last_modified: Option<String>,
    sha256_url: Option<String>,
}

fn render_json(catalog: &Catalog, site: &SiteConfig) -> miette::Result<String> {
    let doc = IndexDocument {
        title: &site.title,
        base_url: &site.base_url,
        updated: catalog.last_modified().map(format_rfc3339),
        collections: catalog
            .collections
            .iter()
            .map(|c| CollectionDocument {
                name: &c.name,
                title: &c.title,
                latest: c.latest_release().map(|r| r.version.as_str()),
                releases: c
                    .releases
                    .iter()
                    .map(|r| ReleaseDocument {
                        version: r.version.as_str(),
                        channel: r.version.is_channel(),
                        prerelease: r.version.is_prerelease(),
                        artifacts: r
                            .artifacts
                            .iter()
                            .map(|a| ArtifactDocument {
                                platform: a.platform.as_str(),
                                arch: &a.arch,
                                filename: &a.filename,
                                url: a.url(&site.base_url),
                                size: a.size,
                                last_modified: a.last_modified.map(format_rfc3339),
                                sha256_url: a.checksum_url(&site.base_url),
                            })
                            .collect(),
                    })
                    .collect(),
            })
            .collect(),
    };
    let mut json = serde_json::to_string_pretty(&doc).map_err(|e| DlIndexError::Render {
        message: format!("Failed to serialize index JSON: {e}"),
    })?;
    json.push('\n');
    Ok(json)
}

/// Escape text for use in HTML content and double-quoted attributes.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// An HTML id fragment: ASCII alphanumerics, `-`, `_` and `.` survive,
/// everything else becomes `-`.
fn anchor(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '-'
            }
        })
        .collect()
}

fn format_date(secs: i64) -> String {
    DateTime::from_timestamp(secs, 0)
        .map(|t| t.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

fn format_timestamp(secs: i64) -> String {
    DateTime::from_timestamp(secs, 0)
        .map(|t| t.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|| "never".to_string())
}

fn format_rfc3339(secs: i64) -> String {
    DateTime::from_timestamp(secs, 0)
        .map(|t| t.to_rfc3339())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_markup() {
        assert_eq!(
            escape_html("<a href=\"x\">Tom & 'Jerry'</a>"),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; &#39;Jerry&#39;&lt;/a&gt;"
        );
    }

    #[test]
    fn interpolation_does_not_rescan_values() {
        let ctx = TemplateContext {
            vars: BTreeMap::from([("a", "{{b}}".to_string()), ("b", "x".to_string())]),
        };
        assert_eq!(ctx.interpolate("{{a}} {{b}} {{c}} {{"), "{{b}} x {{c}} {{");
    }

    #[test]
    fn anchors_are_id_safe() {
        assert_eq!(anchor("dcos core/cli"), "dcos-core-cli");
        assert_eq!(anchor("1.0.0-rc1"), "1.0.0-rc1");
    }

    #[test]
    fn dates_are_utc() {
        assert_eq!(format_date(0), "1970-01-01");
        assert_eq!(format_timestamp(86_400 + 3_600), "1970-01-02 01:00 UTC");
        assert_eq!(format_rfc3339(0), "1970-01-01T00:00:00+00:00");
    }
}
