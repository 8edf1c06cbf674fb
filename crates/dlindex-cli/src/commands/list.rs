//! Handler for `dlindex list`.

use console::Style;
use indicatif::HumanBytes;
use miette::Result;

use dlindex_ops::ops_discover::discover;
use dlindex_util::errors::DlIndexError;
use dlindex_util::progress;

use super::Context;

pub async fn exec(ctx: &Context, only: Option<&str>) -> Result<()> {
    let project = ctx.project()?;
    let collections = match only {
        Some(name) => vec![project
            .manifest
            .collection(name)
            .cloned()
            .ok_or_else(|| DlIndexError::Manifest {
                message: format!("No collection named '{name}'"),
            })?],
        None => project.manifest.collections.clone(),
    };

    let store = ctx.store(&project).await?;
    let spinner = progress::spinner(&format!("Listing {}", store.describe()));
    let found = discover(store.as_ref(), &collections).await;
    spinner.finish_and_clear();
    let found = found?;

    let heading = Style::new().bold();
    for listing in &found.catalog.collections {
        println!("{}", heading.apply_to(&listing.title));
        if listing.releases.is_empty() {
            println!("  (no releases)");
            continue;
        }
        for release in &listing.releases {
            for artifact in &release.artifacts {
                println!(
                    "  {:<14} {:<20} {:<28} {:>10}{}",
                    release.version.as_str(),
                    format!("{}/{}", artifact.platform, artifact.arch),
                    artifact.filename,
                    HumanBytes(artifact.size).to_string(),
                    if artifact.checksum_key.is_some() { "  sha256" } else { "" }
                );
            }
        }
    }

    if !found.skipped.is_empty() {
        progress::status_warn(
            "Skipped",
            &format!("{} object(s) outside the artifact layout or filters", found.skipped.len()),
        );
        for key in &found.skipped {
            tracing::debug!("skipped {key}");
        }
    }
    Ok(())
}
