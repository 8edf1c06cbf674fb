//! Handler for `dlindex render`.

use std::path::Path;

use miette::Result;

use dlindex_ops::ops_discover::discover;
use dlindex_ops::ops_render::render;
use dlindex_util::errors::DlIndexError;
use dlindex_util::fs::write_atomic;
use dlindex_util::progress;

use super::Context;

pub async fn exec(ctx: &Context, output: Option<&Path>, json: bool) -> Result<()> {
    let project = ctx.project()?;
    let store = ctx.store(&project).await?;
    let found = discover(store.as_ref(), &project.manifest.collections).await?;
    let template = project.template()?;
    let rendered = render(&found.catalog, &project.manifest.site, template.as_deref())?;
    let document = if json { rendered.json } else { rendered.html };

    match output {
        Some(path) => {
            let path = ctx.cwd.join(path);
            write_atomic(&path, document.as_bytes()).map_err(DlIndexError::Io)?;
            progress::status(
                "Rendered",
                &format!(
                    "{} ({} artifact(s))",
                    path.display(),
                    found.catalog.artifact_count()
                ),
            );
        }
        None => print!("{document}"),
    }
    Ok(())
}
