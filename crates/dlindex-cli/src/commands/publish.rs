//! Handler for `dlindex publish`.

use miette::Result;

use dlindex_ops::ops_publish::{self, DocumentStatus, PublishOptions};
use dlindex_util::progress;

use super::Context;

pub async fn exec(ctx: &Context, dry_run: bool, force: bool) -> Result<()> {
    let project = ctx.project()?;
    let store = ctx.store(&project).await?;

    let report =
        ops_publish::publish(store.as_ref(), &project, PublishOptions { dry_run, force }).await?;

    for doc in &report.documents {
        match doc.status {
            DocumentStatus::Unchanged => progress::status_info("Unchanged", &doc.key),
            DocumentStatus::WouldUpload => progress::status_warn("Would upload", &doc.key),
            DocumentStatus::Uploaded => {}
        }
    }
    if report.skipped > 0 {
        progress::status_warn(
            "Skipped",
            &format!("{} object(s) not indexed (run `dlindex list -v`)", report.skipped),
        );
    }
    progress::status("Finished", &report.summary());
    Ok(())
}
