//! Handler for `dlindex verify`.

use miette::Result;

use dlindex_ops::ops_verify::{self, VerifyOptions};
use dlindex_util::errors::DlIndexError;
use dlindex_util::progress;

use super::Context;

pub async fn exec(ctx: &Context, skip_links: bool, jobs: usize) -> Result<()> {
    let project = ctx.project()?;
    let store = ctx.store(&project).await?;
    let client = ops_verify::build_client()?;

    let spinner = progress::spinner("Checking the public index");
    let report = ops_verify::verify(
        store.as_ref(),
        &project,
        &client,
        VerifyOptions {
            check_links: !skip_links,
            concurrency: jobs,
        },
    )
    .await;
    spinner.finish_and_clear();
    let report = report?;

    if report.index_matches {
        progress::status("Current", &report.index_url);
    } else {
        progress::status_error("Stale", &format!("{} (run `dlindex publish`)", report.index_url));
    }
    for link in &report.broken {
        progress::status_error("Broken", &format!("{} ({})", link.url, link.reason));
    }
    if !skip_links {
        progress::status_info(
            "Checked",
            &format!("{} link(s), {} broken", report.checked, report.broken.len()),
        );
    }

    if report.is_ok() {
        Ok(())
    } else {
        Err(DlIndexError::Generic {
            message: "Verification failed".to_string(),
        }
        .into())
    }
}
