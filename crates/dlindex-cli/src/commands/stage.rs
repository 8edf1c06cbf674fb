//! Handler for `dlindex stage`.

use std::path::Path;

use miette::Result;

use dlindex_core::credentials::CredentialBinding;
use dlindex_core::stage::StepAction;
use dlindex_ops::ops_stage::{self, StageOptions};
use dlindex_util::errors::DlIndexError;
use dlindex_util::progress;

use super::Context;
use crate::cli::StageAction;

pub async fn exec(ctx: &Context, action: StageAction) -> Result<()> {
    match action {
        StageAction::Show => show(ctx),
        StageAction::Run {
            ignore_label,
            agent_labels,
        } => {
            let project = ctx.project()?;
            let opts = StageOptions {
                agent_labels,
                ignore_label,
                local_root: ctx.local_root.clone(),
            };
            // Steps lead their own process groups, so the terminal's SIGINT
            // never reaches them. Dropping the run kills them instead.
            let report = tokio::select! {
                report = ops_stage::run_stage(&project, &opts) => report?,
                _ = tokio::signal::ctrl_c() => {
                    let stage = ops_stage::stage_config(&project)?.name.clone();
                    return Err(DlIndexError::Interrupted { stage }.into());
                }
            };
            progress::status(
                "Finished",
                &format!(
                    "stage '{}' ({} step(s)) in {:.1}s",
                    report.stage,
                    report.steps.len(),
                    report.elapsed.as_secs_f64()
                ),
            );
            Ok(())
        }
    }
}

/// Print the stage. Credentials show as `VAR <- id` with whether the id
/// resolves; values are never printed.
fn show(ctx: &Context) -> Result<()> {
    let project = ctx.project()?;
    let stage = ops_stage::stage_config(&project)?;
    let steps = stage.steps()?;

    println!("Stage: {}", stage.name);
    println!(
        "  agent label: {}",
        stage.agent_label.as_deref().unwrap_or("(any)")
    );
    println!("  timeout: {}", stage.timeout_display());
    println!(
        "  working dir: {}",
        project
            .root
            .join(stage.working_dir.as_deref().unwrap_or(Path::new(".")))
            .display()
    );

    if !stage.credentials.is_empty() {
        println!("  credentials:");
        for (env_var, id) in &stage.credentials {
            let single = [(env_var.clone(), id.clone())].into_iter().collect();
            let state = match CredentialBinding::resolve(&single, &project.env) {
                Ok(_) => "bound",
                Err(_) => "missing",
            };
            println!("    {env_var} <- {id} ({state})");
        }
    }

    println!("  steps:");
    for (i, step) in steps.iter().enumerate() {
        match &step.action {
            StepAction::Shell(script) => println!("    {}. {}: {script}", i + 1, step.name),
            StepAction::Builtin(b) => println!("    {}. {} (builtin {})", i + 1, step.name, b.as_str()),
        }
    }
    Ok(())
}
