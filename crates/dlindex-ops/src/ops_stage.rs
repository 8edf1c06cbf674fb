//! Operation: run the `[stage]` of `Index.toml` the way the CI agent does.
//!
//! Steps run in order under one wall-clock limit with the stage's
//! credentials bound into their environment. The first failing step ends the
//! stage.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use dlindex_core::credentials::CredentialBinding;
use dlindex_core::stage::{Builtin, StageConfig, Step, StepAction, AGENT_LABELS_ENV};
use dlindex_store::open_store;
use dlindex_util::errors::DlIndexError;
use dlindex_util::process::CommandBuilder;
use dlindex_util::progress;

use crate::ops_publish::{publish, PublishOptions};
use crate::project::Project;

#[derive(Debug, Clone, Default)]
pub struct StageOptions {
    /// Labels of the executing agent; `NODE_LABELS` when unset.
    pub agent_labels: Option<String>,
    /// Run even if the agent lacks the stage's label.
    pub ignore_label: bool,
    /// Directory to use as the bucket for builtin steps.
    pub local_root: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct StepOutcome {
    pub name: String,
    pub elapsed: Duration,
}

#[derive(Debug, Clone)]
pub struct StageReport {
    pub stage: String,
    pub steps: Vec<StepOutcome>,
    pub elapsed: Duration,
}

/// The configured stage, or a manifest error naming the missing section.
pub fn stage_config(project: &Project) -> miette::Result<&StageConfig> {
    project.manifest.stage.as_ref().ok_or_else(|| {
        DlIndexError::Manifest {
            message: format!("{} has no [stage] section", project.manifest_path.display()),
        }
        .into()
    })
}

/// Run the project's stage to completion, failure or timeout.
pub async fn run_stage(project: &Project, opts: &StageOptions) -> miette::Result<StageReport> {
    let stage = stage_config(project)?;
    let steps = stage.steps()?;

    check_agent(stage, opts)?;

    let workdir = project
        .root
        .join(stage.working_dir.as_deref().unwrap_or(Path::new(".")));
    if !workdir.is_dir() {
        return Err(DlIndexError::Manifest {
            message: format!(
                "Working directory {} of stage '{}' does not exist",
                workdir.display(),
                stage.name
            ),
        }
        .into());
    }

    let binding = CredentialBinding::resolve(&stage.credentials, &project.env)?;

    progress::status_info(
        "Stage",
        &format!(
            "{} ({} step(s), timeout {})",
            stage.name,
            steps.len(),
            stage.timeout_display()
        ),
    );

    let started = Instant::now();
    let run = run_steps(project, stage, &steps, &workdir, &binding, opts);
    let outcomes = match tokio::time::timeout(stage.timeout, run).await {
        Ok(result) => result?,
        Err(_) => {
            progress::status_error("Timeout", &stage.name);
            return Err(DlIndexError::Timeout {
                stage: stage.name.clone(),
                limit: stage.timeout_display(),
            }
            .into());
        }
    };

    Ok(StageReport {
        stage: stage.name.clone(),
        steps: outcomes,
        elapsed: started.elapsed(),
    })
}

fn check_agent(stage: &StageConfig, opts: &StageOptions) -> miette::Result<()> {
    let Some(required) = &stage.agent_label else {
        return Ok(());
    };
    let available = opts
        .agent_labels
        .clone()
        .or_else(|| std::env::var(AGENT_LABELS_ENV).ok())
        .unwrap_or_default();
    if stage.accepts_agent(&available) {
        return Ok(());
    }
    if opts.ignore_label {
        tracing::warn!("Agent lacks label '{required}'; running anyway");
        return Ok(());
    }
    Err(DlIndexError::Generic {
        message: format!(
            "Stage '{}' requires an agent labelled '{required}' (available: {})",
            stage.name,
            if available.trim().is_empty() {
                "none"
            } else {
                available.trim()
            }
        ),
    }
    .into())
}

async fn run_steps(
    project: &Project,
    stage: &StageConfig,
    steps: &[Step],
    workdir: &Path,
    binding: &CredentialBinding,
    opts: &StageOptions,
) -> miette::Result<Vec<StepOutcome>> {
    let mut outcomes = Vec::with_capacity(steps.len());

    for step in steps {
        progress::status("Running", &step.name);
        let started = Instant::now();

        match &step.action {
            StepAction::Shell(script) => {
                let mut cmd = CommandBuilder::shell(script.as_str()).cwd(workdir);
                for (name, value) in binding.env_pairs() {
                    cmd = cmd.env(name, value);
                }
                let status = cmd.run_streaming(&binding.redactor()).await?;
                if !status.success() {
                    let exit_code = status.code().unwrap_or(-1);
                    progress::status_error("Failed", &format!("{} ({status})", step.name));
                    return Err(DlIndexError::StageFailed {
                        stage: stage.name.clone(),
                        step: step.name.clone(),
                        exit_code,
                    }
                    .into());
                }
            }
            StepAction::Builtin(Builtin::PublishIndex) => {
                let store = open_store(
                    &project.manifest,
                    &project.root,
                    binding,
                    opts.local_root.as_deref(),
                )
                .await?;
                let report = publish(store.as_ref(), project, PublishOptions::default()).await?;
                progress::status_info("Published", &report.summary());
            }
        }

        let elapsed = started.elapsed();
        tracing::debug!("Step '{}' finished in {elapsed:.2?}", step.name);
        outcomes.push(StepOutcome {
            name: step.name.clone(),
            elapsed,
        });
    }

    Ok(outcomes)
}
