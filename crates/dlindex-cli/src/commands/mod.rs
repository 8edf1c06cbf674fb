//! Command dispatch and handler modules.

mod env;
mod list;
mod publish;
mod render;
mod stage;
mod verify;

use std::path::PathBuf;

use miette::Result;

use dlindex_ops::project::Project;
use dlindex_store::{open_store, ObjectStore};
use dlindex_util::errors::DlIndexError;

use crate::cli::{Cli, Command};

/// Global options shared by every command.
pub struct Context {
    pub cwd: PathBuf,
    pub manifest: Option<PathBuf>,
    /// Absolute, so it does not depend on where the manifest lives.
    pub local_root: Option<PathBuf>,
}

impl Context {
    fn new(cli: &Cli) -> Result<Self> {
        let cwd = std::env::current_dir().map_err(DlIndexError::Io)?;
        let local_root = cli.local_root.as_ref().map(|p| cwd.join(p));
        Ok(Self {
            cwd,
            manifest: cli.manifest.clone(),
            local_root,
        })
    }

    pub fn project(&self) -> Result<Project> {
        Project::locate(self.manifest.as_deref(), &self.cwd)
    }

    /// The configured store, authenticated with the ambient AWS credentials.
    pub async fn store(&self, project: &Project) -> Result<Box<dyn ObjectStore>> {
        let credentials = project.ambient_credentials();
        let store = open_store(
            &project.manifest,
            &project.root,
            &credentials,
            self.local_root.as_deref(),
        )
        .await?;
        tracing::debug!("Using {}", store.describe());
        Ok(store)
    }
}

/// Route a parsed CLI invocation to the appropriate command handler.
pub async fn dispatch(cli: Cli) -> Result<()> {
    let ctx = Context::new(&cli)?;
    match cli.command {
        Command::List { collection } => list::exec(&ctx, collection.as_deref()).await,
        Command::Render { output, json } => render::exec(&ctx, output.as_deref(), json).await,
        Command::Publish { dry_run, force } => publish::exec(&ctx, dry_run, force).await,
        Command::Verify { skip_links, jobs } => verify::exec(&ctx, skip_links, jobs).await,
        Command::Stage { action } => stage::exec(&ctx, action).await,
        Command::Env { reveal } => env::exec(&ctx, reveal),
    }
}
