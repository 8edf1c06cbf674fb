//! CLI argument definitions for dlindex.
//!
//! Uses `clap` derive macros to define the command surface. Each command
//! corresponds to a handler in the [`super::commands`] module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use dlindex_ops::ops_verify::DEFAULT_CONCURRENCY;

#[derive(Parser, Debug)]
#[command(
    name = "dlindex",
    version,
    about = "Publish the download index for release artifacts",
    long_about = "dlindex lists the release artifacts stored in a bucket, renders them as a \
                  static HTML index (plus an optional JSON manifest) and uploads it next to \
                  them. It can also run the CI stage that wraps the publish step."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Path to Index.toml (default: nearest one in this or a parent directory)
    #[arg(long, global = true, env = "DLINDEX_MANIFEST")]
    pub manifest: Option<PathBuf>,

    /// Use a local directory as the bucket instead of the configured storage
    #[arg(long, global = true, env = "DLINDEX_LOCAL_ROOT")]
    pub local_root: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List the artifacts that would be indexed
    List {
        /// Only this collection
        #[arg(short, long)]
        collection: Option<String>,
    },

    /// Render the index without uploading it
    Render {
        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Render the JSON manifest instead of the HTML page
        #[arg(long)]
        json: bool,
    },

    /// Regenerate and upload the index
    Publish {
        /// Show what would be uploaded without writing anything
        #[arg(long)]
        dry_run: bool,
        /// Upload even if the stored index is identical
        #[arg(long)]
        force: bool,
    },

    /// Check the public index and its download links
    Verify {
        /// Only compare the page, do not probe artifact links
        #[arg(long)]
        skip_links: bool,
        /// Parallel link checks
        #[arg(short, long, default_value_t = DEFAULT_CONCURRENCY)]
        jobs: usize,
    },

    /// Inspect or run the CI stage
    Stage {
        #[command(subcommand)]
        action: StageAction,
    },

    /// Print .dlindex.env entries
    Env {
        /// Show secret values unmasked
        #[arg(long)]
        reveal: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum StageAction {
    /// Print the stage definition with credential bindings
    Show,
    /// Run the stage steps in order under the stage timeout
    Run {
        /// Run even if this agent lacks the stage's agent label
        #[arg(long)]
        ignore_label: bool,
        /// Labels of this agent, comma or space separated
        #[arg(long, env = "NODE_LABELS")]
        agent_labels: Option<String>,
    },
}

pub fn parse() -> Cli {
    Cli::parse()
}
